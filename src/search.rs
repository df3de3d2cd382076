//! Debounced medicine search.
//!
//! Every input change feeds a 300 ms debounced lookup. Queries shorter than
//! two characters are dropped without a request. Lookup failures are logged
//! only; the user never sees them.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::api::client::ApiClient;
use crate::api::error::ApiError;
use crate::api::medicines;
use crate::api::types::Medicine;
use crate::debounce::{debounce, Debounced};

/// Quiet period before a search fires.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Shortest query (in characters) worth sending.
pub const MIN_QUERY_CHARS: usize = 2;

/// Display step for search results.
pub trait SearchResults: Send + Sync {
    fn show(&self, query: &str, hits: &[Medicine]);
}

/// Search-input handler wrapping a debounced lookup.
pub struct SearchHandler {
    debounced: Debounced<String>,
}

impl SearchHandler {
    pub fn new<L, Fut>(lookup: L, results: Arc<dyn SearchResults>) -> Self
    where
        L: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<Medicine>, ApiError>> + Send + 'static,
    {
        let lookup = Arc::new(lookup);
        let debounced = debounce(
            move |query: String| {
                let lookup = Arc::clone(&lookup);
                let results = Arc::clone(&results);
                async move {
                    if query.chars().count() < MIN_QUERY_CHARS {
                        log::debug!("Search skipped for short query {:?}", query);
                        return;
                    }
                    match lookup(query.clone()).await {
                        Ok(hits) => results.show(&query, &hits),
                        Err(e) => log::error!("Search error: {}", e),
                    }
                }
            },
            SEARCH_DEBOUNCE,
        );
        Self { debounced }
    }

    /// Handler backed by GET /medicines/search/.
    pub fn for_client(api: Arc<ApiClient>, results: Arc<dyn SearchResults>) -> Self {
        Self::new(
            move |query: String| {
                let api = Arc::clone(&api);
                async move { medicines::search_medicine(&api, &query).await }
            },
            results,
        )
    }

    /// Input-change event on the search field.
    pub fn on_input(&self, value: &str) {
        self.debounced.call(value.to_string());
    }

    /// Wait for any pending or running lookup to finish.
    pub async fn settle(&self) {
        self.debounced.settle().await;
    }
}

/// Prints search hits as one line per medicine.
pub struct TerminalResults;

impl SearchResults for TerminalResults {
    fn show(&self, query: &str, hits: &[Medicine]) {
        println!("{} result(s) for {:?}", hits.len(), query);
        for med in hits {
            let availability = match med.is_available {
                Some(true) => "available",
                Some(false) => "out of stock",
                None => "-",
            };
            println!(
                "  #{:<5} {:<30} stock {:<6} {}",
                med.id, med.name, med.stock_quantity, availability
            );
        }
    }
}
