//! CLI command handlers.
//!
//! Each handler is the orchestration boundary for one user action: errors are
//! either shown through the notifier (and reported as `CommandError::Reported`)
//! or handed back as a message for `main` to print, never both.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::api::auth::{TokenStoreError, REFRESH_TOKEN_KEY};
use crate::api::client::UploadFile;
use crate::api::error::ApiError;
use crate::api::types::{
    Medicine, MedicineAvailability, MedicineInput, RegisterRequest, UploadResult,
};
use crate::api::{medicines, prescriptions, session};
use crate::notify::{Alerts, Level, Notifier};
use crate::search::{SearchHandler, TerminalResults};
use crate::state::AppState;
use crate::upload::{SubmitOutcome, TerminalView, UploadFlow};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    Failed(String),

    /// The failure was already shown to the user.
    #[error("failure already reported")]
    Reported,
}

impl From<ApiError> for CommandError {
    fn from(err: ApiError) -> Self {
        CommandError::Failed(err.to_string())
    }
}

impl From<TokenStoreError> for CommandError {
    fn from(err: TokenStoreError) -> Self {
        CommandError::Failed(err.to_string())
    }
}

pub type CommandResult = Result<(), CommandError>;

/// Inventory endpoints answer 403 to non-admin accounts.
fn inventory_error(err: ApiError) -> CommandError {
    match err.status() {
        Some(403) => CommandError::Failed(format!("{} (sign in with an admin account)", err)),
        _ => err.into(),
    }
}

/// Make sure requests carry a CSRF token, fetching one if none is configured.
///
/// Best effort: a failure only means the backend may reject state-changing calls.
async fn ensure_csrf(state: &AppState) {
    if state.auth.csrf_token().await.is_some() {
        return;
    }
    if let Err(e) = session::prime_csrf(&state.api).await {
        log::warn!("Could not fetch CSRF token: {}", e);
    }
}

/// Sign in and store the issued token pair.
pub async fn login(state: &AppState, username: &str, password: &str) -> CommandResult {
    log::info!("Signing in as {}", username);
    ensure_csrf(state).await;

    let pair = session::login(&state.api, username, password).await?;
    state.store_session(&pair.access, Some(&pair.refresh)).await?;

    match pair.role {
        Some(role) => println!("Signed in as {} ({})", username, role),
        None => println!("Signed in as {}", username),
    }
    Ok(())
}

/// Create an account and sign in with it.
pub async fn register(state: &AppState, request: RegisterRequest) -> CommandResult {
    log::info!("Registering {}", request.username);
    ensure_csrf(state).await;

    let resp = session::register(&state.api, &request).await?;
    state.store_session(&resp.access, Some(&resp.refresh)).await?;

    println!("{} (user #{}, {})", resp.message, resp.user_id, resp.role);
    Ok(())
}

/// Trade the stored refresh token for a new access token.
pub async fn refresh(state: &AppState) -> CommandResult {
    let refresh_token = state
        .store
        .load(REFRESH_TOKEN_KEY)?
        .ok_or_else(|| CommandError::Failed("No stored session; run `login` first".to_string()))?;

    let resp = session::refresh(&state.api, &refresh_token).await?;
    state
        .store_session(&resp.access, resp.refresh.as_deref())
        .await?;

    log::info!("Access token refreshed");
    println!("Session refreshed");
    Ok(())
}

pub async fn logout(state: &AppState) -> CommandResult {
    state.logout().await?;
    println!("Signed out");
    Ok(())
}

/// Submit a prescription through the upload flow.
pub async fn upload(state: &AppState, path: Option<&Path>) -> CommandResult {
    let file = match path {
        Some(path) => Some(
            UploadFile::from_path(path)
                .await
                .map_err(|e| CommandError::Failed(format!("Cannot read {}: {}", path.display(), e)))?,
        ),
        None => None,
    };

    let view = TerminalView::new(state.api.origin());
    let alerts = Alerts::new();
    let mut flow = UploadFlow::new(state.api.as_ref(), state.auth.as_ref(), &view, &alerts);

    match flow.submit(file).await {
        SubmitOutcome::Redirected {
            prescription_id,
            result,
            ..
        } => {
            log::info!("Prescription {} uploaded", prescription_id);
            print_report(&result);
            Ok(())
        }
        SubmitOutcome::NativeSubmit => {
            alerts.notify(
                &format!(
                    "Not signed in: run `login` to upload through the API, or use the form at {}",
                    view.url_for("/upload/")
                ),
                Level::Warning,
            );
            Err(CommandError::Reported)
        }
        SubmitOutcome::Blocked | SubmitOutcome::Failed { .. } | SubmitOutcome::Ignored => {
            Err(CommandError::Reported)
        }
    }
}

/// Inventory check for each medicine read off the prescription.
fn print_report(result: &UploadResult) {
    if let Some(text) = result.extracted_text.as_deref() {
        log::debug!("Extracted text: {}", text);
    }
    if result.results.is_empty() {
        println!("No medicines recognised on the prescription");
        return;
    }
    println!(
        "{} medicine(s) found: {}",
        result.medicines_found.len(),
        result.medicines_found.join(", ")
    );
    for entry in &result.results {
        println!("  {}", availability_line(entry));
    }
}

fn availability_line(entry: &MedicineAvailability) -> String {
    let mut line = format!("{:<30} {:<13}", entry.medicine_name, entry.status);
    if let Some(stock) = entry.stock {
        line.push_str(&format!(" stock {}", stock));
    }
    if let Some(alt) = &entry.alternative {
        line.push_str(&format!("  alternative: {} ({} in stock)", alt.name, alt.stock));
    }
    line.trim_end().to_string()
}

/// `Jan 15, 2024, 10:30 AM` for the backend's ISO 8601 timestamps.
/// Anything unparseable is shown as received.
fn format_timestamp(raw: &str) -> String {
    const DISPLAY: &str = "%b %-d, %Y, %I:%M %p";
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.format(DISPLAY).to_string();
    }
    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(ts) => ts.format(DISPLAY).to_string(),
        Err(_) => raw.to_string(),
    }
}

pub async fn history(state: &AppState) -> CommandResult {
    let entries = prescriptions::get_history(&state.api).await?;
    if entries.is_empty() {
        println!("No prescriptions uploaded yet");
        return Ok(());
    }
    for entry in entries {
        println!(
            "#{:<6} {}  {} result(s)  {}",
            entry.id,
            format_timestamp(&entry.created_at),
            entry.results_count,
            entry.file_url.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

/// Search medicines. With `interactive`, every stdin line is an input event.
pub async fn search(state: &AppState, query: Option<&str>, interactive: bool) -> CommandResult {
    let handler = SearchHandler::for_client(Arc::clone(&state.api), Arc::new(TerminalResults));

    if let Some(query) = query {
        handler.on_input(query);
    }

    if interactive {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| CommandError::Failed(format!("Failed to read input: {}", e)))?
        {
            handler.on_input(&line);
        }
    }

    handler.settle().await;
    Ok(())
}

fn print_medicine(med: &Medicine) {
    println!(
        "#{:<5} {:<30} stock {:<6} {}  {}",
        med.id,
        med.name,
        med.stock_quantity,
        med.manufacturer.as_deref().unwrap_or("-"),
        med.composition.as_deref().unwrap_or("")
    );
}

pub async fn list_medicines(state: &AppState) -> CommandResult {
    let meds = medicines::list_medicines(&state.api)
        .await
        .map_err(inventory_error)?;
    for med in &meds {
        print_medicine(med);
    }
    log::debug!("Listed {} medicines", meds.len());
    Ok(())
}

pub async fn show_medicine(state: &AppState, id: u64) -> CommandResult {
    let med = medicines::get_medicine(&state.api, id)
        .await
        .map_err(inventory_error)?;
    print_medicine(&med);
    Ok(())
}

pub async fn create_medicine(state: &AppState, input: MedicineInput) -> CommandResult {
    if input.name.as_deref().map(str::trim).unwrap_or("").is_empty() {
        return Err(CommandError::Failed("Medicine name is required".to_string()));
    }
    ensure_csrf(state).await;
    let med = medicines::create_medicine(&state.api, &input)
        .await
        .map_err(inventory_error)?;
    print_medicine(&med);
    Ok(())
}

pub async fn update_medicine(state: &AppState, id: u64, input: MedicineInput) -> CommandResult {
    ensure_csrf(state).await;
    let med = medicines::update_medicine(&state.api, id, &input)
        .await
        .map_err(inventory_error)?;
    print_medicine(&med);
    Ok(())
}

pub async fn delete_medicine(state: &AppState, id: u64) -> CommandResult {
    ensure_csrf(state).await;
    let message = medicines::delete_medicine(&state.api, id)
        .await
        .map_err(inventory_error)?;
    println!("{}", message);
    Ok(())
}
