//! Medicine inventory endpoints.
//!
//! Listing, creating, updating and deleting require an admin account; the
//! backend answers 403 with `{"error": "Admin access required"}` otherwise.

use super::client::{ApiClient, Method, RequestOptions};
use super::error::ApiError;
use super::types::{Medicine, MedicineInput, MessageResponse};

/// Search medicines by name, composition or manufacturer.
///
/// GET /medicines/search/?q={query}. The backend caps results at 20.
pub async fn search_medicine(client: &ApiClient, query: &str) -> Result<Vec<Medicine>, ApiError> {
    let endpoint = format!("/medicines/search/?q={}", urlencoding::encode(query));
    client.request_as(&endpoint, RequestOptions::default()).await
}

/// GET /medicines/, ordered by name.
pub async fn list_medicines(client: &ApiClient) -> Result<Vec<Medicine>, ApiError> {
    client.request_as("/medicines/", RequestOptions::default()).await
}

/// POST /medicines/. `name` is required by the backend.
pub async fn create_medicine(client: &ApiClient, data: &MedicineInput) -> Result<Medicine, ApiError> {
    let options = RequestOptions::json(Method::Post, data)?;
    client.request_as("/medicines/", options).await
}

/// GET /medicines/{id}/.
pub async fn get_medicine(client: &ApiClient, id: u64) -> Result<Medicine, ApiError> {
    client
        .request_as(&format!("/medicines/{}/", id), RequestOptions::default())
        .await
}

/// PUT /medicines/{id}/. Fields left unset keep their current value.
pub async fn update_medicine(
    client: &ApiClient,
    id: u64,
    data: &MedicineInput,
) -> Result<Medicine, ApiError> {
    let options = RequestOptions::json(Method::Put, data)?;
    client.request_as(&format!("/medicines/{}/", id), options).await
}

/// DELETE /medicines/{id}/. Returns the backend's confirmation message.
pub async fn delete_medicine(client: &ApiClient, id: u64) -> Result<String, ApiError> {
    let resp: MessageResponse = client
        .request_as(&format!("/medicines/{}/", id), RequestOptions::new(Method::Delete))
        .await?;
    Ok(resp.message)
}
