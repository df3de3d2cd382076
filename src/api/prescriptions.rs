//! Prescription upload and history endpoints.

use super::client::{decode, ApiClient, RequestOptions, UploadFile};
use super::error::ApiError;
use super::types::{PrescriptionSummary, UploadResult};

/// Upload a prescription image or PDF for OCR and inventory matching.
///
/// POST /prescriptions/upload/ with multipart form data.
pub async fn upload_prescription(
    client: &ApiClient,
    file: &UploadFile,
) -> Result<UploadResult, ApiError> {
    let value = client.upload_file(file).await?;
    decode(value)
}

/// GET /prescriptions/history/, newest first.
pub async fn get_history(client: &ApiClient) -> Result<Vec<PrescriptionSummary>, ApiError> {
    client
        .request_as("/prescriptions/history/", RequestOptions::default())
        .await
}

/// Browser path of the results page for a prescription.
pub fn results_path(prescription_id: &impl std::fmt::Display) -> String {
    format!("/results/{}/", prescription_id)
}
