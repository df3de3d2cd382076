//! Request and response types for the pharmacy backend API.
//!
//! Field names follow the backend's snake_case JSON.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Login request body sent to POST /token/.
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Token pair from POST /token/, plus the role info the backend adds.
#[derive(Debug, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub user_id: Option<u64>,
}

/// Refresh request body sent to POST /token/refresh/.
#[derive(Debug, Serialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Refresh response. `refresh` is only present when the backend rotates tokens.
#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Registration request body sent to POST /register/.
#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub access: String,
    pub refresh: String,
    pub role: String,
    pub user_id: u64,
}

/// Prescription identifier. The backend sends an integer, but string ids are accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PrescriptionId {
    Number(u64),
    Text(String),
}

impl PrescriptionId {
    fn is_blank(&self) -> bool {
        matches!(self, PrescriptionId::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for PrescriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrescriptionId::Number(n) => write!(f, "{}", n),
            PrescriptionId::Text(s) => f.write_str(s),
        }
    }
}

/// Alternative medicine suggested when the prescribed one is short.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AlternativeStock {
    pub name: String,
    pub stock: i64,
}

/// Inventory check for one medicine read off a prescription.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MedicineAvailability {
    pub medicine_name: String,
    pub status: String,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub alternative: Option<AlternativeStock>,
}

/// Response from POST /prescriptions/upload/.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UploadResult {
    #[serde(default)]
    pub prescription_id: Option<PrescriptionId>,
    #[serde(default)]
    pub extracted_text: Option<String>,
    #[serde(default)]
    pub medicines_found: Vec<String>,
    #[serde(default)]
    pub results: Vec<MedicineAvailability>,
}

impl UploadResult {
    /// The new prescription's id, treating a blank string as missing.
    pub fn prescription_id(&self) -> Option<&PrescriptionId> {
        self.prescription_id.as_ref().filter(|id| !id.is_blank())
    }
}

/// One row of GET /prescriptions/history/.
#[derive(Debug, Clone, Deserialize)]
pub struct PrescriptionSummary {
    pub id: u64,
    #[serde(default)]
    pub file_url: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub results_count: u32,
}

/// Medicine record as returned by the list, search and detail endpoints.
///
/// `created_at` is only sent by the list endpoint, `is_available` only by search.
#[derive(Debug, Clone, Deserialize)]
pub struct Medicine {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub composition: Option<String>,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub is_available: Option<bool>,
}

/// Body for creating or updating a medicine. Unset fields are left out, so an
/// update only touches what was given.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MedicineInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
}

/// Generic `{"message": "..."}` acknowledgement (DELETE).
#[derive(Debug, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
