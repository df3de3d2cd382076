//! API client module for the pharmacy backend.
//!
//! Provides the HTTP client with CSRF and bearer header injection, credential
//! storage, endpoint wrappers, and request/response types matching the
//! backend's REST API under `/api`.

pub mod auth;
pub mod client;
pub mod error;
pub mod medicines;
pub mod prescriptions;
pub mod session;
pub mod types;
