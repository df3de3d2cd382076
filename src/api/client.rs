//! HTTP client with CSRF and bearer-token header injection.
//!
//! Every request carries `X-CSRF-Token`. Requests carry
//! `Authorization: Bearer <token>` when the shared `AuthContext` holds an
//! access token. Response bodies are always parsed as JSON, including on
//! error statuses, so the backend's `{"error": "..."}` envelope can be surfaced.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{multipart, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::auth::AuthContext;
use super::error::{envelope_message, ApiError, DEFAULT_API_ERROR, DEFAULT_UPLOAD_ERROR};

/// Path prefix shared by every REST endpoint.
pub const API_PREFIX: &str = "/api";

/// Anti-forgery header echoed on every request.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Endpoint that accepts prescription images as multipart uploads.
pub const UPLOAD_ENDPOINT: &str = "/prescriptions/upload/";

/// HTTP methods the backend exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Per-call options for `ApiClient::request`.
///
/// Caller headers are applied last and win over the defaults.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    /// Options carrying `payload` serialized as the JSON body.
    pub fn json<T: Serialize>(method: Method, payload: &T) -> Result<Self, ApiError> {
        Ok(Self {
            method,
            headers: Vec::new(),
            body: Some(serde_json::to_string(payload)?),
        })
    }

    #[cfg(test)]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A fully decorated request, ready to send.
#[derive(Debug)]
pub struct RequestDescriptor {
    pub url: String,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

/// A file selected for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    /// Read a file from disk, naming the upload after the file.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(file_name, bytes))
    }
}

/// Content type for the prescription formats the backend accepts.
fn content_type_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// HTTP client wrapper for the pharmacy backend.
///
/// Holds the origin (scheme + host) and the shared auth context. Tokens are
/// read from the context on every request but never written by the client.
pub struct ApiClient {
    client: Client,
    origin: String,
    auth: Arc<AuthContext>,
}

impl ApiClient {
    /// Create a new API client for the backend at `origin`.
    pub fn new(origin: &str, auth: Arc<AuthContext>) -> Self {
        // No overall timeout: a call resolves, fails, or the process exits.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            origin: origin.trim_end_matches('/').to_string(),
            auth,
        }
    }

    pub fn auth(&self) -> &Arc<AuthContext> {
        &self.auth
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Absolute URL for a relative API endpoint.
    pub fn api_url(&self, endpoint: &str) -> String {
        format!("{}{}{}", self.origin, API_PREFIX, endpoint)
    }

    /// Build the decorated request for `endpoint` without sending it.
    pub async fn describe(
        &self,
        endpoint: &str,
        options: &RequestOptions,
    ) -> Result<RequestDescriptor, ApiError> {
        if endpoint.is_empty() {
            return Err(ApiError::InvalidEndpoint);
        }

        let mut headers = self.decorated_headers(true).await?;
        for (name, value) in &options.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ApiError::InvalidHeader(name.clone()))?;
            let header_value =
                HeaderValue::from_str(value).map_err(|_| ApiError::InvalidHeader(name.clone()))?;
            headers.insert(header_name, header_value);
        }

        Ok(RequestDescriptor {
            url: self.api_url(endpoint),
            method: options.method,
            headers,
            body: options.body.clone(),
        })
    }

    /// Send a request to a relative API endpoint and return the parsed JSON body.
    pub async fn request(&self, endpoint: &str, options: RequestOptions) -> Result<Value, ApiError> {
        let descriptor = self.describe(endpoint, &options).await?;

        let mut builder = self
            .client
            .request(descriptor.method.into(), &descriptor.url)
            .headers(descriptor.headers);
        if let Some(body) = descriptor.body {
            builder = builder.body(body);
        }

        self.execute(builder, DEFAULT_API_ERROR, |status, message| ApiError::Api {
            status,
            message,
        })
        .await
    }

    /// Like `request`, decoding the body into `T`.
    pub async fn request_as<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let value = self.request(endpoint, options).await?;
        decode(value)
    }

    /// Upload a file as multipart form data (single part named `file`).
    ///
    /// Content-Type is left to reqwest so it can set the multipart boundary.
    pub async fn upload_file(&self, file: &UploadFile) -> Result<Value, ApiError> {
        let headers = self.decorated_headers(false).await?;

        let part = multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|_| ApiError::InvalidHeader("Content-Type".to_string()))?;
        let form = multipart::Form::new().part("file", part);

        let builder = self
            .client
            .post(self.api_url(UPLOAD_ENDPOINT))
            .headers(headers)
            .multipart(form);

        self.execute(builder, DEFAULT_UPLOAD_ERROR, |status, message| {
            ApiError::Upload { status, message }
        })
        .await
    }

    /// GET a server-rendered page (outside `/api`). Used to pick up cookies.
    pub async fn get_page(&self, path: &str) -> Result<Response, ApiError> {
        let url = format!("{}{}", self.origin, path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Base headers: optional JSON content type, CSRF token, bearer token.
    async fn decorated_headers(&self, json_body: bool) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();

        if json_body {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let csrf = self.auth.csrf_token().await.unwrap_or_default();
        let csrf_value = HeaderValue::from_str(&csrf)
            .map_err(|_| ApiError::InvalidHeader(CSRF_HEADER.to_string()))?;
        headers.insert(HeaderName::from_static(CSRF_HEADER), csrf_value);

        if let Some(token) = self.auth.access_token().await {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::InvalidHeader("Authorization".to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    /// Send, parse the JSON body, and map failures. Errors are logged before
    /// being handed back.
    async fn execute(
        &self,
        builder: RequestBuilder,
        fallback: &str,
        on_failure: fn(u16, String) -> ApiError,
    ) -> Result<Value, ApiError> {
        let result = dispatch(builder, fallback, on_failure).await;
        if let Err(ref e) = result {
            log_failure(e);
        }
        result
    }
}

/// Decode a parsed body into `T`, logging a shape mismatch like any other
/// malformed response.
pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| {
        let err = ApiError::Decode(e);
        log_failure(&err);
        err
    })
}

/// Transport and decode failures at `error`; the user only sees a generic
/// message for those. Backend rejections carry their own message, so `warn`.
fn log_failure(err: &ApiError) {
    match err {
        ApiError::Transport(_) | ApiError::Decode(_) => log::error!("API Error: {}", err),
        _ => log::warn!("API Error: {}", err),
    }
}

async fn dispatch(
    builder: RequestBuilder,
    fallback: &str,
    on_failure: fn(u16, String) -> ApiError,
) -> Result<Value, ApiError> {
    let response = builder.send().await?;
    let status = response.status();
    let bytes = response.bytes().await?;
    let data: Value = serde_json::from_slice(&bytes)?;

    if !status.is_success() {
        return Err(on_failure(status.as_u16(), envelope_message(&data, fallback)));
    }

    Ok(data)
}
