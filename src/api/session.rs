//! Session endpoints: obtaining, refreshing and registering credentials.
//!
//! These only fetch tokens. Storing them is the caller's job (see `commands`).

use reqwest::header::SET_COOKIE;

use super::auth::{set_cookie_value, CSRF_COOKIE_NAME};
use super::client::{ApiClient, Method, RequestOptions};
use super::error::ApiError;
use super::types::{
    LoginRequest, RefreshRequest, RefreshResponse, RegisterRequest, RegisterResponse, TokenPair,
};

/// Server-rendered page that always sets the CSRF cookie.
const CSRF_PAGE: &str = "/login/";

/// Exchange credentials for an access/refresh token pair.
///
/// POST /token/.
pub async fn login(client: &ApiClient, username: &str, password: &str) -> Result<TokenPair, ApiError> {
    let body = LoginRequest {
        username: username.to_string(),
        password: password.to_string(),
    };
    let options = RequestOptions::json(Method::Post, &body)?;
    client.request_as("/token/", options).await
}

/// Obtain a fresh access token from a refresh token.
///
/// POST /token/refresh/.
pub async fn refresh(client: &ApiClient, refresh_token: &str) -> Result<RefreshResponse, ApiError> {
    let body = RefreshRequest {
        refresh: refresh_token.to_string(),
    };
    let options = RequestOptions::json(Method::Post, &body)?;
    client.request_as("/token/refresh/", options).await
}

/// POST /register/. The backend defaults the role to `staff`.
pub async fn register(
    client: &ApiClient,
    request: &RegisterRequest,
) -> Result<RegisterResponse, ApiError> {
    let options = RequestOptions::json(Method::Post, request)?;
    client.request_as("/register/", options).await
}

/// Fetch the login page and store its `csrftoken` cookie in the auth context.
///
/// Returns `true` if a token was found.
pub async fn prime_csrf(client: &ApiClient) -> Result<bool, ApiError> {
    let resp = client.get_page(CSRF_PAGE).await?;

    let token = resp
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| set_cookie_value(v, CSRF_COOKIE_NAME));

    match token {
        Some(token) => {
            client.auth().set_csrf_token(token).await;
            log::debug!("CSRF token primed from {}", CSRF_PAGE);
            Ok(true)
        }
        None => {
            log::warn!("No {} cookie set by {}", CSRF_COOKIE_NAME, CSRF_PAGE);
            Ok(false)
        }
    }
}
