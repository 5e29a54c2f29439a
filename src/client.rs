// 🔐 ShowAds API Client
// Bearer token lifecycle, bulk submission, single re-auth on 401

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::models::{AuthRequest, AuthResponse, BannerRequest, BulkBannerRequest, API_BATCH_LIMIT};
use crate::transport::{HttpResponse, Transport};

/// Per-request timeout for authentication and single sends
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-request timeout for bulk sends
pub const BULK_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// AUTH TOKEN
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthToken {
    /// Nominal lifetime granted by the API
    pub fn lifetime() -> chrono::Duration {
        chrono::Duration::hours(24)
    }

    /// Tokens are treated as expired this long before `expires_at`
    pub fn safety_margin() -> chrono::Duration {
        chrono::Duration::minutes(1)
    }

    pub fn issued_at(access_token: String, issued_at: DateTime<Utc>) -> Self {
        AuthToken {
            access_token,
            expires_at: issued_at + Self::lifetime(),
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at - Self::safety_margin()
    }
}

// ============================================================================
// SHOWADS CLIENT
// ============================================================================

/// Outcome of one POST carrying the current bearer token
enum Delivery {
    Accepted,
    Unauthorized,
    Rejected,
}

pub struct ShowAdsClient<T: Transport> {
    base_url: String,
    project_key: String,
    transport: T,
    token: Option<AuthToken>,
    closed: bool,
}

impl<T: Transport> ShowAdsClient<T> {
    pub fn new(config: &Config, transport: T) -> Self {
        ShowAdsClient {
            base_url: config.base_url().to_string(),
            project_key: config.project_key.clone(),
            transport,
            token: None,
            closed: false,
        }
    }

    pub fn token(&self) -> Option<&AuthToken> {
        self.token.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token
            .as_ref()
            .map_or(false, |token| token.is_valid_at(Utc::now()))
    }

    /// Exchange the project key for an access token
    ///
    /// On failure the previous token, if any, is kept.
    pub fn authenticate(&mut self) -> bool {
        let body = match to_json(&AuthRequest {
            project_key: self.project_key.clone(),
        }) {
            Some(body) => body,
            None => return false,
        };

        let url = format!("{}/auth", self.base_url);
        let response = match self.transport.post_json(&url, &body, None, REQUEST_TIMEOUT) {
            Ok(response) => response,
            Err(e) => {
                error!("Authentication error: {}", e);
                return false;
            }
        };

        if !response.is_success() {
            error!(
                "Authentication failed: {} - {}",
                response.status, response.body
            );
            return false;
        }

        match serde_json::from_str::<AuthResponse>(&response.body) {
            Ok(auth) => {
                self.token = Some(AuthToken::issued_at(auth.access_token, Utc::now()));
                info!("Successfully authenticated with ShowAds API");
                true
            }
            Err(e) => {
                error!("Authentication error: unreadable token response: {}", e);
                false
            }
        }
    }

    pub fn ensure_authenticated(&mut self) -> bool {
        if self.is_authenticated() {
            return true;
        }

        self.authenticate()
    }

    /// Submit up to [`API_BATCH_LIMIT`] banner requests in one call
    pub fn send_bulk(&mut self, requests: &[BannerRequest]) -> bool {
        if requests.is_empty() {
            return true;
        }

        if requests.len() > API_BATCH_LIMIT {
            error!(
                "Too many requests in batch: {} (max {})",
                requests.len(),
                API_BATCH_LIMIT
            );
            return false;
        }

        let body = match to_json(&BulkBannerRequest::new(requests)) {
            Some(body) => body,
            None => return false,
        };

        let accepted = self.deliver("/banners/show/bulk", &body, BULK_TIMEOUT);
        if accepted {
            info!(
                "Successfully sent bulk banner request for {} customers",
                requests.len()
            );
        }
        accepted
    }

    /// Submit a single banner request
    pub fn send_one(&mut self, visitor_cookie: &str, banner_id: i64) -> bool {
        let request = BannerRequest {
            visitor_cookie: visitor_cookie.to_string(),
            banner_id,
        };
        let body = match to_json(&request) {
            Some(body) => body,
            None => return false,
        };

        let accepted = self.deliver("/banners/show", &body, REQUEST_TIMEOUT);
        if accepted {
            debug!("Successfully sent banner request for cookie {}", visitor_cookie);
        }
        accepted
    }

    /// Release the transport. Dropping the client does the same.
    pub fn close(mut self) {
        self.shutdown();
    }

    /// POST with the current token; on 401 re-authenticate and try exactly once more
    fn deliver(&mut self, path: &str, body: &Value, timeout: Duration) -> bool {
        if !self.ensure_authenticated() {
            return false;
        }

        match self.post_authorized(path, body, timeout) {
            Delivery::Accepted => true,
            Delivery::Rejected => false,
            Delivery::Unauthorized => {
                warn!("Token expired, re-authenticating...");
                if !self.authenticate() {
                    return false;
                }

                match self.post_authorized(path, body, timeout) {
                    Delivery::Accepted => true,
                    Delivery::Unauthorized => {
                        error!("{} still unauthorized after re-authentication", path);
                        false
                    }
                    Delivery::Rejected => false,
                }
            }
        }
    }

    fn post_authorized(&mut self, path: &str, body: &Value, timeout: Duration) -> Delivery {
        let url = format!("{}{}", self.base_url, path);
        let bearer = self.token.as_ref().map(|t| t.access_token.as_str());

        match self.transport.post_json(&url, body, bearer, timeout) {
            Ok(HttpResponse { status: 200, .. }) => Delivery::Accepted,
            Ok(HttpResponse { status: 401, .. }) => Delivery::Unauthorized,
            Ok(response) => {
                error!(
                    "Banner request to {} failed: {} - {}",
                    path, response.status, response.body
                );
                Delivery::Rejected
            }
            Err(e) => {
                error!("Error sending banner request to {}: {}", path, e);
                Delivery::Rejected
            }
        }
    }

    fn shutdown(&mut self) {
        if !self.closed {
            self.closed = true;
            self.transport.close();
            debug!("ShowAds client closed");
        }
    }
}

impl<T: Transport> Drop for ShowAdsClient<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn to_json<S: Serialize>(payload: &S) -> Option<Value> {
    match serde_json::to_value(payload) {
        Ok(value) => Some(value),
        Err(e) => {
            error!("Failed to encode request payload: {}", e);
            None
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
