// 🌐 HTTP Transport - JSON POSTs with connection-level retry
// Transient statuses and dropped connections are retried here, below the
// business-level batch retry in the dispatcher

use std::time::Duration;

use backoff::ExponentialBackoff;
use reqwest::blocking::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Statuses retried at connection level
pub const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Longest single wait between connection retries
const MAX_BACKOFF: Duration = Duration::from_secs(120);

// ============================================================================
// CORE TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport already closed")]
    Closed,

    #[error("retryable status {0}")]
    RetryableStatus(u16),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Transport - the seam between the API client and the network
pub trait Transport {
    /// POST `body` as JSON to `url`, with an optional bearer token
    fn post_json(
        &mut self,
        url: &str,
        body: &Value,
        bearer: Option<&str>,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError>;

    /// Release connection resources; later calls fail
    fn close(&mut self);
}

// ============================================================================
// HTTP TRANSPORT
// ============================================================================

/// Blocking HTTP transport with exponential backoff on transient failures
pub struct HttpTransport {
    client: Option<Client>,
    max_retries: u32,
    backoff_factor: Duration,
}

impl HttpTransport {
    pub fn new(max_retries: u32, backoff_factor: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().build()?;

        Ok(HttpTransport {
            client: Some(client),
            max_retries,
            backoff_factor,
        })
    }

    fn backoff(&self) -> ExponentialBackoff {
        doubling_backoff(self.backoff_factor)
    }
}

/// Waits of `base`, `2 * base`, `4 * base`, ... without jitter, capped at two minutes
///
/// Shared by the connection retry here and the batch retry in the dispatcher.
pub fn doubling_backoff(base: Duration) -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: base,
        current_interval: base,
        randomization_factor: 0.0,
        multiplier: 2.0,
        max_interval: MAX_BACKOFF,
        max_elapsed_time: None,
        ..Default::default()
    }
}

impl Transport for HttpTransport {
    fn post_json(
        &mut self,
        url: &str,
        body: &Value,
        bearer: Option<&str>,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let client = self.client.as_ref().ok_or(TransportError::Closed)?;
        let max_retries = self.max_retries;
        let mut attempt = 0u32;

        let operation = || {
            attempt += 1;

            let mut request = client.post(url).json(body).timeout(timeout);
            if let Some(token) = bearer {
                request = request.bearer_auth(token);
            }

            let retries_left = attempt <= max_retries;

            match request.send() {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if RETRY_STATUSES.contains(&status) && retries_left {
                        return Err(backoff::Error::Transient {
                            err: TransportError::RetryableStatus(status),
                            retry_after: None,
                        });
                    }

                    let body = response
                        .text()
                        .map_err(|e| backoff::Error::Permanent(TransportError::Http(e)))?;
                    Ok(HttpResponse { status, body })
                }
                // A timed-out POST may already have reached the server, so only
                // failures to connect are safe to resend
                Err(e) if e.is_connect() && retries_left => {
                    Err(backoff::Error::Transient {
                        err: TransportError::Http(e),
                        retry_after: None,
                    })
                }
                Err(e) => Err(backoff::Error::Permanent(TransportError::Http(e))),
            }
        };

        let notify = |err: TransportError, wait: Duration| {
            warn!("POST {} failed ({}), retrying in {:?}", url, err, wait);
        };

        match backoff::retry_notify(self.backoff(), operation, notify) {
            Ok(response) => {
                debug!("POST {} -> {}", url, response.status);
                Ok(response)
            }
            Err(backoff::Error::Permanent(err)) | Err(backoff::Error::Transient { err, .. }) => {
                Err(err)
            }
        }
    }

    fn close(&mut self) {
        if self.client.take().is_some() {
            debug!("HTTP transport closed");
        }
    }
}

// ============================================================================
// TEST SUPPORT
// ============================================================================


// ============================================================================
// TESTS
// ============================================================================
