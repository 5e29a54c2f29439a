// 📦 Data Models - Customers and ShowAds wire types
// Customer is built from a validated CSV row; the rest are API payloads

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validator::Rejection;

/// Hard cap on entries in one bulk submission, imposed by the API
pub const API_BATCH_LIMIT: usize = 1000;

/// Inclusive range of accepted banner ids
pub const BANNER_ID_RANGE: std::ops::RangeInclusive<i64> = 0..=99;

static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z\s]+$").expect("name pattern is a valid regex")
});

// ============================================================================
// CUSTOMER
// ============================================================================

/// Customer - one valid row of the input file
///
/// Structural rules (name, cookie, banner id) hold for every constructed value.
/// The age range depends on runtime configuration, so it is checked separately
/// with [`Customer::check_age`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Customer {
    pub name: String,
    pub age: i64,
    pub cookie: String,
    pub banner_id: i64,
}

impl Customer {
    /// Build a customer, applying structural rules in order:
    /// name pattern, cookie UUID syntax, banner id range.
    pub fn new(name: &str, age: i64, cookie: &str, banner_id: i64) -> Result<Self, Rejection> {
        let name = name.trim();
        if !NAME_PATTERN.is_match(name) {
            return Err(Rejection::InvalidName {
                name: name.to_string(),
            });
        }

        if Uuid::parse_str(cookie).is_err() {
            return Err(Rejection::InvalidCookie {
                cookie: cookie.to_string(),
            });
        }

        if !BANNER_ID_RANGE.contains(&banner_id) {
            return Err(Rejection::BannerIdOutOfRange { banner_id });
        }

        Ok(Customer {
            name: name.to_string(),
            age,
            cookie: cookie.to_string(),
            banner_id,
        })
    }

    /// Check age against configurable inclusive limits
    pub fn check_age(&self, min_age: i64, max_age: i64) -> Result<(), Rejection> {
        if (min_age..=max_age).contains(&self.age) {
            Ok(())
        } else {
            Err(Rejection::AgeOutOfRange {
                age: self.age,
                min: min_age,
                max: max_age,
            })
        }
    }
}

// ============================================================================
// API PAYLOADS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    #[serde(rename = "ProjectKey")]
    pub project_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(rename = "AccessToken")]
    pub access_token: String,
}

/// One banner display instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannerRequest {
    #[serde(rename = "VisitorCookie")]
    pub visitor_cookie: String,

    #[serde(rename = "BannerId")]
    pub banner_id: i64,
}

impl From<&Customer> for BannerRequest {
    fn from(customer: &Customer) -> Self {
        BannerRequest {
            visitor_cookie: customer.cookie.clone(),
            banner_id: customer.banner_id,
        }
    }
}

/// Exact payload of one bulk submission (at most [`API_BATCH_LIMIT`] entries)
#[derive(Debug, Clone, Serialize)]
pub struct BulkBannerRequest<'a> {
    #[serde(rename = "Data")]
    pub data: &'a [BannerRequest],
}

impl<'a> BulkBannerRequest<'a> {
    pub fn new(requests: &'a [BannerRequest]) -> Self {
        BulkBannerRequest { data: requests }
    }
}

// ============================================================================
// TESTS
// ============================================================================
