// ✅ Record Validator - raw CSV row → Customer
// Pure: no I/O and no logging; callers decide what to do with a rejection

use thiserror::Error;

use crate::models::Customer;

// ============================================================================
// RAW RECORD
// ============================================================================

/// RawRecord - one CSV row before any type coercion
///
/// Fields are `None` when the column is absent from the header or the cell
/// is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    /// 1-based data line (header excluded)
    pub line: u64,
    pub name: Option<String>,
    pub age: Option<String>,
    pub cookie: Option<String>,
    pub banner_id: Option<String>,
}

impl RawRecord {
    /// Compact description of the row for diagnostics
    pub fn describe(&self) -> String {
        fn show(value: &Option<String>) -> &str {
            value.as_deref().unwrap_or("N/A")
        }

        format!(
            "Name: {}, Age: {}, Cookie: {}, Banner_id: {}",
            show(&self.name),
            show(&self.age),
            show(&self.cookie),
            show(&self.banner_id)
        )
    }
}

// ============================================================================
// REJECTION
// ============================================================================

/// Why a row was not turned into a [`Customer`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("{field} is missing")]
    Missing { field: &'static str },

    #[error("{field} must be an integer, got {value:?}")]
    NotAnInteger { field: &'static str, value: String },

    #[error("Name must contain only letters and spaces, got {name:?}")]
    InvalidName { name: String },

    #[error("Cookie must be in UUID format, got {cookie:?}")]
    InvalidCookie { cookie: String },

    #[error("Banner_id must be between 0 and 99, got {banner_id}")]
    BannerIdOutOfRange { banner_id: i64 },

    #[error("Age must be between {min} and {max}, got {age}")]
    AgeOutOfRange { age: i64, min: i64, max: i64 },
}

// ============================================================================
// RECORD VALIDATOR
// ============================================================================

/// Validates raw rows against structural rules and the configured age range
#[derive(Debug, Clone, Copy)]
pub struct RecordValidator {
    min_age: i64,
    max_age: i64,
}

impl RecordValidator {
    pub fn new(min_age: i64, max_age: i64) -> Self {
        RecordValidator { min_age, max_age }
    }

    /// Validate one row
    ///
    /// Coercion runs first, then the structural rules of [`Customer::new`],
    /// then the age range. The first failing step determines the rejection.
    pub fn validate(&self, raw: &RawRecord) -> Result<Customer, Rejection> {
        let name = required("Name", &raw.name)?;
        let age = integer("Age", &raw.age)?;
        let cookie = required("Cookie", &raw.cookie)?;
        let banner_id = integer("Banner_id", &raw.banner_id)?;

        let customer = Customer::new(name, age, cookie, banner_id)?;
        customer.check_age(self.min_age, self.max_age)?;

        Ok(customer)
    }
}

fn required<'a>(field: &'static str, value: &'a Option<String>) -> Result<&'a str, Rejection> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Rejection::Missing { field }),
    }
}

/// Parse an integer cell. Integral floats ("25.0") are accepted since
/// spreadsheet exports write numeric columns that way.
fn integer(field: &'static str, value: &Option<String>) -> Result<i64, Rejection> {
    let text = required(field, value)?.trim();

    if let Ok(n) = text.parse::<i64>() {
        return Ok(n);
    }

    match text.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
        _ => Err(Rejection::NotAnInteger {
            field,
            value: text.to_string(),
        }),
    }
}

// ============================================================================
// TESTS
// ============================================================================
