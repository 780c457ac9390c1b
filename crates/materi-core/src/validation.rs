//! # Validation Module
//!
//! Quote header validation for Materi.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Quote builder (React)                                        │
//! │  └── Same rules, immediate feedback                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: HTTP handler (Rust)                                          │
//! │  ├── Deserialization (lenient for numbers)                             │
//! │  └── THIS MODULE: customer fields, vendor id                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / UNIQUE constraints                                     │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Numeric inputs are deliberately absent here: they never fail, they
//! degrade (see [`crate::lenient`]).

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MIN_PHONE_DIGITS: usize = 8;
const MAX_PHONE_DIGITS: usize = 15;

// =============================================================================
// Generic
// =============================================================================

/// Requires a non-blank value and returns it trimmed.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(value.to_string())
}

// =============================================================================
// Customer Fields
// =============================================================================

/// Validates the customer name of a quote.
///
/// ## Rules
/// - Must not be blank
/// - At most 200 characters
///
/// ## Example
/// ```rust
/// use materi_core::validation::validate_customer_name;
///
/// assert_eq!(validate_customer_name("  Acme Builders ").unwrap(), "Acme Builders");
/// assert!(validate_customer_name("   ").is_err());
/// ```
pub fn validate_customer_name(name: &str) -> ValidationResult<String> {
    let name = validate_required("customer_name", name)?;

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "customer_name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(name)
}

/// Validates an optional customer email.
///
/// Blank means "no email". Otherwise the trimmed value must look like
/// `local@domain.tld`: exactly one `@`, no whitespace, and a dot inside the
/// domain with text on both sides.
pub fn validate_email(email: Option<&str>) -> ValidationResult<Option<String>> {
    let email = match email.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(e) => e,
    };

    let invalid = || ValidationError::InvalidFormat {
        field: "customer_email".to_string(),
        reason: "must be a valid email address".to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    let has_inner_dot = domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len());
    if !has_inner_dot {
        return Err(invalid());
    }

    Ok(Some(email.to_string()))
}

/// Strips everything but digits, `+`, `-`, spaces and parentheses.
///
/// ## Example
/// ```rust
/// use materi_core::validation::normalize_phone;
///
/// assert_eq!(normalize_phone("+54 (11) 5555-1234 ext."), "+54 (11) 5555-1234 ");
/// ```
pub fn normalize_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'))
        .collect()
}

/// Validates and normalizes an optional customer phone.
///
/// ## Rules
/// - Blank means "no phone"
/// - After normalization, 8 to 15 digits
pub fn validate_phone(phone: Option<&str>) -> ValidationResult<Option<String>> {
    let phone = match phone.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(p) => p,
    };

    let normalized = normalize_phone(phone);
    let digits = normalized.chars().filter(char::is_ascii_digit).count();

    if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits) {
        return Err(ValidationError::OutOfRange {
            field: "customer_phone digits".to_string(),
            min: MIN_PHONE_DIGITS as i64,
            max: MAX_PHONE_DIGITS as i64,
        });
    }

    Ok(Some(normalized.trim().to_string()))
}

// =============================================================================
// Quote Header
// =============================================================================

/// Customer fields of a quote after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerFields {
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
}

/// Validates the customer block of a quote header in one go.
pub fn validate_customer(
    name: &str,
    email: Option<&str>,
    phone: Option<&str>,
) -> ValidationResult<CustomerFields> {
    Ok(CustomerFields {
        customer_name: validate_customer_name(name)?,
        customer_email: validate_email(email)?,
        customer_phone: validate_phone(phone)?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
