//! # Validation Module
//!
//! Input validation for discount creation parameters.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: CLI prompt                                                   │
//! │  ├── Parse raw text (numbers, days, usage limit)                       │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Use case / DiscountService                                   │
//! │  └── THIS MODULE: business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Store                                                        │
//! │  └── UNIQUE code index                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rust_decimal::Decimal;
//! use voucher_core::validation::{validate_code, validate_percentage};
//!
//! validate_code("SAVE10").unwrap();
//! validate_percentage(Decimal::new(10, 0)).unwrap();
//! assert!(validate_percentage(Decimal::new(101, 0)).is_err());
//! ```

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum length of a discount code.
pub const MAX_CODE_LEN: usize = 50;

/// Maximum length of a discount description.
pub const MAX_DESCRIPTION_LEN: usize = 255;

/// Longest validity accepted when creating a discount (100 years).
pub const MAX_VALIDITY_DAYS: u32 = 36_500;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a discount/coupon code.
///
/// ## Rules
/// - Must not be empty (after trimming)
/// - At most 50 characters
/// - No whitespace inside the code
///
/// ## Returns
/// The trimmed code.
pub fn validate_code(code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.chars().count() > MAX_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: MAX_CODE_LEN,
        });
    }

    if code.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must not contain spaces".to_string(),
        });
    }

    Ok(code.to_string())
}

/// Validates a description. Empty descriptions are allowed.
pub fn validate_description(description: &str) -> ValidationResult<String> {
    let description = description.trim();

    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::TooLong {
            field: "description".to_string(),
            max: MAX_DESCRIPTION_LEN,
        });
    }

    Ok(description.to_string())
}

/// Validates and normalises an ISO-4217-style currency code.
///
/// ## Rules
/// - Exactly three ASCII letters
/// - Returned upper-cased ("brl" → "BRL")
///
/// ## Example
/// ```rust
/// use voucher_core::validation::validate_currency;
///
/// assert_eq!(validate_currency(" usd ").unwrap(), "USD");
/// assert!(validate_currency("dollars").is_err());
/// ```
pub fn validate_currency(currency: &str) -> ValidationResult<String> {
    let currency = currency.trim();

    if currency.is_empty() {
        return Err(ValidationError::Required {
            field: "currency".to_string(),
        });
    }

    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidFormat {
            field: "currency".to_string(),
            reason: "must be a three-letter code such as BRL".to_string(),
        });
    }

    Ok(currency.to_ascii_uppercase())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Parses a decimal from raw text.
pub fn parse_decimal(field: &str, input: &str) -> ValidationResult<Decimal> {
    Decimal::from_str(input.trim()).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a number such as 50.00".to_string(),
    })
}

/// Validates a percentage discount.
///
/// ## Rules
/// - Must be in `(0, 100]`
pub fn validate_percentage(percentage: Decimal) -> ValidationResult<()> {
    if percentage <= Decimal::ZERO || percentage > Decimal::ONE_HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: "percentage".to_string(),
            min: "0".to_string(),
            max: "100".to_string(),
        });
    }

    Ok(())
}

/// Validates a fixed discount amount.
///
/// ## Rules
/// - Must be strictly positive (after quantization to cents)
pub fn validate_fixed_amount(amount: &Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    Ok(())
}

/// Validates a bound such as a minimum order value or a maximum discount.
///
/// ## Rules
/// - Zero is allowed (means "no bound")
/// - Must not be negative
pub fn validate_non_negative(field: &str, amount: &Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates an optional usage cap.
///
/// ## Rules
/// - `None` means unlimited
/// - `Some(0)` is rejected: a discount that can never be used is a mistake
pub fn validate_max_usage(max_usage_count: Option<u32>) -> ValidationResult<()> {
    if max_usage_count == Some(0) {
        return Err(ValidationError::MustBePositive {
            field: "max_usage_count".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Temporal Validators
// =============================================================================

/// Validates that a validity window does not end before it starts.
pub fn validate_window(
    valid_from: DateTime<Utc>,
    valid_until: Option<DateTime<Utc>>,
) -> ValidationResult<()> {
    if let Some(until) = valid_until {
        if until < valid_from {
            return Err(ValidationError::InvalidRange {
                field: "validity window".to_string(),
            });
        }
    }

    Ok(())
}

/// The expiry instant `days` days after `now`.
///
/// ## Errors
/// `OutOfRange` above [`MAX_VALIDITY_DAYS`], or if the date cannot be
/// represented.
pub fn expiry_after_days(now: DateTime<Utc>, days: u32) -> ValidationResult<DateTime<Utc>> {
    let out_of_range = || ValidationError::OutOfRange {
        field: "validity_days".to_string(),
        min: "0".to_string(),
        max: MAX_VALIDITY_DAYS.to_string(),
    };

    if days > MAX_VALIDITY_DAYS {
        return Err(out_of_range());
    }

    Duration::try_days(i64::from(days))
        .and_then(|validity| now.checked_add_signed(validity))
        .ok_or_else(out_of_range)
}

// =============================================================================
// Unit Tests
// =============================================================================
