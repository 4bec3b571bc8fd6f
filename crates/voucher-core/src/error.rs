//! # Error Types
//!
//! Domain-specific error types for voucher-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  voucher-core errors (this file)                                       │
//! │  ├── CoreError        - Money, valuation and service failures          │
//! │  ├── ValidationError  - Malformed creation parameters                  │
//! │  └── StoreError       - What a DiscountStore may report                │
//! │                                                                         │
//! │  voucher-db errors (separate crate)                                    │
//! │  └── DbError          - SQLite failures, converted into StoreError     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ← StoreError ← DbError              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (currency, id, code)
//! 3. Errors are enum variants, never String
//! 4. No retry logic lives here: every failure is surfaced to the caller

use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// Core Error
// =============================================================================

/// Discount engine errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Creation parameters are malformed (wraps ValidationError).
    ///
    /// ## When This Occurs
    /// - Percentage outside `(0, 100]`
    /// - Non-positive fixed amount
    /// - Empty coupon code
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] ValidationError),

    /// Two Money values with different currencies met in one operation.
    ///
    /// This is a programming error on the caller's side: the engine never
    /// converts currencies.
    #[error("Currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch { expected: String, found: String },

    /// Money divided by a zero scalar.
    #[error("Division by zero")]
    DivisionByZero,

    /// An amount, or the result of Money arithmetic, does not fit in
    /// cent precision (about ±7.9 × 10^26).
    #[error("Amount out of range in {operation}")]
    Overflow { operation: String },

    /// Lookup by id or code yielded nothing.
    #[error("{entity} not found: {key}")]
    NotFound { entity: String, key: String },

    /// The discount exists but fails a validity gate at redemption time.
    ///
    /// ## User Workflow
    /// ```text
    /// apply_discount_to_cart(total, id)
    ///      │
    ///      ▼
    /// is_valid(total)? ── no ──► InvalidDiscount { id, reason: "expired" }
    ///      │                          (nothing was mutated or persisted)
    ///     yes
    ///      ▼
    /// mark_used() + persist
    /// ```
    #[error("Discount {id} cannot be applied: {reason}")]
    InvalidDiscount { id: Uuid, reason: String },

    /// Another redemption changed the usage counter between our read and
    /// our write. The store rejected the conditional update.
    #[error("Discount {id} was redeemed concurrently, usage not recorded")]
    UsageConflict { id: Uuid },

    /// The discount store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl CoreError {
    /// Creates a CurrencyMismatch error.
    pub fn currency_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        CoreError::CurrencyMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Creates an Overflow error for the named operation.
    pub fn overflow(operation: impl Into<String>) -> Self {
        CoreError::Overflow {
            operation: operation.into(),
        }
    }

    /// Creates a NotFound error for a given entity type and key.
    pub fn not_found(entity: impl Into<String>, key: impl ToString) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            key: key.to_string(),
        }
    }

    /// Whether the error comes from bad caller input rather than system state.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidArgument(_)
                | CoreError::NotFound { .. }
                | CoreError::InvalidDiscount { .. }
                | CoreError::Overflow { .. }
                | CoreError::Store(StoreError::DuplicateCode(_))
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when creation parameters don't meet requirements.
/// Used for early validation before any discount is built or persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be greater than {min} and at most {max}")]
    OutOfRange { field: String, min: String, max: String },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or positive.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., unparseable number, bad currency code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A range whose end precedes its start.
    #[error("{field} ends before it starts")]
    InvalidRange { field: String },
}

// =============================================================================
// Store Error
// =============================================================================

/// Errors a `DiscountStore` implementation may report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Another discount already owns this code.
    #[error("Discount code '{0}' already exists")]
    DuplicateCode(String),

    /// The backing storage failed (connection, query, corrupt row...).
    #[error("{0}")]
    Backend(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Convenience type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::currency_mismatch("BRL", "USD");
        assert_eq!(err.to_string(), "Currency mismatch: expected BRL, found USD");

        let err = CoreError::not_found("Discount", "SAVE10");
        assert_eq!(err.to_string(), "Discount not found: SAVE10");

        let err = CoreError::overflow("multiplication");
        assert_eq!(err.to_string(), "Amount out of range in multiplication");
        assert!(err.is_user_error());
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "code".to_string(),
        };
        assert_eq!(err.to_string(), "code is required");

        let err = ValidationError::OutOfRange {
            field: "percentage".to_string(),
            min: "0".to_string(),
            max: "100".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "percentage must be greater than 0 and at most 100"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "amount".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::InvalidArgument(_)));
        assert!(core_err.is_user_error());
    }

    #[test]
    fn test_store_error_converts_to_core_error() {
        let core_err: CoreError = StoreError::Backend("disk full".to_string()).into();
        assert!(matches!(core_err, CoreError::Store(_)));
        assert!(!core_err.is_user_error());
        assert_eq!(core_err.to_string(), "Store error: disk full");
    }
}
