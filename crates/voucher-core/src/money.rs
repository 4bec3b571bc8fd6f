//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Exact Decimals With a Currency Tag?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  THE SILENT CURRENCY PROBLEM                                            │
//! │    BRL 50.00 < USD 100.00  → "true"?  ❌ MEANINGLESS!                   │
//! │                                                                         │
//! │  OUR SOLUTION                                                           │
//! │    rust_decimal::Decimal quantized to cents (round half up)             │
//! │    + every binary operation checks the currency and returns an error   │
//! │      on mismatch instead of an answer                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rust_decimal::Decimal;
//! use voucher_core::money::Money;
//!
//! let price = Money::from_cents(1099, "BRL");                     // R$ 10.99
//! let doubled = price.multiply(Decimal::TWO).unwrap();            // R$ 21.98
//! let total = price.add(&Money::from_cents(500, "BRL")).unwrap(); // R$ 15.99
//! assert_eq!(total.amount(), Decimal::new(1599, 2));
//!
//! // Mixing currencies is an error, never a silent answer
//! assert!(price.add(&Money::from_cents(500, "USD")).is_err());
//! # let _ = doubled;
//! ```
//!
//! ## Range
//! Amounts are limited to [`MAX_AMOUNT`], the largest magnitude a `Decimal`
//! can hold with two decimal places. Construction and arithmetic beyond it
//! return `CoreError::Overflow` instead of panicking.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult, ValidationError};

/// Number of decimal places every Money amount is quantized to.
pub const MONEY_SCALE: u32 = 2;

/// Largest magnitude that still fits with [`MONEY_SCALE`] decimal places:
/// `792281625142643375935439503.35`.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(u32::MAX, u32::MAX, u32::MAX, false, MONEY_SCALE);

// =============================================================================
// Money Type
// =============================================================================

/// An exact-decimal monetary value tagged with a currency code.
///
/// ## Design Decisions
/// - **Quantized once**: `new` rounds to cents with round-half-up; the
///   stored amount is never re-rounded on read
/// - **Bounded**: every amount fits in cent precision, so `amount()` always
///   has exactly two decimal places
/// - **No `PartialOrd`, no `Add`/`Sub` operators**: ordering and
///   arithmetic only exist through currency-checked methods returning
///   `CoreResult` ([`Money::add`], [`Money::compare`], [`Money::lt`], ...)
/// - **Structural equality**: amount and currency must both match
///
/// ## User Workflow Context
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                    Where Money is Used                                  │
/// │                                                                         │
/// │  Cart.total ──► Discount.is_valid(min order) ──► Discount.apply        │
/// │                                                     │                   │
/// │                                                     ▼                   │
/// │                                          post-discount total            │
/// │                                                                         │
/// │  EVERY monetary value in the engine flows through this type            │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "MoneyExport", try_from = "MoneyExport")]
pub struct Money {
    amount: Decimal,
    currency: String,
}

impl Money {
    /// Creates a Money value, quantizing the amount to two decimal places.
    ///
    /// ## Rounding
    /// Round half up (away from zero on the midpoint):
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use voucher_core::money::Money;
    ///
    /// let m = Money::new(Decimal::new(10005, 3), "BRL").unwrap(); // 10.005
    /// assert_eq!(m.amount(), Decimal::new(1001, 2));              // 10.01
    /// ```
    ///
    /// ## Errors
    /// `Overflow` if `|amount|` exceeds [`MAX_AMOUNT`].
    pub fn new(amount: Decimal, currency: impl Into<String>) -> CoreResult<Self> {
        Self::quantize(amount, currency.into(), "amount")
    }

    fn quantize(amount: Decimal, currency: String, operation: &str) -> CoreResult<Self> {
        if amount.abs() > MAX_AMOUNT {
            return Err(CoreError::overflow(operation));
        }

        let mut amount =
            amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
        amount.rescale(MONEY_SCALE);

        Ok(Money { amount, currency })
    }

    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use voucher_core::money::Money;
    ///
    /// let price = Money::from_cents(1099, "USD");
    /// assert_eq!(price.amount(), Decimal::new(1099, 2));
    /// ```
    pub fn from_cents(cents: i64, currency: impl Into<String>) -> Self {
        // Any i64 of cents is far inside MAX_AMOUNT.
        Money {
            amount: Decimal::new(cents, MONEY_SCALE),
            currency: currency.into(),
        }
    }

    /// Returns zero in the given currency.
    pub fn zero(currency: impl Into<String>) -> Self {
        Money::from_cents(0, currency)
    }

    /// Parses a decimal string ("50", "50.00", "10.005") into Money.
    ///
    /// ## Errors
    /// - `InvalidArgument` if the input is not a decimal number
    /// - `Overflow` if it is beyond [`MAX_AMOUNT`]
    pub fn parse(input: &str, currency: impl Into<String>) -> CoreResult<Self> {
        let amount = Decimal::from_str(input.trim()).map_err(|e| {
            ValidationError::InvalidFormat {
                field: "amount".to_string(),
                reason: e.to_string(),
            }
        })?;

        Money::new(amount, currency)
    }

    /// The quantized amount (always two decimal places).
    #[inline]
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// The currency code.
    #[inline]
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// Checks whether `other` carries the same currency.
    #[inline]
    pub fn same_currency(&self, other: &Money) -> bool {
        self.currency == other.currency
    }

    fn ensure_same_currency(&self, other: &Money) -> CoreResult<()> {
        if self.same_currency(other) {
            Ok(())
        } else {
            Err(CoreError::currency_mismatch(&self.currency, &other.currency))
        }
    }

    // -------------------------------------------------------------------------
    // Arithmetic
    // -------------------------------------------------------------------------

    /// Adds two values of the same currency.
    ///
    /// ## Errors
    /// `CurrencyMismatch`, or `Overflow` past [`MAX_AMOUNT`].
    pub fn add(&self, other: &Money) -> CoreResult<Money> {
        self.ensure_same_currency(other)?;
        let sum = self
            .amount
            .checked_add(other.amount)
            .ok_or_else(|| CoreError::overflow("addition"))?;
        Self::quantize(sum, self.currency.clone(), "addition")
    }

    /// Subtracts `other` from `self` (same currency only).
    pub fn subtract(&self, other: &Money) -> CoreResult<Money> {
        self.ensure_same_currency(other)?;
        let difference = self
            .amount
            .checked_sub(other.amount)
            .ok_or_else(|| CoreError::overflow("subtraction"))?;
        Self::quantize(difference, self.currency.clone(), "subtraction")
    }

    /// Multiplies by a dimensionless scalar; currency is preserved.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use voucher_core::money::Money;
    ///
    /// let total = Money::from_cents(10000, "BRL");
    /// let ten_percent = total.multiply(Decimal::new(10, 2)).unwrap();
    /// assert_eq!(ten_percent, Money::from_cents(1000, "BRL"));
    /// ```
    ///
    /// ## Errors
    /// `Overflow` past [`MAX_AMOUNT`].
    pub fn multiply(&self, factor: Decimal) -> CoreResult<Money> {
        let product = self
            .amount
            .checked_mul(factor)
            .ok_or_else(|| CoreError::overflow("multiplication"))?;
        Self::quantize(product, self.currency.clone(), "multiplication")
    }

    /// Divides by a dimensionless scalar; currency is preserved.
    ///
    /// ## Errors
    /// - `DivisionByZero` if `divisor` is zero
    /// - `Overflow` past [`MAX_AMOUNT`] (tiny divisors)
    pub fn divide(&self, divisor: Decimal) -> CoreResult<Money> {
        if divisor.is_zero() {
            return Err(CoreError::DivisionByZero);
        }
        let quotient = self
            .amount
            .checked_div(divisor)
            .ok_or_else(|| CoreError::overflow("division"))?;
        Self::quantize(quotient, self.currency.clone(), "division")
    }

    // -------------------------------------------------------------------------
    // Currency-checked ordering
    // -------------------------------------------------------------------------

    /// Compares two values of the same currency.
    pub fn compare(&self, other: &Money) -> CoreResult<Ordering> {
        self.ensure_same_currency(other)?;
        Ok(self.amount.cmp(&other.amount))
    }

    /// `self < other`
    pub fn lt(&self, other: &Money) -> CoreResult<bool> {
        Ok(self.compare(other)? == Ordering::Less)
    }

    /// `self <= other`
    pub fn le(&self, other: &Money) -> CoreResult<bool> {
        Ok(self.compare(other)? != Ordering::Greater)
    }

    /// `self > other`
    pub fn gt(&self, other: &Money) -> CoreResult<bool> {
        Ok(self.compare(other)? == Ordering::Greater)
    }

    /// `self >= other`
    pub fn ge(&self, other: &Money) -> CoreResult<bool> {
        Ok(self.compare(other)? != Ordering::Less)
    }

    /// The smaller of two values of the same currency.
    pub fn min(&self, other: &Money) -> CoreResult<Money> {
        Ok(if self.le(other)? { self.clone() } else { other.clone() })
    }

    /// The larger of two values of the same currency.
    pub fn max(&self, other: &Money) -> CoreResult<Money> {
        Ok(if self.ge(other)? { self.clone() } else { other.clone() })
    }

    /// Structured export: amount as a JSON number plus the currency code.
    pub fn export(&self) -> MoneyExport {
        MoneyExport::from(self.clone())
    }
}

// =============================================================================
// Export Shape
// =============================================================================

/// Serialized shape of [`Money`].
///
/// ```json
/// { "amount": 10.5, "currency": "BRL" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoneyExport {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
}

impl From<Money> for MoneyExport {
    fn from(money: Money) -> Self {
        MoneyExport {
            amount: money.amount,
            currency: money.currency,
        }
    }
}

/// Deserialized values go back through `Money::new`, so they are quantized
/// and range-checked too.
impl TryFrom<MoneyExport> for Money {
    type Error = CoreError;

    fn try_from(export: MoneyExport) -> CoreResult<Self> {
        Money::new(export.amount, export.currency)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money the way the terminal front-end prints it.
///
/// BRL uses its symbol (`R$ 10.50`); other currencies print the code
/// (`USD 10.50`).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.currency == "BRL" {
            write!(f, "R$ {:.2}", self.amount)
        } else {
            write!(f, "{} {:.2}", self.currency, self.amount)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn brl(amount: Decimal) -> Money {
        Money::new(amount, "BRL").unwrap()
    }

    #[test]
    fn test_quantizes_half_up() {
        assert_eq!(brl(dec!(10.005)).amount(), dec!(10.01));
        assert_eq!(brl(dec!(10.004)).amount(), dec!(10.00));
        assert_eq!(brl(dec!(-10.005)).amount(), dec!(-10.01));
        assert_eq!(brl(dec!(2.675)).amount(), dec!(2.68));
    }

    #[test]
    fn test_amount_always_has_two_places() {
        assert_eq!(brl(dec!(10)).amount().scale(), 2);
        assert_eq!(brl(dec!(10.5)).amount().to_string(), "10.50");
    }

    #[test]
    fn test_parse() {
        let m = Money::parse(" 50.005 ", "BRL").unwrap();
        assert_eq!(m.amount(), dec!(50.01));

        let err = Money::parse("fifty", "BRL").unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
    }

    #[test]
    fn test_display() {
        assert_eq!(brl(dec!(10.5)).to_string(), "R$ 10.50");
        assert_eq!(Money::from_cents(-550, "USD").to_string(), "USD -5.50");
        assert_eq!(Money::zero("EUR").to_string(), "EUR 0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = brl(dec!(10.00));
        let b = brl(dec!(5.00));

        assert_eq!(a.add(&b).unwrap(), brl(dec!(15.00)));
        assert_eq!(a.subtract(&b).unwrap(), brl(dec!(5.00)));
        assert_eq!(b.subtract(&a).unwrap(), brl(dec!(-5.00)));
        assert_eq!(a.multiply(dec!(3)).unwrap(), brl(dec!(30.00)));
    }

    #[test]
    fn test_amounts_beyond_cent_precision_are_rejected() {
        assert!(matches!(
            Money::new(Decimal::MAX, "BRL"),
            Err(CoreError::Overflow { .. })
        ));
        assert!(matches!(
            Money::parse("-79228162514264337593543950335", "BRL"),
            Err(CoreError::Overflow { .. })
        ));

        let max = Money::new(MAX_AMOUNT, "BRL").unwrap();
        assert_eq!(max.amount().scale(), 2);
        assert_eq!(max.amount(), MAX_AMOUNT);
    }

    #[test]
    fn test_arithmetic_overflow_is_an_error() {
        let max = Money::new(MAX_AMOUNT, "BRL").unwrap();
        let cent = Money::from_cents(1, "BRL");

        assert!(matches!(max.add(&cent), Err(CoreError::Overflow { .. })));
        assert!(matches!(
            max.multiply(Decimal::TWO),
            Err(CoreError::Overflow { .. })
        ));
        assert!(matches!(
            max.divide(dec!(0.5)),
            Err(CoreError::Overflow { .. })
        ));

        let min = Money::new(-MAX_AMOUNT, "BRL").unwrap();
        assert!(matches!(min.subtract(&cent), Err(CoreError::Overflow { .. })));

        // Up to the boundary itself everything still works.
        let almost = max.subtract(&cent).unwrap();
        assert_eq!(almost.add(&cent).unwrap(), max);
    }

    #[test]
    fn test_currency_mismatch_fails() {
        let brl = Money::from_cents(1000, "BRL");
        let usd = Money::from_cents(1000, "USD");

        assert!(matches!(
            brl.add(&usd),
            Err(CoreError::CurrencyMismatch { .. })
        ));
        assert!(matches!(
            brl.subtract(&usd),
            Err(CoreError::CurrencyMismatch { .. })
        ));
        assert!(matches!(brl.lt(&usd), Err(CoreError::CurrencyMismatch { .. })));
        assert!(matches!(brl.ge(&usd), Err(CoreError::CurrencyMismatch { .. })));
        assert!(matches!(brl.min(&usd), Err(CoreError::CurrencyMismatch { .. })));
    }

    #[test]
    fn test_equality_is_structural() {
        assert_eq!(Money::from_cents(1000, "BRL"), Money::from_cents(1000, "BRL"));
        assert_ne!(Money::from_cents(1000, "BRL"), Money::from_cents(1000, "USD"));
        assert_ne!(Money::from_cents(1000, "BRL"), Money::from_cents(1001, "BRL"));
    }

    #[test]
    fn test_divide() {
        let ten = brl(dec!(10.00));
        assert_eq!(ten.divide(dec!(3)).unwrap(), brl(dec!(3.33)));
        assert_eq!(ten.divide(dec!(0.5)).unwrap(), brl(dec!(20.00)));
        assert!(matches!(ten.divide(Decimal::ZERO), Err(CoreError::DivisionByZero)));
    }

    #[test]
    fn test_comparisons() {
        let small = brl(dec!(50.00));
        let large = brl(dec!(100.00));

        assert!(small.lt(&large).unwrap());
        assert!(small.le(&small).unwrap());
        assert!(large.gt(&small).unwrap());
        assert!(large.ge(&large).unwrap());
        assert_eq!(small.min(&large).unwrap(), small);
        assert_eq!(small.max(&large).unwrap(), large);
    }

    #[test]
    fn test_sign_checks() {
        let zero = Money::zero("BRL");
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let positive = Money::from_cents(100, "BRL");
        assert!(positive.is_positive());

        let negative = Money::from_cents(-100, "BRL");
        assert!(negative.is_negative());
    }

    #[test]
    fn test_export_and_serde() {
        let money = brl(dec!(10.5));
        let export = money.export();
        assert_eq!(export.amount, dec!(10.50));
        assert_eq!(export.currency, "BRL");

        let json = serde_json::to_value(&money).unwrap();
        assert_eq!(json, serde_json::json!({ "amount": 10.5, "currency": "BRL" }));

        let back: Money = serde_json::from_value(json).unwrap();
        assert_eq!(back, money);

        let too_large = serde_json::json!({ "amount": 1e30, "currency": "BRL" });
        assert!(serde_json::from_value::<Money>(too_large).is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: construction is idempotent (no cumulative re-rounding).
            #[test]
            fn quantization_is_idempotent(mantissa in -1_000_000_000i64..1_000_000_000i64, scale in 0u32..6) {
                let once = Money::new(Decimal::new(mantissa, scale), "BRL").unwrap();
                let twice = Money::new(once.amount(), "BRL").unwrap();
                prop_assert_eq!(once.amount().scale(), 2);
                prop_assert_eq!(once, twice);
            }

            /// Property: same-currency arithmetic never fails, mixed always does.
            #[test]
            fn currency_checks_are_total(a in -1_000_000i64..1_000_000i64, b in -1_000_000i64..1_000_000i64) {
                let x = Money::from_cents(a, "BRL");
                let y = Money::from_cents(b, "BRL");
                let z = Money::from_cents(b, "USD");

                prop_assert_eq!(x.add(&y).unwrap().amount(), Decimal::new(a + b, 2));
                prop_assert!(x.subtract(&y).is_ok());
                prop_assert!(x.compare(&y).is_ok());

                prop_assert!(matches!(x.add(&z), Err(CoreError::CurrencyMismatch { .. })), "add across currencies must fail");
                prop_assert!(matches!(x.subtract(&z), Err(CoreError::CurrencyMismatch { .. })), "subtract across currencies must fail");
                prop_assert!(matches!(x.compare(&z), Err(CoreError::CurrencyMismatch { .. })), "compare across currencies must fail");
            }
        }
    }
}
