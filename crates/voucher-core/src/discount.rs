//! # Discount Module
//!
//! The `Discount` entity: its validity gates and its valuation rules.
//!
//! ## Valuation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Discount::apply_at(order, now)                      │
//! │                                                                         │
//! │  is_valid_at(order, now)?                                               │
//! │   ├── now >= valid_from                                                 │
//! │   ├── valid_until unset OR now <= valid_until                           │
//! │   ├── max_usage_count unset OR current < max                            │
//! │   └── order >= minimum_order_value      (currency mismatch = Err)       │
//! │        │                                                                │
//! │        ├── no ──► order returned unchanged                              │
//! │        ▼                                                                │
//! │  match discount_type                                                    │
//! │   ├── Percentage  ──► order × value/100, clamped to maximum (if set)    │
//! │   ├── FixedAmount ─┐                                                    │
//! │   └── Coupon ──────┴► min(value, order)                                 │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  order - discount_amount   (never below zero)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `Discount` is synchronous and free of I/O. Time is always passed in,
//! either as an instant (`*_at` methods) or through a [`Clock`].
//!
//! ## Example
//! ```rust
//! use chrono::Utc;
//! use rust_decimal::Decimal;
//! use voucher_core::discount::{Discount, DiscountTerms, DiscountType};
//! use voucher_core::money::Money;
//!
//! let now = Utc::now();
//! let ten_percent = Discount::new(
//!     DiscountType::Percentage,
//!     Decimal::TEN,
//!     "BRL",
//!     DiscountTerms::new(),
//!     now,
//! )
//! .unwrap();
//!
//! let total = ten_percent
//!     .apply_at(&Money::from_cents(10000, "BRL"), now)
//!     .unwrap();
//! assert_eq!(total, Money::from_cents(9000, "BRL"));
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::{
    validate_code, validate_currency, validate_description, validate_fixed_amount,
    validate_max_usage, validate_non_negative, validate_percentage, validate_window,
};

// =============================================================================
// Discount Type
// =============================================================================

/// The kind of discount, which decides how `value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    /// `value` is a percentage in `(0, 100]`.
    Percentage,
    /// `value` is an amount in the discount's currency.
    FixedAmount,
    /// Like `FixedAmount`, but redeemed through a human-entered code.
    Coupon,
}

impl DiscountType {
    /// The stored/serialized name (`PERCENTAGE`, `FIXED_AMOUNT`, `COUPON`).
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "PERCENTAGE",
            DiscountType::FixedAmount => "FIXED_AMOUNT",
            DiscountType::Coupon => "COUPON",
        }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscountType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PERCENTAGE" => Ok(DiscountType::Percentage),
            "FIXED_AMOUNT" => Ok(DiscountType::FixedAmount),
            "COUPON" => Ok(DiscountType::Coupon),
            _ => Err(ValidationError::InvalidFormat {
                field: "discount_type".to_string(),
                reason: format!("unknown discount type '{}'", s),
            }),
        }
    }
}

// =============================================================================
// Discount Status
// =============================================================================

/// Lifecycle state of a discount at a given instant, for listings.
///
/// Unlike [`Discount::is_valid_at`] this ignores the order value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountStatus {
    /// `valid_from` is still in the future.
    Scheduled,
    /// Redeemable (subject to the minimum order value).
    Active,
    /// `valid_until` has passed.
    Expired,
    /// The usage cap has been reached.
    Exhausted,
}

impl fmt::Display for DiscountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DiscountStatus::Scheduled => "scheduled",
            DiscountStatus::Active => "active",
            DiscountStatus::Expired => "expired",
            DiscountStatus::Exhausted => "exhausted",
        };
        f.write_str(label)
    }
}

// =============================================================================
// Discount Terms
// =============================================================================

/// Optional creation parameters shared by every discount type.
///
/// ## Example
/// ```rust
/// use voucher_core::discount::DiscountTerms;
/// use voucher_core::money::Money;
///
/// let terms = DiscountTerms::new()
///     .with_code("SAVE10")
///     .with_minimum_order_value(Money::from_cents(10000, "BRL"))
///     .with_max_usage_count(100);
/// assert_eq!(terms.code.as_deref(), Some("SAVE10"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscountTerms {
    pub code: Option<String>,
    pub description: String,
    /// Defaults to zero in the discount's currency.
    pub minimum_order_value: Option<Money>,
    /// Percentage discounts only. Zero or `None` means no cap.
    pub maximum_discount_amount: Option<Money>,
    /// Defaults to the creation instant.
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub max_usage_count: Option<u32>,
}

impl DiscountTerms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_minimum_order_value(mut self, minimum: Money) -> Self {
        self.minimum_order_value = Some(minimum);
        self
    }

    pub fn with_maximum_discount_amount(mut self, maximum: Money) -> Self {
        self.maximum_discount_amount = Some(maximum);
        self
    }

    pub fn with_valid_from(mut self, valid_from: DateTime<Utc>) -> Self {
        self.valid_from = Some(valid_from);
        self
    }

    pub fn with_valid_until(mut self, valid_until: DateTime<Utc>) -> Self {
        self.valid_until = Some(valid_until);
        self
    }

    pub fn with_max_usage_count(mut self, max_usage_count: u32) -> Self {
        self.max_usage_count = Some(max_usage_count);
        self
    }
}

// =============================================================================
// Discount
// =============================================================================

/// A rule that reduces an order's monetary total.
///
/// ## Invariants
/// - `value > 0` for FixedAmount/Coupon, `0 < value <= 100` for Percentage
/// - `minimum_order_value` and `maximum_discount_amount` are non-negative
///   and in `currency`
/// - `current_usage_count` only grows, and never passes `max_usage_count`
///   once persisted (the store refuses the write)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    /// Unique identifier (UUID v4).
    pub id: Uuid,

    pub discount_type: DiscountType,

    /// Percentage points for Percentage, an amount in `currency` otherwise.
    pub value: Decimal,

    /// Currency of `value`, the minimum and the maximum.
    pub currency: String,

    /// Human-entered code, unique within a store.
    pub code: Option<String>,

    pub description: String,

    /// Orders below this value are not eligible. Zero means no minimum.
    pub minimum_order_value: Money,

    /// Cap on a percentage discount. Zero means unbounded.
    pub maximum_discount_amount: Money,

    pub valid_from: DateTime<Utc>,

    /// `None` means the discount never expires.
    pub valid_until: Option<DateTime<Utc>>,

    /// `None` means unlimited redemptions.
    pub max_usage_count: Option<u32>,

    /// Successful redemptions so far.
    pub current_usage_count: u32,

    pub created_at: DateTime<Utc>,
}

impl Discount {
    /// Builds a new discount, validating every parameter.
    ///
    /// ## Errors
    /// - `InvalidArgument` for an out-of-range value, a bad currency or
    ///   code, a negative bound, an inverted window or a zero usage cap
    /// - `InvalidArgument` for a Coupon without a code
    /// - `CurrencyMismatch` if a bound is in a different currency
    pub fn new(
        discount_type: DiscountType,
        value: Decimal,
        currency: &str,
        terms: DiscountTerms,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        let currency = validate_currency(currency)?;

        let value = match discount_type {
            DiscountType::Percentage => {
                validate_percentage(value)?;
                value
            }
            DiscountType::FixedAmount | DiscountType::Coupon => {
                let amount = Money::new(value, currency.as_str())?;
                validate_fixed_amount(&amount)?;
                amount.amount()
            }
        };

        let code = terms.code.as_deref().map(validate_code).transpose()?;
        if discount_type == DiscountType::Coupon && code.is_none() {
            return Err(ValidationError::Required {
                field: "code".to_string(),
            }
            .into());
        }

        let description = validate_description(&terms.description)?;

        let minimum_order_value =
            Self::bound(terms.minimum_order_value, &currency, "minimum_order_value")?;
        let maximum_discount_amount = Self::bound(
            terms.maximum_discount_amount,
            &currency,
            "maximum_discount_amount",
        )?;

        let valid_from = terms.valid_from.unwrap_or(now);
        validate_window(valid_from, terms.valid_until)?;
        validate_max_usage(terms.max_usage_count)?;

        Ok(Discount {
            id: Uuid::new_v4(),
            discount_type,
            value,
            currency,
            code,
            description,
            minimum_order_value,
            maximum_discount_amount,
            valid_from,
            valid_until: terms.valid_until,
            max_usage_count: terms.max_usage_count,
            current_usage_count: 0,
            created_at: now,
        })
    }

    fn bound(bound: Option<Money>, currency: &str, field: &str) -> CoreResult<Money> {
        match bound {
            None => Ok(Money::zero(currency)),
            Some(money) => {
                if money.currency() != currency {
                    return Err(CoreError::currency_mismatch(currency, money.currency()));
                }
                validate_non_negative(field, &money)?;
                Ok(money)
            }
        }
    }

    /// `value` as Money, for FixedAmount and Coupon discounts.
    ///
    /// ## Errors
    /// `Overflow` if `value` was set beyond the Money range after
    /// construction.
    pub fn value_as_money(&self) -> CoreResult<Money> {
        Money::new(self.value, self.currency.as_str())
    }

    /// Short human-readable magnitude: `10%` or `R$ 15.00`.
    pub fn value_label(&self) -> String {
        match self.discount_type {
            DiscountType::Percentage => format!("{}%", self.value.normalize()),
            DiscountType::FixedAmount | DiscountType::Coupon => match self.value_as_money() {
                Ok(money) => money.to_string(),
                Err(_) => format!("{} {}", self.currency, self.value),
            },
        }
    }

    // -------------------------------------------------------------------------
    // Validity
    // -------------------------------------------------------------------------

    /// Explains why the discount cannot be applied to `order_value` at `now`,
    /// or `None` if it can.
    ///
    /// The minimum-order comparison runs first, so a currency mismatch is
    /// always reported as an error regardless of the other gates.
    pub fn rejection_reason_at(
        &self,
        order_value: &Money,
        now: DateTime<Utc>,
    ) -> CoreResult<Option<String>> {
        let meets_minimum = order_value.ge(&self.minimum_order_value)?;

        if now < self.valid_from {
            return Ok(Some("not active yet".to_string()));
        }
        if self.is_expired_at(now) {
            return Ok(Some("expired".to_string()));
        }
        if self.is_exhausted() {
            return Ok(Some("usage limit reached".to_string()));
        }
        if !meets_minimum {
            return Ok(Some(format!(
                "order value below minimum of {}",
                self.minimum_order_value
            )));
        }

        Ok(None)
    }

    /// Whether the discount applies to `order_value` at `now`.
    ///
    /// No side effects: calling it any number of times leaves
    /// `current_usage_count` untouched.
    ///
    /// ## Errors
    /// `CurrencyMismatch` if `order_value` is not in the discount's currency.
    pub fn is_valid_at(&self, order_value: &Money, now: DateTime<Utc>) -> CoreResult<bool> {
        Ok(self.rejection_reason_at(order_value, now)?.is_none())
    }

    /// [`Discount::is_valid_at`] using the given clock.
    pub fn is_valid(&self, order_value: &Money, clock: &dyn Clock) -> CoreResult<bool> {
        self.is_valid_at(order_value, clock.now())
    }

    // -------------------------------------------------------------------------
    // Valuation
    // -------------------------------------------------------------------------

    /// The amount taken off `order_value` at `now`. Zero when invalid.
    pub fn discount_amount_at(&self, order_value: &Money, now: DateTime<Utc>) -> CoreResult<Money> {
        if !self.is_valid_at(order_value, now)? {
            return Ok(Money::zero(order_value.currency()));
        }

        let amount = match self.discount_type {
            DiscountType::Percentage => {
                let raw = order_value.multiply(self.value / Decimal::ONE_HUNDRED)?;
                if self.maximum_discount_amount.is_zero() {
                    raw
                } else {
                    raw.min(&self.maximum_discount_amount)?
                }
            }
            DiscountType::FixedAmount | DiscountType::Coupon => {
                self.value_as_money()?.min(order_value)?
            }
        };

        // A valid order is >= its non-negative minimum, so this keeps the
        // post-discount total at or above zero.
        amount.min(order_value)
    }

    /// The post-discount total for `order_value` at `now`.
    ///
    /// Returns `order_value` unchanged when the discount is not valid.
    /// Always equals `order_value - discount_amount_at(order_value, now)`.
    pub fn apply_at(&self, order_value: &Money, now: DateTime<Utc>) -> CoreResult<Money> {
        let amount = self.discount_amount_at(order_value, now)?;
        order_value.subtract(&amount)
    }

    /// [`Discount::apply_at`] using the given clock.
    pub fn apply(&self, order_value: &Money, clock: &dyn Clock) -> CoreResult<Money> {
        self.apply_at(order_value, clock.now())
    }

    // -------------------------------------------------------------------------
    // Usage
    // -------------------------------------------------------------------------

    /// Records one redemption. Does not re-validate.
    pub fn mark_used(&mut self) {
        self.current_usage_count = self.current_usage_count.saturating_add(1);
    }

    /// Redemptions left, or `None` when unlimited.
    pub fn remaining_uses(&self) -> Option<u32> {
        self.max_usage_count
            .map(|max| max.saturating_sub(self.current_usage_count))
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_uses() == Some(0)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.map_or(false, |until| now > until)
    }

    /// Lifecycle state at `now`, independent of any order value.
    pub fn status_at(&self, now: DateTime<Utc>) -> DiscountStatus {
        if self.is_exhausted() {
            DiscountStatus::Exhausted
        } else if self.is_expired_at(now) {
            DiscountStatus::Expired
        } else if now < self.valid_from {
            DiscountStatus::Scheduled
        } else {
            DiscountStatus::Active
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
