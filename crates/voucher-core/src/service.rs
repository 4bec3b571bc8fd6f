//! # Discount Service
//!
//! Orchestrates discount creation and redemption between a
//! [`DiscountStore`] and the valuation rules on [`Discount`].
//!
//! ## Redemption Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apply_discount_to_cart(cart_total, id)                                 │
//! │                                                                         │
//! │  store.get_by_id(id) ─── None ───────────────────► NotFound             │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  rejection_reason_at(total, clock.now()) ── Some ─► InvalidDiscount     │
//! │        │                                          (nothing written)     │
//! │        ▼                                                                │
//! │  apply_at ──► mark_used                                                 │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  store.record_usage(d, expected) ── false ───────► UsageConflict        │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  post-discount total                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::discount::{Discount, DiscountTerms, DiscountType};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::store::DiscountStore;
use crate::validation::{validate_code, validate_fixed_amount, validate_percentage};

// =============================================================================
// Preview
// =============================================================================

/// What a coupon would do to an order, without redeeming it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscountPreview {
    pub discount: Discount,
    pub original_total: Money,
    pub discount_amount: Money,
    pub final_total: Money,
    /// `None` when the discount has no usage cap.
    pub remaining_uses: Option<u32>,
}

// =============================================================================
// Service
// =============================================================================

/// Discount use cases over a store and a clock.
#[derive(Clone)]
pub struct DiscountService {
    store: Arc<dyn DiscountStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for DiscountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscountService")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl DiscountService {
    pub fn new(store: Arc<dyn DiscountStore>, clock: Arc<dyn Clock>) -> Self {
        DiscountService { store, clock }
    }

    /// A service reading the real system clock.
    pub fn with_system_clock(store: Arc<dyn DiscountStore>) -> Self {
        Self::new(store, Arc::new(SystemClock))
    }

    /// The current instant according to the service's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // -------------------------------------------------------------------------
    // Redemption
    // -------------------------------------------------------------------------

    /// Applies a discount to a cart total and records one usage.
    ///
    /// ## Errors
    /// - `NotFound` if no discount has this id
    /// - `InvalidDiscount` if a validity gate fails (nothing is persisted)
    /// - `CurrencyMismatch` if the total is in another currency
    /// - `UsageConflict` if a concurrent redemption changed the counter first
    pub async fn apply_discount_to_cart(
        &self,
        cart_total: &Money,
        discount_id: Uuid,
    ) -> CoreResult<Money> {
        let discount = self
            .store
            .get_by_id(discount_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Discount", discount_id))?;

        self.redeem(discount, cart_total).await
    }

    /// Like [`DiscountService::apply_discount_to_cart`], looking the
    /// discount up by code.
    pub async fn apply_code_to_cart(&self, cart_total: &Money, code: &str) -> CoreResult<Money> {
        let discount = self
            .store
            .get_by_code(code.trim())
            .await?
            .ok_or_else(|| CoreError::not_found("Discount", code.trim()))?;

        self.redeem(discount, cart_total).await
    }

    async fn redeem(&self, mut discount: Discount, cart_total: &Money) -> CoreResult<Money> {
        let now = self.clock.now();

        if let Some(reason) = discount.rejection_reason_at(cart_total, now)? {
            warn!(discount_id = %discount.id, %reason, "Discount rejected");
            return Err(CoreError::InvalidDiscount {
                id: discount.id,
                reason,
            });
        }

        let total = discount.apply_at(cart_total, now)?;

        let expected_usage_count = discount.current_usage_count;
        discount.mark_used();
        if !self
            .store
            .record_usage(&discount, expected_usage_count)
            .await?
        {
            warn!(discount_id = %discount.id, "Concurrent redemption detected");
            return Err(CoreError::UsageConflict { id: discount.id });
        }

        info!(
            discount_id = %discount.id,
            cart_total = %cart_total,
            final_total = %total,
            usage = discount.current_usage_count,
            "Discount applied"
        );

        Ok(total)
    }

    // -------------------------------------------------------------------------
    // Coupon lookup
    // -------------------------------------------------------------------------

    /// The discount registered under `code`, if it exists and is valid for
    /// `order_value` right now. Never consumes a usage.
    pub async fn validate_coupon_code(
        &self,
        code: &str,
        order_value: &Money,
    ) -> CoreResult<Option<Discount>> {
        let Some(discount) = self.store.get_by_code(code.trim()).await? else {
            debug!(code = %code, "Coupon code not found");
            return Ok(None);
        };

        if discount.is_valid_at(order_value, self.clock.now())? {
            Ok(Some(discount))
        } else {
            debug!(code = %code, "Coupon code not valid for order");
            Ok(None)
        }
    }

    /// Shows what `code` would do to `order_value`. `None` if the code is
    /// unknown or not valid for this order.
    pub async fn preview_discount(
        &self,
        code: &str,
        order_value: &Money,
    ) -> CoreResult<Option<DiscountPreview>> {
        let Some(discount) = self.validate_coupon_code(code, order_value).await? else {
            return Ok(None);
        };

        let now = self.clock.now();
        let discount_amount = discount.discount_amount_at(order_value, now)?;
        let final_total = order_value.subtract(&discount_amount)?;
        let remaining_uses = discount.remaining_uses();

        Ok(Some(DiscountPreview {
            discount,
            original_total: order_value.clone(),
            discount_amount,
            final_total,
            remaining_uses,
        }))
    }

    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    /// Creates and persists a percentage discount.
    ///
    /// ## Errors
    /// - `InvalidArgument` unless `0 < percentage <= 100`, or if a term is invalid
    /// - `Store(DuplicateCode)` if the code is taken
    pub async fn create_percentage_discount(
        &self,
        percentage: Decimal,
        currency: &str,
        terms: DiscountTerms,
    ) -> CoreResult<Discount> {
        validate_percentage(percentage)?;
        let discount = Discount::new(
            DiscountType::Percentage,
            percentage,
            currency,
            terms,
            self.clock.now(),
        )?;
        self.persist_new(discount).await
    }

    /// Creates and persists a fixed-amount discount.
    ///
    /// ## Errors
    /// - `InvalidArgument` unless `amount > 0`, or if a term is invalid
    /// - `Store(DuplicateCode)` if the code is taken
    pub async fn create_fixed_amount_discount(
        &self,
        amount: &Money,
        terms: DiscountTerms,
    ) -> CoreResult<Discount> {
        validate_fixed_amount(amount)?;
        let discount = Discount::new(
            DiscountType::FixedAmount,
            amount.amount(),
            amount.currency(),
            terms,
            self.clock.now(),
        )?;
        self.persist_new(discount).await
    }

    /// Creates and persists a coupon: a fixed amount redeemed by `code`.
    pub async fn create_coupon_discount(
        &self,
        amount: &Money,
        code: &str,
        terms: DiscountTerms,
    ) -> CoreResult<Discount> {
        validate_fixed_amount(amount)?;
        let code = validate_code(code)?;
        let discount = Discount::new(
            DiscountType::Coupon,
            amount.amount(),
            amount.currency(),
            terms.with_code(code),
            self.clock.now(),
        )?;
        self.persist_new(discount).await
    }

    async fn persist_new(&self, discount: Discount) -> CoreResult<Discount> {
        let saved = self.store.save(&discount).await?;
        info!(
            discount_id = %saved.id,
            discount_type = %saved.discount_type,
            code = ?saved.code,
            "Created discount"
        );
        Ok(saved)
    }

    // -------------------------------------------------------------------------
    // Queries and removal
    // -------------------------------------------------------------------------

    pub async fn get_discount(&self, id: Uuid) -> CoreResult<Discount> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Discount", id))
    }

    pub async fn find_by_code(&self, code: &str) -> CoreResult<Option<Discount>> {
        Ok(self.store.get_by_code(code.trim()).await?)
    }

    pub async fn list_discounts(&self) -> CoreResult<Vec<Discount>> {
        Ok(self.store.list().await?)
    }

    /// Deletes a discount.
    ///
    /// ## Errors
    /// `NotFound` if no discount has this id.
    pub async fn delete_discount(&self, id: Uuid) -> CoreResult<()> {
        if self.store.get_by_id(id).await?.is_none() {
            return Err(CoreError::not_found("Discount", id));
        }
        self.store.delete(id).await?;
        info!(discount_id = %id, "Deleted discount");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
