//! # Use Cases
//!
//! Entry points that take raw, user-entered primitives (decimal strings,
//! codes, day counts), validate them, build `Money` values and delegate to
//! [`DiscountService`].
//!
//! ```text
//! CLI prompt ──► CreateFixedDiscountInput ──► CreateFixedDiscount::execute
//!                                                   │ validate + parse
//!                                                   ▼
//!                                  DiscountService::create_fixed_amount_discount
//! ```

use serde::Deserialize;
use tracing::debug;

use crate::discount::{Discount, DiscountTerms};
use crate::error::CoreResult;
use crate::money::Money;
use crate::service::DiscountService;
use crate::validation::{
    expiry_after_days, parse_decimal, validate_code, validate_currency, validate_fixed_amount,
    validate_non_negative, validate_percentage,
};

/// Optional fields common to both creation flows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CommonTermsInput {
    /// Empty means a generated description.
    #[serde(default)]
    pub description: String,
    /// Decimal string; `None` means no minimum.
    pub minimum_order_value: Option<String>,
    /// Days from now until the discount expires; `None` means never.
    pub validity_days: Option<u32>,
    /// `None` means unlimited.
    pub max_usage_count: Option<u32>,
}

impl CommonTermsInput {
    fn into_terms(
        self,
        service: &DiscountService,
        currency: &str,
        default_description: String,
    ) -> CoreResult<DiscountTerms> {
        let mut terms = DiscountTerms::new();

        terms.description = if self.description.trim().is_empty() {
            default_description
        } else {
            self.description
        };

        if let Some(raw) = self.minimum_order_value.filter(|raw| !raw.trim().is_empty()) {
            let minimum = Money::new(parse_decimal("minimum_order_value", &raw)?, currency)?;
            validate_non_negative("minimum_order_value", &minimum)?;
            terms.minimum_order_value = Some(minimum);
        }

        if let Some(days) = self.validity_days {
            terms.valid_until = Some(expiry_after_days(service.now(), days)?);
        }

        terms.max_usage_count = self.max_usage_count;
        Ok(terms)
    }
}

// =============================================================================
// Create Fixed Discount
// =============================================================================

/// Raw input for a fixed-amount discount. The code is mandatory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreateFixedDiscountInput {
    pub amount: String,
    pub code: String,
    pub currency: String,
    #[serde(flatten)]
    pub terms: CommonTermsInput,
}

/// Creates a fixed-amount discount from raw input.
#[derive(Debug, Clone, Copy)]
pub struct CreateFixedDiscount<'a> {
    service: &'a DiscountService,
}

impl<'a> CreateFixedDiscount<'a> {
    pub fn new(service: &'a DiscountService) -> Self {
        CreateFixedDiscount { service }
    }

    /// ## Errors
    /// `InvalidArgument` for an unparseable or non-positive amount, an empty
    /// code, a bad currency or a negative minimum.
    pub async fn execute(&self, input: CreateFixedDiscountInput) -> CoreResult<Discount> {
        let currency = validate_currency(&input.currency)?;
        let code = validate_code(&input.code)?;

        let amount = Money::new(parse_decimal("amount", &input.amount)?, currency.as_str())?;
        validate_fixed_amount(&amount)?;

        let default_description = format!("Discount of {}", amount);
        let terms = input
            .terms
            .into_terms(self.service, &currency, default_description)?
            .with_code(code);

        debug!(amount = %amount, "Creating fixed discount");
        self.service.create_fixed_amount_discount(&amount, terms).await
    }
}

// =============================================================================
// Create Percentage Discount
// =============================================================================

/// Raw input for a percentage discount. The code is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreatePercentageDiscountInput {
    pub percentage: String,
    pub code: Option<String>,
    pub currency: String,
    /// Decimal string; `None` means the discount is not capped.
    pub maximum_discount_amount: Option<String>,
    #[serde(flatten)]
    pub terms: CommonTermsInput,
}

/// Creates a percentage discount from raw input.
#[derive(Debug, Clone, Copy)]
pub struct CreatePercentageDiscount<'a> {
    service: &'a DiscountService,
}

impl<'a> CreatePercentageDiscount<'a> {
    pub fn new(service: &'a DiscountService) -> Self {
        CreatePercentageDiscount { service }
    }

    /// ## Errors
    /// `InvalidArgument` for a percentage outside `(0, 100]`, a bad code,
    /// currency or bound.
    pub async fn execute(&self, input: CreatePercentageDiscountInput) -> CoreResult<Discount> {
        let currency = validate_currency(&input.currency)?;
        let percentage = parse_decimal("percentage", &input.percentage)?;
        validate_percentage(percentage)?;

        let default_description = format!("{}% off", percentage.normalize());
        let mut terms = input
            .terms
            .into_terms(self.service, &currency, default_description)?;

        if let Some(code) = input.code.filter(|code| !code.trim().is_empty()) {
            terms = terms.with_code(validate_code(&code)?);
        }

        if let Some(raw) = input
            .maximum_discount_amount
            .filter(|raw| !raw.trim().is_empty())
        {
            let maximum = Money::new(
                parse_decimal("maximum_discount_amount", &raw)?,
                currency.as_str(),
            )?;
            validate_non_negative("maximum_discount_amount", &maximum)?;
            terms = terms.with_maximum_discount_amount(maximum);
        }

        debug!(%percentage, "Creating percentage discount");
        self.service
            .create_percentage_discount(percentage, &currency, terms)
            .await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
