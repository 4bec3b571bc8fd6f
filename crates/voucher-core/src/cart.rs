//! # Cart
//!
//! A minimal single-currency cart whose total feeds
//! [`DiscountService::apply_discount_to_cart`](crate::service::DiscountService::apply_discount_to_cart).
//!
//! ## Behavior
//! - Adding a product already in the cart increases its quantity
//! - Every line price must be in the cart's currency
//! - Prices are frozen when the line is added

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub quantity: u32,
    /// Price per unit at the time the item was added.
    pub unit_price: Money,
}

impl CartItem {
    /// `unit_price × quantity`.
    ///
    /// ## Errors
    /// `Overflow` if the product leaves the Money range.
    pub fn line_total(&self) -> CoreResult<Money> {
        self.unit_price.multiply(Decimal::from(self.quantity))
    }
}

/// A shopping cart in a single currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: Uuid,
    pub items: Vec<CartItem>,
    pub currency: String,
}

impl Cart {
    pub fn new(currency: impl Into<String>) -> Self {
        Cart {
            id: Uuid::new_v4(),
            items: Vec::new(),
            currency: currency.into(),
        }
    }

    /// Adds `quantity` units of a product.
    ///
    /// ## Errors
    /// - `CurrencyMismatch` if `unit_price` is not in the cart's currency
    /// - `InvalidArgument` for a zero quantity or when a limit would be exceeded
    pub fn add_item(
        &mut self,
        product_id: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> CoreResult<()> {
        if unit_price.currency() != self.currency {
            return Err(CoreError::currency_mismatch(
                self.currency.as_str(),
                unit_price.currency(),
            ));
        }
        if quantity == 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }

        let product_id = product_id.into();
        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            let new_quantity = item.quantity.saturating_add(quantity);
            if new_quantity > MAX_ITEM_QUANTITY {
                return Err(quantity_out_of_range());
            }
            item.quantity = new_quantity;
            item.unit_price = unit_price;
            return Ok(());
        }

        if quantity > MAX_ITEM_QUANTITY {
            return Err(quantity_out_of_range());
        }
        if self.items.len() >= MAX_CART_ITEMS {
            return Err(ValidationError::OutOfRange {
                field: "items".to_string(),
                min: "0".to_string(),
                max: MAX_CART_ITEMS.to_string(),
            }
            .into());
        }

        self.items.push(CartItem {
            product_id,
            quantity,
            unit_price,
        });
        Ok(())
    }

    /// Removes a product. Returns whether it was in the cart.
    pub fn remove_item(&mut self, product_id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of every line total, in the cart's currency.
    ///
    /// ## Errors
    /// `Overflow` if a line or the sum leaves the Money range.
    pub fn total(&self) -> CoreResult<Money> {
        self.items
            .iter()
            .try_fold(Money::zero(self.currency.as_str()), |total, item| {
                total.add(&item.line_total()?)
            })
    }
}

fn quantity_out_of_range() -> CoreError {
    ValidationError::OutOfRange {
        field: "quantity".to_string(),
        min: "0".to_string(),
        max: MAX_ITEM_QUANTITY.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_total() {
        let mut cart = Cart::new("BRL");
        assert_eq!(cart.total().unwrap(), Money::zero("BRL"));

        cart.add_item("coffee", 2, Money::new(dec!(12.50), "BRL").unwrap()).unwrap();
        cart.add_item("bread", 1, Money::new(dec!(7.99), "BRL").unwrap()).unwrap();
        assert_eq!(cart.total().unwrap(), Money::new(dec!(32.99), "BRL").unwrap());
    }

    #[test]
    fn test_same_product_merges() {
        let mut cart = Cart::new("BRL");
        cart.add_item("coffee", 2, Money::from_cents(1000, "BRL")).unwrap();
        cart.add_item("coffee", 3, Money::from_cents(1000, "BRL")).unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 5);
        assert_eq!(cart.total().unwrap(), Money::from_cents(5000, "BRL"));
    }

    #[test]
    fn test_rejects_other_currency() {
        let mut cart = Cart::new("BRL");
        let err = cart
            .add_item("coffee", 1, Money::from_cents(1000, "USD"))
            .unwrap_err();
        assert!(matches!(err, CoreError::CurrencyMismatch { .. }));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_quantity_limits() {
        let mut cart = Cart::new("BRL");
        assert!(cart.add_item("x", 0, Money::from_cents(100, "BRL")).is_err());
        assert!(cart
            .add_item("x", MAX_ITEM_QUANTITY + 1, Money::from_cents(100, "BRL"))
            .is_err());

        cart.add_item("x", MAX_ITEM_QUANTITY, Money::from_cents(100, "BRL")).unwrap();
        assert!(cart.add_item("x", 1, Money::from_cents(100, "BRL")).is_err());
    }

    #[test]
    fn test_total_out_of_money_range_is_an_error() {
        let huge = Money::new(dec!(500000000000000000000000000), "BRL").unwrap();

        let mut cart = Cart::new("BRL");
        cart.add_item("a", 2, huge.clone()).unwrap();
        assert!(matches!(cart.items[0].line_total(), Err(CoreError::Overflow { .. })));
        assert!(matches!(cart.total(), Err(CoreError::Overflow { .. })));

        let mut cart = Cart::new("BRL");
        cart.add_item("a", 1, huge.clone()).unwrap();
        cart.add_item("b", 1, huge).unwrap();
        assert!(matches!(cart.total(), Err(CoreError::Overflow { .. })));

        assert!(matches!(
            Money::parse("50000000000000000000000000000", "BRL"),
            Err(CoreError::Overflow { .. })
        ));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::new("BRL");
        cart.add_item("a", 1, Money::from_cents(100, "BRL")).unwrap();
        cart.add_item("b", 1, Money::from_cents(100, "BRL")).unwrap();

        assert!(cart.remove_item("a"));
        assert!(!cart.remove_item("a"));
        assert_eq!(cart.items.len(), 1);

        cart.clear();
        assert!(cart.is_empty());
    }
}
