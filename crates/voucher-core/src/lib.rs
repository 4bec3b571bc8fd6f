//! # voucher-core: Discount Valuation Engine
//!
//! This crate contains the discount rules and their orchestration, with no
//! database, network or terminal access. Storage is reached only through
//! the [`store::DiscountStore`] trait.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Voucher Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 voucher-cli (interactive menu)                  │   │
//! │  │    create fixed / percentage ─► apply ─► validate ─► list      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ use_cases / DiscountService            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ voucher-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │ discount  │  │  service  │  │   store   │  │   │
//! │  │   │   Money   │  │ Discount  │  │ Discount- │  │ Discount- │  │   │
//! │  │   │ (decimal) │  │ validity  │  │  Service  │  │  Store    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └─────┬─────┘  │   │
//! │  │                                                       │        │   │
//! │  │   NO DATABASE • NO NETWORK • TIME VIA Clock           │        │   │
//! │  └───────────────────────────────────────────────────────┼────────┘   │
//! │                                                          │ impl        │
//! │  ┌───────────────────────────────────────────────────────▼────────┐   │
//! │  │           voucher-db (SqliteDiscountStore, migrations)          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Exact-decimal, currency-checked Money
//! - [`discount`] - Discount entity: validity gates and valuation
//! - [`service`] - DiscountService: redemption, lookup, creation
//! - [`store`] - DiscountStore trait and the in-memory store
//! - [`use_cases`] - Creation from raw user input
//! - [`cart`] - Minimal cart producing order totals
//! - [`clock`] - Injected time source
//! - [`validation`] - Parameter validation
//! - [`error`] - Error types
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use rust_decimal::Decimal;
//! use voucher_core::{DiscountService, DiscountTerms, InMemoryDiscountStore, Money};
//!
//! # tokio_test_block(async {
//! let service = DiscountService::with_system_clock(Arc::new(InMemoryDiscountStore::new()));
//!
//! let discount = service
//!     .create_percentage_discount(Decimal::TEN, "BRL", DiscountTerms::new())
//!     .await
//!     .unwrap();
//!
//! let total = service
//!     .apply_discount_to_cart(&Money::from_cents(10000, "BRL"), discount.id)
//!     .await
//!     .unwrap();
//! assert_eq!(total, Money::from_cents(9000, "BRL"));
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f);
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod clock;
pub mod discount;
pub mod error;
pub mod money;
pub mod service;
pub mod store;
pub mod use_cases;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartItem};
pub use clock::{Clock, FixedClock, SystemClock};
pub use discount::{Discount, DiscountStatus, DiscountTerms, DiscountType};
pub use error::{CoreError, CoreResult, StoreError, StoreResult, ValidationError};
pub use money::Money;
pub use service::{DiscountPreview, DiscountService};
pub use store::{DiscountStore, InMemoryDiscountStore};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Currency used when none is configured.
pub const DEFAULT_CURRENCY: &str = "BRL";

/// Default lifetime, in days, of discounts created interactively.
pub const DEFAULT_VALIDITY_DAYS: u32 = 30;

/// Maximum distinct products in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single product in a cart.
///
/// ## Business Reason
/// Catches typos such as 1000 instead of 10.
pub const MAX_ITEM_QUANTITY: u32 = 999;
