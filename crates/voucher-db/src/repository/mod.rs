//! # Repository Module
//!
//! SQLite implementations of the voucher-core store traits.
//!
//! ```text
//! DiscountService
//!      │  Arc<dyn DiscountStore>
//!      ▼
//! SqliteDiscountStore ──► discounts table
//! ```
//!
//! ## Available Repositories
//!
//! - [`SqliteDiscountStore`](discount::SqliteDiscountStore) - Discount CRUD
//!   and the atomic usage counter update

pub mod discount;
