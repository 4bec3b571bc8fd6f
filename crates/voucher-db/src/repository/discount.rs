//! # Discount Repository
//!
//! SQLite-backed [`DiscountStore`].
//!
//! ## Column Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Discount field            Column                   Stored as          │
//! │  ───────────────           ──────                   ─────────          │
//! │  id                        id                       TEXT (uuid)        │
//! │  discount_type             discount_type            TEXT (COUPON, ...) │
//! │  value                     value                    TEXT ("15.00")     │
//! │  minimum_order_value       minimum_order_value      TEXT amount        │
//! │  maximum_discount_amount   maximum_discount_amount  TEXT amount        │
//! │  (currency of both)        currency                 TEXT               │
//! │  valid_from / valid_until  same                     TEXT (RFC 3339)    │
//! │  usage counts              same                     INTEGER            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Atomic Usage Update
//! `record_usage` is a single conditional `UPDATE`. SQLite serializes
//! writers, so two redemptions that read the same counter cannot both
//! succeed: the second finds `current_usage_count` changed and affects
//! zero rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use voucher_core::{Discount, DiscountStore, DiscountType, Money, StoreResult};

const SELECT_COLUMNS: &str = r#"
    SELECT
        id,
        discount_type,
        value,
        currency,
        code,
        description,
        minimum_order_value,
        maximum_discount_amount,
        valid_from,
        valid_until,
        max_usage_count,
        current_usage_count,
        created_at
    FROM discounts
"#;

// =============================================================================
// Row Mapping
// =============================================================================

/// Raw `discounts` row.
#[derive(Debug, sqlx::FromRow)]
struct DiscountRow {
    id: String,
    discount_type: DiscountType,
    value: String,
    currency: String,
    code: Option<String>,
    description: String,
    minimum_order_value: String,
    maximum_discount_amount: String,
    valid_from: DateTime<Utc>,
    valid_until: Option<DateTime<Utc>>,
    max_usage_count: Option<i64>,
    current_usage_count: i64,
    created_at: DateTime<Utc>,
}

impl DiscountRow {
    fn decimal(&self, column: &str, raw: &str) -> DbResult<Decimal> {
        Decimal::from_str(raw).map_err(|e| DbError::corrupt(&self.id, column, e))
    }

    fn money(&self, column: &str, raw: &str) -> DbResult<Money> {
        Money::new(self.decimal(column, raw)?, self.currency.as_str())
            .map_err(|e| DbError::corrupt(&self.id, column, e))
    }

    fn count(&self, column: &str, raw: i64) -> DbResult<u32> {
        u32::try_from(raw).map_err(|e| DbError::corrupt(&self.id, column, e))
    }
}

impl TryFrom<DiscountRow> for Discount {
    type Error = DbError;

    fn try_from(row: DiscountRow) -> DbResult<Self> {
        let id = Uuid::parse_str(&row.id).map_err(|e| DbError::corrupt(&row.id, "id", e))?;
        let value = row.decimal("value", &row.value)?;
        let minimum_order_value = row.money("minimum_order_value", &row.minimum_order_value)?;
        let maximum_discount_amount =
            row.money("maximum_discount_amount", &row.maximum_discount_amount)?;
        let max_usage_count = row
            .max_usage_count
            .map(|raw| row.count("max_usage_count", raw))
            .transpose()?;
        let current_usage_count = row.count("current_usage_count", row.current_usage_count)?;

        Ok(Discount {
            id,
            discount_type: row.discount_type,
            value,
            minimum_order_value,
            maximum_discount_amount,
            currency: row.currency,
            code: row.code,
            description: row.description,
            valid_from: row.valid_from,
            valid_until: row.valid_until,
            max_usage_count,
            current_usage_count,
            created_at: row.created_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Discount persistence on SQLite.
///
/// ## Usage
/// ```rust,ignore
/// let store = db.discounts();
/// store.insert_or_update(&discount).await?;
/// let found = store.find_by_code("SAVE10").await?;
/// ```
#[derive(Debug, Clone)]
pub struct SqliteDiscountStore {
    pool: SqlitePool,
}

impl SqliteDiscountStore {
    /// Creates a new SqliteDiscountStore.
    pub fn new(pool: SqlitePool) -> Self {
        SqliteDiscountStore { pool }
    }

    /// Gets a discount by its ID.
    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<Discount>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
        let row = sqlx::query_as::<_, DiscountRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Discount::try_from).transpose()
    }

    /// Gets a discount by its exact code.
    pub async fn find_by_code(&self, code: &str) -> DbResult<Option<Discount>> {
        let sql = format!("{SELECT_COLUMNS} WHERE code = ?1");
        let row = sqlx::query_as::<_, DiscountRow>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Discount::try_from).transpose()
    }

    /// Lists all discounts, oldest first.
    pub async fn list_all(&self) -> DbResult<Vec<Discount>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY created_at, id");
        let rows = sqlx::query_as::<_, DiscountRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Listed discounts");
        rows.into_iter().map(Discount::try_from).collect()
    }

    /// Inserts a discount, or replaces every column of an existing one.
    ///
    /// ## Errors
    /// `UniqueViolation` with the code as value if another discount owns it.
    pub async fn insert_or_update(&self, discount: &Discount) -> DbResult<()> {
        debug!(discount_id = %discount.id, code = ?discount.code, "Saving discount");

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO discounts (
                id, discount_type, value, currency, code, description,
                minimum_order_value, maximum_discount_amount,
                valid_from, valid_until, max_usage_count, current_usage_count,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ON CONFLICT(id) DO UPDATE SET
                discount_type = excluded.discount_type,
                value = excluded.value,
                currency = excluded.currency,
                code = excluded.code,
                description = excluded.description,
                minimum_order_value = excluded.minimum_order_value,
                maximum_discount_amount = excluded.maximum_discount_amount,
                valid_from = excluded.valid_from,
                valid_until = excluded.valid_until,
                max_usage_count = excluded.max_usage_count,
                current_usage_count = excluded.current_usage_count,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(discount.id.to_string())
        .bind(discount.discount_type)
        .bind(discount.value.to_string())
        .bind(&discount.currency)
        .bind(&discount.code)
        .bind(&discount.description)
        .bind(discount.minimum_order_value.amount().to_string())
        .bind(discount.maximum_discount_amount.amount().to_string())
        .bind(discount.valid_from)
        .bind(discount.valid_until)
        .bind(discount.max_usage_count.map(i64::from))
        .bind(i64::from(discount.current_usage_count))
        .bind(discount.created_at)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => match DbError::from(err) {
                DbError::UniqueViolation { field, .. } if field.ends_with("code") => Err(
                    DbError::duplicate(field, discount.code.clone().unwrap_or_default()),
                ),
                other => Err(other),
            },
        }
    }

    /// Deletes a discount. Deleting an unknown id is not an error.
    pub async fn remove(&self, id: Uuid) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM discounts WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        debug!(discount_id = %id, rows = result.rows_affected(), "Deleted discount");
        Ok(())
    }

    /// Writes `new_count` only if the stored counter is still `expected`
    /// and `new_count` respects the cap. Returns whether a row changed.
    pub async fn compare_and_set_usage(
        &self,
        id: Uuid,
        expected: u32,
        new_count: u32,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE discounts
            SET current_usage_count = ?2, updated_at = ?4
            WHERE id = ?1
              AND current_usage_count = ?3
              AND (max_usage_count IS NULL OR ?2 <= max_usage_count)
            "#,
        )
        .bind(id.to_string())
        .bind(i64::from(new_count))
        .bind(i64::from(expected))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let applied = result.rows_affected() == 1;
        debug!(discount_id = %id, expected, new_count, applied, "Usage update");
        Ok(applied)
    }
}

#[async_trait]
impl DiscountStore for SqliteDiscountStore {
    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Discount>> {
        Ok(self.find_by_id(id).await?)
    }

    async fn get_by_code(&self, code: &str) -> StoreResult<Option<Discount>> {
        Ok(self.find_by_code(code).await?)
    }

    async fn save(&self, discount: &Discount) -> StoreResult<Discount> {
        self.insert_or_update(discount).await?;
        Ok(discount.clone())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        Ok(self.remove(id).await?)
    }

    async fn list(&self) -> StoreResult<Vec<Discount>> {
        Ok(self.list_all().await?)
    }

    async fn record_usage(
        &self,
        discount: &Discount,
        expected_usage_count: u32,
    ) -> StoreResult<bool> {
        Ok(self
            .compare_and_set_usage(
                discount.id,
                expected_usage_count,
                discount.current_usage_count,
            )
            .await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use voucher_core::{
        CoreError, DiscountService, DiscountTerms, FixedClock, StoreError,
    };

    async fn store() -> SqliteDiscountStore {
        Database::new(DbConfig::in_memory()).await.unwrap().discounts()
    }

    fn coupon(code: &str) -> Discount {
        Discount::new(
            DiscountType::Coupon,
            dec!(15),
            "BRL",
            DiscountTerms::new()
                .with_code(code)
                .with_description("Fifteen off")
                .with_minimum_order_value(Money::new(dec!(50), "BRL").unwrap())
                .with_valid_until(Utc::now() + Duration::days(30))
                .with_max_usage_count(2),
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_round_trip_preserves_every_field() {
        let store = store().await;
        let discount = Discount::new(
            DiscountType::Percentage,
            dec!(12.5),
            "USD",
            DiscountTerms::new()
                .with_maximum_discount_amount(Money::new(dec!(40), "USD").unwrap())
                .with_valid_from(Utc::now() - Duration::days(1)),
            Utc::now(),
        )
        .unwrap();

        store.save(&discount).await.unwrap();
        let loaded = store.get_by_id(discount.id).await.unwrap().unwrap();
        assert_eq!(loaded, discount);

        let saved = coupon("RT15");
        store.save(&saved).await.unwrap();
        assert_eq!(store.get_by_code("RT15").await.unwrap(), Some(saved));
    }

    #[tokio::test]
    async fn test_missing_lookups() {
        let store = store().await;
        assert_eq!(store.get_by_id(Uuid::new_v4()).await.unwrap(), None);
        assert_eq!(store.get_by_code("NOPE").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_code() {
        let store = store().await;
        store.save(&coupon("DUP")).await.unwrap();

        let err = store.save(&coupon("DUP")).await.unwrap_err();
        assert_eq!(err, StoreError::DuplicateCode("DUP".to_string()));
    }

    #[tokio::test]
    async fn test_many_discounts_without_code() {
        let store = store().await;
        for _ in 0..3 {
            let d = Discount::new(
                DiscountType::FixedAmount,
                dec!(5),
                "BRL",
                DiscountTerms::new(),
                Utc::now(),
            )
            .unwrap();
            store.save(&d).await.unwrap();
        }
        assert_eq!(store.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_update_moves_code() {
        let store = store().await;
        let mut d = coupon("OLD");
        store.save(&d).await.unwrap();

        d.code = Some("NEW".to_string());
        d.description = "Renamed".to_string();
        store.save(&d).await.unwrap();

        assert_eq!(store.get_by_code("OLD").await.unwrap(), None);
        let loaded = store.get_by_code("NEW").await.unwrap().unwrap();
        assert_eq!(loaded.description, "Renamed");
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = store().await;
        let d = coupon("BYE");
        store.save(&d).await.unwrap();

        store.delete(d.id).await.unwrap();
        assert_eq!(store.get_by_id(d.id).await.unwrap(), None);
        assert_eq!(store.get_by_code("BYE").await.unwrap(), None);

        // code can be reused, unknown id is a no-op
        store.save(&coupon("BYE")).await.unwrap();
        store.delete(Uuid::new_v4()).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_ordered_by_creation() {
        let store = store().await;
        let mut older = coupon("A");
        older.created_at = Utc::now() - Duration::days(2);
        let newer = coupon("B");

        store.save(&newer).await.unwrap();
        store.save(&older).await.unwrap();

        let codes: Vec<Option<String>> =
            store.list().await.unwrap().into_iter().map(|d| d.code).collect();
        assert_eq!(codes, vec![Some("A".to_string()), Some("B".to_string())]);
    }

    #[tokio::test]
    async fn test_record_usage_compare_and_swap() {
        let store = store().await;
        let mut d = coupon("CAS");
        store.save(&d).await.unwrap();

        d.mark_used();
        assert!(store.record_usage(&d, 0).await.unwrap());
        assert!(!store.record_usage(&d, 0).await.unwrap());

        d.mark_used();
        assert!(store.record_usage(&d, 1).await.unwrap());

        // cap is 2
        d.mark_used();
        assert!(!store.record_usage(&d, 2).await.unwrap());

        let loaded = store.get_by_id(d.id).await.unwrap().unwrap();
        assert_eq!(loaded.current_usage_count, 2);
    }

    #[tokio::test]
    async fn test_service_over_sqlite() {
        let store = Arc::new(store().await);
        let service = DiscountService::new(store.clone(), Arc::new(FixedClock::new(Utc::now())));

        let discount = service
            .create_coupon_discount(
                &Money::new(dec!(10), "BRL").unwrap(),
                "SQL10",
                DiscountTerms::new().with_max_usage_count(1),
            )
            .await
            .unwrap();

        let total = service
            .apply_code_to_cart(&Money::new(dec!(30), "BRL").unwrap(), "SQL10")
            .await
            .unwrap();
        assert_eq!(total, Money::new(dec!(20), "BRL").unwrap());

        let err = service
            .apply_discount_to_cart(&Money::new(dec!(30), "BRL").unwrap(), discount.id)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidDiscount { .. }));

        let stored = store.get_by_id(discount.id).await.unwrap().unwrap();
        assert_eq!(stored.current_usage_count, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_redemptions_over_sqlite_respect_cap() {
        let store = Arc::new(store().await);
        let service = Arc::new(DiscountService::new(
            store.clone(),
            Arc::new(FixedClock::new(Utc::now())),
        ));
        let discount = service
            .create_fixed_amount_discount(
                &Money::new(dec!(1), "BRL").unwrap(),
                DiscountTerms::new().with_max_usage_count(3),
            )
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let service = service.clone();
            let id = discount.id;
            handles.push(tokio::spawn(async move {
                let total = Money::new(dec!(10), "BRL").unwrap();
                service.apply_discount_to_cart(&total, id).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(total) => {
                    assert_eq!(total, Money::new(dec!(9), "BRL").unwrap());
                    successes += 1;
                }
                Err(CoreError::InvalidDiscount { .. } | CoreError::UsageConflict { .. }) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert!((1..=3).contains(&successes));
        let stored = store.get_by_id(discount.id).await.unwrap().unwrap();
        assert_eq!(stored.current_usage_count, successes);

        let total = Money::new(dec!(10), "BRL").unwrap();
        while service.apply_discount_to_cart(&total, discount.id).await.is_ok() {}
        let stored = store.get_by_id(discount.id).await.unwrap().unwrap();
        assert_eq!(stored.current_usage_count, 3);
    }
}
