//! # Discount Store
//!
//! The persistence contract the service depends on, plus an in-memory
//! implementation used by tests and by the CLI's `memory` mode.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  id ──────► Discount          (primary map)                             │
//! │  code ────► id                (unique secondary index)                  │
//! │                                                                         │
//! │  save(d)     upsert by id; old code entry dropped if the code changed;  │
//! │              DuplicateCode if another id owns d.code                    │
//! │  delete(id)  removes the row AND its code entry; unknown id = no-op     │
//! │  record_usage(d, expected)                                              │
//! │              compare-and-swap on current_usage_count:                   │
//! │              stored == expected AND new <= max  →  write, Ok(true)      │
//! │              otherwise                          →  no write, Ok(false)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stores hand out independent copies. Mutating a returned `Discount` never
//! changes what is stored until it is saved again.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::discount::Discount;
use crate::error::{StoreError, StoreResult};

// =============================================================================
// Store Trait
// =============================================================================

/// Persistence seam for discounts.
#[async_trait]
pub trait DiscountStore: Send + Sync {
    /// Fetches a discount by id.
    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Discount>>;

    /// Fetches a discount by its code (exact match).
    async fn get_by_code(&self, code: &str) -> StoreResult<Option<Discount>>;

    /// Inserts or replaces a discount, keeping the code index consistent.
    async fn save(&self, discount: &Discount) -> StoreResult<Discount>;

    /// Removes a discount and its code index entry.
    async fn delete(&self, id: Uuid) -> StoreResult<()>;

    /// All stored discounts, oldest first.
    async fn list(&self) -> StoreResult<Vec<Discount>>;

    /// Atomically persists `discount.current_usage_count` if the stored
    /// counter still equals `expected_usage_count` and the new counter does
    /// not exceed `max_usage_count`. Only the counter is written.
    ///
    /// Returns `false` when the condition did not hold (or the discount is
    /// gone); nothing is written in that case.
    async fn record_usage(&self, discount: &Discount, expected_usage_count: u32)
        -> StoreResult<bool>;
}

// =============================================================================
// In-Memory Store
// =============================================================================

#[derive(Debug, Default)]
struct Tables {
    discounts: HashMap<Uuid, Discount>,
    codes: HashMap<String, Uuid>,
}

/// `DiscountStore` backed by two hash maps behind a single lock.
///
/// Every read and write takes the lock once, so each operation (including
/// the `record_usage` compare-and-swap) is atomic.
#[derive(Debug, Default)]
pub struct InMemoryDiscountStore {
    tables: RwLock<Tables>,
}

impl InMemoryDiscountStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("discount store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("discount store lock poisoned".to_string()))
    }
}

#[async_trait]
impl DiscountStore for InMemoryDiscountStore {
    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Discount>> {
        Ok(self.read()?.discounts.get(&id).cloned())
    }

    async fn get_by_code(&self, code: &str) -> StoreResult<Option<Discount>> {
        let tables = self.read()?;
        Ok(tables
            .codes
            .get(code)
            .and_then(|id| tables.discounts.get(id))
            .cloned())
    }

    async fn save(&self, discount: &Discount) -> StoreResult<Discount> {
        let mut tables = self.write()?;

        if let Some(code) = &discount.code {
            if let Some(owner) = tables.codes.get(code) {
                if *owner != discount.id {
                    return Err(StoreError::DuplicateCode(code.clone()));
                }
            }
        }

        let previous_code = tables
            .discounts
            .get(&discount.id)
            .and_then(|existing| existing.code.clone());
        if let Some(previous) = previous_code {
            if discount.code.as_deref() != Some(previous.as_str()) {
                tables.codes.remove(&previous);
            }
        }

        if let Some(code) = &discount.code {
            tables.codes.insert(code.clone(), discount.id);
        }
        tables.discounts.insert(discount.id, discount.clone());

        debug!(discount_id = %discount.id, "Saved discount");
        Ok(discount.clone())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.write()?;

        if let Some(removed) = tables.discounts.remove(&id) {
            if let Some(code) = removed.code {
                tables.codes.remove(&code);
            }
            debug!(discount_id = %id, "Deleted discount");
        }

        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<Discount>> {
        let mut discounts: Vec<Discount> = self.read()?.discounts.values().cloned().collect();
        discounts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(discounts)
    }

    async fn record_usage(
        &self,
        discount: &Discount,
        expected_usage_count: u32,
    ) -> StoreResult<bool> {
        let mut tables = self.write()?;

        let Some(stored) = tables.discounts.get_mut(&discount.id) else {
            return Ok(false);
        };

        let new_count = discount.current_usage_count;
        let within_cap = stored.max_usage_count.map_or(true, |max| new_count <= max);
        if stored.current_usage_count != expected_usage_count || !within_cap {
            debug!(
                discount_id = %discount.id,
                expected = expected_usage_count,
                actual = stored.current_usage_count,
                "Usage update rejected"
            );
            return Ok(false);
        }

        stored.current_usage_count = new_count;
        Ok(true)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discount::{DiscountTerms, DiscountType};
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    fn discount(code: Option<&str>) -> Discount {
        let mut terms = DiscountTerms::new().with_max_usage_count(2);
        if let Some(code) = code {
            terms = terms.with_code(code);
        }
        Discount::new(DiscountType::FixedAmount, dec!(10), "BRL", terms, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let store = InMemoryDiscountStore::new();
        let saved = store.save(&discount(Some("SAVE10"))).await.unwrap();

        assert_eq!(store.get_by_id(saved.id).await.unwrap(), Some(saved.clone()));
        assert_eq!(store.get_by_code("SAVE10").await.unwrap(), Some(saved));
        assert_eq!(store.get_by_code("save10").await.unwrap(), None);
        assert_eq!(store.get_by_id(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_returned_values_are_snapshots() {
        let store = InMemoryDiscountStore::new();
        let original = discount(None);
        store.save(&original).await.unwrap();

        let mut copy = store.get_by_id(original.id).await.unwrap().unwrap();
        copy.mark_used();

        let stored = store.get_by_id(original.id).await.unwrap().unwrap();
        assert_eq!(stored.current_usage_count, 0);
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let store = InMemoryDiscountStore::new();
        store.save(&discount(Some("DUP"))).await.unwrap();

        let err = store.save(&discount(Some("DUP"))).await.unwrap_err();
        assert_eq!(err, StoreError::DuplicateCode("DUP".to_string()));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_code_change_updates_index() {
        let store = InMemoryDiscountStore::new();
        let mut d = discount(Some("OLD"));
        store.save(&d).await.unwrap();

        d.code = Some("NEW".to_string());
        store.save(&d).await.unwrap();
        assert_eq!(store.get_by_code("OLD").await.unwrap(), None);
        assert_eq!(store.get_by_code("NEW").await.unwrap().map(|x| x.id), Some(d.id));

        // the old code is free again
        store.save(&discount(Some("OLD"))).await.unwrap();

        d.code = None;
        store.save(&d).await.unwrap();
        assert_eq!(store.get_by_code("NEW").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_removes_code_entry() {
        let store = InMemoryDiscountStore::new();
        let d = discount(Some("GONE"));
        store.save(&d).await.unwrap();

        store.delete(d.id).await.unwrap();
        assert_eq!(store.get_by_id(d.id).await.unwrap(), None);
        assert_eq!(store.get_by_code("GONE").await.unwrap(), None);

        // unknown id is a no-op
        store.delete(Uuid::new_v4()).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_creation() {
        let store = InMemoryDiscountStore::new();
        let mut older = discount(Some("A"));
        older.created_at = Utc::now() - Duration::days(1);
        let newer = discount(Some("B"));

        store.save(&newer).await.unwrap();
        store.save(&older).await.unwrap();

        let ids: Vec<Uuid> = store.list().await.unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![older.id, newer.id]);
    }

    #[tokio::test]
    async fn test_record_usage_compare_and_swap() {
        let store = InMemoryDiscountStore::new();
        let mut d = discount(None);
        store.save(&d).await.unwrap();

        d.mark_used();
        assert!(store.record_usage(&d, 0).await.unwrap());

        // stale expectation loses
        assert!(!store.record_usage(&d, 0).await.unwrap());

        d.mark_used();
        assert!(store.record_usage(&d, 1).await.unwrap());

        // would pass the cap of 2
        d.mark_used();
        assert!(!store.record_usage(&d, 2).await.unwrap());
        assert_eq!(
            store.get_by_id(d.id).await.unwrap().unwrap().current_usage_count,
            2
        );
    }

    #[tokio::test]
    async fn test_record_usage_on_missing_discount() {
        let store = InMemoryDiscountStore::new();
        let mut d = discount(None);
        d.mark_used();
        assert!(!store.record_usage(&d, 0).await.unwrap());
    }
}
