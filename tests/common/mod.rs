#![allow(dead_code)]

use cart_store::store::{CartBackend, CartKeys, CasOutcome, Error, MemoryStore};
use cart_store::{CartConfig, CartStore, ItemDetails, Price};
use std::collections::HashMap;
use std::sync::Arc;

pub fn widget() -> ItemDetails {
    ItemDetails::new("p1", "Widget", Price::from_cents(999))
}

pub fn gadget() -> ItemDetails {
    ItemDetails::new("p2", "Gadget", Price::from_cents(1500))
}

pub fn memory_carts() -> CartStore<MemoryStore> {
    CartStore::new(Arc::new(MemoryStore::new()))
}

pub fn faulty_carts(store: FaultyStore, config: CartConfig) -> CartStore<FaultyStore> {
    CartStore::with_config(Arc::new(store), config)
}

/// A [`MemoryStore`] wrapper that injects the faults a shared cache can show:
/// details entries lost to a partial write, and quantities that keep
/// changing under a compare-and-set.
#[derive(Clone, Debug, Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    hidden_details: Option<String>,
    always_conflict: bool,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretends the details entry of `product_id` was never written.
    pub fn hide_details(mut self, product_id: &str) -> Self {
        self.hidden_details = Some(product_id.to_string());
        self
    }

    /// Makes every compare-and-set report a concurrent modification.
    pub fn always_conflict(mut self) -> Self {
        self.always_conflict = true;
        self
    }
}

impl CartBackend for FaultyStore {
    async fn add_item(
        &self,
        keys: &CartKeys,
        product_id: &str,
        quantity: i64,
        details: &[u8],
        ttl_secs: i64,
    ) -> Result<i64, Error> {
        self.inner
            .add_item(keys, product_id, quantity, details, ttl_secs)
            .await
    }

    async fn update_item(
        &self,
        keys: &CartKeys,
        product_id: &str,
        quantity: i64,
        details: &[u8],
        ttl_secs: i64,
    ) -> Result<(), Error> {
        self.inner
            .update_item(keys, product_id, quantity, details, ttl_secs)
            .await
    }

    async fn quantities(&self, keys: &CartKeys) -> Result<HashMap<String, i64>, Error> {
        self.inner.quantities(keys).await
    }

    async fn details(&self, keys: &CartKeys) -> Result<HashMap<String, Vec<u8>>, Error> {
        let mut details = self.inner.details(keys).await?;
        if let Some(hidden) = &self.hidden_details {
            details.remove(hidden);
        }
        Ok(details)
    }

    async fn quantity(&self, keys: &CartKeys, product_id: &str) -> Result<Option<i64>, Error> {
        self.inner.quantity(keys, product_id).await
    }

    async fn remove_item(
        &self,
        keys: &CartKeys,
        product_id: &str,
        ttl_secs: i64,
    ) -> Result<bool, Error> {
        self.inner.remove_item(keys, product_id, ttl_secs).await
    }

    async fn increment(
        &self,
        keys: &CartKeys,
        product_id: &str,
        step: i64,
        ttl_secs: i64,
    ) -> Result<Option<i64>, Error> {
        self.inner.increment(keys, product_id, step, ttl_secs).await
    }

    async fn compare_and_set_quantity(
        &self,
        keys: &CartKeys,
        product_id: &str,
        expected: i64,
        next: i64,
        ttl_secs: i64,
    ) -> Result<CasOutcome, Error> {
        if self.always_conflict {
            return Ok(CasOutcome::Conflict);
        }
        self.inner
            .compare_and_set_quantity(keys, product_id, expected, next, ttl_secs)
            .await
    }

    async fn set_quantity(
        &self,
        keys: &CartKeys,
        product_id: &str,
        quantity: i64,
        ttl_secs: i64,
    ) -> Result<bool, Error> {
        self.inner
            .set_quantity(keys, product_id, quantity, ttl_secs)
            .await
    }

    async fn promo_code(&self, keys: &CartKeys) -> Result<Option<String>, Error> {
        self.inner.promo_code(keys).await
    }

    async fn set_promo_code(&self, keys: &CartKeys, code: &str, ttl_secs: i64) -> Result<(), Error> {
        self.inner.set_promo_code(keys, code, ttl_secs).await
    }

    async fn clear(&self, keys: &CartKeys) -> Result<i64, Error> {
        self.inner.clear(keys).await
    }
}
