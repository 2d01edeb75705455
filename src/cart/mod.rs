//! Session-scoped carts on top of a [`CartBackend`].

use std::{result, sync::Arc};

use thiserror::Error;

mod config;
mod item;

pub use config::*;
pub use item::*;

use crate::store::{
    self, CartBackend, CartKeys, CasOutcome, MemoryStore, deserialize_value, serialize_value,
};

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] store::Error),

    #[error("quantity of `{product_id}` kept changing concurrently, gave up after {attempts} attempts")]
    Conflict { product_id: String, attempts: u32 },

    #[error("quantity must be at least 1, got {0}")]
    InvalidQuantity(i64),
}

type Result<T> = result::Result<T, Error>;

/// What a [`CartStore::decrement_quantity`] call did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decrement {
    /// The item is still in the cart with the given quantity.
    Decremented(i64),
    /// The quantity dropped below 1 and the item was removed.
    Removed,
    /// The item was not in the cart.
    NotFound,
}

/// A shopping cart store keyed by session id.
///
/// Each session's cart lives in three cache records: quantities, item
/// details and the promo code. Every mutation refreshes all three to the
/// configured TTL, so a cart expires as a whole after a period of inactivity.
///
/// Concurrent callers for the same session are safe without any in-process
/// locking: single-step mutations are applied atomically by the backend, and
/// [`decrement_quantity`](Self::decrement_quantity) runs an optimistic
/// read/compare-and-set loop.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use cart_store::{CartStore, ItemDetails, Price};
/// use cart_store::store::MemoryStore;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), cart_store::cart::Error> {
/// let carts = CartStore::new(Arc::new(MemoryStore::new()));
///
/// let widget = ItemDetails::new("p1", "Widget", Price::from_cents(999));
/// carts.add_item("sess1", &widget, 2).await?;
///
/// let items = carts.get_cart("sess1").await?;
/// assert_eq!(items[0].quantity, 2);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct CartStore<B: CartBackend = MemoryStore> {
    backend: Arc<B>,
    config: Arc<CartConfig>,
}

impl<B> CartStore<B>
where
    B: CartBackend,
{
    /// Creates a `CartStore` with the default configuration.
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_config(backend, CartConfig::default())
    }

    pub fn with_config(backend: Arc<B>, config: CartConfig) -> Self {
        Self {
            backend,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &CartConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// The cache keys holding `session_id`'s cart.
    pub fn keys(&self, session_id: &str) -> CartKeys {
        CartKeys::new(&self.config.key_prefix, session_id)
    }

    /// Adds `quantity` units of a product.
    ///
    /// The details are only written when the product is not in the cart yet;
    /// adding more of a product keeps the name and price it was first added
    /// with. Returns the product's quantity after the add.
    #[tracing::instrument(
        name = "adding item to cart",
        skip(self, details),
        fields(product_id = %details.product_id)
    )]
    pub async fn add_item(
        &self,
        session_id: &str,
        details: &ItemDetails,
        quantity: i64,
    ) -> Result<i64> {
        ensure_positive(quantity)?;

        let keys = self.keys(session_id);
        let encoded = serialize_value(details)?;
        let total = self
            .backend
            .add_item(
                &keys,
                &details.product_id,
                quantity,
                &encoded,
                self.config.ttl_secs,
            )
            .await
            .map_err(logged("failed to add item to cart"))?;

        Ok(total)
    }

    /// Returns every item of the cart, ordered by product id.
    ///
    /// A quantity entry whose details are missing is skipped rather than
    /// returned half-filled.
    #[tracing::instrument(name = "getting cart items", skip(self))]
    pub async fn get_cart(&self, session_id: &str) -> Result<Vec<CartItem>> {
        let keys = self.keys(session_id);
        let quantities = self
            .backend
            .quantities(&keys)
            .await
            .map_err(logged("failed to read cart quantities"))?;

        if quantities.is_empty() {
            return Ok(Vec::new());
        }

        let mut details = self
            .backend
            .details(&keys)
            .await
            .map_err(logged("failed to read cart details"))?;

        let mut items = Vec::with_capacity(quantities.len());
        for (product_id, quantity) in quantities {
            let Some(encoded) = details.remove(&product_id) else {
                tracing::warn!(product_id = %product_id, "skipping quantity entry without details");
                continue;
            };
            if quantity < 1 {
                tracing::warn!(product_id = %product_id, quantity, "skipping non-positive quantity entry");
                continue;
            }

            let item_details: ItemDetails = deserialize_value(&encoded)?;
            items.push(CartItem::from_details(item_details, quantity));
        }

        items.sort_unstable_by(|a, b| a.product_id.cmp(&b.product_id));
        Ok(items)
    }

    /// Returns the items together with the promo code.
    #[tracing::instrument(name = "getting cart", skip(self))]
    pub async fn get_cart_with_promo(&self, session_id: &str) -> Result<Cart> {
        let items = self.get_cart(session_id).await?;
        let promo_code = self.get_promo_code(session_id).await?;

        Ok(Cart { items, promo_code })
    }

    /// Removes a product from the cart. Removing the last item also drops the
    /// promo code.
    ///
    /// Returns `true` if the product was in the cart.
    #[tracing::instrument(name = "removing item from cart", skip(self))]
    pub async fn remove_item(&self, session_id: &str, product_id: &str) -> Result<bool> {
        let keys = self.keys(session_id);
        let removed = self
            .backend
            .remove_item(&keys, product_id, self.config.ttl_secs)
            .await
            .map_err(logged("failed to remove item from cart"))?;

        Ok(removed)
    }

    /// Deletes the whole cart. Clearing an empty cart is a no-op.
    #[tracing::instrument(name = "clearing cart", skip(self))]
    pub async fn clear_cart(&self, session_id: &str) -> Result<()> {
        let keys = self.keys(session_id);
        let deleted = self
            .backend
            .clear(&keys)
            .await
            .map_err(logged("failed to clear cart"))?;

        tracing::debug!(deleted, "cart cleared");
        Ok(())
    }

    /// Raises a product's quantity by `step`.
    ///
    /// Only products already in the cart are incremented. Returns the new
    /// quantity, or `None` if the product is not in the cart.
    #[tracing::instrument(name = "incrementing cart item quantity", skip(self))]
    pub async fn increment_quantity(
        &self,
        session_id: &str,
        product_id: &str,
        step: i64,
    ) -> Result<Option<i64>> {
        ensure_positive(step)?;

        let keys = self.keys(session_id);
        let total = self
            .backend
            .increment(&keys, product_id, step, self.config.ttl_secs)
            .await
            .map_err(logged("failed to increment cart item quantity"))?;

        if total.is_none() {
            tracing::debug!("product is not in the cart");
        }

        Ok(total)
    }

    /// Lowers a product's quantity by `step`, removing the product once the
    /// quantity drops below 1.
    ///
    /// The read and the conditional write are separate round trips, so the
    /// write only commits if the quantity is still the one that was read.
    /// On a mismatch the whole step is retried, up to
    /// [`CartConfig::max_cas_attempts`] times, after which
    /// [`Error::Conflict`] is returned. Exactly one of several concurrent
    /// decrements that together empty a product observes
    /// [`Decrement::Removed`].
    #[tracing::instrument(name = "decrementing cart item quantity", skip(self))]
    pub async fn decrement_quantity(
        &self,
        session_id: &str,
        product_id: &str,
        step: i64,
    ) -> Result<Decrement> {
        ensure_positive(step)?;

        let keys = self.keys(session_id);
        let attempts = self.config.max_cas_attempts;

        for attempt in 1..=attempts {
            let current = self
                .backend
                .quantity(&keys, product_id)
                .await
                .map_err(logged("failed to read cart item quantity"))?;

            let Some(current) = current else {
                return Ok(Decrement::NotFound);
            };

            let next = current.saturating_sub(step);
            let outcome = self
                .backend
                .compare_and_set_quantity(&keys, product_id, current, next, self.config.ttl_secs)
                .await
                .map_err(logged("failed to write cart item quantity"))?;

            match outcome {
                CasOutcome::Committed if next < 1 => return Ok(Decrement::Removed),
                CasOutcome::Committed => return Ok(Decrement::Decremented(next)),
                CasOutcome::Missing => return Ok(Decrement::NotFound),
                CasOutcome::Conflict => {
                    tracing::debug!(attempt, current, "quantity changed concurrently, retrying");
                    tokio::task::yield_now().await;
                }
            }
        }

        tracing::warn!(attempts, "giving up on quantity decrement after repeated conflicts");
        Err(Error::Conflict {
            product_id: product_id.to_owned(),
            attempts,
        })
    }

    /// Overwrites the quantity of a product already in the cart.
    ///
    /// Returns `false`, leaving the cart untouched, if the product is not in
    /// the cart.
    #[tracing::instrument(name = "setting cart item quantity", skip(self))]
    pub async fn set_quantity(
        &self,
        session_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> Result<bool> {
        ensure_positive(quantity)?;

        let keys = self.keys(session_id);
        let updated = self
            .backend
            .set_quantity(&keys, product_id, quantity, self.config.ttl_secs)
            .await
            .map_err(logged("failed to set cart item quantity"))?;

        Ok(updated)
    }

    /// Replaces both the details and the quantity of a product, adding it if
    /// it is not in the cart.
    #[tracing::instrument(
        name = "updating cart item",
        skip(self, details),
        fields(product_id = %details.product_id)
    )]
    pub async fn update_item(
        &self,
        session_id: &str,
        details: &ItemDetails,
        quantity: i64,
    ) -> Result<()> {
        ensure_positive(quantity)?;

        let keys = self.keys(session_id);
        let encoded = serialize_value(details)?;
        self.backend
            .update_item(
                &keys,
                &details.product_id,
                quantity,
                &encoded,
                self.config.ttl_secs,
            )
            .await
            .map_err(logged("failed to update cart item"))?;

        Ok(())
    }

    #[tracing::instrument(name = "getting cart promo code", skip(self))]
    pub async fn get_promo_code(&self, session_id: &str) -> Result<Option<String>> {
        let keys = self.keys(session_id);
        let code = self
            .backend
            .promo_code(&keys)
            .await
            .map_err(logged("failed to read promo code"))?;

        Ok(code)
    }

    /// Sets the promo code and refreshes the expiry of the whole cart.
    #[tracing::instrument(name = "setting cart promo code", skip(self, code))]
    pub async fn set_promo_code(&self, session_id: &str, code: &str) -> Result<()> {
        let keys = self.keys(session_id);
        self.backend
            .set_promo_code(&keys, code, self.config.ttl_secs)
            .await
            .map_err(logged("failed to set promo code"))?;

        Ok(())
    }
}

fn ensure_positive(quantity: i64) -> Result<()> {
    if quantity < 1 {
        return Err(Error::InvalidQuantity(quantity));
    }
    Ok(())
}

fn logged(message: &'static str) -> impl FnOnce(store::Error) -> store::Error {
    move |err| {
        tracing::error!(err = %err, "{message}");
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> ItemDetails {
        ItemDetails::new("p1", "Widget", Price::from_cents(999))
    }

    fn carts() -> CartStore<MemoryStore> {
        CartStore::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_rejects_non_positive_quantities() {
        let carts = carts();

        assert!(matches!(
            carts.add_item("s", &widget(), 0).await,
            Err(Error::InvalidQuantity(0))
        ));
        assert!(matches!(
            carts.decrement_quantity("s", "p1", -1).await,
            Err(Error::InvalidQuantity(-1))
        ));
        assert!(matches!(
            carts.set_quantity("s", "p1", 0).await,
            Err(Error::InvalidQuantity(0))
        ));
        assert!(carts.get_cart("s").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_items_are_sorted_by_product_id() {
        let carts = carts();
        for id in ["c", "a", "b"] {
            let details = ItemDetails::new(id, id.to_uppercase(), Price::from_cents(100));
            carts.add_item("s", &details, 1).await.unwrap();
        }

        let ids: Vec<_> = carts
            .get_cart("s")
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.product_id)
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_custom_prefix_is_used_for_keys() {
        let carts = CartStore::with_config(
            Arc::new(MemoryStore::new()),
            CartConfig::build().key_prefix("shop"),
        );
        assert_eq!(carts.keys("s").quantities(), "shop:s:qty");
    }
}
