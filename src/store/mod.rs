//! Cache backends for cart records.
//!
//! A cart is kept in three records per session (see [`CartKeys`]). Every
//! backend applies a mutation together with the TTL refresh of all three
//! records in one grouped step, so callers never need to issue a separate
//! `EXPIRE` round trip.

use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::future::Future;

pub mod keys;
pub use keys::CartKeys;

pub mod memory;
pub use memory::MemoryStore;

#[cfg(feature = "redis-store")]
pub mod redis;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Encoding failed with: {0}")]
    Encode(String),

    #[error("Decoding failed with: {0}")]
    Decode(String),

    #[error("{0}")]
    Backend(String),
}

#[cfg(feature = "redis-store")]
impl From<fred::error::Error> for Error {
    fn from(err: fred::error::Error) -> Self {
        Error::Backend(err.to_string())
    }
}

/// Result of a version-checked quantity write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CasOutcome {
    /// The stored quantity matched and the new value was written.
    Committed,
    /// The stored quantity changed since it was read.
    Conflict,
    /// The entry no longer exists.
    Missing,
}

/// The storage operations a [`CartStore`](crate::CartStore) needs from a cache.
///
/// Each mutating method refreshes the expiry of all three records in `keys`
/// to `ttl_secs` as part of the same grouped write. Quantities are raw
/// integers and details are opaque encoded bytes; interpretation belongs to
/// the caller.
pub trait CartBackend: Clone + Send + Sync + 'static {
    /// Adds `quantity` to the product's quantity and writes `details` only if
    /// the product has no details entry yet.
    ///
    /// Returns the quantity after the increment.
    fn add_item(
        &self,
        keys: &CartKeys,
        product_id: &str,
        quantity: i64,
        details: &[u8],
        ttl_secs: i64,
    ) -> impl Future<Output = Result<i64, Error>> + Send;

    /// Overwrites both the quantity and the details entry of a product.
    fn update_item(
        &self,
        keys: &CartKeys,
        product_id: &str,
        quantity: i64,
        details: &[u8],
        ttl_secs: i64,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Returns every `product_id -> quantity` pair.
    fn quantities(
        &self,
        keys: &CartKeys,
    ) -> impl Future<Output = Result<HashMap<String, i64>, Error>> + Send;

    /// Returns every `product_id -> encoded details` pair.
    fn details(
        &self,
        keys: &CartKeys,
    ) -> impl Future<Output = Result<HashMap<String, Vec<u8>>, Error>> + Send;

    /// Returns the quantity of a single product.
    fn quantity(
        &self,
        keys: &CartKeys,
        product_id: &str,
    ) -> impl Future<Output = Result<Option<i64>, Error>> + Send;

    /// Deletes a product from both records. Drops the promo code when no
    /// items remain.
    ///
    /// Returns `true` if the product was in the cart.
    fn remove_item(
        &self,
        keys: &CartKeys,
        product_id: &str,
        ttl_secs: i64,
    ) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Adds `step` to a product's quantity, but only if the product has a
    /// details entry.
    ///
    /// Returns the new quantity, or `None` if the product is not in the cart.
    fn increment(
        &self,
        keys: &CartKeys,
        product_id: &str,
        step: i64,
        ttl_secs: i64,
    ) -> impl Future<Output = Result<Option<i64>, Error>> + Send;

    /// Writes `next` as the product's quantity if the stored value still
    /// equals `expected`. A `next` below 1 deletes the product from both
    /// records instead, and drops the promo code when no items remain.
    fn compare_and_set_quantity(
        &self,
        keys: &CartKeys,
        product_id: &str,
        expected: i64,
        next: i64,
        ttl_secs: i64,
    ) -> impl Future<Output = Result<CasOutcome, Error>> + Send;

    /// Overwrites the quantity of a product already in the cart.
    ///
    /// Returns `false` if the product is not in the cart.
    fn set_quantity(
        &self,
        keys: &CartKeys,
        product_id: &str,
        quantity: i64,
        ttl_secs: i64,
    ) -> impl Future<Output = Result<bool, Error>> + Send;

    fn promo_code(
        &self,
        keys: &CartKeys,
    ) -> impl Future<Output = Result<Option<String>, Error>> + Send;

    fn set_promo_code(
        &self,
        keys: &CartKeys,
        code: &str,
        ttl_secs: i64,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Deletes all three records.
    ///
    /// Returns the number of records that existed.
    fn clear(&self, keys: &CartKeys) -> impl Future<Output = Result<i64, Error>> + Send;
}

#[cfg(feature = "bincode")]
pub(crate) fn serialize_value<T: Serialize>(value: &T) -> Result<Vec<u8>, Error> {
    bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| Error::Encode(e.to_string()))
}

#[cfg(feature = "bincode")]
pub(crate) fn deserialize_value<T: DeserializeOwned>(value: &[u8]) -> Result<T, Error> {
    bincode::serde::decode_from_slice(value, bincode::config::standard())
        .map(|(value, _)| value)
        .map_err(|e| Error::Decode(e.to_string()))
}

#[cfg(all(feature = "messagepack", not(feature = "bincode")))]
pub(crate) fn serialize_value<T: Serialize>(value: &T) -> Result<Vec<u8>, Error> {
    rmp_serde::to_vec_named(value).map_err(|e| Error::Encode(e.to_string()))
}

#[cfg(all(feature = "messagepack", not(feature = "bincode")))]
pub(crate) fn deserialize_value<T: DeserializeOwned>(value: &[u8]) -> Result<T, Error> {
    rmp_serde::from_slice(value).map_err(|e| Error::Decode(e.to_string()))
}
