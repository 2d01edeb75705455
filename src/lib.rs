//! # cart-store: session-scoped shopping carts on a key-value cache
//!
//! `cart-store` keeps one shopping cart per session in a shared cache. A cart
//! is split into three records that expire together after a rolling window
//! of inactivity (30 minutes by default):
//!
//! - **quantities**: `product_id -> quantity`, always at least 1,
//! - **details**: `product_id -> {product_id, name, price}`, present exactly
//!   when the quantity is,
//! - **promo code**: a single string, dropped together with the last item.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cart_store::{CartConfig, CartStore, ItemDetails, Price};
//! use cart_store::store::redis::{RedisConfig, RedisStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let redis = RedisStore::connect(&RedisConfig::build().url("redis://127.0.0.1:6379")).await?;
//!     let backend = Arc::new(redis);
//!     let carts = CartStore::with_config(Arc::clone(&backend), CartConfig::build().ttl(30 * 60));
//!
//!     let widget = ItemDetails::new("p1", "Widget", "9.99".parse::<Price>()?);
//!     carts.add_item("sess1", &widget, 2).await?;
//!     carts.set_promo_code("sess1", "SAVE10").await?;
//!
//!     let cart = carts.get_cart_with_promo("sess1").await?;
//!     if let Some(subtotal) = cart.subtotal() {
//!         println!("{} items, subtotal {subtotal}", cart.items.len());
//!     }
//!
//!     backend.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Stores
//!
//! Storage is abstracted by [`store::CartBackend`]:
//!
//! - [`store::MemoryStore`]: in-process, for tests and development.
//! - `store::redis::RedisStore`: Redis via [`fred`](https://docs.rs/fred), behind
//!   the `redis-store` feature. Every mutation is a single Lua script.
//!
//! # Concurrency
//!
//! Requests for the same session may run concurrently. All mutations except
//! decrement are single atomic steps on the cache. Decrement has to read the
//! quantity before it knows whether to lower or delete it, so it commits with
//! a compare-and-set and retries on conflict (see
//! [`CartStore::decrement_quantity`]).
//!
//! # Serialization
//!
//! Details records are encoded with one of:
//!
//! - [`bincode`](https://crates.io/crates/bincode) (default),
//! - [`rmp-serde`](https://crates.io/crates/rmp-serde) (MessagePack), via the
//!   `messagepack` feature with default features disabled.
//!
//! # HTTP
//!
//! The `axum` feature adds [`api::router`], a set of JSON endpoints with a
//! cookie-based session id.

pub mod cart;
pub use cart::{Cart, CartConfig, CartItem, CartStore, Decrement, ItemDetails, Price};

pub mod session;
pub use session::SessionId;

pub mod store;

#[cfg(feature = "axum")]
pub mod api;

#[cfg(feature = "axum")]
mod extract;
#[cfg(feature = "axum")]
pub use extract::CartSession;

#[cfg(feature = "redis-store")]
pub use fred;
