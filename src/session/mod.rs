//! Session identity for carts.
//!
//! The cart store only needs an opaque string per session. [`SessionId`] is
//! the identifier issued by the HTTP layer; [`CookieOptions`] controls the
//! cookie it travels in.

mod id;
pub use id::SessionId;

#[cfg(feature = "axum")]
mod cookie_options;
#[cfg(feature = "axum")]
pub use cookie_options::CookieOptions;
