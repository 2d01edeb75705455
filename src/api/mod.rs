//! HTTP endpoints for carts.
//!
//! Mount the router wherever the cart should live:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use axum::Router;
//! use cart_store::CartStore;
//! use cart_store::api;
//! use cart_store::session::CookieOptions;
//! use cart_store::store::MemoryStore;
//!
//! let carts = CartStore::new(Arc::new(MemoryStore::new()));
//! let app: Router = Router::new().nest("/cart", api::router(carts, CookieOptions::build()));
//! ```

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use serde_json::json;
use tower_cookies::CookieManagerLayer;

use crate::cart::{self, CartStore};
use crate::session::CookieOptions;
use crate::store::CartBackend;

mod handlers;
pub use handlers::*;

/// Shared state of the cart endpoints.
#[derive(Debug)]
pub struct AppState<B: CartBackend> {
    carts: CartStore<B>,
    cookie_options: Arc<CookieOptions>,
}

impl<B: CartBackend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            carts: self.carts.clone(),
            cookie_options: Arc::clone(&self.cookie_options),
        }
    }
}

impl<B: CartBackend> AppState<B> {
    pub fn new(carts: CartStore<B>, cookie_options: CookieOptions) -> Self {
        Self {
            carts,
            cookie_options: Arc::new(cookie_options),
        }
    }

    pub fn carts(&self) -> &CartStore<B> {
        &self.carts
    }

    pub fn cookie_options(&self) -> &CookieOptions {
        &self.cookie_options
    }
}

/// Builds the cart routes, including the cookie layer the session
/// extractor relies on.
pub fn router<B: CartBackend>(carts: CartStore<B>, cookie_options: CookieOptions) -> Router {
    Router::new()
        .route("/", get(get_cart::<B>).delete(clear_cart::<B>))
        .route("/summary", get(get_summary::<B>))
        .route("/add", post(add_item::<B>))
        .route("/remove", post(remove_item::<B>))
        .route("/quantity", post(update_quantity::<B>))
        .route("/set-quantity", post(set_quantity::<B>))
        .route("/item", put(update_item::<B>))
        .route("/promo", get(get_promo_code::<B>).post(set_promo_code::<B>))
        .with_state(AppState::new(carts, cookie_options))
        .layer(CookieManagerLayer::new())
}

/// Failure responses of the cart endpoints. Rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(&'static str),
    Cart(cart::Error),
}

impl From<cart::Error> for ApiError {
    fn from(err: cart::Error) -> Self {
        ApiError::Cart(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message.to_string()),
            ApiError::Cart(err @ cart::Error::InvalidQuantity(_)) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            ApiError::Cart(err @ cart::Error::Conflict { .. }) => {
                (StatusCode::CONFLICT, err.to_string())
            }
            ApiError::Cart(cart::Error::Store(err)) => {
                tracing::error!(err = %err, "cart store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    String::from("Cart storage is unavailable."),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
