use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, AppState};
use crate::cart::{CartItem, ItemDetails, Price};
use crate::extract::CartSession;
use crate::store::CartBackend;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub message: String,
}

impl Message {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddToCart {
    pub product_id: String,
    #[serde(default = "one")]
    pub quantity: i64,
    pub name: String,
    pub price: Price,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RemoveFromCart {
    pub product_id: String,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuantityAction {
    #[default]
    Inc,
    Dec,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateQuantity {
    pub product_id: String,
    #[serde(default)]
    pub action: QuantityAction,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetQuantity {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateItem {
    pub product_id: String,
    pub name: String,
    pub price: Price,
    pub quantity: i64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromoCode {
    pub promo_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetPromoCode {
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartSummary {
    pub items: Vec<CartItem>,
    pub promo_code: Option<String>,
    pub units: i64,
    pub subtotal: Price,
}

fn one() -> i64 {
    1
}

fn validate_details(product_id: &str, name: &str, price: Price) -> Result<ItemDetails, ApiError> {
    if product_id.trim().is_empty() {
        return Err(ApiError::BadRequest(String::from("product_id must not be empty.")));
    }
    if price.is_negative() {
        return Err(ApiError::BadRequest(String::from("price must not be negative.")));
    }

    Ok(ItemDetails::new(product_id, name, price))
}

pub async fn get_cart<B: CartBackend>(
    State(state): State<AppState<B>>,
    session: CartSession,
) -> Result<Json<Vec<CartItem>>, ApiError> {
    let items = state.carts().get_cart(&session.id().to_string()).await?;
    Ok(Json(items))
}

pub async fn get_summary<B: CartBackend>(
    State(state): State<AppState<B>>,
    session: CartSession,
) -> Result<Json<CartSummary>, ApiError> {
    let cart = state
        .carts()
        .get_cart_with_promo(&session.id().to_string())
        .await?;

    let out_of_range = || ApiError::BadRequest(String::from("Cart total is out of range."));
    let units = cart.units().ok_or_else(out_of_range)?;
    let subtotal = cart.subtotal().ok_or_else(out_of_range)?;

    Ok(Json(CartSummary {
        units,
        subtotal,
        items: cart.items,
        promo_code: cart.promo_code,
    }))
}

pub async fn clear_cart<B: CartBackend>(
    State(state): State<AppState<B>>,
    session: CartSession,
) -> Result<Json<Message>, ApiError> {
    state.carts().clear_cart(&session.id().to_string()).await?;
    Ok(Message::new("Cart cleared."))
}

pub async fn add_item<B: CartBackend>(
    State(state): State<AppState<B>>,
    session: CartSession,
    Json(payload): Json<AddToCart>,
) -> Result<Json<Message>, ApiError> {
    let details = validate_details(&payload.product_id, &payload.name, payload.price)?;
    state
        .carts()
        .add_item(&session.id().to_string(), &details, payload.quantity)
        .await?;

    Ok(Message::new("Added to cart."))
}

pub async fn remove_item<B: CartBackend>(
    State(state): State<AppState<B>>,
    session: CartSession,
    Json(payload): Json<RemoveFromCart>,
) -> Result<Json<Message>, ApiError> {
    state
        .carts()
        .remove_item(&session.id().to_string(), &payload.product_id)
        .await?;

    Ok(Message::new("Removed from cart."))
}

pub async fn update_quantity<B: CartBackend>(
    State(state): State<AppState<B>>,
    session: CartSession,
    Json(payload): Json<UpdateQuantity>,
) -> Result<Json<Message>, ApiError> {
    let session_id = session.id().to_string();

    let action = match payload.action {
        QuantityAction::Inc => {
            state
                .carts()
                .increment_quantity(&session_id, &payload.product_id, 1)
                .await?
                .ok_or(ApiError::NotFound("Product not found in cart."))?;
            "inc"
        }
        QuantityAction::Dec => {
            let outcome = state
                .carts()
                .decrement_quantity(&session_id, &payload.product_id, 1)
                .await?;
            tracing::debug!(?outcome, product_id = %payload.product_id, "decremented cart item");
            "dec"
        }
    };

    Ok(Message::new(format!("{action} quantity successful")))
}

pub async fn set_quantity<B: CartBackend>(
    State(state): State<AppState<B>>,
    session: CartSession,
    Json(payload): Json<SetQuantity>,
) -> Result<Json<Message>, ApiError> {
    let updated = state
        .carts()
        .set_quantity(&session.id().to_string(), &payload.product_id, payload.quantity)
        .await?;

    if !updated {
        return Err(ApiError::NotFound("Product not found in cart."));
    }

    Ok(Message::new(format!("Quantity updated to {}", payload.quantity)))
}

pub async fn update_item<B: CartBackend>(
    State(state): State<AppState<B>>,
    session: CartSession,
    Json(payload): Json<UpdateItem>,
) -> Result<Json<Message>, ApiError> {
    let details = validate_details(&payload.product_id, &payload.name, payload.price)?;
    state
        .carts()
        .update_item(&session.id().to_string(), &details, payload.quantity)
        .await?;

    Ok(Message::new("Cart item updated."))
}

pub async fn get_promo_code<B: CartBackend>(
    State(state): State<AppState<B>>,
    session: CartSession,
) -> Result<Json<PromoCode>, ApiError> {
    let promo_code = state
        .carts()
        .get_promo_code(&session.id().to_string())
        .await?;

    Ok(Json(PromoCode { promo_code }))
}

pub async fn set_promo_code<B: CartBackend>(
    State(state): State<AppState<B>>,
    session: CartSession,
    Json(payload): Json<SetPromoCode>,
) -> Result<Json<Message>, ApiError> {
    if payload.code.trim().is_empty() {
        return Err(ApiError::BadRequest(String::from("code must not be empty.")));
    }

    state
        .carts()
        .set_promo_code(&session.id().to_string(), &payload.code)
        .await?;

    Ok(Message::new("Promo code applied."))
}
