#![cfg(feature = "axum")]

mod common;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::{Body, to_bytes},
        extract::Request,
        http::{
            Method, StatusCode,
            header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
        },
    };
    use cart_store::api;
    use cart_store::session::CookieOptions;
    use common::*;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn create_test_app() -> Router {
        let cookie_options = CookieOptions::build().name("cart_sess").secure(false);
        Router::new().nest("/cart", api::router(memory_carts(), cookie_options))
    }

    /// Sends one request, returning the status, the `name=value` pair of any
    /// cookie set by the response, and the JSON body.
    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Option<String>, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        let request = match body {
            Some(body) => request
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let set_cookie = response
            .headers()
            .get(SET_COOKIE)
            .map(|value| value.to_str().unwrap().split(';').next().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, set_cookie, body)
    }

    /// Opens a session by reading the (empty) cart and returns its cookie.
    async fn open_session(app: &Router) -> String {
        let (status, cookie, body) = send(app, Method::GET, "/cart", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
        cookie.expect("a new session should set a cookie")
    }

    #[tokio::test]
    async fn test_new_session_gets_cookie() {
        let app = create_test_app();

        let response = app
            .oneshot(Request::builder().uri("/cart").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let cookie_str = response
            .headers()
            .get(SET_COOKIE)
            .expect("Set-Cookie header should be present")
            .to_str()
            .unwrap();
        assert!(cookie_str.starts_with("cart_sess="));
        assert!(cookie_str.contains("HttpOnly"));
        assert!(cookie_str.contains("SameSite=Lax"));
        assert!(!cookie_str.contains("Secure"));
    }

    #[tokio::test]
    async fn test_cookie_carries_configured_domain_and_lifetime() {
        let cookie_options = CookieOptions::build()
            .name("cart_sess")
            .domain("shop.example.com")
            .max_age(3600);
        let app = Router::new().nest("/cart", api::router(memory_carts(), cookie_options));

        let response = app
            .oneshot(Request::builder().uri("/cart").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let cookie_str = response
            .headers()
            .get(SET_COOKIE)
            .expect("Set-Cookie header should be present")
            .to_str()
            .unwrap();
        assert!(cookie_str.contains("Domain=shop.example.com"));
        assert!(cookie_str.contains("Max-Age=3600"));
        assert!(cookie_str.contains("Path=/"));
        assert!(cookie_str.contains("Secure"));
    }

    #[tokio::test]
    async fn test_existing_session_is_reused() {
        let app = create_test_app();
        let cookie = open_session(&app).await;

        let (status, set_cookie, _) = send(
            &app,
            Method::POST,
            "/cart/add",
            Some(&cookie),
            Some(json!({"product_id": "p1", "quantity": 2, "name": "Widget", "price": 9.99})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(set_cookie, None);

        let (_, _, body) = send(&app, Method::GET, "/cart", Some(&cookie), None).await;
        assert_eq!(
            body,
            json!([{"product_id": "p1", "name": "Widget", "price": 9.99, "quantity": 2}])
        );

        // A different session sees its own, empty cart.
        let other = open_session(&app).await;
        assert_ne!(other, cookie);
    }

    #[tokio::test]
    async fn test_malformed_session_cookie_is_replaced() {
        let app = create_test_app();

        let (status, set_cookie, body) =
            send(&app, Method::GET, "/cart", Some("cart_sess=not-a-session"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
        let set_cookie = set_cookie.expect("a replacement cookie should be set");
        assert_ne!(set_cookie, "cart_sess=not-a-session");
    }

    #[tokio::test]
    async fn test_cart_lifecycle() {
        let app = create_test_app();
        let cookie = open_session(&app).await;
        let cookie = Some(cookie.as_str());

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/cart/add",
            cookie,
            Some(json!({"product_id": "p1", "name": "Widget", "price": 9.99})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Added to cart."}));

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/cart/quantity",
            cookie,
            Some(json!({"product_id": "p1", "action": "inc"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "inc quantity successful"}));

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/cart/set-quantity",
            cookie,
            Some(json!({"product_id": "p1", "quantity": 5})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Quantity updated to 5"}));

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/cart/promo",
            cookie,
            Some(json!({"code": "SAVE10"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Promo code applied."}));

        let (_, _, body) = send(&app, Method::GET, "/cart/promo", cookie, None).await;
        assert_eq!(body, json!({"promo_code": "SAVE10"}));

        let (_, _, body) = send(&app, Method::GET, "/cart/summary", cookie, None).await;
        assert_eq!(
            body,
            json!({
                "items": [{"product_id": "p1", "name": "Widget", "price": 9.99, "quantity": 5}],
                "promo_code": "SAVE10",
                "units": 5,
                "subtotal": 49.95
            })
        );

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/cart/remove",
            cookie,
            Some(json!({"product_id": "p1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Removed from cart."}));

        let (_, _, body) = send(&app, Method::GET, "/cart/promo", cookie, None).await;
        assert_eq!(body, json!({"promo_code": null}));
    }

    #[tokio::test]
    async fn test_decrement_to_zero_removes_item() {
        let app = create_test_app();
        let cookie = open_session(&app).await;
        let cookie = Some(cookie.as_str());

        send(
            &app,
            Method::POST,
            "/cart/add",
            cookie,
            Some(json!({"product_id": "p1", "quantity": 1, "name": "Widget", "price": 9.99})),
        )
        .await;

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/cart/quantity",
            cookie,
            Some(json!({"product_id": "p1", "action": "dec"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "dec quantity successful"}));

        let (_, _, body) = send(&app, Method::GET, "/cart", cookie, None).await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_update_item_and_clear() {
        let app = create_test_app();
        let cookie = open_session(&app).await;
        let cookie = Some(cookie.as_str());

        let (status, _, body) = send(
            &app,
            Method::PUT,
            "/cart/item",
            cookie,
            Some(json!({"product_id": "p2", "name": "Gadget", "price": 15.0, "quantity": 3})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Cart item updated."}));

        let (_, _, body) = send(&app, Method::GET, "/cart", cookie, None).await;
        assert_eq!(
            body,
            json!([{"product_id": "p2", "name": "Gadget", "price": 15.0, "quantity": 3}])
        );

        let (status, _, body) = send(&app, Method::DELETE, "/cart", cookie, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Cart cleared."}));

        let (_, _, body) = send(&app, Method::GET, "/cart", cookie, None).await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let app = create_test_app();
        let cookie = open_session(&app).await;
        let cookie = Some(cookie.as_str());

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/cart/set-quantity",
            cookie,
            Some(json!({"product_id": "ghost", "quantity": 2})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Product not found in cart."}));

        let (status, _, _) = send(
            &app,
            Method::POST,
            "/cart/quantity",
            cookie,
            Some(json!({"product_id": "ghost", "action": "inc"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, _, body) = send(&app, Method::GET, "/cart", cookie, None).await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_summary_out_of_range_is_bad_request() {
        let app = create_test_app();
        let cookie = open_session(&app).await;
        let cookie = Some(cookie.as_str());

        let (status, _, _) = send(
            &app,
            Method::POST,
            "/cart/add",
            cookie,
            Some(json!({"product_id": "p1", "quantity": i64::MAX / 10, "name": "Widget", "price": 9.99})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, body) = send(&app, Method::GET, "/cart/summary", cookie, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Cart total is out of range."}));

        let (status, _, _) = send(&app, Method::GET, "/cart", cookie, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected() {
        let app = create_test_app();
        let cookie = open_session(&app).await;
        let cookie = Some(cookie.as_str());

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/cart/add",
            cookie,
            Some(json!({"product_id": "p1", "quantity": 0, "name": "Widget", "price": 9.99})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("at least 1"));

        let (status, _, _) = send(
            &app,
            Method::POST,
            "/cart/add",
            cookie,
            Some(json!({"product_id": "p1", "name": "Widget", "price": -1.0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, _) = send(
            &app,
            Method::POST,
            "/cart/promo",
            cookie,
            Some(json!({"code": "  "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, _, body) = send(&app, Method::GET, "/cart", cookie, None).await;
        assert_eq!(body, json!([]));
    }
}
