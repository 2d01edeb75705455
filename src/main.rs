use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use cart_store::session::CookieOptions;
use cart_store::store::redis::{RedisConfig, RedisStore};
use cart_store::{CartConfig, CartStore, api};
use tracing_subscriber::EnvFilter;

struct Config {
    bind_addr: SocketAddr,
    redis: RedisConfig,
    cart: CartConfig,
    cookie: CookieOptions,
}

impl Config {
    const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
    const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

    fn from_env() -> Self {
        let bind_addr = std::env::var("CART_BIND_ADDR")
            .ok()
            .and_then(|addr| {
                addr.parse::<SocketAddr>()
                    .map_err(|err| tracing::warn!(err = %err, addr = %addr, "invalid CART_BIND_ADDR"))
                    .ok()
            })
            .unwrap_or_else(|| {
                Self::DEFAULT_BIND_ADDR
                    .parse()
                    .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 3000)))
            });

        let redis = RedisConfig::build()
            .url(
                std::env::var("REDIS_URL").unwrap_or_else(|_| Self::DEFAULT_REDIS_URL.to_string()),
            )
            .pool_size(env_or("REDIS_POOL_SIZE", 4));

        let mut cart = CartConfig::build()
            .ttl(env_or("CART_TTL_SECS", 30 * 60))
            .max_cas_attempts(env_or("CART_MAX_CAS_ATTEMPTS", 5));
        if let Ok(prefix) = std::env::var("CART_KEY_PREFIX") {
            cart = cart.key_prefix(prefix);
        }

        let mut cookie = CookieOptions::build()
            .name(std::env::var("CART_COOKIE_NAME").unwrap_or_else(|_| "sessionid".to_string()))
            .secure(env_or("CART_COOKIE_SECURE", true))
            .max_age(env_or("CART_COOKIE_MAX_AGE_SECS", 14 * 24 * 60 * 60));
        if let Ok(domain) = std::env::var("CART_COOKIE_DOMAIN") {
            cookie = cookie.domain(domain);
        }

        Self {
            bind_addr,
            redis,
            cart,
            cookie,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match dotenvy::dotenv() {
        Ok(_) => tracing::info!("Loaded environment variables from .env file"),
        Err(_) => tracing::info!("No .env file found, using system environment variables"),
    }

    let config = Config::from_env();

    let backend = Arc::new(RedisStore::connect(&config.redis).await?);
    let carts = CartStore::with_config(Arc::clone(&backend), config.cart);

    let app = Router::new().nest("/cart", api::router(carts, config.cookie));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "cart server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    backend.close().await?;
    tracing::info!("cart server stopped");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(err = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(err) => {
                tracing::error!(err = %err, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C"),
        _ = terminate => tracing::info!("received terminate signal"),
    }

    tracing::info!("shutting down cart server");
}
