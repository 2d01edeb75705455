mod lua;

use crate::store::redis::lua::{
    ADD_ITEM, COMPARE_AND_SET_QUANTITY, INCREMENT, REMOVE_ITEM, SET_PROMO_CODE, SET_QUANTITY,
    Script, UPDATE_ITEM,
};
use crate::store::{CartBackend, CartKeys, CasOutcome, Error};
use fred::clients::Pool;
use fred::interfaces::{ClientLike, HashesInterface, KeysInterface};
use fred::prelude::{Builder, Config, FromValue, LuaInterface};
use fred::types::Value;
use std::collections::HashMap;
use std::{fmt::Debug, sync::Arc};

/// Connection parameters for [`RedisStore::connect`].
///
/// # Example
///
/// ```rust
/// use cart_store::store::redis::RedisConfig;
///
/// let config = RedisConfig::build()
///     .url("redis://127.0.0.1:6379/0")
///     .pool_size(8);
/// ```
#[derive(Clone, Debug)]
pub struct RedisConfig {
    pub url: String,
    pub pool_size: usize,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::from("redis://127.0.0.1:6379"),
            pool_size: 4,
        }
    }
}

impl RedisConfig {
    /// Creates a new `RedisConfig` with default values.
    pub fn build() -> Self {
        Self::default()
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.max(1);
        self
    }
}

/// A Redis cart backend.
///
/// Quantities and details are Redis hashes keyed by product id, the promo
/// code is a plain string. Every mutation runs as a Lua script, so the data
/// change and the `EXPIRE` of all three keys are applied in one round trip
/// and no reader observes one without the other.
#[derive(Clone, Debug)]
pub struct RedisStore<
    C: HashesInterface + KeysInterface + LuaInterface + Clone + Send + Sync = Pool,
> {
    client: Arc<C>,
}

impl<C> RedisStore<C>
where
    C: HashesInterface + KeysInterface + LuaInterface + Clone + Send + Sync,
{
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &Arc<C> {
        &self.client
    }
}

impl RedisStore<Pool> {
    /// Builds a connection pool from `config` and waits for it to connect.
    #[tracing::instrument(name = "connecting cart store to redis", skip(config), fields(pool_size = config.pool_size))]
    pub async fn connect(config: &RedisConfig) -> Result<Self, Error> {
        let redis_config = Config::from_url(&config.url)?;
        let pool = Builder::from_config(redis_config).build_pool(config.pool_size)?;
        let _connection = pool.init().await.map_err(|err| {
            tracing::error!(err = %err, "failed to connect to redis");
            err
        })?;

        Ok(Self::new(Arc::new(pool)))
    }
}

impl<C> RedisStore<C>
where
    C: ClientLike + HashesInterface + KeysInterface + LuaInterface + Clone + Send + Sync,
{
    /// Closes the connection(s) to the server.
    pub async fn close(&self) -> Result<(), Error> {
        self.client.quit().await?;
        Ok(())
    }
}

impl<C> RedisStore<C>
where
    C: HashesInterface + KeysInterface + LuaInterface + Clone + Send + Sync + 'static,
{
    async fn run<R>(&self, script: &Script, keys: &CartKeys, args: Vec<Value>) -> Result<R, Error>
    where
        R: FromValue,
    {
        let hash = script.hash(self.client.as_ref()).await?;
        let result: Result<R, fred::error::Error> = self
            .client
            .evalsha(hash, keys.all().to_vec(), args.clone())
            .await;

        match result {
            // The server lost its script cache (restart or SCRIPT FLUSH).
            Err(err) if is_noscript(&err) => {
                tracing::warn!("redis script cache was flushed, reloading script");
                script.load(self.client.as_ref()).await?;
                Ok(self
                    .client
                    .evalsha(hash, keys.all().to_vec(), args)
                    .await?)
            }
            result => Ok(result?),
        }
    }
}

fn is_noscript(err: &fred::error::Error) -> bool {
    err.details().contains("NOSCRIPT")
}

impl<C> CartBackend for RedisStore<C>
where
    C: HashesInterface + KeysInterface + LuaInterface + Clone + Send + Sync + 'static,
{
    async fn add_item(
        &self,
        keys: &CartKeys,
        product_id: &str,
        quantity: i64,
        details: &[u8],
        ttl_secs: i64,
    ) -> Result<i64, Error> {
        self.run(
            &ADD_ITEM,
            keys,
            vec![
                product_id.into(),
                quantity.into(),
                details.into(),
                ttl_secs.into(),
            ],
        )
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
        let _: i64 = self
            .run(
                &UPDATE_ITEM,
                keys,
                vec![
                    product_id.into(),
                    quantity.into(),
                    details.into(),
                    ttl_secs.into(),
                ],
            )
            .await?;

        Ok(())
    }

    async fn quantities(&self, keys: &CartKeys) -> Result<HashMap<String, i64>, Error> {
        Ok(self
            .client
            .hgetall::<HashMap<String, i64>, _>(keys.quantities())
            .await?)
    }

    async fn details(&self, keys: &CartKeys) -> Result<HashMap<String, Vec<u8>>, Error> {
        Ok(self
            .client
            .hgetall::<HashMap<String, Vec<u8>>, _>(keys.details())
            .await?)
    }

    async fn quantity(&self, keys: &CartKeys, product_id: &str) -> Result<Option<i64>, Error> {
        Ok(self
            .client
            .hget::<Option<i64>, _, _>(keys.quantities(), product_id)
            .await?)
    }

    async fn remove_item(
        &self,
        keys: &CartKeys,
        product_id: &str,
        ttl_secs: i64,
    ) -> Result<bool, Error> {
        let removed: i64 = self
            .run(&REMOVE_ITEM, keys, vec![product_id.into(), ttl_secs.into()])
            .await?;

        Ok(removed > 0)
    }

    async fn increment(
        &self,
        keys: &CartKeys,
        product_id: &str,
        step: i64,
        ttl_secs: i64,
    ) -> Result<Option<i64>, Error> {
        self.run(
            &INCREMENT,
            keys,
            vec![product_id.into(), step.into(), ttl_secs.into()],
        )
        .await
    }

    async fn compare_and_set_quantity(
        &self,
        keys: &CartKeys,
        product_id: &str,
        expected: i64,
        next: i64,
        ttl_secs: i64,
    ) -> Result<CasOutcome, Error> {
        let outcome: i64 = self
            .run(
                &COMPARE_AND_SET_QUANTITY,
                keys,
                vec![
                    product_id.into(),
                    expected.into(),
                    next.into(),
                    ttl_secs.into(),
                ],
            )
            .await?;

        match outcome {
            1 => Ok(CasOutcome::Committed),
            0 => Ok(CasOutcome::Conflict),
            -1 => Ok(CasOutcome::Missing),
            other => Err(Error::Backend(format!(
                "unexpected compare-and-set reply: {other}"
            ))),
        }
    }

    async fn set_quantity(
        &self,
        keys: &CartKeys,
        product_id: &str,
        quantity: i64,
        ttl_secs: i64,
    ) -> Result<bool, Error> {
        let updated: i64 = self
            .run(
                &SET_QUANTITY,
                keys,
                vec![product_id.into(), quantity.into(), ttl_secs.into()],
            )
            .await?;

        Ok(updated == 1)
    }

    async fn promo_code(&self, keys: &CartKeys) -> Result<Option<String>, Error> {
        Ok(self
            .client
            .get::<Option<String>, _>(keys.promo_code())
            .await?)
    }

    async fn set_promo_code(&self, keys: &CartKeys, code: &str, ttl_secs: i64) -> Result<(), Error> {
        let _: i64 = self
            .run(&SET_PROMO_CODE, keys, vec![code.into(), ttl_secs.into()])
            .await?;

        Ok(())
    }

    async fn clear(&self, keys: &CartKeys) -> Result<i64, Error> {
        Ok(self.client.del::<i64, _>(keys.all().to_vec()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fred::error::{Error as RedisError, ErrorKind};

    #[test]
    fn test_detects_missing_script_replies() {
        let missing = RedisError::new(
            ErrorKind::Unknown,
            "NOSCRIPT No matching script. Please use EVAL.",
        );
        assert!(is_noscript(&missing));

        let other = RedisError::new(ErrorKind::Unknown, "ERR increment or decrement would overflow");
        assert!(!is_noscript(&other));
    }
}
