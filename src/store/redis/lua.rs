use fred::interfaces::LuaInterface;
use tokio::sync::OnceCell;

/// A Lua script whose SHA1 is resolved (and the script loaded) on first use.
pub(crate) struct Script {
    source: &'static str,
    hash: OnceCell<String>,
}

impl Script {
    const fn new(source: &'static str) -> Self {
        Self {
            source,
            hash: OnceCell::const_new(),
        }
    }

    pub(crate) async fn hash<C>(&self, client: &C) -> Result<&str, fred::error::Error>
    where
        C: LuaInterface + Send + Sync,
    {
        let hash = self
            .hash
            .get_or_try_init(|| async {
                let hash = fred::util::sha1_hash(self.source);
                if !client.script_exists::<bool, _>(&hash).await? {
                    self.load(client).await?;
                }
                Ok::<String, fred::error::Error>(hash)
            })
            .await?;

        Ok(hash.as_str())
    }

    /// Uploads the source to the server. The SHA1 does not change, so a
    /// cached hash stays valid afterwards.
    pub(crate) async fn load<C>(&self, client: &C) -> Result<(), fred::error::Error>
    where
        C: LuaInterface + Send + Sync,
    {
        let _: () = client.script_load(self.source).await?;
        Ok(())
    }
}

// Every script takes the cart keys as KEYS[1] = quantities, KEYS[2] = details,
// KEYS[3] = promo code and gets the shared `refresh` helper prepended.
macro_rules! cart_script {
    ($body:literal) => {
        concat!(
            r#"
    local function refresh(seconds)
        for i = 1, #KEYS do
            redis.call('EXPIRE', KEYS[i], seconds)
        end
    end

    local function drop_if_empty()
        if redis.call('HLEN', KEYS[1]) == 0 then
            redis.call('DEL', KEYS[1], KEYS[2], KEYS[3])
            return true
        end
        return false
    end
"#,
            $body
        )
    };
}

pub(crate) static ADD_ITEM: Script = Script::new(cart_script!(
    r#"
    local product_id = ARGV[1]
    local quantity = tonumber(ARGV[2])
    local details = ARGV[3]
    local seconds = tonumber(ARGV[4])

    local total = redis.call('HINCRBY', KEYS[1], product_id, quantity)
    redis.call('HSETNX', KEYS[2], product_id, details)

    refresh(seconds)
    return total
"#
));

pub(crate) static UPDATE_ITEM: Script = Script::new(cart_script!(
    r#"
    local product_id = ARGV[1]
    local quantity = ARGV[2]
    local details = ARGV[3]
    local seconds = tonumber(ARGV[4])

    redis.call('HSET', KEYS[1], product_id, quantity)
    redis.call('HSET', KEYS[2], product_id, details)

    refresh(seconds)
    return 1
"#
));

pub(crate) static REMOVE_ITEM: Script = Script::new(cart_script!(
    r#"
    local product_id = ARGV[1]
    local seconds = tonumber(ARGV[2])

    local removed = redis.call('HDEL', KEYS[1], product_id)
    redis.call('HDEL', KEYS[2], product_id)

    if removed == 0 or not drop_if_empty() then
        refresh(seconds)
    end

    return removed
"#
));

// Returns nil when the product has no details entry.
pub(crate) static INCREMENT: Script = Script::new(cart_script!(
    r#"
    local product_id = ARGV[1]
    local step = tonumber(ARGV[2])
    local seconds = tonumber(ARGV[3])

    if redis.call('HEXISTS', KEYS[2], product_id) == 0 then
        return false
    end

    local total = redis.call('HINCRBY', KEYS[1], product_id, step)

    refresh(seconds)
    return total
"#
));

// Returns -1 when the entry is missing, 0 on a value mismatch, 1 on commit.
pub(crate) static COMPARE_AND_SET_QUANTITY: Script = Script::new(cart_script!(
    r#"
    local product_id = ARGV[1]
    local expected = tonumber(ARGV[2])
    local next_quantity = tonumber(ARGV[3])
    local seconds = tonumber(ARGV[4])

    local current = redis.call('HGET', KEYS[1], product_id)
    if not current then
        return -1
    end
    if tonumber(current) ~= expected then
        return 0
    end

    if next_quantity < 1 then
        redis.call('HDEL', KEYS[1], product_id)
        redis.call('HDEL', KEYS[2], product_id)
        if drop_if_empty() then
            return 1
        end
    else
        redis.call('HSET', KEYS[1], product_id, next_quantity)
    end

    refresh(seconds)
    return 1
"#
));

pub(crate) static SET_QUANTITY: Script = Script::new(cart_script!(
    r#"
    local product_id = ARGV[1]
    local quantity = ARGV[2]
    local seconds = tonumber(ARGV[3])

    if redis.call('HEXISTS', KEYS[1], product_id) == 0 then
        return 0
    end

    redis.call('HSET', KEYS[1], product_id, quantity)

    refresh(seconds)
    return 1
"#
));

pub(crate) static SET_PROMO_CODE: Script = Script::new(cart_script!(
    r#"
    local code = ARGV[1]
    local seconds = tonumber(ARGV[2])

    redis.call('SET', KEYS[3], code)

    refresh(seconds)
    return 1
"#
));
