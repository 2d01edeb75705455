use crate::store::keys::DEFAULT_PREFIX;

/// Rolling inactivity window of a cart, in seconds.
pub const DEFAULT_TTL_SECS: i64 = 30 * 60;

/// How many times a compare-and-set quantity write is attempted before
/// giving up with [`Error::Conflict`](crate::cart::Error::Conflict).
pub const DEFAULT_MAX_CAS_ATTEMPTS: u32 = 5;

/// Configuration for a [`CartStore`](crate::CartStore).
///
/// # Example
///
/// ```rust
/// use cart_store::CartConfig;
///
/// let config = CartConfig::build()
///     .ttl(15 * 60)
///     .max_cas_attempts(10)
///     .key_prefix("shop:cart");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CartConfig {
    pub ttl_secs: i64,
    pub max_cas_attempts: u32,
    pub key_prefix: String,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL_SECS,
            max_cas_attempts: DEFAULT_MAX_CAS_ATTEMPTS,
            key_prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

impl CartConfig {
    /// Creates a new `CartConfig` with default values.
    pub fn build() -> Self {
        Self::default()
    }

    /// Sets the expiry applied to all cart records on every mutation.
    ///
    /// Values below one second are raised to one second.
    pub fn ttl(mut self, seconds: i64) -> Self {
        self.ttl_secs = seconds.max(1);
        self
    }

    /// At least one attempt is always made.
    pub fn max_cas_attempts(mut self, attempts: u32) -> Self {
        self.max_cas_attempts = attempts.max(1);
        self
    }

    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }
}
