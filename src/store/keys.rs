//! Key naming for the per-session cart records.
//!
//! All three records of a session share the `{prefix}:{session_id}:` stem:
//!
//! | record      | key                              |
//! |-------------|----------------------------------|
//! | quantities  | `{prefix}:{session_id}:qty`        |
//! | details     | `{prefix}:{session_id}:details`    |
//! | promo code  | `{prefix}:{session_id}:promo_code` |

pub const DEFAULT_PREFIX: &str = "cart";

const QUANTITIES_SUFFIX: &str = "qty";
const DETAILS_SUFFIX: &str = "details";
const PROMO_CODE_SUFFIX: &str = "promo_code";

/// The derived cache keys of one session's cart.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CartKeys {
    session_id: String,
    quantities: String,
    details: String,
    promo_code: String,
}

impl CartKeys {
    pub fn new(prefix: &str, session_id: &str) -> Self {
        Self {
            session_id: session_id.to_owned(),
            quantities: record_key(prefix, session_id, QUANTITIES_SUFFIX),
            details: record_key(prefix, session_id, DETAILS_SUFFIX),
            promo_code: record_key(prefix, session_id, PROMO_CODE_SUFFIX),
        }
    }

    /// The session this cart belongs to.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn quantities(&self) -> &str {
        &self.quantities
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    pub fn promo_code(&self) -> &str {
        &self.promo_code
    }

    /// All record keys in `[quantities, details, promo_code]` order.
    ///
    /// The Redis scripts rely on this order for `KEYS[1..3]`.
    pub fn all(&self) -> [&str; 3] {
        [&self.quantities, &self.details, &self.promo_code]
    }
}

fn record_key(prefix: &str, session_id: &str, suffix: &str) -> String {
    format!("{prefix}:{session_id}:{suffix}")
}
