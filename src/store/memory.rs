use crate::store::{CartBackend, CartKeys, CasOutcome, Error};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{Duration, Instant};

#[derive(Debug, Clone)]
enum Record {
    Quantities(HashMap<String, i64>),
    Details(HashMap<String, Vec<u8>>),
    PromoCode(String),
}

impl Record {
    fn is_empty(&self) -> bool {
        match self {
            Record::Quantities(map) => map.is_empty(),
            Record::Details(map) => map.is_empty(),
            Record::PromoCode(_) => false,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredValue {
    record: Record,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map(|expires| expires > now).unwrap_or(true)
    }
}

type Fields = HashMap<String, StoredValue>;

/// An in-memory cart backend.
///
/// Records are grouped per session, and every operation runs while holding
/// that session's map entry, which gives the same all-or-nothing behaviour as
/// the Redis scripts. Expiry follows [`tokio::time::Instant`], so tests can
/// drive it with a paused clock.
///
/// ### Note
///
/// Do not use this in a production environment.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<DashMap<String, Fields>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn cleanup_expired(&self) {
        let now = Instant::now();
        self.data.retain(|_, fields| {
            fields.retain(|_, value| value.is_live(now));
            !fields.is_empty()
        });
    }

    fn read<R>(
        &self,
        keys: &CartKeys,
        f: impl FnOnce(&Fields) -> Result<R, Error>,
    ) -> Result<R, Error> {
        self.cleanup_expired();

        match self.data.get(keys.session_id()) {
            Some(fields) => f(fields.value()),
            None => f(&Fields::new()),
        }
    }

    fn write<R>(
        &self,
        keys: &CartKeys,
        f: impl FnOnce(&mut Fields) -> Result<R, Error>,
    ) -> Result<R, Error> {
        self.cleanup_expired();

        let result = {
            let mut fields = self.data.entry(keys.session_id().to_owned()).or_default();
            let result = f(fields.value_mut());
            // A hash with no fields does not exist in Redis either.
            fields.retain(|_, value| !value.record.is_empty());
            result
        };

        self.data
            .remove_if(keys.session_id(), |_, fields| fields.is_empty());

        result
    }
}

fn wrong_type(key: &str) -> Error {
    Error::Backend(format!(
        "WRONGTYPE operation against key `{key}` holding the wrong kind of value"
    ))
}

fn quantities_mut<'a>(fields: &'a mut Fields, key: &str) -> Result<&'a mut HashMap<String, i64>, Error> {
    let stored = fields.entry(key.to_owned()).or_insert_with(|| StoredValue {
        record: Record::Quantities(HashMap::new()),
        expires_at: None,
    });

    match &mut stored.record {
        Record::Quantities(map) => Ok(map),
        _ => Err(wrong_type(key)),
    }
}

fn details_mut<'a>(fields: &'a mut Fields, key: &str) -> Result<&'a mut HashMap<String, Vec<u8>>, Error> {
    let stored = fields.entry(key.to_owned()).or_insert_with(|| StoredValue {
        record: Record::Details(HashMap::new()),
        expires_at: None,
    });

    match &mut stored.record {
        Record::Details(map) => Ok(map),
        _ => Err(wrong_type(key)),
    }
}

fn quantities<'a>(fields: &'a Fields, key: &str) -> Result<Option<&'a HashMap<String, i64>>, Error> {
    match fields.get(key).map(|stored| &stored.record) {
        None => Ok(None),
        Some(Record::Quantities(map)) => Ok(Some(map)),
        Some(_) => Err(wrong_type(key)),
    }
}

fn details<'a>(fields: &'a Fields, key: &str) -> Result<Option<&'a HashMap<String, Vec<u8>>>, Error> {
    match fields.get(key).map(|stored| &stored.record) {
        None => Ok(None),
        Some(Record::Details(map)) => Ok(Some(map)),
        Some(_) => Err(wrong_type(key)),
    }
}

/// `HINCRBY` semantics: a missing field counts as 0, and a result outside
/// `i64` is an error that leaves the field untouched.
fn add_quantity(
    fields: &mut Fields,
    keys: &CartKeys,
    product_id: &str,
    delta: i64,
) -> Result<i64, Error> {
    let quantities = quantities_mut(fields, keys.quantities())?;
    let current = quantities.get(product_id).copied().unwrap_or(0);
    let total = current
        .checked_add(delta)
        .ok_or_else(|| Error::Backend(String::from("increment or decrement would overflow")))?;

    quantities.insert(product_id.to_owned(), total);
    Ok(total)
}

fn expiry(ttl_secs: i64) -> Option<Instant> {
    if ttl_secs > 0 {
        Some(Instant::now() + Duration::from_secs(ttl_secs as u64))
    } else {
        None
    }
}

/// Resets the expiry of every record of the cart that currently exists.
fn refresh(fields: &mut Fields, keys: &CartKeys, ttl_secs: i64) {
    let expires_at = expiry(ttl_secs);
    for key in keys.all() {
        if let Some(stored) = fields.get_mut(key) {
            stored.expires_at = expires_at;
        }
    }
}

/// Drops the whole cart once the last quantity entry is gone.
///
/// Returns `true` if the cart was dropped.
fn drop_if_empty(fields: &mut Fields, keys: &CartKeys) -> Result<bool, Error> {
    let empty = quantities(fields, keys.quantities())?
        .map(HashMap::is_empty)
        .unwrap_or(true);

    if empty {
        for key in keys.all() {
            fields.remove(key);
        }
    }

    Ok(empty)
}

impl CartBackend for MemoryStore {
    async fn add_item(
        &self,
        keys: &CartKeys,
        product_id: &str,
        quantity: i64,
        details: &[u8],
        ttl_secs: i64,
    ) -> Result<i64, Error> {
        self.write(keys, |fields| {
            let total = add_quantity(fields, keys, product_id, quantity)?;

            details_mut(fields, keys.details())?
                .entry(product_id.to_owned())
                .or_insert_with(|| details.to_vec());

            refresh(fields, keys, ttl_secs);
            Ok(total)
        })
    }

    async fn update_item(
        &self,
        keys: &CartKeys,
        product_id: &str,
        quantity: i64,
        details: &[u8],
        ttl_secs: i64,
    ) -> Result<(), Error> {
        self.write(keys, |fields| {
            quantities_mut(fields, keys.quantities())?.insert(product_id.to_owned(), quantity);
            details_mut(fields, keys.details())?.insert(product_id.to_owned(), details.to_vec());
            refresh(fields, keys, ttl_secs);
            Ok(())
        })
    }

    async fn quantities(&self, keys: &CartKeys) -> Result<HashMap<String, i64>, Error> {
        self.read(keys, |fields| {
            Ok(quantities(fields, keys.quantities())?
                .cloned()
                .unwrap_or_default())
        })
    }

    async fn details(&self, keys: &CartKeys) -> Result<HashMap<String, Vec<u8>>, Error> {
        self.read(keys, |fields| {
            Ok(details(fields, keys.details())?.cloned().unwrap_or_default())
        })
    }

    async fn quantity(&self, keys: &CartKeys, product_id: &str) -> Result<Option<i64>, Error> {
        self.read(keys, |fields| {
            Ok(quantities(fields, keys.quantities())?.and_then(|map| map.get(product_id).copied()))
        })
    }

    async fn remove_item(
        &self,
        keys: &CartKeys,
        product_id: &str,
        ttl_secs: i64,
    ) -> Result<bool, Error> {
        self.write(keys, |fields| {
            let removed = quantities_mut(fields, keys.quantities())?
                .remove(product_id)
                .is_some();
            details_mut(fields, keys.details())?.remove(product_id);

            if !removed || !drop_if_empty(fields, keys)? {
                refresh(fields, keys, ttl_secs);
            }
            Ok(removed)
        })
    }

    async fn increment(
        &self,
        keys: &CartKeys,
        product_id: &str,
        step: i64,
        ttl_secs: i64,
    ) -> Result<Option<i64>, Error> {
        self.write(keys, |fields| {
            let described = details(fields, keys.details())?
                .map(|map| map.contains_key(product_id))
                .unwrap_or(false);
            if !described {
                return Ok(None);
            }

            let total = add_quantity(fields, keys, product_id, step)?;

            refresh(fields, keys, ttl_secs);
            Ok(Some(total))
        })
    }

    async fn compare_and_set_quantity(
        &self,
        keys: &CartKeys,
        product_id: &str,
        expected: i64,
        next: i64,
        ttl_secs: i64,
    ) -> Result<CasOutcome, Error> {
        self.write(keys, |fields| {
            let current = quantities(fields, keys.quantities())?
                .and_then(|map| map.get(product_id).copied());

            match current {
                None => return Ok(CasOutcome::Missing),
                Some(current) if current != expected => return Ok(CasOutcome::Conflict),
                Some(_) => {}
            }

            if next < 1 {
                quantities_mut(fields, keys.quantities())?.remove(product_id);
                details_mut(fields, keys.details())?.remove(product_id);
                if drop_if_empty(fields, keys)? {
                    return Ok(CasOutcome::Committed);
                }
            } else {
                quantities_mut(fields, keys.quantities())?.insert(product_id.to_owned(), next);
            }

            refresh(fields, keys, ttl_secs);
            Ok(CasOutcome::Committed)
        })
    }

    async fn set_quantity(
        &self,
        keys: &CartKeys,
        product_id: &str,
        quantity: i64,
        ttl_secs: i64,
    ) -> Result<bool, Error> {
        self.write(keys, |fields| {
            let Some(entry) = quantities_mut(fields, keys.quantities())?.get_mut(product_id) else {
                return Ok(false);
            };
            *entry = quantity;

            refresh(fields, keys, ttl_secs);
            Ok(true)
        })
    }

    async fn promo_code(&self, keys: &CartKeys) -> Result<Option<String>, Error> {
        self.read(keys, |fields| {
            match fields.get(keys.promo_code()).map(|stored| &stored.record) {
                None => Ok(None),
                Some(Record::PromoCode(code)) => Ok(Some(code.clone())),
                Some(_) => Err(wrong_type(keys.promo_code())),
            }
        })
    }

    async fn set_promo_code(&self, keys: &CartKeys, code: &str, ttl_secs: i64) -> Result<(), Error> {
        self.write(keys, |fields| {
            fields.insert(
                keys.promo_code().to_owned(),
                StoredValue {
                    record: Record::PromoCode(code.to_owned()),
                    expires_at: None,
                },
            );

            refresh(fields, keys, ttl_secs);
            Ok(())
        })
    }

    async fn clear(&self, keys: &CartKeys) -> Result<i64, Error> {
        self.write(keys, |fields| {
            Ok(keys
                .all()
                .into_iter()
                .filter(|key| fields.remove(*key).is_some())
                .count() as i64)
        })
    }
}
