use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A monetary amount with two-decimal precision, kept as whole cents.
///
/// Serializes as a plain number (`9.99`) so carts render the way the catalog
/// prices them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(i64);

impl Price {
    pub const ZERO: Price = Price(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Rounds `amount` to the nearest cent. Returns `None` for NaN or infinite
    /// input.
    pub fn from_f64(amount: f64) -> Option<Self> {
        if amount.is_finite() {
            Some(Self((amount * 100.0).round() as i64))
        } else {
            None
        }
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Returns `None` on overflow.
    pub fn checked_add(self, rhs: Price) -> Option<Price> {
        self.0.checked_add(rhs.0).map(Price)
    }

    /// The price of `quantity` units, or `None` on overflow.
    pub fn checked_mul(self, quantity: i64) -> Option<Price> {
        self.0.checked_mul(quantity).map(Price)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", cents / 100, cents % 100)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceParseError {
    #[error("price is empty")]
    Empty,

    #[error("price `{0}` has more than two decimal places")]
    TooPrecise(String),

    #[error("price `{0}` is not a decimal number")]
    Invalid(String),
}

impl FromStr for Price {
    type Err = PriceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PriceParseError::Empty);
        }

        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (units, fraction) = digits.split_once('.').unwrap_or((digits, ""));

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if units.is_empty() || !all_digits(units) || !all_digits(fraction) {
            return Err(PriceParseError::Invalid(s.to_owned()));
        }
        if fraction.len() > 2 {
            return Err(PriceParseError::TooPrecise(s.to_owned()));
        }

        let invalid = || PriceParseError::Invalid(s.to_owned());
        let units: i64 = units.parse().map_err(|_| invalid())?;
        let fraction: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };

        let cents = units
            .checked_mul(100)
            .and_then(|cents| cents.checked_add(fraction))
            .ok_or_else(invalid)?;

        Ok(Self(if negative { -cents } else { cents }))
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        Price::from_f64(amount)
            .ok_or_else(|| serde::de::Error::custom("price must be a finite number"))
    }
}

/// The catalog facts about a product captured when it enters the cart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetails {
    pub product_id: String,
    pub name: String,
    pub price: Price,
}

impl ItemDetails {
    pub fn new(product_id: impl Into<String>, name: impl Into<String>, price: Price) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            price,
        }
    }
}

/// One line of a cart: a product's details joined with its quantity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    pub price: Price,
    pub quantity: i64,
}

impl CartItem {
    pub(crate) fn from_details(details: ItemDetails, quantity: i64) -> Self {
        Self {
            product_id: details.product_id,
            name: details.name,
            price: details.price,
            quantity,
        }
    }

    /// `price * quantity`, or `None` if it does not fit in a [`Price`].
    pub fn line_total(&self) -> Option<Price> {
        self.price.checked_mul(self.quantity)
    }
}

/// A whole cart: its items together with the promo code, if any.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub promo_code: Option<String>,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all items, or `None` on overflow.
    pub fn units(&self) -> Option<i64> {
        self.items
            .iter()
            .try_fold(0_i64, |units, item| units.checked_add(item.quantity))
    }

    /// Sum of all line totals, or `None` if any step overflows.
    pub fn subtotal(&self) -> Option<Price> {
        self.items.iter().try_fold(Price::ZERO, |subtotal, item| {
            subtotal.checked_add(item.line_total()?)
        })
    }
}
