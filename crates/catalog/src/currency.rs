//! Currency conversion around a single pivot currency.
//!
//! Every exchange rate is stored relative to the pivot: one pivot unit is worth
//! `exchange_rate` units of the other currency. All filter bounds and price
//! comparisons happen in pivot units at full precision; rounding is applied only
//! when a value is presented.

use serde::{Deserialize, Serialize};

use vitrine_core::{CurrencyId, Entity};

const DEFAULT_DECIMAL_PLACES: u32 = 2;
/// Display precision is capped here; `10^places` stays finite well past it.
pub const MAX_DECIMAL_PLACES: u32 = 12;

fn default_decimal_places() -> u32 {
    DEFAULT_DECIMAL_PLACES
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    pub id: CurrencyId,
    /// ISO-like code, e.g. `EUR`.
    pub code: String,
    pub exchange_rate: f64,
    #[serde(default)]
    pub is_pivot: bool,
    #[serde(default = "default_decimal_places")]
    pub decimal_places: u32,
}

impl Currency {
    /// Display precision, capped at [`MAX_DECIMAL_PLACES`].
    pub fn places(&self) -> u32 {
        self.decimal_places.min(MAX_DECIMAL_PLACES)
    }

    /// Round to this currency's display precision.
    pub fn round(&self, amount: f64) -> f64 {
        let factor = 10f64.powi(self.places() as i32);
        (amount * factor).round() / factor
    }

    /// `"<amount> <CODE>"` with the display precision applied.
    pub fn format(&self, amount: f64) -> String {
        format!(
            "{:.*} {}",
            self.places() as usize,
            self.round(amount),
            self.code
        )
    }

    /// Whether amounts can be converted through this currency.
    pub fn has_usable_rate(&self) -> bool {
        self.is_pivot || (self.exchange_rate.is_finite() && self.exchange_rate > 0.0)
    }
}

impl Entity for Currency {
    type Id = CurrencyId;

    fn id(&self) -> CurrencyId {
        self.id
    }
}

/// Convert an amount expressed in `currency` into pivot units.
///
/// A non-positive (or non-finite) rate leaves the amount unconverted.
pub fn to_pivot(amount: f64, currency: &Currency) -> f64 {
    if currency.is_pivot {
        return amount;
    }
    if !currency.has_usable_rate() {
        tracing::warn!(
            currency = %currency.code,
            rate = currency.exchange_rate,
            "unusable exchange rate; amount left unconverted"
        );
        return amount;
    }
    amount / currency.exchange_rate
}

/// Convert an amount in pivot units into `currency`.
pub fn from_pivot(amount: f64, currency: &Currency) -> f64 {
    if currency.is_pivot {
        return amount;
    }
    if !currency.has_usable_rate() {
        tracing::warn!(
            currency = %currency.code,
            rate = currency.exchange_rate,
            "unusable exchange rate; amount left unconverted"
        );
        return amount;
    }
    amount * currency.exchange_rate
}

/// Convert between two arbitrary currencies by way of the pivot.
pub fn convert(amount: f64, from: &Currency, to: &Currency) -> f64 {
    if from.id == to.id {
        return amount;
    }
    from_pivot(to_pivot(amount, from), to)
}

/// Pick the pivot currency out of a list. When the data holds several, the
/// lowest id wins so the choice is stable.
pub fn find_pivot(currencies: &[Currency]) -> Option<&Currency> {
    currencies
        .iter()
        .filter(|c| c.is_pivot)
        .min_by_key(|c| c.id)
}
