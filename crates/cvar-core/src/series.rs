//! Price series and log-return extraction.
//!
//! `PriceSeries` is an ordered map from `NaiveDate` to price, the shape the
//! external price-acquisition collaborator delivers.  Log returns computed
//! from it are immutable once extracted.

use crate::errors::{Error, Result};
use crate::Real;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// An ordered date-indexed price series for one asset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PriceSeries {
    data: BTreeMap<NaiveDate, Real>,
}

impl std::iter::FromIterator<(NaiveDate, Real)> for PriceSeries {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, Real)>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}

impl PriceSeries {
    /// Create an empty series.
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
        }
    }

    /// Build from an iterator of `(date, price)` pairs.
    pub fn from_pairs(iter: impl IntoIterator<Item = (NaiveDate, Real)>) -> Self {
        iter.into_iter().collect()
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the series is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Insert or overwrite a price.
    pub fn insert(&mut self, date: NaiveDate, price: Real) {
        self.data.insert(date, price);
    }

    /// Look up a price by date.
    pub fn get(&self, date: &NaiveDate) -> Option<Real> {
        self.data.get(date).copied()
    }

    /// All dates in ascending order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.data.keys().copied().collect()
    }

    /// All prices in date-ascending order.
    pub fn prices(&self) -> Vec<Real> {
        self.data.values().copied().collect()
    }

    /// The last observed price, or `None` if empty.
    pub fn last_price(&self) -> Option<Real> {
        self.data.values().next_back().copied()
    }

    /// Log returns `ln(p_t / p_{t-1})` in date order.
    ///
    /// Requires at least two strictly positive prices.
    pub fn log_returns(&self) -> Result<Vec<Real>> {
        if self.data.len() < 2 {
            return Err(Error::InsufficientData {
                context: "price series".into(),
                observations: self.data.len(),
                required: 2,
            });
        }
        let prices = self.prices();
        if let Some(&p) = prices.iter().find(|&&p| p <= 0.0) {
            return Err(Error::InvalidArgument(format!(
                "prices must be positive for log returns, got {p}"
            )));
        }
        Ok(prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect())
    }
}

/// Align several price series on their common dates.
///
/// Any date missing from at least one asset is dropped from all of them.
/// Output preserves the asset order of `series`.
pub fn align(series: &[(&str, &PriceSeries)]) -> Result<Vec<(String, PriceSeries)>> {
    if series.is_empty() {
        return Err(Error::InvalidArgument(
            "no price series to align".into(),
        ));
    }
    let mut common: Vec<NaiveDate> = series[0].1.dates();
    for (_, s) in &series[1..] {
        common.retain(|d| s.get(d).is_some());
    }
    Ok(series
        .iter()
        .map(|(name, s)| {
            let aligned = common
                .iter()
                .filter_map(|d| s.get(d).map(|p| (*d, p)))
                .collect();
            (name.to_string(), aligned)
        })
        .collect())
}
