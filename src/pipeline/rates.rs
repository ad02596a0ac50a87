use crate::error::{EtlError, Result};
use crate::types::Currency;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Currency code to "units of that currency per one USD", as read from the
/// rate source. Entries are kept raw; numeric coercion happens on lookup so a
/// malformed entry surfaces as `MissingRate` at the transformation boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExchangeRateTable {
    entries: BTreeMap<String, String>,
}

/// Validated rates for every target currency
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedRates {
    pub gbp: f64,
    pub eur: f64,
    pub inr: f64,
}

impl ResolvedRates {
    pub fn get(&self, currency: Currency) -> f64 {
        match currency {
            Currency::Gbp => self.gbp,
            Currency::Eur => self.eur,
            Currency::Inr => self.inr,
        }
    }
}

impl ExchangeRateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, code: &str, rate: f64) -> Self {
        self.insert_raw(code, &rate.to_string());
        self
    }

    pub fn insert_raw(&mut self, code: &str, raw: &str) {
        self.entries
            .insert(code.trim().to_ascii_uppercase(), raw.trim().to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Loads the rate file. An unreadable file means no rates are available.
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            EtlError::MissingRate(format!("cannot read rate file '{}': {}", path.display(), e))
        })?;
        let table = Self::from_reader(file)?;
        info!("Loaded {} exchange rates from {}", table.len(), path.display());
        Ok(table)
    }

    /// Accepts either a wide layout (`GBP,EUR,INR` header, one data row) or a
    /// long layout (`Currency,Rate` header, one row per currency).
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr
            .headers()
            .map_err(|e| EtlError::MissingRate(format!("malformed rate file: {e}")))?
            .clone();

        let mut table = Self::new();
        let is_long = headers.len() >= 2
            && headers[0].eq_ignore_ascii_case("currency")
            && headers[1].eq_ignore_ascii_case("rate");

        if is_long {
            debug!("Reading exchange rates in currency/rate layout");
            for record in rdr.records() {
                let record =
                    record.map_err(|e| EtlError::MissingRate(format!("malformed rate file: {e}")))?;
                if let (Some(code), Some(rate)) = (record.get(0), record.get(1)) {
                    if !code.is_empty() {
                        table.insert_raw(code, rate);
                    }
                }
            }
        } else {
            debug!("Reading exchange rates in one-row layout");
            let first = rdr
                .records()
                .next()
                .ok_or_else(|| EtlError::MissingRate("rate file has no data row".to_string()))?
                .map_err(|e| EtlError::MissingRate(format!("malformed rate file: {e}")))?;
            for (code, rate) in headers.iter().zip(first.iter()) {
                if !code.is_empty() {
                    table.insert_raw(code, rate);
                }
            }
        }

        Ok(table)
    }

    /// Coerce-or-fail lookup of a single rate.
    pub fn rate(&self, currency: Currency) -> Result<f64> {
        let raw = self
            .entries
            .get(currency.code())
            .ok_or_else(|| EtlError::MissingRate(format!("no {} column", currency)))?;
        let rate: f64 = raw.parse().map_err(|_| {
            EtlError::MissingRate(format!("{} rate '{}' is not numeric", currency, raw))
        })?;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(EtlError::MissingRate(format!(
                "{} rate '{}' is not a positive number",
                currency, raw
            )));
        }
        Ok(rate)
    }

    pub fn resolve(&self) -> Result<ResolvedRates> {
        Ok(ResolvedRates {
            gbp: self.rate(Currency::Gbp)?,
            eur: self.rate(Currency::Eur)?,
            inr: self.rate(Currency::Inr)?,
        })
    }
}
