use crate::error::Result;
use crate::pipeline::rates::{ExchangeRateTable, ResolvedRates};
use crate::types::{BankRecord, EnrichedBankRecord};
use tracing::{info, instrument};

/// Rounds to two decimals, halves away from zero (half-up for the
/// non-negative amounts handled here).
pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Projects every record into USD, GBP, EUR and INR millions.
///
/// Fails with `MissingRate` before producing any output when a rate is
/// absent or not numeric. The input is left untouched.
#[instrument(skip_all, fields(records = records.len()))]
pub fn transform(
    records: &[BankRecord],
    rates: &ExchangeRateTable,
) -> Result<Vec<EnrichedBankRecord>> {
    let rates = rates.resolve()?;
    let enriched: Vec<EnrichedBankRecord> = records.iter().map(|r| enrich(r, &rates)).collect();
    info!("Transformed {} records", enriched.len());
    Ok(enriched)
}

fn enrich(record: &BankRecord, rates: &ResolvedRates) -> EnrichedBankRecord {
    let usd_million = record.market_cap_usd_billion * 1000.0;
    EnrichedBankRecord {
        name: record.name.clone(),
        market_cap_usd_billion: record.market_cap_usd_billion,
        market_cap_usd_million: usd_million,
        market_cap_gbp_million: round_currency(usd_million * rates.gbp),
        market_cap_eur_million: round_currency(usd_million * rates.eur),
        market_cap_inr_million: round_currency(usd_million * rates.inr),
    }
}
