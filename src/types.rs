use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of the extracted table
#[derive(Debug, Clone, PartialEq)]
pub struct BankRecord {
    pub name: String,
    pub market_cap_usd_billion: f64,
}

/// Bank row with the market cap expressed in every output currency, in millions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedBankRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "MC_USD_Billion")]
    pub market_cap_usd_billion: f64,
    #[serde(rename = "MC_USD_Million")]
    pub market_cap_usd_million: f64,
    #[serde(rename = "MC_GBP_Million")]
    pub market_cap_gbp_million: f64,
    #[serde(rename = "MC_EUR_Million")]
    pub market_cap_eur_million: f64,
    #[serde(rename = "MC_INR_Million")]
    pub market_cap_inr_million: f64,
}

impl EnrichedBankRecord {
    /// Numeric fields in output column order.
    pub fn amounts(&self) -> [f64; 5] {
        [
            self.market_cap_usd_billion,
            self.market_cap_usd_million,
            self.market_cap_gbp_million,
            self.market_cap_eur_million,
            self.market_cap_inr_million,
        ]
    }
}

/// Target currencies of the transformation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Gbp,
    Eur,
    Inr,
}

impl Currency {
    pub fn code(self) -> &'static str {
        match self {
            Currency::Gbp => "GBP",
            Currency::Eur => "EUR",
            Currency::Inr => "INR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
