pub mod eastmoney;
pub mod manager;
pub mod symbol;
pub mod tencent;
pub mod yahoo;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dexter_core::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use manager::DataSourceManager;
pub use symbol::{Market, StockSymbol};

/// A real-time (or last-session) quote for a single stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    pub prev_close: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: f64,
    pub amount: f64,
    pub market: String,
    pub currency: String,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

/// The three statements for one company, newest report first.
/// Rows are kept as raw JSON objects since field names differ between
/// A-share and Hong Kong reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialReports {
    pub income_statements: Vec<Value>,
    pub balance_sheets: Vec<Value>,
    pub cash_flow_statements: Vec<Value>,
}

impl FinancialReports {
    pub fn is_empty(&self) -> bool {
        self.income_statements.is_empty() && self.balance_sheets.is_empty()
    }
}

/// Reporting period for financial statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Annual,
    Quarterly,
}

impl Period {
    pub fn parse(s: &str) -> Period {
        match s {
            "quarterly" | "quarter" => Period::Quarterly,
            _ => Period::Annual,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Period::Annual => "annual",
            Period::Quarterly => "quarterly",
        }
    }
}

/// One upstream market-data adapter.
#[async_trait]
pub trait DataSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this adapter can serve the given symbol at all. Checked
    /// before issuing requests, so unsupported markets are skipped cheaply.
    fn supports(&self, symbol: &StockSymbol) -> bool;

    async fn get_realtime(&self, symbol: &StockSymbol) -> Result<Quote>;

    async fn get_financials(&self, symbol: &StockSymbol, period: Period)
        -> Result<FinancialReports>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_parse() {
        assert_eq!(Period::parse("annual"), Period::Annual);
        assert_eq!(Period::parse("quarterly"), Period::Quarterly);
        assert_eq!(Period::parse("quarter"), Period::Quarterly);
        // Anything unrecognized falls back to annual.
        assert_eq!(Period::parse("ttm"), Period::Annual);
    }

    #[test]
    fn test_reports_is_empty() {
        let mut reports = FinancialReports::default();
        assert!(reports.is_empty());
        reports.income_statements.push(serde_json::json!({}));
        assert!(!reports.is_empty());
    }
}
