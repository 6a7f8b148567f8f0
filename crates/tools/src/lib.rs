pub mod analysis;
pub mod financials;
pub mod quote;
pub mod registry;
pub mod reports;
pub mod valuation;

use async_trait::async_trait;
use dexter_cache::CacheManager;
use dexter_core::{Config, Result};
use dexter_datasources::{
    DataSourceManager, FinancialReports, Period, Quote, StockSymbol,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub use registry::ToolRegistry;

pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// Shared state handed to every tool execution: configuration, the two-tier
/// cache, and the data-source fallback chains.
#[derive(Clone)]
pub struct ToolContext {
    pub config: Arc<Config>,
    pub cache: Arc<CacheManager>,
    pub data: Arc<DataSourceManager>,
}

impl ToolContext {
    pub fn new(config: Arc<Config>, cache: Arc<CacheManager>, data: Arc<DataSourceManager>) -> Self {
        Self { config, cache, data }
    }

    /// Cache-aware statement fetch. A cached payload that no longer
    /// deserializes is treated as a miss.
    pub async fn financials(
        &self,
        symbol: &StockSymbol,
        period: Period,
    ) -> Result<FinancialReports> {
        let key = symbol.canonical();
        if let Some(cached) = self.cache.get("financial", &key, Some(period.as_str())) {
            if let Ok(reports) = serde_json::from_value::<FinancialReports>(cached) {
                debug!(symbol = %key, period = period.as_str(), "Financials served from cache");
                return Ok(reports);
            }
        }
        let reports = self.data.get_financials(symbol, period).await?;
        if let Ok(value) = serde_json::to_value(&reports) {
            self.cache.set("financial", &key, Some(period.as_str()), value);
        }
        Ok(reports)
    }

    /// Cache-aware realtime quote fetch.
    pub async fn realtime(&self, symbol: &StockSymbol) -> Result<Quote> {
        let key = symbol.canonical();
        if let Some(cached) = self.cache.get("realtime", &key, None) {
            if let Ok(quote) = serde_json::from_value::<Quote>(cached) {
                debug!(symbol = %key, "Quote served from cache");
                return Ok(quote);
            }
        }
        let quote = self.data.get_realtime(symbol).await?;
        if let Ok(value) = serde_json::to_value(&quote) {
            self.cache.set("realtime", &key, None, value);
        }
        Ok(quote)
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn schema(&self) -> ToolSchema;
    fn validate(&self, _params: &Value) -> Result<()> {
        Ok(())
    }
    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value>;
}

/// Pull the ticker argument out of a tool-call parameter object and parse it.
pub(crate) fn parse_ticker(params: &Value) -> Result<StockSymbol> {
    let ticker = params
        .get("ticker")
        .or_else(|| params.get("symbol"))
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if ticker.is_empty() {
        return Err(dexter_core::Error::Tool(
            "'ticker' is required".to_string(),
        ));
    }
    StockSymbol::parse(ticker)
}

pub(crate) fn parse_period(params: &Value) -> Period {
    Period::parse(
        params
            .get("period")
            .and_then(|v| v.as_str())
            .unwrap_or("annual"),
    )
}

pub(crate) fn parse_limit(params: &Value, default: usize) -> usize {
    params
        .get("limit")
        .and_then(|v| v.as_u64())
        .map(|n| n as usize)
        .unwrap_or(default)
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use async_trait::async_trait;
    use dexter_core::Error;
    use dexter_datasources::DataSource;
    use serde_json::json;

    /// Data source that serves canned 600519.SH-shaped data for every symbol.
    pub struct FixtureSource {
        pub fail_realtime: bool,
    }

    impl FixtureSource {
        pub fn income_row() -> Value {
            json!({
                "REPORT_DATE": "2024-12-31 00:00:00",
                "TOTAL_OPERATE_INCOME": 150_000_000_000.0,
                "OPERATE_COST": 12_000_000_000.0,
                "PARENT_NETPROFIT": 75_000_000_000.0
            })
        }

        pub fn balance_row() -> Value {
            json!({
                "REPORT_DATE": "2024-12-31 00:00:00",
                "TOTAL_ASSETS": 270_000_000_000.0,
                "TOTAL_LIABILITIES": 45_000_000_000.0,
                "TOTAL_EQUITY": 225_000_000_000.0,
                "SHARE_CAPITAL": 1_256_000_000.0
            })
        }

        pub fn cash_flow_row() -> Value {
            json!({
                "REPORT_DATE": "2024-12-31 00:00:00",
                "NETCASH_OPERATE": 80_000_000_000.0,
                "CONSTRUCT_LONG_ASSET": 5_000_000_000.0,
                "ASSIGN_DIVIDEND_PORFIT": 30_000_000_000.0
            })
        }
    }

    #[async_trait]
    impl DataSource for FixtureSource {
        fn name(&self) -> &'static str {
            "eastmoney"
        }

        fn supports(&self, _symbol: &StockSymbol) -> bool {
            true
        }

        async fn get_realtime(&self, symbol: &StockSymbol) -> Result<Quote> {
            if self.fail_realtime {
                return Err(Error::DataSource("offline".into()));
            }
            Ok(Quote {
                symbol: symbol.canonical(),
                name: "贵州茅台".into(),
                current_price: 1600.0,
                prev_close: 1598.0,
                open: 1599.0,
                high: 1620.0,
                low: 1590.0,
                change: 2.0,
                change_percent: 0.13,
                volume: 25_000.0,
                amount: 4.0e9,
                market: symbol.market.label().into(),
                currency: symbol.market.currency().into(),
                source: "eastmoney".into(),
                timestamp: chrono::Utc::now(),
            })
        }

        async fn get_financials(
            &self,
            _symbol: &StockSymbol,
            _period: Period,
        ) -> Result<FinancialReports> {
            Ok(FinancialReports {
                income_statements: vec![Self::income_row()],
                balance_sheets: vec![Self::balance_row()],
                cash_flow_statements: vec![Self::cash_flow_row()],
            })
        }
    }

    pub fn fixture_context() -> ToolContext {
        let config = Arc::new(Config::default());
        let cache = Arc::new(CacheManager::memory_only(&config.cache));
        let data = Arc::new(DataSourceManager::with_sources(
            vec![Arc::new(FixtureSource { fail_realtime: false })],
            "eastmoney",
        ));
        ToolContext::new(config, cache, data)
    }

    pub fn offline_context() -> ToolContext {
        let config = Arc::new(Config::default());
        let cache = Arc::new(CacheManager::memory_only(&config.cache));
        let data = Arc::new(DataSourceManager::with_sources(
            vec![Arc::new(FixtureSource { fail_realtime: true })],
            "eastmoney",
        ));
        ToolContext::new(config, cache, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_ticker_accepts_symbol_alias() {
        assert!(parse_ticker(&json!({"ticker": "600519.SH"})).is_ok());
        assert!(parse_ticker(&json!({"symbol": "00700.HK"})).is_ok());
        assert!(parse_ticker(&json!({})).is_err());
    }

    #[test]
    fn test_parse_period_and_limit_defaults() {
        assert_eq!(parse_period(&json!({})), Period::Annual);
        assert_eq!(parse_period(&json!({"period": "quarterly"})), Period::Quarterly);
        assert_eq!(parse_limit(&json!({}), 10), 10);
        assert_eq!(parse_limit(&json!({"limit": 3}), 10), 3);
    }
}
