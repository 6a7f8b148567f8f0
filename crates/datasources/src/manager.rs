use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dexter_core::config::DataConfig;
use dexter_core::{Error, Result};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::eastmoney::EastmoneySource;
use crate::symbol::StockSymbol;
use crate::tencent::TencentSource;
use crate::yahoo::YahooSource;
use crate::{DataSource, FinancialReports, Period, Quote};

/// Statements always come from 东方财富; the other adapters only carry quotes.
const STATEMENTS_SOURCE: &str = "eastmoney";

/// Routes data requests across adapters with per-market fallback chains.
///
/// Hong Kong quotes try yahoo then eastmoney. A-share quotes try tencent,
/// then the configured preferred source, then eastmoney. A source failure
/// moves on to the next adapter; exhausting the chain is a `DataSource` error.
pub struct DataSourceManager {
    sources: HashMap<&'static str, Arc<dyn DataSource>>,
    preferred_source: String,
}

impl DataSourceManager {
    pub fn new(config: &DataConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_default();

        let adapters: Vec<Arc<dyn DataSource>> = vec![
            Arc::new(EastmoneySource::new(client.clone())),
            Arc::new(TencentSource::new(client.clone())),
            Arc::new(YahooSource::new(client)),
        ];
        Self::with_sources(adapters, &config.preferred_source)
    }

    /// Build from an explicit adapter list. Used by tests with scripted
    /// sources.
    pub fn with_sources(adapters: Vec<Arc<dyn DataSource>>, preferred: &str) -> Self {
        let mut sources: HashMap<&'static str, Arc<dyn DataSource>> = HashMap::new();
        for adapter in adapters {
            debug!(source = adapter.name(), "Registering data source");
            sources.insert(adapter.name(), adapter);
        }
        Self {
            sources,
            preferred_source: preferred.to_string(),
        }
    }

    fn quote_chain(&self, symbol: &StockSymbol) -> Vec<&str> {
        let mut chain: Vec<&str> = if symbol.market.is_a_share() {
            vec!["tencent", self.preferred_source.as_str(), "eastmoney"]
        } else {
            vec!["yahoo", "eastmoney"]
        };
        chain.dedup();
        chain
    }

    pub async fn get_realtime(&self, symbol: &StockSymbol) -> Result<Quote> {
        let mut last_error: Option<Error> = None;
        for name in self.quote_chain(symbol) {
            let Some(source) = self.sources.get(name) else {
                continue;
            };
            if !source.supports(symbol) {
                continue;
            }
            match source.get_realtime(symbol).await {
                Ok(quote) => {
                    info!(source = name, symbol = %symbol.canonical(), "Quote fetched");
                    return Ok(quote);
                }
                Err(e) => {
                    warn!(source = name, symbol = %symbol.canonical(), error = %e, "Data source failed");
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) => Err(Error::DataSource(format!(
                "All data sources failed for '{}', last error: {}",
                symbol.canonical(),
                e
            ))),
            None => Err(Error::DataSource(format!(
                "No data source available for '{}'",
                symbol.canonical()
            ))),
        }
    }

    pub async fn get_financials(
        &self,
        symbol: &StockSymbol,
        period: Period,
    ) -> Result<FinancialReports> {
        let source = self.sources.get(STATEMENTS_SOURCE).ok_or_else(|| {
            Error::DataSource("Statements source is not registered".to_string())
        })?;
        let reports = source.get_financials(symbol, period).await?;
        if reports.is_empty() {
            return Err(Error::DataSource(format!(
                "No financial statements for '{}'",
                symbol.canonical()
            )));
        }
        Ok(reports)
    }

    pub fn available_sources(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.sources.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
