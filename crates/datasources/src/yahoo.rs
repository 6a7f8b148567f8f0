use async_trait::async_trait;
use chrono::Utc;
use dexter_core::{Error, Result};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::symbol::{Market, StockSymbol};
use crate::{DataSource, FinancialReports, Period, Quote};

/// Yahoo Finance adapter (unofficial chart endpoint), used as the primary
/// source for Hong Kong quotes.
pub struct YahooSource {
    client: Client,
}

impl YahooSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSource for YahooSource {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    fn supports(&self, symbol: &StockSymbol) -> bool {
        symbol.market == Market::HongKong
    }

    async fn get_realtime(&self, symbol: &StockSymbol) -> Result<Quote> {
        let ticker = symbol.yahoo_ticker();
        let url = format!(
            "https://query1.finance.yahoo.com/v8/finance/chart/{}?interval=1d&range=1d",
            ticker
        );
        debug!(url = %url, "Yahoo Finance quote");
        let resp = self
            .client
            .get(&url)
            .header("User-Agent", "Mozilla/5.0")
            .send()
            .await
            .map_err(|e| Error::DataSource(format!("Yahoo Finance request failed: {}", e)))?;
        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .map_err(|e| Error::DataSource(format!("Failed to parse Yahoo response: {}", e)))?;
        if !status.is_success() {
            return Err(Error::DataSource(format!(
                "Yahoo Finance error ({}): {:?}",
                status,
                body.pointer("/chart/error")
            )));
        }
        let meta = body
            .pointer("/chart/result/0/meta")
            .ok_or_else(|| Error::DataSource(format!("Yahoo: no data for '{}'", ticker)))?;
        quote_from_meta(symbol, meta)
    }

    async fn get_financials(
        &self,
        symbol: &StockSymbol,
        _period: Period,
    ) -> Result<FinancialReports> {
        Err(Error::DataSource(format!(
            "Yahoo adapter has no financial statements for '{}'",
            symbol.canonical()
        )))
    }
}

fn quote_from_meta(symbol: &StockSymbol, meta: &Value) -> Result<Quote> {
    let num = |key: &str| -> f64 { meta.get(key).and_then(|v| v.as_f64()).unwrap_or(0.0) };

    let current_price = num("regularMarketPrice");
    let prev_close = num("chartPreviousClose").max(num("previousClose"));
    if current_price <= 0.0 && prev_close <= 0.0 {
        return Err(Error::DataSource(format!(
            "Yahoo: empty quote for '{}'",
            symbol.canonical()
        )));
    }

    let change = if prev_close > 0.0 {
        current_price - prev_close
    } else {
        0.0
    };
    Ok(Quote {
        symbol: symbol.canonical(),
        name: meta
            .get("shortName")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string(),
        current_price,
        prev_close,
        open: num("regularMarketOpen"),
        high: num("regularMarketDayHigh"),
        low: num("regularMarketDayLow"),
        change,
        change_percent: if prev_close > 0.0 {
            change / prev_close * 100.0
        } else {
            0.0
        },
        volume: num("regularMarketVolume"),
        amount: 0.0,
        market: symbol.market.label().to_string(),
        currency: meta
            .get("currency")
            .and_then(|v| v.as_str())
            .unwrap_or(symbol.market.currency())
            .to_string(),
        source: "yahoo".to_string(),
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quote_from_meta() {
        let symbol = StockSymbol::parse("00700.HK").unwrap();
        let meta = json!({
            "shortName": "TENCENT",
            "currency": "HKD",
            "regularMarketPrice": 385.0,
            "chartPreviousClose": 382.0,
            "regularMarketVolume": 1.2e7
        });
        let quote = quote_from_meta(&symbol, &meta).unwrap();
        assert_eq!(quote.name, "TENCENT");
        assert!((quote.current_price - 385.0).abs() < 1e-9);
        assert!((quote.change - 3.0).abs() < 1e-9);
        assert_eq!(quote.currency, "HKD");
    }

    #[test]
    fn test_quote_from_meta_empty_is_error() {
        let symbol = StockSymbol::parse("00700.HK").unwrap();
        assert!(quote_from_meta(&symbol, &json!({})).is_err());
    }

    #[test]
    fn test_supports_hk_only() {
        let source = YahooSource::new(Client::new());
        assert!(source.supports(&StockSymbol::parse("00700.HK").unwrap()));
        assert!(!source.supports(&StockSymbol::parse("600519.SH").unwrap()));
    }
}
