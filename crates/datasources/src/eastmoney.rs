use async_trait::async_trait;
use chrono::Utc;
use dexter_core::{Error, Result};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::symbol::{Market, StockSymbol};
use crate::{DataSource, FinancialReports, Period, Quote};

const REFERER: &str = "https://quote.eastmoney.com";
const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

const QUOTE_FIELDS: &str =
    "f43,f44,f45,f46,f47,f48,f57,f58,f60,f169,f170";

/// 东方财富 adapter. Quotes come from the push2 API, financial statements
/// from the datacenter API. Serves both A-shares and Hong Kong stocks and is
/// the only source for statements.
pub struct EastmoneySource {
    client: Client,
}

impl EastmoneySource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn fetch_report(
        &self,
        secucode: &str,
        report_name: &str,
        page_size: usize,
    ) -> Result<Vec<Value>> {
        let url = format!(
            "https://datacenter-web.eastmoney.com/api/data/v1/get?reportName={}&columns=ALL&filter=(SECUCODE=\"{}\")&pageSize={}&sortColumns=REPORT_DATE&sortTypes=-1&source=WEB&client=DATACENTER",
            report_name, secucode, page_size
        );
        debug!(url = %url, "东方财富 financial report");
        let resp = self
            .client
            .get(&url)
            .header("Referer", "https://data.eastmoney.com")
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| Error::DataSource(format!("东方财富 financial request failed: {}", e)))?;
        let body: Value = resp
            .json()
            .await
            .map_err(|e| Error::DataSource(format!("Failed to parse 东方财富 financial response: {}", e)))?;

        let success = body.get("success").and_then(|v| v.as_bool()).unwrap_or(false);
        if !success {
            return Err(Error::DataSource(format!(
                "东方财富 financial API error: {:?}",
                body.get("message")
            )));
        }
        Ok(body
            .pointer("/result/data")
            .and_then(|d| d.as_array())
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl DataSource for EastmoneySource {
    fn name(&self) -> &'static str {
        "eastmoney"
    }

    fn supports(&self, _symbol: &StockSymbol) -> bool {
        true
    }

    async fn get_realtime(&self, symbol: &StockSymbol) -> Result<Quote> {
        let secid = symbol.eastmoney_secid();
        let url = format!(
            "https://push2.eastmoney.com/api/qt/stock/get?secid={}&fields={}",
            secid, QUOTE_FIELDS
        );
        debug!(url = %url, secid = %secid, "东方财富 quote");
        let resp = self
            .client
            .get(&url)
            .header("Referer", REFERER)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| Error::DataSource(format!("东方财富 request failed: {}", e)))?;
        let body: Value = resp
            .json()
            .await
            .map_err(|e| Error::DataSource(format!("Failed to parse 东方财富 response: {}", e)))?;

        let data = body
            .get("data")
            .filter(|d| !d.is_null())
            .ok_or_else(|| {
                Error::DataSource(format!("东方财富: no data for '{}'", symbol.canonical()))
            })?;
        quote_from_payload(symbol, data)
    }

    async fn get_financials(
        &self,
        symbol: &StockSymbol,
        period: Period,
    ) -> Result<FinancialReports> {
        let secucode = symbol.canonical();
        // Quarterly rows come back four per year; over-fetch and filter
        // down to annual reports locally.
        let page_size = 40;

        let income = self
            .fetch_report(&secucode, "RPT_DMSK_FN_INCOME", page_size)
            .await?;
        let balance = self
            .fetch_report(&secucode, "RPT_DMSK_FN_BALANCE", page_size)
            .await?;
        let cash_flow = self
            .fetch_report(&secucode, "RPT_DMSK_FN_CASHFLOW", page_size)
            .await?;

        Ok(FinancialReports {
            income_statements: filter_period(income, period),
            balance_sheets: filter_period(balance, period),
            cash_flow_statements: filter_period(cash_flow, period),
        })
    }
}

/// Keep only annual reports (report date ending 12-31) when asked for
/// annual data. Report dates arrive as `2024-12-31 00:00:00` (HK) or
/// `20241231` (A-share).
fn filter_period(rows: Vec<Value>, period: Period) -> Vec<Value> {
    match period {
        Period::Quarterly => rows,
        Period::Annual => rows
            .into_iter()
            .filter(|row| {
                let date = row
                    .get("REPORT_DATE")
                    .or_else(|| row.get("报告日"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                date.contains("12-31") || date.ends_with("1231")
            })
            .collect(),
    }
}

/// Build a `Quote` from a push2 payload. Prices arrive scaled: 分 for
/// A-shares (divide by 100), thousandths for HK (divide by 1000).
fn quote_from_payload(symbol: &StockSymbol, data: &Value) -> Result<Quote> {
    let divisor = if symbol.market == Market::HongKong {
        1000.0
    } else {
        100.0
    };
    let price = |field: &str| -> f64 {
        data.get(field)
            .and_then(|v| v.as_f64())
            .map(|v| v / divisor)
            .unwrap_or(0.0)
    };
    let raw = |field: &str| -> f64 { data.get(field).and_then(|v| v.as_f64()).unwrap_or(0.0) };

    let current_price = price("f43");
    if current_price <= 0.0 && price("f60") <= 0.0 {
        return Err(Error::DataSource(format!(
            "东方财富: empty quote for '{}'",
            symbol.canonical()
        )));
    }

    Ok(Quote {
        symbol: symbol.canonical(),
        name: data
            .get("f58")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string(),
        current_price,
        prev_close: price("f60"),
        open: price("f46"),
        high: price("f44"),
        low: price("f45"),
        change: raw("f169") / divisor,
        change_percent: raw("f170") / 100.0,
        volume: raw("f47"),
        amount: raw("f48"),
        market: symbol.market.label().to_string(),
        currency: symbol.market.currency().to_string(),
        source: "eastmoney".to_string(),
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quote_from_payload_a_share() {
        let symbol = StockSymbol::parse("600519.SH").unwrap();
        let data = json!({
            "f43": 160000, "f44": 162000, "f45": 159000, "f46": 159500,
            "f47": 25000.0, "f48": 4.0e9, "f58": "贵州茅台",
            "f60": 159800, "f169": 200, "f170": 125
        });
        let quote = quote_from_payload(&symbol, &data).unwrap();
        assert_eq!(quote.name, "贵州茅台");
        assert!((quote.current_price - 1600.0).abs() < 1e-9);
        assert!((quote.prev_close - 1598.0).abs() < 1e-9);
        assert!((quote.change_percent - 1.25).abs() < 1e-9);
        assert_eq!(quote.currency, "CNY");
    }

    #[test]
    fn test_quote_from_payload_hk_divisor() {
        let symbol = StockSymbol::parse("00700.HK").unwrap();
        let data = json!({
            "f43": 385000, "f58": "腾讯控股", "f60": 382000, "f169": 3000, "f170": 79
        });
        let quote = quote_from_payload(&symbol, &data).unwrap();
        assert!((quote.current_price - 385.0).abs() < 1e-9);
        assert_eq!(quote.currency, "HKD");
        assert_eq!(quote.market, "港股");
    }

    #[test]
    fn test_quote_from_payload_empty_is_error() {
        let symbol = StockSymbol::parse("600519.SH").unwrap();
        assert!(quote_from_payload(&symbol, &json!({})).is_err());
    }

    #[test]
    fn test_filter_period_annual() {
        let rows = vec![
            json!({"REPORT_DATE": "2024-12-31 00:00:00"}),
            json!({"REPORT_DATE": "2024-09-30 00:00:00"}),
            json!({"报告日": "20231231"}),
            json!({"报告日": "20240331"}),
        ];
        let annual = filter_period(rows.clone(), Period::Annual);
        assert_eq!(annual.len(), 2);
        let quarterly = filter_period(rows, Period::Quarterly);
        assert_eq!(quarterly.len(), 4);
    }
}
