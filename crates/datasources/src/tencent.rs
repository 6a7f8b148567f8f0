use async_trait::async_trait;
use chrono::Utc;
use dexter_core::{Error, Result};
use reqwest::Client;
use tracing::debug;

use crate::symbol::StockSymbol;
use crate::{DataSource, FinancialReports, Period, Quote};

/// 腾讯行情 adapter, realtime quotes only. Fast and keyless, so it sits
/// first in the A-share fallback chain.
pub struct TencentSource {
    client: Client,
}

impl TencentSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSource for TencentSource {
    fn name(&self) -> &'static str {
        "tencent"
    }

    fn supports(&self, symbol: &StockSymbol) -> bool {
        symbol.market.is_a_share()
    }

    async fn get_realtime(&self, symbol: &StockSymbol) -> Result<Quote> {
        let code = symbol.tencent_code();
        let url = format!("https://qt.gtimg.cn/q={}", code);
        debug!(url = %url, "腾讯行情 quote");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::DataSource(format!("腾讯行情 request failed: {}", e)))?;
        // The payload is GBK-encoded; only the name field is non-ASCII, so a
        // lossy decode keeps every numeric field intact.
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::DataSource(format!("腾讯行情 read failed: {}", e)))?;
        let body = String::from_utf8_lossy(&bytes);
        parse_quote_line(symbol, &body)
    }

    async fn get_financials(
        &self,
        symbol: &StockSymbol,
        _period: Period,
    ) -> Result<FinancialReports> {
        Err(Error::DataSource(format!(
            "腾讯行情 has no financial statements for '{}'",
            symbol.canonical()
        )))
    }
}

/// Parse a `v_sh600519="1~贵州茅台~600519~..."` line. Fields are
/// tilde-separated; the positions used here are stable across markets.
fn parse_quote_line(symbol: &StockSymbol, body: &str) -> Result<Quote> {
    let start = body
        .find('"')
        .ok_or_else(|| Error::DataSource("腾讯行情: malformed response".into()))?;
    let end = body[start + 1..]
        .find('"')
        .map(|i| start + 1 + i)
        .ok_or_else(|| Error::DataSource("腾讯行情: malformed response".into()))?;
    let fields: Vec<&str> = body[start + 1..end].split('~').collect();
    if fields.len() < 38 {
        return Err(Error::DataSource(format!(
            "腾讯行情: no data for '{}'",
            symbol.canonical()
        )));
    }

    let num = |idx: usize| -> f64 { fields.get(idx).and_then(|s| s.parse().ok()).unwrap_or(0.0) };

    let current_price = num(3);
    if current_price <= 0.0 {
        return Err(Error::DataSource(format!(
            "腾讯行情: empty quote for '{}'",
            symbol.canonical()
        )));
    }

    Ok(Quote {
        symbol: symbol.canonical(),
        name: fields[1].to_string(),
        current_price,
        prev_close: num(4),
        open: num(5),
        high: num(33),
        low: num(34),
        change: num(31),
        change_percent: num(32),
        volume: num(36),
        amount: num(37) * 10_000.0,
        market: symbol.market.label().to_string(),
        currency: symbol.market.currency().to_string(),
        source: "tencent".to_string(),
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_line() -> String {
        let mut fields: Vec<String> = vec!["0".into(); 50];
        fields[1] = "贵州茅台".into();
        fields[2] = "600519".into();
        fields[3] = "1600.00".into();
        fields[4] = "1598.00".into();
        fields[5] = "1599.50".into();
        fields[31] = "2.00".into();
        fields[32] = "0.13".into();
        fields[33] = "1620.00".into();
        fields[34] = "1590.00".into();
        fields[36] = "25000".into();
        fields[37] = "400000".into();
        format!("v_sh600519=\"{}\";", fields.join("~"))
    }

    #[test]
    fn test_parse_quote_line() {
        let symbol = StockSymbol::parse("600519.SH").unwrap();
        let quote = parse_quote_line(&symbol, &sample_line()).unwrap();
        assert_eq!(quote.name, "贵州茅台");
        assert!((quote.current_price - 1600.0).abs() < 1e-9);
        assert!((quote.prev_close - 1598.0).abs() < 1e-9);
        assert!((quote.high - 1620.0).abs() < 1e-9);
        assert!((quote.amount - 4.0e9).abs() < 1e-3);
        assert_eq!(quote.source, "tencent");
    }

    #[test]
    fn test_parse_quote_line_rejects_short_payload() {
        let symbol = StockSymbol::parse("600519.SH").unwrap();
        assert!(parse_quote_line(&symbol, "v_sh600519=\"1~x~y\";").is_err());
        assert!(parse_quote_line(&symbol, "garbage").is_err());
    }

    #[test]
    fn test_supports_a_shares_only() {
        let client = Client::new();
        let source = TencentSource::new(client);
        assert!(source.supports(&StockSymbol::parse("600519.SH").unwrap()));
        assert!(!source.supports(&StockSymbol::parse("00700.HK").unwrap()));
    }
}
