//! Valuation pipeline: latest annual statements plus a price with fallbacks,
//! combined into PE, PB, ROE, EPS, BVPS and dividend yield.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use dexter_core::{Error, Result};
use dexter_datasources::{Period, StockSymbol};

use crate::reports::{
    latest_annual, nonzero_field, report_date, DIVIDENDS_PAID_KEYS, NET_PROFIT_KEYS,
    TOTAL_EQUITY_KEYS, TOTAL_SHARES_KEYS,
};
use crate::{parse_ticker, Tool, ToolContext, ToolSchema};

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// Price used for the ratios: realtime price, then previous close, then the
/// configured typical price for offline runs.
async fn resolve_price(ctx: &ToolContext, symbol: &StockSymbol) -> (f64, &'static str) {
    match ctx.realtime(symbol).await {
        Ok(quote) if quote.current_price > 0.0 => (quote.current_price, "realtime"),
        Ok(quote) if quote.prev_close > 0.0 => (quote.prev_close, "prev_close"),
        Ok(_) => (ctx.config.data.typical_price(&symbol.canonical()), "typical"),
        Err(err) => {
            warn!(symbol = %symbol.canonical(), error = %err, "Quote unavailable, using typical price");
            (ctx.config.data.typical_price(&symbol.canonical()), "typical")
        }
    }
}

pub struct GetStockValuationTool;

#[async_trait]
impl Tool for GetStockValuationTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_stock_valuation",
            description: "Compute valuation metrics for a stock from its latest \
                          annual report: PE, PB, ROE, EPS, BVPS and dividend yield",
            parameters: json!({
                "type": "object",
                "properties": {
                    "ticker": {
                        "type": "string",
                        "description": "Stock ticker, e.g. 600519.SH, 000001.SZ or 00700.HK"
                    }
                },
                "required": ["ticker"]
            }),
        }
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let symbol = parse_ticker(&params)?;
        let reports = ctx.financials(&symbol, Period::Annual).await?;

        let income = latest_annual(&reports.income_statements).ok_or_else(|| {
            Error::Tool(format!("no income statement for {}", symbol.canonical()))
        })?;
        let balance = latest_annual(&reports.balance_sheets).ok_or_else(|| {
            Error::Tool(format!("no balance sheet for {}", symbol.canonical()))
        })?;

        let net_profit = nonzero_field(income, NET_PROFIT_KEYS)
            .filter(|v| *v > 0.0)
            .ok_or_else(|| {
                Error::Tool(format!(
                    "net profit missing or non-positive for {}",
                    symbol.canonical()
                ))
            })?;
        let equity = nonzero_field(balance, TOTAL_EQUITY_KEYS)
            .filter(|v| *v > 0.0)
            .ok_or_else(|| {
                Error::Tool(format!(
                    "shareholder equity missing or non-positive for {}",
                    symbol.canonical()
                ))
            })?;
        let shares = nonzero_field(balance, TOTAL_SHARES_KEYS)
            .filter(|v| *v > 0.0)
            .ok_or_else(|| {
                Error::Tool(format!(
                    "share count missing or non-positive for {}",
                    symbol.canonical()
                ))
            })?;

        let (price, price_source) = resolve_price(&ctx, &symbol).await;

        let eps = net_profit / shares;
        let bvps = equity / shares;
        let pe = price / eps;
        let pb = price / bvps;
        let roe = net_profit / equity * 100.0;
        if pe <= 0.0 || pb <= 0.0 {
            return Err(Error::Tool(format!(
                "invalid valuation ratios for {} (pe={pe:.2}, pb={pb:.2})",
                symbol.canonical()
            )));
        }

        // Dividend yield is best effort; anything missing degrades to 0.
        let dividend_yield = latest_annual(&reports.cash_flow_statements)
            .and_then(|row| nonzero_field(row, DIVIDENDS_PAID_KEYS))
            .map(|dividends| dividends / shares / price * 100.0)
            .filter(|v| v.is_finite() && *v >= 0.0)
            .unwrap_or(0.0);

        Ok(json!({
            "stock_valuation": {
                "ticker": symbol.canonical(),
                "market": symbol.market.label(),
                "report_date": report_date(income),
                "current_price": round2(price),
                "price_source": price_source,
                "eps": round4(eps),
                "bvps": round4(bvps),
                "pe_ratio": round2(pe),
                "pb_ratio": round2(pb),
                "roe": round2(roe),
                "dividend_yield": round2(dividend_yield),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{fixture_context, offline_context};
    use serde_json::json;

    #[tokio::test]
    async fn test_valuation_from_fixture_reports() {
        let ctx = fixture_context();
        let out = GetStockValuationTool
            .execute(ctx, json!({"ticker": "600519.SH"}))
            .await
            .unwrap();
        let v = &out["stock_valuation"];
        // 75e9 profit / 1.256e9 shares at price 1600.
        assert_eq!(v["eps"], 59.7134);
        assert_eq!(v["pe_ratio"], 26.79);
        assert_eq!(v["pb_ratio"], 8.93);
        assert_eq!(v["roe"], 33.33);
        assert_eq!(v["price_source"], "realtime");
        assert_eq!(v["market"], "A股");
    }

    #[tokio::test]
    async fn test_typical_price_fallback_when_quote_fails() {
        let ctx = offline_context();
        let out = GetStockValuationTool
            .execute(ctx, json!({"ticker": "600519.SH"}))
            .await
            .unwrap();
        let v = &out["stock_valuation"];
        assert_eq!(v["price_source"], "typical");
        assert_eq!(v["current_price"], 1600.0);
    }

    #[tokio::test]
    async fn test_dividend_yield_present() {
        let ctx = fixture_context();
        let out = GetStockValuationTool
            .execute(ctx, json!({"ticker": "600519.SH"}))
            .await
            .unwrap();
        // 30e9 dividends / 1.256e9 shares / 1600 price.
        assert_eq!(out["stock_valuation"]["dividend_yield"], 1.49);
    }
}
