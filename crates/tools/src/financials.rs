//! The three financial statement tools. Each fetches the full report set
//! (cache-aware) and returns the requested statement type, newest first,
//! truncated to `limit` rows.

use async_trait::async_trait;
use serde_json::{json, Value};

use dexter_core::{Error, Result};

use crate::{parse_limit, parse_period, parse_ticker, Tool, ToolContext, ToolSchema};

const DEFAULT_LIMIT: usize = 10;

fn statement_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {
            "ticker": {
                "type": "string",
                "description": "Stock ticker, e.g. 600519.SH, 000001.SZ or 00700.HK"
            },
            "period": {
                "type": "string",
                "enum": ["annual", "quarterly"],
                "description": "Reporting period, defaults to annual"
            },
            "limit": {
                "type": "integer",
                "description": "Maximum number of statements to return, defaults to 10"
            }
        },
        "required": ["ticker"]
    })
}

fn truncated(rows: &[Value], limit: usize) -> Vec<Value> {
    rows.iter().take(limit).cloned().collect()
}

pub struct GetIncomeStatementsTool;

#[async_trait]
impl Tool for GetIncomeStatementsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_income_statements",
            description: "Get income statements for a stock, including revenue, \
                          operating cost and net profit per reporting period",
            parameters: statement_parameters(),
        }
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let symbol = parse_ticker(&params)?;
        let period = parse_period(&params);
        let limit = parse_limit(&params, DEFAULT_LIMIT);
        let reports = ctx.financials(&symbol, period).await?;
        if reports.income_statements.is_empty() {
            return Err(Error::Tool(format!(
                "no income statements available for {}",
                symbol.canonical()
            )));
        }
        Ok(json!({
            "income_statements": truncated(&reports.income_statements, limit)
        }))
    }
}

pub struct GetBalanceSheetsTool;

#[async_trait]
impl Tool for GetBalanceSheetsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_balance_sheets",
            description: "Get balance sheets for a stock, including total assets, \
                          liabilities and shareholder equity per reporting period",
            parameters: statement_parameters(),
        }
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let symbol = parse_ticker(&params)?;
        let period = parse_period(&params);
        let limit = parse_limit(&params, DEFAULT_LIMIT);
        let reports = ctx.financials(&symbol, period).await?;
        if reports.balance_sheets.is_empty() {
            return Err(Error::Tool(format!(
                "no balance sheets available for {}",
                symbol.canonical()
            )));
        }
        Ok(json!({
            "balance_sheets": truncated(&reports.balance_sheets, limit)
        }))
    }
}

pub struct GetCashFlowStatementsTool;

#[async_trait]
impl Tool for GetCashFlowStatementsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_cash_flow_statements",
            description: "Get cash flow statements for a stock, including operating \
                          cash flow, capital expenditure and dividends paid",
            parameters: statement_parameters(),
        }
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let symbol = parse_ticker(&params)?;
        let period = parse_period(&params);
        let limit = parse_limit(&params, DEFAULT_LIMIT);
        let reports = ctx.financials(&symbol, period).await?;
        if reports.cash_flow_statements.is_empty() {
            return Err(Error::Tool(format!(
                "no cash flow statements available for {}",
                symbol.canonical()
            )));
        }
        Ok(json!({
            "cash_flow_statements": truncated(&reports.cash_flow_statements, limit)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::fixture_context;
    use serde_json::json;

    #[tokio::test]
    async fn test_income_statements_shape() {
        let ctx = fixture_context();
        let out = GetIncomeStatementsTool
            .execute(ctx, json!({"ticker": "600519.SH"}))
            .await
            .unwrap();
        let rows = out["income_statements"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["PARENT_NETPROFIT"], 75_000_000_000.0);
    }

    #[tokio::test]
    async fn test_limit_caps_rows() {
        let ctx = fixture_context();
        let out = GetBalanceSheetsTool
            .execute(ctx, json!({"ticker": "600519.SH", "limit": 0}))
            .await
            .unwrap();
        assert!(out["balance_sheets"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_ticker_is_an_error() {
        let ctx = fixture_context();
        let err = GetCashFlowStatementsTool
            .execute(ctx, json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ticker"));
    }
}
