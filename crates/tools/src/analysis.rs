//! Value-investing analysis tools: moat, management quality, free cash flow,
//! valuation ratios and business simplicity. Each computes its metrics from
//! fetched statements and returns scores plus the per-year series behind them.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use dexter_core::{Error, Result};
use dexter_datasources::Period;

use crate::reports::{
    field, latest_annual, nonzero_field, report_date, CAPEX_KEYS, DIVIDENDS_PAID_KEYS,
    NET_PROFIT_KEYS, OPERATING_CASH_FLOW_KEYS, OPERATING_COST_KEYS, REVENUE_KEYS,
    TOTAL_EQUITY_KEYS,
};
use crate::{parse_period, parse_ticker, Tool, ToolContext, ToolSchema};

const DEFAULT_YEARS: usize = 5;

fn analysis_parameters() -> Value {
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
            }
        },
        "required": ["ticker"]
    })
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Series values arrive newest first. Classifies newest against oldest with a
/// dead band so single-point noise does not flip the label.
fn trend(values: &[f64], band: f64) -> &'static str {
    match (values.first(), values.last()) {
        (Some(newest), Some(oldest)) if values.len() >= 2 => {
            if newest - oldest > band {
                "improving"
            } else if oldest - newest > band {
                "declining"
            } else {
                "stable"
            }
        }
        _ => "insufficient_data",
    }
}

/// Row with a matching report date, used to join income, balance and cash
/// flow statements for the same year.
fn row_for_date<'a>(rows: &'a [Value], date: &str) -> Option<&'a Value> {
    rows.iter().find(|row| report_date(row) == date)
}

pub struct AnalyzeMoatTool;

#[async_trait]
impl Tool for AnalyzeMoatTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "analyze_moat",
            description: "Analyze a company's economic moat from gross margin \
                          level, trend and stability across reporting periods",
            parameters: analysis_parameters(),
        }
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let symbol = parse_ticker(&params)?;
        let period = parse_period(&params);
        let reports = ctx.financials(&symbol, period).await?;

        let mut series = Vec::new();
        let mut margins = Vec::new();
        for row in reports.income_statements.iter().take(DEFAULT_YEARS) {
            let revenue = nonzero_field(row, REVENUE_KEYS);
            let cost = field(row, OPERATING_COST_KEYS);
            if let (Some(revenue), Some(cost)) = (revenue, cost) {
                let margin = (revenue - cost) / revenue * 100.0;
                series.push(json!({
                    "report_date": report_date(row),
                    "gross_margin": round2(margin),
                }));
                margins.push(margin);
            }
        }
        if margins.is_empty() {
            return Err(Error::Tool(format!(
                "no usable income statements for {}",
                symbol.canonical()
            )));
        }

        let avg = mean(&margins);
        let stability = std_dev(&margins);
        let assessment = if avg >= 40.0 && stability < 5.0 {
            "strong"
        } else if avg >= 20.0 {
            "moderate"
        } else {
            "weak"
        };

        Ok(json!({
            "moat_analysis": {
                "ticker": symbol.canonical(),
                "period": period.as_str(),
                "gross_margins": series,
                "average_gross_margin": round2(avg),
                "margin_volatility": round2(stability),
                "margin_trend": trend(&margins, 2.0),
                "assessment": assessment,
            }
        }))
    }
}

pub struct EvaluateManagementTool;

#[async_trait]
impl Tool for EvaluateManagementTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "evaluate_management",
            description: "Evaluate management quality from the return-on-equity \
                          trend and the dividend payout ratio",
            parameters: analysis_parameters(),
        }
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let symbol = parse_ticker(&params)?;
        let period = parse_period(&params);
        let reports = ctx.financials(&symbol, period).await?;

        let mut series = Vec::new();
        let mut roes = Vec::new();
        for income in reports.income_statements.iter().take(DEFAULT_YEARS) {
            let date = report_date(income);
            let profit = nonzero_field(income, NET_PROFIT_KEYS);
            let equity = row_for_date(&reports.balance_sheets, date)
                .and_then(|row| nonzero_field(row, TOTAL_EQUITY_KEYS));
            if let (Some(profit), Some(equity)) = (profit, equity) {
                let roe = profit / equity * 100.0;
                series.push(json!({"report_date": date, "roe": round2(roe)}));
                roes.push(roe);
            }
        }
        if roes.is_empty() {
            return Err(Error::Tool(format!(
                "cannot derive return on equity for {}",
                symbol.canonical()
            )));
        }

        // Payout ratio from the latest year where both figures are present.
        let payout_ratio = latest_annual(&reports.income_statements)
            .and_then(|income| {
                let profit = nonzero_field(income, NET_PROFIT_KEYS)?;
                let dividends = row_for_date(&reports.cash_flow_statements, report_date(income))
                    .or_else(|| latest_annual(&reports.cash_flow_statements))
                    .and_then(|row| nonzero_field(row, DIVIDENDS_PAID_KEYS))?;
                Some(dividends / profit * 100.0)
            })
            .unwrap_or(0.0);

        let avg_roe = mean(&roes);
        let assessment = if avg_roe >= 15.0 && payout_ratio > 0.0 {
            "shareholder_friendly"
        } else if avg_roe >= 10.0 {
            "adequate"
        } else {
            "questionable"
        };

        Ok(json!({
            "management_quality": {
                "ticker": symbol.canonical(),
                "roe_series": series,
                "average_roe": round2(avg_roe),
                "roe_trend": trend(&roes, 2.0),
                "dividend_payout_ratio": round2(payout_ratio),
                "assessment": assessment,
            }
        }))
    }
}

pub struct CalculateFreeCashFlowTool;

#[async_trait]
impl Tool for CalculateFreeCashFlowTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "calculate_free_cash_flow",
            description: "Calculate free cash flow (operating cash flow minus \
                          capital expenditure) per period, with growth and \
                          stability metrics",
            parameters: analysis_parameters(),
        }
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let symbol = parse_ticker(&params)?;
        let period = parse_period(&params);
        let reports = ctx.financials(&symbol, period).await?;

        let mut series = Vec::new();
        let mut fcfs = Vec::new();
        for row in reports.cash_flow_statements.iter().take(DEFAULT_YEARS) {
            let date = report_date(row);
            if let Some(ocf) = nonzero_field(row, OPERATING_CASH_FLOW_KEYS) {
                let capex = field(row, CAPEX_KEYS).unwrap_or(0.0);
                let fcf = ocf - capex;
                let fcf_margin = row_for_date(&reports.income_statements, date)
                    .and_then(|income| nonzero_field(income, REVENUE_KEYS))
                    .map(|revenue| round2(fcf / revenue * 100.0));
                series.push(json!({
                    "report_date": date,
                    "operating_cash_flow": ocf,
                    "capital_expenditure": capex,
                    "free_cash_flow": fcf,
                    "fcf_margin": fcf_margin,
                }));
                fcfs.push(fcf);
            }
        }
        if fcfs.is_empty() {
            return Err(Error::Tool(format!(
                "no usable cash flow statements for {}",
                symbol.canonical()
            )));
        }

        // Newest-over-oldest growth across the window, annualized.
        let growth_rate = match (fcfs.first(), fcfs.last()) {
            (Some(newest), Some(oldest)) if fcfs.len() >= 2 && *oldest > 0.0 && *newest > 0.0 => {
                let years = (fcfs.len() - 1) as f64;
                Some(round2(((newest / oldest).powf(1.0 / years) - 1.0) * 100.0))
            }
            _ => None,
        };
        let volatility = if mean(&fcfs).abs() > f64::EPSILON {
            round2(std_dev(&fcfs) / mean(&fcfs).abs() * 100.0)
        } else {
            0.0
        };

        Ok(json!({
            "free_cash_flow_analysis": {
                "ticker": symbol.canonical(),
                "period": period.as_str(),
                "series": series,
                "latest_free_cash_flow": fcfs.first(),
                "annualized_growth_percent": growth_rate,
                "volatility_percent": volatility,
                "all_years_positive": fcfs.iter().all(|v| *v > 0.0),
            }
        }))
    }
}

pub struct ComputeValuationRatiosTool;

#[async_trait]
impl Tool for ComputeValuationRatiosTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "compute_valuation_ratios",
            description: "Compute price-based valuation ratios (PE, PB, earnings \
                          yield, return on capital) and a margin-of-safety view",
            parameters: analysis_parameters(),
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
        let profit = nonzero_field(income, NET_PROFIT_KEYS).ok_or_else(|| {
            Error::Tool(format!("net profit unavailable for {}", symbol.canonical()))
        })?;
        let equity = nonzero_field(balance, TOTAL_EQUITY_KEYS).ok_or_else(|| {
            Error::Tool(format!("equity unavailable for {}", symbol.canonical()))
        })?;
        let shares = nonzero_field(balance, crate::reports::TOTAL_SHARES_KEYS).ok_or_else(|| {
            Error::Tool(format!("share count unavailable for {}", symbol.canonical()))
        })?;

        let price = match ctx.realtime(&symbol).await {
            Ok(quote) if quote.current_price > 0.0 => quote.current_price,
            Ok(quote) if quote.prev_close > 0.0 => quote.prev_close,
            Ok(_) => ctx.config.data.typical_price(&symbol.canonical()),
            Err(err) => {
                warn!(symbol = %symbol.canonical(), error = %err, "Quote unavailable, using typical price");
                ctx.config.data.typical_price(&symbol.canonical())
            }
        };

        let eps = profit / shares;
        let bvps = equity / shares;
        let pe = price / eps;
        let pb = price / bvps;
        let roe = profit / equity * 100.0;
        let earnings_yield = if pe > 0.0 { 100.0 / pe } else { 0.0 };

        // Graham-style screen: cheap below PE 15 and PB 1.5, expensive above
        // PE 30 or PB 5.
        let margin_of_safety = if pe <= 0.0 {
            "not_meaningful"
        } else if pe < 15.0 && pb < 1.5 {
            "wide"
        } else if pe > 30.0 || pb > 5.0 {
            "none"
        } else {
            "narrow"
        };

        Ok(json!({
            "valuation_analysis": {
                "ticker": symbol.canonical(),
                "current_price": round2(price),
                "pe_ratio": round2(pe),
                "pb_ratio": round2(pb),
                "return_on_equity": round2(roe),
                "earnings_yield_percent": round2(earnings_yield),
                "margin_of_safety": margin_of_safety,
            }
        }))
    }
}

pub struct AssessBusinessSimplicityTool;

#[async_trait]
impl Tool for AssessBusinessSimplicityTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "assess_business_simplicity",
            description: "Assess how simple and predictable a business is from \
                          revenue stability and margin consistency",
            parameters: analysis_parameters(),
        }
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let symbol = parse_ticker(&params)?;
        let period = parse_period(&params);
        let reports = ctx.financials(&symbol, period).await?;

        let mut revenues = Vec::new();
        let mut margins = Vec::new();
        for row in reports.income_statements.iter().take(DEFAULT_YEARS) {
            if let Some(revenue) = nonzero_field(row, REVENUE_KEYS) {
                revenues.push(revenue);
                if let Some(cost) = field(row, OPERATING_COST_KEYS) {
                    margins.push((revenue - cost) / revenue * 100.0);
                }
            }
        }
        if revenues.is_empty() {
            return Err(Error::Tool(format!(
                "no usable income statements for {}",
                symbol.canonical()
            )));
        }

        let revenue_cv = if mean(&revenues) > 0.0 {
            std_dev(&revenues) / mean(&revenues) * 100.0
        } else {
            0.0
        };
        let margin_volatility = std_dev(&margins);
        let predictable = revenue_cv < 25.0 && margin_volatility < 5.0;

        Ok(json!({
            "business_simplicity": {
                "ticker": symbol.canonical(),
                "years_observed": revenues.len(),
                "revenue_variability_percent": round2(revenue_cv),
                "margin_volatility": round2(margin_volatility),
                "revenue_trend": trend(&revenues, mean(&revenues) * 0.05),
                "assessment": if predictable { "simple_and_predictable" } else { "complex_or_volatile" },
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::fixture_context;
    use serde_json::json;

    #[test]
    fn test_trend_classification() {
        assert_eq!(trend(&[50.0, 45.0], 2.0), "improving");
        assert_eq!(trend(&[40.0, 45.0], 2.0), "declining");
        assert_eq!(trend(&[45.5, 45.0], 2.0), "stable");
        assert_eq!(trend(&[45.0], 2.0), "insufficient_data");
    }

    #[tokio::test]
    async fn test_moat_from_fixture() {
        let ctx = fixture_context();
        let out = AnalyzeMoatTool
            .execute(ctx, json!({"ticker": "600519.SH"}))
            .await
            .unwrap();
        let moat = &out["moat_analysis"];
        // (150e9 - 12e9) / 150e9 = 92% gross margin.
        assert_eq!(moat["average_gross_margin"], 92.0);
        assert_eq!(moat["assessment"], "strong");
    }

    #[tokio::test]
    async fn test_management_quality_from_fixture() {
        let ctx = fixture_context();
        let out = EvaluateManagementTool
            .execute(ctx, json!({"ticker": "600519.SH"}))
            .await
            .unwrap();
        let mq = &out["management_quality"];
        assert_eq!(mq["average_roe"], 33.33);
        // 30e9 dividends against 75e9 profit.
        assert_eq!(mq["dividend_payout_ratio"], 40.0);
        assert_eq!(mq["assessment"], "shareholder_friendly");
    }

    #[tokio::test]
    async fn test_free_cash_flow_from_fixture() {
        let ctx = fixture_context();
        let out = CalculateFreeCashFlowTool
            .execute(ctx, json!({"ticker": "600519.SH"}))
            .await
            .unwrap();
        let fcf = &out["free_cash_flow_analysis"];
        assert_eq!(fcf["latest_free_cash_flow"], 75_000_000_000.0);
        assert_eq!(fcf["all_years_positive"], true);
    }

    #[tokio::test]
    async fn test_valuation_ratios_from_fixture() {
        let ctx = fixture_context();
        let out = ComputeValuationRatiosTool
            .execute(ctx, json!({"ticker": "600519.SH"}))
            .await
            .unwrap();
        let v = &out["valuation_analysis"];
        assert_eq!(v["pe_ratio"], 26.79);
        // PB 8.93 is above the expensive threshold.
        assert_eq!(v["margin_of_safety"], "none");
    }

    #[tokio::test]
    async fn test_business_simplicity_from_fixture() {
        let ctx = fixture_context();
        let out = AssessBusinessSimplicityTool
            .execute(ctx, json!({"ticker": "600519.SH"}))
            .await
            .unwrap();
        let bs = &out["business_simplicity"];
        assert_eq!(bs["assessment"], "simple_and_predictable");
    }
}
