//! Shared helpers for picking rows and fields out of raw statement JSON.
//!
//! Statement rows keep their upstream field names, which differ between
//! A-share and Hong Kong reports, so every metric is looked up through an
//! ordered key-fallback list.

use serde_json::Value;

/// Report date of a row, whichever key the source used.
pub fn report_date(row: &Value) -> &str {
    row.get("REPORT_DATE")
        .or_else(|| row.get("报告日"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

/// Latest annual row (report date ending 12-31). Rows arrive newest first;
/// when no annual row exists, falls back to the newest row of any period.
pub fn latest_annual<'a>(rows: &'a [Value]) -> Option<&'a Value> {
    rows.iter()
        .find(|row| {
            let date = report_date(row);
            date.contains("12-31") || date.ends_with("1231")
        })
        .or_else(|| rows.first())
}

/// First numeric value found under any of the given keys.
pub fn field(row: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|key| row.get(*key).and_then(|v| v.as_f64()))
        .filter(|v| v.is_finite())
}

/// Like [`field`] but treating zero as absent, matching the `or`-chained
/// lookups the statement vocabularies need.
pub fn nonzero_field(row: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| row.get(*key).and_then(|v| v.as_f64()))
        .find(|v| v.is_finite() && *v != 0.0)
}

// Field vocabularies, A-share datacenter names first, then the legacy
// Chinese labels, then the HK variants.

pub const NET_PROFIT_KEYS: &[&str] = &[
    "PARENT_NETPROFIT",
    "NETPROFIT",
    "HOLDER_PROFIT",
    "归属于母公司所有者的净利润",
    "净利润",
];

pub const TOTAL_EQUITY_KEYS: &[&str] = &[
    "TOTAL_EQUITY",
    "TOTAL_PARENT_EQUITY",
    "归属于母公司股东权益合计",
    "归属于母公司股东的权益",
    "股东权益合计",
    "所有者权益合计",
];

pub const TOTAL_SHARES_KEYS: &[&str] = &[
    "SHARE_CAPITAL",
    "TOTAL_SHARE",
    "实收资本(或股本)",
    "股本",
    "实收资本",
    "已发行股本(股)",
];

pub const REVENUE_KEYS: &[&str] = &[
    "TOTAL_OPERATE_INCOME",
    "OPERATE_INCOME",
    "营业总收入",
    "营业收入",
];

pub const OPERATING_COST_KEYS: &[&str] = &["OPERATE_COST", "营业成本"];

pub const OPERATING_CASH_FLOW_KEYS: &[&str] = &[
    "NETCASH_OPERATE",
    "经营活动产生的现金流量净额",
];

pub const CAPEX_KEYS: &[&str] = &[
    "CONSTRUCT_LONG_ASSET",
    "购建固定资产、无形资产和其他长期资产支付的现金",
];

pub const DIVIDENDS_PAID_KEYS: &[&str] = &[
    "ASSIGN_DIVIDEND_PORFIT",
    "分配股利、利润或偿付利息所支付的现金",
];

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_latest_annual_prefers_year_end() {
        let rows = vec![
            json!({"REPORT_DATE": "2025-03-31 00:00:00", "PARENT_NETPROFIT": 1.0}),
            json!({"REPORT_DATE": "2024-12-31 00:00:00", "PARENT_NETPROFIT": 2.0}),
        ];
        let row = latest_annual(&rows).unwrap();
        assert_eq!(report_date(row), "2024-12-31 00:00:00");
    }

    #[test]
    fn test_latest_annual_falls_back_to_newest() {
        let rows = vec![
            json!({"报告日": "20250331"}),
            json!({"报告日": "20241231"}),
        ];
        assert_eq!(report_date(latest_annual(&rows).unwrap()), "20241231");

        let quarterlies = vec![json!({"报告日": "20250331"})];
        assert_eq!(report_date(latest_annual(&quarterlies).unwrap()), "20250331");
        assert!(latest_annual(&[]).is_none());
    }

    #[test]
    fn test_field_fallback_chain() {
        let a_share = json!({"归属于母公司所有者的净利润": 100.0});
        assert_eq!(nonzero_field(&a_share, NET_PROFIT_KEYS), Some(100.0));

        let hk = json!({"HOLDER_PROFIT": 55.0});
        assert_eq!(nonzero_field(&hk, NET_PROFIT_KEYS), Some(55.0));

        // Zero values are skipped over in favor of later keys.
        let mixed = json!({"PARENT_NETPROFIT": 0.0, "净利润": 42.0});
        assert_eq!(nonzero_field(&mixed, NET_PROFIT_KEYS), Some(42.0));

        assert_eq!(nonzero_field(&json!({}), NET_PROFIT_KEYS), None);
    }
}
