//! Realtime quote tool.

use async_trait::async_trait;
use serde_json::{json, Value};

use dexter_core::Result;

use crate::{parse_ticker, Tool, ToolContext, ToolSchema};

pub struct GetRealtimeQuoteTool;

#[async_trait]
impl Tool for GetRealtimeQuoteTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_realtime_quote",
            description: "Get the realtime quote for a stock: current price, \
                          previous close, day range, volume and turnover",
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
        let quote = ctx.realtime(&symbol).await?;
        Ok(json!({ "realtime_quote": quote }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{fixture_context, offline_context};
    use serde_json::json;

    #[tokio::test]
    async fn test_quote_shape() {
        let ctx = fixture_context();
        let out = GetRealtimeQuoteTool
            .execute(ctx, json!({"ticker": "600519.SH"}))
            .await
            .unwrap();
        let quote = &out["realtime_quote"];
        assert_eq!(quote["current_price"], 1600.0);
        assert_eq!(quote["market"], "A股");
    }

    #[tokio::test]
    async fn test_source_failure_propagates() {
        let ctx = offline_context();
        assert!(GetRealtimeQuoteTool
            .execute(ctx, json!({"ticker": "600519.SH"}))
            .await
            .is_err());
    }
}
