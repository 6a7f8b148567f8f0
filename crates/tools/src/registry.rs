use std::collections::HashMap;
use std::sync::Arc;

use dexter_core::{Error, Result};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::analysis::{
    AnalyzeMoatTool, AssessBusinessSimplicityTool, CalculateFreeCashFlowTool,
    ComputeValuationRatiosTool, EvaluateManagementTool,
};
use crate::financials::{GetBalanceSheetsTool, GetCashFlowStatementsTool, GetIncomeStatementsTool};
use crate::quote::GetRealtimeQuoteTool;
use crate::valuation::GetStockValuationTool;
use crate::{Tool, ToolContext};

#[derive(Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        // Financial statement tools
        registry.register(Arc::new(GetIncomeStatementsTool));
        registry.register(Arc::new(GetBalanceSheetsTool));
        registry.register(Arc::new(GetCashFlowStatementsTool));

        // Market data
        registry.register(Arc::new(GetRealtimeQuoteTool));
        registry.register(Arc::new(GetStockValuationTool));

        // Value-investing analysis
        registry.register(Arc::new(AnalyzeMoatTool));
        registry.register(Arc::new(EvaluateManagementTool));
        registry.register(Arc::new(CalculateFreeCashFlowTool));
        registry.register(Arc::new(ComputeValuationRatiosTool));
        registry.register(Arc::new(AssessBusinessSimplicityTool));

        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let schema = tool.schema();
        debug!(name = schema.name, "Registering tool");
        self.tools.insert(schema.name.to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Tool schemas in the OpenAI function-calling envelope.
    pub fn get_tool_schemas(&self) -> Vec<Value> {
        self.tools
            .values()
            .map(|tool| {
                let schema = tool.schema();
                json!({
                    "type": "function",
                    "function": {
                        "name": schema.name,
                        "description": schema.description,
                        "parameters": schema.parameters
                    }
                })
            })
            .collect()
    }

    /// Registered tool names, sorted for stable prompt rendering.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// "name: description" lines for the planning prompt.
    pub fn tool_descriptions(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .tools
            .values()
            .map(|tool| {
                let schema = tool.schema();
                format!("{}: {}", schema.name, schema.description)
            })
            .collect();
        lines.sort();
        lines
    }

    pub async fn execute(&self, name: &str, ctx: ToolContext, params: Value) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::Tool(format!("Unknown tool: {}", name)))?;

        if let Err(e) = tool.validate(&params) {
            warn!(tool = name, error = %e, "Tool validation failed");
            return Err(e);
        }

        debug!(tool = name, "Executing tool");
        tool.execute(ctx, params).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::fixture_context;

    #[test]
    fn test_registry_new_empty() {
        let reg = ToolRegistry::new();
        assert!(reg.tool_names().is_empty());
        assert!(reg.get("get_realtime_quote").is_none());
    }

    #[test]
    fn test_registry_with_defaults_has_all_tools() {
        let reg = ToolRegistry::with_defaults();
        let names = reg.tool_names();
        assert_eq!(names.len(), 10);
        for expected in [
            "get_income_statements",
            "get_balance_sheets",
            "get_cash_flow_statements",
            "get_realtime_quote",
            "get_stock_valuation",
            "analyze_moat",
            "evaluate_management",
            "calculate_free_cash_flow",
            "compute_valuation_ratios",
            "assess_business_simplicity",
        ] {
            assert!(names.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn test_registry_get_tool_schemas() {
        let reg = ToolRegistry::with_defaults();
        let schemas = reg.get_tool_schemas();
        assert_eq!(schemas.len(), 10);
        for schema in &schemas {
            assert_eq!(schema["type"], "function");
            assert!(schema["function"]["name"].is_string());
            assert!(schema["function"]["description"].is_string());
            assert!(schema["function"]["parameters"].is_object());
        }
    }

    #[tokio::test]
    async fn test_execute_unknown_tool_is_an_error() {
        let reg = ToolRegistry::with_defaults();
        let err = reg
            .execute("shred_portfolio", fixture_context(), serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unknown tool"));
    }

    #[tokio::test]
    async fn test_execute_dispatches_to_tool() {
        let reg = ToolRegistry::with_defaults();
        let out = reg
            .execute(
                "get_realtime_quote",
                fixture_context(),
                serde_json::json!({"ticker": "600519.SH"}),
            )
            .await
            .unwrap();
        assert!(out.get("realtime_quote").is_some());
    }
}
