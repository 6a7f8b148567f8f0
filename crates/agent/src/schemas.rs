//! Structured outputs the loop asks the model for. Each type maps to one
//! JSON-only LLM call.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One step of the research plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: u32,
    pub description: String,
    #[serde(default)]
    pub done: bool,
}

impl Task {
    pub fn new(id: u32, description: &str) -> Self {
        Self {
            id,
            description: description.to_string(),
            done: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskList {
    pub tasks: Vec<Task>,
}

/// Completion verdict for a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsDone {
    pub done: bool,
}

/// Final synthesized answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
}

/// Refined arguments for a pending tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizedToolArgs {
    pub arguments: Map<String, Value>,
}

/// Subject confirmation parsed out of the user query before planning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockConfirmation {
    pub stock_name: String,
    #[serde(default)]
    pub stock_code: Option<String>,
    pub analysis_type: String,
    #[serde(default)]
    pub analysis_dimensions: Vec<String>,
    #[serde(default)]
    pub clarification_needed: Option<String>,
}
