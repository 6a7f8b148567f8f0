pub mod deepseek;
pub mod gateway;
pub mod retry;

use async_trait::async_trait;
use dexter_core::types::{ChatMessage, LLMResponse};
use dexter_core::Result;
use serde_json::Value;

#[async_trait]
pub trait Provider: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage], tools: &[Value]) -> Result<LLMResponse>;
}

pub use deepseek::DeepSeekProvider;
pub use gateway::Gateway;
pub use retry::with_retry;
