//! Batch analysis: one research run per symbol, fanned out over a bounded
//! worker pool. Workers share the agent and therefore its cache, so symbols
//! analyzed earlier in the batch are served from cache later.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::agent::Agent;

#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub symbol: String,
    pub answer: Option<String>,
    pub error: Option<String>,
    pub from_cache: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
    pub succeeded: usize,
    pub failed: usize,
}

/// Analyzes each symbol with at most `max_workers` runs in flight. Results
/// come back in input order.
pub async fn run_batch(agent: Arc<Agent>, symbols: &[String], max_workers: usize) -> BatchReport {
    let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
    let mut handles = Vec::with_capacity(symbols.len());

    for symbol in symbols {
        let agent = agent.clone();
        let semaphore = semaphore.clone();
        let symbol = symbol.clone();
        handles.push(tokio::spawn(async move {
            // Closing the semaphore is not part of this flow, so acquire
            // only fails if the task is being torn down.
            let _permit = match semaphore.acquire().await {
                Ok(permit) => permit,
                Err(_) => {
                    return BatchItem {
                        symbol,
                        answer: None,
                        error: Some("worker pool closed".to_string()),
                        from_cache: false,
                    }
                }
            };
            info!(symbol = %symbol, "Batch analysis started");
            match agent.run(&format!("分析{symbol}")).await {
                Ok(outcome) => BatchItem {
                    symbol,
                    answer: Some(outcome.answer),
                    error: None,
                    from_cache: outcome.from_cache,
                },
                Err(err) => {
                    warn!(symbol = %symbol, error = %err, "Batch analysis failed");
                    BatchItem {
                        symbol,
                        answer: None,
                        error: Some(err.to_string()),
                        from_cache: false,
                    }
                }
            }
        }));
    }

    let mut items = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(item) => items.push(item),
            Err(err) => {
                warn!(error = %err, "Batch worker panicked");
            }
        }
    }

    let succeeded = items.iter().filter(|i| i.answer.is_some()).count();
    let failed = items.len() - succeeded;
    info!(succeeded, failed, "Batch analysis finished");
    BatchReport {
        items,
        succeeded,
        failed,
    }
}
