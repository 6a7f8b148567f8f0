//! The research loop: confirm the subject, plan tasks, select and execute
//! tools per task under step budgets, judge completion, synthesize the
//! answer. Finished analyses are cached per symbol so repeat queries skip
//! the whole loop.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use dexter_cache::CacheManager;
use dexter_core::{Config, Error, Result, ToolCallRequest};
use dexter_datasources::{DataSourceManager, StockSymbol};
use dexter_providers::{Gateway, Provider};
use dexter_tools::{ToolContext, ToolRegistry};

use crate::prompts;
use crate::schemas::{Answer, IsDone, OptimizedToolArgs, StockConfirmation, Task, TaskList};

/// Rolling window of action signatures used for loop detection.
const REPEAT_WINDOW: usize = 4;

const NO_DATA_PLACEHOLDER: &str = "No data was collected.";
const SYNTHESIS_FALLBACK: &str =
    "Analysis could not be completed: the answer generation step failed. Please try again.";

pub struct Agent {
    gateway: Gateway,
    registry: Arc<ToolRegistry>,
    ctx: ToolContext,
    max_steps: u32,
    max_steps_per_task: u32,
}

/// What a finished run produced, and how.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub answer: String,
    pub confirmation: Option<StockConfirmation>,
    pub steps_used: u32,
    pub from_cache: bool,
}

impl Agent {
    pub fn new(
        config: Arc<Config>,
        provider: Arc<dyn Provider>,
        cache: Arc<CacheManager>,
        data: Arc<DataSourceManager>,
    ) -> Self {
        let gateway = Gateway::new(
            provider,
            config.agent.llm_max_attempts,
            Duration::from_millis(config.agent.llm_retry_delay_ms),
        );
        let registry = Arc::new(ToolRegistry::with_defaults());
        let max_steps = config.agent.max_steps;
        let max_steps_per_task = config.agent.max_steps_per_task;
        let ctx = ToolContext::new(config, cache, data);
        Self {
            gateway,
            registry,
            ctx,
            max_steps,
            max_steps_per_task,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Runs the full loop for one query.
    pub async fn run(&self, query: &str) -> Result<RunOutcome> {
        info!(query, "Starting research run");

        let confirmation = self.confirm_stock(query).await;
        let symbol = confirmation
            .as_ref()
            .and_then(|c| c.stock_code.as_deref())
            .and_then(|code| StockSymbol::parse(code).ok());

        // A confirmation that names no stock and asks for clarification ends
        // the run before any planning happens.
        if let Some(confirmation) = &confirmation {
            if symbol.is_none() {
                if let Some(clarification) = &confirmation.clarification_needed {
                    info!("Query needs clarification, skipping research loop");
                    return Ok(RunOutcome {
                        answer: clarification.clone(),
                        confirmation: Some(confirmation.clone()),
                        steps_used: 0,
                        from_cache: false,
                    });
                }
            }
        }

        // Finished analyses are cached per symbol.
        if let Some(symbol) = &symbol {
            let key = symbol.canonical();
            if let Some(cached) = self.ctx.cache.get("analysis", &key, None) {
                if let Some(answer) = cached.get("answer").and_then(|v| v.as_str()) {
                    info!(symbol = %key, "Serving analysis from cache");
                    return Ok(RunOutcome {
                        answer: answer.to_string(),
                        confirmation,
                        steps_used: 0,
                        from_cache: true,
                    });
                }
            }
        }

        let mut tasks = self.plan_tasks(query).await;
        let mut step_count: u32 = 0;
        let mut last_actions: Vec<String> = Vec::new();
        let mut session_outputs: Vec<String> = Vec::new();
        let mut budget_exhausted = false;

        // An empty plan means the query is out of scope for the tools; the
        // synthesizer answers directly from general knowledge.
        if tasks.is_empty() {
            info!("Planner produced no tasks, answering directly");
            let answer = self.generate_answer(query, &session_outputs).await;
            return Ok(RunOutcome {
                answer,
                confirmation,
                steps_used: 0,
                from_cache: false,
            });
        }

        'run: while tasks.iter().any(|t| !t.done) {
            if step_count >= self.max_steps {
                warn!("Global step budget reached, stopping");
                budget_exhausted = true;
                break;
            }

            let task_index = match tasks.iter().position(|t| !t.done) {
                Some(index) => index,
                None => break,
            };
            let task_desc = tasks[task_index].description.clone();
            info!(task = %task_desc, "Working on task");

            let mut per_task_steps: u32 = 0;
            let mut task_outputs: Vec<String> = Vec::new();
            while per_task_steps < self.max_steps_per_task {
                if step_count >= self.max_steps {
                    warn!("Global step budget reached mid-task, stopping");
                    budget_exhausted = true;
                    break 'run;
                }

                let response = self.select_action(&task_desc, &task_outputs).await;

                // No tool call means the model considers the task complete.
                let tool_calls = match response {
                    Ok(response) if !response.tool_calls.is_empty() => response.tool_calls,
                    Ok(_) => {
                        tasks[task_index].done = true;
                        debug!(task = %task_desc, "No tool selected, marking task done");
                        break;
                    }
                    Err(err) => {
                        warn!(error = %err, "Action selection failed, marking task done");
                        tasks[task_index].done = true;
                        break;
                    }
                };

                for call in tool_calls {
                    if step_count >= self.max_steps {
                        budget_exhausted = true;
                        break;
                    }
                    // A single response may carry several tool calls; the
                    // per-task cap bounds them just like separate selections.
                    if per_task_steps >= self.max_steps_per_task {
                        warn!(task = %task_desc, "Per-task step cap reached, dropping remaining calls");
                        break;
                    }

                    if self.registry.get(&call.name).is_none() {
                        warn!(tool = %call.name, "Unknown tool requested, skipping");
                        step_count += 1;
                        per_task_steps += 1;
                        continue;
                    }

                    let args = self
                        .optimize_args(&call.name, &call.arguments, &task_desc)
                        .await;
                    let call = ToolCallRequest {
                        arguments: args,
                        ..call
                    };

                    last_actions.push(call.signature());
                    if last_actions.len() > REPEAT_WINDOW {
                        last_actions.remove(0);
                    }
                    if last_actions.len() == REPEAT_WINDOW
                        && last_actions.windows(2).all(|w| w[0] == w[1])
                    {
                        warn!("Detected repeating action, aborting run");
                        return Err(Error::Agent(
                            "repeating action detected, aborting to avoid a loop".to_string(),
                        ));
                    }

                    match self
                        .registry
                        .execute(&call.name, self.ctx.clone(), call.arguments.clone())
                        .await
                    {
                        Ok(result) => {
                            debug!(tool = %call.name, "Tool succeeded");
                            let output = format!(
                                "Output of {} with args {}: {}",
                                call.name, call.arguments, result
                            );
                            session_outputs.push(output.clone());
                            task_outputs.push(output);
                        }
                        Err(err) => {
                            warn!(tool = %call.name, error = %err, "Tool failed");
                            let output = format!(
                                "Error from {} with args {}: {}",
                                call.name, call.arguments, err
                            );
                            session_outputs.push(output.clone());
                            task_outputs.push(output);
                        }
                    }

                    step_count += 1;
                    per_task_steps += 1;
                }

                if self.is_done(&task_desc, &task_outputs).await {
                    tasks[task_index].done = true;
                    info!(task = %task_desc, "Task complete");
                    break;
                }
            }
        }

        if budget_exhausted {
            info!("Synthesizing best-effort answer from partial evidence");
        }
        let answer = self.generate_answer(query, &session_outputs).await;

        // Only a run that finished its plan is worth caching.
        if !budget_exhausted && answer != SYNTHESIS_FALLBACK {
            if let Some(symbol) = &symbol {
                self.ctx.cache.set(
                    "analysis",
                    &symbol.canonical(),
                    None,
                    json!({ "answer": answer }),
                );
            }
        }

        Ok(RunOutcome {
            answer,
            confirmation,
            steps_used: step_count,
            from_cache: false,
        })
    }

    /// Identifies the stock and requested analysis before planning. A failed
    /// confirmation never blocks the run.
    async fn confirm_stock(&self, query: &str) -> Option<StockConfirmation> {
        match self
            .gateway
            .structured::<StockConfirmation>(
                &prompts::confirmation_prompt(query),
                Some(prompts::STOCK_CONFIRMATION_SYSTEM_PROMPT),
            )
            .await
        {
            Ok(confirmation) => {
                info!(
                    stock = %confirmation.stock_name,
                    code = confirmation.stock_code.as_deref().unwrap_or("?"),
                    analysis = %confirmation.analysis_type,
                    "Stock confirmed"
                );
                Some(confirmation)
            }
            Err(err) => {
                warn!(error = %err, "Stock confirmation failed, continuing without it");
                None
            }
        }
    }

    /// Decomposes the query into tasks. Planner failure degrades to a single
    /// task wrapping the query verbatim.
    async fn plan_tasks(&self, query: &str) -> Vec<Task> {
        let system = prompts::planning_system_prompt(&self.registry.tool_descriptions());
        match self
            .gateway
            .structured::<TaskList>(&prompts::planning_prompt(query), Some(&system))
            .await
        {
            Ok(list) => {
                for task in &list.tasks {
                    debug!(id = task.id, description = %task.description, "Planned task");
                }
                list.tasks
            }
            Err(err) => {
                warn!(error = %err, "Planning failed, falling back to a single task");
                vec![Task::new(1, query)]
            }
        }
    }

    async fn select_action(
        &self,
        task_desc: &str,
        task_outputs: &[String],
    ) -> Result<dexter_core::LLMResponse> {
        self.gateway
            .with_tools(
                &prompts::action_prompt(task_desc, &task_outputs.join("\n")),
                Some(prompts::ACTION_SYSTEM_PROMPT),
                &self.registry.get_tool_schemas(),
            )
            .await
    }

    /// Refines the proposed arguments against the tool's schema. Any failure
    /// keeps the original arguments.
    async fn optimize_args(&self, tool_name: &str, initial: &Value, task_desc: &str) -> Value {
        let Some(tool) = self.registry.get(tool_name) else {
            return initial.clone();
        };
        let schema = tool.schema();
        let prompt = prompts::tool_args_prompt(
            task_desc,
            tool_name,
            schema.description,
            &schema.parameters,
            initial,
        );
        match self
            .gateway
            .structured::<OptimizedToolArgs>(&prompt, Some(prompts::TOOL_ARGS_SYSTEM_PROMPT))
            .await
        {
            Ok(optimized) if !optimized.arguments.is_empty() => Value::Object(optimized.arguments),
            Ok(_) => initial.clone(),
            Err(err) => {
                warn!(tool = tool_name, error = %err, "Argument optimization failed, keeping original args");
                initial.clone()
            }
        }
    }

    /// Asks the judge whether the task is complete. Judge failure means not
    /// done.
    async fn is_done(&self, task_desc: &str, task_outputs: &[String]) -> bool {
        match self
            .gateway
            .structured::<IsDone>(
                &prompts::validation_prompt(task_desc, &task_outputs.join("\n")),
                Some(prompts::VALIDATION_SYSTEM_PROMPT),
            )
            .await
        {
            Ok(verdict) => verdict.done,
            Err(err) => {
                warn!(error = %err, "Completion check failed, treating task as not done");
                false
            }
        }
    }

    async fn generate_answer(&self, query: &str, session_outputs: &[String]) -> String {
        let all_results = if session_outputs.is_empty() {
            NO_DATA_PLACEHOLDER.to_string()
        } else {
            session_outputs.join("\n\n")
        };
        match self
            .gateway
            .structured::<Answer>(
                &prompts::answer_prompt(query, &all_results),
                Some(prompts::ANSWER_SYSTEM_PROMPT),
            )
            .await
        {
            Ok(answer) => answer.answer,
            Err(err) => {
                warn!(error = %err, "Answer synthesis failed");
                SYNTHESIS_FALLBACK.to_string()
            }
        }
    }
}
