pub mod agent;
pub mod batch;
pub mod prompts;
pub mod schemas;

pub use agent::{Agent, RunOutcome};
pub use batch::{run_batch, BatchItem, BatchReport};
pub use schemas::{Answer, IsDone, OptimizedToolArgs, StockConfirmation, Task, TaskList};
