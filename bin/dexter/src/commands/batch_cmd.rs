use dexter_agent::run_batch;

use super::build_agent;

pub async fn run(symbols: &[String], workers: usize) -> anyhow::Result<()> {
    let agent = build_agent()?;

    println!(
        "Analyzing {} symbols with {} workers...",
        symbols.len(),
        workers
    );
    println!();

    let report = run_batch(agent, symbols, workers).await;

    for item in &report.items {
        println!("=== {} ===", item.symbol);
        match (&item.answer, &item.error) {
            (Some(answer), _) => {
                if item.from_cache {
                    println!("(served from cache)");
                }
                println!("{}", answer);
            }
            (None, Some(error)) => println!("分析失败: {}", error),
            (None, None) => println!("分析失败: no result"),
        }
        println!();
    }

    println!(
        "Batch finished: {} succeeded, {} failed",
        report.succeeded, report.failed
    );
    Ok(())
}
