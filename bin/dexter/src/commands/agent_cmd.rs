use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;

use super::{analyze::print_outcome, build_agent};

/// Interactive session: one research run per input line.
pub async fn run() -> anyhow::Result<()> {
    let agent = build_agent()?;

    println!("dexter interactive session");
    println!("Type a query (e.g. 分析600519.SH), or 'exit' to quit.");
    println!();

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all("dexter> ".as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query, "exit" | "quit" | "q") {
            break;
        }

        match agent.run(query).await {
            Ok(outcome) => print_outcome(&outcome),
            Err(err) => {
                warn!(error = %err, "Run failed");
                println!("分析失败: {}", err);
                println!();
            }
        }
    }

    println!("bye");
    Ok(())
}
