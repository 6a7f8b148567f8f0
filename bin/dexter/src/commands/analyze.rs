use dexter_agent::{RunOutcome, StockConfirmation};

use super::build_agent;

pub async fn run(query: &str) -> anyhow::Result<()> {
    let agent = build_agent()?;

    println!();
    println!("📝 用户查询: {}", query);
    println!();

    let outcome = agent.run(query).await?;
    print_outcome(&outcome);
    Ok(())
}

pub fn print_outcome(outcome: &RunOutcome) {
    if let Some(confirmation) = &outcome.confirmation {
        print_confirmation(confirmation);
    }

    if outcome.from_cache {
        println!("(served from cache)");
        println!();
    }

    println!("🎯 价值投资分析报告");
    println!();
    println!("{}", outcome.answer);
    println!();
}

fn print_confirmation(confirmation: &StockConfirmation) {
    println!("📈 股票确认:");
    println!(
        "   🎯 股票: {} ({})",
        confirmation.stock_name,
        confirmation.stock_code.as_deref().unwrap_or("未识别")
    );
    println!("   📊 分析类型: {}", confirmation.analysis_type);
    if !confirmation.analysis_dimensions.is_empty() {
        println!(
            "   🔍 分析维度: {}",
            confirmation.analysis_dimensions.join(", ")
        );
    }
    if let Some(clarification) = &confirmation.clarification_needed {
        println!("   💡 说明: {}", clarification);
    }
    println!();
}
