//! Auto-trading run command.

use anyhow::Result;
use std::path::Path;

use papertrade_strategies::RunRequest;

use crate::cli::{AppContext, AutoArgs};

pub async fn run(args: AutoArgs, user: &str, config_path: &Path) -> Result<()> {
    let ctx = AppContext::init(config_path)?;
    ctx.require_owned(args.portfolio, user)?;

    let mut request = RunRequest::portfolio(args.portfolio);
    if let Some(strategy_id) = args.strategy {
        request = request.with_strategy(strategy_id);
    }
    if let Some(symbols) = args.symbols {
        request = request.with_symbols(symbols);
    }

    let report = ctx.evaluator()?.run(request).await?;

    if args.output == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Run finished: {} executed, {} skipped, {} errors",
        report.summary.executed_count, report.summary.skipped_count, report.summary.error_count
    );
    for item in &report.executed {
        println!(
            "  {} {} {} @ {} (score {}, strategy '{}')",
            item.action, item.quantity, item.symbol, item.price, item.score, item.strategy
        );
    }
    for item in &report.skipped {
        println!("  skipped {}: {}", item.symbol, item.reason);
    }
    for item in &report.errors {
        println!("  error {}: {} ({})", item.symbol, item.message, item.kind);
    }
    Ok(())
}
