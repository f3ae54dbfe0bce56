//! Manual trade commands.

use anyhow::Result;
use std::path::Path;

use papertrade_core::types::TradeRequest;
use papertrade_engine::TradeOutcome;

use crate::cli::{AppContext, HistoryArgs, TradeArgs, TradeCmd};

pub async fn run(cmd: TradeCmd, user: &str, config_path: &Path) -> Result<()> {
    let ctx = AppContext::init(config_path)?;
    match cmd {
        TradeCmd::Buy(args) => execute(&ctx, user, args, true).await,
        TradeCmd::Sell(args) => execute(&ctx, user, args, false).await,
        TradeCmd::History(args) => history(&ctx, user, args),
    }
}

async fn execute(ctx: &AppContext, user: &str, args: TradeArgs, buy: bool) -> Result<()> {
    ctx.require_owned(args.portfolio, user)?;

    let mut request = if buy {
        TradeRequest::buy(args.portfolio, args.symbol.as_str(), args.quantity)
    } else {
        TradeRequest::sell(args.portfolio, args.symbol.as_str(), args.quantity)
    };
    if let Some(price) = args.price {
        request = request.with_price(price);
    }

    let outcome = ctx.executor().execute(request).await?;
    print_outcome(&outcome, &args.output)?;
    Ok(())
}

fn print_outcome(outcome: &TradeOutcome, output: &str) -> Result<()> {
    if output == "json" {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    println!(
        "{} {} {} @ {} (total {})",
        outcome.action, outcome.quantity, outcome.symbol, outcome.price, outcome.total_value
    );
    if let Some(pnl) = outcome.pnl {
        println!("  Realized P&L: {pnl}");
    }
    println!("  Trade ID: {}", outcome.trade_id);
    Ok(())
}

fn history(ctx: &AppContext, user: &str, args: HistoryArgs) -> Result<()> {
    ctx.require_owned(args.portfolio, user)?;

    let trades = ctx.ledger.trades(args.portfolio)?;
    if trades.is_empty() {
        println!("No trades recorded for portfolio {}.", args.portfolio);
        return Ok(());
    }

    println!(
        "{:<26} {:<5} {:<8} {:>12} {:>10} {:>12} {:>10} {:>5}",
        "EXECUTED", "SIDE", "SYMBOL", "QUANTITY", "PRICE", "TOTAL", "P&L", "AUTO"
    );
    for t in trades.iter().take(args.limit) {
        println!(
            "{:<26} {:<5} {:<8} {:>12} {:>10} {:>12} {:>10} {:>5}",
            t.executed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            t.action.to_string(),
            t.symbol,
            t.size,
            t.price,
            t.total_value,
            t.pnl.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
            if t.auto_traded { "yes" } else { "" }
        );
    }
    Ok(())
}
