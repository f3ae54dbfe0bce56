//! Strategy management commands.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use papertrade_core::types::{Strategy, StrategyConfig, StrategyKind};

use crate::cli::{AppContext, StrategyAddArgs, StrategyCmd, StrategyListArgs};

pub async fn run(cmd: StrategyCmd, user: &str, config_path: &Path) -> Result<()> {
    let ctx = AppContext::init(config_path)?;
    match cmd {
        StrategyCmd::Add(args) => add(&ctx, user, args),
        StrategyCmd::List(args) => list(&ctx, user, args),
    }
}

fn add(ctx: &AppContext, user: &str, args: StrategyAddArgs) -> Result<()> {
    ctx.require_owned(args.portfolio, user)?;

    let kind: StrategyKind = args
        .kind
        .parse()
        .with_context(|| format!("unknown strategy kind '{}'", args.kind))?;

    let symbols = args
        .symbols
        .iter()
        .map(|s| s.trim().to_ascii_uppercase())
        .collect();
    let mut strategy = Strategy::new(
        args.portfolio,
        args.name,
        kind,
        args.threshold,
        StrategyConfig::new(symbols, args.fraction),
    );
    if args.auto {
        strategy = strategy.auto_execute();
    }
    strategy.validate()?;
    ctx.ledger.create_strategy(&strategy)?;
    info!(strategy_id = %strategy.id, portfolio_id = %args.portfolio, "strategy created");

    println!("Created strategy '{}'", strategy.name);
    println!("  ID:         {}", strategy.id);
    println!("  Kind:       {}", strategy.kind);
    println!("  Threshold:  {}", strategy.signal_threshold);
    println!("  Symbols:    {}", strategy.config.symbols.join(", "));
    println!("  Fraction:   {}", strategy.config.position_size_fraction);
    println!("  Auto:       {}", strategy.auto_execute);
    Ok(())
}

fn list(ctx: &AppContext, user: &str, args: StrategyListArgs) -> Result<()> {
    ctx.require_owned(args.portfolio, user)?;

    let strategies = ctx.ledger.strategies_for_portfolio(args.portfolio)?;
    if strategies.is_empty() {
        println!("No strategies for portfolio {}.", args.portfolio);
        return Ok(());
    }

    println!(
        "{:<38} {:<16} {:<12} {:>9} {:>9} {:>5}  SYMBOLS",
        "ID", "NAME", "KIND", "THRESHOLD", "FRACTION", "AUTO"
    );
    for s in strategies {
        println!(
            "{:<38} {:<16} {:<12} {:>9} {:>9} {:>5}  {}",
            s.id,
            s.name,
            s.kind.to_string(),
            s.signal_threshold,
            s.config.position_size_fraction,
            if s.auto_execute { "yes" } else { "no" },
            s.config.symbols.join(",")
        );
    }
    Ok(())
}
