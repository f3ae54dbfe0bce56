//! Portfolio management commands.

use anyhow::Result;
use rust_decimal::Decimal;
use std::path::Path;
use tracing::info;

use papertrade_core::types::Portfolio;
use papertrade_engine::PositionManager;

use crate::cli::{AppContext, PortfolioCmd, PortfolioCreateArgs, PortfolioShowArgs, SetAutoArgs};

pub async fn run(cmd: PortfolioCmd, user: &str, config_path: &Path) -> Result<()> {
    let ctx = AppContext::init(config_path)?;
    match cmd {
        PortfolioCmd::Create(args) => create(&ctx, user, args),
        PortfolioCmd::List => list(&ctx, user),
        PortfolioCmd::Show(args) => show(&ctx, user, args).await,
        PortfolioCmd::SetAuto(args) => set_auto(&ctx, user, args),
    }
}

fn create(ctx: &AppContext, user: &str, args: PortfolioCreateArgs) -> Result<()> {
    if args.balance <= Decimal::ZERO {
        anyhow::bail!("starting balance must be positive, got {}", args.balance);
    }

    let portfolio = Portfolio::new(user, args.name, args.balance);
    ctx.ledger.create_portfolio(&portfolio)?;
    info!(portfolio_id = %portfolio.id, owner = %portfolio.owner_id, "portfolio created");

    println!("Created portfolio '{}'", portfolio.name);
    println!("  ID:       {}", portfolio.id);
    println!("  Owner:    {}", portfolio.owner_id);
    println!("  Cash:     ${}", portfolio.cash);
    Ok(())
}

fn list(ctx: &AppContext, user: &str) -> Result<()> {
    let portfolios = ctx.ledger.portfolios_for_owner(user)?;
    if portfolios.is_empty() {
        println!("No portfolios for user '{user}'.");
        return Ok(());
    }

    println!(
        "{:<38} {:<20} {:>14} {:>14} {:>6}",
        "ID", "NAME", "EQUITY", "CASH", "AUTO"
    );
    for p in portfolios {
        println!(
            "{:<38} {:<20} {:>14} {:>14} {:>6}",
            p.id,
            p.name,
            p.total_equity,
            p.cash,
            if p.auto_trading_enabled { "on" } else { "off" }
        );
    }
    Ok(())
}

async fn show(ctx: &AppContext, user: &str, args: PortfolioShowArgs) -> Result<()> {
    ctx.require_owned(args.id, user)?;

    // Refresh marks so the printed valuations reflect current quotes.
    let portfolio = ctx.aggregator().refresh(args.id).await?;

    if args.output == "json" {
        println!("{}", serde_json::to_string_pretty(&portfolio)?);
        return Ok(());
    }

    println!("{} ({})", portfolio.name, portfolio.id);
    if portfolio.time_travel_enabled {
        if let Some(instant) = portfolio.sim_instant {
            println!("  Clock:          simulated, {instant}");
        }
    }
    println!("  Cash:           ${}", portfolio.cash);
    println!("  Stocks value:   ${}", portfolio.stocks_value);
    println!("  Total equity:   ${}", portfolio.total_equity);
    println!(
        "  Total P&L:      ${} ({}%)",
        portfolio.total_pnl, portfolio.total_pnl_percent
    );
    println!(
        "  Daily P&L:      ${} ({}%)",
        portfolio.daily_pnl, portfolio.daily_pnl_percent
    );
    println!("  Auto-trading:   {}", portfolio.auto_trading_enabled);

    let manager = PositionManager::new(ctx.ledger.clone());
    let positions = manager
        .marked_open_positions(args.id, ctx.prices.as_ref())
        .await?;
    if positions.is_empty() {
        println!("  Open positions: none");
    } else {
        println!("  Open positions:");
        for p in positions {
            println!(
                "    {:<8} {:>12} @ {:>10}  now {:>10}  value {:>12}",
                p.symbol,
                p.size,
                p.entry_price,
                p.current_price,
                p.market_value()
            );
        }
    }
    Ok(())
}

fn set_auto(ctx: &AppContext, user: &str, args: SetAutoArgs) -> Result<()> {
    let mut portfolio = ctx.require_owned(args.id, user)?;

    portfolio.auto_trading_enabled = !args.off;
    if let Some(max_trades) = args.max_trades {
        if max_trades == 0 {
            anyhow::bail!("max trades per day must be at least 1");
        }
        portfolio.auto_max_trades_per_day = max_trades;
    }
    if let Some(risk_limit) = args.risk_limit {
        if risk_limit <= Decimal::ZERO || risk_limit > Decimal::ONE {
            anyhow::bail!("risk limit must be in (0, 1], got {risk_limit}");
        }
        portfolio.auto_risk_limit = risk_limit;
    }
    ctx.ledger.update_portfolio(&portfolio)?;
    info!(
        portfolio_id = %portfolio.id,
        enabled = portfolio.auto_trading_enabled,
        "auto-trading settings updated"
    );

    println!(
        "Auto-trading {} for '{}' (max {}/day, risk limit {})",
        if portfolio.auto_trading_enabled {
            "enabled"
        } else {
            "disabled"
        },
        portfolio.name,
        portfolio.auto_max_trades_per_day,
        portfolio.auto_risk_limit
    );
    Ok(())
}
