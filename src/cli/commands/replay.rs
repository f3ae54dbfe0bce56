//! Time-travel replay command.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::path::Path;
use tracing::warn;

use papertrade_engine::ReplaySnapshot;

use crate::cli::{AppContext, ReplayArgs};

pub async fn run(args: ReplayArgs, user: &str, config_path: &Path) -> Result<()> {
    let ctx = AppContext::init(config_path)?;
    ctx.require_owned(args.portfolio, user)?;
    let engine = ctx.replay_engine();

    if args.resume {
        let portfolio = engine.resume(args.portfolio).await?;
        println!(
            "Portfolio '{}' returned to the live clock.",
            portfolio.name
        );
        return Ok(());
    }

    let Some(raw) = args.to.as_deref() else {
        anyhow::bail!("provide --to <instant> to replay, or --resume to return to the live clock");
    };
    let cutoff = parse_cutoff(raw)?;

    if args.reset {
        if !args.yes {
            anyhow::bail!(
                "--reset permanently deletes the portfolio's entire trade history and restores the starting balance; re-run with --yes to confirm"
            );
        }
        warn!(portfolio_id = %args.portfolio, %cutoff, "resetting portfolio history");
        let portfolio = engine.reset(args.portfolio, cutoff).await?;
        println!(
            "Portfolio '{}' reset: history wiped, cash back to {}, clock pinned at {}.",
            portfolio.name, portfolio.cash, cutoff
        );
        return Ok(());
    }

    let snapshot = engine.replay(args.portfolio, cutoff).await?;
    print_snapshot(&snapshot, &args.output)
}

fn print_snapshot(snapshot: &ReplaySnapshot, output: &str) -> Result<()> {
    if output == "json" {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
        return Ok(());
    }

    println!(
        "State as of {} ({} trades applied)",
        snapshot.cutoff, snapshot.trades_applied
    );
    println!("  Cash:         ${}", snapshot.cash);
    println!("  Total equity: ${}", snapshot.total_equity);
    if snapshot.holdings.is_empty() {
        println!("  Holdings:     none");
    } else {
        println!("  Holdings:");
        for h in &snapshot.holdings {
            println!(
                "    {:<8} {:>12} @ {:>10}  value {:>12}",
                h.symbol, h.size, h.avg_price, h.value
            );
        }
    }
    Ok(())
}

/// Parse an RFC 3339 instant, or a bare date meaning the end of that day.
fn parse_cutoff(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| {
        format!("unrecognized cutoff '{raw}', expected RFC 3339 or YYYY-MM-DD")
    })?;
    Ok(date.and_hms_opt(23, 59, 59).unwrap_or_default().and_utc())
}
