//! Signal recording and inspection commands.

use anyhow::Result;
use std::path::Path;
use tracing::info;

use papertrade_core::types::Signal;

use crate::cli::{AppContext, SignalCmd, SignalListArgs, SignalRecordArgs};

pub async fn run(cmd: SignalCmd, config_path: &Path) -> Result<()> {
    let ctx = AppContext::init(config_path)?;
    match cmd {
        SignalCmd::Record(args) => record(&ctx, args),
        SignalCmd::List(args) => list(&ctx, args),
    }
}

fn record(ctx: &AppContext, args: SignalRecordArgs) -> Result<()> {
    let signal = Signal::new(args.symbol.trim().to_ascii_uppercase(), args.score, args.source);
    signal.validate()?;
    ctx.signals.record_signal(&signal)?;
    info!(symbol = %signal.symbol, score = %signal.score, "signal recorded");

    println!(
        "Recorded {} {} from '{}'",
        signal.symbol, signal.score, signal.source
    );
    Ok(())
}

fn list(ctx: &AppContext, args: SignalListArgs) -> Result<()> {
    let symbol = args.symbol.trim().to_ascii_uppercase();
    let signals = ctx.signals.recent_signals(&symbol, args.limit)?;
    if signals.is_empty() {
        println!("No signals recorded for {symbol}.");
        return Ok(());
    }

    println!("{:<8} {:>8} {:<16} GENERATED", "SYMBOL", "SCORE", "SOURCE");
    for s in signals {
        println!(
            "{:<8} {:>8} {:<16} {}",
            s.symbol, s.score, s.source, s.generated_at
        );
    }
    Ok(())
}
