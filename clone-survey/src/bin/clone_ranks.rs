//! Clone Ranks: clone-size trajectory of one run and final rank-size
//! distributions of further seeds.
//!
//! Usage: clone_ranks --others 9 --cache-dir /tmp/clones --out fig_ranks/

use anyhow::Result;
use clap::Parser;
use clone_survey::common::{init_logging, CommonArgs, Manifest};
use clone_survey::sweep::clone_ranks;
use clone_survey::with_simulator;

#[derive(Parser)]
#[command(name = "clone_ranks", about = "Clone-size trajectory and rank distributions")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Extra seeds 1..=OTHERS contributing final rank distributions
    #[arg(long, default_value = "9")]
    others: u64,

    /// Largest clones to print
    #[arg(long, default_value = "10")]
    top: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.common.quiet);
    let base = args.common.base_config()?;

    eprintln!("Base: {}", base.fingerprint());

    let ranks = with_simulator!(args.common, |sim| clone_ranks(&sim, &base, args.others)?);
    ranks.save(&args.common.out)?;
    Manifest::new("clone_ranks", &base, args.others + 1)
        .output("epochs.npy")
        .output("agent_ns.npy")
        .output("rank_highlighted.npy")
        .output("rank_others.npy")
        .save(&args.common.out)?;

    let total: f64 = ranks.highlighted.iter().sum();
    for (rank, size) in ranks.highlighted.iter().take(args.top).enumerate() {
        let share = if total > 0.0 { size / total } else { 0.0 };
        println!("#{:<4} size {:>12.4} | share {:>6.2}%", rank + 1, size, share * 100.0);
    }
    eprintln!("Wrote {}", args.common.out.display());
    Ok(())
}
