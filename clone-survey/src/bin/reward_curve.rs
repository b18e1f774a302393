//! Reward Curve: interquartile band of normalized reward across seeds.
//!
//! Usage: reward_curve --runs 20 --cache-dir /tmp/clones --out fig_reward/

use anyhow::Result;
use clap::Parser;
use clone_survey::common::{init_logging, CommonArgs, Manifest};
use clone_survey::sweep::reward_curve;
use clone_survey::with_simulator;

#[derive(Parser)]
#[command(name = "reward_curve", about = "Reward percentiles over repeated seeds")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Seeds 0..RUNS
    #[arg(long, default_value = "20")]
    runs: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.common.quiet);
    let base = args.common.base_config()?;

    eprintln!("Base: {}", base.fingerprint());
    eprintln!("Runs: {}", args.runs);

    let band = with_simulator!(args.common, |sim| reward_curve(&sim, &base, args.runs)?);
    band.save(&args.common.out)?;
    Manifest::new("reward_curve", &base, args.runs)
        .output("epochs.npy")
        .output("rewards_p25.npy")
        .output("rewards_median.npy")
        .output("rewards_p75.npy")
        .save(&args.common.out)?;

    if let (Some(epoch), Some(median)) = (band.epochs.last(), band.median.last()) {
        println!("final epoch {:>10} | median reward {:.4}", epoch, median);
    }
    eprintln!("Wrote {}", args.common.out.display());
    Ok(())
}
