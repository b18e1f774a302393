//! Repertoire Sample: simulated sequencing of final repertoires.
//!
//! Usage:
//!   repertoire_sample --pathogens 1,10,100 --total 1000 --out fig_seq/
//!   repertoire_sample --runs 5 --total 1000 --out fig_seq/

use anyhow::{bail, Result};
use clap::Parser;
use clone_survey::common::{init_logging, CommonArgs, Manifest};
use clone_survey::sweep::{pathogen_sweep, save_samples, seed_sweep};
use clone_survey::with_simulator;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[derive(Parser)]
#[command(name = "repertoire_sample", about = "Multinomial samples of final clone sizes")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Comma-separated pathogen counts, one run each
    #[arg(long, value_delimiter = ',')]
    pathogens: Vec<usize>,

    /// Seeds 0..RUNS at the base pathogen count (used when --pathogens is empty)
    #[arg(long, default_value = "0")]
    runs: u64,

    /// Cells drawn per sample
    #[arg(long, default_value = "1000")]
    total: u64,

    /// Seed of the sampling RNG, independent of the simulation seeds
    #[arg(long, default_value = "0")]
    sample_seed: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.common.quiet);
    let base = args.common.base_config()?;
    if args.pathogens.is_empty() && args.runs == 0 {
        bail!("nothing to sample: pass --pathogens or --runs");
    }

    eprintln!("Base: {}", base.fingerprint());
    let mut rng = ChaCha8Rng::seed_from_u64(args.sample_seed);

    let samples = with_simulator!(args.common, |sim| {
        if args.pathogens.is_empty() {
            seed_sweep(&sim, &base, args.runs, args.total, &mut rng)?
        } else {
            pathogen_sweep(&sim, &base, &args.pathogens, args.total, &mut rng)?
        }
    });
    save_samples(&args.common.out, &samples)?;

    let mut manifest = Manifest::new("repertoire_sample", &base, samples.len() as u64);
    for sample in &samples {
        manifest = manifest.output(format!("sample_{}.npy", sample.label));
        let observed = sample.counts.iter().filter(|&&c| c > 0.0).count();
        let largest = sample.counts.first().copied().unwrap_or(0.0);
        println!(
            "{:<10} | clones observed {:>6} | largest {:>8}",
            sample.label, observed, largest
        );
    }
    manifest.save(&args.common.out)?;
    eprintln!("Wrote {}", args.common.out.display());
    Ok(())
}
