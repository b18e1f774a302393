use clone_sim::cache::DirStore;
use clone_sim::{Array, SimConfig, Simulator};
use clone_survey::common::Manifest;
use clone_survey::sweep::{
    clone_ranks, pathogen_sweep, reward_curve, sample_repertoire, save_samples, seed_sweep,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;

fn tiny() -> SimConfig {
    SimConfig {
        record_per: 10,
        max_epoch: 50,
        seed: 0,
        n_key_states: 3,
        dim_state: 4,
        dim_action: 2,
        n_hidden: 8,
        ..SimConfig::default()
    }
}

#[test]
fn test_reward_curve_band_is_ordered() {
    let sim = Simulator::uncached();
    let band = reward_curve(&sim, &tiny(), 4).unwrap();

    assert_eq!(band.runs, 4);
    assert_eq!(band.epochs, vec![10.0, 20.0, 30.0, 40.0, 50.0]);
    assert_eq!(band.median.len(), 5);
    for i in 0..5 {
        assert!(band.low[i] <= band.median[i]);
        assert!(band.median[i] <= band.high[i]);
    }
}

#[test]
fn test_reward_curve_rejects_zero_runs() {
    assert!(reward_curve(&Simulator::uncached(), &tiny(), 0).is_err());
}

#[test]
fn test_reward_curve_save_writes_arrays() {
    let dir = TempDir::new().unwrap();
    let band = reward_curve(&Simulator::uncached(), &tiny(), 2).unwrap();
    band.save(dir.path()).unwrap();

    let median = Array::load(&dir.path().join("rewards_median.npy")).unwrap();
    assert_eq!(median.data(), band.median.as_slice());
    assert!(dir.path().join("epochs.npy").exists());
}

#[test]
fn test_clone_ranks_shapes() {
    let ranks = clone_ranks(&Simulator::uncached(), &tiny(), 3).unwrap();

    assert_eq!(ranks.trajectory.shape(), &[5, 8]);
    assert_eq!(ranks.others.shape(), &[3, 8]);
    assert_eq!(ranks.highlighted.len(), 8);
    assert!(ranks.highlighted.windows(2).all(|w| w[0] >= w[1]));
    for row in ranks.others.rows() {
        assert!(row.windows(2).all(|w| w[0] >= w[1]));
    }
}

#[test]
fn test_sample_repertoire_sums_to_total() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let counts = sample_repertoire(&mut rng, &[1.0, 0.0, 3.0, 2.0], 500).unwrap();
    assert_eq!(counts.iter().sum::<f64>(), 500.0);
    assert!(counts.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn test_sample_repertoire_empty_repertoire_fails() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    assert!(sample_repertoire(&mut rng, &[0.0, 0.0], 10).is_err());
}

#[test]
fn test_pathogen_sweep_labels_and_files() {
    let dir = TempDir::new().unwrap();
    let sim = Simulator::with_store(DirStore::new(dir.path().join("cache")));
    let mut rng = ChaCha8Rng::seed_from_u64(0);

    let samples = pathogen_sweep(&sim, &tiny(), &[1, 4], 100, &mut rng).unwrap();
    let labels: Vec<&str> = samples.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, ["p1", "p4"]);

    let out = dir.path().join("out");
    save_samples(&out, &samples).unwrap();
    let loaded = Array::load(&out.join("sample_p4.npy")).unwrap();
    assert_eq!(loaded.data().iter().sum::<f64>(), 100.0);
}

#[test]
fn test_seed_sweep_reuses_cache() {
    let dir = TempDir::new().unwrap();
    let sim = Simulator::new(dir.path());

    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let first = seed_sweep(&sim, &tiny(), 2, 50, &mut rng).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let second = seed_sweep(&sim, &tiny(), 2, 50, &mut rng).unwrap();

    assert_eq!(first.len(), 2);
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.counts, b.counts);
    }
}

#[test]
fn test_manifest_records_fingerprint() {
    let dir = TempDir::new().unwrap();
    let base = tiny();
    Manifest::new("reward_curve", &base, 3)
        .output("epochs.npy")
        .save(dir.path())
        .unwrap();

    let text = std::fs::read_to_string(dir.path().join("manifest.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["runs"], 3);
    assert_eq!(json["fingerprint"], base.fingerprint().to_string());
    assert_eq!(json["base"]["n_hidden"], 8);
}
