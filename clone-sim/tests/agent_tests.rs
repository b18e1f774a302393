use clone_sim::agent::Agent;
use clone_sim::array::Array;
use clone_sim::constants::INITIAL_CLONE_SIZE;
use clone_sim::error::SimError;
use clone_sim::utils::random_bits;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn agent(seed: u64, n_hidden: usize, dim_state: usize, dim_action: usize) -> (Agent, ChaCha8Rng) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let agent = Agent::new(&mut rng, n_hidden, dim_state, dim_action).unwrap();
    (agent, rng)
}

#[test]
fn test_agent_shapes() {
    let (agent, _) = agent(0, 50, 12, 4);
    assert_eq!(agent.n().len(), 50);
    assert_eq!(agent.w().shape(), &[50, 12]);
    assert_eq!(agent.u().shape(), &[4, 50]);
}

#[test]
fn test_clone_sizes_start_at_one() {
    let (agent, _) = agent(0, 50, 12, 4);
    assert!(agent.n().iter().all(|&n| n == INITIAL_CLONE_SIZE));
}

#[test]
fn test_zero_dimensions_rejected() {
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    assert!(matches!(
        Agent::new(&mut rng, 0, 4, 2),
        Err(SimError::InvalidConfig(_))
    ));
    assert!(Agent::new(&mut rng, 4, 0, 2).is_err());
    assert!(Agent::new(&mut rng, 4, 2, 0).is_err());
}

#[test]
fn test_play_returns_action_width() {
    let (mut agent, mut rng) = agent(1, 30, 8, 5);
    let state = random_bits(&mut rng, 8);
    assert_eq!(agent.play(&mut rng, &state, 1.0).len(), 5);
}

#[test]
fn test_play_is_reproducible_from_seed() {
    let (mut a, mut rng_a) = agent(2, 30, 8, 5);
    let (mut b, mut rng_b) = agent(2, 30, 8, 5);
    let state = vec![true, false, true, true, false, false, true, false];
    for _ in 0..20 {
        assert_eq!(a.play(&mut rng_a, &state, 3.0), b.play(&mut rng_b, &state, 3.0));
    }
}

#[test]
fn test_learn_without_play_fails() {
    let (mut agent, _) = agent(3, 10, 4, 2);
    let result = agent.learn(&[true; 4], &[true, false], 1.0, 0.1);
    assert!(matches!(result, Err(SimError::LearnWithoutPlay)));
}

#[test]
fn test_empty_action_leaves_clones_unchanged() {
    // No action bit set: nothing is back-projected, so no clone moves.
    let (mut agent, mut rng) = agent(4, 40, 6, 3);
    let state = random_bits(&mut rng, 6);
    agent.play(&mut rng, &state, 1.0);
    let before = agent.n().to_vec();
    agent.learn(&state, &[false, false, false], 5.0, 0.1).unwrap();
    assert_eq!(agent.n(), before.as_slice());
}

#[test]
fn test_positive_error_grows_clones_aligned_with_action() {
    let (mut agent, mut rng) = agent(5, 40, 6, 2);
    let state = random_bits(&mut rng, 6);
    agent.play(&mut rng, &state, 1.0);

    let action = [true, true];
    let u = agent.u().clone();
    let back: Vec<f64> = (0..40)
        .map(|j| u.row(0).unwrap()[j] + u.row(1).unwrap()[j])
        .collect();

    agent.learn(&state, &action, 1000.0, 0.0001).unwrap();
    for (j, &n) in agent.n().iter().enumerate() {
        if back[j] > 0.0 {
            assert!(n > 1.0, "clone {} should expand (back={}, n={})", j, back[j], n);
        } else if back[j] < 0.0 {
            assert!(n < 1.0, "clone {} should contract (back={}, n={})", j, back[j], n);
        }
    }
}

#[test]
fn test_clone_sizes_never_negative() {
    let (mut agent, mut rng) = agent(6, 60, 10, 4);
    for _ in 0..500 {
        let state = random_bits(&mut rng, 10);
        let action = agent.play(&mut rng, &state, 5.0);
        let reward = rng.gen_range(-50.0..50.0);
        agent.learn(&state, &action, reward, 1.0).unwrap();
        assert!(agent.n().iter().all(|&n| n >= 0.0));
    }
}

#[test]
fn test_from_parts_checks_shapes() {
    let w = Array::matrix(3, 2, vec![0.0; 6]).unwrap();
    let u = Array::matrix(4, 3, vec![0.0; 12]).unwrap();
    let agent = Agent::from_parts(vec![1.0; 3], w.clone(), u.clone()).unwrap();
    assert_eq!(agent.dim_state, 2);
    assert_eq!(agent.dim_action, 4);
    assert!(Agent::from_parts(vec![1.0; 5], w, u).is_err());
}

#[test]
fn test_save_writes_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let (agent, _) = agent(7, 20, 5, 3);
    agent.save(dir.path()).unwrap();

    let n = Array::load(&dir.path().join("agent_n.npy")).unwrap();
    let w = Array::load(&dir.path().join("agent_w.npy")).unwrap();
    let u = Array::load(&dir.path().join("agent_u.npy")).unwrap();
    assert_eq!(n.data(), agent.n());
    assert_eq!(&w, agent.w());
    assert_eq!(&u, agent.u());
}
