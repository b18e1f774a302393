use clone_sim::error::SimError;
use clone_sim::mdp::{BinaryMdp, Environment, Infection, Mdp, MdpKind, SelfNonselfMdp};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn complement(bits: &[bool]) -> Vec<bool> {
    bits.iter().map(|b| !b).collect()
}

// ----------------------------------------------------------------------------
// MdpKind
// ----------------------------------------------------------------------------

#[test]
fn test_mdp_kind_parses_known_names() {
    assert_eq!("binary".parse::<MdpKind>().unwrap(), MdpKind::Binary);
    assert_eq!("self_nonself".parse::<MdpKind>().unwrap(), MdpKind::SelfNonself);
}

#[test]
fn test_mdp_kind_rejects_unknown_name() {
    match "SelfNonself".parse::<MdpKind>() {
        Err(SimError::UnknownMdp(name)) => assert_eq!(name, "SelfNonself"),
        other => panic!("expected UnknownMdp, got {:?}", other),
    }
}

#[test]
fn test_environment_builds_requested_variant() {
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let env = Environment::new(&mut rng, MdpKind::SelfNonself, 5, 8, 4, 0.5).unwrap();
    assert_eq!(env.kind(), MdpKind::SelfNonself);
    let env = Environment::new(&mut rng, MdpKind::Binary, 5, 8, 4, 0.5).unwrap();
    assert_eq!(env.kind(), MdpKind::Binary);
}

// ----------------------------------------------------------------------------
// BinaryMdp
// ----------------------------------------------------------------------------

#[test]
fn test_binary_tables_have_configured_shape() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mdp = BinaryMdp::new(&mut rng, 7, 12, 5).unwrap();
    let (states, actions) = mdp.tables().unwrap();
    assert_eq!(states.shape(), &[7, 12]);
    assert_eq!(actions.shape(), &[7, 5]);
    assert!(states.data().iter().all(|&v| v == 0.0 || v == 1.0));
}

#[test]
fn test_binary_optimal_reward_is_action_width() {
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let mut mdp = BinaryMdp::new(&mut rng, 7, 12, 5).unwrap();
    mdp.initial_state(&mut rng);
    assert_eq!(mdp.optimal_reward(), 5);
    let best = mdp.optimal_action().to_vec();
    assert_eq!(mdp.reward(&best), 5);
    assert_eq!(mdp.reward(&complement(&best)), 0);
}

#[test]
fn test_binary_states_come_from_key_table() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut mdp = BinaryMdp::new(&mut rng, 6, 10, 4).unwrap();
    let state = mdp.initial_state(&mut rng);
    assert_eq!(state, mdp.key_states()[mdp.current_index()]);

    for i in 0..200 {
        let action: Vec<bool> = (0..4).map(|b| (i >> b) & 1 == 1).collect();
        let state = mdp.next_state(&mut rng, &action);
        assert!(mdp.current_index() < 6);
        assert_eq!(state, mdp.key_states()[mdp.current_index()]);
    }
}

#[test]
fn test_binary_never_routes_to_state_the_action_already_serves() {
    // A key whose optimal action is all ones cannot be weak against any action,
    // so it is only reachable through the index-0 fallback.
    let mut rng = ChaCha8Rng::seed_from_u64(4);
    let mut mdp = BinaryMdp::new(&mut rng, 8, 6, 3).unwrap();
    let served: Vec<usize> = mdp
        .key_actions()
        .iter()
        .enumerate()
        .filter(|(i, a)| *i > 0 && a.iter().all(|&b| b))
        .map(|(i, _)| i)
        .collect();

    for _ in 0..500 {
        mdp.next_state(&mut rng, &[true, true, true]);
        assert!(!served.contains(&mdp.current_index()));
    }
}

#[test]
fn test_binary_empty_action_still_transitions() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let mut mdp = BinaryMdp::new(&mut rng, 4, 6, 3).unwrap();
    for _ in 0..100 {
        let state = mdp.next_state(&mut rng, &[false, false, false]);
        assert_eq!(state.len(), 6);
        assert!(mdp.current_index() < 4);
    }
}

#[test]
fn test_binary_rejects_zero_key_states() {
    let mut rng = ChaCha8Rng::seed_from_u64(6);
    assert!(BinaryMdp::new(&mut rng, 0, 6, 3).is_err());
}

#[test]
fn test_binary_save_writes_tables() {
    let dir = tempfile::tempdir().unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mdp = BinaryMdp::new(&mut rng, 3, 4, 2).unwrap();
    mdp.save(dir.path()).unwrap();
    assert!(dir.path().join("mdp_key_states.npy").is_file());
    assert!(dir.path().join("mdp_key_actions.npy").is_file());
}

// ----------------------------------------------------------------------------
// SelfNonselfMdp
// ----------------------------------------------------------------------------

#[test]
fn test_self_nonself_starts_healthy() {
    let mut rng = ChaCha8Rng::seed_from_u64(10);
    let mut mdp = SelfNonselfMdp::new(&mut rng, 4, 8, 5, 0.5).unwrap();
    assert_eq!(mdp.condition(), Infection::Healthy);
    let state = mdp.initial_state(&mut rng);
    let (states, _) = mdp.tables().unwrap();
    let healthy: Vec<bool> = states.row(0).unwrap().iter().map(|&v| v == 1.0).collect();
    assert_eq!(state, healthy);
}

#[test]
fn test_self_nonself_tables_put_healthy_first() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let mdp = SelfNonselfMdp::new(&mut rng, 4, 8, 5, 0.5).unwrap();
    let (states, actions) = mdp.tables().unwrap();
    assert_eq!(states.shape(), &[5, 8]);
    assert_eq!(actions.shape(), &[5, 5]);
}

#[test]
fn test_zero_infection_rate_stays_healthy() {
    let mut rng = ChaCha8Rng::seed_from_u64(12);
    let mut mdp = SelfNonselfMdp::new(&mut rng, 4, 8, 5, 0.0).unwrap();
    for _ in 0..200 {
        mdp.next_state(&mut rng, &[true; 5]);
        assert_eq!(mdp.condition(), Infection::Healthy);
    }
}

#[test]
fn test_certain_infection_picks_valid_pathogen() {
    let mut rng = ChaCha8Rng::seed_from_u64(13);
    let mut mdp = SelfNonselfMdp::new(&mut rng, 4, 8, 5, 1.0).unwrap();
    mdp.next_state(&mut rng, &[true; 5]);
    match mdp.condition() {
        Infection::Infected { pathogen } => assert!(pathogen < 4),
        Infection::Healthy => panic!("infection_rate 1.0 must infect"),
    }
}

#[test]
fn test_matching_action_clears_infection() {
    let mut rng = ChaCha8Rng::seed_from_u64(14);
    let mut mdp = SelfNonselfMdp::new(&mut rng, 4, 8, 5, 1.0).unwrap();
    for _ in 0..50 {
        mdp.next_state(&mut rng, &[true; 5]);
        if mdp.condition() == Infection::Healthy {
            continue;
        }
        let cure = mdp.optimal_action().to_vec();
        assert_eq!(mdp.reward(&cure), 5);
        mdp.next_state(&mut rng, &cure);
        assert_eq!(mdp.condition(), Infection::Healthy);
    }
}

#[test]
fn test_opposite_action_keeps_same_pathogen() {
    let mut rng = ChaCha8Rng::seed_from_u64(15);
    let mut mdp = SelfNonselfMdp::new(&mut rng, 4, 8, 5, 1.0).unwrap();
    mdp.next_state(&mut rng, &[true; 5]);
    let infected = mdp.condition();
    assert_ne!(infected, Infection::Healthy);

    let useless = complement(mdp.optimal_action());
    assert_eq!(mdp.reward(&useless), 0);
    for _ in 0..50 {
        mdp.next_state(&mut rng, &useless);
        assert_eq!(mdp.condition(), infected);
    }
}

#[test]
fn test_self_nonself_rejects_bad_infection_rate() {
    let mut rng = ChaCha8Rng::seed_from_u64(16);
    assert!(SelfNonselfMdp::new(&mut rng, 4, 8, 5, 1.5).is_err());
    assert!(SelfNonselfMdp::new(&mut rng, 4, 8, 5, -0.1).is_err());
}
