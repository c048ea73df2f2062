//! End-to-end front propagation scenarios
//!
//! Each test drives a full simulation on a small channel and checks the
//! front diagnostics it leaves behind.

use stefan_sim_core::{
    FieldData, InitialCondition, MemorySink, Params, Perturbation, Simulation, StepOutcome,
    StopReason, TravellingWaveProfile,
};
use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// 10 x 2 channel at h = 0.2 with the front starting at x = 4
fn channel_params() -> Params {
    Params {
        domain_length: 10.0,
        domain_width: 2.0,
        nx: 51,
        ny: 11,
        initial_offset: 4.0,
        background_density: 0.1,
        dt: 0.01,
        steps: 30,
        ..Params::default()
    }
}

fn positions(sim: &Simulation) -> Vec<f64> {
    sim.diagnostics()
        .samples()
        .iter()
        .map(|s| s.position)
        .collect()
}

#[test]
fn test_front_advances_monotonically_without_reaction() {
    let params = Params {
        reaction_rate: 0.0,
        surface_tension: 0.0,
        inverse_stefan: 1.0,
        ..channel_params()
    };
    let mut sim = Simulation::new(params, &InitialCondition::Step, &Perturbation::None).unwrap();
    let report = sim.run(&mut MemorySink::default(), 0);
    assert_eq!(report.stop_reason, StopReason::Completed);

    let front = positions(&sim);
    assert_eq!(front.len(), 31);
    for pair in front.windows(2) {
        assert!(
            pair[1] >= pair[0] - 1e-9,
            "front moved backwards: {} -> {}",
            pair[0],
            pair[1]
        );
    }
    assert!(front[30] > front[0] + 0.05, "front barely moved: {front:?}");
}

#[test]
fn test_unperturbed_front_stays_exactly_flat() {
    let params = Params {
        perturbation_amplitude: 0.0,
        perturbation_wavenumber: std::f64::consts::PI / 2.0,
        ..channel_params()
    };
    let perturbation = Perturbation::from_params(&params);
    let mut sim = Simulation::new(params, &InitialCondition::Step, &perturbation).unwrap();
    let report = sim.run(&mut MemorySink::default(), 10);
    assert_eq!(report.stop_reason, StopReason::Completed);

    let samples = sim.diagnostics().samples();
    assert_eq!(samples.len(), 31);
    for sample in samples {
        assert_eq!(sample.amplitude, 0.0, "row asymmetry at step {}", sample.step);
    }
}

#[test]
fn test_larger_inverse_stefan_moves_front_further() {
    let profile = TravellingWaveProfile::from_pairs(&[(-3.0, 1.0), (0.0, 0.4)]).unwrap();
    let initial = InitialCondition::Profile(profile);

    let final_position = |inverse_stefan: f64| {
        let params = Params {
            inverse_stefan,
            ..channel_params()
        };
        let mut sim = Simulation::new(params, &initial, &Perturbation::None).unwrap();
        let report = sim.run(&mut MemorySink::default(), 0);
        assert_eq!(report.stop_reason, StopReason::Completed);
        let front = positions(&sim);
        (front[0], front[front.len() - 1])
    };

    let (start_slow, end_slow) = final_position(0.5);
    let (start_fast, end_fast) = final_position(2.0);
    assert_eq!(start_slow, start_fast);
    assert!(end_slow > start_slow);
    assert!(
        end_fast - start_fast > end_slow - start_slow,
        "fast front {end_fast} did not outrun slow front {end_slow}"
    );
}

#[test]
fn test_density_stays_within_bounds() {
    let params = Params {
        steps: 40,
        ..channel_params()
    };
    let uf = params.background_density;
    let mut sim = Simulation::new(params, &InitialCondition::Step, &Perturbation::None).unwrap();
    for _ in 0..40 {
        let outcome = sim.step().unwrap();
        assert!(matches!(outcome, StepOutcome::Advanced(_)));
        let state = sim.state();
        for (u, phi) in state
            .density
            .as_slice()
            .iter()
            .zip(state.level_set.as_slice())
        {
            if *phi < 0.0 {
                assert!(
                    (uf - 1e-9..=1.0 + 1e-9).contains(u),
                    "density {u} out of range at step {}",
                    state.step
                );
            }
        }
    }
}

#[test]
fn test_empty_region_stops_immediately() {
    let params = channel_params();
    let density = FieldData::with_value(params.nx, params.ny, params.background_density);
    let level_set = FieldData::with_value(params.nx, params.ny, 1.0);
    let mut sim = Simulation::from_fields(params, density.clone(), level_set.clone()).unwrap();

    assert_eq!(sim.step().unwrap(), StepOutcome::Exhausted);

    let mut sink = MemorySink::default();
    let report = sim.run(&mut sink, 1);
    assert_eq!(report.stop_reason, StopReason::DomainExhausted);
    assert_eq!(report.steps, 0);
    assert_eq!(report.snapshots, 0);
    assert!(sink.snapshots.is_empty());
    assert_eq!(sim.state().density, density);
    assert_eq!(sim.state().level_set, level_set);
    assert!(sim.diagnostics().samples().is_empty());
}

#[test]
fn test_non_finite_density_is_reported() {
    let params = channel_params();
    let grid = params.grid().unwrap();
    let (mut density, level_set) =
        InitialCondition::Step.build(&grid, &params, &Perturbation::None);
    density.set(10, 5, f64::NAN);
    let mut sim = Simulation::from_fields(params, density, level_set).unwrap();

    let report = sim.run(&mut MemorySink::default(), 1);
    assert!(matches!(report.stop_reason, StopReason::Failed(_)));
    assert_eq!(report.steps, 0);
}

#[test]
fn test_run_can_be_resumed() {
    let params = Params {
        steps: 4,
        ..channel_params()
    };
    let mut sim = Simulation::new(params, &InitialCondition::Step, &Perturbation::None).unwrap();
    let mut sink = MemorySink::default();
    sim.run(&mut sink, 0);
    assert_eq!(sim.state().step, 4);
    assert_eq!(sink.snapshots.len(), 1);

    // Already complete: nothing more to do
    let report = sim.run(&mut sink, 0);
    assert_eq!(report.stop_reason, StopReason::Completed);
    assert_eq!(report.snapshots, 0);
    assert_eq!(sink.snapshots.len(), 1);
}
