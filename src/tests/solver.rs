use rstest::*;

use crate::{
    prelude::{
        AmbFixedMap, Candidate, Carrier, Component, Config, ConfigError, DualFrequency, Epoch,
        Error, EstimatorKind, FilterPhase, ModelKey, Observable, Snapshot, SolutionType,
        SourceId, Solver, StochasticModel, VariableCatalog,
    },
    tests::{
        candidate, candidates, epoch, five_satellites, gps, init_logger, source, ZWD_APRIORI_M,
    },
};

#[rstest]
fn phase_transition() {
    init_logger();

    let mut solver = Solver::new(
        EstimatorKind::UncombinedPpp,
        Config::static_preset(),
        source(),
    )
    .unwrap();

    assert_eq!(solver.phase(), FilterPhase::FirstEpoch);
    assert!(solver.snapshot().is_none());

    let pool = five_satellites();

    let solution = solver.resolve(epoch(0.0), ZWD_APRIORI_M, &pool).unwrap();

    assert_eq!(solver.phase(), FilterPhase::SteadyState);
    assert_eq!(solution.seq, 0);
    assert_eq!(solution.kind, EstimatorKind::UncombinedPpp);
    assert_eq!(solution.solution_type, SolutionType::Float);
    assert_eq!(solution.reference, gps(7));
    assert_eq!(solution.satellites.len(), 5);
    assert_eq!(solution.core.len(), 5);
    assert!(solution.rejections.is_empty());
    assert!(solution.clock_offset_m().is_some());
    assert!(solution.zenith_wet_delay_m().is_some());

    for (sv, satellite) in solution.satellites.iter() {
        assert_eq!(satellite.postfit.len(), 4, "{} postfit residuals", sv);
        assert_eq!(satellite.iono_constraint_postfit.is_none(), *sv == gps(7));
        assert_eq!(satellite.statistics.float, 2);
        assert_eq!(satellite.statistics.fixed, 0);
        assert!(satellite.ambiguity_l1.sigma > 0.0);
        assert!(
            (satellite.widelane_cycles
                - (satellite.ambiguity_l1.value - satellite.ambiguity_l2.value))
                .abs()
                < 1.0E-9
        );
    }

    let snapshot = solver.snapshot().unwrap();
    assert_eq!(snapshot.len(), 5 + 3 * 5);
    assert_eq!(snapshot.epoch(), epoch(0.0));

    // steady state is permanent
    let solution = solver.resolve(epoch(30.0), ZWD_APRIORI_M, &pool).unwrap();

    assert_eq!(solution.seq, 1);
    assert_eq!(solver.phase(), FilterPhase::SteadyState);
}

#[rstest]
fn insufficient_geometry_preserves_state() {
    init_logger();

    let mut solver = Solver::new(
        EstimatorKind::UncombinedPpp,
        Config::static_preset(),
        source(),
    )
    .unwrap();

    solver
        .resolve(epoch(0.0), ZWD_APRIORI_M, &five_satellites())
        .unwrap();

    let before = solver.snapshot().cloned().unwrap();

    let pool = candidates(&[(5, 45.0), (7, 70.0), (13, 30.0)]);
    let error = solver.resolve(epoch(30.0), ZWD_APRIORI_M, &pool).unwrap_err();

    assert_eq!(
        error,
        Error::Epoch {
            kind: EstimatorKind::UncombinedPpp,
            seq: 1,
            component: Component::EquationAssembler,
            source: Box::new(Error::InsufficientGeometry {
                required: 4,
                found: 3
            }),
        }
    );

    assert_eq!(solver.snapshot(), Some(&before));
    assert_eq!(solver.phase(), FilterPhase::SteadyState);

    // next epoch proceeds from the preserved state
    let solution = solver
        .resolve(epoch(60.0), ZWD_APRIORI_M, &five_satellites())
        .unwrap();

    assert_eq!(solution.seq, 2);
}

#[rstest]
fn first_epoch_failure() {
    let mut solver = Solver::new(
        EstimatorKind::UncombinedPpp,
        Config::static_preset(),
        source(),
    )
    .unwrap();

    let pool = candidates(&[(5, 45.0), (7, 70.0)]);
    assert!(solver.resolve(epoch(0.0), ZWD_APRIORI_M, &pool).is_err());

    assert_eq!(solver.phase(), FilterPhase::FirstEpoch);
    assert!(solver.snapshot().is_none());
}

#[rstest]
fn epochs_must_be_chronological() {
    init_logger();

    let mut solver = Solver::new(
        EstimatorKind::UncombinedPpp,
        Config::static_preset(),
        source(),
    )
    .unwrap();

    solver
        .resolve(epoch(30.0), ZWD_APRIORI_M, &five_satellites())
        .unwrap();

    let error = solver
        .resolve(epoch(0.0), ZWD_APRIORI_M, &five_satellites())
        .unwrap_err();

    assert_eq!(error.root(), &Error::TimeUnderflow);

    match error {
        Error::Epoch { component, .. } => {
            assert_eq!(component, Component::StateCarryForward);
        },
        other => panic!("missing context: {}", other),
    }
}

#[rstest]
fn rising_and_setting_satellites() {
    init_logger();

    let cfg = Config::static_preset();
    let catalog = VariableCatalog::new(&cfg, source());

    let mut solver = Solver::new(EstimatorKind::UncombinedPpp, cfg, source()).unwrap();

    solver
        .resolve(epoch(0.0), ZWD_APRIORI_M, &five_satellites())
        .unwrap();

    // G30 rises
    let mut pool = five_satellites();
    pool.push(candidate(30, 8.0));

    let solution = solver.resolve(epoch(30.0), ZWD_APRIORI_M, &pool).unwrap();

    assert_eq!(solution.satellites.len(), 6);
    assert_eq!(solver.snapshot().unwrap().len(), 5 + 3 * 6);

    let iono = catalog.satellite_variable(Observable::Ionosphere, gps(30));
    assert!(solver.snapshot().unwrap().mean(&iono).is_some());

    // G13 and G27 set
    let pool = candidates(&[(5, 45.0), (7, 70.0), (20, 55.0), (30, 12.0)]);

    let solution = solver.resolve(epoch(60.0), ZWD_APRIORI_M, &pool).unwrap();

    assert_eq!(solution.satellites.len(), 4);
    assert_eq!(solver.snapshot().unwrap().len(), 5 + 3 * 4);

    for observable in VariableCatalog::SATELLITE_OBSERVABLES {
        let variable = catalog.satellite_variable(observable, gps(13));
        assert!(solver.snapshot().unwrap().mean(&variable).is_none());
    }
}

#[rstest]
fn ambiguity_resolution() {
    init_logger();

    let cfg = Config::static_preset();
    let catalog = VariableCatalog::new(&cfg, source());

    let bl1 = catalog.satellite_variable(Observable::AmbiguityL1, gps(7));
    let fixed = bl1.clone();

    let resolver = move |_: Epoch, predicted: &Snapshot, _: &[Candidate]| {
        let mut fixes = AmbFixedMap::default();
        if let Some(mean) = predicted.mean(&fixed) {
            fixes.insert(fixed.clone(), mean.round()).unwrap();
        }
        fixes
    };

    let mut solver = Solver::new(EstimatorKind::PppAr, cfg, source())
        .unwrap()
        .with_resolver(resolver);

    let pool = five_satellites();

    for i in 0..3 {
        let solution = solver
            .resolve(epoch(30.0 * i as f64), ZWD_APRIORI_M, &pool)
            .unwrap();

        assert_eq!(solution.solution_type, SolutionType::Fixed);
        assert_eq!(solution.kind, EstimatorKind::PppAr);
        assert_eq!(solution.fixed_postfit.len(), 1);
        assert!(solution.fixed_postfit.contains_key(&bl1));

        let g07 = &solution.satellites[&gps(7)];
        assert!(g07.fixed_l1);
        assert!(!g07.fixed_l2);
        assert_eq!(g07.statistics.fixed, 1);
        assert_eq!(g07.statistics.rate(), 0.5);

        assert_eq!(solution.statistics.float, 10);
        assert_eq!(solution.statistics.fixed, 1);
    }

    let g07 = solver.statistics()[&gps(7)];
    assert_eq!((g07.float, g07.fixed), (6, 3));

    let g05 = solver.statistics()[&gps(5)];
    assert_eq!((g05.float, g05.fixed), (6, 0));

    let total = solver.total_statistics();
    assert_eq!((total.float, total.fixed), (30, 3));
}

#[rstest]
#[case(false)]
#[case(true)]
fn no_fixable_ambiguity_policy(#[case] required: bool) {
    init_logger();

    let mut cfg = Config::static_preset();
    cfg.require_fixed_ambiguities = required;

    let mut solver = Solver::new(EstimatorKind::PppAr, cfg, SourceId::from("ROVR")).unwrap();

    let result = solver.resolve(epoch(0.0), ZWD_APRIORI_M, &five_satellites());

    if required {
        let error = result.unwrap_err();

        assert_eq!(error.root(), &Error::NoFixableAmbiguity);
        assert_eq!(
            error.to_string(),
            "ppp-ar epoch #0 (ambiguity-constraint-injector): no fixable ambiguity"
        );

        assert!(solver.snapshot().is_none());
        assert_eq!(solver.phase(), FilterPhase::FirstEpoch);
    } else {
        let solution = result.unwrap();

        assert_eq!(solution.solution_type, SolutionType::Float);
        assert_eq!(solution.statistics.fixed, 0);
        assert_eq!(solver.phase(), FilterPhase::SteadyState);
    }
}

#[rstest]
fn cycle_slip_resets_ambiguities() {
    init_logger();

    let cfg = Config::static_preset();
    let catalog = VariableCatalog::new(&cfg, source());

    let mut nominal = Solver::new(EstimatorKind::UncombinedPpp, cfg.clone(), source()).unwrap();
    let mut slipped = Solver::new(EstimatorKind::UncombinedPpp, cfg, source()).unwrap();

    for i in 0..4 {
        let t = epoch(30.0 * i as f64);
        nominal.resolve(t, ZWD_APRIORI_M, &five_satellites()).unwrap();
        slipped.resolve(t, ZWD_APRIORI_M, &five_satellites()).unwrap();
    }

    let mut pool = five_satellites();
    pool[2] = pool[2].with_cycle_slip(true);
    assert_eq!(pool[2].sv, gps(13));

    let t = epoch(120.0);
    let nominal_solution = nominal.resolve(t, ZWD_APRIORI_M, &five_satellites()).unwrap();
    let slipped_solution = slipped.resolve(t, ZWD_APRIORI_M, &pool).unwrap();

    let bl1 = catalog.satellite_variable(Observable::AmbiguityL1, gps(13));

    let nominal_var = nominal.snapshot().unwrap().variance(&bl1).unwrap();
    let slipped_var = slipped.snapshot().unwrap().variance(&bl1).unwrap();

    assert!(
        slipped_var > nominal_var,
        "reset ambiguity should be less certain ({} <= {})",
        slipped_var,
        nominal_var
    );

    assert!(
        slipped_solution.satellites[&gps(13)].ambiguity_l1.sigma
            > nominal_solution.satellites[&gps(13)].ambiguity_l1.sigma
    );
}

#[rstest]
fn reset_returns_to_first_epoch() {
    let mut solver = Solver::new(
        EstimatorKind::UncombinedPpp,
        Config::static_preset(),
        source(),
    )
    .unwrap();

    solver
        .resolve(epoch(0.0), ZWD_APRIORI_M, &five_satellites())
        .unwrap();

    solver.reset();

    assert_eq!(solver.phase(), FilterPhase::FirstEpoch);
    assert!(solver.snapshot().is_none());
    assert!(solver.statistics().is_empty());

    // time may restart after a reset
    assert!(solver
        .resolve(epoch(-30.0), ZWD_APRIORI_M, &five_satellites())
        .is_ok());
}

#[rstest]
#[case(f64::NAN)]
#[case(f64::INFINITY)]
#[case(f64::NEG_INFINITY)]
fn non_finite_troposphere_preserves_state(#[case] zwd_apriori_m: f64) {
    init_logger();

    let mut solver = Solver::new(
        EstimatorKind::UncombinedPpp,
        Config::static_preset(),
        source(),
    )
    .unwrap();

    solver
        .resolve(epoch(0.0), ZWD_APRIORI_M, &five_satellites())
        .unwrap();

    let before = solver.snapshot().cloned().unwrap();

    let error = solver
        .resolve(epoch(30.0), zwd_apriori_m, &five_satellites())
        .unwrap_err();

    assert_eq!(
        error,
        Error::Epoch {
            kind: EstimatorKind::UncombinedPpp,
            seq: 1,
            component: Component::EquationAssembler,
            source: Box::new(Error::NonFinite("zenith wet delay a-priori")),
        }
    );

    assert_eq!(solver.snapshot(), Some(&before));

    // the following epoch is not affected
    solver
        .resolve(epoch(60.0), ZWD_APRIORI_M, &five_satellites())
        .unwrap();

    let snapshot = solver.snapshot().unwrap();

    assert!(snapshot.state().iter().all(|v| v.is_finite()));
    assert!(snapshot.covariance_matrix().iter().all(|v| v.is_finite()));
}

#[rstest]
fn identical_carriers() {
    let cfg = Config::static_preset().with_carriers(DualFrequency {
        lhs: Carrier::L5,
        rhs: Carrier::E5A,
    });

    let result = Solver::new(EstimatorKind::UncombinedPpp, cfg, source());

    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::IdenticalCarriers))
    ));
}

#[rstest]
fn singular_prediction_preserves_state() {
    init_logger();

    let cfg = Config::static_preset();
    let catalog = VariableCatalog::new(&cfg, source());

    let mut solver = Solver::new(EstimatorKind::UncombinedPpp, cfg, source()).unwrap();

    solver
        .resolve(epoch(0.0), ZWD_APRIORI_M, &five_satellites())
        .unwrap();

    let before = solver.snapshot().cloned().unwrap();

    // applies to the clock unknown carried from the previous epoch:
    // its predicted variance is now null
    let mut solver = solver.with_stochastic_model(
        ModelKey::Observable(Observable::ClockOffset),
        StochasticModel::WhiteNoise { sigma: 0.0 },
    );

    let error = solver
        .resolve(epoch(30.0), ZWD_APRIORI_M, &five_satellites())
        .unwrap_err();

    assert_eq!(
        error,
        Error::Epoch {
            kind: EstimatorKind::UncombinedPpp,
            seq: 1,
            component: Component::KalmanCore,
            source: Box::new(Error::SingularSystem("predicted covariance")),
        }
    );

    assert_eq!(solver.snapshot(), Some(&before));
    assert_eq!(solver.phase(), FilterPhase::SteadyState);

    let clock = catalog.core_variable(Observable::ClockOffset);
    assert!(solver.snapshot().unwrap().variance(&clock).unwrap() > 0.0);
}

#[cfg(feature = "serde")]
#[rstest]
fn solutions_to_json() {
    let cfg = Config::static_preset();
    let catalog = VariableCatalog::new(&cfg, source());

    let bl2 = catalog.satellite_variable(Observable::AmbiguityL2, gps(20));

    let resolver = move |_: Epoch, _: &Snapshot, _: &[Candidate]| {
        let mut fixes = AmbFixedMap::default();
        fixes.insert(bl2.clone(), 3.0).unwrap();
        fixes
    };

    let mut float = Solver::new(EstimatorKind::UncombinedPpp, cfg.clone(), source()).unwrap();

    let mut fixed = Solver::new(EstimatorKind::PppAr, cfg, source())
        .unwrap()
        .with_resolver(resolver);

    for result in [
        float.resolve(epoch(0.0), ZWD_APRIORI_M, &five_satellites()),
        fixed.resolve(epoch(0.0), ZWD_APRIORI_M, &five_satellites()),
    ] {
        let solution = result.unwrap();
        let content = serde_json::to_string(&solution).unwrap();

        let value: serde_json::Value = serde_json::from_str(&content).unwrap();

        let satellites = value["satellites"].as_array().unwrap();
        assert_eq!(satellites.len(), 5);

        let fixed_postfit = value["fixed_postfit"].as_array().unwrap();
        assert_eq!(fixed_postfit.len(), solution.fixed_postfit.len());
    }
}
