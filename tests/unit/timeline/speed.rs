use super::*;

fn assert_valid(plan: &SpeedPlan) {
    assert!(
        (plan.product() - plan.target_factor).abs() < 1e-6,
        "product {} != target {}",
        plan.product(),
        plan.target_factor
    );
    for &f in &plan.applications {
        assert!((MIN_FILTER_FACTOR..=MAX_FILTER_FACTOR).contains(&f), "{f} out of range");
    }
}

#[test]
fn no_plan_when_under_or_at_ceiling() {
    assert_eq!(plan(30.0, 45.0).unwrap(), None);
    assert_eq!(plan(45.0, 45.0).unwrap(), None);
}

#[test]
fn single_application_when_factor_in_range() {
    let p = plan(60.0, 45.0).unwrap().unwrap();
    assert_eq!(p.applications.len(), 1);
    assert!((p.target_factor - 0.75).abs() < 1e-12);
    assert_valid(&p);
    assert_eq!(p.filter_chain(), format!("atempo={}", 1.0 / 0.75));
}

#[test]
fn chained_applications_when_factor_below_floor() {
    // 45 / 200 = 0.225 -> n = ceil(ln 0.225 / ln 0.5) = 3
    let p = plan(200.0, 45.0).unwrap().unwrap();
    assert_eq!(p.applications.len(), 3);
    assert_valid(&p);
    assert_eq!(p.filter_chain().matches("atempo=").count(), 3);
}

#[test]
fn tempo_rates_speed_playback_up() {
    for actual in [46.0, 60.0, 89.9, 200.0, 3000.0] {
        let p = plan(actual, 45.0).unwrap().unwrap();
        let rates = p.tempo_rates();
        for &rate in &rates {
            assert!((1.0..=2.0).contains(&rate), "{rate} for {actual}");
        }
        // Dividing the duration by every rate lands on the ceiling.
        let after = rates.iter().fold(actual, |secs, rate| secs / rate);
        assert!((after - 45.0).abs() < 1e-6, "{after}");
    }

    let chain = plan(60.0, 45.0).unwrap().unwrap().filter_chain();
    let rate: f64 = chain.strip_prefix("atempo=").unwrap().parse().unwrap();
    assert!(rate > 1.0);
}

#[test]
fn exact_powers_of_half_stay_in_range() {
    for (actual, ceiling) in [(2.0, 1.0), (4.0, 1.0), (8.0, 1.0), (1024.0, 1.0)] {
        let p = plan(actual, ceiling).unwrap().unwrap();
        assert_valid(&p);
    }
}

#[test]
fn sweep_of_ratios_keeps_invariants() {
    let ceiling = 45.0;
    let mut actual = 45.5;
    while actual < 5000.0 {
        let p = plan(actual, ceiling).unwrap().unwrap();
        assert_valid(&p);
        actual *= 1.173;
    }
}

#[test]
fn invalid_inputs_are_rejected() {
    assert!(plan(0.0, 45.0).is_err());
    assert!(plan(10.0, 0.0).is_err());
    assert!(plan(f64::INFINITY, 45.0).is_err());
}

#[test]
fn out_of_range_application_is_reported_not_clamped() {
    let bad = SpeedPlan {
        target_factor: 0.3,
        applications: vec![0.3],
    };
    assert!(matches!(
        bad.check_ranges(),
        Err(ShortsError::SpeedFactorOutOfRange { factor }) if factor == 0.3
    ));
}
