//! Integration tests for the rolling regression engine.

use approx::assert_relative_eq;
use chrono::{Days, NaiveDate};
use hobart_data::{Asset, FactorSeries, Panel};
use hobart_regression::{RegressionError, RollingConfig, RollingRegression};
use rstest::rstest;

fn date(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).unwrap() + Days::new(i as u64)
}

fn sloped_market(n: usize) -> FactorSeries {
    let mut factors = FactorSeries::new(["benchmark_return"]);
    for i in 0..n {
        factors
            .insert(date(i), vec![((i * 37) % 11) as f64 / 100.0 - 0.05])
            .unwrap();
    }
    factors
}

fn tracking_asset(panel: &mut Panel, factors: &FactorSeries, sid: u64, n: usize) {
    for (i, (d, f)) in factors.iter().take(n).enumerate() {
        let noise = if i % 3 == 0 { 0.002 } else { -0.001 };
        panel
            .insert(d, Asset::new(sid, format!("S{sid}")), vec![0.001 + 0.9 * f[0] + noise])
            .unwrap();
    }
}

#[rstest]
#[case(30, 1)]
#[case(29, 0)]
#[case(31, 2)]
#[case(37, 8)]
fn test_window_sufficiency(#[case] observations: usize, #[case] expected: usize) {
    let factors = sloped_market(60);
    let mut panel = Panel::new(["close_return"]);
    tracking_asset(&mut panel, &factors, 1, observations);

    let out = RollingRegression::new(RollingConfig::new(30))
        .run(&panel, "close_return", &factors)
        .unwrap();
    assert_eq!(out.len(), expected);
}

#[test]
fn test_insignificant_fit_is_exactly_zero() {
    // Factor alternates every day and the asset every two days: zero sample covariance
    // in any window whose length is a multiple of four.
    let mut factors = FactorSeries::new(["benchmark_return"]);
    let mut panel = Panel::new(["close_return"]);
    let asset = Asset::new(42, "NOISE");
    for i in 0..24 {
        let f = if i % 2 == 0 { 0.01 } else { -0.01 };
        let r = if (i / 2) % 2 == 0 { 0.02 } else { -0.02 };
        factors.insert(date(i), vec![f]).unwrap();
        panel.insert(date(i), asset.clone(), vec![r]).unwrap();
    }

    let out = RollingRegression::new(RollingConfig::new(8))
        .run(&panel, "close_return", &factors)
        .unwrap();
    assert_eq!(out.len(), 17);
    for (key, row) in out.iter() {
        assert_eq!(row[1], 0.0, "alpha on {}", key.date);
        assert_eq!(row[2], 0.0, "beta on {}", key.date);
        assert_eq!(row[3], row[0]);
    }
}

#[test]
fn test_significant_fit_keeps_coefficients() {
    let factors = sloped_market(80);
    let mut panel = Panel::new(["close_return"]);
    tracking_asset(&mut panel, &factors, 1, 80);

    let out = RollingRegression::new(RollingConfig::new(40))
        .run(&panel, "close_return", &factors)
        .unwrap();
    for (key, row) in out.iter() {
        assert_relative_eq!(row[2], 0.9, epsilon = 0.05);
        let f = factors.get(key.date).unwrap()[0];
        assert_relative_eq!(row[3], row[0] - (row[1] + row[2] * f), epsilon = 1e-12);
    }
}

#[test]
fn test_fit_failure_aborts_batch() {
    // Factor is flat for the first ten days; an asset living only there has a
    // singular design.
    let mut factors = FactorSeries::new(["benchmark_return"]);
    for i in 0..50 {
        let f = if i < 10 {
            0.01
        } else {
            ((i * 37) % 11) as f64 / 100.0 - 0.05
        };
        factors.insert(date(i), vec![f]).unwrap();
    }
    let mut panel = Panel::new(["close_return"]);
    for i in 10..50 {
        panel.insert(date(i), Asset::new(1, "GOOD"), vec![0.01]).unwrap();
    }
    for i in 0..10 {
        panel
            .insert(date(i), Asset::new(2, "BAD"), vec![f64::from(i as u32) / 100.0])
            .unwrap();
    }

    let err = RollingRegression::new(RollingConfig::new(8).with_workers(Some(2)))
        .run(&panel, "close_return", &factors)
        .unwrap_err();
    match err {
        RegressionError::Computation {
            asset,
            observations,
            first_date,
            last_date,
            ..
        } => {
            assert_eq!(asset.symbol, "BAD");
            assert_eq!(observations, 10);
            assert_eq!(first_date, "2015-01-01");
            assert_eq!(last_date, "2015-01-10");
        }
        other => panic!("expected computation failure, got {other}"),
    }
}

#[test]
fn test_multi_factor_columns_and_gate() {
    let mut factors = FactorSeries::new(["mkt", "smb"]);
    let mut panel = Panel::new(["close_return"]);
    let asset = Asset::new(9, "MF");
    for i in 0..60 {
        let mkt = ((i * 37) % 11) as f64 / 100.0 - 0.05;
        let smb = ((i * 13) % 7) as f64 / 200.0 - 0.015;
        let noise = if i % 2 == 0 { 0.0005 } else { -0.0005 };
        factors.insert(date(i), vec![mkt, smb]).unwrap();
        panel
            .insert(date(i), asset.clone(), vec![0.001 + 1.2 * mkt - 0.7 * smb + noise])
            .unwrap();
    }

    let out = RollingRegression::new(RollingConfig::new(30))
        .run(&panel, "close_return", &factors)
        .unwrap();
    assert_eq!(
        out.columns(),
        &["return", "alpha", "beta_mkt", "beta_smb", "residual_return"]
    );
    assert_eq!(out.len(), 31);
    for (key, row) in out.iter() {
        let f = factors.get(key.date).unwrap();
        assert_relative_eq!(row[2], 1.2, epsilon = 0.05);
        assert_relative_eq!(row[3], -0.7, epsilon = 0.1);
        assert_relative_eq!(
            row[4],
            row[0] - (row[1] + row[2] * f[0] + row[3] * f[1]),
            epsilon = 1e-12
        );
    }
}

#[test]
fn test_keys_unique_across_workers() {
    let factors = sloped_market(50);
    let mut panel = Panel::new(["close_return"]);
    for sid in 1..=12 {
        tracking_asset(&mut panel, &factors, sid, 50);
    }

    let out = RollingRegression::new(RollingConfig::new(20).with_workers(Some(4)))
        .run(&panel, "close_return", &factors)
        .unwrap();
    assert_eq!(out.len(), 12 * 31);
    assert_eq!(out.assets().len(), 12);
}

#[test]
fn test_invalid_config_rejected() {
    let result = RollingRegression::new(RollingConfig::new(1)).run(
        &Panel::new(["close_return"]),
        "close_return",
        &sloped_market(3),
    );
    assert!(matches!(result, Err(RegressionError::InvalidConfig(_))));
}
