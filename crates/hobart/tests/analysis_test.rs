//! End-to-end analysis from CSV files to allocations.

use approx::assert_relative_eq;
use chrono::{Days, NaiveDate};
use hobart::data::{AssetCode, IndexSeries, PanelCache, PricePanel};
use hobart::optimize::{Objective, OptimizeError};
use hobart::risk::{RiskError, ScalingBasis, UndefinedKind};
use hobart::{AnalysisConfig, AnalysisError, analyze, load_prices};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const CODES: [&str; 4] = ["BHP", "CBA", "CSL", "WES"];

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
}

fn synthetic_market(days: usize) -> (PricePanel, IndexSeries) {
    let mut rng = StdRng::seed_from_u64(42);
    let mut panel = PricePanel::new();
    let mut index = IndexSeries::new("XJO");
    let mut level = 7000.0;
    let mut prices = [45.0, 110.0, 290.0, 55.0];

    for d in 0..days {
        let date = start() + Days::new(d as u64);
        let market: f64 = rng.gen_range(-0.01..0.011);
        level *= 1.0 + market;
        index.insert(date, Some(level)).unwrap();
        for (j, code) in CODES.iter().enumerate() {
            let idio: f64 = rng.gen_range(-0.01..0.01);
            prices[j] *= 1.0 + (0.5 + 0.25 * j as f64) * market + idio;
            panel
                .insert(AssetCode::new(code).unwrap(), date, Some(prices[j]))
                .unwrap();
        }
    }
    (panel, index)
}

fn codes() -> Vec<AssetCode> {
    CODES.iter().map(|c| AssetCode::new(c).unwrap()).collect()
}

#[test]
fn test_full_pipeline() {
    let (panel, index) = synthetic_market(300);
    let config = AnalysisConfig::default();

    let analysis = analyze(&panel, Some(&index), &codes(), &config).unwrap();

    assert_eq!(analysis.returns.n_observations(), 251);
    assert_eq!(analysis.statistics.multiplier, 252.0);
    assert_eq!(analysis.index_name.as_deref(), Some("XJO"));
    assert!(analysis.statistics.assets.iter().all(|s| s.beta.is_some()));
    assert_eq!(analysis.covariance.dim(), 4);
    for i in 0..4 {
        assert_relative_eq!(analysis.correlation[[i, i]], 1.0, epsilon = 1e-12);
    }

    let min_risk = analysis.allocations.min_risk.as_ref().unwrap();
    let max_return = analysis.allocations.max_return.as_ref().unwrap();
    assert_relative_eq!(min_risk.weights.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    assert!(min_risk.volatility <= analysis.equal_weight.volatility + 1e-6);
    assert!(max_return.expected_return >= analysis.equal_weight.expected_return - 1e-9);
    assert_eq!(analysis.equal_weight.weights, vec![0.25; 4]);
}

#[test]
fn test_window_basis_and_cap() {
    let (panel, _) = synthetic_market(120);
    let config = AnalysisConfig::from_toml(
        r#"
        [returns]
        window = 61

        [statistics]
        basis = "window"

        [optimizer]
        upper_bound = 0.3
        "#,
    )
    .unwrap();
    assert_eq!(config.statistics.basis, ScalingBasis::Window);

    let analysis = analyze(&panel, None, &codes(), &config).unwrap();
    assert_eq!(analysis.statistics.multiplier, 60.0);
    assert!(analysis.index_name.is_none());
    assert!(analysis.statistics.assets.iter().all(|s| s.beta.is_none()));

    for allocation in analysis.allocations.successes() {
        assert!(allocation.weights.iter().all(|w| *w <= 0.3 + 1e-6));
        assert_relative_eq!(allocation.weights.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    }
}

#[test]
fn test_infeasible_cap_aborts() {
    let (panel, _) = synthetic_market(40);
    let mut config = AnalysisConfig::default();
    config.optimizer.upper_bound = 0.2;

    let err = analyze(&panel, None, &codes(), &config).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::Optimize(OptimizeError::InfeasibleBounds { n_assets: 4, .. })
    ));
}

#[test]
fn test_unknown_asset_aborts() {
    let (panel, _) = synthetic_market(40);
    let assets = vec![AssetCode::new("BHP").unwrap(), AssetCode::new("ZZZ").unwrap()];
    let err = analyze(&panel, None, &assets, &AnalysisConfig::default()).unwrap_err();
    assert!(matches!(err, AnalysisError::Risk(RiskError::UnknownAsset(code)) if code == "ZZZ"));
}

#[test]
fn test_report_contents() {
    let (panel, index) = synthetic_market(80);
    let analysis = analyze(&panel, Some(&index), &codes(), &AnalysisConfig::default()).unwrap();

    let report = analysis.report().unwrap();
    assert_eq!(report.assets, CODES.to_vec());
    assert_eq!(report.window, 252);
    assert_eq!(report.contents["index"], "XJO");
    assert_eq!(report.contents["n_observations"], 79);
    assert_eq!(report.contents["statistics"].as_array().unwrap().len(), 4);
    assert_eq!(report.contents["allocations"].as_array().unwrap().len(), 4);
    assert_eq!(
        report.contents["allocations"][0]["strategy"],
        Objective::MaxReturn.name()
    );

    let table = analysis.allocation_table().to_string();
    assert!(table.contains("equal_weight"));
    assert!(analysis.statistics_table().to_string().contains("BHP"));
}

#[test]
fn test_benchmark_without_overlap_keeps_results() {
    let (panel, _) = synthetic_market(60);
    let last = start() + Days::new(59);
    let mut index = IndexSeries::new("XJO");
    for d in 0..10 {
        index.insert(last + Days::new(d), Some(7000.0 + d as f64)).unwrap();
    }

    let analysis = analyze(&panel, Some(&index), &codes(), &AnalysisConfig::default()).unwrap();

    assert_eq!(analysis.returns.n_observations(), 59);
    assert_eq!(analysis.index_name.as_deref(), Some("XJO"));
    assert!(analysis.allocations.min_risk.is_ok());
    for stats in &analysis.statistics.assets {
        assert!(stats.volatility.is_finite());
        assert!(stats.beta.is_some_and(f64::is_nan));
        assert!(stats.capm_expected_return.is_some_and(f64::is_nan));
    }
    assert_eq!(analysis.statistics.warnings.len(), 4);
    assert!(
        analysis
            .statistics
            .warnings
            .iter()
            .all(|w| w.kind == UndefinedKind::InsufficientMarketOverlap)
    );
    assert!(analysis.report().is_ok());
}

fn write_csv(dir: &Path, name: &str, contents: &str) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_analyze_from_files() {
    let (panel, index) = synthetic_market(60);
    let dir = std::env::temp_dir().join(format!("hobart-analysis-{}", std::process::id()));

    // One file per month, plus a renamed copy of the first.
    let mut files = Vec::new();
    let dates: Vec<NaiveDate> = panel.dates().into_iter().collect();
    for (i, chunk) in dates.chunks(30).enumerate() {
        let mut csv = String::from("date,code,close\n");
        for date in chunk {
            for code in panel.codes() {
                let price = panel.price(code, date).unwrap();
                writeln!(csv, "{date},{code},{price}").unwrap();
            }
        }
        files.push(write_csv(&dir, &format!("prices_{i}.csv"), &csv));
        if i == 0 {
            files.push(write_csv(&dir, "prices_copy.csv", &csv));
        }
    }
    let mut index_csv = String::from("date,close\n");
    for (date, level) in index.prices().iter() {
        writeln!(index_csv, "{date},{level}").unwrap();
    }
    let index_path = write_csv(&dir, "xjo.csv", &index_csv);

    let mut cache = PanelCache::new();
    let loaded = load_prices(files.as_slice(), Some(index_path.as_path()), &mut cache).unwrap();
    assert_eq!(loaded.duplicates.len(), 1);
    assert_eq!(loaded.panel.n_observations(), 240);

    let analysis = analyze(
        &loaded.panel,
        loaded.index.as_ref(),
        &codes(),
        &AnalysisConfig::default(),
    )
    .unwrap();
    assert_eq!(analysis.returns.n_observations(), 59);
    assert!(analysis.statistics.assets.iter().all(|s| s.beta.is_some()));

    std::fs::remove_dir_all(dir).unwrap();
}
