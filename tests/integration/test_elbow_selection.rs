//! End-to-end cluster-count selection on synthetic data.

use crate::common::{scattered, three_blobs};
use doccluster::{ClusterCountSelector, ClusteringError, ElbowResult, KRange, SelectionConfig};

#[test]
fn test_three_blobs_select_three() {
    let vectors = three_blobs(42);
    let config = SelectionConfig::new(KRange::new(1, 6))
        .with_seed(42)
        .with_restarts(5);

    let result = ClusterCountSelector::new(config).select_k(&vectors).unwrap();

    assert_eq!(result.optimal_k, 3, "curve: {:?}", result.wcss_curve);
    let ks: Vec<usize> = result.wcss_curve.iter().map(|p| p.k).collect();
    assert_eq!(ks, vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_wcss_curve_non_increasing_in_aggregate() {
    let vectors = scattered(100, 2, 11);
    let range = KRange::new(1, 7);

    let runs: Vec<ElbowResult> = (0..7)
        .map(|seed| {
            let config = SelectionConfig::new(range).with_seed(seed * 1000);
            ClusterCountSelector::new(config).select_k(&vectors).unwrap()
        })
        .collect();

    let medians: Vec<f64> = (0..range.len())
        .map(|i| {
            let mut values: Vec<f64> = runs.iter().map(|r| r.wcss_curve[i].wcss).collect();
            values.sort_by(f64::total_cmp);
            values[values.len() / 2]
        })
        .collect();

    for pair in medians.windows(2) {
        assert!(pair[1] <= pair[0], "median WCSS increased: {medians:?}");
    }
}

#[test]
fn test_narrow_range_defaults_to_min() {
    let vectors = three_blobs(3);
    let config = SelectionConfig::new(KRange::new(2, 3)).with_seed(3);

    let result = ClusterCountSelector::new(config).select_k(&vectors).unwrap();
    assert_eq!(result.optimal_k, 2);
    assert_eq!(result.wcss_curve.len(), 2);
}

#[test]
fn test_boundary_rejection() {
    let vectors = three_blobs(1);
    let n = vectors.len();

    for range in [KRange::new(1, n + 1), KRange::new(5, 4), KRange::new(0, 3)] {
        let err = ClusterCountSelector::new(SelectionConfig::new(range))
            .select_k(&vectors)
            .unwrap_err();
        assert!(
            matches!(err, ClusteringError::InvalidConfiguration { .. }),
            "range {range:?} gave {err}"
        );
        assert_eq!(err.status_code(), "INVALID_CONFIGURATION");
    }
}

#[test]
fn test_failure_for_one_k_fails_the_sweep() {
    let mut vectors = three_blobs(9);
    vectors[10][1] = f32::INFINITY;

    let err = ClusterCountSelector::new(SelectionConfig::new(KRange::new(1, 4)).with_seed(9))
        .select_k(&vectors)
        .unwrap_err();
    assert!(matches!(err, ClusteringError::ClusteringFailure { .. }));
}

#[test]
fn test_elbow_result_serializes() {
    let vectors = three_blobs(21);
    let result = ClusterCountSelector::new(SelectionConfig::new(KRange::new(1, 4)).with_seed(21))
        .select_k(&vectors)
        .unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["optimal_k"], result.optimal_k);
    assert_eq!(json["wcss_curve"].as_array().unwrap().len(), 4);

    let back: ElbowResult = serde_json::from_value(json).unwrap();
    assert_eq!(back.optimal_k, result.optimal_k);
}
