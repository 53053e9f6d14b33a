//! Properties of a single K-means fit that must hold for any valid input.

use crate::common::{scattered, three_blobs};
use doccluster::{ClusterLabel, EmptyClusterPolicy, KMeansConfig, VectorClusterer};

fn clusterer(k: usize, seed: u64) -> VectorClusterer {
    VectorClusterer::new(KMeansConfig::new(k).with_seed(seed))
}

#[test]
fn test_partition_is_complete() {
    let vectors = scattered(50, 4, 1);

    for k in 1..=8 {
        for seed in 0..3 {
            let labels = clusterer(k, seed).fit(&vectors).unwrap();
            assert_eq!(labels.len(), vectors.len(), "k = {k}, seed = {seed}");
            assert!(
                labels.iter().all(|label| label.index() < k),
                "label out of range for k = {k}"
            );
        }
    }
}

#[test]
fn test_centroids_match_input_dimension() {
    let vectors = scattered(40, 7, 2);
    let clusterer = clusterer(5, 2);
    let labels = clusterer.fit(&vectors).unwrap();
    let centroids = clusterer.get_centroids(&vectors, &labels).unwrap();

    assert_eq!(centroids.len(), 5);
    assert!(centroids.iter().all(|c| c.len() == 7));
}

#[test]
fn test_k_equals_n_yields_singletons() {
    let vectors = scattered(12, 3, 3);
    let clusterer = clusterer(vectors.len(), 3);
    let labels = clusterer.fit(&vectors).unwrap();

    let mut seen = labels.clone();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), vectors.len(), "every vector should have its own cluster");

    let centroids = clusterer.get_centroids(&vectors, &labels).unwrap();
    assert_eq!(clusterer.get_wcss(&vectors, &labels, &centroids).unwrap(), 0.0);
}

#[test]
fn test_single_cluster_centroid_is_the_mean() {
    let vectors = three_blobs(4);
    let clusterer = clusterer(1, 4);
    let labels = clusterer.fit(&vectors).unwrap();
    assert!(labels.iter().all(|&label| label == ClusterLabel::new(0)));

    let n = vectors.len() as f64;
    let mean_x = vectors.iter().map(|v| f64::from(v[0])).sum::<f64>() / n;
    let mean_y = vectors.iter().map(|v| f64::from(v[1])).sum::<f64>() / n;

    let centroids = clusterer.get_centroids(&vectors, &labels).unwrap();
    assert_eq!(centroids.len(), 1);
    assert!((f64::from(centroids[0][0]) - mean_x).abs() < 1e-3);
    assert!((f64::from(centroids[0][1]) - mean_y).abs() < 1e-3);
}

#[test]
fn test_blobs_are_recovered() {
    let vectors = three_blobs(5);
    let clusterer = VectorClusterer::new(KMeansConfig::new(3).with_seed(5).with_restarts(5));
    let labels = clusterer.fit(&vectors).unwrap();

    for blob in labels.chunks(30) {
        assert!(blob.iter().all(|&label| label == blob[0]));
    }
    assert_ne!(labels[0], labels[30]);
    assert_ne!(labels[30], labels[60]);
    assert_ne!(labels[0], labels[60]);
}

#[test]
fn test_queries_are_bit_identical() {
    let vectors = scattered(30, 5, 6);
    let clusterer = clusterer(4, 6);
    let labels = clusterer.fit(&vectors).unwrap();

    let first = clusterer.get_centroids(&vectors, &labels).unwrap();
    let second = clusterer.get_centroids(&vectors, &labels).unwrap();
    assert_eq!(first, second);

    let a = clusterer.get_wcss(&vectors, &labels, &first).unwrap();
    let b = clusterer.get_wcss(&vectors, &labels, &second).unwrap();
    assert_eq!(a.to_bits(), b.to_bits());
}

#[test]
fn test_same_seed_same_partition() {
    let vectors = scattered(60, 3, 7);
    let a = clusterer(6, 77).fit_detailed(&vectors).unwrap();
    let b = clusterer(6, 77).fit_detailed(&vectors).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_more_restarts_never_worse() {
    let vectors = scattered(80, 2, 8);
    let single = VectorClusterer::new(KMeansConfig::new(6).with_seed(8))
        .fit_detailed(&vectors)
        .unwrap();
    let many = VectorClusterer::new(KMeansConfig::new(6).with_seed(8).with_restarts(6))
        .fit_detailed(&vectors)
        .unwrap();

    // The first restart draws the same initialization as the single run.
    assert!(many.wcss <= single.wcss);
}

#[test]
fn test_reseed_farthest_keeps_centroids_on_the_data() {
    // Four duplicates and one outlier: k = 3 forces an empty cluster.
    let mut vectors = vec![vec![5.0, 5.0]; 4];
    vectors.push(vec![15.0, 5.0]);

    for seed in 0..5 {
        let clusterer = VectorClusterer::new(
            KMeansConfig::new(3)
                .with_seed(seed)
                .with_empty_cluster_policy(EmptyClusterPolicy::ReseedFarthest),
        );
        let result = clusterer.fit_detailed(&vectors).unwrap();

        assert_eq!(result.assignments.len(), vectors.len());
        assert!(result.assignments.iter().all(|label| label.index() < 3));
        assert_eq!(result.centroids.len(), 3);

        let queried = clusterer
            .get_centroids(&vectors, &result.assignments)
            .unwrap();
        for centroid in result.centroids.iter().chain(&queried) {
            // Means and reseeded points both stay inside the data's bounding box.
            assert!(
                (5.0..=15.0).contains(&centroid[0]) && (centroid[1] - 5.0).abs() < 1e-6,
                "seed {seed}: centroid {centroid:?} left the data"
            );
        }
        assert!(clusterer.get_wcss(&vectors, &result.assignments, &queried).unwrap() < 1e-6);
    }
}
