//! Automatic cluster-count selection with the elbow method.
//!
//! The selector fits K-means once per candidate K, records the WCSS curve,
//! and picks the K where the curve bends hardest: the argmax of the second
//! finite difference. Every candidate is evaluated independently, so the
//! sweep runs on the rayon pool when `parallel` is set.

use super::kmeans::{
    DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE, EmptyClusterPolicy, KMeansConfig, VectorClusterer,
};
use super::types::{ClusteringError, VectorDimension};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Inclusive bounds on the cluster counts to try.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KRange {
    pub min: usize,
    pub max: usize,
}

impl KRange {
    #[must_use]
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    /// Number of candidate K values. Zero when the range is inverted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.max.saturating_add(1).saturating_sub(self.min)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rejects ranges that cannot be swept over `n` vectors.
    pub fn validate(&self, n: usize) -> Result<(), ClusteringError> {
        if self.min < 1 {
            return Err(ClusteringError::invalid("k range minimum must be at least 1"));
        }
        if self.min > self.max {
            return Err(ClusteringError::invalid(format!(
                "k range is inverted: min {} > max {}",
                self.min, self.max
            )));
        }
        if self.max > n {
            return Err(ClusteringError::invalid(format!(
                "k range maximum {} exceeds the number of vectors ({n})",
                self.max
            )));
        }
        Ok(())
    }
}

impl Default for KRange {
    fn default() -> Self {
        Self::new(2, 10)
    }
}

/// Settings for a cluster-count sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionConfig {
    pub k_range: KRange,
    /// Per-K iteration cap passed through to the clusterer.
    pub max_iterations: usize,
    pub tolerance: f32,
    /// Base seed; candidate K uses `seed + K`.
    pub seed: Option<u64>,
    pub restarts: usize,
    pub empty_cluster: EmptyClusterPolicy,
    /// Evaluate candidates on the rayon pool.
    pub parallel: bool,
}

impl SelectionConfig {
    #[must_use]
    pub fn new(k_range: KRange) -> Self {
        Self {
            k_range,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            seed: None,
            restarts: 1,
            empty_cluster: EmptyClusterPolicy::default(),
            parallel: true,
        }
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts;
        self
    }

    #[must_use]
    pub fn with_empty_cluster_policy(mut self, policy: EmptyClusterPolicy) -> Self {
        self.empty_cluster = policy;
        self
    }

    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// K-means settings for one candidate cluster count.
    #[must_use]
    pub fn kmeans_config(&self, k: usize) -> KMeansConfig {
        let config = KMeansConfig::new(k)
            .with_max_iterations(self.max_iterations)
            .with_tolerance(self.tolerance)
            .with_restarts(self.restarts)
            .with_empty_cluster_policy(self.empty_cluster);
        match self.seed {
            Some(seed) => config.with_seed(seed.wrapping_add(k as u64)),
            None => config,
        }
    }
}

/// WCSS observed for one candidate K.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WcssPoint {
    pub k: usize,
    pub wcss: f64,
}

/// Outcome of a sweep: the chosen K and the curve it was chosen from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElbowResult {
    pub optimal_k: usize,
    pub wcss_curve: Vec<WcssPoint>,
}

/// Produces the WCSS of a K-cluster partition.
///
/// Implementations must be usable from several threads at once.
pub trait ClusterFitter: Send + Sync {
    fn wcss_for(&self, vectors: &[Vec<f32>], k: usize) -> Result<f64, ClusteringError>;
}

/// Default fitter: full K-means fit, centroids, then WCSS.
#[derive(Debug, Clone)]
pub struct KMeansFitter {
    config: SelectionConfig,
}

impl KMeansFitter {
    #[must_use]
    pub fn new(config: SelectionConfig) -> Self {
        Self { config }
    }
}

impl ClusterFitter for KMeansFitter {
    fn wcss_for(&self, vectors: &[Vec<f32>], k: usize) -> Result<f64, ClusteringError> {
        let clusterer = VectorClusterer::new(self.config.kmeans_config(k));
        let clusters = clusterer.fit(vectors)?;
        let centroids = clusterer.get_centroids(vectors, &clusters)?;
        clusterer.get_wcss(vectors, &clusters, &centroids)
    }
}

/// Chooses a cluster count by sweeping a K range.
#[derive(Debug, Clone)]
pub struct ClusterCountSelector<F: ClusterFitter = KMeansFitter> {
    config: SelectionConfig,
    fitter: F,
}

impl ClusterCountSelector<KMeansFitter> {
    #[must_use]
    pub fn new(config: SelectionConfig) -> Self {
        let fitter = KMeansFitter::new(config.clone());
        Self { config, fitter }
    }
}

impl<F: ClusterFitter> ClusterCountSelector<F> {
    /// Selector that evaluates candidates with a custom fitter.
    #[must_use]
    pub fn with_fitter(config: SelectionConfig, fitter: F) -> Self {
        Self { config, fitter }
    }

    #[must_use]
    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Sweeps the configured K range and returns the elbow.
    ///
    /// The range, the solver settings and the batch are validated before any
    /// fit runs. A failure for any candidate fails the whole sweep.
    pub fn select_k(&self, vectors: &[Vec<f32>]) -> Result<ElbowResult, ClusteringError> {
        let range = self.config.k_range;
        range.validate(vectors.len())?;
        // Solver settings are shared by every candidate, so check them once.
        self.config.kmeans_config(range.min).validate()?;
        let dimension = VectorDimension::of_batch(vectors)?;

        debug!(
            min = range.min,
            max = range.max,
            vectors = vectors.len(),
            dimension = dimension.get(),
            parallel = self.config.parallel,
            "sweeping cluster counts"
        );

        let wcss_curve: Vec<WcssPoint> = if self.config.parallel {
            (range.min..=range.max)
                .into_par_iter()
                .map(|k| self.evaluate(vectors, k))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            (range.min..=range.max)
                .map(|k| self.evaluate(vectors, k))
                .collect::<Result<Vec<_>, _>>()?
        };

        let optimal_k = elbow_point(&wcss_curve).unwrap_or(range.min);
        info!(optimal_k, candidates = wcss_curve.len(), "selected cluster count");

        Ok(ElbowResult {
            optimal_k,
            wcss_curve,
        })
    }

    fn evaluate(&self, vectors: &[Vec<f32>], k: usize) -> Result<WcssPoint, ClusteringError> {
        let wcss = self.fitter.wcss_for(vectors, k)?;
        debug!(k, wcss, "evaluated candidate");
        Ok(WcssPoint { k, wcss })
    }
}

/// K at the sharpest bend of a WCSS curve ordered by K.
///
/// Returns the middle K of the window with the largest second difference;
/// ties go to the smallest K. Curves with fewer than three points yield
/// their first K, and an empty curve yields `None`.
pub fn elbow_point(curve: &[WcssPoint]) -> Option<usize> {
    let first = curve.first()?;
    if curve.len() < 3 {
        return Some(first.k);
    }

    let decreases: Vec<f64> = curve.windows(2).map(|w| w[0].wcss - w[1].wcss).collect();
    let bends: Vec<f64> = decreases.windows(2).map(|w| w[0] - w[1]).collect();

    let mut best = 0;
    for (i, &bend) in bends.iter().enumerate().skip(1) {
        if bend > bends[best] {
            best = i;
        }
    }

    Some(curve[best + 1].k)
}
