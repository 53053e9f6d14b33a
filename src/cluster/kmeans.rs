//! K-means clustering over document feature vectors.
//!
//! A pure Rust Lloyd's-algorithm implementation with K-means++ seeding.
//! Distances are Euclidean, computed in `f64` to keep the squared sums
//! stable for high-dimensional sparse features.
//!
//! # Algorithm Details
//! - Distance metric: Euclidean
//! - Initialization: K-means++ (D² weighting)
//! - Max iterations: 100 by default
//! - Convergence: largest centroid shift below `tolerance` (default 0.001)
//! - Restarts: best-of-`restarts` by WCSS (default 1)
//!
//! # Performance Characteristics
//! - O(n * k * d * iterations * restarts) time complexity
//! - O(k * d) space for centroids

use super::types::{
    ClusterLabel, ClusteringError, SolverError, VectorDimension, validate_assignments,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default cap on refinement iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Default minimum centroid movement required to keep iterating.
pub const DEFAULT_TOLERANCE: f32 = 0.001;

/// Below this total D² mass every point coincides with a chosen centroid.
const EPSILON: f64 = 1e-12;

/// What to do with a cluster that ends up with no members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyClusterPolicy {
    /// The centroid becomes the all-zeros vector.
    #[default]
    ZeroVector,
    /// The centroid moves onto the point farthest from its own centroid.
    ReseedFarthest,
}

/// Configuration of a single K-means run.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansConfig {
    /// Number of clusters.
    pub k: usize,
    /// Cap on refinement iterations.
    pub max_iterations: usize,
    /// Minimum centroid movement to continue iterating.
    pub tolerance: f32,
    /// Seed for centroid initialization. `None` draws from the OS.
    pub seed: Option<u64>,
    /// Independent initializations; the lowest-WCSS run wins.
    pub restarts: usize,
    pub empty_cluster: EmptyClusterPolicy,
}

impl KMeansConfig {
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            seed: None,
            restarts: 1,
            empty_cluster: EmptyClusterPolicy::default(),
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

    /// Set random seed for reproducibility.
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

    pub(crate) fn validate(&self) -> Result<(), ClusteringError> {
        if self.k == 0 {
            return Err(ClusteringError::invalid("k must be at least 1"));
        }
        if self.max_iterations == 0 {
            return Err(ClusteringError::invalid("max_iterations must be at least 1"));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ClusteringError::invalid(format!(
                "tolerance must be a finite non-negative number, got {}",
                self.tolerance
            )));
        }
        if self.restarts == 0 {
            return Err(ClusteringError::invalid("restarts must be at least 1"));
        }
        Ok(())
    }
}

/// Result of K-means clustering operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KMeansResult {
    /// Cluster assignment for each input vector.
    pub assignments: Vec<ClusterLabel>,

    /// Cluster centroids, each a vector of the same dimension as input vectors.
    pub centroids: Vec<Vec<f32>>,

    /// Number of refinement iterations performed.
    pub iterations: usize,

    /// Whether the centroid shift fell below tolerance before the cap.
    pub converged: bool,

    /// Within-cluster sum of squares of the final partition.
    pub wcss: f64,
}

/// Partitions feature vectors into a fixed number of clusters.
#[derive(Debug, Clone)]
pub struct VectorClusterer {
    config: KMeansConfig,
}

impl VectorClusterer {
    #[must_use]
    pub fn new(config: KMeansConfig) -> Self {
        Self { config }
    }

    /// Clusterer for `k` clusters with default settings.
    #[must_use]
    pub fn with_k(k: usize) -> Self {
        Self::new(KMeansConfig::new(k))
    }

    #[must_use]
    pub fn config(&self) -> &KMeansConfig {
        &self.config
    }

    #[must_use]
    pub fn k(&self) -> usize {
        self.config.k
    }

    /// Clusters `vectors` and returns one label per input vector.
    ///
    /// # Errors
    /// `InvalidConfiguration` for an empty batch or `k` outside `[1, N]`,
    /// `DimensionMismatch` for ragged input, `ClusteringFailure` when the
    /// solver cannot produce a valid partition.
    #[must_use = "clustering results should be used or the computation is wasted"]
    pub fn fit(&self, vectors: &[Vec<f32>]) -> Result<Vec<ClusterLabel>, ClusteringError> {
        self.fit_detailed(vectors).map(|result| result.assignments)
    }

    /// Like [`fit`](Self::fit), but also returns centroids and run statistics.
    #[must_use = "clustering results should be used or the computation is wasted"]
    pub fn fit_detailed(&self, vectors: &[Vec<f32>]) -> Result<KMeansResult, ClusteringError> {
        self.config.validate()?;
        let dimension = VectorDimension::of_batch(vectors)?;
        let k = self.config.k;
        if k > vectors.len() {
            return Err(ClusteringError::invalid(format!(
                "k = {k} exceeds the number of vectors ({})",
                vectors.len()
            )));
        }

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut best: Option<KMeansResult> = None;
        for restart in 0..self.config.restarts {
            let result = ClusteringRun::seed(vectors, k, &mut rng)
                .and_then(|run| run.refine(vectors, dimension, &self.config))
                .map_err(|source| ClusteringError::ClusteringFailure { k, source })?;

            debug!(
                k,
                restart,
                iterations = result.iterations,
                converged = result.converged,
                wcss = result.wcss,
                "k-means run finished"
            );

            if best.as_ref().is_none_or(|b| result.wcss < b.wcss) {
                best = Some(result);
            }
        }

        best.ok_or_else(|| ClusteringError::invalid("restarts must be at least 1"))
    }

    /// Element-wise mean of the vectors assigned to each cluster `0..k`.
    ///
    /// Empty clusters follow the configured [`EmptyClusterPolicy`].
    pub fn get_centroids(
        &self,
        vectors: &[Vec<f32>],
        clusters: &[ClusterLabel],
    ) -> Result<Vec<Vec<f32>>, ClusteringError> {
        compute_centroids(vectors, clusters, self.config.k, self.config.empty_cluster)
    }

    /// Sum of squared distances from each vector to its cluster's centroid.
    pub fn get_wcss(
        &self,
        vectors: &[Vec<f32>],
        clusters: &[ClusterLabel],
        centroids: &[Vec<f32>],
    ) -> Result<f64, ClusteringError> {
        within_cluster_sum_of_squares(vectors, clusters, centroids)
    }
}

/// Computes the centroid of every cluster `0..k` from a labelled batch.
pub fn compute_centroids(
    vectors: &[Vec<f32>],
    clusters: &[ClusterLabel],
    k: usize,
    policy: EmptyClusterPolicy,
) -> Result<Vec<Vec<f32>>, ClusteringError> {
    if k == 0 {
        return Err(ClusteringError::invalid("k must be at least 1"));
    }
    let dimension = VectorDimension::of_batch(vectors)?;
    validate_assignments(vectors, clusters, k)?;
    Ok(centroids_of(vectors, clusters, k, dimension, policy))
}

/// Within-cluster sum of squares for a labelled batch and its centroids.
pub fn within_cluster_sum_of_squares(
    vectors: &[Vec<f32>],
    clusters: &[ClusterLabel],
    centroids: &[Vec<f32>],
) -> Result<f64, ClusteringError> {
    let dimension = VectorDimension::of_batch(vectors)?;
    validate_assignments(vectors, clusters, centroids.len())?;
    for (index, centroid) in centroids.iter().enumerate() {
        dimension.validate_vector(index, centroid)?;
    }
    Ok(wcss_of(vectors, clusters, centroids))
}

/// Squared Euclidean distance, accumulated in `f64`.
pub(crate) fn squared_distance(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same dimension");

    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum()
}

/// Returns the label of the nearest centroid. Ties go to the lowest index.
pub(crate) fn assign_to_nearest_centroid(vector: &[f32], centroids: &[Vec<f32>]) -> ClusterLabel {
    let mut best_distance = f64::INFINITY;
    let mut best_cluster = 0;

    for (i, centroid) in centroids.iter().enumerate() {
        let distance = squared_distance(vector, centroid);
        if distance < best_distance {
            best_distance = distance;
            best_cluster = i;
        }
    }

    ClusterLabel::from_index(best_cluster)
}

/// Mutable state of one K-means execution.
struct ClusteringRun {
    assignments: Vec<ClusterLabel>,
    centroids: Vec<Vec<f32>>,
    iterations: usize,
    converged: bool,
}

impl ClusteringRun {
    fn seed(vectors: &[Vec<f32>], k: usize, rng: &mut StdRng) -> Result<Self, SolverError> {
        for (index, vector) in vectors.iter().enumerate() {
            if let Some(position) = vector.iter().position(|x| !x.is_finite()) {
                return Err(SolverError::NonFiniteInput { index, position });
            }
        }

        Ok(Self {
            assignments: vec![ClusterLabel::new(0); vectors.len()],
            centroids: initialize_centroids_kmeans_plus_plus(vectors, k, rng)?,
            iterations: 0,
            converged: false,
        })
    }

    fn refine(
        mut self,
        vectors: &[Vec<f32>],
        dimension: VectorDimension,
        config: &KMeansConfig,
    ) -> Result<KMeansResult, SolverError> {
        let k = self.centroids.len();
        let tolerance = f64::from(config.tolerance);

        for iteration in 1..=config.max_iterations {
            self.iterations = iteration;
            self.assign(vectors);

            let updated = centroids_of(
                vectors,
                &self.assignments,
                k,
                dimension,
                config.empty_cluster,
            );
            if let Some(cluster) = updated
                .iter()
                .position(|c| c.iter().any(|x| !x.is_finite()))
            {
                return Err(SolverError::NonFiniteCentroid { cluster, iteration });
            }

            let shift = max_centroid_shift(&self.centroids, &updated);
            self.centroids = updated;

            if shift < tolerance {
                self.converged = true;
                break;
            }
        }

        // Labels must describe the final centroids, not the previous ones.
        self.assign(vectors);

        if !self.converged {
            warn!(
                k,
                max_iterations = config.max_iterations,
                "k-means did not converge before the iteration cap"
            );
        }

        let wcss = wcss_of(vectors, &self.assignments, &self.centroids);
        Ok(KMeansResult {
            assignments: self.assignments,
            centroids: self.centroids,
            iterations: self.iterations,
            converged: self.converged,
            wcss,
        })
    }

    fn assign(&mut self, vectors: &[Vec<f32>]) {
        for (label, vector) in self.assignments.iter_mut().zip(vectors) {
            *label = assign_to_nearest_centroid(vector, &self.centroids);
        }
    }
}

/// Initializes centroids using the K-means++ algorithm.
///
/// If every remaining point coincides with a chosen centroid, the rest are
/// filled with unused points in input order.
fn initialize_centroids_kmeans_plus_plus(
    vectors: &[Vec<f32>],
    k: usize,
    rng: &mut StdRng,
) -> Result<Vec<Vec<f32>>, SolverError> {
    let mut chosen = vec![false; vectors.len()];
    let mut centroids = Vec::with_capacity(k);

    let first = rng.random_range(0..vectors.len());
    chosen[first] = true;
    centroids.push(vectors[first].clone());

    let mut nearest: Vec<f64> = vectors
        .iter()
        .map(|v| squared_distance(v, &vectors[first]))
        .collect();

    while centroids.len() < k {
        let total: f64 = nearest.iter().sum();
        let next = if total > EPSILON {
            sample_proportional(&nearest, total, rng)
        } else {
            chosen.iter().position(|&c| !c)
        };
        let Some(next) = next else {
            break;
        };

        chosen[next] = true;
        centroids.push(vectors[next].clone());
        for (distance, vector) in nearest.iter_mut().zip(vectors) {
            *distance = distance.min(squared_distance(vector, &vectors[next]));
        }
        nearest[next] = 0.0;
    }

    if centroids.len() != k {
        return Err(SolverError::Initialization {
            chosen: centroids.len(),
            requested: k,
        });
    }

    Ok(centroids)
}

/// Picks an index with probability proportional to its weight.
fn sample_proportional(weights: &[f64], total: f64, rng: &mut StdRng) -> Option<usize> {
    let target = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    let mut last_positive = None;

    for (i, &weight) in weights.iter().enumerate() {
        if weight <= 0.0 {
            continue;
        }
        last_positive = Some(i);
        cumulative += weight;
        if cumulative > target {
            return Some(i);
        }
    }

    // Rounding can leave the cumulative sum just short of the target.
    last_positive
}

fn centroids_of(
    vectors: &[Vec<f32>],
    clusters: &[ClusterLabel],
    k: usize,
    dimension: VectorDimension,
    policy: EmptyClusterPolicy,
) -> Vec<Vec<f32>> {
    let mut sums = vec![vec![0.0f64; dimension.get()]; k];
    let mut sizes = vec![0usize; k];

    for (vector, label) in vectors.iter().zip(clusters) {
        let sum = &mut sums[label.index()];
        for (total, &value) in sum.iter_mut().zip(vector) {
            *total += f64::from(value);
        }
        sizes[label.index()] += 1;
    }

    // Narrow once, after dividing, so large batches keep their precision.
    let mut centroids: Vec<Vec<f32>> = sums
        .into_iter()
        .zip(&sizes)
        .map(|(sum, &size)| {
            if size == 0 {
                return vec![0.0; sum.len()];
            }
            sum.into_iter()
                .map(|total| (total / size as f64) as f32)
                .collect()
        })
        .collect();

    if policy == EmptyClusterPolicy::ReseedFarthest {
        reseed_empty_clusters(vectors, clusters, &mut centroids, &sizes);
    }

    centroids
}

/// Moves each empty centroid onto the point farthest from its own centroid.
fn reseed_empty_clusters(
    vectors: &[Vec<f32>],
    clusters: &[ClusterLabel],
    centroids: &mut [Vec<f32>],
    sizes: &[usize],
) {
    let mut taken = vec![false; vectors.len()];

    for empty in (0..centroids.len()).filter(|&c| sizes[c] == 0) {
        let farthest = vectors
            .iter()
            .zip(clusters)
            .enumerate()
            .filter(|(i, _)| !taken[*i])
            .map(|(i, (vector, label))| (i, squared_distance(vector, &centroids[label.index()])))
            .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
                Some((_, best_d)) if best_d >= d => best,
                _ => Some((i, d)),
            });

        if let Some((index, _)) = farthest {
            taken[index] = true;
            centroids[empty] = vectors[index].clone();
        }
    }
}

fn wcss_of(vectors: &[Vec<f32>], clusters: &[ClusterLabel], centroids: &[Vec<f32>]) -> f64 {
    vectors
        .iter()
        .zip(clusters)
        .map(|(vector, label)| squared_distance(vector, &centroids[label.index()]))
        .sum()
}

fn max_centroid_shift(old: &[Vec<f32>], new: &[Vec<f32>]) -> f64 {
    old.iter()
        .zip(new)
        .map(|(a, b)| squared_distance(a, b).sqrt())
        .fold(0.0, f64::max)
}
