//! Document clustering core.
//!
//! Feature vectors produced by an upstream vectorizer are partitioned with
//! K-means, and the cluster count can be chosen automatically with the elbow
//! method. Nothing here knows about documents or categories: callers map the
//! returned labels back to their own records.
//!
//! # Architecture
//! [`VectorClusterer`] runs Lloyd's algorithm for a fixed K and answers
//! centroid and WCSS queries. [`ClusterCountSelector`] sweeps a K range with
//! a [`ClusterFitter`] (K-means by default) and picks the elbow of the WCSS
//! curve.

mod elbow;
mod kmeans;
mod types;

// Re-export core types for public API
pub use elbow::{
    ClusterCountSelector, ClusterFitter, ElbowResult, KMeansFitter, KRange, SelectionConfig,
    WcssPoint, elbow_point,
};
pub use kmeans::{
    DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE, EmptyClusterPolicy, KMeansConfig, KMeansResult,
    VectorClusterer, compute_centroids, within_cluster_sum_of_squares,
};
pub use types::{ClusterLabel, ClusteringError, SolverError, VectorDimension};
