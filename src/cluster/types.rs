//! Type-safe wrappers and error types for the clustering core.
//!
//! Labels and dimensions are newtypes so that a cluster index can never be
//! confused with a vector index or a length. All validation of an input
//! batch lives here and runs before any numeric work starts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A 0-based cluster label in `[0, K)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterLabel(u32);

impl ClusterLabel {
    #[must_use]
    pub const fn new(label: u32) -> Self {
        Self(label)
    }

    /// Builds a label from a cluster index.
    ///
    /// # Panics
    /// Panics if `index` does not fit in a `u32`. Cluster counts are bounded
    /// by the batch size, which is far below that in practice.
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).expect("cluster index exceeds u32::MAX"))
    }

    /// Returns the underlying u32 value.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Returns the label as a slice index.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ClusterLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dimensionality shared by every vector of a batch.
///
/// Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorDimension(usize);

impl VectorDimension {
    /// Creates a new `VectorDimension` with validation.
    pub fn new(dim: usize) -> Result<Self, ClusteringError> {
        if dim == 0 {
            return Err(ClusteringError::ZeroDimension);
        }
        Ok(Self(dim))
    }

    /// Returns the underlying dimension value.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }

    /// Validates that the vector at `index` has the expected dimension.
    pub fn validate_vector(&self, index: usize, vector: &[f32]) -> Result<(), ClusteringError> {
        if vector.len() != self.0 {
            return Err(ClusteringError::DimensionMismatch {
                index,
                expected: self.0,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    /// Checks a whole batch and returns its common dimension.
    ///
    /// The first vector fixes the expected length.
    pub fn of_batch(vectors: &[Vec<f32>]) -> Result<Self, ClusteringError> {
        let first = vectors
            .first()
            .ok_or_else(|| ClusteringError::InvalidConfiguration {
                reason: "no vectors supplied".to_string(),
            })?;
        let dimension = Self::new(first.len())?;
        for (index, vector) in vectors.iter().enumerate().skip(1) {
            dimension.validate_vector(index, vector)?;
        }
        Ok(dimension)
    }
}

/// Checks that a label slice lines up with a vector batch and stays below `k`.
pub(crate) fn validate_assignments(
    vectors: &[Vec<f32>],
    clusters: &[ClusterLabel],
    k: usize,
) -> Result<(), ClusteringError> {
    if vectors.len() != clusters.len() {
        return Err(ClusteringError::AssignmentMismatch {
            vectors: vectors.len(),
            labels: clusters.len(),
        });
    }
    if let Some((index, label)) = clusters
        .iter()
        .enumerate()
        .find(|(_, label)| label.index() >= k)
    {
        return Err(ClusteringError::LabelOutOfRange {
            index,
            label: label.get(),
            k,
        });
    }
    Ok(())
}

/// Failures detected inside the iterative solver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("input vector {index} has a non-finite component at position {position}")]
    NonFiniteInput { index: usize, position: usize },

    #[error("centroid {cluster} became non-finite at iteration {iteration}")]
    NonFiniteCentroid { cluster: usize, iteration: usize },

    #[error("seeded only {chosen} of {requested} initial centroids")]
    Initialization { chosen: usize, requested: usize },
}

/// Errors that can occur during clustering operations.
///
/// All error messages include actionable suggestions for resolution.
#[derive(Error, Debug)]
pub enum ClusteringError {
    #[error(
        "Invalid clustering configuration: {reason}\nSuggestion: Use 1 <= k <= number of vectors and a non-inverted k range"
    )]
    InvalidConfiguration { reason: String },

    #[error(
        "Vector dimension mismatch at index {index}: expected {expected}, got {actual}\nSuggestion: Ensure all vectors come from the same vectorizer"
    )]
    DimensionMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Vectors have zero dimensions\nSuggestion: Check that the vectorizer produced features")]
    ZeroDimension,

    #[error(
        "Assignment length mismatch: {vectors} vectors but {labels} labels\nSuggestion: Pass the labels produced by fitting these exact vectors"
    )]
    AssignmentMismatch { vectors: usize, labels: usize },

    #[error(
        "Cluster label {label} at index {index} is out of range for k = {k}\nSuggestion: Use the clusterer that produced the labels"
    )]
    LabelOutOfRange { index: usize, label: u32, k: usize },

    #[error(
        "Clustering failed for k = {k}: {source}\nSuggestion: Check that vectors contain finite values"
    )]
    ClusteringFailure {
        k: usize,
        #[source]
        source: SolverError,
    },
}

impl ClusteringError {
    /// Get a stable status code for this error type.
    pub fn status_code(&self) -> &'static str {
        match self {
            Self::InvalidConfiguration { .. } => "INVALID_CONFIGURATION",
            Self::DimensionMismatch { .. } | Self::ZeroDimension => "DIMENSIONALITY_MISMATCH",
            Self::AssignmentMismatch { .. } | Self::LabelOutOfRange { .. } => "INVALID_ASSIGNMENT",
            Self::ClusteringFailure { .. } => "CLUSTERING_FAILURE",
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}
