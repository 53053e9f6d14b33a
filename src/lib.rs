//! The main library module for doccluster

pub mod cluster;
pub mod config;

// Explicit exports for better API clarity
pub use cluster::{
    ClusterCountSelector, ClusterLabel, ClusteringError, ElbowResult, EmptyClusterPolicy,
    KMeansConfig, KMeansResult, KRange, SelectionConfig, VectorClusterer, WcssPoint,
};
pub use config::Settings;
