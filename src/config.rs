//! Configuration module for the document clustering core.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides (applied by the binary)
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `DC_` and use double underscores
//! to separate nested levels:
//! - `DC_KMEANS__MAX_ITERATIONS=300` sets `kmeans.max_iterations`
//! - `DC_KMEANS__SEED=42` sets `kmeans.seed`
//! - `DC_SELECTION__K_MAX=8` sets `selection.k_max`

use crate::cluster::{
    DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE, EmptyClusterPolicy, KMeansConfig, KRange,
    SelectionConfig,
};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory holding the settings file, searched upward from the cwd.
const CONFIG_DIR: &str = ".doccluster";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Global debug mode
    #[serde(default = "default_false")]
    pub debug: bool,

    /// K-means solver settings
    #[serde(default)]
    pub kmeans: KMeansSettings,

    /// Cluster-count sweep settings
    #[serde(default)]
    pub selection: SelectionSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct KMeansSettings {
    /// Cap on refinement iterations per run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Minimum centroid movement to keep iterating
    #[serde(default = "default_tolerance")]
    pub tolerance: f32,

    /// Independent initializations per fit
    #[serde(default = "default_restarts")]
    pub restarts: usize,

    /// Seed for reproducible initialization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    #[serde(default)]
    pub empty_cluster: EmptyClusterPolicy,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SelectionSettings {
    /// Smallest cluster count to try
    #[serde(default = "default_k_min")]
    pub k_min: usize,

    /// Largest cluster count to try
    #[serde(default = "default_k_max")]
    pub k_max: usize,

    /// Evaluate candidate counts in parallel
    #[serde(default = "default_true")]
    pub parallel: bool,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}
fn default_tolerance() -> f32 {
    DEFAULT_TOLERANCE
}
fn default_restarts() -> usize {
    1
}
fn default_k_min() -> usize {
    KRange::default().min
}
fn default_k_max() -> usize {
    KRange::default().max
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            debug: false,
            kmeans: KMeansSettings::default(),
            selection: SelectionSettings::default(),
        }
    }
}

impl Default for KMeansSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            restarts: default_restarts(),
            seed: None,
            empty_cluster: EmptyClusterPolicy::default(),
        }
    }
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            k_min: default_k_min(),
            k_max: default_k_max(),
            parallel: true,
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join("settings.toml"));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still honoring `DC_` variables
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels, single underscore stays
            .merge(Env::prefixed("DC_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find the settings file by looking for a .doccluster directory
    /// from the current directory up to root
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join("settings.toml"))
    }

    /// Get the workspace root directory (where .doccluster is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// K-means settings for a fixed cluster count
    #[must_use]
    pub fn kmeans_config(&self, k: usize) -> KMeansConfig {
        let config = KMeansConfig::new(k)
            .with_max_iterations(self.kmeans.max_iterations)
            .with_tolerance(self.kmeans.tolerance)
            .with_restarts(self.kmeans.restarts)
            .with_empty_cluster_policy(self.kmeans.empty_cluster);
        match self.kmeans.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        }
    }

    /// Sweep settings built from the `[selection]` and `[kmeans]` sections
    #[must_use]
    pub fn selection_config(&self) -> SelectionConfig {
        let config = SelectionConfig::new(KRange::new(self.selection.k_min, self.selection.k_max))
            .with_max_iterations(self.kmeans.max_iterations)
            .with_tolerance(self.kmeans.tolerance)
            .with_restarts(self.kmeans.restarts)
            .with_empty_cluster_policy(self.kmeans.empty_cluster)
            .with_parallel(self.selection.parallel);
        match self.kmeans.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        }
    }
}
