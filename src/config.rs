/// Configuration for archgraph runs.
///
/// Handles loading, validating, and providing default configuration values,
/// and projects them onto the option structs of each component.
use std::path::Path;

use anyhow::{Context, Result};
use globset::Glob;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::architecture::ArchitectureOptions;
use crate::callgraph::{BuildOptions, MAX_DEPTH_LIMIT, MIN_DEPTH_LIMIT};
use crate::indexer::{IndexOptions, PackageIdStrategy};

// ── Default value functions ──────────────────────────────────────────

fn default_skip_dirs() -> Vec<String> {
    IndexOptions::default().skip_dirs
}

fn default_package_depth() -> usize {
    3
}

fn default_max_depth() -> usize {
    10
}

fn default_true() -> bool {
    true
}

// ── Config struct ────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory names never descended into.
    #[serde(default = "default_skip_dirs")]
    pub skip_dirs: Vec<String>,

    /// Trailing directory segments kept in package IDs; `0` keeps all.
    #[serde(default = "default_package_depth")]
    pub package_depth: usize,

    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default = "default_true")]
    pub resolve_interfaces: bool,

    #[serde(default = "default_true")]
    pub track_goroutines: bool,

    #[serde(default = "default_true")]
    pub receiver_name_fallback: bool,

    /// Glob patterns over package IDs whose calls are not followed.
    #[serde(default)]
    pub exclude_packages: Vec<String>,

    #[serde(default = "default_true")]
    pub include_calls: bool,
}

// ── Default impl ─────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            skip_dirs: default_skip_dirs(),
            package_depth: default_package_depth(),
            max_depth: default_max_depth(),
            resolve_interfaces: default_true(),
            track_goroutines: default_true(),
            receiver_name_fallback: default_true(),
            exclude_packages: Vec::new(),
            include_calls: default_true(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// A missing file yields the defaults. So does a file that is not valid
    /// JSON, with a warning.
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let path = config_path.as_ref();

        if !path.exists() {
            info!("{} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        let cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {}: {e}", path.display());
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {}", path.display());
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data)
            .with_context(|| format!("failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            (MIN_DEPTH_LIMIT..=MAX_DEPTH_LIMIT).contains(&self.max_depth),
            "max_depth must be between {} and {}, got {}",
            MIN_DEPTH_LIMIT,
            MAX_DEPTH_LIMIT,
            self.max_depth
        );
        for pattern in &self.exclude_packages {
            Glob::new(pattern)
                .with_context(|| format!("invalid exclude_packages pattern: {pattern}"))?;
        }
        Ok(())
    }

    #[must_use]
    pub fn index_options(&self) -> IndexOptions {
        IndexOptions {
            package_ids: PackageIdStrategy::from_depth(self.package_depth),
            skip_dirs: self.skip_dirs.clone(),
        }
    }

    #[must_use]
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            max_depth: self.max_depth,
            resolve_interfaces: self.resolve_interfaces,
            track_goroutines: self.track_goroutines,
            receiver_name_fallback: self.receiver_name_fallback,
            exclude_packages: self.exclude_packages.clone(),
        }
    }

    #[must_use]
    pub fn architecture_options(&self) -> ArchitectureOptions {
        ArchitectureOptions {
            include_calls: self.include_calls,
            resolver: self.build_options().resolver_options(),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
