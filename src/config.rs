// src/config.rs

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

/// Tunable knobs for the per-app telemetry core.
///
/// Loaded the same way the rest of this crate's config was always loaded:
/// `Settings.toml`, then `Settings.<RUN_MODE>.toml`, then `OUTRIG__`-prefixed
/// environment variables, each layer overriding the last. Every field has a
/// contractual default per spec.md §6; overriding them is supported for
/// testing and for deployments that want a smaller footprint.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone)]
pub struct OutrigConfig {
    /// Root directory under which `<appRunId>/` directories are created.
    pub data_dir: String,

    /// Capacity of the per-app log ring (spec.md §6: 10 000).
    pub log_ring_capacity: u64,

    /// Capacity of a single goroutine's stack-trace history (spec.md §6: 600).
    pub goroutine_history_capacity: u64,

    /// Capacity of the runtime-stats ring and the per-watch-name ring
    /// (spec.md §6: 600).
    pub runtime_stats_ring_capacity: u64,

    /// Scheduler iterations of inactivity after which a goroutine is pruned
    /// (spec.md §6 / §4.4.2 step 10: 600 — ten minutes at 1 Hz).
    pub goroutine_prune_iterations: u64,

    /// Page size for paginated log search results (spec.md §6: 100, fixed).
    pub log_search_page_size: usize,

    /// Minimum stack-dump buffer the collector reference implementation
    /// allocates before growing (spec.md §4.4.1: 1 MiB).
    pub min_stack_buffer_bytes: usize,
}

impl Default for OutrigConfig {
    fn default() -> Self {
        OutrigConfig {
            data_dir: "/var/lib/outrig".to_string(),
            log_ring_capacity: 10_000,
            goroutine_history_capacity: 600,
            runtime_stats_ring_capacity: 600,
            goroutine_prune_iterations: 600,
            log_search_page_size: 100,
            min_stack_buffer_bytes: 1024 * 1024,
        }
    }
}

impl OutrigConfig {
    /// Loads configuration from files and environment variables, falling
    /// back to [`OutrigConfig::default`] for anything unset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a source exists but fails to parse.
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let defaults = OutrigConfig::default();

        let builder = Config::builder()
            .set_default("data_dir", defaults.data_dir)?
            .set_default("log_ring_capacity", defaults.log_ring_capacity)?
            .set_default(
                "goroutine_history_capacity",
                defaults.goroutine_history_capacity,
            )?
            .set_default(
                "runtime_stats_ring_capacity",
                defaults.runtime_stats_ring_capacity,
            )?
            .set_default(
                "goroutine_prune_iterations",
                defaults.goroutine_prune_iterations,
            )?
            .set_default("log_search_page_size", defaults.log_search_page_size as i64)?
            .set_default(
                "min_stack_buffer_bytes",
                defaults.min_stack_buffer_bytes as i64,
            )?;

        let builder = builder.add_source(File::with_name("Settings").required(false));
        let builder =
            builder.add_source(File::with_name(&format!("Settings.{}", run_mode)).required(false));
        let builder = builder.add_source(Environment::with_prefix("OUTRIG").separator("__"));

        builder.build()?.try_deserialize()
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.log_search_page_size == 0 {
            return Err("log_search_page_size must be greater than 0".into());
        }
        if self.log_ring_capacity == 0 {
            return Err("log_ring_capacity must be greater than 0".into());
        }
        if self.goroutine_history_capacity == 0 {
            return Err("goroutine_history_capacity must be greater than 0".into());
        }
        Ok(())
    }
}
