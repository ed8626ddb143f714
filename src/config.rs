use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{FfiError, Result};

pub const DEFAULT_CACHE_SIZE: usize = 256;
pub const DEFAULT_CACHE_TTL_MS: u64 = 60_000;
pub const DEFAULT_BATCH_SIZE: usize = 64;
pub const DEFAULT_TYPE_CACHE_SIZE: usize = 128;
pub const DEFAULT_TRACE_CAPACITY: usize = 1024;
pub const DEFAULT_HOST_LANGUAGE: &str = "rust";

/// Named bundle of feature toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationLevel {
    None,
    Basic,
    #[default]
    Moderate,
    Aggressive,
}

impl OptimizationLevel {
    pub const fn name(self) -> &'static str {
        match self {
            OptimizationLevel::None => "none",
            OptimizationLevel::Basic => "basic",
            OptimizationLevel::Moderate => "moderate",
            OptimizationLevel::Aggressive => "aggressive",
        }
    }

    /// `(caching, batching, lazy_initialization)` for this level.
    pub const fn toggles(self) -> (bool, bool, bool) {
        match self {
            OptimizationLevel::None => (false, false, false),
            OptimizationLevel::Basic => (true, false, false),
            OptimizationLevel::Moderate => (true, true, false),
            OptimizationLevel::Aggressive => (true, true, true),
        }
    }
}

impl fmt::Display for OptimizationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OptimizationLevel {
    type Err = FfiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "0" => Ok(OptimizationLevel::None),
            "basic" | "1" => Ok(OptimizationLevel::Basic),
            "moderate" | "2" => Ok(OptimizationLevel::Moderate),
            "aggressive" | "3" => Ok(OptimizationLevel::Aggressive),
            other => Err(FfiError::invalid(format!(
                "unknown optimization level `{other}` (expected none, basic, moderate or aggressive)"
            ))),
        }
    }
}

/// Runtime-toggleable engine features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Caching,
    TypeCaching,
    Batching,
    LazyInitialization,
}

impl Feature {
    pub const NAMES: [&'static str; 4] =
        ["caching", "type_caching", "batching", "lazy_initialization"];

    pub const fn name(self) -> &'static str {
        match self {
            Feature::Caching => "caching",
            Feature::TypeCaching => "type_caching",
            Feature::Batching => "batching",
            Feature::LazyInitialization => "lazy_initialization",
        }
    }
}

impl FromStr for Feature {
    type Err = FfiError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "caching" => Ok(Feature::Caching),
            "type_caching" => Ok(Feature::TypeCaching),
            "batching" => Ok(Feature::Batching),
            "lazy_initialization" => Ok(Feature::LazyInitialization),
            other => {
                let hint = polycall_utils::suggest::find_best_match(other, Feature::NAMES)
                    .map(|name| format!("; did you mean `{name}`?"))
                    .unwrap_or_default();
                Err(FfiError::invalid(format!("unknown feature `{other}`{hint}")))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub enable_call_caching: bool,
    pub enable_type_caching: bool,
    pub enable_call_batching: bool,
    pub enable_lazy_initialization: bool,
    pub cache_size: usize,
    /// Zero disables expiry.
    pub cache_ttl_ms: u64,
    pub batch_size: usize,
    pub type_cache_size: usize,
    /// Initial trace slots; the buffer doubles when full.
    pub trace_capacity: usize,
    /// Source language recorded on traces of batched calls.
    pub host_language: String,
    pub opt_level: OptimizationLevel,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            enable_call_caching: true,
            enable_type_caching: true,
            enable_call_batching: true,
            enable_lazy_initialization: false,
            cache_size: DEFAULT_CACHE_SIZE,
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            batch_size: DEFAULT_BATCH_SIZE,
            type_cache_size: DEFAULT_TYPE_CACHE_SIZE,
            trace_capacity: DEFAULT_TRACE_CAPACITY,
            host_language: DEFAULT_HOST_LANGUAGE.to_string(),
            opt_level: OptimizationLevel::default(),
        }
    }
}

impl PerformanceConfig {
    /// Defaults overlaid with `POLYCALL_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns for each
    /// `POLYCALL_*` key. Unparsable values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(size) = parse_var(&lookup, "POLYCALL_CACHE_SIZE") {
            config.cache_size = size;
        }
        if let Some(ttl) = parse_var(&lookup, "POLYCALL_CACHE_TTL_MS") {
            config.cache_ttl_ms = ttl;
        }
        if let Some(size) = parse_var(&lookup, "POLYCALL_BATCH_SIZE") {
            config.batch_size = size;
        }
        if let Some(level) = parse_var::<OptimizationLevel, _>(&lookup, "POLYCALL_OPT_LEVEL") {
            config.apply_level(level);
        }
        config
    }

    #[cfg(feature = "toml-config")]
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source)
            .map_err(|err| FfiError::invalid(format!("invalid performance config: {err}")))
    }

    /// Rewrite the feature toggles to the fixed mapping of `level`.
    pub fn apply_level(&mut self, level: OptimizationLevel) {
        let (caching, batching, lazy) = level.toggles();
        self.enable_call_caching = caching;
        self.enable_type_caching = caching;
        self.enable_call_batching = batching;
        self.enable_lazy_initialization = lazy;
        self.opt_level = level;
    }

    pub fn set_feature(&mut self, feature: Feature, enabled: bool) {
        match feature {
            Feature::Caching => self.enable_call_caching = enabled,
            Feature::TypeCaching => self.enable_type_caching = enabled,
            Feature::Batching => self.enable_call_batching = enabled,
            Feature::LazyInitialization => self.enable_lazy_initialization = enabled,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.enable_call_caching && self.cache_size == 0 {
            return Err(FfiError::invalid("cache_size must be non-zero when caching is enabled"));
        }
        if self.enable_call_batching && self.batch_size == 0 {
            return Err(FfiError::invalid("batch_size must be non-zero when batching is enabled"));
        }
        if self.trace_capacity == 0 {
            return Err(FfiError::invalid("trace_capacity must be non-zero"));
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring invalid configuration value");
            None
        }
    }
}
