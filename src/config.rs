use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{MatchError, Result};

pub type Number = f32;

pub const EPSILON: f32 = 1e-6;

pub const DEFAULT_DIMENSIONS: i64 = 256;
pub const DEFAULT_TOP_K: i64 = 10;
pub const DEFAULT_BOOST_PER_HIT: f64 = 4.0;
pub const DEFAULT_BOOST_CAP: f64 = 20.0;

/// Raw values as they come out of the layered config sources.
#[derive(Deserialize)]
pub struct HirematchConfig {
    pub index_path: Option<String>,
    pub dimensions: Option<i64>,
    pub top_k: Option<i64>,
    pub boost_per_hit: Option<f64>,
    pub boost_cap: Option<f64>,
}

impl HirematchConfig {
    pub fn try_from(config: &Config) -> std::result::Result<Self, ConfigError> {
        Ok(HirematchConfig {
            index_path: config.get("index_path").ok(),
            dimensions: config.get("dimensions").ok(),
            top_k: config.get("top_k").ok(),
            boost_per_hit: config.get("boost_per_hit").ok(),
            boost_cap: config.get("boost_cap").ok(),
        })
    }
}

/// Process-wide settings, built once at startup and handed to the index and pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub index_path: PathBuf,
    pub dimensions: usize,
    pub top_k: usize,
    pub boost_per_hit: f64,
    pub boost_cap: f64,
}

impl Settings {
    /// Settings for an index at `index_path` with `dimensions` components per vector,
    /// everything else at its default.
    pub fn new(index_path: impl Into<PathBuf>, dimensions: i64) -> Result<Self> {
        Ok(Self {
            index_path: index_path.into(),
            dimensions: validate_dimensions(dimensions)?,
            top_k: DEFAULT_TOP_K as usize,
            boost_per_hit: DEFAULT_BOOST_PER_HIT,
            boost_cap: DEFAULT_BOOST_CAP,
        })
    }

    /// Loads `hirematch_config.*` from the working directory (optional), then
    /// `HIREMATCH_*` environment variables on top.
    pub fn load() -> Result<Self> {
        let config = Config::builder()
            .add_source(ConfigFile::with_name("hirematch_config").required(false))
            .add_source(Environment::with_prefix("HIREMATCH"))
            .build()?;

        Self::from_config(&config)
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let raw = HirematchConfig::try_from(config)?;

        let index_path = raw.index_path.ok_or_else(|| {
            MatchError::Config(ConfigError::NotFound(
                "index_path (HIREMATCH_INDEX_PATH)".to_string(),
            ))
        })?;

        let mut settings = Self::new(index_path, raw.dimensions.unwrap_or(DEFAULT_DIMENSIONS))?;

        let top_k = raw.top_k.unwrap_or(DEFAULT_TOP_K);
        if top_k <= 0 {
            return Err(MatchError::Config(ConfigError::Message(format!(
                "top_k must be positive, got {}",
                top_k
            ))));
        }
        settings.top_k = top_k as usize;

        settings.boost_per_hit = raw.boost_per_hit.unwrap_or(DEFAULT_BOOST_PER_HIT).max(0.0);
        settings.boost_cap = raw.boost_cap.unwrap_or(DEFAULT_BOOST_CAP).max(0.0);

        Ok(settings)
    }

    /// Companion identifier artifact, `<index_path>.ids`.
    pub fn ids_path(&self) -> PathBuf {
        ids_path_for(&self.index_path)
    }

    pub fn print_config(&self) {
        println!("index_path={}", self.index_path.display());
        println!("ids_path={}", self.ids_path().display());
        println!("dimensions={}", self.dimensions);
        println!("top_k={}", self.top_k);
        println!("boost_per_hit={}", self.boost_per_hit);
        println!("boost_cap={}", self.boost_cap);
    }
}

pub fn ids_path_for(index_path: &Path) -> PathBuf {
    let mut name = index_path.as_os_str().to_owned();
    name.push(".ids");
    PathBuf::from(name)
}

pub fn validate_dimensions(dimensions: i64) -> Result<usize> {
    if dimensions <= 0 {
        return Err(MatchError::DimensionConfig(dimensions));
    }
    usize::try_from(dimensions).map_err(|_| MatchError::DimensionConfig(dimensions))
}
