//! # Tankobon Config
//!
//! Layered configuration: built-in defaults, then an optional config file,
//! then `TANKOBON_*` environment variables (nested keys separated by `__`,
//! e.g. `TANKOBON_CACHE__MAX_ENTRIES=80`).
//!
//! Without an explicit path, `config.toml`, `config.yaml` and `config.json`
//! are read (in that order, later files overriding earlier ones) from the
//! platform configuration directory, such as `~/.config/tankobon` on Linux.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tankobon_archive::{ExtractOptions, RarTool};
use tankobon_cache::CacheLimits;
use tracing::instrument;

const ENV_PREFIX: &str = "TANKOBON_";
const MAX_PREFETCH_WINDOW: usize = 64;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub extract: ExtractConfig,
    pub thumbnail: ThumbnailConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub max_cost_bytes: u64,
    /// Pages prefetched on each side of the current page.
    pub prefetch_window: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let limits = CacheLimits::default();
        Self { max_entries: limits.max_entries, max_cost_bytes: limits.max_cost, prefetch_window: limits.window }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// RAR extraction tools in order of preference.
    pub rar_tools: Vec<String>,
    /// Extra directories searched for the tools before `PATH`.
    pub tool_dirs: Vec<PathBuf>,
    pub temp_dir: Option<PathBuf>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            rar_tools: RarTool::ALL.iter().map(ToString::to_string).collect(),
            tool_dirs: Vec::new(),
            temp_dir: None,
        }
    }
}

/// Size and encoding of the cover thumbnail produced on import.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    pub width: u32,
    pub height: u32,
    /// JPEG quality, 1 to 100.
    pub quality: u8,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self { width: 200, height: 300, quality: 80 }
    }
}

/// Platform configuration directory, if the platform has one.
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "tankobon").map(|dirs| dirs.config_dir().to_path_buf())
}

impl Config {
    /// Load from the default locations and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load from `path` (or the default locations when `None`) and the
    /// environment, then validate.
    ///
    /// # Errors
    /// - [`NotFound`](ErrorKind::NotFound) if `path` is given but missing
    /// - [`UnsupportedFormat`](ErrorKind::UnsupportedFormat) for an unknown file extension
    /// - [`Malformed`](ErrorKind::Malformed) if a source cannot be parsed
    /// - [`Invalid`](ErrorKind::Invalid) if a value fails validation
    #[instrument(skip_all, fields(path = ?path))]
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(path)?.extract().or_raise(|| ErrorKind::Malformed)?;
        config.validate()?;
        tracing::debug!(?config, "Loaded configuration");
        Ok(config)
    }

    /// The layered provider chain, before extraction.
    pub fn figment(path: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        match path {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
                }
                figment = merge_file(figment, path)?;
            },
            None => {
                if let Some(dir) = config_dir() {
                    for name in ["config.toml", "config.yaml", "config.json"] {
                        let candidate = dir.join(name);
                        if candidate.is_file() {
                            tracing::trace!(path = %candidate.display(), "Reading config file");
                            figment = merge_file(figment, &candidate)?;
                        }
                    }
                }
            },
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Check value ranges and tool names.
    pub fn validate(&self) -> Result<()> {
        if self.cache.max_entries == 0 {
            exn::bail!(ErrorKind::Invalid("cache.max_entries must be greater than zero".to_string()));
        }
        if self.cache.max_cost_bytes == 0 {
            exn::bail!(ErrorKind::Invalid("cache.max_cost_bytes must be greater than zero".to_string()));
        }
        if self.cache.prefetch_window > MAX_PREFETCH_WINDOW {
            exn::bail!(ErrorKind::Invalid(format!("cache.prefetch_window must be at most {MAX_PREFETCH_WINDOW}")));
        }
        if self.thumbnail.width == 0 || self.thumbnail.height == 0 {
            exn::bail!(ErrorKind::Invalid("thumbnail dimensions must be non-zero".to_string()));
        }
        if !(1..=100).contains(&self.thumbnail.quality) {
            exn::bail!(ErrorKind::Invalid("thumbnail.quality must be between 1 and 100".to_string()));
        }
        self.rar_tools()?;
        Ok(())
    }

    fn rar_tools(&self) -> Result<Vec<RarTool>> {
        self.extract
            .rar_tools
            .iter()
            .map(|name| {
                name.parse::<RarTool>()
                    .or_raise(|| ErrorKind::Invalid(format!("extract.rar_tools: unknown tool {name:?}")))
            })
            .collect()
    }

    /// Archive extraction settings.
    pub fn extract_options(&self) -> Result<ExtractOptions> {
        Ok(ExtractOptions {
            rar_tools: self.rar_tools()?,
            tool_dirs: self.extract.tool_dirs.clone(),
            temp_dir: self.extract.temp_dir.clone(),
        })
    }

    pub fn cache_limits(&self) -> CacheLimits {
        CacheLimits {
            max_entries: self.cache.max_entries,
            max_cost: self.cache.max_cost_bytes,
            window: self.cache.prefetch_window,
        }
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file_exact(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
        Some("json") => figment.merge(Json::file_exact(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    })
}
