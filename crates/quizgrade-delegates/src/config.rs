//! Grader configuration and delegate factory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use quizgrade_core::model::DEFAULT_SIMILARITY_THRESHOLD;
use quizgrade_core::traits::SimilarityDelegate;
use quizgrade_core::{GraderConfig, GradingEngine, TextMatcher, TranslationTable};

use crate::http::{HttpDelegate, DEFAULT_TIMEOUT_MS};
use crate::mock::MockDelegate;

/// Configuration for the remote similarity delegate.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DelegateConfig {
    Http {
        base_url: String,
        #[serde(default)]
        api_key: Option<String>,
    },
    /// Offline delegate returning a fixed similarity, or failing when unset.
    Mock {
        #[serde(default)]
        similarity: Option<f64>,
    },
}

impl std::fmt::Debug for DelegateConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DelegateConfig::Http { base_url, api_key } => f
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("api_key", &api_key.as_ref().map(|_| "***"))
                .finish(),
            DelegateConfig::Mock { similarity } => f
                .debug_struct("Mock")
                .field("similarity", similarity)
                .finish(),
        }
    }
}

/// Top-level quizgrade configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizgradeConfig {
    /// Threshold used when grading ad-hoc answers without a question file.
    #[serde(default = "default_threshold")]
    pub default_threshold: f64,
    /// Whether ad-hoc text answers use the tiered matcher.
    #[serde(default = "default_true")]
    pub semantic_matching: bool,
    /// Max concurrent gradings in a batch.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Upper bound on a single delegate call in milliseconds.
    #[serde(default = "default_delegate_timeout")]
    pub delegate_timeout_ms: u64,
    /// Output directory for reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Use only `translations`, dropping the built-in city table.
    #[serde(default)]
    pub replace_default_translations: bool,
    /// Optional remote similarity delegate.
    #[serde(default)]
    pub delegate: Option<DelegateConfig>,
    /// Extra canonical term → variants entries.
    #[serde(default)]
    pub translations: TranslationTable,
}

fn default_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}
fn default_true() -> bool {
    true
}
fn default_parallelism() -> usize {
    4
}
fn default_delegate_timeout() -> u64 {
    DEFAULT_TIMEOUT_MS
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./quizgrade-results")
}

impl Default for QuizgradeConfig {
    fn default() -> Self {
        Self {
            default_threshold: default_threshold(),
            semantic_matching: true,
            parallelism: default_parallelism(),
            delegate_timeout_ms: default_delegate_timeout(),
            output_dir: default_output_dir(),
            replace_default_translations: false,
            delegate: None,
            translations: TranslationTable::empty(),
        }
    }
}

impl QuizgradeConfig {
    /// The translation table after merging or replacing the built-in one.
    pub fn translation_table(&self) -> TranslationTable {
        if self.replace_default_translations {
            return self.translations.clone();
        }
        let mut table = TranslationTable::builtin();
        table.extend(&self.translations);
        table
    }

    /// A grading engine using this configuration's translation table.
    pub fn engine(&self) -> GradingEngine {
        GradingEngine::new(TextMatcher::new(self.translation_table()))
    }

    pub fn grader_config(&self) -> GraderConfig {
        GraderConfig {
            parallelism: self.parallelism.max(1),
            delegate_timeout: Duration::from_millis(self.delegate_timeout_ms),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Substituted values are not scanned again, so a value containing `${..}`
/// is kept literally. Unset variables resolve to an empty string.
fn resolve_env_vars(s: &str) -> String {
    let mut resolved = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        let var_name = &rest[start + 2..start + 2 + len];
        resolved.push_str(&rest[..start]);
        resolved.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + 2 + len + 1..];
    }
    resolved.push_str(rest);
    resolved
}

/// Resolve env vars in a delegate config.
fn resolve_delegate_config(config: &DelegateConfig) -> DelegateConfig {
    match config {
        DelegateConfig::Http { base_url, api_key } => DelegateConfig::Http {
            base_url: resolve_env_vars(base_url),
            api_key: api_key.as_ref().map(|k| resolve_env_vars(k)),
        },
        DelegateConfig::Mock { similarity } => DelegateConfig::Mock {
            similarity: *similarity,
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizgrade.toml` in the current directory
/// 2. `~/.config/quizgrade/config.toml`
///
/// Environment variable overrides: `QUIZGRADE_DELEGATE_URL`, `QUIZGRADE_DELEGATE_KEY`.
pub fn load_config() -> Result<QuizgradeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizgradeConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("quizgrade.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config_str(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => QuizgradeConfig::default(),
    };

    Ok(apply_env_overrides(
        config,
        std::env::var("QUIZGRADE_DELEGATE_URL").ok(),
        std::env::var("QUIZGRADE_DELEGATE_KEY").ok(),
    ))
}

/// Parse and validate a TOML config string.
pub fn parse_config_str(content: &str) -> Result<QuizgradeConfig> {
    let config: QuizgradeConfig = toml::from_str(content)?;
    anyhow::ensure!(
        (0.0..=1.0).contains(&config.default_threshold),
        "default_threshold must be between 0.0 and 1.0"
    );
    anyhow::ensure!(config.parallelism >= 1, "parallelism must be at least 1");
    Ok(config)
}

fn apply_env_overrides(
    mut config: QuizgradeConfig,
    url: Option<String>,
    key: Option<String>,
) -> QuizgradeConfig {
    if let Some(url) = url {
        match &mut config.delegate {
            Some(DelegateConfig::Http { base_url, .. }) => *base_url = url,
            _ => {
                config.delegate = Some(DelegateConfig::Http {
                    base_url: url,
                    api_key: None,
                })
            }
        }
    }

    if let Some(key) = key {
        if let Some(DelegateConfig::Http { api_key, .. }) = &mut config.delegate {
            *api_key = Some(key);
        }
    }

    config.delegate = config.delegate.as_ref().map(resolve_delegate_config);
    config
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizgrade"))
}

/// Create a delegate instance from its configuration.
pub fn create_delegate(
    config: &DelegateConfig,
    timeout_ms: u64,
) -> Result<Box<dyn SimilarityDelegate>> {
    match config {
        DelegateConfig::Http { base_url, api_key } => Ok(Box::new(HttpDelegate::new(
            base_url,
            api_key.clone(),
            timeout_ms,
        )?)),
        DelegateConfig::Mock { similarity } => Ok(Box::new(match similarity {
            Some(s) => MockDelegate::with_fixed_similarity(*s),
            None => MockDelegate::failing(),
        })),
    }
}
