//! Configuration loading and backend factory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use gradepredict_core::traits::Predictor;

use crate::command::{CommandPredictor, ExternalCommand, RequestMode, DEFAULT_INFO_PREFIX};
use crate::http::HttpPredictor;
use crate::trainer::ExternalTrainer;

pub const CONFIG_FILE: &str = "gradepredict.toml";
pub const ENV_DATA_DIR: &str = "GRADEPREDICT_DATA_DIR";
pub const ENV_PREDICTOR_URL: &str = "GRADEPREDICT_PREDICTOR_URL";

/// Configuration for the prediction backend.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PredictorConfig {
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        working_dir: Option<PathBuf>,
        #[serde(default = "default_predict_timeout")]
        timeout_secs: u64,
        #[serde(default)]
        request_mode: RequestMode,
        #[serde(default = "default_info_prefixes")]
        info_prefixes: Vec<String>,
    },
    Http {
        base_url: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_predict_timeout")]
        timeout_secs: u64,
    },
}

impl std::fmt::Debug for PredictorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PredictorConfig::Command {
                program,
                args,
                working_dir,
                timeout_secs,
                request_mode,
                info_prefixes,
            } => f
                .debug_struct("Command")
                .field("program", program)
                .field("args", args)
                .field("working_dir", working_dir)
                .field("timeout_secs", timeout_secs)
                .field("request_mode", request_mode)
                .field("info_prefixes", info_prefixes)
                .finish(),
            PredictorConfig::Http {
                base_url,
                api_key,
                timeout_secs,
            } => f
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("api_key", &api_key.as_ref().map(|_| "***"))
                .field("timeout_secs", timeout_secs)
                .finish(),
        }
    }
}

impl Default for PredictorConfig {
    fn default() -> Self {
        PredictorConfig::Command {
            program: "python3".to_string(),
            args: vec!["predict.py".to_string()],
            working_dir: None,
            timeout_secs: default_predict_timeout(),
            request_mode: RequestMode::default(),
            info_prefixes: default_info_prefixes(),
        }
    }
}

/// The model training command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    #[serde(default = "default_train_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_info_prefixes")]
    pub info_prefixes: Vec<String>,
}

fn default_predict_timeout() -> u64 {
    crate::command::DEFAULT_TIMEOUT_SECS
}
fn default_train_timeout() -> u64 {
    600
}
fn default_info_prefixes() -> Vec<String> {
    vec![DEFAULT_INFO_PREFIX.to_string()]
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_parallelism() -> usize {
    4
}

/// Top-level gradepredict configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradepredictConfig {
    /// Directory holding the JSON record files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Max concurrent predictor invocations in batch mode.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    #[serde(default)]
    pub predictor: PredictorConfig,
    #[serde(default)]
    pub trainer: Option<TrainerConfig>,
}

impl Default for GradepredictConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            parallelism: default_parallelism(),
            predictor: PredictorConfig::default(),
            trainer: None,
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut from = 0;
    while let Some(offset) = result[from..].find("${") {
        let start = from + offset;
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
        from = start + value.len();
    }
    result
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

fn anchor(path: PathBuf, base: Option<&Path>) -> PathBuf {
    match base {
        Some(base) if path.is_relative() => base.join(path),
        _ => path,
    }
}

/// Expand `${VAR}` references and anchor relative paths to `base`.
fn resolve_config(mut config: GradepredictConfig, base: Option<&Path>) -> GradepredictConfig {
    config.data_dir = anchor(resolve_path(&config.data_dir), base);

    config.predictor = match config.predictor {
        PredictorConfig::Command {
            program,
            args,
            working_dir,
            timeout_secs,
            request_mode,
            info_prefixes,
        } => PredictorConfig::Command {
            program: resolve_env_vars(&program),
            args: args.iter().map(|a| resolve_env_vars(a)).collect(),
            working_dir: working_dir
                .map(|d| anchor(resolve_path(&d), base))
                .or_else(|| base.map(Path::to_path_buf)),
            timeout_secs,
            request_mode,
            info_prefixes,
        },
        PredictorConfig::Http {
            base_url,
            api_key,
            timeout_secs,
        } => PredictorConfig::Http {
            base_url: resolve_env_vars(&base_url),
            api_key: api_key.map(|k| resolve_env_vars(&k)),
            timeout_secs,
        },
    };

    if let Some(trainer) = config.trainer.as_mut() {
        trainer.program = resolve_env_vars(&trainer.program);
        trainer.args = trainer.args.iter().map(|a| resolve_env_vars(a)).collect();
        trainer.working_dir = trainer
            .working_dir
            .take()
            .map(|d| anchor(resolve_path(&d), base))
            .or_else(|| base.map(Path::to_path_buf));
    }

    config
}

/// Apply `GRADEPREDICT_*` overrides, read through `lookup`.
fn apply_overrides(
    mut config: GradepredictConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> GradepredictConfig {
    if let Some(dir) = lookup(ENV_DATA_DIR).filter(|d| !d.is_empty()) {
        config.data_dir = PathBuf::from(dir);
    }

    if let Some(url) = lookup(ENV_PREDICTOR_URL).filter(|u| !u.is_empty()) {
        config.predictor = match config.predictor {
            PredictorConfig::Http {
                api_key,
                timeout_secs,
                ..
            } => PredictorConfig::Http {
                base_url: url,
                api_key,
                timeout_secs,
            },
            PredictorConfig::Command { timeout_secs, .. } => PredictorConfig::Http {
                base_url: url,
                api_key: None,
                timeout_secs,
            },
        };
    }

    config
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `gradepredict.toml` in the current directory
/// 2. `~/.config/gradepredict/config.toml`
///
/// Environment variable overrides: `GRADEPREDICT_DATA_DIR`, `GRADEPREDICT_PREDICTOR_URL`.
pub fn load_config() -> Result<GradepredictConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<GradepredictConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let config = match &config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let parsed = toml::from_str::<GradepredictConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            let base = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf);
            resolve_config(parsed, base.as_deref())
        }
        None => {
            tracing::debug!("no config file found, using defaults");
            resolve_config(GradepredictConfig::default(), None)
        }
    };

    Ok(apply_overrides(config, |name| std::env::var(name).ok()))
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("gradepredict"))
}

/// Create a predictor instance from its configuration.
pub fn create_predictor(config: &PredictorConfig) -> Result<Box<dyn Predictor>> {
    match config {
        PredictorConfig::Command {
            program,
            args,
            working_dir,
            timeout_secs,
            request_mode,
            info_prefixes,
        } => {
            anyhow::ensure!(!program.trim().is_empty(), "predictor program must not be empty");
            anyhow::ensure!(*timeout_secs > 0, "predictor timeout_secs must be greater than 0");
            let command = ExternalCommand::new(program)
                .with_args(args.clone())
                .with_working_dir(working_dir.clone())
                .with_timeout(Duration::from_secs(*timeout_secs))
                .with_info_prefixes(info_prefixes.clone());
            Ok(Box::new(CommandPredictor::new(command, *request_mode)))
        }
        PredictorConfig::Http {
            base_url,
            api_key,
            timeout_secs,
        } => {
            anyhow::ensure!(*timeout_secs > 0, "predictor timeout_secs must be greater than 0");
            Ok(Box::new(HttpPredictor::new(
                base_url,
                api_key.clone(),
                Duration::from_secs(*timeout_secs),
            )?))
        }
    }
}

/// Create the trainer, if one is configured.
pub fn create_trainer(config: Option<&TrainerConfig>) -> Result<ExternalTrainer> {
    let config = config.context("no [trainer] section in config")?;
    anyhow::ensure!(!config.program.trim().is_empty(), "trainer program must not be empty");
    anyhow::ensure!(config.timeout_secs > 0, "trainer timeout_secs must be greater than 0");
    Ok(ExternalTrainer::new(
        ExternalCommand::new(&config.program)
            .with_args(config.args.clone())
            .with_working_dir(config.working_dir.clone())
            .with_timeout(Duration::from_secs(config.timeout_secs))
            .with_info_prefixes(config.info_prefixes.clone()),
    ))
}
