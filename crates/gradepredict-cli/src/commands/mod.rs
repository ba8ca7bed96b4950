pub mod export;
pub mod init;
pub mod predict;
pub mod record_score;
pub mod train;
pub mod validate;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use gradepredict_predictors::{load_config_from, GradepredictConfig};
use gradepredict_store::JsonStore;

/// Load config and open the store it points at.
pub(crate) fn open_store(config_path: Option<&Path>) -> Result<(GradepredictConfig, Arc<JsonStore>)> {
    let config = load_config_from(config_path)?;
    tracing::debug!(data_dir = %config.data_dir.display(), "opening record store");
    let store = Arc::new(JsonStore::open(config.data_dir.clone()));
    Ok((config, store))
}
