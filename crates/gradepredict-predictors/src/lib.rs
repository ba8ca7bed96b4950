//! gradepredict-predictors — external prediction backends.
//!
//! Implements the `Predictor` trait for a local subprocess and an HTTP
//! model server, plus the training command runner and config loading.

pub mod command;
pub mod config;
pub mod error;
pub mod http;
pub mod mock;
pub mod protocol;
pub mod trainer;

pub use command::{CommandPredictor, ExternalCommand, RequestMode};
pub use config::{
    create_predictor, create_trainer, load_config, load_config_from, GradepredictConfig,
    PredictorConfig, TrainerConfig,
};
pub use error::CommandError;
pub use http::HttpPredictor;
pub use mock::MockPredictor;
pub use trainer::{ExternalTrainer, TrainingRun};
