use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("monitor setup failed: {0}")]
    Monitor(#[from] monitor::MonitorError),

    #[error("coordinator setup failed: {0}")]
    Coordinator(#[from] coordinator::CoordinatorError),

    #[error("http client setup failed: {0}")]
    Http(#[from] reqwest::Error),
}
