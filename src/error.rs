use thiserror::Error;

use crate::config::LoadError;
use crate::host::HookError;
use crate::infra::error::InfraError;
use crate::purge::{OptionsError, PluginError, PurgeError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Options(#[from] OptionsError),
    #[error(transparent)]
    Plugin(#[from] PluginError),
    #[error(transparent)]
    Purge(#[from] PurgeError),
    #[error(transparent)]
    Hook(#[from] HookError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
