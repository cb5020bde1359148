use std::path::PathBuf;
use std::sync::Arc;

use tcm_core::PatternCatalog;
use tcm_core::catalog::CatalogError;
use thiserror::Error;

use crate::llm::{LlmClient, LlmConfig, LlmConfigError, LlmError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    LlmConfig(#[from] LlmConfigError),
    #[error("could not build language model client: {0}")]
    LlmClient(#[from] LlmError),
}

/// Shared, read-only request state. Everything here is built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<PatternCatalog>,
    /// `None` keeps the consultation workflow in offline mode.
    pub llm: Option<LlmClient>,
}

impl AppState {
    pub fn new(catalog: PatternCatalog, llm: Option<LlmClient>) -> Self {
        Self {
            catalog: Arc::new(catalog),
            llm,
        }
    }

    /// Built-in catalog, no language model.
    pub fn offline() -> Self {
        Self::new(PatternCatalog::builtin(), None)
    }

    /// Load the catalog (`TCM_CATALOG_PATH` or built-in) and the optional LLM client.
    pub fn from_env() -> Result<Self, StartupError> {
        let catalog = match std::env::var("TCM_CATALOG_PATH") {
            Ok(path) if !path.trim().is_empty() => {
                let path = PathBuf::from(path.trim());
                let catalog = PatternCatalog::from_json_file(&path)?;
                tracing::info!(
                    path = %path.display(),
                    patterns = catalog.patterns().len(),
                    "loaded pattern catalog from file"
                );
                catalog
            }
            _ => PatternCatalog::builtin(),
        };

        let llm = match LlmConfig::from_env()? {
            Some(config) => {
                tracing::info!(model = %config.model, base_url = %config.base_url, "language model enabled");
                Some(LlmClient::new(config)?)
            }
            None => {
                tracing::warn!("TCM_LLM_BASE_URL not set; consultations use offline replies");
                None
            }
        };

        Ok(Self::new(catalog, llm))
    }
}
