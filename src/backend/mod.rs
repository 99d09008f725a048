pub mod ollama;
pub(crate) mod utils;

pub use ollama::Ollama;
pub use utils::strip_reasoning;

#[cfg(test)]
use mockall::{automock, predicate::*};

use crate::{
    config::{BackendConfig, verbose},
    models::{BackendError, GenerateRequest, GenerateResponse, Model},
};
use async_trait::async_trait;
use eyre::Result;
use futures::stream::BoxStream;
use std::sync::Arc;

/// Fragments of one streaming generation, in arrival order. The stream ends
/// after the first fragment with `done` set, or after a transport failure.
pub type FragmentStream = BoxStream<'static, Result<GenerateResponse, BackendError>>;

#[async_trait]
#[cfg_attr(test, automock)]
pub trait Backend {
    fn name(&self) -> &str;
    async fn list_models(&self) -> Result<Vec<Model>>;
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse>;
    async fn generate_stream(&self, request: GenerateRequest) -> Result<FragmentStream>;
}

pub type ArcBackend = Arc<dyn Backend + Send + Sync>;

pub fn new_backend(config: &BackendConfig) -> Result<ArcBackend> {
    if config.endpoint.trim().is_empty() {
        eyre::bail!("No backend endpoint configured");
    }
    let backend: Ollama = config.into();
    verbose!("  [+] Using backend {} at {}", backend.name(), backend.endpoint());
    log::debug!("Configured backend: {}", backend.endpoint());
    Ok(Arc::new(backend))
}
