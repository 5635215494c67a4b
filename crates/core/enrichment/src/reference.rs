use std::{collections::VecDeque, sync::Arc};

use futures::lock::Mutex;
use vigil_result::{create_error, Result};

use crate::{AbstractLanguageModel, InlineImage};

/// Scripted mock model
///
/// Completions are served from a queue in order; an exhausted queue
/// behaves like an unavailable upstream service.
#[derive(Clone, Default)]
pub struct ReferenceModel {
    pub responses: Arc<Mutex<VecDeque<Result<String>>>>,
}

impl ReferenceModel {
    /// Queue a successful completion
    pub async fn queue_response(&self, text: impl Into<String>) {
        self.responses.lock().await.push_back(Ok(text.into()));
    }

    /// Queue a failed completion
    pub async fn queue_failure(&self) {
        self.responses
            .lock()
            .await
            .push_back(Err(create_error!(EnrichmentFailed)));
    }
}

#[async_trait]
impl AbstractLanguageModel for ReferenceModel {
    async fn complete(
        &self,
        _system: &str,
        _prompt: &str,
        _images: &[InlineImage],
    ) -> Result<String> {
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(create_error!(EnrichmentFailed)))
    }
}
