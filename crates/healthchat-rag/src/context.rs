//! Startup wiring. Everything a request handler needs lives in `AppContext`,
//! built once and passed by reference.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use healthchat_core::config::Settings;
use healthchat_core::traits::Embedder;
use healthchat_core::Result;
use healthchat_recommend::KeywordMap;
use healthchat_vector::FlatIndex;

use crate::answer::ContextEcho;
use crate::chat::ChatService;
use crate::retriever::{Retriever, RetrieverStatus};

pub struct AppContext {
    settings: Settings,
    chat: ChatService,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// `ok` when chat can be served, `degraded` when only recommendations can.
    pub status: String,
    pub retriever: RetrieverStatus,
    pub keywords: usize,
}

impl AppContext {
    /// A bad keyword map is fatal; a missing or unusable index only leaves
    /// the retriever unavailable.
    pub fn bootstrap(settings: Settings, embedder: Arc<dyn Embedder>) -> Result<Self> {
        settings.validate()?;
        let keywords = Arc::new(KeywordMap::load(&settings.data.keyword_map_path())?);
        let retriever = Arc::new(Retriever::load(embedder, &settings.data.index_path()));
        let chat = ChatService::new(retriever, keywords, settings.retrieval.top_k)
            .with_generator(Box::new(ContextEcho::new(settings.answer.preview_chars)));
        info!(available = chat.retriever().is_available(), "Application context ready");
        Ok(Self { settings, chat })
    }

    pub fn from_parts(settings: Settings, chat: ChatService) -> Self {
        Self { settings, chat }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn chat(&self) -> &ChatService {
        &self.chat
    }

    pub fn retriever(&self) -> &Arc<Retriever> {
        self.chat.retriever()
    }

    /// Reload the index from the configured path and publish it. On failure
    /// the current index keeps serving.
    pub fn reload_index(&self) -> Result<()> {
        let index = FlatIndex::load(&self.settings.data.index_path())?;
        self.retriever().swap_index(Arc::new(index))
    }

    pub fn health(&self) -> HealthReport {
        let retriever = self.retriever().status();
        let status = if retriever.available { "ok" } else { "degraded" };
        HealthReport { status: status.to_string(), retriever, keywords: self.chat.keywords().len() }
    }
}
