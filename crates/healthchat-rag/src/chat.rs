//! Chat request handling: retrieval, answer generation and recommendations.

use std::sync::Arc;

use tracing::{debug, warn};

use healthchat_core::types::{ChatRequest, ChatResponse, Recommendation};
use healthchat_core::{Error, Result};
use healthchat_recommend::{match_recommendations, KeywordMap};

use crate::answer::{AnswerGenerator, ContextEcho};
use crate::retriever::Retriever;

pub struct ChatService {
    retriever: Arc<Retriever>,
    keywords: Arc<KeywordMap>,
    generator: Box<dyn AnswerGenerator>,
    top_k: usize,
}

impl ChatService {
    pub fn new(retriever: Arc<Retriever>, keywords: Arc<KeywordMap>, top_k: usize) -> Self {
        Self { retriever, keywords, generator: Box::new(ContextEcho::default()), top_k }
    }

    #[must_use]
    pub fn with_generator(mut self, generator: Box<dyn AnswerGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn retriever(&self) -> &Arc<Retriever> {
        &self.retriever
    }

    pub fn keywords(&self) -> &Arc<KeywordMap> {
        &self.keywords
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Fails with `ServiceUnavailable` whenever retrieval cannot run; the
    /// caller may retry once an index is available.
    pub fn handle_chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let recommendations = self.recommend(&request.message);
        let retrieved = self.retriever.retrieve(&request.message, self.top_k).map_err(|e| {
            warn!("Chat retrieval failed: {}", e);
            match e {
                Error::RetrieverUnavailable(reason) => {
                    Error::ServiceUnavailable(format!("RAG system not initialized: {}", reason))
                }
                other => Error::ServiceUnavailable(other.to_string()),
            }
        })?;
        let answer = self.generator.generate(&request.message, &retrieved)?;
        debug!(hits = retrieved.len(), recommendations = recommendations.len(), "chat handled");
        Ok(ChatResponse { answer, sources: retrieved.sources(), recommendations })
    }

    /// Recommendations only; works without an index.
    pub fn recommend(&self, query: &str) -> Vec<Recommendation> {
        match_recommendations(query, &self.keywords)
    }
}

pub fn handle_chat(request: &ChatRequest, retriever: &Arc<Retriever>, keywords: &Arc<KeywordMap>, top_k: usize) -> Result<ChatResponse> {
    ChatService::new(Arc::clone(retriever), Arc::clone(keywords), top_k).handle_chat(request)
}
