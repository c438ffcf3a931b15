use healthchat_core::types::RetrievalResult;
use healthchat_core::Result;

/// Turns a query and its retrieved passages into the answer text.
pub trait AnswerGenerator: Send + Sync {
    fn generate(&self, query: &str, retrieved: &RetrievalResult) -> Result<String>;
}

/// Echoes the head of the retrieved context inside a fixed advisory frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextEcho {
    pub preview_chars: usize,
}

impl Default for ContextEcho {
    fn default() -> Self {
        Self { preview_chars: 500 }
    }
}

impl ContextEcho {
    pub fn new(preview_chars: usize) -> Self {
        Self { preview_chars }
    }
}

impl AnswerGenerator for ContextEcho {
    fn generate(&self, _query: &str, retrieved: &RetrievalResult) -> Result<String> {
        let context = retrieved.context("\n\n");
        let preview: String = context.chars().take(self.preview_chars).collect();
        Ok(format!(
            "Based on our medical guidelines:\n\n{}...\n\n(Disclaimer: Please consult a doctor.)",
            preview
        ))
    }
}
