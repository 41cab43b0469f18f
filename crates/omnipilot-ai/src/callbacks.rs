use crate::error::OmniAiError;
use crate::types::AssembledResponse;

pub type ChunkCallback = Box<dyn FnMut(&str) + Send>;
pub type CompleteCallback = Box<dyn FnOnce(&AssembledResponse) + Send>;
pub type ErrorCallback = Box<dyn FnOnce(&OmniAiError) + Send>;

/// Hooks invoked while a chat completion streams.
///
/// `on_chunk` sees each delta (never the accumulated text). Exactly one of
/// `on_complete` / `on_error` runs when the call finishes.
#[derive(Default)]
pub struct StreamCallbacks {
    pub on_chunk: Option<ChunkCallback>,
    pub on_complete: Option<CompleteCallback>,
    pub on_error: Option<ErrorCallback>,
}

impl StreamCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_chunk(mut self, callback: impl FnMut(&str) + Send + 'static) -> Self {
        self.on_chunk = Some(Box::new(callback));
        self
    }

    pub fn on_complete(mut self, callback: impl FnOnce(&AssembledResponse) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl FnOnce(&OmniAiError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }
}
