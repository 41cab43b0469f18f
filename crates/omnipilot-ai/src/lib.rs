//! Streaming chat completions across OpenAI-compatible providers and GitHub
//! Copilot, with normalized errors and model discovery.

mod callbacks;
mod catalog;
mod credentials;
mod dispatch;
mod envelope;
mod error;
mod event_stream;
mod models;
mod providers;
mod sse;
mod stream;
mod transport;
mod types;

pub use callbacks::{ChunkCallback, CompleteCallback, ErrorCallback, StreamCallbacks};
pub use catalog::{CUSTOM_PROVIDER, PROVIDERS, ProviderInfo, detect_provider};
pub use credentials::{
    COPILOT_CHAT_BASE_URL, COPILOT_INTEGRATION_ID, COPILOT_TOKEN_URL, CachedToken, Clock,
    CopilotEndpoints, CopilotTokenManager, TOKEN_EXPIRY_BUFFER,
};
pub use dispatch::{Dispatcher, ask_messages};
pub use envelope::{ErrorEnvelope, normalize_error_body};
pub use error::{OmniAiError, OmniAiErrorCode};
pub use event_stream::{ChatEventStream, ChatResult, EventStream};
pub use models::{discover_models, normalize_model_listing};
pub use providers::ProviderFamily;
pub use sse::{ResponseAccumulator, SseFrameDecoder, Utf8StreamDecoder};
pub use stream::{complete_chat, stream_chat};
pub use transport::{
    ByteChunkSource, ByteStream, ChunkFuture, ChunkReader, HttpChunkReader, ResponseBody,
    decode_body, decode_source,
};
pub use types::{
    AssembledResponse, ChatEvent, ChatOptions, Message, ModelInfo, ModelListing, ProviderConfig,
    Role, TokenUsage, TokenValidation,
};
