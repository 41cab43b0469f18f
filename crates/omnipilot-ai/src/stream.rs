use std::sync::Arc;

use crate::callbacks::StreamCallbacks;
use crate::dispatch::Dispatcher;
use crate::error::{OmniAiError, OmniAiErrorCode};
use crate::event_stream::ChatEventStream;
use crate::types::{AssembledResponse, ChatEvent, ChatOptions, Message, ProviderConfig};

/// Runs a chat completion in the background and exposes it as events.
///
/// Works with or without an ambient Tokio runtime.
pub fn stream_chat(
    dispatcher: Arc<Dispatcher>,
    config: ProviderConfig,
    messages: Vec<Message>,
    options: ChatOptions,
) -> ChatEventStream {
    let stream = ChatEventStream::new();
    let writer = stream.clone();
    spawn_provider_task(async move {
        let delta_writer = writer.clone();
        let callbacks = StreamCallbacks::new()
            .on_chunk(move |delta| delta_writer.push(ChatEvent::Delta(delta.to_string())));
        let result = dispatcher
            .stream_chat_completion(&config, &messages, &options, callbacks)
            .await;
        match result {
            Ok(response) => writer.push(ChatEvent::Done(response)),
            Err(error) => writer.push(ChatEvent::Error(error)),
        }
        writer.end(None);
    });
    stream
}

pub async fn complete_chat(
    dispatcher: Arc<Dispatcher>,
    config: ProviderConfig,
    messages: Vec<Message>,
    options: ChatOptions,
) -> Result<AssembledResponse, OmniAiError> {
    let event_stream = stream_chat(dispatcher, config, messages, options);
    event_stream.result().await.unwrap_or_else(|| {
        Err(OmniAiError::new(
            OmniAiErrorCode::ProviderProtocol,
            "Stream ended without terminal message",
        ))
    })
}

fn spawn_provider_task<F>(task: F)
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        handle.spawn(task);
        return;
    }

    std::thread::spawn(move || {
        if let Ok(runtime) = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            runtime.block_on(task);
        }
    });
}
