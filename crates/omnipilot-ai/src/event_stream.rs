use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, Notify, mpsc};

use crate::error::OmniAiError;
use crate::types::{AssembledResponse, ChatEvent};

type CompletionFn<T, R> = dyn Fn(&T) -> Option<R> + Send + Sync;

struct EventStreamInner<T, R> {
    sender: mpsc::UnboundedSender<T>,
    receiver: AsyncMutex<mpsc::UnboundedReceiver<T>>,
    completion: Arc<CompletionFn<T, R>>,
    final_result: Mutex<Option<R>>,
    event_notify: Notify,
    final_notify: Notify,
    done: AtomicBool,
}

impl<T, R> EventStreamInner<T, R> {
    fn final_result(&self) -> MutexGuard<'_, Option<R>> {
        self.final_result
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Multi-reader event queue that also resolves to a terminal result.
///
/// The first event for which `completion` returns `Some` fixes the result;
/// events pushed after that are dropped.
pub struct EventStream<T, R> {
    inner: Arc<EventStreamInner<T, R>>,
}

impl<T, R> Clone for EventStream<T, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, R> EventStream<T, R>
where
    T: Clone + Send + 'static,
    R: Clone + Send + 'static,
{
    pub fn new<F>(completion: F) -> Self
    where
        F: Fn(&T) -> Option<R> + Send + Sync + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(EventStreamInner {
                sender,
                receiver: AsyncMutex::new(receiver),
                completion: Arc::new(completion),
                final_result: Mutex::new(None),
                event_notify: Notify::new(),
                final_notify: Notify::new(),
                done: AtomicBool::new(false),
            }),
        }
    }

    pub fn push(&self, event: T) {
        if self.inner.done.load(Ordering::SeqCst) {
            return;
        }

        if let Some(result) = (self.inner.completion)(&event) {
            let mut guard = self.inner.final_result();
            if guard.is_none() {
                *guard = Some(result);
                self.inner.done.store(true, Ordering::SeqCst);
            }
            drop(guard);
            self.inner.final_notify.notify_waiters();
        }

        let _ = self.inner.sender.send(event);
        self.inner.event_notify.notify_waiters();
    }

    pub fn end(&self, result: Option<R>) {
        if self.inner.done.load(Ordering::SeqCst) {
            return;
        }

        if let Some(result) = result {
            let mut guard = self.inner.final_result();
            if guard.is_none() {
                *guard = Some(result);
            }
        }

        self.inner.done.store(true, Ordering::SeqCst);
        self.inner.event_notify.notify_waiters();
        self.inner.final_notify.notify_waiters();
    }

    pub async fn next(&self) -> Option<T> {
        loop {
            let notified = self.inner.event_notify.notified();
            {
                let mut receiver = self.inner.receiver.lock().await;
                match receiver.try_recv() {
                    Ok(event) => return Some(event),
                    Err(mpsc::error::TryRecvError::Disconnected) => return None,
                    Err(mpsc::error::TryRecvError::Empty) => {
                        if self.inner.done.load(Ordering::SeqCst) {
                            return None;
                        }
                    }
                }
            }

            notified.await;
        }
    }

    pub async fn result(&self) -> Option<R> {
        loop {
            let notified = self.inner.final_notify.notified();
            if let Some(result) = self.inner.final_result().clone() {
                return Some(result);
            }

            if self.inner.done.load(Ordering::SeqCst) {
                return None;
            }

            notified.await;
        }
    }
}

pub type ChatResult = Result<AssembledResponse, OmniAiError>;

/// Event view of one chat completion: zero or more `Delta`s followed by a
/// single `Done` or `Error`.
#[derive(Clone)]
pub struct ChatEventStream {
    inner: EventStream<ChatEvent, ChatResult>,
}

impl ChatEventStream {
    pub fn new() -> Self {
        let inner = EventStream::new(|event| match event {
            ChatEvent::Done(response) => Some(Ok(response.clone())),
            ChatEvent::Error(error) => Some(Err(error.clone())),
            ChatEvent::Delta(_) => None,
        });
        Self { inner }
    }

    pub fn push(&self, event: ChatEvent) {
        self.inner.push(event);
    }

    pub fn end(&self, result: Option<ChatResult>) {
        self.inner.end(result);
    }

    pub async fn next(&self) -> Option<ChatEvent> {
        self.inner.next().await
    }

    pub async fn result(&self) -> Option<ChatResult> {
        self.inner.result().await
    }
}

impl Default for ChatEventStream {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OmniAiErrorCode;

    #[tokio::test]
    async fn done_event_resolves_result_and_drops_later_events() {
        let stream = ChatEventStream::new();
        stream.push(ChatEvent::Delta("Hi".to_string()));
        stream.push(ChatEvent::Done(AssembledResponse {
            full_text: "Hi".to_string(),
            usage: None,
        }));
        stream.push(ChatEvent::Delta("late".to_string()));

        assert_eq!(stream.next().await, Some(ChatEvent::Delta("Hi".to_string())));
        assert!(matches!(stream.next().await, Some(ChatEvent::Done(_))));
        assert_eq!(stream.next().await, None);

        let result = stream.result().await.expect("terminal result");
        assert_eq!(result.expect("success").full_text, "Hi");
    }

    #[tokio::test]
    async fn error_event_resolves_to_error() {
        let stream = ChatEventStream::new();
        stream.push(ChatEvent::Error(OmniAiError::new(
            OmniAiErrorCode::Timeout,
            "Stream timed out after 1.0s without data",
        )));

        let error = stream
            .result()
            .await
            .expect("terminal result")
            .expect_err("error result");
        assert_eq!(error.code, OmniAiErrorCode::Timeout);
    }

    #[tokio::test]
    async fn end_without_result_unblocks_readers() {
        let stream = ChatEventStream::new();
        let reader = stream.clone();
        let waiter = tokio::spawn(async move { reader.result().await });
        stream.end(None);
        assert!(waiter.await.expect("join").is_none());
    }
}
