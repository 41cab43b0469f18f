//! Response bodies as "bytes arrive over time".
//!
//! Two body shapes are accepted: a pull-style [`ChunkReader`] that must be
//! cancelled explicitly, and a push-style stream of buffers. Both are wrapped
//! in a [`ByteChunkSource`] so the SSE decoding loop only sees one shape.

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tracing::{debug, trace};

use crate::error::{OmniAiError, OmniAiErrorCode};
use crate::sse::{SseFrameDecoder, Utf8StreamDecoder};
use crate::types::AssembledResponse;

pub type ChunkFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>, OmniAiError>> + Send + 'a>>;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, OmniAiError>> + Send>>;

/// Pull-style body: the consumer requests each chunk and releases the reader
/// with [`ChunkReader::cancel`] when it stops reading.
pub trait ChunkReader: Send {
    /// Resolves to `None` once the body is exhausted.
    fn read_chunk(&mut self) -> ChunkFuture<'_>;
    fn cancel(&mut self);
}

pub trait ByteChunkSource: Send {
    fn next_chunk(&mut self) -> ChunkFuture<'_>;
}

pub enum ResponseBody {
    Reader(Box<dyn ChunkReader>),
    Iterable(ByteStream),
    Missing,
}

impl ResponseBody {
    pub fn from_reader(reader: impl ChunkReader + 'static) -> Self {
        Self::Reader(Box::new(reader))
    }

    pub fn from_stream<S, B, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<B, E>> + Send + 'static,
        B: AsRef<[u8]> + 'static,
        E: Display + 'static,
    {
        Self::Iterable(Box::pin(stream.map(|item| {
            item.map(|buffer| buffer.as_ref().to_vec()).map_err(|error| {
                OmniAiError::new(
                    OmniAiErrorCode::ProviderTransport,
                    format!("Stream read failed: {error}"),
                )
            })
        })))
    }

    /// An HTTP response always carries a body, possibly an empty one.
    pub fn from_response(response: reqwest::Response) -> Self {
        Self::from_reader(HttpChunkReader::new(response))
    }
}

pub struct HttpChunkReader {
    response: Option<reqwest::Response>,
}

impl HttpChunkReader {
    pub fn new(response: reqwest::Response) -> Self {
        Self {
            response: Some(response),
        }
    }
}

impl ChunkReader for HttpChunkReader {
    fn read_chunk(&mut self) -> ChunkFuture<'_> {
        Box::pin(async move {
            let Some(response) = self.response.as_mut() else {
                return Ok(None);
            };
            response
                .chunk()
                .await
                .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
                .map_err(|error| {
                    OmniAiError::new(
                        OmniAiErrorCode::ProviderTransport,
                        format!("Stream read failed: {error}"),
                    )
                })
        })
    }

    fn cancel(&mut self) {
        // Dropping the response closes the connection.
        if self.response.take().is_some() {
            debug!("released HTTP response body");
        }
    }
}

/// Owns a pull reader and cancels it when dropped, so every exit path
/// (completion, error, or the caller abandoning the future) releases it.
struct ReaderSource {
    reader: Option<Box<dyn ChunkReader>>,
}

impl ReaderSource {
    fn new(reader: Box<dyn ChunkReader>) -> Self {
        Self {
            reader: Some(reader),
        }
    }

    fn release(&mut self) {
        if let Some(mut reader) = self.reader.take() {
            reader.cancel();
        }
    }
}

impl ByteChunkSource for ReaderSource {
    fn next_chunk(&mut self) -> ChunkFuture<'_> {
        match self.reader.as_mut() {
            Some(reader) => reader.read_chunk(),
            None => Box::pin(async { Ok(None) }),
        }
    }
}

impl Drop for ReaderSource {
    fn drop(&mut self) {
        self.release();
    }
}

struct IterableSource {
    stream: ByteStream,
}

impl ByteChunkSource for IterableSource {
    fn next_chunk(&mut self) -> ChunkFuture<'_> {
        Box::pin(async move { self.stream.next().await.transpose() })
    }
}

/// Picks the adapter for `body` and decodes it into an [`AssembledResponse`].
pub async fn decode_body<F>(
    body: ResponseBody,
    idle_timeout: Option<Duration>,
    on_chunk: F,
) -> Result<AssembledResponse, OmniAiError>
where
    F: FnMut(&str) + Send,
{
    let mut source: Box<dyn ByteChunkSource> = match body {
        ResponseBody::Reader(reader) => Box::new(ReaderSource::new(reader)),
        ResponseBody::Iterable(stream) => Box::new(IterableSource { stream }),
        ResponseBody::Missing => {
            return Err(OmniAiError::new(
                OmniAiErrorCode::ResponseBodyMissing,
                "Response body is not readable",
            ));
        }
    };
    decode_source(source.as_mut(), idle_timeout, on_chunk).await
}

pub async fn decode_source<F>(
    source: &mut dyn ByteChunkSource,
    idle_timeout: Option<Duration>,
    mut on_chunk: F,
) -> Result<AssembledResponse, OmniAiError>
where
    F: FnMut(&str) + Send,
{
    let mut utf8 = Utf8StreamDecoder::new();
    let mut decoder = SseFrameDecoder::new();

    while let Some(bytes) = next_chunk_within(source, idle_timeout).await? {
        let text = utf8.decode(&bytes);
        decoder.feed(&text, &mut on_chunk);
    }

    let tail = utf8.finish();
    if !tail.is_empty() {
        trace!(bytes = tail.len(), "discarding undecoded tail at end of stream");
    }
    Ok(decoder.finish())
}

async fn next_chunk_within(
    source: &mut dyn ByteChunkSource,
    idle_timeout: Option<Duration>,
) -> Result<Option<Vec<u8>>, OmniAiError> {
    let Some(limit) = idle_timeout else {
        return source.next_chunk().await;
    };
    match tokio::time::timeout(limit, source.next_chunk()).await {
        Ok(result) => result,
        Err(_) => Err(OmniAiError::new(
            OmniAiErrorCode::Timeout,
            format!(
                "Stream timed out after {:.1}s without data",
                limit.as_secs_f64()
            ),
        )),
    }
}
