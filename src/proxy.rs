use crate::config::ProxyConfig;
use crate::error::Result;
use crate::logging::SharedLogger;
use crate::translate::aggregate::Aggregator;
use crate::translate::normalize::ThinkTagsMode;
use crate::translate::openai_types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::translate::request::{new_chat_id, openai_to_upstream};
use crate::translate::response::completion_response;
use crate::translate::sse::{data_payload, encode_data, SseLine, SseLineBuffer, DONE_RECORD};
use crate::translate::streaming::{FrameOutcome, OutboundChunk, StreamTranscoder};
use crate::translate::upstream_types::{FrameData, UpstreamEvent};
use crate::upstream::{referer, BROWSER_HEADERS};

use bytes::Bytes;
use futures::stream::Stream;
use futures::StreamExt;
use std::fmt::Display;
use std::pin::Pin;

/// Per-request knobs handed to the transcoder and aggregator.
#[derive(Debug, Clone, Copy, Default)]
pub struct TranscodeOptions {
    /// Trace every upstream frame and skipped line.
    pub debug: bool,
    pub think_tags_mode: ThinkTagsMode,
}

impl TranscodeOptions {
    pub fn from_config(config: &ProxyConfig) -> Self {
        Self {
            debug: config.debug_mode,
            think_tags_mode: config.think_tags_mode,
        }
    }
}

/// Outcome of proxying a request: either our own result or the upstream's
/// error status and body, relayed unchanged.
pub enum ProxyResult<T> {
    Success(T),
    UpstreamError { status: u16, body: String },
}

/// SSE-framed OpenAI chunks, ready to be used as a response body.
pub type SseByteStream = Pin<Box<dyn Stream<Item = std::result::Result<Bytes, std::io::Error>> + Send>>;

/// Forward a chat request upstream and stream the translated response.
pub async fn proxy_streaming(
    req: &ChatCompletionRequest,
    model: &str,
    upstream_token: &str,
    config: &ProxyConfig,
    client: &reqwest::Client,
    logger: &SharedLogger,
) -> Result<ProxyResult<SseByteStream>> {
    let response = match open_upstream(req, upstream_token, config, client, logger).await? {
        ProxyResult::Success(r) => r,
        ProxyResult::UpstreamError { status, body } => {
            return Ok(ProxyResult::UpstreamError { status, body });
        }
    };

    let options = TranscodeOptions::from_config(config);
    let stream = transcode_stream(
        response.bytes_stream(),
        model.to_string(),
        options,
        logger.clone(),
    );

    Ok(ProxyResult::Success(Box::pin(stream)))
}

/// Forward a chat request upstream and return one aggregated completion.
pub async fn proxy_non_streaming(
    req: &ChatCompletionRequest,
    model: &str,
    upstream_token: &str,
    config: &ProxyConfig,
    client: &reqwest::Client,
    logger: &SharedLogger,
) -> Result<ProxyResult<ChatCompletionResponse>> {
    let response = match open_upstream(req, upstream_token, config, client, logger).await? {
        ProxyResult::Success(r) => r,
        ProxyResult::UpstreamError { status, body } => {
            return Ok(ProxyResult::UpstreamError { status, body });
        }
    };

    let options = TranscodeOptions::from_config(config);
    let content = aggregate_stream(response.bytes_stream(), options, logger).await;

    logger.info("proxy", format!("Completed: {} chars aggregated", content.len()));

    Ok(ProxyResult::Success(completion_response(content, model)))
}

/// Send the upstream request. The upstream always streams.
async fn open_upstream(
    req: &ChatCompletionRequest,
    upstream_token: &str,
    config: &ProxyConfig,
    client: &reqwest::Client,
    logger: &SharedLogger,
) -> Result<ProxyResult<reqwest::Response>> {
    let chat_id = new_chat_id();
    let body = openai_to_upstream(req, &chat_id);
    let url = &config.upstream.url;

    logger.info(
        "proxy",
        format!("POST {} chat_id={} messages={}", url, chat_id, body.messages.len()),
    );

    let mut builder = client.post(url);
    for (name, value) in BROWSER_HEADERS {
        builder = builder.header(*name, *value);
    }

    let response = builder
        .header("Authorization", format!("Bearer {}", upstream_token))
        .header("Referer", referer(&chat_id))
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                logger.error(
                    "proxy",
                    format!("Failed to read upstream error body (status {}): {}", status.as_u16(), e),
                );
                String::new()
            }
        };
        logger.warn(
            "proxy",
            format!("Upstream error status={}: {}", status.as_u16(), truncate(&body, 300)),
        );
        return Ok(ProxyResult::UpstreamError {
            status: status.as_u16(),
            body,
        });
    }

    Ok(ProxyResult::Success(response))
}

/// Translate an upstream SSE byte stream into OpenAI SSE records.
///
/// Always starts with the role chunk and always ends with one finish chunk
/// followed by `data: [DONE]`, whether the upstream sent its done frame,
/// closed early, or failed mid-read. Records are produced on demand, so the
/// next upstream read waits until the previous record has been taken.
pub fn transcode_stream<S, E>(
    byte_stream: S,
    model: String,
    options: TranscodeOptions,
    logger: SharedLogger,
) -> impl Stream<Item = std::result::Result<Bytes, std::io::Error>> + Send + 'static
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    async_stream::stream! {
        let mut transcoder = StreamTranscoder::new(&model, options.think_tags_mode);
        let mut lines = SseLineBuffer::new();

        for chunk in transcoder.start() {
            if let Some(record) = encode_chunk(&transcoder, chunk) {
                yield Ok(record);
            }
        }

        tokio::pin!(byte_stream);

        'read: while let Some(read) = byte_stream.next().await {
            let bytes = match read {
                Ok(b) => b,
                Err(e) => {
                    logger.error("stream", format!("Upstream read error: {}", e));
                    break;
                }
            };

            for line in lines.push(&bytes) {
                let Some(frame) = parse_frame(line, options, &logger, "stream") else {
                    continue;
                };

                match transcoder.process_frame(&frame) {
                    FrameOutcome::Terminal => {
                        if options.debug {
                            logger.debug("stream", "Upstream signalled done");
                        }
                        break 'read;
                    }
                    FrameOutcome::Continue(chunks) => {
                        for chunk in chunks {
                            if let Some(record) = encode_chunk(&transcoder, chunk) {
                                yield Ok(record);
                            }
                        }
                    }
                }
            }
        }

        for chunk in transcoder.finish() {
            if let Some(record) = encode_chunk(&transcoder, chunk) {
                yield Ok(record);
            }
        }
        yield Ok(Bytes::from_static(DONE_RECORD));

        logger.info(
            "stream",
            format!("Stream completed phase={:?}", transcoder.phase()),
        );
    }
}

/// Collect the answer text of an upstream SSE byte stream.
///
/// Stops at the upstream's done frame or end of stream. A read error ends
/// aggregation with whatever was collected so far.
pub async fn aggregate_stream<S, E>(
    byte_stream: S,
    options: TranscodeOptions,
    logger: &SharedLogger,
) -> String
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Display,
{
    let mut aggregator = Aggregator::new(options.think_tags_mode);
    let mut lines = SseLineBuffer::new();

    tokio::pin!(byte_stream);

    'read: while let Some(read) = byte_stream.next().await {
        let bytes = match read {
            Ok(b) => b,
            Err(e) => {
                logger.error("aggregate", format!("Upstream read error: {}", e));
                break;
            }
        };

        for line in lines.push(&bytes) {
            let Some(frame) = parse_frame(line, options, logger, "aggregate") else {
                continue;
            };
            if aggregator.push_frame(&frame) {
                break 'read;
            }
        }
    }

    aggregator.into_content()
}

/// Parse one complete upstream line. Non-data lines and malformed payloads
/// yield `None`; the latter are traced in debug mode. Oversized lines are
/// always logged.
fn parse_frame(
    line: SseLine,
    options: TranscodeOptions,
    logger: &SharedLogger,
    component: &str,
) -> Option<FrameData> {
    let line = match line {
        SseLine::Text(text) => text,
        SseLine::Oversized(len) => {
            logger.warn(
                component,
                format!("Skipping malformed frame: line of {} bytes exceeds limit", len),
            );
            return None;
        }
    };
    let payload = data_payload(&line)?;
    match serde_json::from_str::<UpstreamEvent>(payload) {
        Ok(event) => {
            if options.debug {
                logger.debug(
                    component,
                    format!(
                        "frame phase={:?} done={:?} len={}",
                        event.data.phase,
                        event.data.done,
                        event.data.content().len()
                    ),
                );
            }
            Some(event.data)
        }
        Err(e) => {
            if options.debug {
                logger.debug(
                    component,
                    format!("Skipping unparseable frame: {}, data: {}", e, truncate(payload, 300)),
                );
            }
            None
        }
    }
}

fn encode_chunk(transcoder: &StreamTranscoder, chunk: OutboundChunk) -> Option<Bytes> {
    encode_data(&transcoder.to_wire(chunk)).ok()
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
