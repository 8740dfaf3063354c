//! Run the transcoder over a canned upstream stream, without a server.
//!
//! Usage:
//!   `cargo run --example transcode_only`

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use zai_proxy::translate::normalize::ThinkTagsMode;
use zai_proxy::{aggregate_stream, transcode_stream, SharedLogger, TranscodeOptions};

const UPSTREAM: &str = concat!(
    "data: {\"data\":{\"phase\":\"thinking\",\"delta_content\":\"<details type=\\\"reasoning\\\">\\n> The user wants a greeting.\"}}\n",
    "data: {\"data\":{\"phase\":\"thinking\",\"delta_content\":\"\\n> Keep it short.\"}}\n",
    "data: {\"data\":{\"phase\":\"answer\",\"edit_content\":\"<details type=\\\"reasoning\\\" done=\\\"true\\\">\\n> The user wants a greeting.\\n> Keep it short.\\n</details>\\nHello!\"}}\n",
    "data: {\"data\":{\"phase\":\"answer\",\"delta_content\":\" How can I help?\"}}\n",
    "data: {\"data\":{\"phase\":\"done\",\"done\":true}}\n",
);

/// Feed the canned stream in small pieces, like a slow network would.
fn upstream() -> impl futures::Stream<Item = Result<Bytes, std::io::Error>> {
    let pieces: Vec<Result<Bytes, std::io::Error>> = UPSTREAM
        .as_bytes()
        .chunks(40)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    stream::iter(pieces)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logger = SharedLogger::new(std::env::temp_dir().join("zai-proxy-demo.log"), true)?;
    let options = TranscodeOptions {
        debug: true,
        think_tags_mode: ThinkTagsMode::Strip,
    };

    println!("=== Streaming output (OpenAI SSE) ===");
    let mut out = Box::pin(transcode_stream(
        upstream(),
        "glm-4.5".to_string(),
        options,
        logger.clone(),
    ));
    while let Some(record) = out.next().await {
        print!("{}", String::from_utf8_lossy(&record?));
    }

    println!("=== Aggregated output ===");
    let content = aggregate_stream(upstream(), options, &logger).await;
    println!("{}", content);

    Ok(())
}
