pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod proxy;
pub mod server;
pub mod translate;
pub mod upstream;

pub use config::ProxyConfig;
pub use error::{ProxyError, Result};
pub use logging::SharedLogger;
pub use proxy::{aggregate_stream, transcode_stream, TranscodeOptions};
pub use server::{build_router, AppState};
