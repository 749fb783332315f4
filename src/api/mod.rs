//! HTTP surface of the gateway.
//!
//! - [`handlers`]: endpoint handlers and shared state
//! - [`auth`]: client API key authentication
//! - [`writer`]: response writers for buffered and streaming transports
//! - [`error_emitter`]: transport-aware error reporting

pub mod auth;
pub mod error_emitter;
pub mod handlers;
pub mod router;
pub mod writer;

pub use error_emitter::{emit_error, encode_error_body, format_sse_error_event};
pub use handlers::{chat_completions, health, metrics_handler, responses, AppState};
pub use router::build_router;
pub use writer::{BufferedWriter, ResponseWriter, SseWriter};
