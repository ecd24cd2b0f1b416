//! Core request-shaping logic for the inline text-completion proxy:
//! coalescing, caching, rate limiting, context classification, prompt
//! assembly, upstream dispatch and post-processing. The HTTP surface lives
//! in `ntp-service`; this crate has no knowledge of HTTP.

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod fingerprint;
pub mod latest_only;
pub mod pipeline;
pub mod postprocess;
pub mod preprocess;
pub mod prompt;
pub mod providers;
pub mod rate_limit;
pub mod single_flight;
pub mod stream;
pub mod types;

mod outbound;

pub use cache::SuggestionCache;
pub use config::Settings;
pub use error::{PipelineError, Result};
pub use latest_only::LatestOnly;
pub use pipeline::Pipeline;
pub use rate_limit::RateLimiter;
pub use single_flight::SingleFlight;
pub use stream::StreamEmitter;
pub use types::{ChatMessage, ChatRole, ContextClass, CursorContext, FewShotExample, ModelOptions};
