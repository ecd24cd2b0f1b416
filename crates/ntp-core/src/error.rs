use std::fmt;

/// Errors that can occur while assembling, dispatching, or post-processing
/// a completion request.
///
/// Mirrors the taxonomy in the design doc: every variant here maps to one of
/// the HTTP-layer outcomes (empty completion vs. propagated 500) described
/// there, but this type itself carries no HTTP awareness.
#[derive(Debug, Clone)]
pub enum PipelineError {
    /// The request was short-circuited by a preprocessor (e.g. the cursor
    /// sits inside a dataview block) or produced no messages to send.
    ShortCircuited,
    /// Transport-level failure talking to the upstream provider.
    Upstream(String),
    /// The upstream call exceeded its hard timeout.
    Timeout,
    /// Post-processing left nothing usable, or the mask sentinel survived.
    Guardrail(String),
    /// A configuration value was missing or invalid.
    Config(String),
    /// The prompt template failed to render (unknown variable, syntax error).
    Template(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::ShortCircuited => write!(f, "short-circuited"),
            PipelineError::Upstream(e) => write!(f, "upstream error: {}", e),
            PipelineError::Timeout => write!(f, "upstream timed out"),
            PipelineError::Guardrail(e) => write!(f, "guardrail failed: {}", e),
            PipelineError::Config(e) => write!(f, "configuration error: {}", e),
            PipelineError::Template(e) => write!(f, "template error: {}", e),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        PipelineError::Upstream(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Upstream(format!("malformed upstream response: {}", err))
    }
}

impl From<minijinja::Error> for PipelineError {
    fn from(err: minijinja::Error) -> Self {
        PipelineError::Template(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
