use crate::driver::api::{FramebufferStatus, ShaderStage};

/// Result alias used across the crate.
pub type CompositeResult<T> = Result<T, CompositeError>;

/// Errors surfaced by the compositing layer.
///
/// Two families matter to callers:
///
/// - **fatal** kinds ([`CompositeError::FramebufferIncomplete`],
///   [`CompositeError::MultisampleUnsupported`], [`CompositeError::Driver`]) abort the
///   initializing call; the surface cannot render until its configuration changes.
/// - **recoverable** kinds ([`CompositeError::ShaderCompile`], [`CompositeError::ShaderLink`])
///   never escape the shader cache; they are logged and recorded, and the affected draw becomes a
///   no-op.
#[derive(thiserror::Error, Debug)]
pub enum CompositeError {
    #[error("framebuffer incomplete: {0}")]
    FramebufferIncomplete(FramebufferStatus),

    #[error("multisampling requested but the driver has no extended profile to configure it")]
    MultisampleUnsupported,

    #[error("shader compile error ({stage}): {log}")]
    ShaderCompile { stage: ShaderStage, log: String },

    #[error("shader link error: {log}")]
    ShaderLink { log: String },

    #[error("driver error: {0}")]
    Driver(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("scheduler error: {0}")]
    Scheduler(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CompositeError {
    pub fn driver(msg: impl Into<String>) -> Self {
        Self::Driver(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn scheduler(msg: impl Into<String>) -> Self {
        Self::Scheduler(msg.into())
    }

    /// Whether this error leaves the surface unable to render.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::FramebufferIncomplete(_) | Self::MultisampleUnsupported | Self::Driver(_)
        )
    }
}

impl From<serde_json::Error> for CompositeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
