use std::ops::Range;

use smol_str::SmolStr;

use crate::MethodDescriptor;

/// Turns a pointcut signature such as `java.lang.String java.lang.String.concat(java.lang.String)`
/// into a method descriptor.
pub trait PointcutParser: Send + Sync {
    fn parse_pointcut(&self, signature: &str) -> Result<MethodDescriptor, PointcutParseError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid pointcut `{signature}`: {message}")]
pub struct PointcutParseError {
    pub signature: SmolStr,
    pub message: String,
    /// Byte range of the offending text within `signature`.
    pub span: Option<Range<usize>>,
    /// Pre-rendered source snippet, if the parser produced one.
    pub rendered: Option<String>,
}

impl PointcutParseError {
    pub fn new(signature: impl Into<SmolStr>, message: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            message: message.into(),
            span: None,
            rendered: None,
        }
    }

    pub fn with_span(mut self, span: Range<usize>) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_rendered(mut self, rendered: String) -> Self {
        self.rendered = Some(rendered);
        self
    }
}
