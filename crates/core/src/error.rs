//! Error taxonomy for the dispatch core.
//!
//! Three layers, with strict propagation rules:
//!
//! - [`TokenError`] is an internal, rule-local signal. Rules convert it to
//!   a non-match; it never escapes the engine.
//! - [`InvokeError`] is raised while binding or running a handler.
//!   `AccessDenied` is special: the engine turns it into a terminal
//!   `Forbidden` outcome instead of an error.
//! - [`DispatchError`] is what the top-level dispatch entry point surfaces
//!   to the transport layer, which decides how to render it.

/// Cursor-level failures inside [`crate::tokens::TokenList`].
///
/// Always local to one rule attempt. A rule that sees one of these reports
/// a non-match and the engine moves on to the next rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// `next` was called with no tokens remaining.
    OutOfTokens,
    /// `next_as_int` found a token that does not parse as an integer.
    /// The cursor is left unmoved.
    NotANumber,
}

/// Failures raised by member invocation, parameter binding, or structural
/// lookup at invocation time.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// A role-guarded member was invoked by a caller lacking the role.
    /// Externally visible as "not permitted", distinct from a generic
    /// handler failure.
    #[error("caller lacks required role `{role}`")]
    AccessDenied { role: String },

    /// The receiver passed to a handler was not the declaring type.
    #[error("receiver is not a `{expected}`")]
    Receiver { expected: &'static str },

    /// A lead argument the descriptor declared was not supplied.
    #[error("missing bound argument {index}")]
    MissingArg { index: usize },

    /// A bound argument had the wrong shape for the accessor used.
    #[error("argument {index} is not a {expected}")]
    ArgType { index: usize, expected: &'static str },

    /// The parameter-binding collaborator could not produce a value.
    #[error("cannot bind parameter `{param}`: {reason}")]
    Binding { param: String, reason: String },

    /// A numeric index matched the rule shape but missed the data.
    #[error("index {index} out of range (len {len})")]
    OutOfRange { index: i64, len: usize },

    /// The handler itself failed.
    #[error("{0}")]
    Handler(String),
}

impl InvokeError {
    /// Shorthand for handler-raised failures.
    pub fn handler(message: impl Into<String>) -> Self {
        InvokeError::Handler(message.into())
    }
}

/// Errors surfaced to the caller of the top-level dispatch entry point.
///
/// Non-match conditions never appear here; they are silent (visible only
/// through the evaluation trace). Terminal outcomes such as not-found and
/// forbidden are not errors either, see [`crate::engine::Outcome`].
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A matched handler raised a failure. Wrapped and re-raised; the
    /// transport layer decides how to render it.
    #[error("handler `{member}` failed: {source}")]
    TargetInvocation {
        member: String,
        #[source]
        source: InvokeError,
    },

    /// A facet failed while producing a view.
    #[error("view `{view}` failed: {reason}")]
    View { view: String, reason: String },
}
