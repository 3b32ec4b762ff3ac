//! Runtime errors.

use graft_dom::DomError;

/// Result type for render passes
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors surfaced by a render/diff pass.
///
/// User lifecycle hooks do not report failure through this type; a
/// panic in user code unwinds the pass. These cover host tree faults
/// the runtime cannot treat as environment quirks.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Dom(#[from] DomError),

    #[error("component `{0}` has no materialized base node")]
    MissingBase(&'static str),
}
