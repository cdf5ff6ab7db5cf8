use thiserror::Error;

/// Errors raised by graph and engine operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// No vertex with this id exists in the area graph.
    #[error("unknown room: {0}")]
    UnknownRoom(String),

    /// The exit has no compass code, so it has no opposite direction.
    #[error("exit '{0}' is not a compass direction")]
    NotACompassDirection(String),
}
