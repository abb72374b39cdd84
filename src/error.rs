use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the simulation core.
///
/// Numerical degeneracy in collision prediction is not an error: it is reported
/// as an infinite collision time and simply never scheduled. The variants below
/// cover bad input and misuse of the engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid particle record or configuration value.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// Numerical or geometric issue (e.g., coincident centres at a pair collision).
    #[error("numerical error: {0}")]
    MathError(String),

    /// Operation not permitted in the engine's current state.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_is_informative() {
        let e = Error::InvalidParam("radius must be > 0".to_string());
        let msg = format!("{e}");
        assert!(msg.contains("invalid parameter"));
        assert!(msg.contains("radius"));
    }

    #[test]
    fn invalid_state_mentions_reason() {
        let e = Error::InvalidState("simulation already terminated");
        assert_eq!(e.to_string(), "invalid state: simulation already terminated");
    }
}
