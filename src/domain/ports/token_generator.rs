//! Project token generation port.

/// Produces unguessable per-project credentials.
pub trait TokenGenerator: Send + Sync {
    fn generate(&self) -> String;
}
