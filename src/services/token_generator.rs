//! Project token generation.

use uuid::Uuid;

use crate::domain::ports::TokenGenerator;

/// 64 hex characters drawn from two v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokenGenerator;

impl TokenGenerator for RandomTokenGenerator {
    fn generate(&self) -> String {
        format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
    }
}
