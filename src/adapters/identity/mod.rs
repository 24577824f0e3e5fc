//! Identity verifier adapters.

pub mod supabase;

pub use supabase::SupabaseIdentityVerifier;
