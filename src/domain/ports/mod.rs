//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces that adapters implement:
//! - ProjectRepository / SubmissionRepository: record persistence
//! - VcsClient: hosting provider operations
//! - IdentityVerifier: end-user session verification
//! - TokenGenerator: project credentials

pub mod identity_verifier;
pub mod project_repository;
pub mod submission_repository;
pub mod token_generator;
pub mod vcs_client;

pub use identity_verifier::{IdentityError, IdentityVerifier};
pub use project_repository::ProjectRepository;
pub use submission_repository::SubmissionRepository;
pub use token_generator::TokenGenerator;
pub use vcs_client::{
    FileCommit, GenerateRepositoryRequest, Installation, Repository, RepositoryFile, VcsClient,
    VcsError, VcsResult, WriteFileRequest,
};
