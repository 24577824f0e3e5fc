//! DSA Lab - exercise repository provisioning
//!
//! Provisions a private GitHub repository per (user, exercise, language)
//! from a template, writes the workspace config the exercise CLI reads, and
//! records the attempt so test submissions can update progress.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, errors and port traits
//! - **Adapters** (`adapters`): SQLite store, GitHub App client, identity
//!   verifier and the HTTP API
//! - **Service Layer** (`services`): The provisioning saga, project and
//!   submission services
//! - **Infrastructure Layer** (`infrastructure`): Configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use dsalab::services::ProvisioningOrchestrator;
//!
//! let outcome = orchestrator.provision("user-1", "min-heap", "python").await?;
//! println!("{}", outcome.repository_url);
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{Catalog, Config, Language, Project, ProjectStatus};
pub use domain::ports::{ProjectRepository, VcsClient, VcsError};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{ProvisionError, ProvisionOutcome, ProvisioningOrchestrator};
