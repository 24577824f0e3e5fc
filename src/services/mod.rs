//! Application services.

pub mod config_writer;
pub mod project_service;
pub mod provisioning_orchestrator;
pub mod submission_service;
pub mod token_generator;

pub use config_writer::ConfigWriter;
pub use project_service::ProjectService;
pub use provisioning_orchestrator::{
    repository_name, template_name, Compensation, ProvisionError, ProvisionOutcome,
    ProvisioningOrchestrator, SagaState,
};
pub use submission_service::{SubmissionError, SubmissionOutcome, SubmissionRequest, SubmissionService};
pub use token_generator::RandomTokenGenerator;
