//! HTTP API adapter.

pub mod projects_http;

pub use projects_http::{ProjectsHttpConfig, ProjectsHttpServer};
