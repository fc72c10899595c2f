//! testsmith-core: pipeline logic for testsmith.
//!
//! This crate contains the orchestration pipeline that turns selected repository files
//! into generated tests published as a pull request. It has no HTTP-server dependencies.
//!
//! # Usage
//! - [`retrieve`] lists a repository's files and fetches blob contents.
//! - [`prompt`] builds prompts and validates the generation service's answers.
//! - [`publish`] commits generated code to a new branch and opens a pull request.
//! - [`session`] keeps the per-caller credentials.
//! - [`github`] and [`gemini`] are the production collaborators behind the traits
//!   in [`contract`].

pub mod config;
pub mod contract;
pub mod error;
pub mod gemini;
pub mod github;
pub mod prompt;
pub mod publish;
pub mod retrieve;
pub mod session;

pub use error::{GenerationError, HostingError, PipelineError};
