//! pis: install a Python package as a cloned repository from a guessed VCS.
//!
//! # Modules
//!
//! - [`config`]: layered JSON configuration (bundled default + user file)
//! - [`index`]: package index HTTP client and homepage link extraction
//! - [`vcs`]: host to VCS mapping and the clone collaborator
//! - [`parser`]: static `setup.py` parsing to confirm package identity
//! - [`install`]: editable install collaborator
//! - [`pipeline`]: resolve, clone, verify and install a batch of packages
//! - [`update`]: merge the published latest configuration
//! - [`error`]: error types shared across layers
//! - [`logging`]: tracing subscriber setup for the CLI

pub mod config;
pub mod error;
pub mod index;
pub mod install;
pub mod logging;
pub mod parser;
pub mod pipeline;
pub mod update;
pub mod vcs;
