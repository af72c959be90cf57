//! Version control layer
//!
//! - kind.rs: VCS kinds and host based candidate resolution
//! - cloner.rs: `Cloner` trait and the subprocess implementation

pub mod cloner;
pub mod kind;

pub use cloner::{Cloner, CommandCloner};
pub use kind::{VcsCandidate, VcsKind, netloc, resolve_vcs_candidates, vcs_candidates};
