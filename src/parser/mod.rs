//! Parser layer
//! - traits.rs: DescriptorParser trait definition
//! - setup_py.rs: setup.py parser

pub mod setup_py;
pub mod traits;

pub use setup_py::{SetupPyParser, extract_declared_name};
pub use traits::{DescriptorParser, ParseError};
