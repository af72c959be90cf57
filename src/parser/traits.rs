//! Parser trait definition

/// Trait for statically reading a project's build descriptor
pub trait DescriptorParser: Send + Sync {
    /// File name of the descriptor inside a project directory
    fn file_name(&self) -> &'static str;

    /// Decode the raw descriptor bytes; invalid sequences are replaced.
    fn decode(&self, bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }

    /// Extract the declared package name without executing the descriptor.
    ///
    /// `Ok(None)` means the descriptor is valid but no recognized declaration
    /// was found.
    fn declared_name(&self, content: &str) -> Result<Option<String>, ParseError>;
}

/// Error type for parsing operations
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Failed to parse the file structure
    #[error("Failed to parse file: {0}")]
    ParseFailed(String),

    /// Invalid syntax in the file
    #[error("Invalid syntax: {0}")]
    InvalidSyntax(String),

    /// Tree-sitter related error
    #[error("Tree-sitter error: {0}")]
    TreeSitter(String),
}
