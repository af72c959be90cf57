//! Repository link extraction
//!
//! Works on raw text rather than parsed HTML, so links inside `href="..."`
//! attributes and bare links in prose are found alike.

use encoding_rs::{Encoding, UTF_8};
use regex::Regex;
use tracing::debug;

/// Encoding assumed when a response does not declare one
pub const DEFAULT_ENCODING: &str = "utf-8";

/// Extracts `http://` and `https://` links from a document
pub struct LinkExtractor {
    /// Scheme followed by any run of characters allowed in web links
    link_re: Regex,
}

impl LinkExtractor {
    pub fn new() -> Self {
        Self {
            link_re: Regex::new(
                r"http[s]?://(?:[a-zA-Z]|[0-9]|[$-_@.&+]|[!*\(\),]|(?:%[0-9a-fA-F][0-9a-fA-F]))+",
            )
            .unwrap(),
        }
    }

    /// Decodes `document` and returns every link in order of appearance.
    ///
    /// `declared_encoding` (e.g. the response charset) wins over
    /// `fallback_encoding`; unknown labels fall back to UTF-8. Duplicates are
    /// kept.
    pub fn extract_links(
        &self,
        document: &[u8],
        declared_encoding: Option<&str>,
        fallback_encoding: &str,
    ) -> Vec<String> {
        let encoding = declared_encoding
            .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
            .or_else(|| Encoding::for_label(fallback_encoding.trim().as_bytes()))
            .unwrap_or(UTF_8);
        let (content, _, had_errors) = encoding.decode(document);
        if had_errors {
            debug!("Document is not valid {}, decoded lossily", encoding.name());
        }

        self.link_re
            .find_iter(&content)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

impl Default for LinkExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps urls containing any of `known_hosts` as a plain substring
pub fn filter_to_known_hosts<S: AsRef<str>>(urls: &[String], known_hosts: &[S]) -> Vec<String> {
    urls.iter()
        .filter(|url| known_hosts.iter().any(|host| url.contains(host.as_ref())))
        .cloned()
        .collect()
}
