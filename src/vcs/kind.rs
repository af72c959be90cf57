//! VCS kinds and host to VCS resolution

use tracing::warn;

use crate::config::Configuration;

/// Version control systems a repository can be cloned with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VcsKind {
    /// git
    Git,
    /// Mercurial
    Mercurial,
    /// Subversion
    Subversion,
    /// Bazaar
    Bazaar,
}

impl VcsKind {
    /// Returns the name used in `repo_hosts2vcses`
    pub fn as_str(&self) -> &'static str {
        match self {
            VcsKind::Git => "git",
            VcsKind::Mercurial => "hg",
            VcsKind::Subversion => "svn",
            VcsKind::Bazaar => "bzr",
        }
    }

    /// Directory a checkout of this kind keeps its metadata in
    pub fn metadata_dir(&self) -> &'static str {
        match self {
            VcsKind::Git => ".git",
            VcsKind::Mercurial => ".hg",
            VcsKind::Subversion => ".svn",
            VcsKind::Bazaar => ".bzr",
        }
    }
}

impl std::str::FromStr for VcsKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "git" => Ok(VcsKind::Git),
            "hg" => Ok(VcsKind::Mercurial),
            "svn" => Ok(VcsKind::Subversion),
            "bzr" => Ok(VcsKind::Bazaar),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for VcsKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One clone attempt: a repository URL and the VCS to try it with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcsCandidate {
    pub kind: VcsKind,
    pub url: String,
}

/// Network location (`host[:port]`) of a URL, without user info.
///
/// The text is returned as written, with no case or port normalization, so it
/// can be used as an exact key into `repo_hosts2vcses`.
pub fn netloc(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("://")?;
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..end];
    let host = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host);

    (!host.is_empty()).then_some(host)
}

/// Ordered VCS kind names configured for the URL's host; empty when the host
/// is unknown.
pub fn resolve_vcs_candidates(url: &str, config: &Configuration) -> Vec<String> {
    netloc(url)
        .map(|netloc| config.vcs_names_for_host(netloc))
        .unwrap_or_default()
}

/// Clone attempts for `url`, in configured order. Names that are not a known
/// [`VcsKind`] are skipped.
pub fn vcs_candidates(url: &str, config: &Configuration) -> Vec<VcsCandidate> {
    resolve_vcs_candidates(url, config)
        .into_iter()
        .filter_map(|name| match name.parse::<VcsKind>() {
            Ok(kind) => Some(VcsCandidate {
                kind,
                url: url.to_string(),
            }),
            Err(()) => {
                warn!("Skipping unknown VCS '{}' configured for {}", name, url);
                None
            }
        })
        .collect()
}
