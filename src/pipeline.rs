//! Resolution pipeline
//!
//! For each requested package, in order:
//! 1. Candidate URLs come from `pkg_name2repo_url`, or else from the links on
//!    the package's index homepage that point at a known host.
//! 2. Each URL is cloned with each VCS configured for its host until one
//!    clone succeeds.
//! 3. The clone's `setup.py` must declare the requested name (ignoring case);
//!    then it is installed. Otherwise the clone is removed and the next URL
//!    is tried.
//!
//! Packages with no verified clone are left out of the result.

use std::path::{Component, Path};
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::config::Configuration;
use crate::error::PisError;
use crate::index::client::HttpClient;
use crate::index::links::{DEFAULT_ENCODING, LinkExtractor, filter_to_known_hosts};
use crate::install::Installer;
use crate::parser::setup_py::SetupPyParser;
use crate::parser::traits::DescriptorParser;
use crate::vcs::cloner::Cloner;
use crate::vcs::kind::vcs_candidates;

/// Package name -> repository URL it was installed from, in request order
pub type ResolutionResult = IndexMap<String, String>;

/// Wires the collaborators used to resolve and install packages
pub struct Pipeline {
    http: Arc<dyn HttpClient>,
    cloner: Arc<dyn Cloner>,
    installer: Arc<dyn Installer>,
    parser: SetupPyParser,
    links: LinkExtractor,
}

impl Pipeline {
    pub fn new(
        http: Arc<dyn HttpClient>,
        cloner: Arc<dyn Cloner>,
        installer: Arc<dyn Installer>,
    ) -> Self {
        Self {
            http,
            cloner,
            installer,
            parser: SetupPyParser::new(),
            links: LinkExtractor::new(),
        }
    }

    /// Resolves, clones, verifies and installs each of `package_names` under
    /// `working_dir`.
    ///
    /// A package that cannot be found is simply missing from the result, as
    /// is one whose rejected clone cannot be removed. Errors (an index page
    /// that does not answer 200, a failed install) abort the whole batch.
    pub async fn resolve_and_install(
        &self,
        package_names: &[String],
        working_dir: &Path,
        config: &Configuration,
    ) -> Result<ResolutionResult, PisError> {
        let mut founds = ResolutionResult::new();

        for pkg_name in package_names {
            if !is_plain_name(pkg_name) {
                warn!("Skipping '{}': not a valid package name", pkg_name);
                continue;
            }

            match self.resolve_package(pkg_name, working_dir, config).await? {
                Some(repo_url) => {
                    founds.insert(pkg_name.clone(), repo_url);
                }
                None => info!("No repository found for {}", pkg_name),
            }
        }

        Ok(founds)
    }

    async fn resolve_package(
        &self,
        pkg_name: &str,
        working_dir: &Path,
        config: &Configuration,
    ) -> Result<Option<String>, PisError> {
        let pkg_dir = working_dir.join(pkg_name);

        for repo_url in self.candidate_urls(pkg_name, config).await? {
            match self.clone_repo(&repo_url, &pkg_dir, config).await {
                Some(true) => {}
                Some(false) => continue,
                None => return Ok(None),
            }

            if verify_pkg_dir(&self.parser, &pkg_dir, pkg_name) {
                self.installer.install(&pkg_dir).await?;
                info!("Installed {} from {}", pkg_name, repo_url);
                return Ok(Some(repo_url));
            }

            info!(
                "{} is not the repository of {}, removing {}",
                repo_url,
                pkg_name,
                pkg_dir.display()
            );
            if !remove_dir(&pkg_dir).await {
                return Ok(None);
            }
        }

        Ok(None)
    }

    /// Known repository URL, or links to known hosts from the index homepage
    async fn candidate_urls(
        &self,
        pkg_name: &str,
        config: &Configuration,
    ) -> Result<Vec<String>, PisError> {
        if let Some(repo_url) = config.repo_url_for(pkg_name) {
            debug!("Using configured repository for {}: {}", pkg_name, repo_url);
            return Ok(vec![repo_url.to_string()]);
        }

        let homepage = config.pypi_url_for(pkg_name);
        let response = self.http.get(&homepage).await?;
        if response.status != 200 {
            return Err(PisError::UnexpectedStatus {
                url: homepage,
                status: response.status,
            });
        }

        let links = self.links.extract_links(
            &response.body,
            response.encoding.as_deref(),
            DEFAULT_ENCODING,
        );
        let repo_urls = filter_to_known_hosts(&links, &config.known_hosts());
        debug!(
            "Found {} candidate repositories for {} out of {} links",
            repo_urls.len(),
            pkg_name,
            links.len()
        );

        Ok(repo_urls)
    }

    /// Tries every VCS configured for the URL's host until one clone
    /// succeeds. An attempt that fails and leaves a fresh directory behind
    /// has it removed, so the next attempt starts from the same empty path.
    ///
    /// `None` when such a directory cannot be removed.
    async fn clone_repo(
        &self,
        repo_url: &str,
        dest: &Path,
        config: &Configuration,
    ) -> Option<bool> {
        for candidate in vcs_candidates(repo_url, config) {
            let existed = dest.exists();

            if self.cloner.clone_repo(&candidate, dest).await {
                return Some(true);
            }

            debug!("Cloning {} with {} failed", repo_url, candidate.kind);
            if !existed && dest.exists() && !remove_dir(dest).await {
                return None;
            }
        }

        Some(false)
    }
}

/// Checks that `pkg_dir` holds a descriptor declaring `pkg_name`.
///
/// Names are compared ignoring case, as the package index does. A missing,
/// unreadable or unparsable descriptor does not match. Bytes are decoded by
/// the parser, so descriptors in other encodings are still read.
pub fn verify_pkg_dir(parser: &dyn DescriptorParser, pkg_dir: &Path, pkg_name: &str) -> bool {
    let descriptor = pkg_dir.join(parser.file_name());

    let content = match std::fs::read(&descriptor) {
        Ok(bytes) => parser.decode(&bytes),
        Err(e) => {
            debug!("Cannot read {}: {}", descriptor.display(), e);
            return false;
        }
    };

    match parser.declared_name(&content) {
        Ok(Some(declared)) => {
            debug!("{} declares {}", descriptor.display(), declared);
            declared.to_lowercase() == pkg_name.to_lowercase()
        }
        Ok(None) => {
            debug!("{} declares no recognizable name", descriptor.display());
            false
        }
        Err(e) => {
            debug!("Cannot parse {}: {}", descriptor.display(), e);
            false
        }
    }
}

/// A name usable as a single directory below the working directory
fn is_plain_name(pkg_name: &str) -> bool {
    let mut components = Path::new(pkg_name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Removes a rejected clone; false when it had to be left behind
async fn remove_dir(path: &Path) -> bool {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => true,
        Err(e) => {
            warn!(
                "Failed to remove {}: {}, skipping the remaining candidates",
                path.display(),
                e
            );
            false
        }
    }
}
