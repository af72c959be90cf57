//! Clone collaborator
//!
//! A clone attempt either succeeds or fails; failures are expected and drive
//! the fallback to the next VCS kind or URL.

#[cfg(test)]
use mockall::automock;

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::vcs::kind::{VcsCandidate, VcsKind};

/// Trait for obtaining a repository checkout
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Cloner: Send + Sync {
    /// Clones `candidate` into `dest`, or updates `dest` to the latest
    /// revision when it already holds a checkout of the same kind tracking
    /// `candidate.url`.
    ///
    /// Returns false when the VCS reports a failure or when `dest` holds a
    /// checkout of another remote.
    async fn clone_repo(&self, candidate: &VcsCandidate, dest: &Path) -> bool;
}

/// [`Cloner`] running the VCS command line clients
#[derive(Debug, Default)]
pub struct CommandCloner;

impl CommandCloner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Cloner for CommandCloner {
    async fn clone_repo(&self, candidate: &VcsCandidate, dest: &Path) -> bool {
        let update = dest.join(candidate.kind.metadata_dir()).is_dir();

        if update {
            let remote = checkout_remote(candidate.kind, dest).await;
            if !remote.as_deref().is_some_and(|remote| same_remote(remote, &candidate.url)) {
                info!(
                    "{} is a checkout of {}, not {}",
                    dest.display(),
                    remote.as_deref().unwrap_or("an unknown remote"),
                    candidate.url
                );
                return false;
            }
            info!("Updating {} ({}) from {}", dest.display(), candidate.kind, candidate.url);
        } else {
            info!("Cloning {} ({}) into {}", candidate.url, candidate.kind, dest.display());
        }

        let (program, args) = obtain_command(candidate, dest, update);
        debug!("Running {} {:?}", program, args);

        match vcs_command(candidate.kind, program, &args)
            .stdin(Stdio::null())
            .status()
            .await
        {
            Ok(status) if status.success() => true,
            Ok(status) => {
                debug!("{} exited with {} for {}", program, status, candidate.url);
                false
            }
            Err(e) => {
                warn!("Failed to run {}: {}", program, e);
                false
            }
        }
    }
}

/// Command for a VCS client that never prompts on the terminal
fn vcs_command(kind: VcsKind, program: &str, args: &[OsString]) -> Command {
    let mut command = Command::new(program);
    command.args(args);
    if kind == VcsKind::Git {
        command.env("GIT_TERMINAL_PROMPT", "0");
    }
    command
}

/// URL the checkout in `dest` was obtained from, if the VCS reports one
async fn checkout_remote(kind: VcsKind, dest: &Path) -> Option<String> {
    let (program, args) = remote_command(kind, dest);

    let output = match vcs_command(kind, program, &args)
        .stdin(Stdio::null())
        .output()
        .await
    {
        Ok(output) if output.status.success() => output,
        Ok(output) => {
            debug!("{} exited with {} reading the remote", program, output.status);
            return None;
        }
        Err(e) => {
            warn!("Failed to run {}: {}", program, e);
            return None;
        }
    };

    let remote = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!remote.is_empty()).then_some(remote)
}

/// Program and arguments printing the remote a checkout tracks
pub fn remote_command(kind: VcsKind, dest: &Path) -> (&'static str, Vec<OsString>) {
    let dest = dest.as_os_str().to_os_string();

    let args: Vec<OsString> = match kind {
        VcsKind::Git => vec![
            "-C".into(),
            dest,
            "remote".into(),
            "get-url".into(),
            "origin".into(),
        ],
        VcsKind::Mercurial => vec!["paths".into(), "default".into(), "-R".into(), dest],
        VcsKind::Subversion => vec!["info".into(), "--show-item".into(), "url".into(), dest],
        VcsKind::Bazaar => vec!["config".into(), "-d".into(), dest, "parent_location".into()],
    };

    (kind.as_str(), args)
}

/// Remote URLs are equal up to trailing slashes
fn same_remote(remote: &str, url: &str) -> bool {
    remote.trim_end_matches('/') == url.trim_end_matches('/')
}

/// Program and arguments that clone `candidate` into `dest`, or update an
/// existing checkout when `update` is set.
pub fn obtain_command(
    candidate: &VcsCandidate,
    dest: &Path,
    update: bool,
) -> (&'static str, Vec<OsString>) {
    let url = OsString::from(&candidate.url);
    let dest = dest.as_os_str().to_os_string();

    let args: Vec<OsString> = match (candidate.kind, update) {
        (VcsKind::Git, false) => vec!["clone".into(), "--quiet".into(), url, dest],
        (VcsKind::Git, true) => vec!["-C".into(), dest, "pull".into(), "--quiet".into()],
        (VcsKind::Mercurial, false) => vec!["clone".into(), "--quiet".into(), url, dest],
        (VcsKind::Mercurial, true) => vec![
            "pull".into(),
            "--update".into(),
            "--quiet".into(),
            "-R".into(),
            dest,
        ],
        (VcsKind::Subversion, false) => vec!["checkout".into(), "--quiet".into(), url, dest],
        (VcsKind::Subversion, true) => vec!["update".into(), "--quiet".into(), dest],
        (VcsKind::Bazaar, false) => vec!["branch".into(), "--quiet".into(), url, dest],
        (VcsKind::Bazaar, true) => vec!["pull".into(), "--quiet".into(), "-d".into(), dest],
    };

    (candidate.kind.as_str(), args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn candidate(kind: VcsKind) -> VcsCandidate {
        VcsCandidate {
            kind,
            url: "https://example.com/repo".to_string(),
        }
    }

    #[rstest]
    #[case(VcsKind::Git, false, "git", vec!["clone", "--quiet", "https://example.com/repo", "work/pkg"])]
    #[case(VcsKind::Git, true, "git", vec!["-C", "work/pkg", "pull", "--quiet"])]
    #[case(VcsKind::Mercurial, false, "hg", vec!["clone", "--quiet", "https://example.com/repo", "work/pkg"])]
    #[case(VcsKind::Mercurial, true, "hg", vec!["pull", "--update", "--quiet", "-R", "work/pkg"])]
    #[case(VcsKind::Subversion, false, "svn", vec!["checkout", "--quiet", "https://example.com/repo", "work/pkg"])]
    #[case(VcsKind::Subversion, true, "svn", vec!["update", "--quiet", "work/pkg"])]
    #[case(VcsKind::Bazaar, false, "bzr", vec!["branch", "--quiet", "https://example.com/repo", "work/pkg"])]
    #[case(VcsKind::Bazaar, true, "bzr", vec!["pull", "--quiet", "-d", "work/pkg"])]
    fn obtain_command_returns_expected(
        #[case] kind: VcsKind,
        #[case] update: bool,
        #[case] expected_program: &str,
        #[case] expected_args: Vec<&str>,
    ) {
        let (program, args) = obtain_command(&candidate(kind), Path::new("work/pkg"), update);

        assert_eq!(program, expected_program);
        assert_eq!(
            args,
            expected_args
                .into_iter()
                .map(OsString::from)
                .collect::<Vec<_>>()
        );
    }

    #[rstest]
    #[case(VcsKind::Git, "git", vec!["-C", "work/pkg", "remote", "get-url", "origin"])]
    #[case(VcsKind::Mercurial, "hg", vec!["paths", "default", "-R", "work/pkg"])]
    #[case(VcsKind::Subversion, "svn", vec!["info", "--show-item", "url", "work/pkg"])]
    #[case(VcsKind::Bazaar, "bzr", vec!["config", "-d", "work/pkg", "parent_location"])]
    fn remote_command_returns_expected(
        #[case] kind: VcsKind,
        #[case] expected_program: &str,
        #[case] expected_args: Vec<&str>,
    ) {
        let (program, args) = remote_command(kind, Path::new("work/pkg"));

        assert_eq!(program, expected_program);
        assert_eq!(
            args,
            expected_args
                .into_iter()
                .map(OsString::from)
                .collect::<Vec<_>>()
        );
    }

    #[rstest]
    #[case("https://github.com/xliiv/pis", "https://github.com/xliiv/pis", true)]
    #[case("https://github.com/xliiv/pis/", "https://github.com/xliiv/pis", true)]
    #[case("https://github.com/xliiv/pis", "https://github.com/other/pis", false)]
    #[case("https://github.com/xliiv/pis.git", "https://github.com/xliiv/pis", false)]
    fn same_remote_returns_expected(#[case] remote: &str, #[case] url: &str, #[case] expected: bool) {
        assert_eq!(same_remote(remote, url), expected);
    }

    #[rstest]
    #[case(VcsKind::Git, true)]
    #[case(VcsKind::Mercurial, false)]
    fn vcs_command_disables_git_terminal_prompt(#[case] kind: VcsKind, #[case] expected: bool) {
        let command = vcs_command(kind, kind.as_str(), &[]);

        let disabled = command.as_std().get_envs().any(|(key, value)| {
            key == "GIT_TERMINAL_PROMPT" && value == Some(std::ffi::OsStr::new("0"))
        });
        assert_eq!(disabled, expected);
    }

    fn git_available() -> bool {
        std::process::Command::new("git")
            .arg("--version")
            .output()
            .is_ok_and(|output| output.status.success())
    }

    fn git(args: &[&str]) {
        let status = std::process::Command::new("git")
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .status()
            .unwrap();
        assert!(status.success(), "git {:?} failed", args);
    }

    /// A local origin repository and a clone of it at `<tmp>/pkg`
    fn local_checkout() -> (TempDir, String, std::path::PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let origin = temp_dir.path().join("origin");
        let dest = temp_dir.path().join("pkg");
        let origin_str = origin.to_str().unwrap().to_string();

        git(&["init", "--quiet", &origin_str]);
        git(&[
            "-C",
            &origin_str,
            "-c",
            "user.name=pis",
            "-c",
            "user.email=pis@example.com",
            "commit",
            "--allow-empty",
            "--quiet",
            "-m",
            "init",
        ]);
        git(&["clone", "--quiet", &origin_str, dest.to_str().unwrap()]);

        (temp_dir, origin_str, dest)
    }

    #[tokio::test]
    async fn existing_checkout_of_another_remote_is_not_updated() {
        if !git_available() {
            return;
        }
        let (_temp_dir, _origin, dest) = local_checkout();
        let candidate = VcsCandidate {
            kind: VcsKind::Git,
            url: "https://github.com/nobody/does-not-exist".to_string(),
        };

        assert!(!CommandCloner::new().clone_repo(&candidate, &dest).await);
        assert!(dest.join(".git").is_dir());
    }

    #[tokio::test]
    async fn existing_checkout_of_same_remote_is_updated() {
        if !git_available() {
            return;
        }
        let (_temp_dir, origin, dest) = local_checkout();
        let candidate = VcsCandidate {
            kind: VcsKind::Git,
            url: origin,
        };

        assert!(CommandCloner::new().clone_repo(&candidate, &dest).await);
    }

    #[tokio::test]
    async fn checkout_without_readable_remote_is_not_updated() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("pkg");
        std::fs::create_dir_all(dest.join(".hg")).unwrap();
        let candidate = VcsCandidate {
            kind: VcsKind::Mercurial,
            url: "https://example.com/repo".to_string(),
        };

        assert!(!CommandCloner::new().clone_repo(&candidate, &dest).await);
    }
}
