//! Test doubles for the pipeline collaborators

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use pis::config::Configuration;
use pis::error::{FetchError, InstallError};
use pis::index::{HttpClient, HttpResponse};
use pis::install::Installer;
use pis::vcs::{Cloner, VcsCandidate, VcsKind};

/// Configuration shared by the integration tests
pub fn test_config() -> Configuration {
    serde_json::from_value(json!({
        "repo_hosts2vcses": {
            "github.com": ["git"],
            "bitbucket.org": ["git", "hg"]
        },
        "pkg_name2repo_url": {
            "pis": "https://github.com/xliiv/pis"
        },
        "pypi_url": "https://pypi.example/project/{pkg_name}/"
    }))
    .unwrap()
}

/// Serves canned pages and records every requested URL
#[derive(Default)]
pub struct FakeHttpClient {
    pages: HashMap<String, HttpResponse>,
    requests: Mutex<Vec<String>>,
}

impl FakeHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages
            .insert(url.to_string(), HttpResponse::ok(body.as_bytes()));
        self
    }

    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.pages.insert(
            url.to_string(),
            HttpResponse {
                status,
                encoding: None,
                body: Vec::new(),
            },
        );
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for FakeHttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        Ok(self.pages.get(url).cloned().unwrap_or(HttpResponse {
            status: 404,
            encoding: None,
            body: Vec::new(),
        }))
    }
}

/// Clones succeed only for registered (kind, url) pairs, producing a checkout
/// whose setup.py declares the registered name
#[derive(Default)]
pub struct FakeCloner {
    repos: HashMap<(VcsKind, String), String>,
    attempts: Mutex<Vec<(VcsKind, String, PathBuf)>>,
}

impl FakeCloner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(mut self, kind: VcsKind, url: &str, declared_name: &str) -> Self {
        self.repos
            .insert((kind, url.to_string()), declared_name.to_string());
        self
    }

    pub fn attempts(&self) -> Vec<(VcsKind, String, PathBuf)> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Cloner for FakeCloner {
    async fn clone_repo(&self, candidate: &VcsCandidate, dest: &Path) -> bool {
        self.attempts.lock().unwrap().push((
            candidate.kind,
            candidate.url.clone(),
            dest.to_path_buf(),
        ));

        match self.repos.get(&(candidate.kind, candidate.url.clone())) {
            Some(declared_name) => {
                fs::create_dir_all(dest.join(candidate.kind.metadata_dir())).unwrap();
                fs::write(
                    dest.join("setup.py"),
                    format!("from setuptools import setup\n\nsetup(\n    name=\"{declared_name}\",\n)\n"),
                )
                .unwrap();
                true
            }
            None => {
                // failed clones may leave a partial checkout behind
                fs::create_dir_all(dest.join(candidate.kind.metadata_dir())).unwrap();
                false
            }
        }
    }
}

/// Records installed directories; optionally fails every install
#[derive(Default)]
pub struct RecordingInstaller {
    fail: bool,
    installed: Mutex<Vec<PathBuf>>,
}

impl RecordingInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn installed(&self) -> Vec<PathBuf> {
        self.installed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Installer for RecordingInstaller {
    async fn install(&self, pkg_dir: &Path) -> Result<(), InstallError> {
        self.installed.lock().unwrap().push(pkg_dir.to_path_buf());
        if self.fail {
            return Err(InstallError::Spawn {
                program: "pip".to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        Ok(())
    }
}
