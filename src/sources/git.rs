//! Git fetcher - remote target sources from git repositories.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use git2::{FetchOptions, Repository, ResetType};
use url::Url;

use crate::builder::steps::Fetch;
use crate::core::target::GitReference;
use crate::util::hash::short_hash;

/// Clones remote targets into a cache directory and checks out the
/// requested reference.
#[derive(Debug, Clone)]
pub struct GitFetcher {
    /// Root of all checkouts
    cache_dir: PathBuf,

    /// Never touch the network; only existing checkouts are usable
    offline: bool,

    /// Fetch and re-checkout existing checkouts
    update: bool,
}

impl GitFetcher {
    /// Create a fetcher keeping checkouts under `cache_dir`.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        GitFetcher {
            cache_dir: cache_dir.into(),
            offline: false,
            update: false,
        }
    }

    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn with_update(mut self, update: bool) -> Self {
        self.update = update;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Checkout directory for a repository and reference.
    pub fn checkout_path(&self, url: &Url, reference: &GitReference) -> PathBuf {
        // A unique directory name for this repo + reference
        let dir_name = format!(
            "{}-{}",
            sanitize_url_for_path(url),
            short_hash(&format!("{}#{}", url, reference))
        );
        self.cache_dir.join(dir_name)
    }

    fn clone_repo(&self, url: &Url, path: &Path) -> Result<Repository> {
        tracing::info!("Cloning {}", url);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        Repository::clone(url.as_str(), path).with_context(|| format!("failed to clone {}", url))
    }

    fn update_repo(&self, url: &Url, path: &Path) -> Result<Repository> {
        tracing::info!("Updating {}", url);

        let repo = Repository::open(path)
            .with_context(|| format!("failed to open git repository at {}", path.display()))?;

        {
            let mut remote = repo.find_remote("origin")?;
            let mut options = FetchOptions::new();
            options.download_tags(git2::AutotagOption::All);
            remote
                .fetch(
                    &[
                        "+refs/heads/*:refs/remotes/origin/*",
                        "+refs/tags/*:refs/tags/*",
                    ],
                    Some(&mut options),
                    None,
                )
                .with_context(|| format!("failed to fetch {}", url))?;
        }

        Ok(repo)
    }

    /// Hard-reset the working tree to the reference; returns the commit id.
    fn checkout(&self, repo: &Repository, reference: &GitReference) -> Result<String> {
        let commit = match reference {
            GitReference::DefaultBranch => match repo.find_reference("refs/remotes/origin/HEAD") {
                Ok(origin_head) => origin_head.resolve()?.peel_to_commit()?,
                Err(_) => repo.head()?.peel_to_commit()?,
            },
            GitReference::Branch(branch) => {
                let branch_ref = repo
                    .find_reference(&format!("refs/remotes/origin/{}", branch))
                    .or_else(|_| repo.find_reference(&format!("refs/heads/{}", branch)))
                    .with_context(|| format!("branch `{}` not found", branch))?;
                branch_ref.peel_to_commit()?
            }
            GitReference::Tag(tag) => {
                let tag_ref = repo
                    .find_reference(&format!("refs/tags/{}", tag))
                    .with_context(|| format!("tag `{}` not found", tag))?;
                tag_ref.peel_to_commit()?
            }
            GitReference::Rev(rev) => repo
                .revparse_single(rev)
                .with_context(|| format!("revision `{}` not found", rev))?
                .peel_to_commit()?,
        };

        repo.reset(commit.as_object(), ResetType::Hard, None)?;
        Ok(commit.id().to_string())
    }
}

impl Fetch for GitFetcher {
    fn fetch(&self, url: &Url, reference: &GitReference) -> Result<PathBuf> {
        let path = self.checkout_path(url, reference);
        let cached = path.join(".git").exists();

        let repo = match (cached, self.offline, self.update) {
            (true, false, true) => self.update_repo(url, &path)?,
            (true, _, _) => {
                tracing::debug!("using cached checkout of {}", url);
                return Ok(path);
            }
            (false, true, _) => bail!(
                "{} is not in the cache at {} and offline mode is enabled",
                url,
                path.display()
            ),
            (false, false, _) => self.clone_repo(url, &path)?,
        };

        let commit = self.checkout(&repo, reference)?;
        tracing::debug!("{} ({}) at {}", url, reference, commit);
        Ok(path)
    }
}

/// Sanitize a URL for use as a directory name.
fn sanitize_url_for_path(url: &Url) -> String {
    let mut name = String::new();

    if let Some(host) = url.host_str() {
        name.push_str(host);
    }

    let path = url.path().trim_matches('/');
    if !path.is_empty() {
        if !name.is_empty() {
            name.push('-');
        }
        name.push_str(&path.replace(['/', ':'], "-"));
    }

    // Remove .git suffix
    if name.ends_with(".git") {
        name.truncate(name.len() - 4);
    }

    name
}
