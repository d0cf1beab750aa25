//! Fetch cache - one fetch per repository and reference per run.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use url::Url;

use crate::builder::steps::Fetch;
use crate::core::target::GitReference;

type FetchKey = (String, GitReference);

/// Memoises the results of an inner [`Fetch`].
///
/// Failures are remembered too, so a remote that could not be fetched while
/// loading descriptors is reported once, by the executor, as that target's
/// fetch failure.
#[derive(Debug)]
pub struct FetchCache<F> {
    inner: F,
    results: Mutex<HashMap<FetchKey, Result<PathBuf, String>>>,
}

impl<F: Fetch> FetchCache<F> {
    pub fn new(inner: F) -> Self {
        FetchCache {
            inner,
            results: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }

    /// Every fetch attempted so far, ordered by URL.
    pub fn results(&self) -> Vec<(String, GitReference, Result<PathBuf, String>)> {
        let results = self.results.lock().unwrap_or_else(|e| e.into_inner());
        let mut all: Vec<_> = results
            .iter()
            .map(|((url, reference), result)| (url.clone(), reference.clone(), result.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.to_string().cmp(&b.1.to_string())));
        all
    }
}

impl<F: Fetch> Fetch for FetchCache<F> {
    fn fetch(&self, url: &Url, reference: &GitReference) -> Result<PathBuf> {
        let key = (url.to_string(), reference.clone());
        let mut results = self.results.lock().unwrap_or_else(|e| e.into_inner());

        let result = results
            .entry(key)
            .or_insert_with(|| self.inner.fetch(url, reference).map_err(|e| format!("{:#}", e)));

        result.clone().map_err(|message| anyhow!(message))
    }
}
