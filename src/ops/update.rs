//! Implementation of `mast update`.

use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::core::Origin;
use crate::ops::resolve::{RunOptions, Session};
use crate::util::GlobalContext;

/// A remote dependency brought up to date.
#[derive(Debug, Clone)]
pub struct UpdatedTarget {
    pub name: String,
    pub origin: String,
    pub checkout: PathBuf,
}

/// Re-fetch every remote dependency reachable under the current flags.
pub fn update(ctx: &GlobalContext, opts: &RunOptions) -> Result<Vec<UpdatedTarget>> {
    let session = Session::open_with(ctx, opts, true)?;
    let loaded = session.load()?;

    let failed: Vec<String> = session
        .fetcher()
        .results()
        .into_iter()
        .filter_map(|(url, _, result)| result.err().map(|e| format!("{}: {}", url, e)))
        .collect();
    if !failed.is_empty() {
        bail!("failed to update {} remote(s):\n  {}", failed.len(), failed.join("\n  "));
    }

    let updated = loaded
        .descriptors
        .iter()
        .filter(|d| matches!(d.origin(), Origin::Remote { .. }))
        .filter_map(|d| {
            d.source_dir().map(|dir| UpdatedTarget {
                name: d.name().to_string(),
                origin: d.origin().to_string(),
                checkout: dir.to_path_buf(),
            })
        })
        .collect();

    Ok(updated)
}
