//! Descriptor loader - finds every descriptor reachable from the root.
//!
//! Loading follows dependency declarations for one [`RunConfig`], so a
//! dependency disabled by a flag is never loaded or fetched.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::builder::steps::Fetch;
use crate::core::manifest::{DescriptorManifest, DESCRIPTOR_NAME};
use crate::core::recipe::FnRecipe;
use crate::core::target::{DependencySpec, DescriptorSet, Origin, TargetDescriptor};
use crate::core::RunConfig;
use crate::resolver::ResolveError;

/// Descriptors loaded for one run.
#[derive(Debug)]
pub struct LoadedProject {
    /// Name of the root target
    pub root: String,
    pub descriptors: DescriptorSet,
}

/// Loads the root descriptor and everything it depends on.
pub struct DescriptorLoader<'a> {
    cfg: &'a RunConfig,
    fetcher: &'a dyn Fetch,
}

impl<'a> DescriptorLoader<'a> {
    pub fn new(cfg: &'a RunConfig, fetcher: &'a dyn Fetch) -> Self {
        DescriptorLoader { cfg, fetcher }
    }

    /// Load from the root `Mast.toml`.
    ///
    /// A remote dependency that cannot be fetched is still registered, with
    /// no source directory and no dependencies, so that only its own subtree
    /// fails once the executor reaches it.
    pub fn load(&self, root_manifest: &Path) -> Result<LoadedProject> {
        let root_dir = root_manifest
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let root = DescriptorManifest::load(root_manifest)?.into_descriptor(Origin::Root, &root_dir)?;
        let root_name = root.name().to_string();

        let mut origins: HashMap<String, Origin> = HashMap::new();
        origins.insert(root_name.clone(), Origin::Root);

        let mut descriptors = DescriptorSet::new();
        let mut queue = VecDeque::from([root]);

        while let Some(descriptor) = queue.pop_front() {
            for spec in descriptor.dependencies(self.cfg) {
                match origins.get(&spec.name) {
                    // A dependency back onto the root is a cycle; the graph builder reports it
                    Some(Origin::Root) => continue,
                    Some(origin) if *origin == spec.origin => continue,
                    Some(origin) => {
                        return Err(ResolveError::AmbiguousTarget {
                            name: spec.name.clone(),
                            first: origin.to_string(),
                            second: spec.origin.to_string(),
                        }
                        .into())
                    }
                    None => {}
                }
                origins.insert(spec.name.clone(), spec.origin.clone());
                queue.push_back(self.load_dependency(&spec, descriptor.name())?);
            }
            descriptors.insert(descriptor)?;
        }

        tracing::debug!("loaded {} descriptors", descriptors.len());

        Ok(LoadedProject {
            root: root_name,
            descriptors,
        })
    }

    fn load_dependency(&self, spec: &DependencySpec, required_by: &str) -> Result<TargetDescriptor> {
        match &spec.origin {
            Origin::Local { path } => {
                if !path.is_dir() {
                    let missing: Result<TargetDescriptor, ResolveError> =
                        Err(ResolveError::UnresolvedDependency {
                            name: spec.name.clone(),
                            required_by: required_by.to_string(),
                        });
                    return missing.with_context(|| {
                        format!(
                            "dependency `{}` points to {}, which is not a directory",
                            spec.name,
                            path.display()
                        )
                    });
                }
                load_dir(&spec.name, spec.origin.clone(), path)
            }
            Origin::Remote { url, reference } => match self.fetcher.fetch(url, reference) {
                Ok(dir) => load_dir(&spec.name, spec.origin.clone(), &dir),
                Err(e) => {
                    tracing::warn!("failed to fetch `{}`: {:#}", spec.name, e);
                    Ok(TargetDescriptor::new(
                        spec.name.clone(),
                        spec.origin.clone(),
                        FnRecipe::new(),
                    ))
                }
            },
            Origin::Root => bail!("dependency `{}` cannot refer to the root project", spec.name),
        }
    }
}

/// Descriptor of a dependency directory, implicit when it has no `Mast.toml`.
fn load_dir(name: &str, origin: Origin, dir: &Path) -> Result<TargetDescriptor> {
    let path = dir.join(DESCRIPTOR_NAME);
    let manifest = if path.is_file() {
        DescriptorManifest::load(&path)?
    } else {
        tracing::debug!("no {} in {}; using an implicit descriptor", DESCRIPTOR_NAME, dir.display());
        DescriptorManifest::implicit(name, dir)
    };

    if manifest.target.name != name {
        bail!(
            "{} declares target `{}`, but it is required as `{}`",
            path.display(),
            manifest.target.name,
            name
        );
    }

    manifest
        .into_descriptor(origin, dir)
        .with_context(|| format!("failed to load dependency `{}`", name))
}
