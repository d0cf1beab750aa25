//! Target descriptors - the immutable record of one buildable unit.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::recipe::Recipe;
use crate::core::run_config::RunConfig;
use crate::resolver::ResolveError;

/// Git reference specification for remote targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitReference {
    /// Default branch (usually main/master)
    #[default]
    DefaultBranch,
    /// Specific branch
    Branch(String),
    /// Specific tag
    Tag(String),
    /// Specific revision
    Rev(String),
}

impl fmt::Display for GitReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitReference::DefaultBranch => f.write_str("HEAD"),
            GitReference::Branch(b) => write!(f, "branch={}", b),
            GitReference::Tag(t) => write!(f, "tag={}", t),
            GitReference::Rev(r) => write!(f, "rev={}", r),
        }
    }
}

/// Where a target's source materializes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Fetched from a git repository
    Remote { url: Url, reference: GitReference },
    /// A directory on the local filesystem
    Local { path: PathBuf },
    /// The root project itself
    Root,
}

impl Origin {
    /// Remote origin on the default branch.
    pub fn remote(url: &str) -> Result<Self, url::ParseError> {
        Ok(Origin::Remote {
            url: Url::parse(url)?,
            reference: GitReference::DefaultBranch,
        })
    }

    pub fn local(path: impl Into<PathBuf>) -> Self {
        Origin::Local { path: path.into() }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Origin::Remote { .. })
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Remote { url, reference } => match reference {
                GitReference::DefaultBranch => write!(f, "git+{}", url),
                other => write!(f, "git+{}#{}", url, other),
            },
            Origin::Local { path } => write!(f, "path+{}", path.display()),
            Origin::Root => f.write_str("root"),
        }
    }
}

/// A declared dependency: the name it must resolve to and where it comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    pub name: String,
    pub origin: Origin,
}

impl DependencySpec {
    pub fn new(name: impl Into<String>, origin: Origin) -> Self {
        DependencySpec {
            name: name.into(),
            origin,
        }
    }
}

/// An immutable description of one buildable unit.
#[derive(Clone)]
pub struct TargetDescriptor {
    name: String,
    origin: Origin,
    global_workspace: Option<String>,
    source_dir: Option<PathBuf>,
    recipe: Arc<dyn Recipe>,
}

impl TargetDescriptor {
    pub fn new(name: impl Into<String>, origin: Origin, recipe: impl Recipe + 'static) -> Self {
        Self::with_recipe(name, origin, Arc::new(recipe))
    }

    pub fn with_recipe(name: impl Into<String>, origin: Origin, recipe: Arc<dyn Recipe>) -> Self {
        let source_dir = match &origin {
            Origin::Local { path } => Some(path.clone()),
            _ => None,
        };
        TargetDescriptor {
            name: name.into(),
            origin,
            global_workspace: None,
            source_dir,
            recipe,
        }
    }

    /// Share build products with every target declaring the same key.
    pub fn with_global_workspace(mut self, key: impl Into<String>) -> Self {
        self.global_workspace = Some(key.into());
        self
    }

    /// Set where the target's sources live on disk.
    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = Some(dir.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn global_workspace(&self) -> Option<&str> {
        self.global_workspace.as_deref()
    }

    /// Source directory, if known. Remote targets only have one after fetching.
    pub fn source_dir(&self) -> Option<&Path> {
        self.source_dir.as_deref()
    }

    pub fn recipe(&self) -> &dyn Recipe {
        self.recipe.as_ref()
    }

    /// Dependencies declared for this run's configuration.
    pub fn dependencies(&self, cfg: &RunConfig) -> Vec<DependencySpec> {
        self.recipe.dependencies(cfg)
    }
}

impl fmt::Debug for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetDescriptor")
            .field("name", &self.name)
            .field("origin", &self.origin)
            .field("global_workspace", &self.global_workspace)
            .field("source_dir", &self.source_dir)
            .finish_non_exhaustive()
    }
}

/// The set of descriptors supplied to the graph builder.
///
/// Names are unique; insertion order is kept for stable iteration.
#[derive(Debug, Clone, Default)]
pub struct DescriptorSet {
    targets: Vec<TargetDescriptor>,
    index: HashMap<String, usize>,
}

impl DescriptorSet {
    pub fn new() -> Self {
        DescriptorSet::default()
    }

    /// Build a set from descriptors, failing on the first duplicate name.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = TargetDescriptor>,
    ) -> Result<Self, ResolveError> {
        let mut set = DescriptorSet::new();
        for descriptor in descriptors {
            set.insert(descriptor)?;
        }
        Ok(set)
    }

    /// Add a descriptor, rejecting a second descriptor with the same name.
    pub fn insert(&mut self, descriptor: TargetDescriptor) -> Result<(), ResolveError> {
        if self.index.contains_key(descriptor.name()) {
            return Err(ResolveError::DuplicateTarget {
                name: descriptor.name().to_string(),
            });
        }
        self.index
            .insert(descriptor.name().to_string(), self.targets.len());
        self.targets.push(descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TargetDescriptor> {
        self.index.get(name).map(|&i| &self.targets[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TargetDescriptor> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::recipe::FnRecipe;

    #[test]
    fn test_origin_display() {
        let remote = Origin::remote("https://github.com/RedFox20/ReCpp.git").unwrap();
        assert_eq!(remote.to_string(), "git+https://github.com/RedFox20/ReCpp.git");

        let tagged = Origin::Remote {
            url: Url::parse("https://example.com/lib.git").unwrap(),
            reference: GitReference::Tag("v1.2".to_string()),
        };
        assert_eq!(tagged.to_string(), "git+https://example.com/lib.git#tag=v1.2");
        assert_eq!(Origin::Root.to_string(), "root");
        assert!(tagged.is_remote());
    }

    #[test]
    fn test_local_origin_sets_source_dir() {
        let desc = TargetDescriptor::new("FbxSdk", Origin::local("/src/FBX"), FnRecipe::new());
        assert_eq!(desc.source_dir(), Some(Path::new("/src/FBX")));

        let remote = TargetDescriptor::new(
            "ReCpp",
            Origin::remote("https://github.com/RedFox20/ReCpp.git").unwrap(),
            FnRecipe::new(),
        );
        assert!(remote.source_dir().is_none());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut set = DescriptorSet::new();
        set.insert(TargetDescriptor::new("Lib", Origin::Root, FnRecipe::new()))
            .unwrap();

        let err = set
            .insert(TargetDescriptor::new("Lib", Origin::local("/other"), FnRecipe::new()))
            .unwrap_err();
        assert!(matches!(err, ResolveError::DuplicateTarget { ref name } if name == "Lib"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_from_descriptors_keeps_order() {
        let set = DescriptorSet::from_descriptors(vec![
            TargetDescriptor::new("A", Origin::Root, FnRecipe::new()),
            TargetDescriptor::new("B", Origin::local("b"), FnRecipe::new()),
        ])
        .unwrap();

        let names: Vec<_> = set.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }
}
