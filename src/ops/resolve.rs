//! Shared setup for every command that resolves the target graph.

use anyhow::Result;

use crate::core::manifest::DescriptorManifest;
use crate::core::{FeatureFlags, Platform, Project, RunConfig, Toggle, WorkspaceManager};
use crate::resolver::{build_graph, TargetGraph};
use crate::sources::{DescriptorLoader, FetchCache, GitFetcher, LoadedProject};
use crate::util::config::{load_config, Config};
use crate::util::GlobalContext;

/// Run configuration as requested on the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Explicit feature-flag toggles
    pub toggles: Vec<Toggle>,

    /// Target platform (defaults to the host)
    pub platform: Option<Platform>,

    pub release: bool,

    /// Build this target instead of the root descriptor's
    pub target: Option<String>,

    /// Test arguments; `Some` requests the test stage
    pub test_args: Option<String>,
}

/// A loaded project with its resolved run configuration.
pub struct Session {
    pub project: Project,
    pub config: Config,
    pub cfg: RunConfig,
    fetcher: FetchCache<GitFetcher>,
    shared_root: std::path::PathBuf,
}

impl Session {
    /// Locate the root descriptor and resolve the run configuration.
    ///
    /// Flag defaults come from the root descriptor's `[flags]`, then the
    /// merged configuration files; explicit toggles override both.
    pub fn open(ctx: &GlobalContext, opts: &RunOptions) -> Result<Self> {
        Self::open_with(ctx, opts, false)
    }

    /// Like [`Session::open`], re-fetching remote checkouts when `update` is set.
    pub fn open_with(ctx: &GlobalContext, opts: &RunOptions, update: bool) -> Result<Self> {
        let project = Project::new(&ctx.find_descriptor()?)?;
        let config = load_config(&ctx.config_path(), &project.config_path());
        let manifest = DescriptorManifest::load(project.descriptor_path())?;

        let defaults = manifest
            .flags
            .clone()
            .into_iter()
            .chain(config.flags.clone());
        let flags = FeatureFlags::resolve(defaults, &opts.toggles)?;

        let cfg = RunConfig::new(opts.platform.unwrap_or_else(Platform::host))
            .with_flags(flags)
            .with_release(opts.release)
            .with_tests(opts.test_args.clone());
        tracing::debug!("platform {}, flags [{}]", cfg.platform, cfg.flags);

        let fetcher = FetchCache::new(
            GitFetcher::new(ctx.git_cache_dir())
                .with_offline(config.net.offline)
                .with_update(update),
        );
        let shared_root = config
            .workspace
            .shared_root
            .clone()
            .unwrap_or_else(|| ctx.shared_workspace_root());

        Ok(Session {
            project,
            config,
            cfg,
            fetcher,
            shared_root,
        })
    }

    pub fn fetcher(&self) -> &FetchCache<GitFetcher> {
        &self.fetcher
    }

    pub fn workspaces(&self) -> WorkspaceManager {
        WorkspaceManager::new(self.project.build_root(), &self.shared_root)
    }

    /// Load every descriptor reachable under this run's configuration.
    pub fn load(&self) -> Result<LoadedProject> {
        DescriptorLoader::new(&self.cfg, &self.fetcher).load(self.project.descriptor_path())
    }

    /// Build the graph rooted at `target`, or at the root descriptor.
    pub fn graph(&self, loaded: &LoadedProject, target: Option<&str>) -> Result<TargetGraph> {
        let root = target.unwrap_or(&loaded.root);
        Ok(build_graph(&loaded.descriptors, root, &self.cfg)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_tree;
    use tempfile::TempDir;

    fn context(tmp: &TempDir) -> GlobalContext {
        GlobalContext::with_cwd(tmp.path().join("app"))
            .unwrap()
            .with_home(tmp.path().join("home"))
    }

    #[test]
    fn test_flag_defaults_and_overrides() {
        let tmp = TempDir::new().unwrap();
        write_tree(
            tmp.path(),
            &[
                (
                    "app/Mast.toml",
                    "[target]\nname = \"App\"\n\n[flags]\nNO_FBX = true\nUSE_SIMD = false\n",
                ),
                ("app/.mast/config.toml", "[flags]\nUSE_SIMD = true\n"),
            ],
        );
        let ctx = context(&tmp);

        let session = Session::open(&ctx, &RunOptions::default()).unwrap();
        assert!(session.cfg.flags.get("NO_FBX"));
        assert!(session.cfg.flags.get("USE_SIMD"));

        let opts = RunOptions {
            toggles: vec![Toggle::new("NO_FBX", false)],
            ..Default::default()
        };
        let session = Session::open(&ctx, &opts).unwrap();
        assert!(!session.cfg.flags.get("NO_FBX"));
    }

    #[test]
    fn test_contradictory_toggles_fail_before_loading() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &[("app/Mast.toml", "[target]\nname = \"App\"\n")]);

        let opts = RunOptions {
            toggles: vec![Toggle::new("NO_FBX", true), Toggle::new("NO_FBX", false)],
            ..Default::default()
        };
        let err = Session::open(&context(&tmp), &opts).err().unwrap();
        assert!(err.downcast_ref::<crate::core::flags::FlagError>().is_some());
    }

    #[test]
    fn test_graph_root_override() {
        let tmp = TempDir::new().unwrap();
        write_tree(
            tmp.path(),
            &[
                (
                    "app/Mast.toml",
                    "[target]\nname = \"App\"\n\n[[dependencies]]\nname = \"Lib\"\npath = \"../lib\"\n",
                ),
                ("lib/Mast.toml", "[target]\nname = \"Lib\"\n"),
            ],
        );

        let session = Session::open(&context(&tmp), &RunOptions::default()).unwrap();
        let loaded = session.load().unwrap();
        assert_eq!(session.graph(&loaded, None).unwrap().order(), ["Lib", "App"]);
        assert_eq!(session.graph(&loaded, Some("Lib")).unwrap().order(), ["Lib"]);
        assert!(session.graph(&loaded, Some("Missing")).is_err());
    }
}
