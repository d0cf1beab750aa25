//! Implementation of `mast exports`.

use anyhow::{bail, Result};

use crate::core::{ExportRegistry, Project};
use crate::util::GlobalContext;

/// Read the export registry persisted by the last build.
pub fn load_exports(ctx: &GlobalContext) -> Result<ExportRegistry> {
    let project = Project::new(&ctx.find_descriptor()?)?;
    let path = project.exports_path();
    if !path.is_file() {
        bail!(
            "no exports recorded for this project\n\
             help: run `mast build` first"
        );
    }
    ExportRegistry::load(&path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ExportSet;
    use crate::test_support::write_tree;
    use tempfile::TempDir;

    #[test]
    fn test_reads_saved_registry() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &[("Mast.toml", "[target]\nname = \"App\"\n")]);
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).unwrap();

        assert!(load_exports(&ctx).is_err());

        let mut exports = ExportSet::new();
        exports.add_include(tmp.path().join("include"));
        let mut registry = ExportRegistry::new();
        registry.register("App");
        registry.record("App", exports.clone()).unwrap();
        registry
            .save(&Project::new(&tmp.path().join("Mast.toml")).unwrap().exports_path())
            .unwrap();

        let loaded = load_exports(&ctx).unwrap();
        assert_eq!(loaded.lookup("App").unwrap(), &exports);
    }
}
