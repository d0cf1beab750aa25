//! `mast exports` command

use std::collections::BTreeMap;

use anyhow::{bail, Result};

use crate::cli::{ExportsArgs, MessageFormat};
use mast::core::ExportSet;
use mast::ops::load_exports;
use mast::util::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: ExportsArgs) -> Result<i32> {
    let registry = load_exports(ctx)?;

    let selected: BTreeMap<&str, &ExportSet> = match &args.target {
        Some(target) => {
            let exports = registry.lookup(target)?;
            BTreeMap::from([(target.as_str(), exports)])
        }
        None => registry.packaged().collect(),
    };
    if selected.is_empty() {
        bail!("no packaged targets recorded");
    }

    if args.message_format == MessageFormat::Json {
        println!("{}", serde_json::to_string(&selected)?);
        return Ok(0);
    }

    for (name, exports) in selected {
        println!("{}", name);
        for include in &exports.includes {
            println!("  include {}", include.display());
        }
        for lib in &exports.libs {
            println!("  lib     {}", lib.display());
        }
        for asset in &exports.assets {
            println!("  asset   {}", asset.display());
        }
    }
    Ok(0)
}
