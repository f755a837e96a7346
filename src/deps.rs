use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use crate::elf::needed;
use crate::manifest::HalDependency;
use crate::model;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyReport {
    pub hal_dependencies: Vec<HalDependency>,
    pub missing_libraries: BTreeMap<String, Vec<String>>,
}

pub fn load_system_libs(path: &Path) -> Result<HashSet<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading system library list {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect())
}

pub fn analyze_vendor_partition(
    vendor_dir: &Path,
    system_libs: &HashSet<String>,
) -> Result<BTreeMap<String, Vec<String>>> {
    let mut missing: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for rel in model::collect_shared_objects(vendor_dir)? {
        let path = vendor_dir.join(&rel);
        let deps = match needed::needed_libraries(&path) {
            Ok(deps) => deps,
            Err(err) => {
                log::warn!("skipping malformed ELF {}: {err:#}", path.display());
                continue;
            }
        };
        for dep in deps {
            if !system_libs.contains(&dep) {
                missing
                    .entry(dep)
                    .or_default()
                    .push(path.display().to_string());
            }
        }
    }

    Ok(missing)
}
