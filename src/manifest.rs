use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HalDependency {
    pub name: String,
    pub versions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ManifestDoc {
    #[serde(rename = "hal", default)]
    hals: Vec<HalDoc>,
}

#[derive(Debug, Deserialize)]
struct HalDoc {
    name: String,
    #[serde(rename = "version", default)]
    versions: Vec<String>,
}

// An absent manifest means no declared HAL dependencies, not an error.
pub fn parse_vintf(path: &Path) -> Result<Vec<HalDependency>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let xml = fs::read_to_string(path)
        .with_context(|| format!("reading VINTF manifest {}", path.display()))?;
    parse_vintf_str(&xml).with_context(|| format!("parsing VINTF manifest {}", path.display()))
}

pub fn parse_vintf_str(xml: &str) -> Result<Vec<HalDependency>> {
    let doc: ManifestDoc = quick_xml::de::from_str(xml)?;
    Ok(doc
        .hals
        .into_iter()
        .map(|hal| HalDependency {
            name: hal.name,
            versions: hal.versions,
        })
        .collect())
}
