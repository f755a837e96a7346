use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::elf::symbols::{self, SymbolRecord};

pub const DEFAULT_OWNER: &str = "platform";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Weak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stability {
    Stable,
    Unstable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Library {
    pub name: String,
    pub stability: Stability,
    pub owner: String,
    pub symbols: Vec<Symbol>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiModel {
    pub api_level: u32,
    pub libraries: Vec<Library>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SymbolSelection {
    Defined,
    Undefined,
}

pub fn extract_defined(dir: &Path, api_level: u32) -> Result<ApiModel> {
    scan(dir, api_level, SymbolSelection::Defined)
}

pub fn extract_undefined(dir: &Path, api_level: u32) -> Result<ApiModel> {
    scan(dir, api_level, SymbolSelection::Undefined)
}

fn scan(dir: &Path, api_level: u32, selection: SymbolSelection) -> Result<ApiModel> {
    let mut libraries = Vec::new();

    for rel in collect_shared_objects(dir)? {
        let path = dir.join(&rel);
        let records = match read_records(&path, selection) {
            Ok(records) => records,
            Err(err) => {
                log::warn!("skipping malformed ELF {}: {err:#}", path.display());
                Vec::new()
            }
        };

        let name = rel
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or_default()
            .to_string();

        libraries.push(Library {
            name,
            stability: classify_stability(&rel),
            owner: DEFAULT_OWNER.to_string(),
            symbols: dedupe_symbols(records),
        });
    }

    Ok(ApiModel {
        api_level,
        libraries,
    })
}

fn read_records(path: &Path, selection: SymbolSelection) -> Result<Vec<SymbolRecord>> {
    match selection {
        SymbolSelection::Defined => symbols::defined_symbols(path),
        SymbolSelection::Undefined => symbols::undefined_symbols(path),
    }
}

pub(crate) fn collect_shared_objects(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.with_context(|| format!("scanning {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_shared_object = entry
            .path()
            .file_name()
            .and_then(OsStr::to_str)
            .map(|n| n.ends_with(".so"))
            .unwrap_or(false);
        if !is_shared_object {
            continue;
        }
        if let Ok(rel) = entry.path().strip_prefix(root) {
            files.push(rel.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

// Stability is a property of where the library sits in the scanned tree,
// judged relative to the scan root so the result does not depend on where
// the image happens to be mounted.
fn classify_stability(rel: &Path) -> Stability {
    let in_vndk_dir = rel
        .parent()
        .map(|dir| {
            dir.components()
                .any(|c| c.as_os_str().to_string_lossy().contains("vndk"))
        })
        .unwrap_or(false);
    if in_vndk_dir {
        Stability::Stable
    } else {
        Stability::Unstable
    }
}

fn dedupe_symbols(records: Vec<SymbolRecord>) -> Vec<Symbol> {
    let mut by_name: BTreeMap<String, Visibility> = BTreeMap::new();
    for record in records {
        by_name.entry(record.name).or_insert(record.visibility);
    }
    by_name
        .into_iter()
        .map(|(name, visibility)| Symbol { name, visibility })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn stability_from_vndk_path_component() {
        assert_eq!(
            classify_stability(Path::new("lib64/vndk-sp/libfoo.so")),
            Stability::Stable
        );
        assert_eq!(
            classify_stability(Path::new("system/lib64/libbar.so")),
            Stability::Unstable
        );
        assert_eq!(
            classify_stability(Path::new("libbaz.so")),
            Stability::Unstable
        );
    }

    #[test]
    fn vndk_in_filename_does_not_count() {
        assert_eq!(
            classify_stability(Path::new("lib64/libvndk_helper.so")),
            Stability::Unstable
        );
    }

    #[test]
    fn symbols_dedupe_first_record_wins_and_sort() {
        let records = vec![
            SymbolRecord {
                name: "zeta".to_string(),
                visibility: Visibility::Public,
            },
            SymbolRecord {
                name: "alpha".to_string(),
                visibility: Visibility::Weak,
            },
            SymbolRecord {
                name: "zeta".to_string(),
                visibility: Visibility::Weak,
            },
        ];
        let symbols = dedupe_symbols(records);
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].name, "alpha");
        assert_eq!(symbols[0].visibility, Visibility::Weak);
        assert_eq!(symbols[1].name, "zeta");
        assert_eq!(symbols[1].visibility, Visibility::Public);
    }

    #[test]
    fn malformed_shared_object_yields_empty_symbols() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("lib64")).expect("mkdir");
        fs::write(temp.path().join("lib64/libjunk.so"), b"not an elf").expect("write");
        fs::write(temp.path().join("README"), b"ignored").expect("write");

        let model = extract_defined(temp.path(), 35).expect("scan");
        assert_eq!(model.api_level, 35);
        assert_eq!(model.libraries.len(), 1);
        assert_eq!(model.libraries[0].name, "libjunk.so");
        assert_eq!(model.libraries[0].owner, DEFAULT_OWNER);
        assert!(model.libraries[0].symbols.is_empty());
    }

    #[test]
    fn missing_scan_root_is_fatal() {
        let temp = tempfile::tempdir().expect("tempdir");
        let missing = temp.path().join("no-such-dir");
        assert!(extract_defined(&missing, 35).is_err());
    }

    #[test]
    fn duplicate_basenames_kept_in_sorted_path_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("a")).expect("mkdir");
        fs::create_dir_all(temp.path().join("b")).expect("mkdir");
        fs::write(temp.path().join("b/libdup.so"), b"junk").expect("write");
        fs::write(temp.path().join("a/libdup.so"), b"junk").expect("write");

        let files = collect_shared_objects(temp.path()).expect("walk");
        assert_eq!(
            files,
            vec![PathBuf::from("a/libdup.so"), PathBuf::from("b/libdup.so")]
        );
    }
}
