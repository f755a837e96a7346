use anyhow::{Context, Result};
use lief::elf::dynamic::Entries;
use lief::elf::Binary;
use std::path::Path;

pub fn needed_libraries(path: &Path) -> Result<Vec<String>> {
    let binary =
        Binary::parse(path).with_context(|| format!("parsing ELF {}", path.display()))?;
    Ok(binary
        .dynamic_entries()
        .filter_map(|entry| {
            if let Entries::Library(lib) = entry {
                Some(lib.name())
            } else {
                None
            }
        })
        .collect())
}
