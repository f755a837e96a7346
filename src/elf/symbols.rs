use anyhow::{Context, Result};
use lief::elf::symbol::Binding;
use lief::elf::Binary;
use lief::generic::Symbol as _;
use std::path::Path;

use crate::model::Visibility;

#[derive(Debug, Clone)]
pub struct SymbolRecord {
    pub name: String,
    pub visibility: Visibility,
}

// Exports with GLOBAL or WEAK binding and a defining section; anything
// local, unnamed, or with an exotic binding stays out of the model.
pub fn defined_symbols(path: &Path) -> Result<Vec<SymbolRecord>> {
    let binary = parse(path)?;
    let mut records = Vec::new();
    for sym in binary.exported_symbols() {
        let name = sym.name();
        if name.is_empty() {
            continue;
        }
        let visibility = match sym.binding() {
            Binding::GLOBAL => Visibility::Public,
            Binding::WEAK => Visibility::Weak,
            _ => continue,
        };
        records.push(SymbolRecord { name, visibility });
    }
    Ok(records)
}

// Undefined references, regardless of binding.
pub fn undefined_symbols(path: &Path) -> Result<Vec<SymbolRecord>> {
    let binary = parse(path)?;
    let mut records = Vec::new();
    for sym in binary.imported_symbols() {
        let name = sym.name();
        if name.is_empty() {
            continue;
        }
        let visibility = match sym.binding() {
            Binding::WEAK => Visibility::Weak,
            _ => Visibility::Public,
        };
        records.push(SymbolRecord { name, visibility });
    }
    Ok(records)
}

fn parse(path: &Path) -> Result<Binary> {
    Binary::parse(path).with_context(|| format!("parsing ELF {}", path.display()))
}
