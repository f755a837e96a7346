use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::linker::LinkerPatch;
use crate::plan::{Resolution, ResolutionKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Shim,
    Stub,
    Snapshot,
}

impl From<RuleAction> for ResolutionKind {
    fn from(action: RuleAction) -> Self {
        match action {
            RuleAction::Shim => ResolutionKind::Shim,
            RuleAction::Stub => ResolutionKind::Stub,
            RuleAction::Snapshot => ResolutionKind::Snapshot,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub target: String,
    #[serde(default)]
    pub symbols: Vec<String>,
    pub action: RuleAction,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub remap: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub api_level: Option<u32>,
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
    #[serde(default, skip_serializing_if = "LinkerPatch::is_empty")]
    pub linker_config: LinkerPatch,
}

impl Policy {
    // Rules are walked in declaration order; the first rule covering both
    // the target and the symbol wins.
    pub fn resolve(&self, target: &str, symbol: &str) -> Resolution {
        for rule in &self.rules {
            if rule.target == target && rule.symbols.iter().any(|s| s == symbol) {
                return Resolution {
                    action: rule.action.into(),
                    remap: rule.remap.get(symbol).cloned(),
                    fallback: None,
                };
            }
        }
        Resolution::snapshot_fallback()
    }

    pub fn load(path: &Path) -> Result<Policy> {
        if !path.exists() {
            log::warn!("no policy found at {}, using empty policy", path.display());
            return Ok(Policy::default());
        }
        crate::read_json_file(path)
    }

    pub fn load_for_api(dir: &Path, api_level: u32) -> Result<Policy> {
        Policy::load(&dir.join(format!("v{api_level}.policy.json")))
    }
}
