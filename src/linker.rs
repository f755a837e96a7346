use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::plan::Plan;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub target: String,
    #[serde(default = "default_true")]
    pub allow_all_shared_libs: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceNode {
    pub name: String,
    #[serde(default = "default_true")]
    pub isolated: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub permitted_paths: BTreeSet<String>,
    #[serde(default)]
    pub search_paths: BTreeSet<String>,
    // Fields this tool does not interpret survive a load/export round trip.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NamespaceNode {
    pub fn new(name: impl Into<String>) -> Self {
        NamespaceNode {
            name: name.into(),
            isolated: true,
            visible: true,
            links: Vec::new(),
            permitted_paths: BTreeSet::new(),
            search_paths: BTreeSet::new(),
            extra: serde_json::Map::new(),
        }
    }

    fn push_link(&mut self, link: Link) {
        if self.links.iter().all(|l| l.target != link.target) {
            self.links.push(link);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamespacePatch {
    #[serde(default)]
    pub links: Vec<LinkAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add: Option<Link>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamespaceOp {
    Add(NamespaceNode),
    Patch(NamespacePatch),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceEntry {
    pub name: String,
    #[serde(flatten)]
    pub op: NamespaceOp,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkerPatch {
    #[serde(default)]
    pub namespaces: Vec<NamespaceEntry>,
}

impl LinkerPatch {
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkerConfigIR {
    #[serde(default)]
    pub namespaces: Vec<NamespaceNode>,
}

impl LinkerConfigIR {
    pub fn load(path: &Path) -> Result<Self> {
        let doc: LinkerConfigIR = crate::read_json_file(path)?;
        let mut ir = LinkerConfigIR::default();
        for node in doc.namespaces {
            ir.absorb(node);
        }
        Ok(ir)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        crate::write_json_file(self, path)
    }

    pub fn find(&self, name: &str) -> Option<&NamespaceNode> {
        self.namespaces.iter().find(|n| n.name == name)
    }

    pub fn get_or_create(&mut self, name: &str) -> &mut NamespaceNode {
        let idx = match self.namespaces.iter().position(|n| n.name == name) {
            Some(idx) => idx,
            None => {
                self.namespaces.push(NamespaceNode::new(name));
                self.namespaces.len() - 1
            }
        };
        &mut self.namespaces[idx]
    }

    pub fn add_link(&mut self, source: &str, target: &str, allow_all: bool) {
        self.get_or_create(source).push_link(Link {
            target: target.to_string(),
            allow_all_shared_libs: allow_all,
        });
    }

    // Base documents are merged through get_or_create so duplicate names in
    // the input collapse instead of violating the name-uniqueness invariant.
    fn absorb(&mut self, node: NamespaceNode) {
        let existing = self.get_or_create(&node.name);
        existing.isolated = node.isolated;
        existing.visible = node.visible;
        for link in node.links {
            existing.push_link(link);
        }
        existing.permitted_paths.extend(node.permitted_paths);
        existing.search_paths.extend(node.search_paths);
        existing.extra.extend(node.extra);
    }

    pub fn apply_plan(&mut self, plan: &Plan) {
        let version = plan.vendor_api_level;
        let name = format!("vndk_compat_v{version}");

        let node = self.get_or_create(&name);
        node.isolated = true;
        node.visible = true;
        node.permitted_paths
            .insert(format!("/system/lib64/vndk-v{version}"));
        node.permitted_paths
            .insert(format!("/system/lib/vndk-v{version}"));

        self.add_link(&name, "default", true);
        self.add_link("default", &name, true);
    }

    pub fn apply_patch(&mut self, patch: &LinkerPatch) {
        for entry in &patch.namespaces {
            match &entry.op {
                NamespaceOp::Add(node) => {
                    if self.find(&entry.name).is_none() {
                        let mut node = node.clone();
                        node.name = entry.name.clone();
                        for link in std::mem::take(&mut node.links) {
                            node.push_link(link);
                        }
                        self.namespaces.push(node);
                    }
                }
                NamespaceOp::Patch(patch) => {
                    if self.find(&entry.name).is_none() {
                        log::warn!(
                            "namespace '{}' not found for patching, creating it",
                            entry.name
                        );
                    }
                    let node = self.get_or_create(&entry.name);
                    for action in &patch.links {
                        if let Some(link) = &action.add {
                            node.push_link(link.clone());
                        }
                    }
                }
            }
        }
    }
}
