use serde::{Deserialize, Serialize};

pub const PLAN_VERSION: &str = "1.0";
pub const SNAPSHOT_FALLBACK: &str = "snapshot";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    #[serde(rename = "CRITICAL")]
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionKind {
    #[serde(rename = "shim")]
    Shim,
    #[serde(rename = "stub")]
    Stub,
    #[serde(rename = "snapshot")]
    Snapshot,
    #[serde(rename = "NONE")]
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub action: ResolutionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remap: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

impl Resolution {
    pub fn snapshot_fallback() -> Self {
        Resolution {
            action: ResolutionKind::Unresolved,
            remap: None,
            fallback: Some(SNAPSHOT_FALLBACK.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlanAction {
    #[serde(rename = "MISSING_LIBRARY")]
    MissingLibrary { target: String, severity: Severity },
    #[serde(rename = "ABI_BREAK")]
    AbiBreak {
        target: String,
        symbol: String,
        resolution: Resolution,
    },
    // Reserved action classes: no engine rule emits these yet, but plans
    // carrying them must still parse and score.
    #[serde(rename = "CRITICAL_HAL_MISSING")]
    CriticalHalMissing {
        #[serde(default)]
        target: String,
    },
    #[serde(rename = "LINKER_ISOLATION_BREACH")]
    LinkerIsolationBreach {
        #[serde(default)]
        target: String,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub matches: usize,
    pub missing: usize,
    pub abi_breaks: usize,
    pub visibility_violations: usize,
}

// Field order here is the required key order of the serialized plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub version: String,
    pub vendor_api_level: u32,
    pub system_api_level: u32,
    #[serde(default)]
    pub actions: Vec<PlanAction>,
    #[serde(default)]
    pub metrics: Metrics,
}

impl Plan {
    pub fn new(vendor_api_level: u32, system_api_level: u32) -> Self {
        Plan {
            version: PLAN_VERSION.to_string(),
            vendor_api_level,
            system_api_level,
            actions: Vec::new(),
            metrics: Metrics::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_plan() -> Plan {
        let mut plan = Plan::new(35, 36);
        plan.actions.push(PlanAction::MissingLibrary {
            target: "libz.so".to_string(),
            severity: Severity::Critical,
        });
        plan.actions.push(PlanAction::AbiBreak {
            target: "libfoo.so".to_string(),
            symbol: "h_old".to_string(),
            resolution: Resolution {
                action: ResolutionKind::Shim,
                remap: Some("h_new".to_string()),
                fallback: None,
            },
        });
        plan.metrics.missing = 1;
        plan.metrics.abi_breaks = 1;
        plan
    }

    #[test]
    fn plan_round_trips_through_json() {
        let plan = sample_plan();
        let json = serde_json::to_string_pretty(&plan).expect("serialize");
        let back: Plan = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, plan);
    }

    #[test]
    fn top_level_key_order_is_fixed() {
        let json = serde_json::to_string(&sample_plan()).expect("serialize");
        let version = json.find("\"version\"").expect("version key");
        let vendor = json.find("\"vendor_api_level\"").expect("vendor key");
        let system = json.find("\"system_api_level\"").expect("system key");
        let actions = json.find("\"actions\"").expect("actions key");
        let metrics = json.find("\"metrics\"").expect("metrics key");
        assert!(version < vendor && vendor < system && system < actions && actions < metrics);
    }

    #[test]
    fn actions_are_tagged_on_type() {
        let json = serde_json::to_value(&sample_plan()).expect("serialize");
        assert_eq!(json["actions"][0]["type"], "MISSING_LIBRARY");
        assert_eq!(json["actions"][0]["severity"], "CRITICAL");
        assert_eq!(json["actions"][1]["type"], "ABI_BREAK");
        assert_eq!(json["actions"][1]["resolution"]["action"], "shim");
        assert_eq!(json["actions"][1]["resolution"]["remap"], "h_new");
    }

    #[test]
    fn absent_remap_and_fallback_are_omitted() {
        let resolution = Resolution {
            action: ResolutionKind::Shim,
            remap: None,
            fallback: None,
        };
        let json = serde_json::to_string(&resolution).expect("serialize");
        assert_eq!(json, "{\"action\":\"shim\"}");
    }

    #[test]
    fn snapshot_fallback_carries_none_action() {
        let json = serde_json::to_value(Resolution::snapshot_fallback()).expect("serialize");
        assert_eq!(json["action"], "NONE");
        assert_eq!(json["fallback"], "snapshot");
    }

    #[test]
    fn reserved_action_classes_parse() {
        let json = r#"{
            "version": "1.0",
            "vendor_api_level": 35,
            "system_api_level": 36,
            "actions": [
                { "type": "CRITICAL_HAL_MISSING", "target": "android.hardware.camera" },
                { "type": "LINKER_ISOLATION_BREACH" }
            ],
            "metrics": {
                "matches": 0,
                "missing": 0,
                "abi_breaks": 0,
                "visibility_violations": 0
            }
        }"#;
        let plan: Plan = serde_json::from_str(json).expect("deserialize");
        assert_eq!(plan.actions.len(), 2);
        assert!(matches!(
            &plan.actions[0],
            PlanAction::CriticalHalMissing { target } if target == "android.hardware.camera"
        ));
        assert!(matches!(
            &plan.actions[1],
            PlanAction::LinkerIsolationBreach { target } if target.is_empty()
        ));
    }
}
