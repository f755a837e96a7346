use std::collections::{BTreeSet, HashMap};

use crate::model::{ApiModel, Library};
use crate::plan::{Plan, PlanAction, Severity};
use crate::policy::Policy;

pub fn compute_plan(system: &ApiModel, vendor: &ApiModel, policy: &Policy) -> Plan {
    let system_libs = symbol_map(system);
    let mut plan = Plan::new(vendor.api_level, system.api_level);

    let mut vendor_libs: Vec<&Library> = vendor.libraries.iter().collect();
    vendor_libs.sort_by(|a, b| a.name.cmp(&b.name));

    for lib in vendor_libs {
        let Some(provided) = system_libs.get(lib.name.as_str()) else {
            plan.metrics.missing += 1;
            plan.actions.push(PlanAction::MissingLibrary {
                target: lib.name.clone(),
                severity: Severity::Critical,
            });
            continue;
        };

        let needed: BTreeSet<&str> = lib.symbols.iter().map(|s| s.name.as_str()).collect();
        let missing: Vec<&str> = needed
            .into_iter()
            .filter(|name| !provided.contains(name))
            .collect();

        if missing.is_empty() {
            plan.metrics.matches += 1;
            continue;
        }

        plan.metrics.abi_breaks += missing.len();
        for symbol in missing {
            let resolution = policy.resolve(&lib.name, symbol);
            plan.actions.push(PlanAction::AbiBreak {
                target: lib.name.clone(),
                symbol: symbol.to_string(),
                resolution,
            });
        }
    }

    plan
}

// First library with a given basename wins; later duplicates are ignored.
fn symbol_map(model: &ApiModel) -> HashMap<&str, BTreeSet<&str>> {
    let mut map: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    for lib in &model.libraries {
        map.entry(lib.name.as_str())
            .or_insert_with(|| lib.symbols.iter().map(|s| s.name.as_str()).collect());
    }
    map
}
