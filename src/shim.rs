use std::fmt::Write as _;

use crate::plan::{Plan, PlanAction, ResolutionKind};

// Signatures are approximated with variadic forwarders returning void*;
// that is enough for symbol presence, not for float-heavy calling
// conventions.
pub fn generate(plan: &Plan) -> String {
    let mut source = String::new();
    prologue(&mut source, plan.vendor_api_level);

    for action in &plan.actions {
        let PlanAction::AbiBreak {
            target,
            symbol,
            resolution,
        } = action
        else {
            continue;
        };
        match resolution.action {
            ResolutionKind::Shim => match &resolution.remap {
                Some(new_name) => remap_alias(&mut source, symbol, new_name),
                None => forwarder(&mut source, symbol, &dlopen_name(target)),
            },
            ResolutionKind::Stub => stub(&mut source, symbol),
            // Snapshot fallbacks are satisfied by prebuilt libraries, not
            // generated code.
            _ => {}
        }
    }

    source.push_str("\n}\n");
    source
}

fn prologue(out: &mut String, vendor_api_level: u32) {
    let _ = write!(
        out,
        r#"// vndk_compat shim layer for vendor API level {vendor_api_level}.
// Provides forwarding shims, symbol remaps, and warning stubs.

#include <dlfcn.h>
#include <log/log.h>

static void* get_real_lib_handle(const char* lib_name) {{
    static void* handle = nullptr;
    if (!handle) {{
        handle = dlopen(lib_name, RTLD_NOW);
    }}
    return handle;
}}

extern "C" {{
"#
    );
}

fn forwarder(out: &mut String, name: &str, lib: &str) {
    let _ = write!(
        out,
        r#"
void* {name}(...) {{
    typedef void* (*func_ptr)(...);
    static func_ptr real_func = nullptr;
    if (!real_func) {{
        void* handle = get_real_lib_handle("{lib}");
        if (handle) {{
            real_func = (func_ptr)dlsym(handle, "{name}");
        }}
    }}
    if (real_func) return real_func();
    ALOGE("vndk_compat: {name} not found");
    return nullptr;
}}
"#
    );
}

fn remap_alias(out: &mut String, old_name: &str, new_name: &str) {
    let _ = write!(
        out,
        r#"
extern void* {new_name}(...);
void* {old_name}(...) {{
    return {new_name}();
}}
"#
    );
}

fn stub(out: &mut String, name: &str) {
    let _ = write!(
        out,
        r#"
void* {name}(...) {{
    ALOGW("vndk_compat: stub called for {name}");
    return nullptr;
}}
"#
    );
}

fn dlopen_name(target: &str) -> String {
    if target.ends_with(".so") {
        target.to_string()
    } else {
        format!("{target}.so")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Resolution, Severity};

    fn abi_break(target: &str, symbol: &str, resolution: Resolution) -> PlanAction {
        PlanAction::AbiBreak {
            target: target.to_string(),
            symbol: symbol.to_string(),
            resolution,
        }
    }

    fn shim(remap: Option<&str>) -> Resolution {
        Resolution {
            action: ResolutionKind::Shim,
            remap: remap.map(ToString::to_string),
            fallback: None,
        }
    }

    fn stub_resolution() -> Resolution {
        Resolution {
            action: ResolutionKind::Stub,
            remap: None,
            fallback: None,
        }
    }

    #[test]
    fn prologue_records_vendor_api_level() {
        let source = generate(&Plan::new(35, 36));
        assert!(source.contains("vendor API level 35"));
        assert!(source.contains("#include <dlfcn.h>"));
        assert!(source.contains("#include <log/log.h>"));
        assert!(source.contains("extern \"C\" {"));
        assert!(source.contains("get_real_lib_handle"));
    }

    #[test]
    fn forwarder_opens_target_library() {
        let mut plan = Plan::new(35, 36);
        plan.actions.push(abi_break("libfoo.so", "h_old", shim(None)));

        let source = generate(&plan);
        assert!(source.contains("void* h_old(...)"));
        assert!(source.contains("get_real_lib_handle(\"libfoo.so\")"));
        assert!(!source.contains("libfoo.so.so"));
        assert!(source.contains("dlsym(handle, \"h_old\")"));
        assert!(source.contains("ALOGE(\"vndk_compat: h_old not found\")"));
    }

    #[test]
    fn bare_target_name_gains_so_suffix() {
        let mut plan = Plan::new(35, 36);
        plan.actions.push(abi_break("libfoo", "h_old", shim(None)));

        let source = generate(&plan);
        assert!(source.contains("get_real_lib_handle(\"libfoo.so\")"));
    }

    #[test]
    fn remap_emits_tail_call_alias() {
        let mut plan = Plan::new(35, 36);
        plan.actions
            .push(abi_break("libfoo.so", "h_old", shim(Some("h_new"))));

        let source = generate(&plan);
        assert!(source.contains("extern void* h_new(...);"));
        assert!(source.contains("void* h_old(...) {"));
        assert!(source.contains("return h_new();"));
        // A remap never forwards through dlopen.
        assert!(!source.contains("dlsym"));
    }

    #[test]
    fn stub_logs_a_warning() {
        let mut plan = Plan::new(35, 36);
        plan.actions
            .push(abi_break("libfoo.so", "gone", stub_resolution()));

        let source = generate(&plan);
        assert!(source.contains("void* gone(...)"));
        assert!(source.contains("ALOGW(\"vndk_compat: stub called for gone\")"));
    }

    #[test]
    fn snapshot_and_missing_library_actions_are_skipped() {
        let mut plan = Plan::new(35, 36);
        plan.actions.push(PlanAction::MissingLibrary {
            target: "libz.so".to_string(),
            severity: Severity::Critical,
        });
        plan.actions
            .push(abi_break("libfoo.so", "a", Resolution::snapshot_fallback()));
        plan.actions.push(abi_break(
            "libfoo.so",
            "b",
            Resolution {
                action: ResolutionKind::Snapshot,
                remap: None,
                fallback: None,
            },
        ));

        let source = generate(&plan);
        let empty = generate(&Plan::new(35, 36));
        assert_eq!(source, empty);
    }

    #[test]
    fn definitions_follow_plan_action_order() {
        let mut plan = Plan::new(35, 36);
        plan.actions.push(abi_break("libfoo.so", "first", shim(None)));
        plan.actions
            .push(abi_break("libfoo.so", "second", stub_resolution()));

        let source = generate(&plan);
        let first = source.find("void* first(...)").expect("first definition");
        let second = source.find("void* second(...)").expect("second definition");
        assert!(first < second);
    }

    #[test]
    fn generation_is_idempotent() {
        let mut plan = Plan::new(35, 36);
        plan.actions.push(abi_break("libfoo.so", "h_old", shim(None)));
        plan.actions
            .push(abi_break("libbar.so", "gone", stub_resolution()));

        assert_eq!(generate(&plan), generate(&plan));

        // A plan rebuilt in canonical order generates identical source.
        let mut rebuilt = Plan::new(35, 36);
        rebuilt.actions = plan.actions.clone();
        assert_eq!(generate(&plan), generate(&rebuilt));
    }
}
