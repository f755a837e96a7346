use std::fmt;

use crate::plan::{Plan, PlanAction, ResolutionKind};

pub const FORWARDING_SHIM: i64 = 1;
pub const SYMBOL_REMAP: i64 = 2;
pub const STUB_GENERATED: i64 = 5;
pub const SNAPSHOT_DEPENDENCY: i64 = 5;
pub const LINKER_ISOLATION_BREACH: i64 = 10;
pub const MISSING_LIBRARY: i64 = 15;
pub const CRITICAL_HAL_MISSING: i64 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompatState {
    Full,
    Degraded,
    Unsupported,
}

impl fmt::Display for CompatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompatState::Full => write!(f, "FULL"),
            CompatState::Degraded => write!(f, "DEGRADED"),
            CompatState::Unsupported => write!(f, "UNSUPPORTED"),
        }
    }
}

pub fn score_plan(plan: &Plan) -> i64 {
    let mut score = 100;
    for action in &plan.actions {
        score -= penalty(action);
    }
    score.max(0)
}

fn penalty(action: &PlanAction) -> i64 {
    match action {
        PlanAction::MissingLibrary { .. } => MISSING_LIBRARY,
        PlanAction::CriticalHalMissing { .. } => CRITICAL_HAL_MISSING,
        PlanAction::LinkerIsolationBreach { .. } => LINKER_ISOLATION_BREACH,
        PlanAction::AbiBreak { resolution, .. } => match resolution.action {
            ResolutionKind::Shim if resolution.remap.is_some() => SYMBOL_REMAP,
            ResolutionKind::Shim => FORWARDING_SHIM,
            ResolutionKind::Stub => STUB_GENERATED,
            _ => SNAPSHOT_DEPENDENCY,
        },
    }
}

pub fn classify(score: i64) -> CompatState {
    if score >= 100 {
        CompatState::Full
    } else if score >= 70 {
        CompatState::Degraded
    } else {
        CompatState::Unsupported
    }
}

pub fn render_props(score: i64, state: CompatState) -> String {
    format!("ro.vndk.compat_score={score}\nro.vndk.compat_state={state}\n")
}
