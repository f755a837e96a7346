use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use vndk_compat::linker::LinkerConfigIR;
use vndk_compat::policy::Policy;
use vndk_compat::{diff, model, score, shim, write_json_file};

pub struct PipelineArgs<'a> {
    pub vendor_api: u32,
    pub system_api: u32,
    pub vendor_dir: &'a Path,
    pub system_dir: &'a Path,
    pub policy_dir: &'a Path,
    pub input_config: Option<&'a Path>,
    pub output_dir: &'a Path,
}

pub const PLAN_FILE: &str = "plan.json";
pub const SHIM_FILE: &str = "vndk_compat_shim.c";
pub const LINKER_CONFIG_FILE: &str = "linker.config.json";
pub const PROP_FILE: &str = "vndk_compat.prop";

pub fn run(args: &PipelineArgs<'_>) -> Result<()> {
    fs::create_dir_all(args.output_dir)
        .with_context(|| format!("creating output directory {}", args.output_dir.display()))?;

    stage("Extracting system API model");
    let system = model::extract_defined(args.system_dir, args.system_api)?;

    stage("Extracting vendor footprint");
    let vendor = model::extract_undefined(args.vendor_dir, args.vendor_api)?;
    log::info!(
        "system model: {} libraries, vendor footprint: {} libraries",
        system.libraries.len(),
        vendor.libraries.len()
    );

    stage("Diffing against policy");
    let policy = Policy::load_for_api(args.policy_dir, args.vendor_api)?;
    let plan = diff::compute_plan(&system, &vendor, &policy);
    write_json_file(&plan, &args.output_dir.join(PLAN_FILE))?;

    stage("Generating shim source");
    let shim_path = args.output_dir.join(SHIM_FILE);
    fs::write(&shim_path, shim::generate(&plan))
        .with_context(|| format!("writing {}", shim_path.display()))?;

    stage("Merging linker namespaces");
    let mut ir = match args.input_config {
        Some(path) => LinkerConfigIR::load(path)?,
        None => LinkerConfigIR::default(),
    };
    ir.apply_plan(&plan);
    ir.apply_patch(&policy.linker_config);
    ir.save(&args.output_dir.join(LINKER_CONFIG_FILE))?;

    stage("Scoring compatibility posture");
    let score = score::score_plan(&plan);
    let state = score::classify(score);
    let prop_path = args.output_dir.join(PROP_FILE);
    fs::write(&prop_path, score::render_props(score, state))
        .with_context(|| format!("writing {}", prop_path.display()))?;

    eprintln!(
        "Planned {} action(s), score {} ({})",
        plan.actions.len(),
        score,
        state
    );
    Ok(())
}

fn stage(name: &str) {
    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        eprintln!("\x1b[1;34m==>\x1b[0m {}", name);
    } else {
        eprintln!("==> {}", name);
    }
}
