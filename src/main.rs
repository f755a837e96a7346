use anyhow::{Context, Result};
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, Subcommand, ValueHint};
use std::fs;
use std::path::PathBuf;

use vndk_compat::linker::LinkerConfigIR;
use vndk_compat::plan::Plan;
use vndk_compat::policy::Policy;
use vndk_compat::{deps, diff, manifest, model, read_json_file, score, shim, write_json_file};

mod pipeline;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(
    name = "vndk-compat",
    version,
    about = "Plan and repair vendor/system ABI compatibility for split device images",
    styles = STYLES,
    subcommand_required = true,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Model(ModelArgs),
    Diff(DiffArgs),
    Compat(CompatArgs),
    Score(ScoreArgs),
    Shim(ShimArgs),
    Linker(LinkerArgs),
    Deps(DepsArgs),
}

#[derive(Parser, Debug)]
#[command(
    about = "Extract a symbol-level API model from a directory of shared objects",
    long_about = "Walk a directory tree, parse the dynamic symbol table of every .so file, \
                  and write a versioned JSON model of the exported ABI surface. With \
                  --footprint, record undefined references instead: what the scanned \
                  libraries need from elsewhere."
)]
struct ModelArgs {
    #[arg(
        long,
        value_name = "N",
        help = "API level recorded in the model",
        display_order = 1
    )]
    api_level: u32,

    #[arg(
        long,
        value_name = "DIR",
        value_hint = ValueHint::DirPath,
        help = "Directory tree to scan for .so files",
        display_order = 2
    )]
    scan_dir: PathBuf,

    #[arg(
        long,
        value_name = "FILE",
        value_hint = ValueHint::FilePath,
        help = "Output path for the model JSON",
        display_order = 3
    )]
    output: PathBuf,

    #[arg(
        long,
        help = "Record undefined references (vendor footprint) instead of exports",
        display_order = 4
    )]
    footprint: bool,
}

#[derive(Parser, Debug)]
#[command(
    about = "Diff a vendor footprint against a system model and plan repairs",
    long_about = "Compare what the vendor partition needs against what the system \
                  partition provides, resolve every gap through the policy, and write \
                  a compatibility plan."
)]
struct DiffArgs {
    #[arg(
        long,
        value_name = "FILE",
        value_hint = ValueHint::FilePath,
        help = "System API model JSON",
        display_order = 1
    )]
    system_model: PathBuf,

    #[arg(
        long,
        value_name = "FILE",
        value_hint = ValueHint::FilePath,
        help = "Vendor footprint JSON",
        display_order = 2
    )]
    vendor_footprint: PathBuf,

    #[arg(
        long,
        value_name = "FILE",
        value_hint = ValueHint::FilePath,
        help = "Policy JSON (absence degrades to an empty policy)",
        display_order = 3
    )]
    policy: PathBuf,

    #[arg(
        long,
        value_name = "FILE",
        value_hint = ValueHint::FilePath,
        help = "Output path for plan.json",
        display_order = 4
    )]
    output: PathBuf,
}

#[derive(Parser, Debug)]
#[command(
    about = "End-to-end: scan both partitions and emit all compatibility artifacts",
    long_about = "Scan the system and vendor trees, load the per-API-level policy from \
                  the policy directory, compute the plan, and write plan.json, the shim \
                  C source, linker.config.json, and the property file into the output \
                  directory."
)]
struct CompatArgs {
    #[arg(long, value_name = "N", help = "Vendor API level", display_order = 1)]
    vendor_api: u32,

    #[arg(long, value_name = "N", help = "System API level", display_order = 2)]
    system_api: u32,

    #[arg(
        long,
        value_name = "DIR",
        value_hint = ValueHint::DirPath,
        help = "Vendor partition root to scan",
        display_order = 3
    )]
    vendor_dir: PathBuf,

    #[arg(
        long,
        value_name = "DIR",
        value_hint = ValueHint::DirPath,
        help = "System partition root to scan",
        display_order = 4
    )]
    system_dir: PathBuf,

    #[arg(
        long,
        value_name = "DIR",
        value_hint = ValueHint::DirPath,
        help = "Directory holding v<N>.policy.json files",
        display_order = 5
    )]
    policy_dir: PathBuf,

    #[arg(
        long,
        value_name = "FILE",
        value_hint = ValueHint::FilePath,
        help = "Baseline linker.config.json to merge into",
        display_order = 6
    )]
    input_config: Option<PathBuf>,

    #[arg(
        long,
        value_name = "DIR",
        value_hint = ValueHint::DirPath,
        help = "Output directory for the four artifacts",
        display_order = 7
    )]
    output: PathBuf,
}

#[derive(Parser, Debug)]
#[command(about = "Reduce a plan to a compatibility score and state property file")]
struct ScoreArgs {
    #[arg(
        long,
        value_name = "FILE",
        value_hint = ValueHint::FilePath,
        help = "Compatibility plan JSON",
        display_order = 1
    )]
    plan: PathBuf,

    #[arg(
        long,
        value_name = "FILE",
        value_hint = ValueHint::FilePath,
        help = "Output path for the property file",
        display_order = 2
    )]
    output_props: PathBuf,
}

#[derive(Parser, Debug)]
#[command(about = "Generate forwarding/stub shim C source from a plan")]
struct ShimArgs {
    #[arg(
        long,
        value_name = "FILE",
        value_hint = ValueHint::FilePath,
        help = "Compatibility plan JSON",
        display_order = 1
    )]
    plan: PathBuf,

    #[arg(
        long,
        value_name = "FILE",
        value_hint = ValueHint::FilePath,
        help = "Output path for the generated C source",
        display_order = 2
    )]
    output: PathBuf,
}

#[derive(Parser, Debug)]
#[command(
    about = "Merge a baseline linker config with plan- and policy-driven namespaces"
)]
struct LinkerArgs {
    #[arg(
        long,
        value_name = "FILE",
        value_hint = ValueHint::FilePath,
        help = "Baseline linker.config.json to merge into",
        display_order = 1
    )]
    input_config: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FILE",
        value_hint = ValueHint::FilePath,
        help = "Compatibility plan JSON",
        display_order = 2
    )]
    plan: PathBuf,

    #[arg(
        long,
        value_name = "FILE",
        value_hint = ValueHint::FilePath,
        help = "Policy JSON whose linker_config patches are applied",
        display_order = 3
    )]
    policy: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FILE",
        value_hint = ValueHint::FilePath,
        help = "Output path for linker.config.json",
        display_order = 4
    )]
    output: PathBuf,
}

#[derive(Parser, Debug)]
#[command(
    about = "Report vendor DT_NEEDED dependencies missing from the system library list"
)]
struct DepsArgs {
    #[arg(
        long,
        value_name = "DIR",
        value_hint = ValueHint::DirPath,
        help = "Vendor partition root to scan",
        display_order = 1
    )]
    vendor: PathBuf,

    #[arg(
        long,
        value_name = "FILE",
        value_hint = ValueHint::FilePath,
        help = "Vendor VINTF manifest XML",
        display_order = 2
    )]
    manifest: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FILE",
        value_hint = ValueHint::FilePath,
        help = "Text file listing system library basenames, one per line",
        display_order = 3
    )]
    system_libs: PathBuf,

    #[arg(
        long,
        value_name = "FILE",
        value_hint = ValueHint::FilePath,
        help = "Output path for the dependency report JSON",
        display_order = 4
    )]
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Model(args) => run_model(args),
        Commands::Diff(args) => run_diff(args),
        Commands::Compat(args) => run_compat(args),
        Commands::Score(args) => run_score(args),
        Commands::Shim(args) => run_shim(args),
        Commands::Linker(args) => run_linker(args),
        Commands::Deps(args) => run_deps(args),
    }
}

fn run_model(args: ModelArgs) -> Result<()> {
    let model = if args.footprint {
        model::extract_undefined(&args.scan_dir, args.api_level)?
    } else {
        model::extract_defined(&args.scan_dir, args.api_level)?
    };
    write_json_file(&model, &args.output)
}

fn run_diff(args: DiffArgs) -> Result<()> {
    let system = read_json_file(&args.system_model)?;
    let vendor = read_json_file(&args.vendor_footprint)?;
    let policy = Policy::load(&args.policy)?;

    let plan = diff::compute_plan(&system, &vendor, &policy);
    write_json_file(&plan, &args.output)
}

fn run_compat(args: CompatArgs) -> Result<()> {
    pipeline::run(&pipeline::PipelineArgs {
        vendor_api: args.vendor_api,
        system_api: args.system_api,
        vendor_dir: &args.vendor_dir,
        system_dir: &args.system_dir,
        policy_dir: &args.policy_dir,
        input_config: args.input_config.as_deref(),
        output_dir: &args.output,
    })
}

fn run_score(args: ScoreArgs) -> Result<()> {
    let plan: Plan = read_json_file(&args.plan)?;
    let score = score::score_plan(&plan);
    let state = score::classify(score);
    fs::write(&args.output_props, score::render_props(score, state))
        .with_context(|| format!("writing {}", args.output_props.display()))
}

fn run_shim(args: ShimArgs) -> Result<()> {
    let plan: Plan = read_json_file(&args.plan)?;
    fs::write(&args.output, shim::generate(&plan))
        .with_context(|| format!("writing {}", args.output.display()))
}

fn run_linker(args: LinkerArgs) -> Result<()> {
    let mut ir = match &args.input_config {
        Some(path) => LinkerConfigIR::load(path)?,
        None => LinkerConfigIR::default(),
    };

    let plan: Plan = read_json_file(&args.plan)?;
    ir.apply_plan(&plan);

    if let Some(policy_path) = &args.policy {
        let policy = Policy::load(policy_path)?;
        ir.apply_patch(&policy.linker_config);
    }

    ir.save(&args.output)
}

fn run_deps(args: DepsArgs) -> Result<()> {
    let system_libs = deps::load_system_libs(&args.system_libs)?;
    let hal_dependencies = match &args.manifest {
        Some(path) => manifest::parse_vintf(path)?,
        None => Vec::new(),
    };
    let missing_libraries = deps::analyze_vendor_partition(&args.vendor, &system_libs)?;

    let report = deps::DependencyReport {
        hal_dependencies,
        missing_libraries,
    };
    write_json_file(&report, &args.output)
}
