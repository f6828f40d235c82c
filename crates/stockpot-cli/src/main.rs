#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::error::Error;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process;

use clap::builder::PossibleValuesParser;
use clap::{Arg, ArgAction, ArgMatches, Args, CommandFactory, FromArgMatches, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stockpot_config::Manifest;
use stockpot_engine::{
    declare_dependencies, load_manifest, Action, OptionSpec, PlanOptions, Toolchain,
};

type CliResult = Result<(), Box<dyn Error>>;

/// Subcommands that accept per-dependency flags.
const OPTION_SUBCOMMANDS: [&str; 3] = ["deps", "plan", "build"];

#[derive(Debug, Parser)]
#[command(
    name = "stockpot",
    about = "Build third-party C++ dependencies from their source locations"
)]
#[command(version)]
struct Cli {
    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Run as if started in <DIR>
    #[arg(short = 'C', long = "directory", value_name = "DIR", global = true)]
    directory: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a new stockpot project
    Init {
        /// Project name (defaults to the directory name)
        #[arg(long)]
        name: Option<String>,
    },
    /// List declared dependencies and where they resolve to
    Deps {
        #[command(flatten)]
        variant: VariantArgs,
    },
    /// Show the build graph without running it
    Plan {
        #[command(flatten)]
        variant: VariantArgs,
        /// Print the graph as JSON
        #[arg(long)]
        json: bool,
    },
    /// Build every dependency that has a source path
    Build {
        #[command(flatten)]
        variant: VariantArgs,
    },
    /// Remove build artifacts
    Clean,
}

#[derive(Debug, Clone, Args)]
struct VariantArgs {
    /// Build in release mode
    #[arg(long)]
    release: bool,
    /// Toolchain name used in the variant directory
    #[arg(long, default_value = "cxx")]
    toolchain: String,
}

/// The parsed command line plus the values of per-dependency flags.
struct Invocation {
    cli: Cli,
    options: BTreeMap<String, String>,
}

fn main() {
    if let Err(msg) = run(std::env::args_os().collect()) {
        eprintln!("error: {msg}");
        process::exit(1);
    }
}

fn run(args: Vec<OsString>) -> CliResult {
    let base = std::env::current_dir()?;
    let root = project_dir(&base, &args);
    // Flags can only be offered for dependencies the manifest declares; a
    // missing or broken manifest is reported later by the command itself.
    let manifest = load_manifest(&root).ok();

    let invocation = match parse(manifest.as_ref(), args) {
        Ok(invocation) => invocation,
        Err(err) => err.exit(),
    };
    init_tracing(invocation.cli.verbose);

    let root = invocation
        .cli
        .directory
        .as_ref()
        .map_or(root, |dir| base.join(dir));
    match invocation.cli.command {
        Command::Init { name } => cmd_init(&root, name),
        Command::Deps { variant } => cmd_deps(&root, &plan_options(&variant, invocation.options)),
        Command::Plan { variant, json } => {
            cmd_plan(&root, &plan_options(&variant, invocation.options), json)
        }
        Command::Build { variant } => cmd_build(&root, &plan_options(&variant, invocation.options)),
        Command::Clean => cmd_clean(&root),
    }
}

/// Work out the project directory from `-C` before the full parse, since the
/// manifest found there decides which flags exist.
///
/// The arguments are scanned directly: flags for dependencies that are not
/// registered yet would stop clap before it reaches `-C`. The last
/// occurrence wins, and nothing after `--` is considered.
fn project_dir(base: &Path, args: &[OsString]) -> PathBuf {
    let mut directory: Option<OsString> = None;
    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        let Some(arg) = arg.to_str() else {
            continue;
        };
        if arg == "--" {
            break;
        }
        if arg == "--directory" {
            directory = rest.next().cloned();
        } else if let Some(dir) = arg.strip_prefix("--directory=") {
            directory = Some(dir.into());
        } else if let Some(cluster) = arg.strip_prefix('-').filter(|c| !c.starts_with('-')) {
            // -C app, -Capp, -C=app, -vC app
            if let Some(dir) = cluster.trim_start_matches('v').strip_prefix('C') {
                let dir = dir.strip_prefix('=').unwrap_or(dir);
                directory = if dir.is_empty() {
                    rest.next().cloned()
                } else {
                    Some(dir.into())
                };
            }
        }
    }
    directory.map_or_else(|| base.to_path_buf(), |dir| base.join(dir))
}

/// Parse `args`, registering every declared dependency's flags first.
fn parse(manifest: Option<&Manifest>, args: Vec<OsString>) -> Result<Invocation, clap::Error> {
    let mut specs = Vec::new();
    if let Some(manifest) = manifest {
        for handler in declare_dependencies(manifest) {
            handler.add_options(&mut |spec| specs.push(spec));
        }
    }

    let mut command = Cli::command();
    for name in OPTION_SUBCOMMANDS {
        command = command.mut_subcommand(name, |sub| {
            specs.iter().fold(sub, |sub, spec| sub.arg(option_arg(spec)))
        });
    }

    let matches = command.try_get_matches_from(args)?;
    let cli = Cli::from_arg_matches(&matches)?;
    let options = match matches.subcommand() {
        Some((name, sub)) if OPTION_SUBCOMMANDS.contains(&name) => collect_options(sub, &specs),
        _ => BTreeMap::new(),
    };
    Ok(Invocation { cli, options })
}

fn option_arg(spec: &OptionSpec) -> Arg {
    let arg = Arg::new(spec.name.clone())
        .long(spec.name.clone())
        .value_name("VALUE")
        .help(spec.help.clone())
        .help_heading("Dependency options");
    match spec.possible_values {
        Some(values) => arg.value_parser(PossibleValuesParser::new(values.iter().copied())),
        None => arg,
    }
}

fn collect_options(matches: &ArgMatches, specs: &[OptionSpec]) -> BTreeMap<String, String> {
    specs
        .iter()
        .filter_map(|spec| {
            let value = matches.get_one::<String>(&spec.name)?;
            Some((spec.name.clone(), value.clone()))
        })
        .collect()
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn plan_options(variant: &VariantArgs, options: BTreeMap<String, String>) -> PlanOptions {
    PlanOptions {
        toolchain: variant.toolchain.clone(),
        release: variant.release,
        options,
    }
}

/// Load the manifest at `root`, pointing at `stockpot init` when there is none.
fn project_manifest(root: &Path) -> Result<Manifest, Box<dyn Error>> {
    if !root.join(stockpot_engine::plan::MANIFEST_FILE).exists() {
        return Err(format!(
            "no stockpot.toml found in {} — run `stockpot init` to create a project",
            root.display()
        )
        .into());
    }
    Ok(load_manifest(root)?)
}

fn cmd_init(base: &Path, name: Option<String>) -> CliResult {
    let (project_name, project_dir) = match name {
        Some(name) => {
            let dir = base.join(&name);
            (name, dir)
        }
        None => {
            let name = base
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("my-project")
                .to_owned();
            (name, base.to_path_buf())
        }
    };

    stockpot_engine::init_project(&project_name, &project_dir)?;

    eprintln!(
        "    Created project `{project_name}` at {}",
        project_dir.display()
    );
    eprintln!();
    eprintln!("  Declare dependencies under [dependencies.<name>] in stockpot.toml, then run:");
    eprintln!("    stockpot build");
    Ok(())
}

fn cmd_deps(root: &Path, options: &PlanOptions) -> CliResult {
    let manifest = project_manifest(root)?;
    let reports = stockpot_engine::resolve_dependencies(root, &manifest, options)?;

    if reports.is_empty() {
        eprintln!("    No dependencies declared");
        return Ok(());
    }
    for report in &reports {
        match (&report.location, &report.version) {
            (Some(location), Some(version)) => {
                println!("{} {version} ({})", report.name, location.display());
            }
            _ => println!("{} unavailable", report.name),
        }
    }
    Ok(())
}

fn cmd_plan(root: &Path, options: &PlanOptions, json: bool) -> CliResult {
    let manifest = project_manifest(root)?;
    let plan = stockpot_engine::plan(root, &manifest, options)?;

    if json {
        println!("{}", plan.graph.to_json()?);
        return Ok(());
    }

    println!("variant: {}", plan.variant);
    for report in &plan.dependencies {
        let status = match (&report.location, report.library) {
            (None, _) => "unavailable".to_owned(),
            (Some(_), Some(library)) => format!("library {library}"),
            (Some(_), None) => "headers only".to_owned(),
        };
        println!("dependency {}: {status}", report.name);
    }
    for include in &plan.includes {
        println!("include {}", include.display());
    }
    for include in &plan.sys_includes {
        println!("sys-include {}", include.display());
    }
    for node in plan.graph.nodes() {
        let kind = match &node.action {
            Action::Compile { .. } => "compile",
            Action::Link { .. } => "link",
            Action::Install { .. } => "install",
        };
        println!("{} {kind} {}", node.id, node.action.target().display());
    }
    Ok(())
}

fn cmd_build(root: &Path, options: &PlanOptions) -> CliResult {
    let manifest = project_manifest(root)?;
    let toolchain = Toolchain::from_env();
    let result = stockpot_engine::build(root, &manifest, options, &toolchain)?;

    let unavailable: Vec<&str> = result
        .plan
        .dependencies
        .iter()
        .filter(|d| !d.is_available())
        .map(|d| d.name.as_str())
        .collect();
    if !unavailable.is_empty() {
        eprintln!("    Skipped unavailable: {}", unavailable.join(", "));
    }

    let executed = result.execution.executed;
    eprintln!(
        "    Finished `{}` dependencies in {:.2}s ({} compiled, {} linked, {} installed)",
        result.plan.variant.profile,
        result.duration.as_secs_f64(),
        executed.compile,
        executed.link,
        executed.install
    );
    Ok(())
}

fn cmd_clean(root: &Path) -> CliResult {
    let manifest = project_manifest(root)?;
    let removed = stockpot_engine::clean(root, &manifest)?;

    eprintln!("    Cleaned {}", removed.display());
    Ok(())
}
