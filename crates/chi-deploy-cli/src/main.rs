//! chi-deploy - resumable CHI/USC protocol deployment
//!
//! Usage:
//!   chi-deploy plan                          # Print the execution order
//!   chi-deploy status --network mainnet      # What the registry holds
//!   chi-deploy rehearse --network test       # Run against a simulated chain
//!   chi-deploy resolve --network mainnet ... # Settle an interrupted run

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chi_deploy_core::chain::{Fault, SimulatedChain};
use chi_deploy_core::config::{ConfigStore, DEFAULT_CONFIG_FILE, DeployConfig};
use chi_deploy_core::context::DeployContext;
use chi_deploy_core::orchestration::{
    DeploymentReport, NodeOutcome, Orchestrator, Resolution, StepResolution, resolve_component,
    resolve_step,
};
use chi_deploy_core::plan::{Component, DeploymentPlan};
use chi_deploy_core::registry::Lifecycle;
use chi_deploy_core::status::{StatusReport, collect_status};
use chi_deploy_core::types::{Address, NetworkId};

#[derive(Parser)]
#[command(name = "chi-deploy")]
#[command(about = "Resumable CHI/USC protocol deployment", long_about = None)]
struct Cli {
    /// Deployment configuration
    #[arg(long, global = true, env = "CHI_DEPLOY_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Registry file (overrides [registry].path from the config)
    #[arg(long, global = true, env = "CHI_DEPLOY_REGISTRY")]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file with the default parameters
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the plan in execution order
    Plan {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show what the registry holds for a network
    Status {
        #[arg(short, long)]
        network: String,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Run the plan against a persistent simulated chain
    ///
    /// The chain state is kept next to the registry, so repeated rehearsals
    /// behave exactly like repeated runs against a real network.
    Rehearse(RehearseArgs),

    /// Settle a deployment or step left in flight by an interrupted run
    Resolve(ResolveArgs),
}

#[derive(Args)]
struct RehearseArgs {
    #[arg(short, long)]
    network: String,

    /// Fail the first transaction matching a contract, method or Contract.method
    #[arg(long, value_name = "TARGET")]
    fail_on: Option<String>,

    /// Where the injected failure happens
    #[arg(long, default_value = "submit", requires = "fail_on")]
    fail_at: FailAt,

    /// Let this many matching transactions through before failing
    #[arg(long, default_value_t = 0, requires = "fail_on")]
    fail_nth: usize,

    /// Output format
    #[arg(short, long, default_value = "table")]
    format: OutputFormat,
}

#[derive(Args)]
struct ResolveArgs {
    #[arg(short, long)]
    network: String,

    /// Component whose deployment was interrupted
    #[arg(required_unless_present = "step", conflicts_with = "step")]
    component: Option<Component>,

    /// Address the deployment landed at; omit if it never landed
    #[arg(long, requires = "component")]
    address: Option<Address>,

    /// Journaled step id, e.g. IDO/mint:IDO
    #[arg(long)]
    step: Option<String>,

    /// The step's transaction landed
    #[arg(long, requires = "step", conflicts_with = "retry")]
    done: bool,

    /// The step's transaction never landed; send it again next run
    #[arg(long, requires = "step")]
    retry: bool,
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
    /// Only report problems (non-zero exit if any)
    Quiet,
}

#[derive(Clone, Copy, ValueEnum)]
enum FailAt {
    /// The node refuses the transaction
    Reject,
    /// The connection drops and the transaction is never sent
    Submit,
    /// The transaction lands but its confirmation is lost
    Confirm,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chi_deploy_core=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => run_init(cli.config, force),
        Commands::Plan { format } => {
            let ctx = DeployContext::load(&cli.config, cli.registry)?;
            run_plan(&ctx.plan(), format)
        }
        Commands::Status { network, format } => {
            let ctx = DeployContext::load(&cli.config, cli.registry)?;
            run_status(&ctx, NetworkId::new(network), format)
        }
        Commands::Rehearse(args) => {
            let ctx = DeployContext::load(&cli.config, cli.registry)?;
            run_rehearse(&ctx, args)
        }
        Commands::Resolve(args) => {
            let ctx = DeployContext::load(&cli.config, cli.registry)?;
            run_resolve(&ctx, args)
        }
    }
}

// =============================================================================
// Init
// =============================================================================

fn run_init(path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    ConfigStore::from_path(path.clone()).save(&DeployConfig::default())?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

// =============================================================================
// Plan
// =============================================================================

fn run_plan(plan: &DeploymentPlan, format: OutputFormat) -> Result<()> {
    let ordered = plan.ordered()?;

    match format {
        OutputFormat::Table => {
            println!("  {:<4} {:<26} {:<8} After", "#", "Node", "Steps");
            println!("  {}", "-".repeat(70));
            for (i, node) in ordered.iter().enumerate() {
                let after: Vec<String> = node.after().iter().map(|n| n.to_string()).collect();
                println!(
                    "  {:<4} {:<26} {:<8} {}",
                    i + 1,
                    node.id().to_string(),
                    node.steps().len(),
                    if after.is_empty() {
                        "-".to_string()
                    } else {
                        after.join(", ")
                    }
                );
            }
        }
        OutputFormat::Json => {
            let nodes: Vec<serde_json::Value> = ordered
                .iter()
                .map(|node| {
                    let id = node.id();
                    serde_json::json!({
                        "id": id.to_string(),
                        "after": node.after().iter().map(|n| n.to_string()).collect::<Vec<_>>(),
                        "steps": node.steps().iter().map(|s| s.step_id(id)).collect::<Vec<_>>(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&nodes)?);
        }
        OutputFormat::Quiet => {}
    }
    Ok(())
}

// =============================================================================
// Status
// =============================================================================

fn run_status(ctx: &DeployContext, network: NetworkId, format: OutputFormat) -> Result<()> {
    let registry = ctx.registry();
    let report = collect_status(&registry, &network, &ctx.plan())?;

    match format {
        OutputFormat::Table => print_status_table(&report),
        OutputFormat::Json => {
            let output = serde_json::json!({
                "schema_version": 1,
                "registry": ctx.registry_path(),
                "network": report.network,
                "components": report.components,
                "pending_steps": report.pending_steps,
                "unplanned": report.unplanned,
                "summary": report.summary,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Quiet => {
            if report.needs_resolution() {
                println!(
                    "{} deployments and {} steps need resolution",
                    report.summary.deploying,
                    report.pending_steps.len()
                );
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

fn print_status_table(report: &StatusReport) {
    println!("Network: {}", style(&report.network).bold());
    println!();
    println!(
        "  {:<22} {:<20} {:<10} Address",
        "Component", "Contract", "State"
    );
    println!("  {}", "-".repeat(96));

    for component in &report.components {
        let address = component
            .address
            .as_ref()
            .map(|a| a.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<22} {:<20} {:<10} {}",
            component.id,
            component.contract,
            lifecycle_label(component.lifecycle),
            address
        );
    }

    if !report.pending_steps.is_empty() {
        println!();
        println!("{}", style("Unconfirmed steps:").yellow().bold());
        for step in &report.pending_steps {
            println!("  {step}");
        }
    }
    if !report.unplanned.is_empty() {
        println!();
        println!("Not in plan: {}", report.unplanned.join(", "));
    }

    let summary = &report.summary;
    println!();
    if summary.is_complete() {
        println!(
            "Summary: {} components, {}",
            summary.total,
            style("all ready").green()
        );
    } else {
        println!(
            "Summary: {} ready, {} deployed, {} deploying, {} missing",
            summary.ready, summary.deployed, summary.deploying, summary.missing
        );
    }
}

fn lifecycle_label(lifecycle: Lifecycle) -> String {
    match lifecycle {
        Lifecycle::Ready => style("ready").green().to_string(),
        Lifecycle::Deployed => style("deployed").cyan().to_string(),
        Lifecycle::Deploying => style("deploying").yellow().to_string(),
        Lifecycle::Unplanned => style("missing").dim().to_string(),
    }
}

// =============================================================================
// Rehearse
// =============================================================================

fn run_rehearse(ctx: &DeployContext, args: RehearseArgs) -> Result<()> {
    let network = NetworkId::new(args.network);
    let chain_path = ctx.rehearsal_chain_path();

    let mut chain = if chain_path.exists() {
        tracing::debug!(path = %chain_path.display(), "resuming rehearsal chain");
        SimulatedChain::load(&chain_path)?
    } else {
        tracing::debug!(path = %chain_path.display(), "starting new rehearsal chain");
        SimulatedChain::with_externals(&ctx.config().external)
    };

    if let Some(target) = args.fail_on {
        let fault = match args.fail_at {
            FailAt::Reject => Fault::rejected(target),
            FailAt::Submit => Fault::on_submit(target),
            FailAt::Confirm => Fault::on_confirm(target),
        };
        chain.inject(fault.nth(args.fail_nth));
    }

    let plan = ctx.plan();
    let mut registry = ctx.registry();
    let result = Orchestrator::new(
        network.clone(),
        &mut registry,
        &mut chain,
        &ctx.config().external,
    )
    .run(&plan);

    // The chain keeps whatever landed, whether or not the run finished.
    chain
        .save(&chain_path)
        .context("Failed to persist rehearsal chain")?;

    let report = result.with_context(|| format!("Rehearsal on {network} stopped"))?;
    match args.format {
        OutputFormat::Table => print_run_table(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Quiet => {}
    }
    Ok(())
}

fn print_run_table(report: &DeploymentReport) {
    println!("  {:<26} {:<10} {:<6} Skipped", "Node", "Outcome", "Sent");
    println!("  {}", "-".repeat(56));
    for node in &report.nodes {
        println!(
            "  {:<26} {:<10} {:<6} {}",
            node.node,
            outcome_label(node.outcome),
            node.steps_sent,
            node.steps_skipped
        );
    }
    println!();
    if report.is_noop() {
        println!(
            "{} already fully deployed; nothing sent",
            style(&report.network).bold()
        );
    } else {
        println!(
            "{} transactions sent on {}",
            report.transactions,
            style(&report.network).bold()
        );
    }
}

fn outcome_label(outcome: NodeOutcome) -> String {
    match outcome {
        NodeOutcome::Deployed => style("deployed").green().to_string(),
        NodeOutcome::Resumed => style("resumed").cyan().to_string(),
        NodeOutcome::Reused => style("reused").dim().to_string(),
        NodeOutcome::Executed => style("executed").green().to_string(),
        NodeOutcome::Skipped => style("skipped").dim().to_string(),
    }
}

// =============================================================================
// Resolve
// =============================================================================

fn run_resolve(ctx: &DeployContext, args: ResolveArgs) -> Result<()> {
    let network = NetworkId::new(args.network);
    let mut registry = ctx.registry();

    if let Some(step) = args.step {
        let resolution = match (args.done, args.retry) {
            (true, false) => StepResolution::Done,
            (false, true) => StepResolution::Retry,
            _ => anyhow::bail!("--step needs exactly one of --done or --retry"),
        };
        resolve_step(&mut registry, &network, &step, resolution)?;
        match resolution {
            StepResolution::Done => println!("Marked {step} as confirmed"),
            StepResolution::Retry => println!("{step} will be sent again on the next run"),
        }
        return Ok(());
    }

    let component = args
        .component
        .context("A component or --step is required")?;
    let resolution = match args.address {
        Some(address) => Resolution::Landed(address),
        None => Resolution::NeverLanded,
    };
    resolve_component(&mut registry, &network, component, resolution.clone())?;
    match resolution {
        Resolution::Landed(address) => {
            println!("Recorded {component} at {address}; wiring continues on the next run")
        }
        Resolution::NeverLanded => {
            println!("Cleared {component}; it will be deployed again on the next run")
        }
    }
    Ok(())
}
