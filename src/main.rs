use anyhow::Result;
use clap::Parser;
use sidecar_reaper::{
    resolve_identity, KubernetesStatusProvider, ProcessEnv, ProxyAdminActuator, ReaperConfig,
    ReaperOrchestrator, WatchPlan,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "sidecar-reaper")]
#[command(about = "Shuts down the mesh proxy once a pod's application containers have finished")]
#[command(version)]
#[command(long_about = "Runs as an extra container next to a service mesh proxy. It watches the \
pod's other containers through the Kubernetes API and, once every one of them has terminated, \
asks the proxy to shut down so that run-to-completion pods (Jobs, CronJobs) can finish.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "sidecar-reaper.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose logging (per-container status on every poll)")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without watching")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Dry run mode - read the pod and print the watch plan
    #[arg(long, help = "Resolve identity, read the pod once and print what would be watched")]
    dry_run: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle special modes that don't require full initialization
    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    // Initialize logging
    let log_guard = init_logging(&args)?;

    info!("Starting sidecar reaper v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    // Load and validate configuration
    let config = ReaperConfig::load_from_file(&args.config).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        if args.validate_config {
            eprintln!("✗ Configuration validation failed: {}", e);
            drop(log_guard);
            std::process::exit(1);
        }
        return Err(e.into());
    }

    if args.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid");
        return Ok(());
    }

    // Identity and collaborators; any failure here is fatal
    let identity = resolve_identity(&config.identity, &ProcessEnv).map_err(|e| {
        error!("Failed to resolve pod identity: {}", e);
        e
    })?;

    let provider = KubernetesStatusProvider::new(&config.cluster, &ProcessEnv).map_err(|e| {
        error!("Failed to create Kubernetes client: {}", e);
        e
    })?;

    let actuator = ProxyAdminActuator::new(&config.proxy.shutdown_url).map_err(|e| {
        error!("Failed to create proxy shutdown client: {}", e);
        e
    })?;

    let mut orchestrator =
        ReaperOrchestrator::new(config, identity, Arc::new(provider), Arc::new(actuator));

    // Handle dry run mode
    if args.dry_run {
        match orchestrator.prepare().await? {
            WatchPlan::Skip { proxy_name } => {
                println!("✓ No {} container in pod; nothing to watch", proxy_name);
            }
            WatchPlan::Watch(watch_set) => {
                println!(
                    "✓ Would watch {} and then shut down {}",
                    watch_set,
                    orchestrator.identity().proxy_name
                );
            }
        }
        return Ok(());
    }

    let reason = orchestrator.run().await.map_err(|e| {
        error!("Sidecar reaper failed: {}", e);
        e
    })?;

    let exit_code = reason.exit_code();
    info!("Sidecar reaper finished ({:?}), exit code {}", reason, exit_code);

    // Flush buffered log lines before exiting
    drop(log_guard);
    std::process::exit(exit_code);
}

fn init_logging(args: &Args) -> Result<WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Determine log directives based on flags
    let directives = if args.debug {
        "sidecar_reaper=debug"
    } else if args.verbose {
        // Per-container status lines live in the watch module
        "sidecar_reaper=info,sidecar_reaper::watch=debug"
    } else if args.quiet {
        "sidecar_reaper=error"
    } else {
        "sidecar_reaper=info"
    };

    // Create environment filter
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
    let verbose = args.debug || args.verbose;

    // Configure format based on options
    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("pretty") => fmt::layer()
            .pretty()
            .with_writer(writer)
            .with_target(true)
            .with_file(verbose)
            .with_line_number(verbose)
            .boxed(),
        Some("compact") | None => fmt::layer()
            .compact()
            .with_writer(writer)
            .with_target(verbose)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .compact()
                .with_writer(writer)
                .with_target(verbose)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(guard)
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Sidecar reaper configuration file");
    println!("# Every key can also be set as SIDECAR_REAPER_<SECTION>__<KEY>");
    println!("# Optional keys: identity.pod_name, identity.proxy_container,");
    println!("#   identity.terminator_container, watch.max_wait_seconds, cluster.api_url");
    println!();

    let rendered = toml::to_string_pretty(&ReaperConfig::default())?;
    println!("{}", rendered);
    Ok(())
}
