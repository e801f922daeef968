use clap::{Args, Parser, Subcommand};
use radius_control::{
    ArtifactGenerator, AuditLogger, ChainValidator, CoaClient, CoaError, CommandReloader,
    CommandValidator, Config, JsonFileStore, NadRef, NoopReloader, PlaintextSecrets, PolicyStore,
    Publisher, Reconciler, Reloader, StructuralValidator, Watcher,
};
use radius_proto::{CoaChange, SessionIdentifiers, VlanAssignment};
use std::net::IpAddr;
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// RADIUS policy compiler, config reconciler and CoA client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "radius-control")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "CONFIG", default_value = "radius-control.json")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write an example configuration file
    Init,
    /// Validate the configuration and exit
    Check,
    /// Watch the store and keep the daemon configuration reconciled
    Run,
    /// Run one forced reconciliation and print the report as JSON
    Reconcile,
    /// Send a Disconnect-Request to a NAD
    Disconnect(SessionArgs),
    /// Send a CoA-Request to a NAD
    Coa {
        #[command(flatten)]
        session: SessionArgs,
        /// Group policy / ACL / role name to apply
        #[arg(long)]
        group_policy: Option<String>,
        /// Security group tag to apply
        #[arg(long)]
        sgt: Option<u16>,
        /// Remove the URL redirect from the session
        #[arg(long)]
        remove_url_redirect: bool,
        /// VLAN id or name to move the session to
        #[arg(long)]
        vlan: Option<String>,
        /// New Session-Timeout in seconds
        #[arg(long)]
        session_timeout: Option<u32>,
    },
}

#[derive(Args, Debug)]
struct SessionArgs {
    /// NAD id or IP address
    #[arg(long)]
    nad: String,
    #[arg(long)]
    user_name: Option<String>,
    #[arg(long)]
    acct_session_id: Option<String>,
    #[arg(long)]
    calling_station_id: Option<String>,
}

impl SessionArgs {
    fn nad_ref(&self) -> Result<NadRef, String> {
        if let Ok(ip) = self.nad.parse::<IpAddr>() {
            return Ok(NadRef::Ip(ip));
        }
        self.nad
            .parse()
            .map(NadRef::Id)
            .map_err(|_| format!("'{}' is neither a NAD id nor an IP address", self.nad))
    }

    fn identifiers(&self) -> SessionIdentifiers {
        SessionIdentifiers {
            user_name: self.user_name.clone(),
            acct_session_id: self.acct_session_id.clone(),
            calling_station_id: self.calling_station_id.clone(),
        }
    }
}

fn init_tracing(config: &Config) {
    let log_level = config.log_level.as_deref().unwrap_or("info");
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config(path: &str) -> Config {
    match Config::from_file(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error in {}: {}", path, e);
            eprintln!("Run `radius-control --config {} init` to create an example.", path);
            process::exit(1);
        }
    }
}

fn open_audit(config: &Config) -> Arc<AuditLogger> {
    match AuditLogger::new(config.audit_log_path.clone()) {
        Ok(logger) => Arc::new(logger),
        Err(e) => {
            error!("Cannot open audit log: {}", e);
            process::exit(1);
        }
    }
}

fn build_reconciler(
    config: &Config,
    store: Arc<dyn PolicyStore>,
    audit: Arc<AuditLogger>,
) -> Reconciler {
    let mut validator = ChainValidator::new();
    if config.validator.structural {
        validator = validator.with(Arc::new(StructuralValidator));
    }
    if !config.validator.command.is_empty() {
        validator = validator.with(Arc::new(CommandValidator::new(
            config.validator.command.clone(),
            config.validator_timeout(),
        )));
    }
    let reloader: Arc<dyn Reloader> = if config.reload.command.is_empty() {
        warn!("No reload command configured; the daemon must pick up changes itself");
        Arc::new(NoopReloader)
    } else {
        Arc::new(CommandReloader::new(config.reload.command.clone(), config.reload_timeout()))
    };

    let generator = ArtifactGenerator::new(
        config.layout.clone(),
        config.site.clone(),
        config.sql.clone(),
        Arc::new(PlaintextSecrets),
    );
    let publisher = Publisher::new(&config.raddb_dir, &config.state_dir, Arc::new(validator));
    Reconciler::new(store, generator, publisher, reloader, audit)
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            error!("Cannot serialize result: {}", e);
            process::exit(1);
        }
    }
}

fn report_coa_error(e: CoaError) -> ! {
    let kind = if e.is_caller_error() { "request rejected" } else { "exchange failed" };
    eprintln!("{}: {}", kind, e);
    process::exit(if e.is_caller_error() { 2 } else { 1 });
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Command::Init = cli.command {
        if std::path::Path::new(&cli.config).exists() {
            eprintln!("{} already exists; not overwriting", cli.config);
            process::exit(1);
        }
        if let Err(e) = Config::example().to_file(&cli.config) {
            eprintln!("Error creating example config: {}", e);
            process::exit(1);
        }
        println!("Wrote example configuration to {}", cli.config);
        return;
    }

    let config = load_config(&cli.config);

    if let Command::Check = cli.command {
        println!("✓ Configuration validated successfully!");
        println!();
        println!("Configuration summary:");
        println!("  raddb: {}", config.raddb_dir.display());
        println!("  State: {}", config.state_dir.display());
        println!("  Store: {}", config.store_path.display());
        println!("  Poll interval: {}s", config.poll_interval_secs);
        println!("  Structural validation: {}", config.validator.structural);
        println!("  Validator command: {}", config.validator.command.join(" "));
        println!("  Reload command: {}", config.reload.command.join(" "));
        println!("  SQL module: {}", if config.sql.enabled { "enabled" } else { "disabled" });
        println!("  CoA timeout: {}ms", config.coa.timeout_ms);
        if let Some(ref path) = config.audit_log_path {
            println!("  Audit log: {}", path);
        }
        return;
    }

    init_tracing(&config);
    let audit = open_audit(&config);
    let store: Arc<dyn PolicyStore> = Arc::new(JsonFileStore::new(&config.store_path));
    info!(
        store = %config.store_path.display(),
        backend = store.backend_name(),
        "using policy store"
    );

    match cli.command {
        Command::Init | Command::Check => {}
        Command::Reconcile => {
            let mut reconciler = build_reconciler(&config, store, audit);
            match reconciler.force().await {
                Ok(report) => {
                    print_json(&report);
                    if report.validation_failed || !report.errors.is_empty() {
                        process::exit(1);
                    }
                }
                Err(e) => {
                    error!("Reconciliation failed: {}", e);
                    process::exit(1);
                }
            }
        }
        Command::Run => {
            info!("radius-control v{}", env!("CARGO_PKG_VERSION"));
            info!(raddb = %config.raddb_dir.display(), "reconciling daemon configuration");
            let reconciler = build_reconciler(&config, store, audit);
            let (handle, task) = Watcher::new(reconciler, config.poll_interval()).spawn();

            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Cannot listen for shutdown signal: {}", e);
            }
            info!("Shutdown requested; finishing in-flight reconciliation");
            handle.shutdown();
            if let Err(e) = task.await {
                error!("Watcher task failed: {}", e);
                process::exit(1);
            }
        }
        Command::Disconnect(session) => {
            let nad = session.nad_ref().unwrap_or_else(|e| {
                eprintln!("{}", e);
                process::exit(2);
            });
            let client = CoaClient::new(store, config.coa.clone(), audit);
            match client.send_disconnect(nad, &session.identifiers()).await {
                Ok(result) => print_json(&result),
                Err(e) => report_coa_error(e),
            }
        }
        Command::Coa {
            session,
            group_policy,
            sgt,
            remove_url_redirect,
            vlan,
            session_timeout,
        } => {
            let nad = session.nad_ref().unwrap_or_else(|e| {
                eprintln!("{}", e);
                process::exit(2);
            });
            let mut changes = Vec::new();
            if let Some(policy) = group_policy {
                changes.push(CoaChange::GroupPolicy(policy));
            }
            if let Some(tag) = sgt {
                changes.push(CoaChange::SecurityGroupTag(tag));
            }
            if remove_url_redirect {
                changes.push(CoaChange::RemoveUrlRedirect);
            }
            if let Some(vlan) = vlan {
                let assignment = match vlan.parse::<u16>() {
                    Ok(id) => VlanAssignment::Id(id),
                    Err(_) => VlanAssignment::Name(vlan),
                };
                changes.push(CoaChange::Vlan(assignment));
            }
            if let Some(seconds) = session_timeout {
                changes.push(CoaChange::SessionTimeout(seconds));
            }

            let client = CoaClient::new(store, config.coa.clone(), audit);
            match client.send_coa(nad, &session.identifiers(), &changes).await {
                Ok(result) => print_json(&result),
                Err(e) => report_coa_error(e),
            }
        }
    }
}
