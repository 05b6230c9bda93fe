use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use proxysql_sync::config::{Config, ConfigError};
use proxysql_sync::{SyncError, SyncMode};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "proxysql-sync")]
#[command(about = "Reconcile ProxySQL servers and users with the cluster topology")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover database pods and reconcile mysql_servers
    Servers {
        #[command(flatten)]
        common: CommonArgs,
        /// Writer hostgroup id
        #[arg(long)]
        rw_hostgroup: Option<u32>,
        /// Reader hostgroup id
        #[arg(long)]
        ro_hostgroup: Option<u32>,
    },
    /// Mirror upstream accounts into mysql_users
    Users {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        upstream: UpstreamArgs,
    },
    /// Run the servers pass, then the users pass, from one configuration
    All {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Generate an example configuration file
    Config {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Validate configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show version information
    Version,
}

/// Flags shared by the sync commands
#[derive(Args)]
struct CommonArgs {
    /// Path to configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// ProxySQL admin host
    #[arg(long)]
    admin_host: Option<String>,
    /// ProxySQL admin port
    #[arg(long)]
    admin_port: Option<u16>,
    /// ProxySQL admin user
    #[arg(long)]
    admin_user: Option<String>,
    /// ProxySQL admin password
    #[arg(long, env = "PROXYSQL_ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: Option<String>,
    /// Upper bound on the whole pass, in seconds
    #[arg(long)]
    deadline_sec: Option<u64>,
}

impl CommonArgs {
    fn apply(self, config: &mut Config) {
        if let Some(host) = self.admin_host {
            config.admin.host = host;
        }
        if let Some(port) = self.admin_port {
            config.admin.port = port;
        }
        if let Some(user) = self.admin_user {
            config.admin.username = user;
        }
        if let Some(password) = self.admin_password {
            config.admin.password = password;
        }
        if let Some(deadline) = self.deadline_sec {
            config.sync.deadline_sec = deadline;
        }
    }
}

/// Flags for the upstream account catalog
#[derive(Args)]
struct UpstreamArgs {
    /// Upstream MySQL host
    #[arg(long)]
    mysql_host: Option<String>,
    /// Upstream MySQL port
    #[arg(long)]
    mysql_port: Option<u16>,
    /// Upstream MySQL user
    #[arg(long)]
    mysql_user: Option<String>,
    /// Upstream MySQL password
    #[arg(long, env = "MYSQL_PASSWORD", hide_env_values = true)]
    mysql_password: Option<String>,
    /// Hostgroup assigned to every mirrored user
    #[arg(long)]
    default_hostgroup: Option<u32>,
    /// Connection ceiling for every mirrored user
    #[arg(long)]
    max_connections: Option<u32>,
}

impl UpstreamArgs {
    fn apply(self, config: &mut Config) {
        let upstream = &mut config.accounts.upstream;
        if let Some(host) = self.mysql_host {
            upstream.host = host;
        }
        if let Some(port) = self.mysql_port {
            upstream.port = port;
        }
        if let Some(user) = self.mysql_user {
            upstream.username = user;
        }
        if let Some(password) = self.mysql_password {
            upstream.password = password;
        }
        if let Some(id) = self.default_hostgroup {
            config.accounts.default_hostgroup = id;
        }
        if let Some(limit) = self.max_connections {
            config.accounts.max_connections = limit;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Servers {
            common,
            rw_hostgroup,
            ro_hostgroup,
        } => run_servers(common, rw_hostgroup, ro_hostgroup).await,
        Commands::Users { common, upstream } => run_users(common, upstream).await,
        Commands::All { common } => run_all(common).await,
        Commands::Config { output } => generate_config(output),
        Commands::Validate { config } => validate_config(config),
        Commands::Version => {
            show_version();
            Ok(())
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_servers(
    common: CommonArgs,
    rw_hostgroup: Option<u32>,
    ro_hostgroup: Option<u32>,
) -> Result<()> {
    let mut config = load_config(common)?;
    if let Some(id) = rw_hostgroup {
        config.topology.writer_hostgroup = id;
    }
    if let Some(id) = ro_hostgroup {
        config.topology.reader_hostgroup = id;
    }

    run_sync(SyncMode::Servers, config).await
}

async fn run_users(common: CommonArgs, upstream: UpstreamArgs) -> Result<()> {
    let mut config = load_config(common)?;
    upstream.apply(&mut config);

    run_sync(SyncMode::Users, config).await
}

async fn run_all(common: CommonArgs) -> Result<()> {
    let config = load_config(common)?;
    run_sync(SyncMode::All, config).await
}

/// Config file when given, defaults otherwise, then deployment environment, then flags
fn load_config(common: CommonArgs) -> Result<Config> {
    let mut config = match common.config.as_deref() {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => Config::default(),
    };

    config.apply_env(|key| std::env::var(key).ok());
    common.apply(&mut config);
    Ok(config)
}

async fn run_sync(mode: SyncMode, config: Config) -> Result<()> {
    init_logging(&config)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        mode = mode.mode_name(),
        namespace = %config.topology.namespace,
        group = %config.topology.group_name,
        admin = %format!("{}:{}", config.admin.host, config.admin.port),
        "starting sync"
    );

    if let Err(e) = mode.run(&config).await {
        report_failure(mode, &e);
        return Err(e).with_context(|| format!("sync {} failed", mode.mode_name()));
    }

    info!(mode = mode.mode_name(), "sync completed");
    Ok(())
}

fn report_failure(mode: SyncMode, e: &SyncError) {
    error!(mode = mode.mode_name(), stage = %e.stage(), error = %e, "sync failed");
    if e.traffic_may_be_stale() {
        error!(
            mode = mode.mode_name(),
            "rows were written but not activated; the proxy may still serve the previous table"
        );
    }
}

fn generate_config(output: PathBuf) -> Result<()> {
    println!("Generating configuration file: {:?}", output);

    Config::create_example_config(&output).context("Failed to generate config")?;

    println!("Configuration file generated successfully!");
    println!("Edit the file to match your environment and run:");
    println!("  proxysql-sync servers --config {:?}", output);
    println!("  proxysql-sync users --config {:?}", output);

    Ok(())
}

fn validate_config(config_path: PathBuf) -> Result<()> {
    println!("Validating configuration file: {:?}", config_path);

    match Config::load_from_file(&config_path) {
        Ok(config) => {
            println!("✓ Configuration file is valid");
            println!(
                "  Admin interface: {}:{}",
                config.admin.host, config.admin.port
            );
            println!(
                "  Topology: namespace={:?} group={:?} type={}",
                config.topology.namespace,
                config.topology.group_name,
                config.topology.server_type.as_str()
            );
            println!(
                "  Hostgroups: writer={} reader={}",
                config.topology.writer_hostgroup, config.topology.reader_hostgroup
            );
            println!(
                "  Users: default_hostgroup={} max_connections={}",
                config.accounts.default_hostgroup, config.accounts.max_connections
            );
            println!("  Deadline: {}s", config.sync.deadline_sec);

            if let Err(e) = config.validate_for_servers() {
                println!("  ! servers command needs more: {}", e);
            }
            if let Err(e) = config.validate_for_users() {
                println!("  ! users command needs more: {}", e);
            }
        }
        Err(e) => {
            eprintln!("✗ Configuration file validation failed:");
            match &e {
                ConfigError::IoError(msg) => eprintln!("  File error: {}", msg),
                ConfigError::ParseError(msg) => eprintln!("  Parse error: {}", msg),
                ConfigError::ValidationError(msg) => eprintln!("  Validation error: {}", msg),
                ConfigError::SerializeError(msg) => eprintln!("  Serialization error: {}", msg),
            }
            return Err(e.into());
        }
    }

    Ok(())
}

fn show_version() {
    println!("proxysql-sync v{}", env!("CARGO_PKG_VERSION"));
    println!("Reconcile ProxySQL servers and users with the cluster topology");
    println!();
    println!("Target: {}", std::env::consts::ARCH);
    println!();
    println!("Commands:");
    println!("  • servers: pods labelled for the service group -> mysql_servers");
    println!("  • users: upstream accounts granted to this host -> mysql_users");
    println!("  • all: servers, then users");
}

fn init_logging(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("Invalid log level")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = match config.logging.format.as_str() {
        "json" => builder.json().try_init(),
        _ => builder.try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
