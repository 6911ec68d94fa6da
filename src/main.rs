use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use log::info;

use portero::admin::{Notice, NoticeLevel, Outcome, PoolAdmin, ServerSpec, ServerView};
use portero::config::Config;
use portero::haproxy::{PoolKind, ServerExtras, SessionMode};
use portero::reload::signal_reload;
use portero::runtime::{ApiTransport, RuntimeStat};

#[derive(Parser)]
#[command(name = "portero")]
#[command(about = "Backend pool administration for HAProxy: config-file surgery with live runtime mirroring")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Path to the portero configuration file
    #[arg(short, long, default_value = "portero.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Pool {
    Web,
    Db,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Haproxy,
    Database,
}

#[derive(Subcommand)]
enum Commands {
    /// List the servers of a pool, decorated with live runtime status
    List {
        #[arg(short, long, value_enum)]
        pool: Pool,
    },
    /// Add a server to a pool
    Add {
        #[arg(short, long, value_enum)]
        pool: Pool,
        name: String,
        host: String,
        port: u16,
        /// Sticky cookie token (web pool only)
        #[arg(long)]
        cookie: Option<String>,
        /// Enable health checking (web pool; DB servers always check)
        #[arg(long)]
        check: bool,
        /// Disable GTID tracking metadata (DB pool only)
        #[arg(long)]
        no_gtid: bool,
    },
    /// Update an existing server in place
    Update {
        #[arg(short, long, value_enum)]
        pool: Pool,
        /// Current name of the server to rewrite
        original: String,
        name: String,
        host: String,
        port: u16,
        #[arg(long)]
        cookie: Option<String>,
        #[arg(long)]
        check: bool,
        #[arg(long)]
        no_gtid: bool,
    },
    /// Remove a server from a pool
    Remove {
        #[arg(short, long, value_enum)]
        pool: Pool,
        name: String,
    },
    /// Re-enable a disabled server
    Enable {
        #[arg(short, long, value_enum)]
        pool: Pool,
        name: String,
    },
    /// Take a server out of rotation
    Disable {
        #[arg(short, long, value_enum)]
        pool: Pool,
        name: String,
    },
    /// Logical restart through the runtime (disable, then enable)
    Restart {
        #[arg(short, long, value_enum)]
        pool: Pool,
        name: String,
    },
    /// Dump raw runtime statistics for a pool
    Stats {
        #[arg(short, long, value_enum)]
        pool: Pool,
    },
    /// Signal the supervisor to reload a pool's balancer
    Reload {
        #[arg(short, long, value_enum)]
        pool: Pool,
    },
    /// Show or switch the web pool's session stickiness mode
    SessionMode {
        /// Omit to show the current mode
        #[arg(value_enum)]
        mode: Option<ModeArg>,
    },
    /// Generate an example portero configuration file
    GenerateConfig {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Validate a portero configuration file
    ValidateConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::GenerateConfig { output } = &cli.command {
        Config::create_example_config(output).context("failed to generate config")?;
        println!("Configuration written to {}", output.display());
        println!("Edit it to match your deployment, then run: portero -c {} list -p web", output.display());
        return Ok(());
    }

    let config = Config::load_from_file(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    init_logging(&config);

    if let Commands::ValidateConfig = &cli.command {
        // load_from_file already validated
        println!("Configuration file {} is valid", cli.config.display());
        println!("  web pool: backend {} via {}", config.web.backend, config.web.runtime_endpoint);
        println!("  db pool:  backend {} via {}", config.db.backend, config.db.runtime_endpoint);
        match &config.api {
            Some(api) => println!("  runtime API: {}", api.base_url),
            None => println!("  runtime API: not configured"),
        }
        return Ok(());
    }

    run_command(cli.command, &config).await
}

fn admin_for(pool: Pool, config: &Config) -> PoolAdmin {
    match pool {
        Pool::Web => PoolAdmin::new(config.web.clone(), PoolKind::Web, config.api.as_ref()),
        Pool::Db => PoolAdmin::new(config.db.clone(), PoolKind::Db, config.api.as_ref()),
    }
}

fn server_spec(
    pool: Pool,
    name: String,
    host: String,
    port: u16,
    cookie: Option<String>,
    check: bool,
    no_gtid: bool,
) -> ServerSpec {
    match pool {
        Pool::Web => ServerSpec::Web {
            name,
            host,
            port,
            cookie,
            check,
        },
        Pool::Db => ServerSpec::Db {
            name,
            host,
            port,
            gtid: !no_gtid,
        },
    }
}

async fn run_command(command: Commands, config: &Config) -> anyhow::Result<()> {
    match command {
        Commands::List { pool } => {
            let admin = admin_for(pool, config);
            info!("listing backend {}", admin.backend());
            print_views(&admin.list_with_stats().await);
        }
        Commands::Add {
            pool,
            name,
            host,
            port,
            cookie,
            check,
            no_gtid,
        } => {
            let admin = admin_for(pool, config);
            let spec = server_spec(pool, name, host, port, cookie, check, no_gtid);
            print_outcome(&admin.add_server(spec).await?);
        }
        Commands::Update {
            pool,
            original,
            name,
            host,
            port,
            cookie,
            check,
            no_gtid,
        } => {
            let admin = admin_for(pool, config);
            let spec = server_spec(pool, name, host, port, cookie, check, no_gtid);
            print_outcome(&admin.update_server(&original, spec).await?);
        }
        Commands::Remove { pool, name } => {
            let admin = admin_for(pool, config);
            print_outcome(&admin.remove_server(&name).await?);
        }
        Commands::Enable { pool, name } => {
            let admin = admin_for(pool, config);
            print_outcome(&admin.set_enabled(&name, true).await?);
        }
        Commands::Disable { pool, name } => {
            let admin = admin_for(pool, config);
            print_outcome(&admin.set_enabled(&name, false).await?);
        }
        Commands::Restart { pool, name } => {
            let admin = admin_for(pool, config);
            print_outcome(&admin.restart_server(&name).await?);
        }
        Commands::Stats { pool } => {
            let admin = admin_for(pool, config);
            print_stats(&admin.fetch_stats().await);
        }
        Commands::Reload { pool } => {
            let target = match pool {
                Pool::Web => &config.web,
                Pool::Db => &config.db,
            };
            let mut signalled = signal_reload(&target.reload_flag);
            if let Some(api) = &config.api {
                signalled |= ApiTransport::new(api).reload().await;
            }
            if signalled {
                println!("reload signalled for backend {}", target.backend);
            } else {
                println!("warning: could not signal a reload for backend {}", target.backend);
            }
        }
        Commands::SessionMode { mode } => {
            let admin = admin_for(Pool::Web, config);
            match mode {
                None => println!("session mode: {}", admin.session_mode().as_str()),
                Some(arg) => {
                    let mode = match arg {
                        ModeArg::Haproxy => SessionMode::Haproxy,
                        ModeArg::Database => SessionMode::Database,
                    };
                    print_outcome(&admin.set_session_mode(mode).await?);
                }
            }
        }
        Commands::GenerateConfig { .. } | Commands::ValidateConfig => unreachable!("handled in main"),
    }

    Ok(())
}

fn print_outcome(outcome: &Outcome) {
    for notice in &outcome.notices {
        print_notice(notice);
    }
}

fn print_notice(notice: &Notice) {
    let prefix = match notice.level {
        NoticeLevel::Success => "ok",
        NoticeLevel::Warning => "warning",
        NoticeLevel::Error => "error",
    };
    println!("{prefix}: {}", notice.text);
}

fn print_views(views: &[ServerView]) {
    println!(
        "{:<12} {:<20} {:>6} {:<10} {:<8} {}",
        "NAME", "HOST", "PORT", "STATUS", "FLAGS", "DETAIL"
    );
    for view in views {
        let record = &view.record;
        let mut flags = Vec::new();
        if record.check {
            flags.push("check");
        }
        if record.disabled {
            flags.push("disabled");
        }
        let detail = match &record.extras {
            ServerExtras::Web(web) => match &web.cookie {
                Some(cookie) => format!("cookie={cookie} / {}", view.last_check),
                None => view.last_check.clone(),
            },
            ServerExtras::Db(db) => {
                if db.backup {
                    flags.push("backup");
                }
                format!(
                    "role={} gtid={} / {}",
                    db.role,
                    if db.gtid { "on" } else { "off" },
                    view.last_check
                )
            }
        };

        println!(
            "{:<12} {:<20} {:>6} {:<10} {:<8} {}",
            record.name,
            record.host,
            record.port.map(|p| p.to_string()).unwrap_or_default(),
            view.status,
            flags.join(","),
            detail
        );
    }
}

fn print_stats(stats: &HashMap<String, RuntimeStat>) {
    if stats.is_empty() {
        println!("no runtime statistics available (is the admin socket reachable?)");
        return;
    }
    for (name, stat) in stats {
        println!(
            "{name}: status={} check={} last={} changed={}s",
            stat.status,
            stat.check_status,
            stat.last_check,
            stat.last_change_sec
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string())
        );
    }
}

fn init_logging(config: &Config) {
    let level = match config.logging.level.as_str() {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    };

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}
