use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use health_dashboard::api::{build_app, state::AppState};
use health_dashboard::client::{ExportFormat, HttpHealthApi, UploadFile};
use health_dashboard::config::AppConfig;
use health_dashboard::dashboard::{DashboardController, DashboardState};
use health_dashboard::models::{
    parse_date, Dataset, FilterSelection, LegacyBucket, PlayerRecord, RegionFilter, VipFilter,
};

#[derive(Parser)]
#[command(name = "health-dashboard")]
#[command(about = "Player health score dashboard: segmentation, VIP cohorts and history")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the dashboard API server
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        /// Directory with the frontend's static files
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Don't fetch the dataset from the backend at startup
        #[arg(long)]
        no_preload: bool,
    },

    /// Summarize a JSON dump offline (no backend needed)
    Summarize {
        /// `{"dados_completos": [...], "resumo": {...}}` or a bare player array
        #[arg(long)]
        input: PathBuf,

        /// Region filter: all, es, br, int
        #[arg(long, default_value = "all")]
        regiao: RegionFilter,

        /// VIP filter: all, 1..5
        #[arg(long, default_value = "all")]
        vip: VipFilter,

        /// Print the six-bucket legacy distribution instead of the summary
        #[arg(long)]
        legacy: bool,
    },

    /// Upload a player spreadsheet (.csv, .xlsx, .xls) for scoring
    Upload {
        #[arg(long)]
        file: PathBuf,
    },

    /// Show stored snapshots, oldest first
    History {
        #[arg(long, default_value = "30")]
        dias: u32,

        #[arg(long, default_value = "all")]
        regiao: RegionFilter,

        #[arg(long, default_value = "all")]
        vip: VipFilter,

        /// Print the executive summary instead of the snapshot list
        #[arg(long, conflicts_with = "compare")]
        executive: bool,

        /// Compare two dates instead: --compare 2025-03-01 2025-03-31
        #[arg(long, num_args = 2, value_names = ["INICIO", "FIM"])]
        compare: Option<Vec<String>>,
    },

    /// Manage stored snapshots
    Snapshot {
        #[command(subcommand)]
        command: SnapshotCommands,
    },

    /// Score history for one or more players
    Trend {
        /// Player ids
        #[arg(required = true)]
        ids: Vec<String>,

        #[arg(long, default_value = "30")]
        dias: u32,
    },

    /// Download the processed dataset
    Export {
        /// csv or excel
        #[arg(long, default_value = "csv")]
        format: ExportFormat,

        /// Output file (defaults to the backend's file name)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum SnapshotCommands {
    /// Save a snapshot of the filtered statistics
    Save {
        /// Snapshot date (YYYY-MM-DD or DD/MM/YYYY), defaults to today on the backend
        #[arg(long)]
        date: Option<String>,

        #[arg(long, default_value = "all")]
        regiao: RegionFilter,

        #[arg(long, default_value = "all")]
        vip: VipFilter,
    },

    /// Delete a snapshot by id, or every snapshot of a date
    Delete {
        #[arg(long, required_unless_present = "date", conflicts_with = "date")]
        id: Option<i64>,

        /// YYYY-MM-DD or DD/MM/YYYY
        #[arg(long)]
        date: Option<String>,
    },
}

/// Offline dump: a full dataset response or just the players.
#[derive(Deserialize)]
#[serde(untagged)]
enum DumpFile {
    Dataset(Dataset),
    Players(Vec<PlayerRecord>),
}

fn build_controller(config: &AppConfig) -> Result<DashboardController> {
    let api = HttpHealthApi::new(&config.backend.base_url, config.backend.timeout())?;
    let taxonomy = config.dashboard.load_taxonomy()?;
    let ttl = config.dashboard.trend_ttl()?;

    Ok(DashboardController::new(
        Arc::new(api),
        Arc::new(taxonomy),
        ttl,
        config.dashboard.trend_concurrency,
    ))
}

fn read_dump(path: &Path) -> Result<Dataset> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let dump: DumpFile = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a dataset dump", path.display()))?;

    Ok(match dump {
        DumpFile::Dataset(dataset) => dataset,
        DumpFile::Players(players) => Dataset {
            dados_completos: players,
            resumo: None,
        },
    })
}

fn cli_date(flag: &str, raw: &str) -> Result<NaiveDate> {
    parse_date(raw).with_context(|| format!("Invalid --{}: {}", flag, raw))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    // Initialize tracing
    let level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level));

    tracing_subscriber::registry()
        .with(filter)
        .with(cli.json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!cli.json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    tracing::info!("Starting health-dashboard v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Serve {
            host,
            port,
            static_dir,
            no_preload,
        } => {
            let controller = build_controller(&config)?;
            tracing::info!(
                "Using {} backend at {}",
                controller.api_name(),
                config.backend.base_url
            );
            if !no_preload {
                match controller.reload().await {
                    Ok(summary) => {
                        tracing::info!("Preloaded {} players", summary.total_jogadores)
                    }
                    Err(e) => tracing::warn!("Preload failed, starting empty: {}", e),
                }
            }

            let static_dir = static_dir.or_else(|| config.server.static_dir.clone());
            let state = AppState::new(controller, config.dashboard.trend_days);
            let app = build_app(state, &config.server.cors_origin, static_dir.as_deref());

            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let addr = format!("{}:{}", host, port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Dashboard: http://{}", addr);
            axum::serve(listener, app).await?;
        }
        Commands::Summarize {
            input,
            regiao,
            vip,
            legacy,
        } => {
            let dataset = read_dump(&input)?;
            let taxonomy = config.dashboard.load_taxonomy()?;

            let mut state = DashboardState::new(Arc::new(taxonomy));
            let ticket = state.begin_load();
            state.complete_load(ticket, dataset.dados_completos, dataset.resumo);
            let summary = state.set_filter(FilterSelection::new(regiao, vip));

            if legacy {
                let distribution = state.legacy_distribution();
                for bucket in LegacyBucket::ALL {
                    let pct = distribution.get(&bucket).copied().unwrap_or(0.0);
                    println!("{:<30} {:>6.2}%", bucket.label(), pct);
                }
            } else {
                println!("{}", serde_json::to_string_pretty(summary.as_ref())?);
            }
        }
        Commands::Upload { file } => {
            let name = file
                .file_name()
                .and_then(|n| n.to_str())
                .context("Upload path has no file name")?
                .to_string();
            let contents = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let upload = UploadFile::new(name, contents)?;

            let controller = build_controller(&config)?;
            let summary = controller.upload(upload).await?;

            println!("\n=== Upload Results ===");
            println!("Players:          {}", summary.total_jogadores);
            println!("Active:           {:.2}%", summary.percentual_ativos);
            println!("Mean score:       {:.2}", summary.media_pontuacao_geral);
        }
        Commands::History {
            dias,
            regiao,
            vip,
            executive,
            compare,
        } => {
            let controller = build_controller(&config)?;
            controller
                .apply_filter(FilterSelection::new(regiao, vip))
                .await;

            if let Some([inicio, fim]) = compare.as_deref() {
                let inicio = cli_date("inicio", inicio)?;
                let fim = cli_date("fim", fim)?;
                anyhow::ensure!(inicio <= fim, "{} is after {}", inicio, fim);

                let comparison = controller.compare_periods(inicio, fim).await?;
                println!("{}", serde_json::to_string_pretty(&comparison)?);
            } else if executive {
                let summary = controller.executive(dias).await?;
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                let history = controller.history(dias).await?;
                println!("{:>6}  {:<12} {:>8} {:>8} {:>8}", "id", "data", "players", "ativos%", "score");
                for snapshot in &history {
                    println!(
                        "{:>6}  {:<12} {:>8} {:>8.2} {:>8.2}",
                        snapshot.id,
                        snapshot.data,
                        snapshot.total_jogadores,
                        snapshot.percentual_ativos,
                        snapshot.media_score_geral
                    );
                }
                println!("\n{} snapshot(s)", history.len());
            }
        }
        Commands::Snapshot { command } => {
            let controller = build_controller(&config)?;
            match command {
                SnapshotCommands::Save { date, regiao, vip } => {
                    let date: Option<NaiveDate> = match date {
                        Some(raw) => Some(cli_date("date", &raw)?),
                        None => None,
                    };
                    controller
                        .apply_filter(FilterSelection::new(regiao, vip))
                        .await;
                    let saved = controller.save_snapshot(date).await?;
                    println!("Saved snapshot for {}", saved.data);
                    if let Some(id) = saved.snapshot_id {
                        println!("Snapshot id: {}", id);
                    }
                }
                SnapshotCommands::Delete { id, date } => match (id, date) {
                    (Some(id), _) => {
                        controller.delete_snapshot(id).await?;
                        println!("Deleted snapshot {}", id);
                    }
                    (None, Some(raw)) => {
                        let date = cli_date("date", &raw)?;
                        controller.delete_snapshots_on(date).await?;
                        println!("Deleted snapshots of {}", date);
                    }
                    (None, None) => anyhow::bail!("pass --id or --date"),
                },
            }
        }
        Commands::Trend { ids, dias } => {
            let controller = build_controller(&config)?;
            if let [id] = ids.as_slice() {
                let trend = controller.player_trend(id, dias).await?;
                println!("{}", serde_json::to_string_pretty(&trend)?);
                return Ok(());
            }

            let batch = controller.player_trends(&ids, dias).await;

            println!("{}", serde_json::to_string_pretty(&batch.trends)?);
            if !batch.failed.is_empty() {
                println!("\nFailed:");
                for (id, err) in &batch.failed {
                    println!("  - {}: {}", id, err);
                }
            }
        }
        Commands::Export { format, output } => {
            let controller = build_controller(&config)?;
            let bytes = controller.export(format).await?;
            let output = output.unwrap_or_else(|| PathBuf::from(format.file_name()));

            std::fs::write(&output, &bytes)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Wrote {} bytes to {}", bytes.len(), output.display());
        }
    }

    Ok(())
}
