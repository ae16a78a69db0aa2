use std::{path::PathBuf, process::ExitCode, time::Duration};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use continuum::{
    AnalysisApi, AnalysisRequest, ClientConfig, FileCategory, GridSpec,
    HealthMonitor, HealthState, HttpBackend, LayoutResult, LocalStore, SessionController,
    SessionError, TerminalPresenter, UploadFile, create_grid,
    analysis::{
        McpMethod, McpRequest, MetFilterRequest, NeuralMcpRequest, OptimizeLayoutRequest,
        OptimizeMethod, Records, WakeRequest, WakeTurbine,
    },
    config::{DEFAULT_API_URL, DEFAULT_STORE_PATH},
    layout_metrics,
    render::{RenderOptions, save_layout_png},
};

type Session = SessionController<HttpBackend, TerminalPresenter>;

#[derive(Parser)]
#[command(name = "continuum")]
#[command(about = "Client for the Continuum wind-resource analysis API")]
struct Cli {
    /// Base URL of the analysis API
    #[arg(long, global = true, env = "CONTINUUM_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Local store remembering the last opened project
    #[arg(long, global = true, env = "CONTINUUM_STORE", default_value = DEFAULT_STORE_PATH)]
    store: PathBuf,

    /// Request timeout in seconds (default: none)
    #[arg(long, global = true, env = "CONTINUUM_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Project to open before running the command (default: the recent project)
    #[arg(long, global = true)]
    project: Option<String>,

    /// Print analysis results on a single line
    #[arg(long, global = true)]
    compact: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create, open and list projects
    Projects {
        #[command(subcommand)]
        action: ProjectsCommand,
    },
    /// Upload and list project files
    Files {
        #[command(subcommand)]
        action: FilesCommand,
    },
    /// Run an analysis on the backend
    Analyze {
        #[command(subcommand)]
        analysis: AnalyzeCommand,
    },
    /// Work with turbine layouts locally
    Layout {
        #[command(subcommand)]
        action: LayoutCommand,
    },
    /// Check whether the backend is reachable
    Health {
        /// Keep polling and report every change
        #[arg(long)]
        watch: bool,

        /// Polling interval in seconds when watching (default: 30)
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

#[derive(Subcommand)]
enum ProjectsCommand {
    List,
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        author: String,
    },
    Open {
        name: String,
    },
    /// Show the project remembered from the last session
    Recent,
    /// Forget the remembered project
    Close,
}

#[derive(Subcommand)]
enum FilesCommand {
    Upload {
        /// met, turbines, topography, landcover or results
        #[arg(short, long)]
        category: FileCategory,

        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    List,
}

#[derive(Subcommand)]
enum AnalyzeCommand {
    MetFilter {
        /// JSON array of met records
        data: PathBuf,
        #[arg(long)]
        keep_tower_shadow: bool,
        #[arg(long)]
        keep_ice: bool,
        #[arg(long)]
        keep_high_std: bool,
        #[arg(long, default_value_t = 10.0)]
        ref_height: f64,
        #[arg(long, default_value_t = 80.0)]
        target_height: f64,
    },
    Mcp {
        reference: PathBuf,
        target: PathBuf,
        #[arg(long, default_value = "orthogonal")]
        method: McpMethod,
        #[arg(long, default_value_t = 12)]
        sectors: u32,
        #[arg(long, default_value = "reference")]
        reference_name: String,
        #[arg(long, default_value = "target")]
        target_name: String,
    },
    McpNeural {
        reference: PathBuf,
        target: PathBuf,
        #[arg(long, value_delimiter = ',', default_value = "64,32,16")]
        hidden_layers: Vec<u32>,
        #[arg(long, default_value_t = 500)]
        epochs: u32,
        #[arg(long, default_value_t = 1e-3)]
        learning_rate: f64,
    },
    Wake {
        /// JSON array of {name, x, y, hub_height, rotor_diameter, ct?}
        turbines: PathBuf,
        #[arg(long, default_value_t = 50)]
        grid_resolution: u32,
        #[arg(long, default_value_t = 12)]
        sectors: u32,
    },
    LayoutGrid {
        #[command(flatten)]
        grid: GridArgs,
        /// Write the returned layout as a PNG map
        #[arg(long)]
        render: Option<PathBuf>,
    },
    LayoutOptimize {
        #[arg(long)]
        n_turbines: u32,
        #[arg(long)]
        min_x: f64,
        #[arg(long)]
        max_x: f64,
        #[arg(long)]
        min_y: f64,
        #[arg(long)]
        max_y: f64,
        #[arg(long, default_value = "ga")]
        method: OptimizeMethod,
        #[arg(long)]
        render: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum LayoutCommand {
    /// Generate a grid locally and print its metrics
    Preview {
        #[command(flatten)]
        grid: GridArgs,
        #[arg(long)]
        render: Option<PathBuf>,
        #[arg(long, default_value_t = 800)]
        width: u32,
        #[arg(long, default_value_t = 600)]
        height: u32,
    },
}

#[derive(Args)]
struct GridArgs {
    #[arg(long)]
    rows: u32,
    #[arg(long)]
    cols: u32,
    /// Column spacing in metres
    #[arg(long)]
    spacing_x: f64,
    /// Row spacing in metres
    #[arg(long)]
    spacing_y: f64,
    #[arg(long, default_value_t = 0.0)]
    offset_x: f64,
    #[arg(long, default_value_t = 0.0)]
    offset_y: f64,
    /// Shift odd rows by half a column
    #[arg(long)]
    staggered: bool,
}

impl GridArgs {
    fn spec(&self) -> GridSpec {
        GridSpec::new(self.rows, self.cols, self.spacing_x, self.spacing_y)
            .with_offset(self.offset_x, self.offset_y)
            .with_staggered(self.staggered)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "continuum=debug" } else { "continuum=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // session errors were already shown by the presenter
            if e.downcast_ref::<SessionError>().is_none() {
                eprintln!("Error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ClientConfig::new(&cli.api_url)?
        .with_timeout(cli.timeout_secs.map(Duration::from_secs))
        .with_store_path(&cli.store);
    debug!(base_url = %config.base_url, store = ?config.store_path, "configuration loaded");

    match cli.command {
        Command::Layout { action } => preview_layout(action),
        Command::Health {
            watch,
            interval_secs,
        } => {
            let config = match interval_secs {
                Some(secs) => config.with_health_interval(Duration::from_secs(secs.max(1))),
                None => config,
            };
            let backend = HttpBackend::new(&config)?;
            if watch {
                watch_health(&backend, config.health_interval).await;
                Ok(())
            } else {
                report_health(&backend).await
            }
        }
        Command::Projects { action } => {
            let (mut session, store) = open_session(&config, cli.compact).await?;
            let result = projects(&mut session, action).await;
            store.close().await;
            result
        }
        Command::Files { action } => {
            let (mut session, store) = open_session(&config, cli.compact).await?;
            let result = files(&mut session, action, cli.project).await;
            store.close().await;
            result
        }
        Command::Analyze { analysis } => {
            let request = build_request(&analysis).await?;
            let (mut session, store) = open_session(&config, cli.compact).await?;
            let result = analyze(&mut session, request, render_target(&analysis), cli.project).await;
            store.close().await;
            result
        }
    }
}

async fn open_session(config: &ClientConfig, compact: bool) -> anyhow::Result<(Session, LocalStore)> {
    let store = LocalStore::open(&config.store_path).await?;
    let backend = HttpBackend::new(config)?;
    let session =
        SessionController::new(backend, TerminalPresenter::new(!compact)).with_store(store.clone());
    Ok((session, store))
}

async fn analyze(
    session: &mut Session,
    request: AnalysisRequest,
    render: Option<&PathBuf>,
    project: Option<String>,
) -> anyhow::Result<()> {
    if request.kind().requires_project() || project.is_some() {
        enter_project(session, project).await?;
    }
    let body = session.run_analysis(&request).await?;
    if let Some(path) = render {
        let layout = LayoutResult::from_body(&body)
            .context("Analysis result has no turbine layout to render")?;
        save_layout_png(path, &layout.turbines, &RenderOptions::default())?;
        info!(path = ?path, turbines = layout.turbines.len(), "layout map written");
    }
    Ok(())
}

/// Opens `--project`, or the remembered project when none is given.
async fn enter_project(session: &mut Session, project: Option<String>) -> anyhow::Result<()> {
    let name = match project {
        Some(name) => Some(name),
        None => session.recent_project().await.map(|p| p.to_string()),
    };
    if let Some(name) = name {
        session.open_project(&name).await?;
    }
    Ok(())
}

async fn projects(session: &mut Session, action: ProjectsCommand) -> anyhow::Result<()> {
    match action {
        ProjectsCommand::List => {
            let projects = session.list_projects().await?;
            if projects.is_empty() {
                println!("No projects yet.");
            }
            for project in projects {
                let updated = project
                    .updated_at()
                    .map(|ts| ts.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<24} {:<16} {:<28} {}",
                    project.name, project.author, updated, project.description
                );
            }
        }
        ProjectsCommand::Create {
            name,
            description,
            author,
        } => {
            session.create_project(&name, &description, &author).await?;
        }
        ProjectsCommand::Open { name } => {
            let details = session.open_project(&name).await?;
            println!(
                "met sites: {}, turbines: {}, topography: {}, land cover: {}",
                details.met_sites_count.unwrap_or_default(),
                details.turbines_count.unwrap_or_default(),
                yes_no(details.has_topography),
                yes_no(details.has_land_cover),
            );
        }
        ProjectsCommand::Recent => match session.recent_project().await {
            Some(name) => println!("{name}"),
            None => println!("No recent project."),
        },
        ProjectsCommand::Close => {
            session.close_project();
            session.forget_recent_project().await;
            println!("Recent project cleared.");
        }
    }
    Ok(())
}

fn yes_no(flag: Option<bool>) -> &'static str {
    if flag.unwrap_or_default() { "yes" } else { "no" }
}

async fn files(
    session: &mut Session,
    action: FilesCommand,
    project: Option<String>,
) -> anyhow::Result<()> {
    enter_project(session, project).await?;
    match action {
        FilesCommand::Upload { category, paths } => {
            let mut files = Vec::with_capacity(paths.len());
            for path in &paths {
                files.push(UploadFile::from_path(path).await?);
            }
            let report = session.upload_files(files, category).await?;
            if report.failed() > 0 {
                bail!(
                    "{} of {} uploads failed",
                    report.failed(),
                    report.outcomes.len()
                );
            }
        }
        FilesCommand::List => {
            let Some(project) = session.current_project().cloned() else {
                bail!("No project is open; pass --project or open one first");
            };
            session.refresh_file_list(&project).await?;
            for category in FileCategory::ALL {
                let files = session.cached_files_by_category(&project, category);
                if files.is_empty() {
                    continue;
                }
                println!("{category}:");
                for file in files {
                    println!("  {}", file.filename);
                }
            }
        }
    }
    Ok(())
}

async fn read_json<T: DeserializeOwned>(path: &PathBuf) -> anyhow::Result<T> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_slice(&bytes).with_context(|| format!("Failed to parse {:?} as JSON", path))
}

async fn build_request(analysis: &AnalyzeCommand) -> anyhow::Result<AnalysisRequest> {
    let request = match analysis {
        AnalyzeCommand::MetFilter {
            data,
            keep_tower_shadow,
            keep_ice,
            keep_high_std,
            ref_height,
            target_height,
        } => AnalysisRequest::MetFilter(MetFilterRequest {
            data: read_json::<Records>(data).await?,
            remove_tower_shadow: !keep_tower_shadow,
            remove_ice: !keep_ice,
            remove_high_std: !keep_high_std,
            ref_height: *ref_height,
            target_height: *target_height,
        }),
        AnalyzeCommand::Mcp {
            reference,
            target,
            method,
            sectors,
            reference_name,
            target_name,
        } => AnalysisRequest::Mcp(McpRequest {
            reference_data: read_json(reference).await?,
            target_data: read_json(target).await?,
            method: *method,
            sectors: *sectors,
            reference_name: reference_name.clone(),
            target_name: target_name.clone(),
        }),
        AnalyzeCommand::McpNeural {
            reference,
            target,
            hidden_layers,
            epochs,
            learning_rate,
        } => AnalysisRequest::McpNeural(NeuralMcpRequest {
            reference_data: read_json(reference).await?,
            target_data: read_json(target).await?,
            hidden_layers: hidden_layers.clone(),
            epochs: *epochs,
            learning_rate: *learning_rate,
        }),
        AnalyzeCommand::Wake {
            turbines,
            grid_resolution,
            sectors,
        } => AnalysisRequest::Wake(WakeRequest {
            turbines: read_json::<Vec<WakeTurbine>>(turbines).await?,
            grid_resolution: *grid_resolution,
            sectors: *sectors,
        }),
        AnalyzeCommand::LayoutGrid { grid, .. } => AnalysisRequest::LayoutGrid(grid.spec()),
        AnalyzeCommand::LayoutOptimize {
            n_turbines,
            min_x,
            max_x,
            min_y,
            max_y,
            method,
            ..
        } => AnalysisRequest::LayoutOptimize(OptimizeLayoutRequest {
            n_turbines: *n_turbines,
            min_x: *min_x,
            max_x: *max_x,
            min_y: *min_y,
            max_y: *max_y,
            method: *method,
        }),
    };
    debug!(kind = %request.kind(), "analysis request built");
    Ok(request)
}

fn render_target(analysis: &AnalyzeCommand) -> Option<&PathBuf> {
    match analysis {
        AnalyzeCommand::LayoutGrid { render, .. } | AnalyzeCommand::LayoutOptimize { render, .. } => {
            render.as_ref()
        }
        _ => None,
    }
}

fn preview_layout(action: LayoutCommand) -> anyhow::Result<()> {
    let LayoutCommand::Preview {
        grid,
        render,
        width,
        height,
    } = action;

    let turbines = create_grid(&grid.spec())?;
    let metrics = layout_metrics(&turbines);
    println!("{}", serde_json::to_string_pretty(&metrics)?);

    if let Some(path) = render {
        let options = RenderOptions {
            width,
            height,
            ..RenderOptions::default()
        };
        save_layout_png(&path, &turbines, &options)?;
        println!("✓ Layout map written to {}", path.display());
    }
    Ok(())
}

async fn report_health<B: AnalysisApi>(backend: &B) -> anyhow::Result<()> {
    match continuum::core::health::check(backend).await {
        HealthState::Connected => {
            println!("✓ Backend connected");
            Ok(())
        }
        HealthState::Disconnected(reason) => bail!("Backend disconnected: {reason}"),
        HealthState::Unknown => bail!("Backend state unknown"),
    }
}

async fn watch_health<B: AnalysisApi>(backend: &B, interval: Duration) {
    let (monitor, mut rx) = HealthMonitor::new(interval);
    let printer = async move {
        while rx.changed().await.is_ok() {
            match &*rx.borrow_and_update() {
                HealthState::Connected => println!("✓ Backend connected"),
                HealthState::Disconnected(reason) => eprintln!("✗ Backend disconnected: {reason}"),
                HealthState::Unknown => {}
            }
        }
    };
    tokio::join!(monitor.run(backend), printer);
}
