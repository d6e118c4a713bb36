use std::fs;
use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};
use trackplan_analyzer::diagnostics::Severity;
use trackplan_analyzer::model::{InMemoryModel, LayoutModel};
use trackplan_analyzer::{AnalyzeMode, AnalyzerConfig, TrackPlanAnalyzer};

#[derive(Parser, Debug)]
#[command(name = "trackplan-cli", author, version, about, long_about = None)]
struct Cli {
    /// Path to a layout plan JSON file (an `InMemoryModel`)
    #[arg(env)]
    plan: PathBuf,

    /// Whether to synthesize autogen routes or only purge existing ones
    #[arg(long, value_enum, default_value_t = Mode::Generate)]
    mode: Mode,

    /// Run the occ-list post-processing that writes `blockid` back onto
    /// every sensor/signal/switch an occ-list names
    #[arg(long)]
    strict: bool,

    /// Generate `fbevent` children for routes ending on a trailing signal
    #[arg(long)]
    feedback_events: bool,

    /// Where to write the analyzed plan back to, as JSON. Defaults to
    /// overwriting `plan` in place.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
    Generate,
    Clean,
}

impl From<Mode> for AnalyzeMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Generate => AnalyzeMode::Generate,
            Mode::Clean => AnalyzeMode::Clean,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env()))
        .init();

    let cli = Cli::parse();

    let bytes = fs::read(&cli.plan)
        .with_context(|| format!("failed to read plan at {}", cli.plan.display()))?;
    let mut model: InMemoryModel =
        serde_json::from_slice(&bytes).context("invalid layout plan JSON")?;

    info!(tiles = model.tiles().len(), locos = model.locos().len(), "loaded layout plan");

    let config = AnalyzerConfig {
        strict_mode: cli.strict,
        route_builder: trackplan_analyzer::route::RouteBuilderConfig {
            generate_feedback_events: cli.feedback_events,
        },
        ..AnalyzerConfig::default()
    };
    let analyzer = TrackPlanAnalyzer::new(config);
    let report = analyzer.analyze(&mut model, cli.mode.into());

    print_diagnostics(&report);
    print_routes(&model);

    let out_path = cli.out.unwrap_or(cli.plan);
    let rendered =
        serde_json::to_vec_pretty(&model).context("failed to serialize analyzed plan")?;
    fs::write(&out_path, rendered)
        .with_context(|| format!("failed to write analyzed plan to {}", out_path.display()))?;

    if report.healthy {
        Ok(())
    } else {
        Err(anyhow!("plan has health diagnostics at error severity; see log output above"))
    }
}

fn print_diagnostics(report: &trackplan_analyzer::AnalysisReport) {
    println!(
        "health: {}",
        if report.healthy { "OK" } else { "UNHEALTHY" }
    );
    for diag in report.diagnostics.all() {
        let marker = match diag.severity {
            Severity::Info => "info",
            Severity::Warning => "warn",
            Severity::Error => "error",
        };
        match &diag.subject {
            Some(subject) => println!("  [{marker}] {} ({subject})", diag.message),
            None => println!("  [{marker}] {}", diag.message),
        }
    }
}

fn print_routes(model: &InMemoryModel) {
    println!("routes:");
    for route in model.routes() {
        let swcmds: Vec<String> = route
            .swcmds
            .iter()
            .map(|cmd| format!("{}={}", cmd.id, cmd.cmd))
            .collect();
        println!(
            "  {} : {}{} <-> {}{} [{}]",
            route.id,
            route.bka,
            route.bkaside,
            route.bkb,
            route.bkbside,
            swcmds.join(", "),
        );
    }
}
