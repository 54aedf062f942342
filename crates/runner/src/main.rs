use log::{error, info, warn};
use vantage_dashboard::{DashboardState, NoticeLevel};
use vantage_runner::{DashboardApp, RunnerConfig};

fn print_help() {
    eprintln!(
        r#"Vantage - live trading dashboard over a simulated engine

USAGE:
    vantage [OPTIONS]

OPTIONS:
    --config <PATH>     Load configuration from JSON file
    --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG            Log level filter (default: info)

EXAMPLES:
    # Run with defaults
    vantage

    # Run with config file
    vantage --config vantage.json
"#
    );
}

fn summarize(state: &DashboardState) {
    info!(
        "[DASHBOARD] value={} pnl={} (day {} / week {} / month {}) agents={}/{} win_rate={}% pending={} executed={} positions={}{}",
        state.portfolio_value.round_dp(2),
        state.total_pnl.round_dp(2),
        state.daily_pnl.round_dp(2),
        state.weekly_pnl.round_dp(2),
        state.monthly_pnl.round_dp(2),
        state.active_agents,
        state.total_agents,
        state.win_rate.round_dp(1),
        state.pending_orders.len(),
        state.executed_orders.len(),
        state.open_positions.len(),
        if state.connected { "" } else { " [DISCONNECTED]" }
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
                config_path = Some(args[i].clone());
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            RunnerConfig::from_file(&path)?
        }
        None => {
            info!("Using default configuration");
            RunnerConfig::default()
        }
    };
    info!(
        "Symbols: {}, seed agents: {}, refresh every {}ms",
        config.symbols.len(),
        config.agents.len(),
        config.refresh_interval_ms
    );

    let app = DashboardApp::from_config(config)?;
    let feed = app.spawn_feed();
    let mut notices = app.hub.notices();
    let mut console = app.hub.subscribe("console").await;
    summarize(&console.state());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down...");
                break;
            }
            changed = console.changed() => match changed {
                Ok(state) => summarize(&state),
                Err(e) => {
                    error!("Dashboard subscription ended: {}", e);
                    break;
                }
            },
            Ok(notice) = notices.recv() => match notice.level {
                NoticeLevel::Error => error!("[NOTICE] {}", notice.message),
                NoticeLevel::Warning => warn!("[NOTICE] {}", notice.message),
                NoticeLevel::Info => info!("[NOTICE] {}", notice.message),
            },
        }
    }

    console.unsubscribe();
    if let Some(feed) = feed {
        let stats = feed.stop().await;
        info!(
            "Feed ran {} ticks, {} price updates, {} fills",
            stats.ticks, stats.price_updates, stats.fills
        );
    }
    Ok(())
}
