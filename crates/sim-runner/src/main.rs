//! ADAS Simulator - Main Entry Point

use std::path::PathBuf;

use sim_runner::{demo_script, init_logging, run, RunnerConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = RunnerConfig::load(config_path.as_deref())?;
    init_logging(&config)?;

    info!("=== ADAS Simulator v{} ===", env!("CARGO_PKG_VERSION"));

    let mut script = demo_script();
    tokio::select! {
        summary = run(&config, &mut script) => {
            let summary = summary?;
            if let Some(last) = summary.last {
                info!("Final state: mode {}, ego lane {}", last.mode, last.ego.lane_index);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, stopping simulation");
        }
    }

    Ok(())
}
