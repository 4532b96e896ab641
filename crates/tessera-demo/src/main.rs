use std::process::ExitCode;

use tessera_engine::{init_logging, GpuInit, LoggingConfig, Runtime, RuntimeConfig};

mod scenes;

fn run() -> anyhow::Result<()> {
    let name = std::env::args().nth(1).unwrap_or_else(|| "triangles".to_string());
    let scene = scenes::by_name(&name)?;

    let config = RuntimeConfig {
        title: format!("tessera: {name}"),
        ..RuntimeConfig::default()
    };

    let stats = Runtime::run(config, GpuInit::default(), scene)?;
    log::info!("exited cleanly after {} frame(s)", stats.presented);
    Ok(())
}

fn main() -> ExitCode {
    init_logging(LoggingConfig::default());

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("tessera-demo failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}
