//! Ambient logging, gated behind the `cli` feature the same way the
//! grounding repo gates its own `log()` helper behind `server`.

#[cfg(feature = "cli")]
use std::fs::{self, File};

#[cfg(feature = "cli")]
use simplelog::{ColorChoice, CombinedLogger, Config as LogConfig, LevelFilter, TermLogger, TerminalMode, WriteLogger};

/// Initializes a dual terminal + file logger. Terminal gets `Info` and
/// above; the file under `logs/` gets everything (`Trace`).
#[cfg(feature = "cli")]
pub fn init() -> std::io::Result<()> {
    fs::create_dir_all("logs")?;
    let timestamp = std::process::id();
    let path = format!("logs/spicomp-{timestamp}.log");
    let file = File::create(&path)?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            LogConfig::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Trace, LogConfig::default(), file),
    ])
    .expect("logger already initialized");

    log::info!("logging to {path}");
    Ok(())
}

#[cfg(not(feature = "cli"))]
pub fn init() -> std::io::Result<()> {
    Ok(())
}
