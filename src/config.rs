use cwl::Result;

use log::LevelFilter;
use simple_logger::SimpleLogger;

/// Logs at `Info` unless `RUST_LOG` says otherwise
pub fn configure_app() -> Result {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()?;

    return Ok(());
}
