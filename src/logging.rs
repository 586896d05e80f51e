use log::LevelFilter;

/// Routes `log` records to stdout with a timestamp, level and target.
pub fn setup_logger(level: LevelFilter) -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        // async-imap and lettre are chatty at debug level
        .level_for("async_imap", LevelFilter::Warn)
        .level_for("lettre", LevelFilter::Warn)
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}
