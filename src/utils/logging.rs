use chrono::Local;
use env_logger::{Target, WriteStyle};
use log::LevelFilter;
use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::Path,
};

/// Installs the process logger.
///
/// Lines are `<timestamp>: [LEVEL] message`. With a `log_file` the output is
/// appended there instead of going to stderr.
pub fn init_logging(debug: bool, log_file: Option<&str>) -> io::Result<()> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{}: [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        });

    if let Some(log_file) = log_file {
        // Create log directory if it doesn't exist
        if let Some(parent) = Path::new(log_file).parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(log_file)?;
        builder
            .target(Target::Pipe(Box::new(file)))
            .write_style(WriteStyle::Never);
    }

    builder
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
}
