//! `tracing-subscriber` setup shared by every binary, configured from the
//! `--log`/`--verbose` options.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

/// `--verbose` occurrence count: 0/1/2 → error/info/debug.
pub fn filter_for_verbosity(verbose: u8) -> EnvFilter {
    let level = match verbose {
        0 => "error",
        1 => "info",
        _ => "debug",
    };
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

#[derive(Clone)]
struct SharedFile(Arc<Mutex<File>>);

impl Write for SharedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.0.lock() {
            Ok(mut file) => file.write(buf),
            Err(_) => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.0.lock() {
            Ok(mut file) => file.flush(),
            Err(_) => Ok(()),
        }
    }
}

/// Initializes the global subscriber. `log` is a file path, or `None` for
/// stderr (`log`: "file path or stderr"). A second call from the same
/// process is a harmless no-op.
pub fn init(log: Option<&Path>, verbose: u8) {
    let filter = filter_for_verbosity(verbose);
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let opened = log.and_then(|path| {
            std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
            .map(|file| SharedFile(Arc::new(Mutex::new(file))))
        });

    let result = match opened {
        Some(shared) => builder.with_writer(move || shared.clone()).with_ansi(false).try_init(),
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    let _ = result;
}
