//! List a tar archive, or print the named entries to stdout
//!
//! Usage: `tarcat ARCHIVE [ENTRY...]`

use tarfs::{Config, OpenFlags, TarFs};

use sloggers::terminal::{Destination, TerminalLoggerBuilder};
use sloggers::types::{Format, Severity};
use sloggers::Build;

use std::io::{self, Write};

const MAX_ENTRIES: usize = 1 << 16;

fn main() {
    std::process::exit(real_main());
}

fn real_main() -> i32 {
    let mut builder = TerminalLoggerBuilder::new();
    builder.level(Severity::Info);
    builder.destination(Destination::Stderr);
    builder.format(Format::Compact);
    let logger = match builder.build() {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Unable to set up logging: {}", e);
            return 2;
        }
    };

    let mut args = std::env::args_os().skip(1);
    let path = match args.next() {
        Some(path) => path,
        None => {
            eprintln!("Usage: tarcat ARCHIVE [ENTRY...]");
            return 2;
        }
    };
    let names: Vec<String> = args.map(|arg| arg.to_string_lossy().into_owned()).collect();

    let mut config = Config::new();
    config.set_max_inodes(MAX_ENTRIES).set_logger(logger.clone());
    let mut fs = config.build();
    if let Err(e) = fs.init_from_path(&path) {
        slog::crit!(logger, "{}", e);
        return 1;
    }

    let result = if names.is_empty() {
        list(&fs)
    } else {
        names.iter().try_for_each(|name| cat(&mut fs, name))
    };
    match result {
        Ok(()) => 0,
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => 0,
        Err(e) => {
            slog::crit!(logger, "{}", e);
            1
        }
    }
}

fn list(fs: &TarFs<'_>) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for meta in fs.entries() {
        let modified = meta
            .modified()
            .map(|time| time.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        write!(
            out,
            "{} {:>5}/{:<5} {:>10} {:16} {}",
            meta.permissions(),
            meta.uid(),
            meta.gid(),
            meta.size(),
            modified,
            meta.name(),
        )?;
        if !meta.link_name().is_empty() {
            write!(out, " -> {}", meta.link_name())?;
        }
        writeln!(out)?;
    }
    out.flush()
}

fn cat(fs: &mut TarFs<'_>, name: &str) -> io::Result<()> {
    let fd = fs.open(name, OpenFlags::READ)?;
    let stdout = io::stdout();
    let result = io::copy(&mut fs.file(fd)?, &mut stdout.lock());
    fs.close(fd)?;
    result.map(drop)
}
