use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use clap::Parser;
use log::{info, warn};

use winlog_probe::reader::{
    EventLog, EVENTLOG_BACKWARDS_READ, EVENTLOG_FORWARDS_READ, EVENTLOG_SEQUENTIAL_READ,
};
use winlog_probe::registrar::{Registrar, SourceSpec, WindowsRegistry, EVENTLOG_INFORMATION_TYPE};
use winlog_probe::sys::Win32Api;
use winlog_probe::types::ReadSummary;

#[derive(Parser)]
#[command(name = "winlog-probe")]
#[command(about = "Register an event source and dump raw bytes from its log")]
struct Args {
    /// Event source to register and read from
    #[arg(short, long, default_value = "testProgram")]
    source: String,

    /// Remote machine to read from (UNC server name); defaults to local
    #[arg(long)]
    host: Option<String>,

    /// Message resource file registered for the source
    #[arg(long)]
    message_file: Option<PathBuf>,

    /// Read oldest records first instead of most recent first
    #[arg(long)]
    forwards: bool,

    /// Record offset passed to the read call
    #[arg(long, default_value_t = 0)]
    offset: u32,

    /// Number of bytes to dump from the read buffer
    #[arg(long, default_value_t = 1000)]
    read: u32,

    /// Write a JSON summary of the read to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let registry = WindowsRegistry::new();
    let registrar = Registrar::new(&registry);
    if !registrar.exists_source(&args.source) {
        let message_file = match args.message_file.clone() {
            Some(path) => path,
            None => env::current_dir()?.join("ExampleMessageFile.txt"),
        };
        registrar.install_source(&SourceSpec {
            name: args.source.clone(),
            message_file,
            uses_event_message_file: true,
            event_types_supported: EVENTLOG_INFORMATION_TYPE,
        })?;
    }
    info!("Installed correctly");

    let api = Win32Api::new();
    let mut event_log = match &args.host {
        Some(host) => EventLog::open_remote(&api, host, &args.source)?,
        None => EventLog::open(&api, &args.source)?,
    };

    let direction = if args.forwards {
        EVENTLOG_FORWARDS_READ
    } else {
        EVENTLOG_BACKWARDS_READ
    };
    event_log.set_read_flags(EVENTLOG_SEQUENTIAL_READ | direction);
    event_log.read_event_log(args.offset, args.read);

    let bytes_dumped = {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        event_log.dump_to(&mut out, 0, args.read as usize)?
    };

    if event_log.min_read() > 0 {
        warn!(
            "buffer may be undersized; the log reports {} bytes needed",
            event_log.min_read()
        );
    }

    if let Some(path) = &args.output {
        let summary = ReadSummary {
            source: args.source.clone(),
            host: args.host.clone(),
            read_flags: event_log.read_flags(),
            record_offset: args.offset,
            buffer_size: event_log.buffer_size(),
            min_bytes_needed: event_log.min_read(),
            bytes_dumped,
            collected_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        };
        fs::write(path, serde_json::to_string_pretty(&summary)?)?;
        info!("Read summary written to: {}", path.display());
    }

    Ok(())
}
