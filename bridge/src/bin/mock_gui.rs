//! Stand-in GUI subprocess for exercising the bridge end to end.
//!
//! Launched with the same command line the bridge hands a real Python
//! interpreter. Announces itself on stdout and stderr, then lingers
//! until its stdin closes, a deadline passes, or it is killed.

use std::io::Read;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;

use pyblish_bridge::constants::launch;

/// Deadline override for test processes that cannot pass the flag.
const LINGER_ENV: &str = "PYBLISH_MOCK_GUI_LINGER_MS";
const DEFAULT_LINGER_MS: u64 = 30_000;

#[derive(Parser, Debug)]
#[command(about = "Pyblish mock GUI - stands in for the QML subprocess")]
struct GuiArgs {
    /// Interpreter passthrough: unbuffered output. Accepted and ignored.
    #[arg(short = 'u')]
    unbuffered: bool,

    /// Module to run; the bridge always asks for `pyblish_qml`.
    #[arg(short = 'm')]
    module: String,

    /// Marks this process as a child of a host application.
    #[arg(long)]
    aschild: bool,

    /// Publish targets for this session.
    #[arg(long, num_args = 0..)]
    targets: Vec<String>,

    /// Run the window modally.
    #[arg(long)]
    modal: bool,

    /// How long to keep running without input before giving up.
    #[arg(long)]
    linger_ms: Option<u64>,
}

fn linger(args: &GuiArgs) -> Duration {
    let ms = args
        .linger_ms
        .or_else(|| std::env::var(LINGER_ENV).ok().and_then(|v| v.parse().ok()))
        .unwrap_or(DEFAULT_LINGER_MS);
    Duration::from_millis(ms)
}

fn main() -> Result<()> {
    let args = GuiArgs::parse();
    pyblish_bridge::logging::init();

    if args.module != launch::GUI_MODULE {
        bail!("unexpected module: {}", args.module);
    }
    if !args.aschild {
        bail!("refusing to run standalone; pass --aschild");
    }

    println!(
        "mock GUI up (pid {}, modal {}, targets [{}])",
        std::process::id(),
        args.modal,
        args.targets.join(", ")
    );
    // Colored on purpose; the host-side relay strips this.
    eprintln!("\x1b[33mmock GUI reporting on stderr\x1b[0m");
    tracing::info!(
        modal = args.modal,
        unbuffered = args.unbuffered,
        targets = ?args.targets,
        "mock GUI started"
    );

    // The bridge holds our stdin open for as long as the host lives.
    let (eof_tx, eof_rx) = mpsc::channel();
    thread::spawn(move || {
        let mut sink = Vec::new();
        let _ = std::io::stdin().read_to_end(&mut sink);
        let _ = eof_tx.send(());
    });

    match eof_rx.recv_timeout(linger(&args)) {
        Ok(()) => tracing::info!("host closed stdin, shutting down"),
        Err(_) => tracing::info!("linger deadline reached, shutting down"),
    }
    Ok(())
}
