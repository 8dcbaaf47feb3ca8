//! Command-line flags for the daemon binary. A flat struct rather than a
//! `Commands` enum: this daemon has no subcommands, only startup options.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pidcontrold")]
#[command(about = "Closed-loop thermal and fan control daemon", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the zone/sensor configuration file (.json or .toml).
    #[arg(long, value_name = "PATH")]
    pub conf: PathBuf,

    /// Directory for the per-zone diagnostic CSV trace; also the directory
    /// checked for the `logging`/`tuning`/`debugging`/`corelogging`
    /// sentinel files. Presence alone enables the CSV trace; pass
    /// --corelogging too for the per-PID numerical logs.
    #[arg(long, value_name = "DIR")]
    pub log: Option<PathBuf>,

    /// Directory holding per-zone tuning override files, re-read each cycle.
    #[arg(long, value_name = "DIR")]
    pub tuning: Option<PathBuf>,

    /// Enable verbose per-tick debug logging.
    #[arg(long)]
    pub debug: bool,

    /// Enable pidcore.*/pidcoeffs.* and per-zone CSV diagnostic output.
    #[arg(long)]
    pub corelogging: bool,

    /// Path to write this process's pid file.
    #[arg(long, value_name = "PATH")]
    pub pidfile: Option<PathBuf>,
}
