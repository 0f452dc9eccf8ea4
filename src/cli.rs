use clap::{builder::styling::AnsiColor, Parser, Subcommand, ValueHint};
use libprocscan::{ModulesFilter, ScanArgs};

/// procscan - inspect a live process for injection, hollowing, and hooks.
#[derive(Parser, Debug)]
#[command(
    name = "procscan",
    bin_name = "procscan",
    about = "Detects code injection, process hollowing, and inline hooks in a live process",
    version,
    propagate_version = true,
    arg_required_else_help = true,
    styles = clap::builder::Styles::styled()
        .header(AnsiColor::BrightYellow.on_default())
        .usage(AnsiColor::BrightYellow.on_default())
        .literal(AnsiColor::BrightGreen.on_default())
        .placeholder(AnsiColor::BrightCyan.on_default())
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a process's modules and working set
    Scan {
        /// Target process name or pid (e.g. "notepad", "notepad.exe", or 1234)
        #[arg(value_hint = ValueHint::Other)]
        target: String,

        /// Restrict module enumeration to one architecture
        #[arg(long, value_enum, default_value = "all")]
        filter: FilterArg,

        /// Suppress per-module progress lines (the final report is never suppressed)
        #[arg(short, long)]
        quiet: bool,

        /// Skip the inline-hook scan
        #[arg(long)]
        no_hooks: bool,

        /// Build an exports map while scanning modules
        #[arg(long)]
        imp_rec: bool,

        /// Byte-wise header search instead of offset-0-only (slower, higher recall)
        #[arg(long)]
        deep_scan: bool,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum FilterArg {
    All,
    X86,
    X64,
}

impl From<FilterArg> for ModulesFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::All => ModulesFilter::All,
            FilterArg::X86 => ModulesFilter::X86Only,
            FilterArg::X64 => ModulesFilter::X64Only,
        }
    }
}

impl Command {
    pub fn into_scan_args(self, pid: u32) -> ScanArgs {
        match self {
            Command::Scan { filter, quiet, no_hooks, imp_rec, deep_scan, .. } => ScanArgs {
                pid,
                modules_filter: filter.into(),
                quiet,
                no_hooks,
                imp_rec,
                deep_scan,
            },
        }
    }
}
