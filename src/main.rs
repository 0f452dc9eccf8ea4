mod cli;

use clap::Parser;
use cli::{Cli, Command};
use libprocscan::header::GoblinFormat;
use libprocscan::orchestrator::scan_remote;
use libprocscan::report::{Finding, ScanStatus};
use owo_colors::OwoColorize;

#[cfg(windows)]
use libprocscan::os::windows::{find_process_by_name, WindowsProcess as PlatformProcess};

#[cfg(unix)]
use libprocscan::os::linux::{find_process_by_name, UnixProcess as PlatformProcess};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Scan { ref target, .. } => {
            let pid = resolve_target(target)?;
            let proc = PlatformProcess::open(pid)?;
            let args = cli.command.into_scan_args(pid);
            let format = GoblinFormat;

            println!("{} scanning pid={}", "[info]".bright_cyan(), pid);
            let report = scan_remote(&proc, &format, &args)
                .map_err(|e| anyhow::anyhow!("{e}"))?;

            print_report(&report);
        }
    }
    Ok(())
}

fn resolve_target(target: &str) -> anyhow::Result<u32> {
    if target.chars().all(|c| c.is_ascii_digit()) {
        return Ok(target.parse()?);
    }
    println!("{} looking up process by name: {}", "[info]".bright_cyan(), target);
    find_process_by_name(target)?.ok_or_else(|| anyhow::anyhow!("process with name '{}' not found", target))
}

fn print_report(report: &libprocscan::ProcessReport) {
    for finding in report.findings() {
        print_finding(finding);
    }

    let s = &report.summary;
    println!(
        "{} scanned={} errors={} skipped={} detached={} replaced={} hooked={} implanted={}",
        "[done]".bright_green(),
        s.scanned,
        s.errors,
        s.skipped,
        s.detached,
        s.replaced,
        s.hooked,
        s.implanted,
    );
}

fn print_finding(finding: &Finding) {
    let tag = |status: ScanStatus| match status {
        ScanStatus::Suspicious => "[!]".bright_red().to_string(),
        ScanStatus::NotSuspicious => "[ok]".bright_green().to_string(),
        ScanStatus::Error => "[err]".yellow().to_string(),
    };

    match finding {
        Finding::HeadersScan { module, status, arch_mismatch } => {
            println!(
                "{} module {:016x}: headers {:?}{}",
                tag(*status),
                module,
                status,
                if *arch_mismatch { " (arch mismatch)" } else { "" }
            );
        }
        Finding::CodeScan { module, status, modifications } => {
            println!(
                "{} module {:016x}: code {:?}, {} modification(s)",
                tag(*status),
                module,
                status,
                modifications.len()
            );
        }
        Finding::MemPageScan { base, status, is_executable, is_manually_loaded, protection } => {
            println!(
                "{} page {:016x}: {:?} executable={} manually_loaded={} protection={}",
                tag(*status),
                base,
                status,
                is_executable,
                is_manually_loaded,
                protection
            );
        }
        Finding::UnreachableModule { handle } => {
            println!("{} module {:016x}: original file unreachable", "[!]".bright_red(), handle);
        }
    }
}
