use clap::Parser;
use regedit_bin::Cli;
use regedit_log::LogConfig;
use std::io;

fn main() {
    let cli = Cli::parse();

    let log_guard = regedit_log::init(LogConfig {
        log_file_path: cli.log_file.clone(),
    })
    .map_err(|e| eprintln!("Warning: Failed to initialize logging: {e}"))
    .ok();

    let code = regedit_bin::run(cli, &mut io::stdout().lock(), &mut io::stderr().lock());

    // Flush the log file before exiting.
    drop(log_guard);
    std::process::exit(code);
}
