//! semtag entry point.

use clap::Parser;
use semtag_cli::{commands, telemetry, Cli, CliError};
use std::io::Write;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init(cli.verbose, telemetry::configured_format(&cli.dir()));

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = commands::run(&cli, &mut out);
    let _ = out.flush();
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::from(err.exit_code())
        }
    }
}

fn report(err: &CliError) {
    eprintln!("error: {}", err);
    for hint in err.hints() {
        eprintln!("hint: {}", hint);
    }
}
