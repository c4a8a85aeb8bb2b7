use std::process::ExitCode;

use clap::Parser;

use maxcompute_helper::adapters::output::NdjsonWriter;
use maxcompute_helper::app;
use maxcompute_helper::cli::Args;

fn main() -> ExitCode {
    let args = Args::parse();
    let mut out = NdjsonWriter::stdout();

    match app::run(args, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.code(), error = %e, "command failed");
            let _ = out.error_line(&e);
            ExitCode::FAILURE
        }
    }
}
