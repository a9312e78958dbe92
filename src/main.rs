//! dstasky - a minimal task tracker backed by git

use std::process::ExitCode;

fn main() -> ExitCode {
    match dstasky::cli::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
