use std::process::ExitCode;

use carousel::HttpRemote;
use carousel::entry::{self, CarouselError, Config};

fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(CarouselError::Args(err)) => {
            // Also prints --help and --version
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = entry::setup_logger(config.verbose) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    match entry::run(&config, HttpRemote::new) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
