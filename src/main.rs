// src/main.rs

use std::process::ExitCode;

use build_transform::{cli, logging, run};

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();
    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("build-transform error: {err:?}");
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("build-transform error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
