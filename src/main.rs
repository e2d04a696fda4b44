use std::io::stdout;
use std::process::ExitCode;

use clap::Parser;

use broan::{Args, run_with_log_level};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let mut stdout = stdout();

    let log_level = args.log_level();
    let output_format = args.output_format();
    let (command, connection) = args.into_command_and_connection();
    let run_result =
        run_with_log_level(command, &mut stdout, connection, output_format, log_level).await;

    match run_result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}
