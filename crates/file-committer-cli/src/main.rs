use file_committer_cli::{run_cli, CliError};
use tracing::error;

#[tokio::main]
async fn main() {
    let exit_code = match run_cli().await {
        Ok(status) => status.exit_code(),
        Err(e) => {
            error!("CLI error: {}", e);
            // Logging may not be initialized yet.
            eprintln!("Error: {}", e);

            match e {
                CliError::Logging { .. } => 1,
                CliError::Configuration(_) | CliError::Client(_) => 3,
                CliError::InvalidRequest { .. } => 4,
                CliError::Output { .. } | CliError::Io(_) => 5,
            }
        }
    };

    std::process::exit(exit_code);
}
