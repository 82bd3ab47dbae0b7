//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to the command handlers.

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

use crate::commands;
use crate::logging;
use crate::request::{Operation, OutputFormat, RequestParams};

/// Command-line client for the data-submission API
#[derive(Parser)]
#[command(name = "cdis-client")]
#[command(version)]
#[command(long_about = "Command-line client for the data-submission API.\n\nRequests are signed with an access token obtained from the credentials of a\nprofile. Configure a profile first with the credential file issued by the\nservice, then send requests under that profile.\n\nEXAMPLES:\n    # Configure the default profile\n    $ cdis-client configure --cred ~/Downloads/credentials.json --apiendpoint https://data.example.org\n\n    # Fetch an entity as pretty-printed JSON\n    $ cdis-client get --uri v0/submission/bpa/test/entities/example_id --format json\n\n    # Submit a document under another profile\n    $ cdis-client put --profile user1 --uri v0/submission/bpa/test --file case.json")]
#[command(
    after_help = "CONFIGURATION:\n    Credentials:        ~/.cdis/config\n    Logs:               ~/.local/state/cdis-client/cdis-client.log.*"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Profile and resource shared by every request command.
#[derive(Args)]
struct Target {
    /// Profile whose credentials sign the request
    #[arg(long, default_value = "default")]
    profile: String,

    /// Resource path under <api_endpoint>/api/
    #[arg(long)]
    uri: String,

    /// How to print the response body
    #[arg(long, value_enum, default_value_t = OutputFormat::Txt)]
    format: OutputFormat,
}

impl Target {
    fn into_params(self) -> RequestParams {
        RequestParams::new(self.profile, self.uri, self.format)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Add or update a profile from a credential file
    ///
    /// Imports key_id and api_key from the JSON credential file issued by the
    /// service, records the API endpoint (prompted for if omitted) and fetches
    /// a first access token.
    Configure {
        /// Profile to create or update
        #[arg(long, default_value = "default")]
        profile: String,

        /// Path to the JSON credential file
        #[arg(long, value_name = "FILE")]
        cred: Option<PathBuf>,

        /// Base URL of the API, e.g. https://data.example.org
        #[arg(long = "apiendpoint", value_name = "URL")]
        api_endpoint: Option<String>,
    },

    /// Send GET HTTP request for given URI
    Get {
        #[command(flatten)]
        target: Target,
    },

    /// Send POST HTTP request with a JSON body for given URI
    Post {
        #[command(flatten)]
        target: Target,

        /// JSON file to send as the request body
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
    },

    /// Send PUT HTTP request with a JSON body for given URI
    Put {
        #[command(flatten)]
        target: Target,

        /// JSON file to send as the request body
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
    },

    /// Send DELETE HTTP request for given URI (not supported yet)
    Delete {
        #[command(flatten)]
        target: Target,
    },

    /// Show recent log entries from the client
    Logs,

    /// Generate shell completion script
    ///
    /// Examples:
    ///   cdis-client completions bash > cdis-client.bash
    ///   cdis-client completions zsh > _cdis-client
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the client based on command-line arguments.
///
/// # Errors
/// - If logging initialization fails
/// - If the command fails (missing profile, authentication, storage, transport)
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Handle commands that don't need logging
    match &cli.command {
        Commands::Completions { shell } => {
            generate(*shell, &mut Cli::command(), "cdis-client", &mut io::stdout());
            return Ok(());
        }
        Commands::Logs => return commands::handle_logs(),
        _ => {}
    }

    let _log = logging::init_logging()?;
    let result = dispatch(cli.command).await;
    if let Err(e) = &result {
        tracing::error!("{e:#}");
    }
    result
}

async fn dispatch(command: Commands) -> Result<(), anyhow::Error> {
    match command {
        Commands::Configure {
            profile,
            cred,
            api_endpoint,
        } => {
            commands::handle_configure(&profile, cred.as_deref(), api_endpoint).await?;
        }
        Commands::Get { target } => {
            commands::handle_request(target.into_params(), Operation::Get).await?;
        }
        Commands::Post { target, file } => {
            let body = commands::read_body(&file)?;
            commands::handle_request(target.into_params(), Operation::Post(body)).await?;
        }
        Commands::Put { target, file } => {
            let body = commands::read_body(&file)?;
            commands::handle_request(target.into_params(), Operation::Put(body)).await?;
        }
        Commands::Delete { target } => {
            commands::handle_request(target.into_params(), Operation::Delete).await?;
        }
        Commands::Completions { .. } | Commands::Logs => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_profile_defaults_to_default() {
        let cli = Cli::try_parse_from(["cdis-client", "get", "--uri", "v0/submission/x"]).unwrap();
        match cli.command {
            Commands::Get { target } => {
                assert_eq!(target.profile, "default");
                assert_eq!(target.uri, "v0/submission/x");
                assert_eq!(target.format, OutputFormat::Txt);
            }
            _ => panic!("expected get"),
        }
    }

    #[test]
    fn test_put_requires_file() {
        assert!(Cli::try_parse_from(["cdis-client", "put", "--uri", "x"]).is_err());
    }

    #[test]
    fn test_configure_flags() {
        let cli = Cli::try_parse_from([
            "cdis-client",
            "configure",
            "--profile=user1",
            "--cred=creds.json",
            "--apiendpoint=https://x.test",
        ])
        .unwrap();
        match cli.command {
            Commands::Configure {
                profile,
                cred,
                api_endpoint,
            } => {
                assert_eq!(profile, "user1");
                assert_eq!(cred, Some(PathBuf::from("creds.json")));
                assert_eq!(api_endpoint.as_deref(), Some("https://x.test"));
            }
            _ => panic!("expected configure"),
        }
    }
}
