//! tokennet command line.
//!
//! Usage: tokennet [--config <path>] <command>
//!
//! Every command except `schema` loads the config, builds the clients and
//! runs one call for the selected application.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use tokennet::config::{config_schema, load_config};
use tokennet::startup;
use tokennet::utils::logger::init_logging;
use tokennet::{Endpoint, NetClient, NetError, Reply};

/// Token-aware client for the platform REST API.
#[derive(Parser, Debug)]
#[command(name = "tokennet", version)]
struct Args {
    /// Path to the YAML configuration.
    #[arg(long, env = "TOKENNET_CONFIG", default_value = "./config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the JSON schema of the configuration file.
    Schema,
    /// Print the token for an application, logging in if needed.
    Token {
        #[arg(long)]
        app: String,
        /// Ask the refresh endpoint for a new token instead.
        #[arg(long)]
        refresh: bool,
    },
    /// GET an endpoint and print the envelope data.
    Get {
        #[arg(long)]
        app: String,
        #[arg(long)]
        url: String,
        /// Send the request without credentials.
        #[arg(long)]
        public: bool,
    },
    /// POST a form-encoded body and print the envelope data.
    Post {
        #[arg(long)]
        app: String,
        #[arg(long)]
        url: String,
        /// Encoded form, e.g. `a=1&b=2`.
        #[arg(long, default_value = "")]
        form: String,
    },
    /// Upload a file as multipart form data.
    Upload {
        #[arg(long)]
        app: String,
        #[arg(long)]
        url: String,
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value = "file")]
        field: String,
        /// Extra text fields as `key=value`, repeatable.
        #[arg(long = "extra", value_parser = parse_key_value)]
        extra: Vec<(String, String)>,
    },
    /// Download raw bytes to a file.
    Download {
        #[arg(long)]
        app: String,
        #[arg(long)]
        url: String,
        #[arg(long)]
        output: PathBuf,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

fn print_reply(reply: &Reply) {
    println!("{:#}", reply.envelope.data);
}

async fn run(args: Args) -> Result<(), NetError> {
    if let Command::Schema = args.command {
        println!("{}", config_schema());
        return Ok(());
    }

    let config = load_config(&args.config)
        .map_err(|e| NetError::Config(format!("{}: {}", args.config.display(), e)))?;
    init_logging(&config.logging)?;

    let registry = startup::init(&config).await?;
    let client = |app: &str| -> Result<std::sync::Arc<NetClient>, NetError> {
        registry
            .get(app)
            .ok_or_else(|| NetError::Config(format!("no client configured for '{}'", app)))
    };

    match args.command {
        Command::Schema => {}
        Command::Token { app, refresh } => {
            let client = client(&app)?;
            let token = if refresh {
                client.refresh_token().await?
            } else {
                client.get_token().await?
            };
            println!("{}", token);
        }
        Command::Get { app, url, public } => {
            let endpoint = if public {
                Endpoint::public(url)
            } else {
                Endpoint::authenticated(url)
            };
            print_reply(&client(&app)?.get(&endpoint).await?);
        }
        Command::Post { app, url, form } => {
            let reply = client(&app)?
                .post(&Endpoint::authenticated(url), form)
                .await?;
            print_reply(&reply);
        }
        Command::Upload {
            app,
            url,
            path,
            field,
            extra,
        } => {
            let extra: HashMap<String, String> = extra.into_iter().collect();
            let reply = client(&app)?
                .upload_file(&Endpoint::authenticated(url), &field, &path, &extra)
                .await?;
            print_reply(&reply);
        }
        Command::Download { app, url, output } => {
            let bytes = client(&app)?
                .get_file(&Endpoint::authenticated(url))
                .await?;
            tokio::fs::write(&output, &bytes).await?;
            info!(bytes = bytes.len(), path = %output.display(), "Download saved.");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed.");
            eprintln!("error: {}", e);
            if e.should_retry() {
                eprintln!("credentials were renewed, run the command again");
            }
            ExitCode::FAILURE
        }
    }
}
