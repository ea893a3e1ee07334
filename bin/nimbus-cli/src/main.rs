use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use nimbus_api::AuthMode;
use nimbus_client::{AuthenticatingClient, Client, HttpTransport};
use nimbus_core::ClientError;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod settings;

use settings::{Overrides, Settings};

#[derive(Debug, Parser)]
#[command(name = "nimbus", version, about = "Authenticate against Nimbus and resolve service endpoints")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = "NIMBUS_CONFIG")]
    config: Option<PathBuf>,

    /// Identity service URL
    #[arg(long, env = "NIMBUS_AUTH_URL")]
    auth_url: Option<String>,

    #[arg(long, env = "NIMBUS_USERNAME")]
    user: Option<String>,

    #[arg(long, env = "NIMBUS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Region to operate in, most specific first
    #[arg(long, env = "NIMBUS_REGION")]
    region: Option<String>,

    #[arg(long, env = "NIMBUS_TENANT_NAME")]
    tenant_name: Option<String>,

    /// Identity domain for v3 authentication
    #[arg(long, env = "NIMBUS_DOMAIN")]
    domain: Option<String>,

    /// userpass (identity v2) or userpass-v3
    #[arg(long, env = "NIMBUS_AUTH_MODE")]
    auth_mode: Option<AuthMode>,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Print client metrics after the command completes
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Authenticate and print the issued token
    Token,
    /// Print service URLs for the configured region, or as published under REGION
    Endpoints { region: Option<String> },
    /// Resolve the URL of a service, negotiating the API version
    Url {
        service_type: String,
        /// Requested API version, e.g. v2 or 2.1; empty uses the catalog URL
        #[arg(long, default_value = "")]
        api_version: String,
        /// Path parts appended to the service URL
        parts: Vec<String>,
    },
    /// List the identity API versions the identity service offers
    AuthOptions,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn print_urls<'a>(urls: impl IntoIterator<Item = (&'a String, &'a String)>) {
    let sorted: BTreeMap<_, _> = urls.into_iter().collect();
    for (service_type, url) in sorted {
        println!("{:<16} {}", service_type, url);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let mut settings = Settings::load(cli.config.as_deref())?;
    settings.apply(Overrides {
        auth_url: cli.auth_url,
        user: cli.user,
        password: cli.password,
        region: cli.region,
        tenant_name: cli.tenant_name,
        domain: cli.domain,
        auth_mode: cli.auth_mode,
    });
    debug!("Settings: {:?}", settings);

    let transport = Arc::new(
        HttpTransport::from_config(&settings.client).context("cannot create HTTP transport")?,
    );

    let client = match &cli.command {
        Command::AuthOptions => {
            // Only the identity URL is needed to list options.
            AuthenticatingClient::builder(&settings.credentials, settings.auth_mode, transport)
                .config(settings.client.clone())
                .build()?
        }
        _ => {
            settings.validate()?;
            let client =
                AuthenticatingClient::builder(&settings.credentials, settings.auth_mode, transport)
                    .config(settings.client.clone())
                    .build()?;
            match client.authenticate().await {
                Ok(()) => info!(
                    "Authenticated as {} in {}",
                    client.user_id(),
                    settings.credentials.region
                ),
                // Published regions can still be listed to pick a working one.
                Err(ClientError::Catalog(e))
                    if matches!(cli.command, Command::Endpoints { region: Some(_) }) =>
                {
                    warn!("{}", e)
                }
                Err(e) => return Err(anyhow::Error::new(e).context("cannot authenticate")),
            }
            client
        }
    };

    match cli.command {
        Command::Token => {
            println!("token:     {}", client.token());
            println!("user id:   {}", client.user_id());
            println!("tenant id: {}", client.tenant_id());
        }
        Command::Endpoints { region } => match region {
            Some(region) => print_urls(&client.endpoints_for_region(&region)),
            None => print_urls(&client.service_urls()),
        },
        Command::Url {
            service_type,
            api_version,
            parts,
        } => {
            let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
            let url = client
                .make_service_url(&service_type, &api_version, &parts)
                .await
                .with_context(|| format!("cannot resolve {} URL", service_type))?;
            println!("{}", url);
        }
        Command::AuthOptions => {
            let options = client
                .identity_auth_options()
                .await
                .context("cannot list identity auth options")?;
            for option in options {
                println!("{:<14} {}", option.mode, option.endpoint);
            }
        }
    }

    if cli.metrics {
        eprint!("{}", client.metrics().gather()?);
    }
    Ok(())
}
