//! `tsdb` - command line access to the TSDB API.
//!
//! Connection settings come from flags or the `TSDB_*` environment
//! variables. Results are printed to stdout as pretty JSON.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tsdb_client::logging::{init_logging, LoggingConfig};
use tsdb_client::{
    Datapoint, PresignOptions, Query, QueryOptions, QueryRequest, TsdbClient, TsdbConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Service endpoint, e.g. http://tsdb.example.com
    #[arg(long, env = "TSDB_ENDPOINT")]
    endpoint: String,

    #[arg(long, env = "TSDB_ACCESS_KEY")]
    access_key: String,

    #[arg(long, env = "TSDB_SECRET_KEY", hide_env_values = true)]
    secret_key: String,

    /// Scope every request to this database
    #[arg(long, env = "TSDB_DATABASE")]
    database: Option<String>,

    #[arg(long, env = "TSDB_PROXY_URL")]
    proxy_url: Option<String>,

    #[arg(long, env = "TSDB_SESSION_TOKEN", hide_env_values = true)]
    session_token: Option<String>,

    /// Log every request
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List metric names
    Metrics,
    /// List the fields of a metric
    Fields { metric: String },
    /// List the tags of a metric
    Tags { metric: String },
    /// Run a SQL statement
    Sql { statement: String },
    /// Write datapoints from a JSON file holding an array of datapoints
    Write { file: PathBuf },
    /// Run the queries in a JSON file
    Query {
        file: PathBuf,
        #[arg(long)]
        disable_presampling: bool,
    },
    /// Print a presigned URL for the queries in a JSON file
    Presign {
        file: PathBuf,
        /// Seconds the URL stays valid
        #[arg(long, default_value_t = 1800)]
        expire: u32,
        /// Endpoint to put in the URL instead of the configured one
        #[arg(long)]
        url_endpoint: Option<String>,
    },
}

/// A query file is either `{"queries": [...]}` or a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum QueryFile {
    Request(QueryRequest),
    List(Vec<Query>),
}

impl QueryFile {
    fn into_parts(self) -> (Vec<Query>, bool) {
        match self {
            QueryFile::Request(request) => (request.queries, request.disable_presampling),
            QueryFile::List(queries) => (queries, false),
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let logging = if args.verbose {
        LoggingConfig::development()
    } else {
        LoggingConfig::default().with_client_level(tracing::Level::WARN)
    };
    init_logging(logging.with_json_format(args.json_logs))
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    let mut config = TsdbConfig::new(args.endpoint, args.access_key, args.secret_key);
    if let Some(database) = args.database {
        config = config.with_database(database);
    }
    if let Some(proxy_url) = args.proxy_url {
        config = config.with_proxy_url(proxy_url);
    }
    if let Some(token) = args.session_token {
        config = config.with_session_token(token);
    }
    let client = TsdbClient::with_config(config)?;

    match args.command {
        Command::Metrics => print_json(&client.list_metrics().await?)?,
        Command::Fields { metric } => print_json(&client.list_fields(&metric).await?)?,
        Command::Tags { metric } => print_json(&client.list_tags(&metric).await?)?,
        Command::Sql { statement } => print_json(&client.list_rows_by_sql(&statement).await?)?,
        Command::Write { file } => {
            let datapoints: Vec<Datapoint> = read_json(&file)?;
            client.write_datapoints(&datapoints).await?;
            eprintln!("Wrote {} datapoints", datapoints.len());
        }
        Command::Query {
            file,
            disable_presampling,
        } => {
            let (queries, from_file) = read_json::<QueryFile>(&file)?.into_parts();
            let options = QueryOptions {
                disable_presampling: disable_presampling || from_file,
            };
            print_json(&client.list_datapoints(&queries, options).await?)?;
        }
        Command::Presign {
            file,
            expire,
            url_endpoint,
        } => {
            let (queries, _) = read_json::<QueryFile>(&file)?.into_parts();
            let options = PresignOptions {
                endpoint: url_endpoint,
            };
            println!(
                "{}",
                client.generate_presigned_url(&queries, expire, &options)?
            );
        }
    }

    Ok(())
}
