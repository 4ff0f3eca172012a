//! # lgrep — grep for logs kept in Elasticsearch
//!
//! - `lgrep 'level:error AND service:api'` runs a lucene query.
//! - `lgrep --Qf query.json` submits a pre-built query document.
//! - `-f '.host .message'` picks the fields printed per result.

mod config;
mod format;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lg_core::{
    Client, ErrorCategory, ErrorKind, Query, SearchError, SearchOptions, SearchResult, Searcher,
    SortTime,
};

use crate::config::{Config, ConfigError, DEFAULT_CONFIG_FILE};
use crate::format::{Template, DEFAULT_FORMAT, STDLINE_FORMAT};

/// Search Elasticsearch logs from the command line.
#[derive(Parser, Debug)]
#[command(
    name = "lgrep",
    version,
    about,
    override_usage = "lgrep [OPTIONS] [QUERY]...",
    after_help = "Format tokens starting with '.' are looked up in each result, \
                  e.g. '.host .service .message'; other tokens print as-is."
)]
struct Cli {
    /// Lucene query (joined with spaces).
    query: Vec<String>,

    /// Elasticsearch endpoint.
    #[arg(short = 'e', long, env = "LGREP_ENDPOINT")]
    endpoint: Option<String>,

    /// Debug lgrep with verbose logging.
    #[arg(short = 'D', long)]
    debug: bool,

    /// Path to config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of results to be returned.
    #[arg(short = 'n', long, allow_negative_numbers = true)]
    size: Option<i64>,

    /// Fields to print per result (e.g. '.host .message').
    #[arg(short = 'f', long)]
    format: Option<String>,

    /// Use the common line format '.host .service .message'.
    #[arg(long, visible_alias = "ff")]
    stdline: bool,

    /// Output each result as a single line of JSON.
    #[arg(short = 'j', long)]
    raw_json: bool,

    /// Tabulate the data into columns.
    #[arg(short = 'T', long)]
    tabulate: bool,

    /// Return whole hit envelopes (metadata and source).
    #[arg(long)]
    raw_result: bool,

    /// Index to search; repeat or comma separate for several (default: all).
    #[arg(long, visible_alias = "Qi", value_delimiter = ',')]
    query_index: Vec<String>,

    /// Fields to retrieve (ex: field1,field2).
    #[arg(long, visible_alias = "Qc", value_delimiter = ',')]
    query_fields: Vec<String>,

    /// Raw Elasticsearch JSON query to submit.
    #[arg(long, visible_alias = "Qf")]
    query_file: Option<PathBuf>,

    /// Print the query sent to the server.
    #[arg(long, visible_alias = "QD")]
    query_debug: bool,

    /// Sort results by timestamp.
    #[arg(long, value_enum, default_value_t = SortArg::Desc)]
    sort: SortArg,

    /// Submit without asking the server to validate the query first.
    #[arg(long)]
    skip_validate: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SortArg {
    Asc,
    Desc,
    Unset,
}

impl From<SortArg> for SortTime {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Asc => SortTime::Ascending,
            SortArg::Desc => SortTime::Descending,
            SortArg::Unset => SortTime::Unset,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("query file {path} cannot be read: {source}")]
    QueryFile {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 1,
            Self::QueryFile { .. } => 3,
            Self::Output(_) => 1,
            Self::Search(e) => match e.category() {
                ErrorCategory::Config => 1,
                ErrorCategory::Input => 3,
                ErrorCategory::Validation => 4,
                ErrorCategory::Execution => 5,
                ErrorCategory::Extraction => 6,
            },
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("lgrep: failed to build tokio runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let CliError::Search(search) = &e {
                if let Some(response) = search.validation_response() {
                    let pretty = serde_json::to_string_pretty(response)
                        .unwrap_or_else(|_| response.to_string());
                    for line in pretty.lines() {
                        eprintln!("v> {}", line);
                    }
                }
            }
            eprintln!("lgrep: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(debug: bool) {
    let default_filter = if debug {
        "lgrep=debug,lg_core=debug"
    } else {
        "lgrep=warn,lg_core=warn"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => Config::load(path, true)?,
        None => Config::load(&PathBuf::from(DEFAULT_CONFIG_FILE), false)?,
    };

    // Both checks happen before anything touches the network.
    let query = read_query(&cli)?;
    let options = search_options(&cli, &config)?;
    let template = Template::parse(&output_format(&cli, &config));

    let client = Client::new(&config.client_config(cli.endpoint.as_deref()))?;
    tracing::debug!("Using endpoint {}", client.endpoint());
    let searcher = Searcher::new(Arc::new(client));

    let mut stream = searcher.search(query, &options).await?;

    if tabulated(&cli) {
        let results = stream.all().await?;
        if results.is_empty() {
            tracing::warn!("0 results returned");
            return Ok(());
        }
        println!("{}", format::tabulate(&template, &results));
        return Ok(());
    }

    let mut count = 0usize;
    while let Some(result) = stream.next().await {
        let result = result?;
        print_result(&cli, &template, &result)?;
        count += 1;
    }
    if count == 0 {
        tracing::warn!("0 results returned");
    }
    Ok(())
}

fn read_query(cli: &Cli) -> Result<Query, CliError> {
    let lucene = cli.query.join(" ");
    match (&cli.query_file, lucene.is_empty()) {
        (Some(_), false) => Err(SearchError::build(ErrorKind::ConflictingQuery).into()),
        (None, true) => Err(SearchError::build(ErrorKind::MissingQuery).into()),
        (Some(path), true) => {
            let bytes = std::fs::read(path).map_err(|source| CliError::QueryFile {
                path: path.display().to_string(),
                source,
            })?;
            Ok(Query::raw(bytes)?)
        }
        (None, false) => Ok(Query::lucene(lucene)?),
    }
}

fn search_options(cli: &Cli, config: &Config) -> Result<SearchOptions, CliError> {
    let size = cli
        .size
        .or(config.search.size)
        .unwrap_or(lg_core::DEFAULT_SPEC.size as i64);
    let size = usize::try_from(size)
        .map_err(|_| SearchError::build(ErrorKind::NegativeSize(size)))?;

    let mut options = SearchOptions::default()
        .with_size(size)
        .with_sort_time(cli.sort.into())
        .with_fields(cli.query_fields.iter().filter(|f| !f.is_empty()).cloned())
        .with_raw_result(cli.raw_result)
        .with_query_debug(cli.query_debug)
        .with_skip_validate(cli.skip_validate);

    let indices: Vec<String> = cli
        .query_index
        .iter()
        .filter(|i| !i.is_empty())
        .cloned()
        .collect();
    if !indices.is_empty() {
        options = options.with_indices(indices);
    } else if let Some(index) = &config.search.index {
        options = options.with_index(index.clone());
    }
    Ok(options)
}

fn output_format(cli: &Cli, config: &Config) -> String {
    if cli.stdline {
        if cli.format.is_some() {
            tracing::warn!(
                "You've provided a format (-f) and asked for the stdline format (--ff), using stdline!"
            );
        }
        return STDLINE_FORMAT.to_string();
    }
    cli.format
        .clone()
        .or_else(|| config.search.format.clone())
        .unwrap_or_else(|| DEFAULT_FORMAT.to_string())
}

/// Tabulated output takes over from per-line JSON.
fn tabulated(cli: &Cli) -> bool {
    if cli.tabulate && cli.raw_json {
        tracing::warn!(
            "You've asked for raw JSON (-j) and tabulated output (-T), using tabulated!"
        );
    }
    cli.tabulate
}

fn print_result(cli: &Cli, template: &Template, result: &SearchResult) -> Result<(), CliError> {
    use std::io::Write;

    let mut out = std::io::stdout().lock();
    if cli.raw_json {
        let line = serde_json::to_string(result).map_err(std::io::Error::other)?;
        writeln!(out, "{}", line)?;
    } else {
        writeln!(out, "{}", template.render(result))?;
    }
    Ok(())
}
