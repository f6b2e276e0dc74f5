mod output;
mod telemetry;

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Local};
use clap::Parser;
use iclogs_api::{Endpoint, LogsClient, TokenProvider};
use iclogs_core::config::Config;
use iclogs_core::keypath::parse_key_paths;
use iclogs_core::query::{QuerySpec, Syntax, Tier};
use iclogs_core::time::{
    Clock, SystemClock, TimeWindow, parse_duration_str, parse_time_or_relative,
};

use crate::output::{DisplayOptions, write_records, write_warnings};
use crate::telemetry::init_cli_tracing;

#[derive(Parser, Debug)]
#[command(name = "iclogs", version)]
#[command(about = "Query IBM Cloud Logs from the command line")]
struct Cli {
    #[arg(short = 'k', long = "key", help = "IBM Cloud API key [env: LOGS_API_KEY]")]
    api_key: Option<String>,

    #[arg(short = 'a', long = "auth-url", help = "IAM endpoint [env: ICLOGS_AUTH_URL]")]
    auth_url: Option<String>,

    #[arg(short = 'l', long = "logs-url", help = "Cloud Logs endpoint [env: LOGS_ENDPOINT]")]
    logs_url: Option<String>,

    #[arg(short = 'r', long, help = "Time range looking back from --to, e.g. 15m")]
    range: Option<String>,

    #[arg(short = 'f', long, help = "Start time: YYYY-MM-DDTHH:MM, RFC3339 or duration ago")]
    from: Option<String>,

    #[arg(short = 't', long, help = "End time: YYYY-MM-DDTHH:MM, RFC3339 or duration ago")]
    to: Option<String>,

    #[arg(
        short = 'm',
        long = "message-fields",
        help = "Comma separated key paths tried in order for the message"
    )]
    message_fields: Option<String>,

    #[arg(short = 'j', long = "show-json", help = "Print raw user data instead of the message")]
    show_json: bool,

    #[arg(long)]
    show_labels: bool,

    #[arg(long)]
    show_severity: bool,

    #[arg(long)]
    show_timestamp: bool,

    #[arg(long, default_value = "lucene")]
    syntax: Syntax,

    #[arg(long, default_value = "archive")]
    tier: Tier,

    #[arg(long, help = "Maximum number of results [default: tier maximum]")]
    limit: Option<u32>,

    #[arg(long, help = "Do not print query warnings")]
    no_warnings: bool,

    #[arg(trailing_var_arg = true, help = "Query string")]
    query: Vec<String>,
}

/// Everything one invocation needs, resolved from flags and configuration.
#[derive(Debug)]
struct Invocation {
    api_key: String,
    auth_endpoint: Endpoint,
    logs_endpoint: Endpoint,
    query: String,
    spec: QuerySpec,
    query_timeout: Duration,
    display: DisplayOptions,
    show_warnings: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_cli_tracing();
    let cli = Cli::parse();
    let cfg = Config::load()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let invocation = build_invocation(cli, cfg, clock.as_ref())?;
    run_query(invocation, clock).await
}

fn build_invocation(cli: Cli, cfg: Config, clock: &dyn Clock) -> anyhow::Result<Invocation> {
    let Some(api_key) = cli.api_key.or(cfg.api_key).filter(|k| !k.is_empty()) else {
        anyhow::bail!("you need to provide API key");
    };
    let Some(logs_url) = cli.logs_url.or(cfg.logs_endpoint).filter(|u| !u.is_empty()) else {
        anyhow::bail!("you need to provide IBM Cloud Logs endpoint URL");
    };
    let query = cli.query.join(" ");
    if query.trim().is_empty() {
        anyhow::bail!("you need to provide logs query string");
    }

    let auth_url = cli.auth_url.unwrap_or(cfg.auth_endpoint);
    let auth_endpoint = Endpoint::parse(&auth_url).context("invalid auth URL")?;
    let logs_endpoint = Endpoint::parse(&logs_url).context("invalid logs URL")?;

    let message_fields = match cli.message_fields {
        Some(raw) => parse_key_paths(&raw),
        None => cfg.message_fields,
    };
    if message_fields.is_empty() {
        anyhow::bail!("message fields cannot be empty");
    }

    let range = match cli.range {
        Some(raw) => parse_duration_str(&raw)?,
        None => cfg.time_range,
    };
    let window = TimeWindow::resolve(
        parse_cli_time(cli.from, clock)?,
        parse_cli_time(cli.to, clock)?,
        range,
        clock,
    )?;

    let spec = QuerySpec {
        syntax: Some(cli.syntax),
        limit: cli.limit.or(cli.tier.max_limit()),
        tier: Some(cli.tier),
        start_date: Some(window.start),
        end_date: Some(window.end),
    };

    Ok(Invocation {
        api_key,
        auth_endpoint,
        logs_endpoint,
        query,
        spec,
        query_timeout: cfg.query_timeout,
        display: DisplayOptions {
            message_fields,
            show_json: cli.show_json,
            show_labels: cli.show_labels,
            show_severity: cli.show_severity,
            show_timestamp: cli.show_timestamp,
            color: std::io::stdout().is_terminal(),
        },
        show_warnings: !cli.no_warnings,
    })
}

fn parse_cli_time(
    value: Option<String>,
    clock: &dyn Clock,
) -> anyhow::Result<Option<DateTime<Local>>> {
    Ok(value
        .map(|v| parse_time_or_relative(&v, clock))
        .transpose()?)
}

async fn run_query(invocation: Invocation, clock: Arc<dyn Clock>) -> anyhow::Result<()> {
    let tokens = TokenProvider::new(invocation.auth_endpoint, clock)?;
    let token = tokens
        .get_token(&invocation.api_key)
        .await
        .context("authenticate with IAM")?;

    let client = LogsClient::new(invocation.logs_endpoint, invocation.query_timeout)?;
    let result = client
        .query(&token.value, &invocation.query, &invocation.spec)
        .await
        .context("query logs")?;
    if result.is_empty() {
        tracing::info!(query = %invocation.query, "no logs matched");
    } else {
        tracing::debug!(
            records = result.records.len(),
            warnings = result.warnings.len(),
            "query finished"
        );
    }

    if invocation.show_warnings {
        write_warnings(&mut std::io::stderr().lock(), &result.warnings)?;
    }
    write_records(
        &mut std::io::stdout().lock(),
        &result.records,
        &invocation.display,
    )
    .context("write records")?;
    Ok(())
}
