use anyhow::{Context, Result, bail};
use ledger_sync::presentation::dto::ApiResponse;
use ledger_sync::presentation::dto::outbox::{OutboxQuery, OutboxRecord, SyncResultResponse};
use ledger_sync::{AppConfig, AppError, AppState, init_logging};
use serde::Serialize;
use std::env;

#[derive(Debug, Clone, Default)]
struct CliOptions {
    database_url: Option<String>,
    base_url: Option<String>,
    pretty: bool,
    inspect_only: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DrainSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<SyncResultResponse>,
    remaining: u64,
    failed: Vec<OutboxRecord>,
}

fn usage() -> &'static str {
    "Usage: outbox_drain [--database-url <url>] [--base-url <url>] [--inspect] [--pretty]"
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let options = parse_args(env::args().skip(1))?;

    let mut config = AppConfig::from_env();
    if let Some(url) = options.database_url.clone() {
        config.database.url = url;
    }
    if let Some(url) = options.base_url.clone() {
        config.remote.base_url = url.trim_end_matches('/').to_string();
    }
    config.sync.sync_on_startup = false;
    config.sync.auto_sync_on_reconnect = false;

    let state = AppState::new(config)
        .await
        .context("Failed to open the outbox")?;
    let handler = state.outbox_handler.clone();

    let summary = async {
        let result = if options.inspect_only {
            None
        } else {
            Some(handler.trigger_sync().await)
        };
        Ok::<_, AppError>(DrainSummary {
            result,
            remaining: handler.count(OutboxQuery::default()).await?,
            failed: handler.list_failed(OutboxQuery::default()).await?,
        })
    }
    .await;

    let response = ApiResponse::from_result(summary);
    let payload = if options.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{payload}");

    state.shutdown().await;
    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}

fn parse_args<I>(args: I) -> Result<CliOptions>
where
    I: IntoIterator<Item = String>,
{
    let mut options = CliOptions::default();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--database-url" => {
                let value = iter.next().ok_or_else(|| {
                    anyhow::anyhow!("--database-url requires a value\n{}", usage())
                })?;
                options.database_url = Some(value);
            }
            "--base-url" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--base-url requires a value\n{}", usage()))?;
                options.base_url = Some(value);
            }
            "--inspect" => options.inspect_only = true,
            "--pretty" => options.pretty = true,
            "-h" | "--help" => {
                println!("{}", usage());
                std::process::exit(0);
            }
            other => bail!("Unknown argument: {other}\n{}", usage()),
        }
    }
    Ok(options)
}
