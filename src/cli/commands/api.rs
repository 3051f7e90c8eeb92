use clap::{Args, Subcommand};
use serde_json::{json, Value};

use crate::cli::utils::{output_error, output_payload, output_success};
use crate::cli::{open_console, OutputFormat};
use crate::error::DownloadError;
use crate::gateway::RequestOptions;

#[derive(Args, Clone)]
pub struct CallArgs {
    #[arg(help = "Target path (relative to the API base) or absolute URL")]
    pub path: String,

    #[arg(long = "query", short = 'q', help = "Query entry as key=value (repeatable)")]
    pub query: Vec<String>,

    #[arg(long, help = "Suppress auth-failure side effects (no sign-out on 401)")]
    pub background: bool,
}

#[derive(Subcommand)]
pub enum ApiCommands {
    #[command(about = "GET a resource")]
    Get(CallArgs),

    #[command(about = "POST a JSON body")]
    Post {
        #[command(flatten)]
        call: CallArgs,
        #[arg(long, help = "JSON request body")]
        data: String,
    },

    #[command(about = "PUT a JSON body")]
    Put {
        #[command(flatten)]
        call: CallArgs,
        #[arg(long, help = "JSON request body")]
        data: String,
    },

    #[command(about = "DELETE a resource")]
    Delete(CallArgs),

    #[command(about = "Download binary content (exports, reports) into the download directory")]
    Download {
        #[command(flatten)]
        call: CallArgs,
        #[arg(long, short = 'o', help = "File name to save as")]
        output: Option<String>,
    },
}

pub async fn handle(cmd: ApiCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let console = open_console("")?;

    let (call, options) = match cmd {
        ApiCommands::Get(call) => (call, RequestOptions::get()),
        ApiCommands::Post { call, data } => (call, RequestOptions::post().json(parse_body(&data)?)),
        ApiCommands::Put { call, data } => (call, RequestOptions::put().json(parse_body(&data)?)),
        ApiCommands::Delete(call) => (call, RequestOptions::delete()),
        ApiCommands::Download { call, output } => {
            let options = apply_call_args(RequestOptions::get(), &call)?;
            return match console.gateway.download(&call.path, options, output.as_deref()).await {
                Ok(path) => output_success(
                    &output_format,
                    &format!("Saved {}", path.display()),
                    Some(json!({ "path": path })),
                ),
                Err(DownloadError::Gateway(e)) => output_error(&output_format, &e.message, Some(e.status)),
                Err(e) => output_error(&output_format, &e.to_string(), None),
            };
        }
    };

    let options = apply_call_args(options, &call)?;
    match console.gateway.request(&call.path, options).await {
        Ok(payload) => output_payload(&output_format, payload),
        Err(e) => output_error(&output_format, &e.message, Some(e.status)),
    }
}

fn apply_call_args(mut options: RequestOptions, call: &CallArgs) -> anyhow::Result<RequestOptions> {
    for entry in &call.query {
        let (key, value) = parse_query_entry(entry)?;
        options = options.query(key, value);
    }
    if call.background {
        options = options.background();
    }
    Ok(options)
}

fn parse_query_entry(entry: &str) -> anyhow::Result<(String, String)> {
    match entry.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(anyhow::anyhow!("Query entry '{}' must look like key=value", entry)),
    }
}

fn parse_body(data: &str) -> anyhow::Result<Value> {
    serde_json::from_str(data).map_err(|e| anyhow::anyhow!("Request body is not valid JSON: {}", e))
}
