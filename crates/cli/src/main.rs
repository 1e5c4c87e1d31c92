use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use storage_atlas_core::render_health_markdown;
use storage_atlas_service::{
    analyze_disk_usage, cleanup_recommendations, dispatch, find_large_files, get_system_stats,
    system_health_check, CleanupRequest, DiskUsageRequest, LargeFilesRequest, ToolContext,
    ToolResponse, TOOL_NAMES,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "storage-atlas",
    version,
    about = "Inspect disk usage, large files, cleanup candidates and overall host health."
)]
struct Cli {
    /// JSON config file; built-in defaults when omitted.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the JSON response here instead of stdout.
    #[arg(long, global = true, value_name = "FILE")]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Report capacity and fill level of the volume backing a path.
    Disk(DiskArgs),
    /// Sample CPU, memory, load and I/O counters.
    Stats,
    /// List the largest files under a directory.
    LargeFiles(LargeFilesArgs),
    /// Find temp directories, stale logs and likely duplicates.
    Cleanup(CleanupArgs),
    /// Score overall host health from stats and mounted volumes.
    Health(HealthArgs),
    /// Invoke a tool by name with JSON arguments.
    Call(CallArgs),
}

#[derive(Debug, Args)]
struct DiskArgs {
    #[arg(default_value = "/")]
    path: PathBuf,
}

#[derive(Debug, Args)]
struct LargeFilesArgs {
    directory: PathBuf,

    /// Only files strictly larger than this are reported.
    #[arg(long, value_name = "MB")]
    min_size_mb: Option<u64>,

    #[arg(long)]
    max_results: Option<usize>,
}

#[derive(Debug, Args)]
struct CleanupArgs {
    path: PathBuf,

    /// Walk without a depth bound and look for duplicate-looking files.
    #[arg(long)]
    deep: bool,
}

#[derive(Debug, Args)]
struct HealthArgs {
    /// Optional markdown summary output file.
    #[arg(long, value_name = "FILE")]
    md: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct CallArgs {
    /// One of the registered tool names.
    tool: String,

    /// JSON object with the tool arguments.
    #[arg(default_value = "{}")]
    args: String,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let ctx = ToolContext::load(cli.config.as_deref())?;

    let response = match cli.command {
        Commands::Disk(args) => to_value(analyze_disk_usage(
            &ctx,
            &DiskUsageRequest { path: args.path },
        ))?,
        Commands::Stats => to_value(get_system_stats(&ctx))?,
        Commands::LargeFiles(args) => to_value(find_large_files(
            &ctx,
            &LargeFilesRequest {
                directory: args.directory,
                min_size_mb: args.min_size_mb,
                max_results: args.max_results,
            },
        ))?,
        Commands::Cleanup(args) => to_value(cleanup_recommendations(
            &ctx,
            &CleanupRequest {
                path: args.path,
                deep_analysis: args.deep,
            },
        ))?,
        Commands::Health(args) => run_health_command(&ctx, args)?,
        Commands::Call(args) => run_call_command(&ctx, args)?,
    };

    emit(&response, cli.output.as_ref())?;
    if let Some(error) = response.get("error").and_then(Value::as_str) {
        bail!("{error}");
    }
    Ok(())
}

fn run_health_command(ctx: &ToolContext, args: HealthArgs) -> Result<Value> {
    let response = system_health_check(ctx);
    if let (Some(md_path), ToolResponse::Ok(report)) = (&args.md, &response) {
        fs::write(md_path, render_health_markdown(report)).with_context(|| {
            format!("failed to write markdown summary to {}", md_path.display())
        })?;
        info!("markdown summary written to {}", md_path.display());
    }
    to_value(response)
}

fn run_call_command(ctx: &ToolContext, args: CallArgs) -> Result<Value> {
    if !TOOL_NAMES.contains(&args.tool.as_str()) {
        bail!(
            "unknown tool `{}`; expected one of: {}",
            args.tool,
            TOOL_NAMES.join(", ")
        );
    }
    let parsed: Value = serde_json::from_str(&args.args)
        .with_context(|| format!("failed to parse arguments for {}", args.tool))?;
    Ok(dispatch(ctx, &args.tool, parsed))
}

fn to_value<T: Serialize>(response: ToolResponse<T>) -> Result<Value> {
    serde_json::to_value(response).context("failed to serialize response")
}

fn emit(response: &Value, output: Option<&PathBuf>) -> Result<()> {
    let payload = serde_json::to_string_pretty(response).context("failed to serialize response")?;
    match output {
        Some(path) => {
            fs::write(path, payload)
                .with_context(|| format!("failed to write response to {}", path.display()))?;
            info!("response written to {}", path.display());
        }
        None => println!("{payload}"),
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Commands};

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from([
            "storage-atlas",
            "large-files",
            "/srv",
            "--min-size-mb",
            "5",
            "--config",
            "atlas.json",
        ])
        .expect("parse");
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("atlas.json")));
        match cli.command {
            Commands::LargeFiles(args) => {
                assert_eq!(args.min_size_mb, Some(5));
                assert_eq!(args.max_results, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn disk_defaults_to_root_and_call_to_empty_args() {
        let cli = Cli::try_parse_from(["storage-atlas", "disk"]).expect("parse");
        match cli.command {
            Commands::Disk(args) => assert_eq!(args.path, std::path::Path::new("/")),
            other => panic!("unexpected command: {other:?}"),
        }

        let cli =
            Cli::try_parse_from(["storage-atlas", "call", "get_system_stats"]).expect("parse");
        match cli.command {
            Commands::Call(args) => assert_eq!(args.args, "{}"),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
