use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use storage_atlas_core::{
    self as atlas, AtlasConfig, AtlasError, CleanupReport, DiskAssessment, HealthReport,
    HostProbe, LargeFilesReport, SystemStats,
};
use tracing::{info, warn};

pub const TOOL_NAMES: [&str; 5] = [
    "analyze_disk_usage",
    "get_system_stats",
    "find_large_files",
    "cleanup_recommendations",
    "system_health_check",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskUsageRequest {
    #[serde(default = "default_disk_path")]
    pub path: PathBuf,
}

fn default_disk_path() -> PathBuf {
    PathBuf::from("/")
}

impl Default for DiskUsageRequest {
    fn default() -> Self {
        Self {
            path: default_disk_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LargeFilesRequest {
    pub directory: PathBuf,
    /// Falls back to the configured threshold (100 MB by default).
    #[serde(default)]
    pub min_size_mb: Option<u64>,
    #[serde(default)]
    pub max_results: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupRequest {
    pub path: PathBuf,
    #[serde(default)]
    pub deep_analysis: bool,
}

/// Either the tool payload or `{"error": "..."}`. Never both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ToolResponse<T> {
    Ok(T),
    Err { error: String },
}

impl<T> ToolResponse<T> {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Err {
            error: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

impl<T> From<Result<T, AtlasError>> for ToolResponse<T> {
    fn from(result: Result<T, AtlasError>) -> Self {
        match result {
            Ok(payload) => Self::Ok(payload),
            Err(err) => {
                warn!("tool call failed: {err}");
                Self::error(err.to_string())
            }
        }
    }
}

/// Configuration plus the host probe shared by every tool call.
pub struct ToolContext {
    pub config: AtlasConfig,
    probe: Box<dyn HostProbe + Send + Sync>,
}

impl ToolContext {
    pub fn new(config: AtlasConfig) -> Self {
        let probe = config.probe();
        Self::with_probe(config, Box::new(probe))
    }

    /// Loads the config file (defaults when `None`) and probes the live host.
    pub fn load(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let config = AtlasConfig::load(config_path).context("failed to load atlas config")?;
        Ok(Self::new(config))
    }

    pub fn with_probe(config: AtlasConfig, probe: Box<dyn HostProbe + Send + Sync>) -> Self {
        Self { config, probe }
    }

    pub fn probe(&self) -> &dyn HostProbe {
        self.probe.as_ref()
    }
}

pub fn analyze_disk_usage(
    ctx: &ToolContext,
    request: &DiskUsageRequest,
) -> ToolResponse<DiskAssessment> {
    atlas::analyze_disk_usage(ctx.probe(), &request.path).into()
}

pub fn get_system_stats(ctx: &ToolContext) -> ToolResponse<SystemStats> {
    atlas::get_system_stats(ctx.probe()).into()
}

pub fn find_large_files(
    ctx: &ToolContext,
    request: &LargeFilesRequest,
) -> ToolResponse<LargeFilesReport> {
    let options = ctx
        .config
        .large_file_options(request.min_size_mb, request.max_results);
    atlas::find_large_files(&request.directory, &options).into()
}

pub fn cleanup_recommendations(
    ctx: &ToolContext,
    request: &CleanupRequest,
) -> ToolResponse<CleanupReport> {
    let options = ctx.config.cleanup_options(request.deep_analysis);
    atlas::cleanup_recommendations(&request.path, &options).into()
}

pub fn system_health_check(ctx: &ToolContext) -> ToolResponse<HealthReport> {
    ToolResponse::Ok(atlas::system_health_check(
        ctx.probe(),
        &ctx.config.mount_points(),
    ))
}

/// Runs the named tool with JSON arguments and returns its JSON response.
/// `null` arguments are treated as an empty object.
pub fn dispatch(ctx: &ToolContext, tool: &str, args: Value) -> Value {
    info!("dispatching tool {tool}");
    match tool {
        "analyze_disk_usage" => {
            call_with(args, |request: DiskUsageRequest| analyze_disk_usage(ctx, &request))
        }
        "get_system_stats" => to_json(get_system_stats(ctx)),
        "find_large_files" => {
            call_with(args, |request: LargeFilesRequest| find_large_files(ctx, &request))
        }
        "cleanup_recommendations" => call_with(args, |request: CleanupRequest| {
            cleanup_recommendations(ctx, &request)
        }),
        "system_health_check" => to_json(system_health_check(ctx)),
        other => {
            warn!("unknown tool requested: {other}");
            json!({ "error": format!("Unknown tool: {other}") })
        }
    }
}

fn call_with<R, T, F>(args: Value, run: F) -> Value
where
    R: DeserializeOwned,
    T: Serialize,
    F: FnOnce(R) -> ToolResponse<T>,
{
    let args = if args.is_null() { json!({}) } else { args };
    match serde_json::from_value::<R>(args) {
        Ok(request) => to_json(run(request)),
        Err(err) => {
            warn!("invalid tool arguments: {err}");
            json!({ "error": format!("Invalid arguments: {err}") })
        }
    }
}

fn to_json<T: Serialize>(response: ToolResponse<T>) -> Value {
    serde_json::to_value(&response)
        .unwrap_or_else(|err| json!({ "error": format!("failed to serialize response: {err}") }))
}
