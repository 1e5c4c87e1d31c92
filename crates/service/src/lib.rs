pub mod tools;

pub use tools::{
    analyze_disk_usage, cleanup_recommendations, dispatch, find_large_files, get_system_stats,
    system_health_check, CleanupRequest, DiskUsageRequest, LargeFilesRequest, ToolContext,
    ToolResponse, TOOL_NAMES,
};
