//! Availability checks for the external tools.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::config::ToolsConfig;

/// Errors from checking an external tool.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("{tool} not found at: {}", path.display())]
    NotFound { tool: String, path: PathBuf },

    #[error("{tool} is not usable: {reason}")]
    Failed { tool: String, reason: String },
}

/// Checks that both the inspector and the encoder can be run.
pub async fn check_tools(tools: &ToolsConfig) -> Result<(), ToolError> {
    check_tool("ffprobe", &tools.ffprobe_path).await?;
    check_tool("ffmpeg", &tools.ffmpeg_path).await?;
    Ok(())
}

/// Runs `<path> -version` and expects a clean exit.
pub async fn check_tool(tool: &str, path: &Path) -> Result<(), ToolError> {
    let output = Command::new(path)
        .arg("-version")
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ToolError::NotFound {
                    tool: tool.to_string(),
                    path: path.to_path_buf(),
                }
            } else {
                ToolError::Failed {
                    tool: tool.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ToolError::Failed {
            tool: tool.to_string(),
            reason: format!("{} {}", output.status, stderr.trim()),
        });
    }

    let version = String::from_utf8_lossy(&output.stdout);
    debug!(
        tool,
        version = version.lines().next().unwrap_or_default(),
        "Tool available"
    );
    Ok(())
}
