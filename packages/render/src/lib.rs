#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Output artifacts for the hotspot pipelines.
//!
//! Map overlays are self-contained Leaflet pages (tiles and plugins come from
//! public CDNs, the data is embedded as JSON). Trend charts are PNG files
//! drawn with `plotters`.

pub mod choropleth;
pub mod color;
pub mod heatmap;
mod html;
pub mod timeseries;

/// Errors that can occur while rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// I/O error writing the artifact.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing overlay data failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The chart backend failed.
    #[error("Chart error: {message}")]
    Chart {
        /// Backend error message.
        message: String,
    },

    /// Nothing sensible can be drawn from the input.
    #[error("Invalid render input: {message}")]
    InvalidInput {
        /// Description of the problem.
        message: String,
    },
}

impl RenderError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

pub(crate) fn write_artifact(path: &std::path::Path, contents: &str) -> Result<(), RenderError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    log::info!("Wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}
