#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Numerical core of the hotspot pipelines.
//!
//! * [`clean`] validates coordinates and applies the bounding box.
//! * [`grid`] and [`entropy`] bin events into a discrete grid and rank
//!   `(category, hour)` groups by how spread out they are.
//! * [`kde`] fits a 2-D Gaussian kernel density estimate and samples it on a
//!   regular grid.
//! * [`compare`] subtracts two density surfaces.
//! * [`temporal`] counts events per day.

pub mod clean;
pub mod compare;
pub mod entropy;
pub mod grid;
pub mod kde;
pub mod temporal;

/// Errors that can occur during aggregation.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The input has no usable rows.
    #[error("Data quality error: {message}")]
    DataQuality {
        /// Description of what was missing.
        message: String,
    },

    /// A computation is undefined for the input (e.g. a singular covariance).
    #[error("Numerical error: {message}")]
    Numerical {
        /// Description of what went wrong.
        message: String,
    },

    /// Two grids that must line up have different dimensions.
    #[error("Shape mismatch: {left:?} vs {right:?}")]
    ShapeMismatch {
        /// `(rows, cols)` of the first grid.
        left: (usize, usize),
        /// `(rows, cols)` of the second grid.
        right: (usize, usize),
    },
}

impl AnalysisError {
    pub(crate) fn data_quality(message: impl Into<String>) -> Self {
        Self::DataQuality {
            message: message.into(),
        }
    }

    pub(crate) fn numerical(message: impl Into<String>) -> Self {
        Self::Numerical {
            message: message.into(),
        }
    }
}
