//! Run configuration.
//!
//! Every knob has a default matching the Boston datasets, so the binary
//! runs without a config file. A TOML file passed with `--config` only
//! needs the keys it changes:
//!
//! ```toml
//! [source.paging]
//! max_records = 20000
//!
//! [permits]
//! from_year = 2022
//! ```

use std::path::{Path, PathBuf};

use hotspot_analysis::entropy::EntropyConfig;
use hotspot_analysis::kde::KdeConfig;
use hotspot_event_models::BoundingBox;
use hotspot_render::choropleth::ChoroplethOptions;
use hotspot_render::heatmap::HeatmapOptions;
use hotspot_render::timeseries::TimeSeriesOptions;
use hotspot_source::PagingConfig;
use hotspot_source::ckan::DEFAULT_API_URL;
use serde::{Deserialize, Serialize};

/// Errors that can occur while loading the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`AppConfig`].
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration, one section per pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: RemoteConfig,
    pub crime: CrimeConfig,
    pub heatmap: LocationHeatmapConfig,
    pub permits: PermitConfig,
    pub needles: NeedleConfig,
}

impl AppConfig {
    /// Reads `path`, or returns the defaults when no path is given.
    ///
    /// # Errors
    ///
    /// * If the file cannot be read
    /// * If the file is not valid TOML for this structure
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&text)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// * If the document is not valid TOML for this structure
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

/// The remote query service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// `datastore_search_sql` endpoint.
    pub api_url: String,
    pub paging: PagingConfig,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            paging: PagingConfig::default(),
        }
    }
}

/// Offense/hour entropy ranking over a local crime export, followed by a
/// heat overlay of one offense at chosen hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrimeConfig {
    pub table: String,
    pub category_column: String,
    pub hour_column: String,
    pub latitude_column: String,
    pub longitude_column: String,
    pub entropy: EntropyConfig,
    /// Print only the first `top` rows of the ranking.
    pub top: Option<usize>,
    pub heatmap_offense: String,
    pub heatmap_hours: Vec<u8>,
    pub heatmap: HeatmapOptions,
    pub output: PathBuf,
}

impl Default for CrimeConfig {
    fn default() -> Self {
        Self {
            table: "crime_reports".to_string(),
            category_column: "OFFENSE_DESCRIPTION".to_string(),
            hour_column: "HOUR".to_string(),
            latitude_column: "Lat".to_string(),
            longitude_column: "Long".to_string(),
            entropy: EntropyConfig::default(),
            top: None,
            heatmap_offense: "DRUGS - POSSESSION/ SALE/ MANUFACTURING/ USE".to_string(),
            heatmap_hours: vec![7, 8, 9],
            heatmap: HeatmapOptions {
                sample_cap: None,
                radius: Some(10),
                zoom: 13,
                title: "Drug offenses 07:00-09:59".to_string(),
                ..HeatmapOptions::default()
            },
            output: PathBuf::from("drug_heatmap_hour07_09.html"),
        }
    }
}

/// Heat overlay of a local table with a combined `"(lat, lon)"` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationHeatmapConfig {
    pub table: String,
    pub location_column: String,
    pub heatmap: HeatmapOptions,
    pub output: PathBuf,
}

impl Default for LocationHeatmapConfig {
    fn default() -> Self {
        Self {
            table: "my_table".to_string(),
            location_column: "Location".to_string(),
            heatmap: HeatmapOptions {
                title: "Crime heatmap".to_string(),
                ..HeatmapOptions::default()
            },
            output: PathBuf::from("crime_heatmap.html"),
        }
    }
}

/// Year-over-year building permit density change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermitConfig {
    pub resource: String,
    pub date_column: String,
    pub latitude_column: String,
    pub longitude_column: String,
    pub from_year: i32,
    pub to_year: i32,
    pub bbox: BoundingBox,
    pub kde: KdeConfig,
    pub choropleth: ChoroplethOptions,
    pub output: PathBuf,
}

impl Default for PermitConfig {
    fn default() -> Self {
        Self {
            resource: "6ddcd912-32a0-43df-9908-63574f8c7e77".to_string(),
            date_column: "issued_date".to_string(),
            latitude_column: "y_latitude".to_string(),
            longitude_column: "x_longitude".to_string(),
            from_year: 2023,
            to_year: 2024,
            bbox: BoundingBox::BOSTON,
            kde: KdeConfig::default(),
            choropleth: ChoroplethOptions {
                title: "Building permit density change".to_string(),
                ..ChoroplethOptions::default()
            },
            output: PathBuf::from("boston_permit_density_change_map_all_data.html"),
        }
    }
}

/// Daily 311 needle pickup requests across yearly resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeedleConfig {
    /// One 311 resource per year, fetched in order and concatenated.
    pub resources: Vec<String>,
    pub title_column: String,
    pub case_title: String,
    pub date_column: String,
    /// Row cap per resource.
    pub max_records: u64,
    pub chart: TimeSeriesOptions,
    pub output: PathBuf,
}

impl Default for NeedleConfig {
    fn default() -> Self {
        Self {
            resources: vec![
                "e6013a93-1321-4f2a-bf91-8d8a02f1e62f".to_string(),
                "dff4d804-5031-443a-8409-8344efd0e5c8".to_string(),
                "9d7c2214-4709-478a-a2e8-fb2020a5bb94".to_string(),
            ],
            title_column: "case_title".to_string(),
            case_title: "Needle Pickup".to_string(),
            date_column: "open_dt".to_string(),
            max_records: 100_000,
            chart: TimeSeriesOptions {
                title: "Daily 311 Needle Pickup Calls (2023-2025)".to_string(),
                label: "311 Needle Pickup".to_string(),
                ..TimeSeriesOptions::default()
            },
            output: PathBuf::from("needle_pickup_timeseries.png"),
        }
    }
}
