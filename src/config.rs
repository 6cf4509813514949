use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Result, SplitError};

pub const DEFAULT_WINDOW_SEC: f64 = 0.05;
pub const DEFAULT_SEARCH_RADIUS_SEC: f64 = 15.0;
pub const DEFAULT_REGION_SEC: f64 = 0.3;
pub const DEFAULT_THRESHOLD_FACTOR: f64 = 0.05;
pub const DEFAULT_MIN_SILENCE_SEC: f64 = 1.0;
pub const DEFAULT_MARGIN_SEC: f64 = 3.0;
pub const DEFAULT_MEDIAN_KERNEL: usize = 5;

/// Tunable analysis parameters, resolved and validated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams {
    /// RMS window size in seconds
    pub window_sec: f64,
    /// Half-width of the boundary search around a predicted track end
    pub search_radius_sec: f64,
    /// Width of the sliding quiet region
    pub region_sec: f64,
    /// Silence threshold as a fraction of the median energy
    pub threshold_factor: f64,
    pub min_silence_sec: f64,
    /// Gaps this close to the start or end of the timeline are ignored
    pub margin_sec: f64,
    /// Median filter kernel size in RMS windows
    pub median_kernel: usize,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        AnalysisParams {
            window_sec: DEFAULT_WINDOW_SEC,
            search_radius_sec: DEFAULT_SEARCH_RADIUS_SEC,
            region_sec: DEFAULT_REGION_SEC,
            threshold_factor: DEFAULT_THRESHOLD_FACTOR,
            min_silence_sec: DEFAULT_MIN_SILENCE_SEC,
            margin_sec: DEFAULT_MARGIN_SEC,
            median_kernel: DEFAULT_MEDIAN_KERNEL,
        }
    }
}

impl AnalysisParams {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("window_sec", self.window_sec),
            ("search_radius_sec", self.search_radius_sec),
            ("region_sec", self.region_sec),
            ("min_silence_sec", self.min_silence_sec),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SplitError::InvalidConfig {
                    reason: format!("{} must be a positive number, got {}", name, value),
                });
            }
        }
        if !(self.margin_sec.is_finite() && self.margin_sec >= 0.0) {
            return Err(SplitError::InvalidConfig {
                reason: format!("margin_sec must not be negative, got {}", self.margin_sec),
            });
        }
        if !(self.threshold_factor > 0.0 && self.threshold_factor <= 1.0) {
            return Err(SplitError::InvalidConfig {
                reason: format!(
                    "threshold_factor must be in (0, 1], got {}",
                    self.threshold_factor
                ),
            });
        }
        if self.median_kernel == 0 {
            return Err(SplitError::InvalidConfig {
                reason: "median_kernel must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration defaults that can be saved to a file.
///
/// Every field is optional; unset fields fall back to [`AnalysisParams::default`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_sec: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_radius_sec: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_sec: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_factor: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_silence_sec: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_sec: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub median_kernel: Option<usize>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the config file path (~/.state/vinylsplit/defaults.toml)
    pub fn get_config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").map_err(|_| {
            io::Error::new(io::ErrorKind::NotFound, "HOME environment variable not set")
        })?;

        let config_dir = Path::new(&home).join(".state").join("vinylsplit");
        Ok(config_dir.join("defaults.toml"))
    }

    /// Load config from the default location. A missing file yields an empty config.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::new());
        }

        let content = fs::read_to_string(config_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        fs::write(config_path, toml_string)?;

        Ok(())
    }

    /// Merge this config with another, preferring values from other
    pub fn merge(&mut self, other: &Config) {
        if other.window_sec.is_some() {
            self.window_sec = other.window_sec;
        }
        if other.search_radius_sec.is_some() {
            self.search_radius_sec = other.search_radius_sec;
        }
        if other.region_sec.is_some() {
            self.region_sec = other.region_sec;
        }
        if other.threshold_factor.is_some() {
            self.threshold_factor = other.threshold_factor;
        }
        if other.min_silence_sec.is_some() {
            self.min_silence_sec = other.min_silence_sec;
        }
        if other.margin_sec.is_some() {
            self.margin_sec = other.margin_sec;
        }
        if other.median_kernel.is_some() {
            self.median_kernel = other.median_kernel;
        }
    }

    /// Apply the set fields over the defaults and validate the result.
    pub fn resolve(&self) -> Result<AnalysisParams> {
        let defaults = AnalysisParams::default();
        let params = AnalysisParams {
            window_sec: self.window_sec.unwrap_or(defaults.window_sec),
            search_radius_sec: self.search_radius_sec.unwrap_or(defaults.search_radius_sec),
            region_sec: self.region_sec.unwrap_or(defaults.region_sec),
            threshold_factor: self.threshold_factor.unwrap_or(defaults.threshold_factor),
            min_silence_sec: self.min_silence_sec.unwrap_or(defaults.min_silence_sec),
            margin_sec: self.margin_sec.unwrap_or(defaults.margin_sec),
            median_kernel: self.median_kernel.unwrap_or(defaults.median_kernel),
        };
        params.validate()?;
        Ok(params)
    }

    /// Human-readable lines for the fields that are set
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(window_sec) = self.window_sec {
            lines.push(format!("RMS window:         {} seconds", window_sec));
        }
        if let Some(radius) = self.search_radius_sec {
            lines.push(format!("Search radius:      {} seconds", radius));
        }
        if let Some(region) = self.region_sec {
            lines.push(format!("Quiet region:       {} seconds", region));
        }
        if let Some(factor) = self.threshold_factor {
            lines.push(format!("Threshold factor:   {}", factor));
        }
        if let Some(min_silence) = self.min_silence_sec {
            lines.push(format!("Min silence:        {} seconds", min_silence));
        }
        if let Some(margin) = self.margin_sec {
            lines.push(format!("Edge margin:        {} seconds", margin));
        }
        if let Some(kernel) = self.median_kernel {
            lines.push(format!("Median kernel:      {} windows", kernel));
        }
        lines
    }

    /// Print the config in a human-readable format
    pub fn print(&self, title: &str) {
        println!("{}:", title);
        let lines = self.describe();
        if lines.is_empty() {
            println!("  (built-in defaults)");
        }
        for line in lines {
            println!("  {}", line);
        }
    }
}
