pub mod error;
pub mod http;

use crate::domain::contract::RawPredictionResponse;
use anyhow::ensure;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_MILEAGE: u32 = 50_000;
pub const DEFAULT_REGION: &str = "california";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Excellent,
    #[default]
    Good,
    Fair,
    Salvage,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Salvage => "salvage",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "excellent" => Ok(Self::Excellent),
            "good" => Ok(Self::Good),
            "fair" => Ok(Self::Fair),
            "salvage" => Ok(Self::Salvage),
            other => anyhow::bail!("unknown condition: {other}"),
        }
    }
}

/// Vehicle attributes sent to the prediction backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionParams {
    pub make: String,
    pub model: String,
    pub year: i32,
    #[serde(default = "default_mileage")]
    pub mileage: u32,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_mileage() -> u32 {
    DEFAULT_MILEAGE
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

impl PredictionParams {
    pub fn new(make: impl Into<String>, model: impl Into<String>, year: i32) -> Self {
        Self {
            make: make.into(),
            model: model.into(),
            year,
            mileage: DEFAULT_MILEAGE,
            condition: Condition::default(),
            region: default_region(),
        }
    }

    /// Checked before any network call; the form refuses to submit without these.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.make.trim().is_empty(), "make must be non-empty");
        ensure!(!self.model.trim().is_empty(), "model must be non-empty");
        ensure!(!self.region.trim().is_empty(), "region must be non-empty");
        ensure!(
            (1900..=2100).contains(&self.year),
            "year out of range: {}",
            self.year
        );
        Ok(())
    }
}

#[async_trait::async_trait]
pub trait PredictionClient: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn get_prediction(&self, params: &PredictionParams)
        -> anyhow::Result<RawPredictionResponse>;
}
