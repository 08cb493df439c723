//! Retail sales forecasting
//!
//! Turns a single product/store context into the feature row a pre-trained
//! XGBoost regressor expects and reports its forecast of units sold.

pub mod features;
pub mod model;
pub mod predict;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Product category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Groceries,
    Toys,
    Electronics,
    Furniture,
    Clothing,
}

impl Category {
    /// All categories, in the order they are offered to the user
    pub const ALL: [Category; 5] = [
        Category::Groceries,
        Category::Toys,
        Category::Electronics,
        Category::Furniture,
        Category::Clothing,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Groceries => "Groceries",
            Category::Toys => "Toys",
            Category::Electronics => "Electronics",
            Category::Furniture => "Furniture",
            Category::Clothing => "Clothing",
        }
    }
}

/// Store region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    North,
    South,
    West,
    East,
}

impl Region {
    pub const ALL: [Region; 4] = [Region::North, Region::South, Region::West, Region::East];

    pub fn name(&self) -> &'static str {
        match self {
            Region::North => "North",
            Region::South => "South",
            Region::West => "West",
            Region::East => "East",
        }
    }
}

/// Weather on the forecast date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeatherCondition {
    Rainy,
    Sunny,
    Cloudy,
    Snowy,
}

impl WeatherCondition {
    pub const ALL: [WeatherCondition; 4] = [
        WeatherCondition::Rainy,
        WeatherCondition::Sunny,
        WeatherCondition::Cloudy,
        WeatherCondition::Snowy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            WeatherCondition::Rainy => "Rainy",
            WeatherCondition::Sunny => "Sunny",
            WeatherCondition::Cloudy => "Cloudy",
            WeatherCondition::Snowy => "Snowy",
        }
    }
}

/// Seasonality label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seasonality {
    Autumn,
    Summer,
    Winter,
    Spring,
}

impl Seasonality {
    pub const ALL: [Seasonality; 4] = [
        Seasonality::Autumn,
        Seasonality::Summer,
        Seasonality::Winter,
        Seasonality::Spring,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Seasonality::Autumn => "Autumn",
            Seasonality::Summer => "Summer",
            Seasonality::Winter => "Winter",
            Seasonality::Spring => "Spring",
        }
    }
}

/// Display and case-insensitive parsing shared by the categorical fields
macro_rules! categorical_field {
    ($ty:ident, $label:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.name())
            }
        }

        impl FromStr for $ty {
            type Err = ForecastError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                let wanted = s.trim();
                $ty::ALL
                    .iter()
                    .copied()
                    .find(|v| v.name().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| {
                        let options: Vec<&str> = $ty::ALL.iter().map(|v| v.name()).collect();
                        ForecastError::InvalidInput(format!(
                            "Unknown {}: {}. Use one of: {}",
                            $label,
                            wanted,
                            options.join(", ")
                        ))
                    })
            }
        }
    };
}

categorical_field!(Category, "category");
categorical_field!(Region, "region");
categorical_field!(WeatherCondition, "weather condition");
categorical_field!(Seasonality, "seasonality");

/// Highest discount percentage accepted by the form
pub const MAX_DISCOUNT: u8 = 20;

/// One submission of the forecast form
///
/// The date is kept as entered; it is only parsed when the feature row is
/// built, so a malformed date surfaces as [`ForecastError::SchemaMismatch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    pub date: String,
    pub store_id: String,
    pub product_id: String,
    pub category: Category,
    pub region: Region,
    pub inventory_level: u32,
    pub units_ordered: u32,
    pub demand_forecast: f64,
    pub price: f64,
    /// Percentage, 0 to [`MAX_DISCOUNT`]
    pub discount: u8,
    pub weather_condition: WeatherCondition,
    pub holiday_promotion: bool,
    pub competitor_pricing: f64,
    pub seasonality: Seasonality,
}

impl Default for RawRecord {
    fn default() -> Self {
        RawRecord {
            date: "2025-01-01".to_string(),
            store_id: "S001".to_string(),
            product_id: "P0001".to_string(),
            category: Category::Groceries,
            region: Region::North,
            inventory_level: 250,
            units_ordered: 100,
            demand_forecast: 100.0,
            price: 50.0,
            discount: 10,
            weather_condition: WeatherCondition::Rainy,
            holiday_promotion: false,
            competitor_pricing: 52.0,
            seasonality: Seasonality::Autumn,
        }
    }
}

impl RawRecord {
    /// Check the ranges the input form enforces
    pub fn validate(&self) -> Result<()> {
        if self.discount > MAX_DISCOUNT {
            return Err(ForecastError::InvalidInput(format!(
                "Discount must be between 0 and {}, got {}",
                MAX_DISCOUNT, self.discount
            )));
        }
        for (label, value) in [
            ("Demand forecast", self.demand_forecast),
            ("Price", self.price),
            ("Competitor pricing", self.competitor_pricing),
        ] {
            check_non_negative(label, value)?;
        }
        Ok(())
    }
}

/// Reject negative or non-finite amounts
pub fn check_non_negative(label: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ForecastError::InvalidInput(format!(
            "{} must be a non-negative number, got {}",
            label, value
        )))
    }
}

/// Model output for one submission
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Raw regressor output
    pub raw: f32,
}

impl Prediction {
    pub fn new(raw: f32) -> Self {
        Prediction { raw }
    }

    /// Forecast units, rounded to the nearest integer (ties to even)
    pub fn units(&self) -> i64 {
        self.raw.round_ties_even() as i64
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.units())
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Invalid record: {0}")]
    SchemaMismatch(String),

    #[error("Prediction failed: {0}")]
    Prediction(String),

    #[error("Failed to load model from {path}: {message} (check that the model file exists at that location)")]
    ModelLoad { path: String, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ForecastError {
    /// Whether the user can fix this by resubmitting the form
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ForecastError::SchemaMismatch(_)
                | ForecastError::Prediction(_)
                | ForecastError::InvalidInput(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ForecastError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    /// Values pre-filled in the form
    #[serde(default)]
    pub defaults: RawRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub path: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            path: "modelo_final_ventas.json".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ForecastError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| ForecastError::Config(format!("Failed to parse config: {}", e)))?;
        config
            .defaults
            .validate()
            .map_err(|e| ForecastError::Config(format!("Bad form defaults: {}", e)))?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ForecastError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
