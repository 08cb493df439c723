//! Drop-first indicator encoding for the categorical fields
//!
//! The model was trained on `get_dummies(drop_first=True)` output, so each
//! field's lexically first training level is the reference level and has no
//! column of its own. The tables below spell that out per value instead of
//! relying on a library default.
//!
//! Values the model never saw as a separate column (Clothing, East, Cloudy,
//! Autumn) encode as all zeros and are indistinguishable from the reference
//! level.

use crate::{Category, Region, Seasonality, WeatherCondition};

impl Category {
    /// Indicator columns, in the order returned by [`Category::indicators`]
    pub const INDICATOR_COLUMNS: [&'static str; 4] = [
        "Category_Electronics",
        "Category_Furniture",
        "Category_Groceries",
        "Category_Toys",
    ];

    pub const REFERENCE: Category = Category::Clothing;

    pub fn indicators(self) -> [f32; 4] {
        match self {
            Category::Clothing => [0.0, 0.0, 0.0, 0.0],
            Category::Electronics => [1.0, 0.0, 0.0, 0.0],
            Category::Furniture => [0.0, 1.0, 0.0, 0.0],
            Category::Groceries => [0.0, 0.0, 1.0, 0.0],
            Category::Toys => [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl Region {
    pub const INDICATOR_COLUMNS: [&'static str; 3] = ["Region_North", "Region_South", "Region_West"];

    pub const REFERENCE: Region = Region::East;

    pub fn indicators(self) -> [f32; 3] {
        match self {
            Region::East => [0.0, 0.0, 0.0],
            Region::North => [1.0, 0.0, 0.0],
            Region::South => [0.0, 1.0, 0.0],
            Region::West => [0.0, 0.0, 1.0],
        }
    }
}

impl WeatherCondition {
    pub const INDICATOR_COLUMNS: [&'static str; 3] = [
        "Weather Condition_Rainy",
        "Weather Condition_Snowy",
        "Weather Condition_Sunny",
    ];

    pub const REFERENCE: WeatherCondition = WeatherCondition::Cloudy;

    pub fn indicators(self) -> [f32; 3] {
        match self {
            WeatherCondition::Cloudy => [0.0, 0.0, 0.0],
            WeatherCondition::Rainy => [1.0, 0.0, 0.0],
            WeatherCondition::Snowy => [0.0, 1.0, 0.0],
            WeatherCondition::Sunny => [0.0, 0.0, 1.0],
        }
    }
}

impl Seasonality {
    pub const INDICATOR_COLUMNS: [&'static str; 3] = [
        "Seasonality_Spring",
        "Seasonality_Summer",
        "Seasonality_Winter",
    ];

    pub const REFERENCE: Seasonality = Seasonality::Autumn;

    pub fn indicators(self) -> [f32; 3] {
        match self {
            Seasonality::Autumn => [0.0, 0.0, 0.0],
            Seasonality::Spring => [1.0, 0.0, 0.0],
            Seasonality::Summer => [0.0, 1.0, 0.0],
            Seasonality::Winter => [0.0, 0.0, 1.0],
        }
    }
}

/// Encode a boolean flag as 0/1
pub fn flag(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}
