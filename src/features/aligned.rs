//! Model-ready feature row
//!
//! The struct fields follow the column order the regressor was trained on,
//! so a row can never be missing a column or carry an extra one.

use crate::features::encoding::flag;
use crate::features::temporal::DateParts;
use crate::{RawRecord, Result};

/// Column names expected by the model, in training order
pub const FEATURE_NAMES: [&str; AlignedFeatureVector::DIM] = [
    "month",
    "Demand Forecast",
    "Discount",
    "Price",
    "Seasonality_Summer",
    "day_of_week",
    "Category_Toys",
    "Category_Furniture",
    "Category_Electronics",
    "Weather Condition_Rainy",
    "Seasonality_Spring",
    "Weather Condition_Snowy",
    "Inventory Level",
    "Category_Groceries",
    "Weather Condition_Sunny",
    "year",
    "Units Ordered",
    "Region_North",
    "Holiday/Promotion",
    "Competitor Pricing",
    "week_of_year",
    "Seasonality_Winter",
    "Region_South",
    "Region_West",
];

/// One row of model input
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AlignedFeatureVector {
    pub month: f32,
    pub demand_forecast: f32,
    pub discount: f32,
    pub price: f32,
    pub seasonality_summer: f32,
    pub day_of_week: f32,
    pub category_toys: f32,
    pub category_furniture: f32,
    pub category_electronics: f32,
    pub weather_rainy: f32,
    pub seasonality_spring: f32,
    pub weather_snowy: f32,
    pub inventory_level: f32,
    pub category_groceries: f32,
    pub weather_sunny: f32,
    pub year: f32,
    pub units_ordered: f32,
    pub region_north: f32,
    pub holiday_promotion: f32,
    pub competitor_pricing: f32,
    pub week_of_year: f32,
    pub seasonality_winter: f32,
    pub region_south: f32,
    pub region_west: f32,
}

impl AlignedFeatureVector {
    /// Number of model columns
    pub const DIM: usize = 24;

    /// Build the model row for a form submission
    ///
    /// Store and product identifiers are not model inputs and are ignored.
    /// Fails only when the date cannot be parsed.
    pub fn from_record(record: &RawRecord) -> Result<Self> {
        let date = DateParts::parse(&record.date)?;

        let [category_electronics, category_furniture, category_groceries, category_toys] =
            record.category.indicators();
        let [region_north, region_south, region_west] = record.region.indicators();
        let [weather_rainy, weather_snowy, weather_sunny] = record.weather_condition.indicators();
        let [seasonality_spring, seasonality_summer, seasonality_winter] =
            record.seasonality.indicators();

        Ok(AlignedFeatureVector {
            month: date.month as f32,
            demand_forecast: record.demand_forecast as f32,
            discount: record.discount as f32,
            price: record.price as f32,
            seasonality_summer,
            day_of_week: date.day_of_week as f32,
            category_toys,
            category_furniture,
            category_electronics,
            weather_rainy,
            seasonality_spring,
            weather_snowy,
            inventory_level: record.inventory_level as f32,
            category_groceries,
            weather_sunny,
            year: date.year as f32,
            units_ordered: record.units_ordered as f32,
            region_north,
            holiday_promotion: flag(record.holiday_promotion),
            competitor_pricing: record.competitor_pricing as f32,
            week_of_year: date.week_of_year as f32,
            seasonality_winter,
            region_south,
            region_west,
        })
    }

    /// Convert to a flat vector in [`FEATURE_NAMES`] order
    pub fn to_vec(&self) -> Vec<f32> {
        vec![
            self.month,
            self.demand_forecast,
            self.discount,
            self.price,
            self.seasonality_summer,
            self.day_of_week,
            self.category_toys,
            self.category_furniture,
            self.category_electronics,
            self.weather_rainy,
            self.seasonality_spring,
            self.weather_snowy,
            self.inventory_level,
            self.category_groceries,
            self.weather_sunny,
            self.year,
            self.units_ordered,
            self.region_north,
            self.holiday_promotion,
            self.competitor_pricing,
            self.week_of_year,
            self.seasonality_winter,
            self.region_south,
            self.region_west,
        ]
    }

    /// Create from a flat vector in [`FEATURE_NAMES`] order
    pub fn from_vec(v: &[f32]) -> Option<Self> {
        if v.len() != Self::DIM {
            return None;
        }
        Some(AlignedFeatureVector {
            month: v[0],
            demand_forecast: v[1],
            discount: v[2],
            price: v[3],
            seasonality_summer: v[4],
            day_of_week: v[5],
            category_toys: v[6],
            category_furniture: v[7],
            category_electronics: v[8],
            weather_rainy: v[9],
            seasonality_spring: v[10],
            weather_snowy: v[11],
            inventory_level: v[12],
            category_groceries: v[13],
            weather_sunny: v[14],
            year: v[15],
            units_ordered: v[16],
            region_north: v[17],
            holiday_promotion: v[18],
            competitor_pricing: v[19],
            week_of_year: v[20],
            seasonality_winter: v[21],
            region_south: v[22],
            region_west: v[23],
        })
    }

    /// Column name/value pairs in model order
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f32)> {
        FEATURE_NAMES.into_iter().zip(self.to_vec())
    }

    /// Look up a column by its model name
    pub fn get(&self, name: &str) -> Option<f32> {
        self.named().find(|(n, _)| *n == name).map(|(_, v)| v)
    }
}

/// Build the model row for a form submission
pub fn build(record: &RawRecord) -> Result<AlignedFeatureVector> {
    AlignedFeatureVector::from_record(record)
}
