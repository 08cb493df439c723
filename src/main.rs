//! Sales Forecast CLI
//!
//! Forecasts units sold for a product/store context with a pre-trained
//! XGBoost model.

use clap::{Args, Parser, Subcommand};
use forecast::{Category, Config, RawRecord, Region, Result, Seasonality, WeatherCondition};

#[derive(Parser)]
#[command(name = "forecast")]
#[command(about = "Retail units-sold forecasting with a pre-trained XGBoost model", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Model file path (overrides the config)
    #[arg(short, long)]
    model: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast units sold for one product/store context
    Predict {
        #[command(flatten)]
        record: RecordArgs,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Fill in the forecast form interactively
    Interactive,
    /// Show the model input row for a context without predicting
    Features {
        #[command(flatten)]
        record: RecordArgs,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Model management commands
    Model {
        #[command(subcommand)]
        action: ModelCommands,
    },
    /// Write a default config file
    Init,
}

#[derive(Subcommand)]
enum ModelCommands {
    /// Show model information
    Info,
}

/// Form fields; anything omitted falls back to the config defaults
#[derive(Args, Debug)]
struct RecordArgs {
    /// Forecast date (YYYY-MM-DD)
    #[arg(long)]
    date: Option<String>,
    /// Product category (Groceries, Toys, Electronics, Furniture, Clothing)
    #[arg(long)]
    category: Option<Category>,
    /// Store region (North, South, West, East)
    #[arg(long)]
    region: Option<Region>,
    /// Weather condition (Rainy, Sunny, Cloudy, Snowy)
    #[arg(long)]
    weather: Option<WeatherCondition>,
    /// Seasonality (Autumn, Summer, Winter, Spring)
    #[arg(long)]
    seasonality: Option<Seasonality>,
    /// Inventory level
    #[arg(long)]
    inventory: Option<u32>,
    /// Units ordered
    #[arg(long)]
    units_ordered: Option<u32>,
    /// Prior demand forecast
    #[arg(long, value_parser = non_negative)]
    demand_forecast: Option<f64>,
    /// Product price
    #[arg(long, value_parser = non_negative)]
    price: Option<f64>,
    /// Competitor price
    #[arg(long, value_parser = non_negative)]
    competitor_price: Option<f64>,
    /// Discount percentage
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=20))]
    discount: Option<u8>,
    /// Holiday or promotion day
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    holiday: Option<bool>,
    /// Store identifier (not a model input)
    #[arg(long)]
    store_id: Option<String>,
    /// Product identifier (not a model input)
    #[arg(long)]
    product_id: Option<String>,
}

impl RecordArgs {
    fn apply(self, defaults: &RawRecord) -> RawRecord {
        let d = defaults.clone();
        RawRecord {
            date: self.date.unwrap_or(d.date),
            store_id: self.store_id.unwrap_or(d.store_id),
            product_id: self.product_id.unwrap_or(d.product_id),
            category: self.category.unwrap_or(d.category),
            region: self.region.unwrap_or(d.region),
            inventory_level: self.inventory.unwrap_or(d.inventory_level),
            units_ordered: self.units_ordered.unwrap_or(d.units_ordered),
            demand_forecast: self.demand_forecast.unwrap_or(d.demand_forecast),
            price: self.price.unwrap_or(d.price),
            discount: self.discount.unwrap_or(d.discount),
            weather_condition: self.weather.unwrap_or(d.weather_condition),
            holiday_promotion: self.holiday.unwrap_or(d.holiday_promotion),
            competitor_pricing: self.competitor_price.unwrap_or(d.competitor_pricing),
            seasonality: self.seasonality.unwrap_or(d.seasonality),
        }
    }
}

fn non_negative(s: &str) -> std::result::Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    forecast::check_non_negative("Value", value).map_err(|e| e.to_string())
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let mut config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };
    if let Some(model) = cli.model {
        config.model.path = model;
    }

    // Run command
    let result = match cli.command {
        Commands::Predict { record, format } => commands::predict(&config, record, format),
        Commands::Interactive => commands::interactive(&config),
        Commands::Features { record, format } => commands::features(&config, record, format),
        Commands::Model { action } => match action {
            ModelCommands::Info => commands::model_info(&config),
        },
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use forecast::features::{build, AlignedFeatureVector, FEATURE_NAMES};
    use forecast::predict::inference::{format_prediction, prediction_hint, Predictor};
    use forecast::predict::FormSession;
    use forecast::{ForecastError, Prediction};

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        println!("\nNext steps:");
        println!("  1. Edit {} to point [model] path at your model file", config_path);
        println!("  2. Run 'forecast model info' to check the model loads");
        println!("  3. Run 'forecast interactive' to fill in the forecast form");

        Ok(())
    }

    pub fn predict(config: &Config, args: RecordArgs, format: OutputFormat) -> Result<()> {
        let record = args.apply(&config.defaults);
        record.validate()?;

        let predictor = Predictor::load(&config.model.path)?;
        let prediction = match predictor.forecast(&record) {
            Ok(p) => p,
            Err(e @ ForecastError::Prediction(_)) => {
                eprintln!("{}", prediction_hint(&config.model.path));
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        match format {
            OutputFormat::Table => {
                print!("{}", format_prediction(&prediction, &record));
            }
            OutputFormat::Json => println!("{}", prediction_json(&prediction, &record)?),
            OutputFormat::Csv => print!("{}", prediction_csv(&prediction, &record)),
        }

        Ok(())
    }

    pub fn interactive(config: &Config) -> Result<()> {
        let loaded = Predictor::load(&config.model.path);

        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        let mut session = FormSession::new(
            stdin.lock(),
            stdout.lock(),
            config.defaults.clone(),
            loaded.as_ref(),
            &config.model.path,
        );

        println!("Sales Forecast");
        println!("───────────────────────────────");
        let summary = session.run()?;
        println!(
            "\n{} submission(s), {} forecast(s), {} failed",
            summary.submissions, summary.forecasts, summary.failures
        );

        Ok(())
    }

    pub fn features(config: &Config, args: RecordArgs, format: OutputFormat) -> Result<()> {
        let record = args.apply(&config.defaults);
        record.validate()?;
        let features = build(&record)?;

        match format {
            OutputFormat::Table => {
                println!("Model input row");
                println!("───────────────────────────────");
                for (name, value) in features.named() {
                    println!("  {:<24} {}", name, value);
                }
            }
            OutputFormat::Json => println!("{}", features_json(&features)?),
            OutputFormat::Csv => print!("{}", features_csv(&features)),
        }

        Ok(())
    }

    pub fn prediction_json(prediction: &Prediction, record: &RawRecord) -> Result<String> {
        let json = serde_json::json!({
            "date": record.date.trim(),
            "category": record.category,
            "region": record.region,
            "units": prediction.units(),
            "raw": prediction.raw,
        });
        serde_json::to_string_pretty(&json).map_err(|e| ForecastError::Io(std::io::Error::other(e)))
    }

    pub fn prediction_csv(prediction: &Prediction, record: &RawRecord) -> String {
        format!(
            "date,category,region,units,raw\n{},{},{},{},{:.4}\n",
            record.date.trim(),
            record.category,
            record.region,
            prediction.units(),
            prediction.raw
        )
    }

    /// Feature row as a JSON object keyed by column name
    pub fn features_json(features: &AlignedFeatureVector) -> Result<String> {
        let map: serde_json::Map<String, serde_json::Value> = features
            .named()
            .map(|(name, value)| (name.to_string(), serde_json::json!(value)))
            .collect();
        serde_json::to_string_pretty(&map).map_err(|e| ForecastError::Io(std::io::Error::other(e)))
    }

    /// Header plus one row, columns in model order
    pub fn features_csv(features: &AlignedFeatureVector) -> String {
        let values: Vec<String> = features.to_vec().iter().map(|v| v.to_string()).collect();
        format!("{}\n{}\n", FEATURE_NAMES.join(","), values.join(","))
    }

    pub fn model_info(config: &Config) -> Result<()> {
        let predictor = Predictor::load(&config.model.path)?;
        let model = predictor.model();

        let names_status = if model.feature_names().is_empty() {
            "not recorded".to_string()
        } else if model.feature_names().iter().map(String::as_str).eq(FEATURE_NAMES) {
            "match the form".to_string()
        } else {
            "DO NOT match the form".to_string()
        };

        println!("Model Information");
        println!("───────────────────────────────");
        println!("  Path:           {}", config.model.path);
        println!("  Booster:        {}", model.kind());
        println!("  Objective:      {}", model.objective());
        println!("  Trees:          {}", model.num_trees());
        println!("  Leaves:         {}", model.total_leaves());
        println!("  Features:       {}", model.num_features());
        println!("  Feature names:  {}", names_status);
        println!("  Base score:     {}", model.base_score());
        if let Some(version) = model.version() {
            println!("  XGBoost:        {}", version);
        }

        Ok(())
    }
}
