//! Interactive forecast form
//!
//! Prompts for each field of a [`RawRecord`], runs the forecast and shows the
//! result. Bad submissions and failed predictions are reported and the user
//! can try again; only I/O errors end the session.

use std::fmt;
use std::io::{BufRead, Write};
use std::str::FromStr;

use super::inference::{format_prediction, prediction_hint, Predictor};
use crate::features::build;
use crate::{
    check_non_negative, Category, ForecastError, RawRecord, Region, Result, Seasonality,
    WeatherCondition, MAX_DISCOUNT,
};

/// Counts reported when the session ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub submissions: usize,
    pub forecasts: usize,
    pub failures: usize,
}

/// Prompt loop over any line-based input and output
pub struct FormSession<'a, R, W> {
    input: R,
    output: W,
    defaults: RawRecord,
    /// Loaded model, or the error that prevented loading it
    predictor: std::result::Result<&'a Predictor, &'a ForecastError>,
    model_path: String,
}

impl<'a, R: BufRead, W: Write> FormSession<'a, R, W> {
    pub fn new(
        input: R,
        output: W,
        defaults: RawRecord,
        predictor: std::result::Result<&'a Predictor, &'a ForecastError>,
        model_path: &str,
    ) -> Self {
        FormSession {
            input,
            output,
            defaults,
            predictor,
            model_path: model_path.to_string(),
        }
    }

    /// Run until end of input or the user declines another forecast
    pub fn run(&mut self) -> Result<SessionSummary> {
        let mut summary = SessionSummary::default();

        if let Err(e) = self.predictor {
            writeln!(self.output, "Error: {}", e)?;
            writeln!(
                self.output,
                "Forecasts are unavailable; the form will only show the model input row."
            )?;
        }

        loop {
            writeln!(self.output, "\nInput parameters (press Enter to keep the default)")?;
            let record = match self.read_record()? {
                Some(r) => r,
                None => break,
            };

            summary.submissions += 1;
            if self.submit(&record)? {
                summary.forecasts += 1;
            } else {
                summary.failures += 1;
            }

            match self.ask_yes_no("Make another forecast?", true)? {
                Some(true) => continue,
                _ => break,
            }
        }

        log::debug!("Session finished: {:?}", summary);
        Ok(summary)
    }

    /// Forecast one record; returns whether a forecast was shown
    fn submit(&mut self, record: &RawRecord) -> Result<bool> {
        let predictor = match self.predictor {
            Ok(p) => p,
            Err(_) => {
                match build(record) {
                    Ok(features) => {
                        writeln!(self.output, "\nModel input row:")?;
                        for (name, value) in features.named() {
                            writeln!(self.output, "  {:<24} {}", name, value)?;
                        }
                    }
                    Err(e) => self.report(&e)?,
                }
                writeln!(self.output, "{}", prediction_hint(&self.model_path))?;
                return Ok(false);
            }
        };

        match predictor.forecast(record) {
            Ok(prediction) => {
                write!(self.output, "{}", format_prediction(&prediction, record))?;
                Ok(true)
            }
            Err(e) if e.is_recoverable() => {
                self.report(&e)?;
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn report(&mut self, error: &ForecastError) -> Result<()> {
        log::warn!("Submission rejected: {}", error);
        writeln!(self.output, "Error: {}", error)?;
        match error {
            ForecastError::SchemaMismatch(_) => {
                writeln!(self.output, "Please correct the date and submit again.")?;
            }
            ForecastError::Prediction(_) => {
                writeln!(self.output, "{}", prediction_hint(&self.model_path))?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Read all fields; `None` at end of input
    fn read_record(&mut self) -> Result<Option<RawRecord>> {
        let d = self.defaults.clone();

        macro_rules! field {
            ($e:expr) => {
                match $e? {
                    Some(v) => v,
                    None => return Ok(None),
                }
            };
        }

        let category = field!(self.ask_choice("Category", &Category::ALL, d.category));
        let region = field!(self.ask_choice("Region", &Region::ALL, d.region));
        let weather_condition = field!(self.ask_choice(
            "Weather condition",
            &WeatherCondition::ALL,
            d.weather_condition
        ));
        let seasonality = field!(self.ask_choice("Seasonality", &Seasonality::ALL, d.seasonality));
        // Parsed when the row is built so a bad date is reported as such
        let date = field!(self.ask("Forecast date (YYYY-MM-DD)", &d.date));
        let inventory_level = field!(self.ask_parsed(
            "Inventory level",
            &d.inventory_level.to_string(),
            |s| parse_count("Inventory level", s)
        ));
        let units_ordered = field!(self.ask_parsed(
            "Units ordered",
            &d.units_ordered.to_string(),
            |s| parse_count("Units ordered", s)
        ));
        let demand_forecast = field!(self.ask_parsed(
            "Demand forecast",
            &format!("{:.2}", d.demand_forecast),
            |s| parse_amount("Demand forecast", s)
        ));
        let price = field!(self.ask_parsed("Price", &format!("{:.2}", d.price), |s| {
            parse_amount("Price", s)
        }));
        let competitor_pricing = field!(self.ask_parsed(
            "Competitor pricing",
            &format!("{:.2}", d.competitor_pricing),
            |s| parse_amount("Competitor pricing", s)
        ));
        let discount = field!(self.ask_parsed(
            &format!("Discount % (0-{})", MAX_DISCOUNT),
            &d.discount.to_string(),
            parse_discount
        ));
        let holiday_promotion = field!(self.ask_yes_no("Holiday or promotion?", d.holiday_promotion));

        Ok(Some(RawRecord {
            date,
            store_id: d.store_id,
            product_id: d.product_id,
            category,
            region,
            inventory_level,
            units_ordered,
            demand_forecast,
            price,
            discount,
            weather_condition,
            holiday_promotion,
            competitor_pricing,
            seasonality,
        }))
    }

    /// Prompt once; empty answer yields the default, end of input yields `None`
    fn ask(&mut self, label: &str, default: &str) -> Result<Option<String>> {
        write!(self.output, "{} [{}]: ", label, default)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let answer = line.trim();
        Ok(Some(if answer.is_empty() {
            default.to_string()
        } else {
            answer.to_string()
        }))
    }

    /// Prompt until the answer parses
    fn ask_parsed<T>(
        &mut self,
        label: &str,
        default: &str,
        parse: impl Fn(&str) -> Result<T>,
    ) -> Result<Option<T>> {
        loop {
            let answer = match self.ask(label, default)? {
                Some(a) => a,
                None => return Ok(None),
            };
            match parse(&answer) {
                Ok(v) => return Ok(Some(v)),
                Err(e) => writeln!(self.output, "  {}", e)?,
            }
        }
    }

    /// Pick from a fixed list by name or 1-based number
    fn ask_choice<T>(&mut self, label: &str, options: &[T], default: T) -> Result<Option<T>>
    where
        T: Copy + fmt::Display + FromStr<Err = ForecastError>,
    {
        let names: Vec<String> = options
            .iter()
            .enumerate()
            .map(|(i, o)| format!("{}={}", i + 1, o))
            .collect();
        let label = format!("{} ({})", label, names.join(", "));

        self.ask_parsed(&label, &default.to_string(), |s| {
            if let Ok(n) = s.parse::<usize>() {
                return n
                    .checked_sub(1)
                    .and_then(|i| options.get(i).copied())
                    .ok_or_else(|| {
                        ForecastError::InvalidInput(format!(
                            "choose a number between 1 and {}",
                            options.len()
                        ))
                    });
            }
            s.parse::<T>()
        })
    }

    fn ask_yes_no(&mut self, label: &str, default: bool) -> Result<Option<bool>> {
        let default = if default { "y" } else { "n" };
        self.ask_parsed(label, default, |s| match s.to_ascii_lowercase().as_str() {
            "y" | "yes" | "true" | "1" => Ok(true),
            "n" | "no" | "false" | "0" => Ok(false),
            other => Err(ForecastError::InvalidInput(format!(
                "answer y or n, got '{}'",
                other
            ))),
        })
    }
}

/// Parse a non-negative whole number
pub fn parse_count(label: &str, text: &str) -> Result<u32> {
    text.trim().parse::<u32>().map_err(|_| {
        ForecastError::InvalidInput(format!(
            "{} must be a whole number of at least 0, got '{}'",
            label,
            text.trim()
        ))
    })
}

/// Parse a non-negative amount
pub fn parse_amount(label: &str, text: &str) -> Result<f64> {
    let value = text.trim().parse::<f64>().map_err(|_| {
        ForecastError::InvalidInput(format!("{} must be a number, got '{}'", label, text.trim()))
    })?;
    check_non_negative(label, value)
}

/// Parse a discount percentage within the allowed range
pub fn parse_discount(text: &str) -> Result<u8> {
    text.trim()
        .parse::<u8>()
        .ok()
        .filter(|d| *d <= MAX_DISCOUNT)
        .ok_or_else(|| {
            ForecastError::InvalidInput(format!(
                "Discount must be a whole number between 0 and {}, got '{}'",
                MAX_DISCOUNT,
                text.trim()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{AlignedFeatureVector, FEATURE_NAMES};
    use crate::model::booster::tests::{model_json, stump};
    use crate::model::Booster;
    use std::io::Cursor;

    /// 12 prompts per submission
    const ACCEPT_DEFAULTS: &str = "\n\n\n\n\n\n\n\n\n\n\n\n";

    fn predictor() -> Predictor {
        let discount = FEATURE_NAMES.iter().position(|n| *n == "Discount").unwrap();
        let text = model_json(
            "1.2E2",
            "reg:squarederror",
            AlignedFeatureVector::DIM,
            FEATURE_NAMES.to_vec(),
            vec![stump(discount, 15.0, 0.0, 30.0)],
        );
        Predictor::new(Booster::from_json_str(&text).unwrap())
    }

    fn run_session(
        input: &str,
        predictor: std::result::Result<&Predictor, &ForecastError>,
    ) -> (SessionSummary, String) {
        let mut output = Vec::new();
        let summary = FormSession::new(
            Cursor::new(input.as_bytes()),
            &mut output,
            RawRecord::default(),
            predictor,
            "modelo_final_ventas.json",
        )
        .run()
        .unwrap();
        (summary, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_defaults_forecast() {
        let p = predictor();
        let input = format!("{}n\n", ACCEPT_DEFAULTS);
        let (summary, output) = run_session(&input, Ok(&p));

        assert_eq!(
            summary,
            SessionSummary {
                submissions: 1,
                forecasts: 1,
                failures: 0
            }
        );
        assert!(output.contains("Forecast units sold:  120"), "{}", output);
    }

    #[test]
    fn test_choices_by_number_and_name() {
        let p = predictor();
        // Toys, east, 4=Snowy, Summer, date, defaults..., discount 18, holiday yes
        let input = "2\neast\n4\nsummer\n2025-06-15\n\n\n\n\n\n18\ny\nn\n";
        let (summary, output) = run_session(input, Ok(&p));

        assert_eq!(summary.forecasts, 1);
        assert!(output.contains("Toys in East on 2025-06-15"), "{}", output);
        assert!(output.contains("Forecast units sold:  150"), "{}", output);
        assert!(output.contains("(holiday/promotion)"));
    }

    #[test]
    fn test_invalid_answers_are_reprompted() {
        let p = predictor();
        // bad category, 9 out of range, then valid; discount 25 then 5
        let input = "Shoes\n9\nToys\n\n\n\n\n-4\n\n\n\n\n25\n5\nmaybe\nn\nn\n";
        let (summary, output) = run_session(input, Ok(&p));

        assert_eq!(summary.forecasts, 1);
        assert!(output.contains("Unknown category: Shoes"));
        assert!(output.contains("choose a number between 1 and 5"));
        assert!(output.contains("Inventory level must be a whole number"));
        assert!(output.contains("Discount must be a whole number between 0 and 20"));
        assert!(output.contains("answer y or n"));
    }

    #[test]
    fn test_bad_date_allows_resubmission() {
        let p = predictor();
        let input = format!(
            "\n\n\n\nnext tuesday\n\n\n\n\n\n\n\n\n{}n\n",
            ACCEPT_DEFAULTS
        );
        let (summary, output) = run_session(&input, Ok(&p));

        assert_eq!(summary.submissions, 2);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.forecasts, 1);
        assert!(output.contains("cannot parse date 'next tuesday'"));
        assert!(output.contains("Please correct the date"));
    }

    #[test]
    fn test_prediction_error_shows_hint() {
        let text = model_json("1E0", "reg:squarederror", 3, vec![], vec![stump(0, 1.0, 0.0, 0.0)]);
        let p = Predictor::new(Booster::from_json_str(&text).unwrap());
        let input = format!("{}n\n", ACCEPT_DEFAULTS);
        let (summary, output) = run_session(&input, Ok(&p));

        assert_eq!(summary.failures, 1);
        assert!(output.contains("Prediction failed"));
        assert!(output.contains("Check that the model file 'modelo_final_ventas.json' exists"));
    }

    #[test]
    fn test_missing_model_still_previews_row() {
        let err = ForecastError::ModelLoad {
            path: "modelo_final_ventas.json".to_string(),
            message: "No such file or directory".to_string(),
        };
        let input = format!("{}n\n", ACCEPT_DEFAULTS);
        let (summary, output) = run_session(&input, Err(&err));

        assert_eq!(summary.forecasts, 0);
        assert_eq!(summary.failures, 1);
        assert!(output.contains("Forecasts are unavailable"));
        assert!(output.contains("Model input row:"));
        assert!(output.contains("Competitor Pricing"));
    }

    #[test]
    fn test_end_of_input_mid_form() {
        let p = predictor();
        let (summary, _) = run_session("Toys\nNorth\n", Ok(&p));
        assert_eq!(summary, SessionSummary::default());
    }

    #[test]
    fn test_field_parsers() {
        assert_eq!(parse_count("Units ordered", " 42 ").unwrap(), 42);
        assert!(parse_count("Units ordered", "4.5").is_err());
        assert_eq!(parse_amount("Price", "19.99").unwrap(), 19.99);
        assert!(parse_amount("Price", "-0.01").is_err());
        assert!(parse_amount("Price", "inf").is_err());
        assert_eq!(parse_discount("20").unwrap(), 20);
        assert!(parse_discount("21").is_err());
        assert!(parse_discount("-1").is_err());
    }
}
