//! Churn prediction command

use anyhow::{bail, Context, Result};
use churn_lib::{
    load_artifacts, ArtifactPaths, ClientRecord, PipelineConfig, PredictOptions,
    PredictionResult, PredictionService, ServingState,
};
use clap::{builder::BoolishValueParser, ArgAction, Args};
use colored::Colorize;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::config::Config;
use crate::output::{
    color_confidence, color_verdict, format_timestamp, print_json, print_success, print_warning,
    OutputFormat,
};

/// Allowed gap between the entered and the expected total charges
const CHARGES_TOLERANCE: f64 = 1.0;

/// Customer attributes, as collected by the retention team's intake form
#[derive(Args, Debug, Clone)]
pub struct CustomerForm {
    #[arg(long, default_value = "Male")]
    pub gender: String,

    /// 65 years or older
    #[arg(long, default_value = "no", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub senior: bool,

    #[arg(long, default_value = "no", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub partner: bool,

    #[arg(long, default_value = "no", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub dependents: bool,

    /// Months with the company
    #[arg(long, default_value_t = 12)]
    pub tenure: u32,

    #[arg(long, default_value = "yes", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub phone_service: bool,

    #[arg(long, default_value = "no", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub multiple_lines: bool,

    /// DSL, Fiber optic or No
    #[arg(long, default_value = "DSL")]
    pub internet_service: String,

    #[arg(long, default_value = "no", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub online_security: bool,

    #[arg(long, default_value = "no", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub online_backup: bool,

    #[arg(long, default_value = "no", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub device_protection: bool,

    #[arg(long, default_value = "no", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub tech_support: bool,

    #[arg(long, default_value = "no", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub streaming_tv: bool,

    #[arg(long, default_value = "no", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub streaming_movies: bool,

    /// Month-to-month, One year or Two year
    #[arg(long, default_value = "Month-to-month")]
    pub contract: String,

    #[arg(long, default_value = "no", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub paperless: bool,

    #[arg(long, default_value = "Electronic check")]
    pub payment_method: String,

    #[arg(long, default_value_t = 65.5)]
    pub monthly_charges: f64,

    /// Defaults to tenure x monthly charges
    #[arg(long)]
    pub total_charges: Option<f64>,
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

impl CustomerForm {
    /// Total implied by tenure and monthly charges, rounded to cents
    pub fn expected_total(&self) -> f64 {
        (self.tenure as f64 * self.monthly_charges * 100.0).round() / 100.0
    }

    pub fn total_charges(&self) -> f64 {
        self.total_charges.unwrap_or_else(|| self.expected_total())
    }

    /// Warning text when the entered total disagrees with tenure x monthly
    pub fn charges_warning(&self) -> Option<String> {
        let expected = self.expected_total();
        let total = self.total_charges();
        if self.tenure > 0 && (total - expected).abs() > CHARGES_TOLERANCE {
            Some(format!(
                "Total charges ${:.2} differ from the expected ${:.2} ({} months at ${:.2}); \
                 the prediction may be less accurate",
                total, expected, self.tenure, self.monthly_charges
            ))
        } else {
            None
        }
    }

    /// Record keyed by the training dataset's column names
    pub fn to_record(&self) -> Value {
        json!({
            "gender": self.gender,
            "SeniorCitizen": if self.senior { 1 } else { 0 },
            "Partner": yes_no(self.partner),
            "Dependents": yes_no(self.dependents),
            "tenure": self.tenure,
            "PhoneService": yes_no(self.phone_service),
            "MultipleLines": yes_no(self.multiple_lines),
            "InternetService": self.internet_service,
            "OnlineSecurity": yes_no(self.online_security),
            "OnlineBackup": yes_no(self.online_backup),
            "DeviceProtection": yes_no(self.device_protection),
            "TechSupport": yes_no(self.tech_support),
            "StreamingTV": yes_no(self.streaming_tv),
            "StreamingMovies": yes_no(self.streaming_movies),
            "Contract": self.contract,
            "PaperlessBilling": yes_no(self.paperless),
            "PaymentMethod": self.payment_method,
            "MonthlyCharges": self.monthly_charges,
            "TotalCharges": self.total_charges(),
        })
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// JSON file holding the client record; form flags are ignored when set
    #[arg(long, short)]
    pub file: Option<PathBuf>,

    #[command(flatten)]
    pub form: CustomerForm,

    /// Number of feature importances to show
    #[arg(long)]
    pub top_n: Option<usize>,

    /// Skip feature importances
    #[arg(long)]
    pub no_explain: bool,

    /// Model file used when the API cannot be reached
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Training schema used when the API cannot be reached
    #[arg(long)]
    pub schema: Option<PathBuf>,
}

/// Where a prediction was computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Api,
    Local,
}

#[derive(Serialize)]
struct PredictionOutput<'a> {
    source: Source,
    #[serde(flatten)]
    result: &'a PredictionResult,
}

/// Row for the feature importance table
#[derive(Tabled)]
struct ImportanceRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Feature")]
    feature: String,
    #[tabled(rename = "Weight")]
    weight: String,
}

fn read_record(args: &PredictArgs) -> Result<Value> {
    match &args.file {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {} as JSON", path.display()))
        }
        None => {
            if let Some(warning) = args.form.charges_warning() {
                print_warning(&warning);
            }
            Ok(args.form.to_record())
        }
    }
}

/// Run the pipeline in-process against artifacts on disk
pub fn predict_locally(
    record: &Value,
    paths: ArtifactPaths,
    pipeline: PipelineConfig,
    options: &PredictOptions,
) -> Result<PredictionResult> {
    let artifacts = load_artifacts(&paths).context("Failed to load local model artifacts")?;
    let service = PredictionService::new(ServingState::Loaded(Arc::new(artifacts)), pipeline);
    let record = ClientRecord::from_json(record)?;
    Ok(service.predict(&record, options)?)
}

/// Predict churn for one client
pub async fn predict(
    client: &ApiClient,
    config: &Config,
    args: PredictArgs,
    format: OutputFormat,
) -> Result<()> {
    let record = read_record(&args)?;
    let explain = !args.no_explain;

    let (result, source) = match client.predict(&record, args.top_n, explain).await {
        Ok(result) => (result, Source::Api),
        Err(err) if err.is_unreachable() => {
            let model = args.model.clone().or_else(|| config.model_path.clone());
            let schema = args.schema.clone().or_else(|| config.schema_path.clone());
            let (Some(model), Some(schema)) = (model, schema) else {
                return Err(err).context("Pass --model and --schema to predict without the API");
            };

            print_warning("The API is unavailable, falling back to the local model");
            let options = PredictOptions {
                top_n: args.top_n,
                explain,
                ..PredictOptions::default()
            };
            let paths = ArtifactPaths {
                model,
                schema,
                model_sha256: None,
            };
            let pipeline = config.pipeline_config();
            (predict_locally(&record, paths, pipeline, &options)?, Source::Local)
        }
        Err(err) => bail!(err),
    };

    match format {
        OutputFormat::Json => print_json(&PredictionOutput {
            source,
            result: &result,
        })?,
        OutputFormat::Table => print_prediction(&result, source),
    }

    Ok(())
}

fn print_prediction(result: &PredictionResult, source: Source) {
    let via = match source {
        Source::Api => "API",
        Source::Local => "LOCAL",
    };
    print_success(&format!("Prediction succeeded via {}", via));
    println!();

    println!("{}", "Churn Prediction".bold());
    println!("{}", "=".repeat(50));
    println!("{}", color_verdict(&result.message, result.churn));
    println!("Label:         {}", result.label);
    if let Some(percent) = result.confidence.value() {
        println!("Confidence:    {}", color_confidence(percent));
    }
    println!("Model:         {}", result.model_version);
    println!("Generated:     {}", format_timestamp(result.generated_at));

    if let Some(importances) = &result.importances {
        println!();
        println!("{}", "Key Factors".bold());
        let rows: Vec<ImportanceRow> = importances
            .iter()
            .enumerate()
            .map(|(i, item)| ImportanceRow {
                rank: i + 1,
                feature: item.feature.clone(),
                weight: format!("{:.4}", item.weight),
            })
            .collect();
        let table = tabled::Table::new(rows)
            .with(tabled::settings::Style::rounded())
            .to_string();
        println!("{}", table);
    }

    if !result.actions.is_empty() {
        println!();
        println!("{}", "Recommended Actions".bold());
        for action in &result.actions {
            println!("  • {}", action);
        }
    }
}
