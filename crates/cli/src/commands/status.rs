//! Service status command

use anyhow::Result;
use churn_lib::ReadinessResponse;
use colored::Colorize;
use serde::Serialize;

use crate::client::{ApiClient, ModelInfo};
use crate::output::{color_status, print_json, print_warning, OutputFormat};

#[derive(Serialize)]
struct StatusReport {
    api_url: String,
    readiness: ReadinessResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<ModelInfo>,
}

/// Show readiness and, when loaded, the model description
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let readiness = client.readiness().await?;
    let model = if readiness.ready {
        Some(client.get::<ModelInfo>("model").await?)
    } else {
        None
    };

    let report = StatusReport {
        api_url: client.base_url().to_string(),
        readiness,
        model,
    };

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            println!("{}", "Service Status".bold());
            println!("{}", "=".repeat(50));
            println!("API:           {}", report.api_url.cyan());

            let state = if report.readiness.ready {
                "ready"
            } else {
                "not ready"
            };
            println!("Status:        {}", color_status(state));

            if let Some(reason) = &report.readiness.reason {
                print_warning(reason);
            }

            if let Some(model) = &report.model {
                println!();
                println!("{}", "Model".bold());
                println!("{}", "-".repeat(50));
                println!("Kind:          {}", model.kind);
                println!("Version:       {}", model.version);
                println!("Classes:       {}", model.classes.join(", "));
                println!("Features:      {}", model.n_features);
                println!(
                    "Importances:   {}",
                    if model.has_importances { "yes" } else { "no" }
                );
            }
        }
    }

    Ok(())
}
