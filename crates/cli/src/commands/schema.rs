//! Training schema command

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, SchemaInfo};
use crate::output::{print_info, print_json, OutputFormat};

/// Row for the training columns table
#[derive(Tabled)]
struct ColumnRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Column")]
    column: String,
    #[tabled(rename = "Source Field")]
    source: String,
}

/// Field a column is derived from: the prefix of an indicator, else the column itself
fn source_field(column: &str, categorical: &[String]) -> String {
    categorical
        .iter()
        .filter(|field| {
            column.len() > field.len()
                && column.starts_with(field.as_str())
                && column.as_bytes()[field.len()] == b'_'
        })
        .max_by_key(|field| field.len())
        .cloned()
        .unwrap_or_else(|| column.to_string())
}

/// List the training columns served by the API
pub async fn show_schema(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let schema: SchemaInfo = client.get("schema").await?;

    match format {
        OutputFormat::Json => print_json(&schema)?,
        OutputFormat::Table => {
            let rows: Vec<ColumnRow> = schema
                .columns
                .iter()
                .enumerate()
                .map(|(index, column)| ColumnRow {
                    index,
                    column: column.clone(),
                    source: source_field(column, &schema.categorical_fields),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\nTotal: {} columns", schema.columns.len().to_string().bold());
            print_info(&format!(
                "Categorical fields: {}",
                schema.categorical_fields.join(", ")
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_field() {
        let categorical = vec!["Contract".to_string(), "StreamingTV".to_string()];
        assert_eq!(source_field("Contract_Two year", &categorical), "Contract");
        assert_eq!(source_field("StreamingTV_Yes", &categorical), "StreamingTV");
        assert_eq!(source_field("tenure", &categorical), "tenure");
        assert_eq!(source_field("Contract", &categorical), "Contract");
    }
}
