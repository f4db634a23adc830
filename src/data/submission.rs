// ============================================================
// Layer 4 — Submission Template
// ============================================================
// The sample submission CSV fixes the output schema:
//
//   id,label_a,label_b,...
//   00001,0.5,0.5,...
//
// The first column identifies the row and is copied through
// untouched; every other column is overwritten with the averaged
// prediction for that class. Column order is kept as-is, so the
// label columns are matched to the trained classes by name, not
// by position.

use anyhow::{Context, Result};
use std::path::Path;

use crate::domain::error::DataError;

#[derive(Debug, Clone)]
pub struct SubmissionTemplate {
    headers: Vec<String>,
    ids:     Vec<String>,
}

impl SubmissionTemplate {
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .with_context(|| format!("Cannot open submission template '{}'", path.display()))?;

        let headers: Vec<String> = reader
            .headers()
            .with_context(|| format!("Cannot read header of '{}'", path.display()))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut ids = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record
                .with_context(|| format!("Malformed row {} in '{}'", row + 1, path.display()))?;
            ids.push(record.get(0).unwrap_or_default().to_string());
        }

        tracing::debug!(
            "Submission template '{}': {} rows, {} label columns",
            path.display(),
            ids.len(),
            headers.len().saturating_sub(1)
        );

        Ok(Self { headers, ids })
    }

    pub fn row_count(&self) -> usize {
        self.ids.len()
    }

    pub fn label_columns(&self) -> &[String] {
        self.headers.get(1..).unwrap_or_default()
    }

    /// For each template label column, the index of the trained class
    /// with the same name.
    pub fn column_order(&self, trained: &[String]) -> Result<Vec<usize>, DataError> {
        let columns = self.label_columns();
        if columns.len() != trained.len() {
            return Err(DataError::ClassCountMismatch {
                template: columns.len(),
                classes:  trained.len(),
            });
        }

        columns
            .iter()
            .map(|column| {
                trained
                    .iter()
                    .position(|label| label == column)
                    .ok_or_else(|| DataError::UnknownLabelColumn { column: column.clone() })
            })
            .collect()
    }

    /// Rearrange rows of trained-class predictions into template column
    /// order, as computed by `column_order`.
    pub fn arrange(predictions: Vec<Vec<f32>>, order: &[usize]) -> Vec<Vec<f32>> {
        predictions
            .into_iter()
            .map(|row| order.iter().map(|&class| row[class]).collect())
            .collect()
    }

    /// Write `predictions` (one row per template row, one value per
    /// label column) into a copy of the template at `output`.
    pub fn write(&self, predictions: &[Vec<f32>], output: &Path) -> Result<()> {
        if predictions.len() != self.row_count() {
            return Err(DataError::RowCountMismatch {
                template: self.row_count(),
                test:     predictions.len(),
            }
            .into());
        }

        let classes = self.label_columns().len();
        if let Some(bad) = predictions.iter().find(|p| p.len() != classes) {
            return Err(DataError::ClassCountMismatch {
                template: classes,
                classes:  bad.len(),
            }
            .into());
        }

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create '{}'", parent.display()))?;
        }

        let mut writer = csv::Writer::from_path(output)
            .with_context(|| format!("Cannot create '{}'", output.display()))?;
        writer.write_record(&self.headers)?;

        for (id, row) in self.ids.iter().zip(predictions) {
            let mut record = Vec::with_capacity(row.len() + 1);
            record.push(id.clone());
            record.extend(row.iter().map(|p| p.to_string()));
            writer.write_record(&record)?;
        }
        writer.flush()?;

        tracing::info!("Wrote {} predictions to '{}'", predictions.len(), output.display());
        Ok(())
    }
}
