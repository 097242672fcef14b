//! # Report Export
//!
//! Turns an [`EvaluationReport`] into a printable document, waits for the
//! renderer to finish and performs exactly one terminal action with the
//! result. Rendering and delivery are external capabilities behind
//! [`ReportRenderer`] and [`ExportSink`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::evaluation::aggregate::{AggregatedResult, AggregationAxis, TrendSeries};
use crate::evaluation::report::EvaluationReport;
use crate::spatial::services::Language;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("report rendering failed: {0}")]
    Render(String),
    #[error("report delivery failed: {0}")]
    Sink(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportAction {
    /// Open in a new tab
    View,
    /// Save under a timestamped name
    Download,
    Print,
    /// Native share sheet
    Share,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    NotSupported,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Opened,
    Downloaded { filename: String },
    Printed,
    Shared,
    /// Sharing is unavailable on this device; nothing was sent
    ShareUnsupported,
}

/// One table row of the printed report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub name: String,
    pub average_score: f64,
    pub answer_count: u64,
    pub evaluation_count: Option<u64>,
}

/// Everything the printed report shows, in display order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDocument {
    pub title: String,
    pub filter_description: String,
    pub language: Language,
    pub generated_at: DateTime<Utc>,
    pub columns: Vec<String>,
    pub rows: Vec<ReportRow>,
    pub overall_average: f64,
    pub chart: Vec<AggregatedResult>,
    pub trend: Option<Vec<TrendSeries>>,
}

fn column_labels(axis: AggregationAxis, language: Language) -> Vec<String> {
    let labels: &[&str] = match (language, axis) {
        (Language::En, AggregationAxis::ByCompany) => {
            &["Company", "Average score", "Answers", "Evaluations"]
        }
        (Language::En, AggregationAxis::ByQuestion) => &["Question", "Average score", "Answers"],
        (Language::Ar, AggregationAxis::ByCompany) => {
            &["الشركة", "متوسط الدرجة", "الإجابات", "التقييمات"]
        }
        (Language::Ar, AggregationAxis::ByQuestion) => &["السؤال", "متوسط الدرجة", "الإجابات"],
    };
    labels.iter().map(|label| label.to_string()).collect()
}

impl ReportDocument {
    pub fn from_report(report: &EvaluationReport, generated_at: DateTime<Utc>) -> Self {
        let title = match report.language {
            Language::Ar => "تقرير التقييمات الأمنية",
            Language::En => "Security Evaluation Report",
        };

        Self {
            title: title.to_string(),
            filter_description: report.filter.describe(),
            language: report.language,
            generated_at,
            columns: column_labels(report.axis, report.language),
            rows: report
                .aggregates
                .iter()
                .map(|result| ReportRow {
                    name: result.name.clone(),
                    average_score: result.average_score,
                    answer_count: result.answer_count,
                    evaluation_count: result.evaluation_count,
                })
                .collect(),
            overall_average: report.overall_average,
            chart: report.chart.clone(),
            trend: report.trend.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Produces the PDF. The returned future completes once every chart is
/// drawn.
#[async_trait]
pub trait ReportRenderer: Send + Sync {
    async fn render(&self, document: &ReportDocument) -> Result<RenderedReport, ExportError>;
}

/// Delivers a rendered report to the user.
#[async_trait]
pub trait ExportSink: Send + Sync {
    async fn open(&self, report: &RenderedReport) -> Result<(), ExportError>;

    async fn save(&self, report: &RenderedReport, filename: &str) -> Result<(), ExportError>;

    async fn print(&self, report: &RenderedReport) -> Result<(), ExportError>;

    async fn share(
        &self,
        report: &RenderedReport,
        filename: &str,
    ) -> Result<ShareOutcome, ExportError>;
}

/// `evaluation-report-YYYYMMDD-HHMMSS.pdf` in UTC.
pub fn download_filename(at: DateTime<Utc>) -> String {
    format!("evaluation-report-{}.pdf", at.format("%Y%m%d-%H%M%S"))
}

pub struct ReportExporter {
    renderer: Arc<dyn ReportRenderer>,
    sink: Arc<dyn ExportSink>,
}

impl ReportExporter {
    pub fn new(renderer: Arc<dyn ReportRenderer>, sink: Arc<dyn ExportSink>) -> Self {
        Self { renderer, sink }
    }

    pub async fn export(
        &self,
        report: &EvaluationReport,
        action: ExportAction,
    ) -> Result<ExportOutcome, ExportError> {
        let now = Utc::now();
        let document = ReportDocument::from_report(report, now);
        let rendered = self.renderer.render(&document).await?;
        let filename = download_filename(now);

        let outcome = match action {
            ExportAction::View => {
                self.sink.open(&rendered).await?;
                ExportOutcome::Opened
            }
            ExportAction::Download => {
                self.sink.save(&rendered, &filename).await?;
                ExportOutcome::Downloaded { filename }
            }
            ExportAction::Print => {
                self.sink.print(&rendered).await?;
                ExportOutcome::Printed
            }
            ExportAction::Share => match self.sink.share(&rendered, &filename).await? {
                ShareOutcome::Shared => ExportOutcome::Shared,
                ShareOutcome::NotSupported => {
                    tracing::info!("Share is not supported here; report was not sent");
                    ExportOutcome::ShareUnsupported
                }
            },
        };

        tracing::info!(
            action = ?action,
            bytes = rendered.bytes.len(),
            rows = document.rows.len(),
            "Exported evaluation report"
        );
        Ok(outcome)
    }
}
