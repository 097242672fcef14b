//! # Evaluation Report Handlers

use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::{Datelike, Utc};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use utoipa::{IntoParams, ToSchema};

use crate::error::{ApiError, validation_error};
use crate::evaluation::filter::{MAX_SPAN_MONTHS, MAX_YEAR, MIN_YEAR};
use crate::evaluation::{
    AggregationAxis, AggregationFilters, DateFilter, EvaluationReport, ReportRequest,
    ReportService,
};
use crate::server::AppState;
use crate::spatial::services::Language;

const MAX_TOP_N: usize = 100;

/// Query parameters for an evaluation report
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ReportQuery {
    /// `by_company` (default) or `by_question`
    pub axis: Option<String>,
    /// `monthly` (default) or `range`
    pub mode: Option<String>,
    /// Year of a monthly report (defaults to the current year)
    pub year: Option<i32>,
    /// Month of a monthly report, 1-12 (defaults to the current month)
    pub month: Option<u32>,
    pub start_year: Option<i32>,
    pub start_month: Option<u32>,
    pub end_year: Option<i32>,
    pub end_month: Option<u32>,
    /// Comma-separated company ids; empty keeps every company
    pub company_ids: Option<String>,
    /// Comma-separated question ids; empty keeps every question
    pub question_ids: Option<String>,
    /// `ar` or `en` (defaults to the configured language)
    pub lang: Option<String>,
    /// Chart size, 1-100
    pub top_n: Option<usize>,
}

fn split_ids(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

fn check_month(errors: &mut Map<String, Value>, field: &str, month: Option<u32>) -> u32 {
    match month {
        Some(month) if (1..=12).contains(&month) => month,
        Some(_) => {
            errors.insert(field.to_string(), json!("must be between 1 and 12"));
            0
        }
        None => {
            errors.insert(field.to_string(), json!("is required"));
            0
        }
    }
}

fn check_year(errors: &mut Map<String, Value>, field: &str, year: Option<i32>) -> i32 {
    match year {
        Some(year) if (MIN_YEAR..=MAX_YEAR).contains(&year) => year,
        Some(_) => {
            errors.insert(
                field.to_string(),
                json!(format!("must be between {MIN_YEAR} and {MAX_YEAR}")),
            );
            0
        }
        None => {
            errors.insert(field.to_string(), json!("is required"));
            0
        }
    }
}

impl ReportQuery {
    /// Validates every parameter, reporting all problems at once.
    fn into_request(self, default_language: Language) -> Result<ReportRequest, ApiError> {
        let mut errors = Map::new();

        let axis = match self.axis.as_deref() {
            None | Some("by_company") => AggregationAxis::ByCompany,
            Some("by_question") => AggregationAxis::ByQuestion,
            Some(_) => {
                errors.insert("axis".into(), json!("must be by_company or by_question"));
                AggregationAxis::default()
            }
        };

        let language = match self.lang.as_deref().map(str::parse::<Language>) {
            None => default_language,
            Some(Ok(language)) => language,
            Some(Err(_)) => {
                errors.insert("lang".into(), json!("must be ar or en"));
                default_language
            }
        };

        let filter = match self.mode.as_deref() {
            None | Some("monthly") => {
                let today = Utc::now();
                let year = check_year(&mut errors, "year", self.year.or(Some(today.year())));
                let month = check_month(&mut errors, "month", self.month.or(Some(today.month())));
                DateFilter::Monthly { year, month }
            }
            Some("range") => {
                let filter = DateFilter::Range {
                    start_year: check_year(&mut errors, "start_year", self.start_year),
                    start_month: check_month(&mut errors, "start_month", self.start_month),
                    end_year: check_year(&mut errors, "end_year", self.end_year),
                    end_month: check_month(&mut errors, "end_month", self.end_month),
                };
                if errors.is_empty() && filter.span_months() > MAX_SPAN_MONTHS {
                    errors.insert(
                        "range".into(),
                        json!(format!("must span at most {MAX_SPAN_MONTHS} months")),
                    );
                }
                filter
            }
            Some(_) => {
                errors.insert("mode".into(), json!("must be monthly or range"));
                DateFilter::Monthly { year: 0, month: 0 }
            }
        };

        if let Some(top_n) = self.top_n
            && !(1..=MAX_TOP_N).contains(&top_n)
        {
            errors.insert("top_n".into(), json!(format!("must be between 1 and {MAX_TOP_N}")));
        }

        if !errors.is_empty() {
            return Err(validation_error("Invalid report query", Value::Object(errors)));
        }

        Ok(ReportRequest {
            filter,
            axis,
            filters: AggregationFilters::new(
                split_ids(self.company_ids.as_deref()),
                split_ids(self.question_ids.as_deref()),
            ),
            language,
            top_n: self.top_n,
        })
    }
}

/// Aggregated evaluation scores for a month window
#[utoipa::path(
    get,
    path = "/api/v1/reports/evaluations",
    params(ReportQuery),
    responses(
        (status = 200, description = "Evaluation report", body = EvaluationReport, example = json!({
            "axis": "by_company",
            "language": "en",
            "filter": { "mode": "monthly", "year": 2024, "month": 3 },
            "record_count": 2,
            "aggregates": [
                { "id": "c1", "name": "Warden", "average_score": 3.0, "answer_count": 1, "evaluation_count": 1 }
            ],
            "overall_average": 3.0,
            "chart": [
                { "id": "c1", "name": "Warden", "average_score": 3.0, "answer_count": 1, "evaluation_count": 1 }
            ],
            "trend": [
                { "id": "c1", "label": "Warden", "points": [ { "month_key": 202403, "average": 3.0, "answer_count": 1 } ] }
            ]
        })),
        (status = 400, description = "Invalid query parameters", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn evaluation_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<EvaluationReport>, ApiError> {
    let request = query.into_request(state.config.default_language)?;
    let service = ReportService::new(state.store.clone(), state.config.report.clone());
    let report = service.build(&request).await?;
    Ok(Json(report))
}
