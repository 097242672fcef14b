//! # Evaluation Reports
//!
//! Loads approved evaluation history for a month window and runs the
//! aggregation pipeline over it: grouped averages, the weighted overall
//! average, the chart ranking and the monthly trend.

use std::sync::Arc;

use metrics::counter;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::ReportConfig;
use crate::evaluation::aggregate::{
    AggregatedResult, AggregationAxis, AggregationFilters, LabelResolver, TrendSeries, aggregate,
    chart_ranking, monthly_trend, overall_average,
};
use crate::evaluation::filter::{DateFilter, month_filter, month_keys, year_bounds};
use crate::models::evaluation::{EvaluationHistoryDoc, EvaluationStatus, LookupEntry};
use crate::spatial::services::Language;
use crate::store::{DocumentStore, FieldFilter, StoreError, collections};

/// What a report covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub filter: DateFilter,
    pub axis: AggregationAxis,
    pub filters: AggregationFilters,
    pub language: Language,
    /// Chart size; the configured default when absent
    pub top_n: Option<usize>,
}

/// Aggregated view of evaluation history for one month window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EvaluationReport {
    pub axis: AggregationAxis,
    pub language: Language,
    pub filter: DateFilter,
    /// History entries inside the window
    pub record_count: usize,
    pub aggregates: Vec<AggregatedResult>,
    /// Answer-weighted average over companies
    pub overall_average: f64,
    /// Lowest averages first
    pub chart: Vec<AggregatedResult>,
    /// Absent when the window spans no months
    pub trend: Option<Vec<TrendSeries>>,
}

pub struct ReportService {
    store: Arc<dyn DocumentStore>,
    config: ReportConfig,
}

impl ReportService {
    pub fn new(store: Arc<dyn DocumentStore>, config: ReportConfig) -> Self {
        Self { store, config }
    }

    /// Approved history within the filter's years, narrowed to its months.
    async fn load_history(
        &self,
        filter: &DateFilter,
    ) -> Result<Vec<EvaluationHistoryDoc>, StoreError> {
        let (min_year, max_year) = year_bounds(filter);
        let docs = self
            .store
            .query(
                collections::EVALUATION_HISTORY,
                &[
                    FieldFilter::eq("status", EvaluationStatus::Approved.as_str()),
                    FieldFilter::between(
                        "evaluation_year",
                        i64::from(min_year),
                        i64::from(max_year),
                    ),
                ],
            )
            .await?;

        let records = docs.iter().map(EvaluationHistoryDoc::from_document).collect();
        Ok(month_filter(records, filter))
    }

    async fn load_labels(&self, language: Language) -> Result<LabelResolver, StoreError> {
        let companies = self.store.query(collections::COMPANIES, &[]).await?;
        let questions = self
            .store
            .query(collections::SECURITY_QUESTIONS, &[])
            .await?;

        Ok(LabelResolver::new(
            companies.iter().map(LookupEntry::from_company),
            questions.iter().map(LookupEntry::from_question),
            language,
            self.config.placeholder_label.clone(),
        ))
    }

    pub async fn build(&self, request: &ReportRequest) -> Result<EvaluationReport, StoreError> {
        let records = self.load_history(&request.filter).await?;
        let labels = self.load_labels(request.language).await?;

        let aggregates = aggregate(&records, request.axis, &request.filters, &labels);
        let overall = match request.axis {
            AggregationAxis::ByCompany => overall_average(&aggregates),
            AggregationAxis::ByQuestion => overall_average(&aggregate(
                &records,
                AggregationAxis::ByCompany,
                &request.filters,
                &labels,
            )),
        };

        let top_n = request.top_n.unwrap_or(self.config.chart_top_n);
        let chart = chart_ranking(&aggregates, top_n);

        let keys = month_keys(&request.filter);
        let trend = if keys.is_empty() {
            tracing::debug!(
                filter = %request.filter.describe(),
                "Month window is empty; trend suppressed"
            );
            None
        } else {
            Some(monthly_trend(
                &records,
                request.axis,
                &keys,
                &request.filters,
                &labels,
            ))
        };

        counter!("evaluation_reports_total", "axis" => request.axis.as_str()).increment(1);
        tracing::info!(
            axis = request.axis.as_str(),
            filter = %request.filter.describe(),
            records = records.len(),
            entities = aggregates.len(),
            "Built evaluation report"
        );

        Ok(EvaluationReport {
            axis: request.axis,
            language: request.language,
            filter: request.filter,
            record_count: records.len(),
            aggregates,
            overall_average: overall,
            chart,
            trend,
        })
    }
}
