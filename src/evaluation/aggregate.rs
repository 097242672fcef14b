//! Grouped averages and monthly trend series over evaluation details.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::evaluation::filter::month_key;
use crate::models::evaluation::{EvaluationHistoryDoc, LookupEntry};
use crate::spatial::services::Language;

/// Dimension detail scores are grouped by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AggregationAxis {
    #[default]
    ByCompany,
    ByQuestion,
}

impl AggregationAxis {
    pub fn as_str(self) -> &'static str {
        match self {
            AggregationAxis::ByCompany => "by_company",
            AggregationAxis::ByQuestion => "by_question",
        }
    }
}

/// Optional allow-lists; an empty list allows everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationFilters {
    pub companies: HashSet<String>,
    pub questions: HashSet<String>,
}

impl AggregationFilters {
    pub fn new<C, Q>(companies: C, questions: Q) -> Self
    where
        C: IntoIterator<Item = String>,
        Q: IntoIterator<Item = String>,
    {
        Self {
            companies: companies.into_iter().collect(),
            questions: questions.into_iter().collect(),
        }
    }

    fn allows_company(&self, company_id: Option<&str>) -> bool {
        self.companies.is_empty() || company_id.is_some_and(|id| self.companies.contains(id))
    }

    fn allows_question(&self, question_id: Option<&str>) -> bool {
        self.questions.is_empty() || question_id.is_some_and(|id| self.questions.contains(id))
    }
}

/// Average score of one company or question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AggregatedResult {
    pub id: String,
    pub name: String,
    pub average_score: f64,
    pub answer_count: u64,
    /// Distinct evaluations contributing; company aggregates only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_count: Option<u64>,
}

/// One month of a trend series; `average` is `None` when the month has no
/// scored answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TrendPoint {
    pub month_key: i64,
    pub average: Option<f64>,
    pub answer_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TrendSeries {
    pub id: String,
    pub label: String,
    pub points: Vec<TrendPoint>,
}

/// Display names for aggregate keys in the active language.
#[derive(Debug, Clone, Default)]
pub struct LabelResolver {
    companies: HashMap<String, LookupEntry>,
    questions: HashMap<String, LookupEntry>,
    language: Language,
    placeholder: String,
}

impl LabelResolver {
    pub fn new(
        companies: impl IntoIterator<Item = LookupEntry>,
        questions: impl IntoIterator<Item = LookupEntry>,
        language: Language,
        placeholder: impl Into<String>,
    ) -> Self {
        Self {
            companies: companies.into_iter().map(|e| (e.id.clone(), e)).collect(),
            questions: questions.into_iter().map(|e| (e.id.clone(), e)).collect(),
            language,
            placeholder: placeholder.into(),
        }
    }

    fn lookup(&self, axis: AggregationAxis, id: &str) -> Option<&str> {
        let entries = match axis {
            AggregationAxis::ByCompany => &self.companies,
            AggregationAxis::ByQuestion => &self.questions,
        };
        entries.get(id).and_then(|entry| entry.name(self.language))
    }

    /// Name for a table row; the placeholder when unresolved.
    pub fn aggregate_name(&self, axis: AggregationAxis, id: &str) -> String {
        self.lookup(axis, id)
            .unwrap_or(&self.placeholder)
            .to_string()
    }

    /// Name for a trend series; the raw id when unresolved.
    pub fn series_label(&self, axis: AggregationAxis, id: &str) -> String {
        self.lookup(axis, id).unwrap_or(id).to_string()
    }
}

/// A detail score that passed every filter.
struct ScoredAnswer<'a> {
    key: String,
    record: &'a EvaluationHistoryDoc,
    score: f64,
}

/// Scores surviving the allow-lists, keyed by the axis entity.
fn scored_answers<'a>(
    working_set: &'a [EvaluationHistoryDoc],
    axis: AggregationAxis,
    filters: &'a AggregationFilters,
) -> impl Iterator<Item = ScoredAnswer<'a>> + 'a {
    working_set
        .iter()
        .filter(move |record| filters.allows_company(record.company_id.as_deref()))
        .flat_map(move |record| {
            record.details.iter().filter_map(move |detail| {
                let question_id = detail.question_id();
                if !filters.allows_question(question_id.as_deref()) {
                    return None;
                }
                let score = detail.score()?;
                let key = match axis {
                    AggregationAxis::ByCompany => record.company_id.clone()?,
                    AggregationAxis::ByQuestion => question_id?,
                };
                Some(ScoredAnswer { key, record, score })
            })
        })
}

#[derive(Debug, Default)]
struct Accumulator<'a> {
    total: f64,
    count: u64,
    evaluations: HashSet<&'a str>,
}

impl Accumulator<'_> {
    fn average(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total / self.count as f64)
    }
}

/// Average detail score per company or per question, in first-seen order.
pub fn aggregate(
    working_set: &[EvaluationHistoryDoc],
    axis: AggregationAxis,
    filters: &AggregationFilters,
    labels: &LabelResolver,
) -> Vec<AggregatedResult> {
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Accumulator<'_>> = HashMap::new();

    for answer in scored_answers(working_set, axis, filters) {
        let bucket = buckets.entry(answer.key.clone()).or_insert_with(|| {
            order.push(answer.key.clone());
            Accumulator::default()
        });
        bucket.total += answer.score;
        bucket.count += 1;
        bucket
            .evaluations
            .insert(answer.record.parent_evaluation_id());
    }

    order
        .into_iter()
        .filter_map(|id| {
            let bucket = buckets.remove(&id)?;
            Some(AggregatedResult {
                name: labels.aggregate_name(axis, &id),
                average_score: bucket.average()?,
                answer_count: bucket.count,
                evaluation_count: (axis == AggregationAxis::ByCompany)
                    .then_some(bucket.evaluations.len() as u64),
                id,
            })
        })
        .collect()
}

/// Answer-weighted mean of company averages; `0.0` when nothing was
/// answered.
pub fn overall_average(company_aggregates: &[AggregatedResult]) -> f64 {
    let (weighted, count) = company_aggregates
        .iter()
        .fold((0.0, 0u64), |(weighted, count), result| {
            (
                weighted + result.average_score * result.answer_count as f64,
                count + result.answer_count,
            )
        });
    if count == 0 {
        0.0
    } else {
        weighted / count as f64
    }
}

/// Per-entity monthly averages over `month_keys`. No keys, no series.
pub fn monthly_trend(
    working_set: &[EvaluationHistoryDoc],
    axis: AggregationAxis,
    month_keys: &[i64],
    filters: &AggregationFilters,
    labels: &LabelResolver,
) -> Vec<TrendSeries> {
    if month_keys.is_empty() {
        return Vec::new();
    }
    let wanted: HashSet<i64> = month_keys.iter().copied().collect();

    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<(String, i64), Accumulator<'_>> = HashMap::new();

    for answer in scored_answers(working_set, axis, filters) {
        let (Some(year), Some(month)) = (
            answer.record.evaluation_year,
            answer.record.evaluation_month,
        ) else {
            continue;
        };
        let key = month_key(year, month);
        if !wanted.contains(&key) {
            continue;
        }

        if !order.contains(&answer.key) {
            order.push(answer.key.clone());
        }
        let bucket = buckets.entry((answer.key, key)).or_default();
        bucket.total += answer.score;
        bucket.count += 1;
    }

    order
        .into_iter()
        .map(|id| {
            let points = month_keys
                .iter()
                .map(|&month| {
                    let bucket = buckets.get(&(id.clone(), month));
                    TrendPoint {
                        month_key: month,
                        average: bucket.and_then(Accumulator::average),
                        answer_count: bucket.map_or(0, |b| b.count),
                    }
                })
                .collect();
            TrendSeries {
                label: labels.series_label(axis, &id),
                id,
                points,
            }
        })
        .collect()
}

/// Lowest averages first, at most `top_n` entries.
pub fn chart_ranking(results: &[AggregatedResult], top_n: usize) -> Vec<AggregatedResult> {
    let mut ranked = results.to_vec();
    ranked.sort_by(|a, b| a.average_score.total_cmp(&b.average_score));
    ranked.truncate(top_n);
    ranked
}
