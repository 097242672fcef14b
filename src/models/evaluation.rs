//! Evaluation history model
//!
//! Typed views of `evaluation_history` documents and of the company and
//! question lookups used to label aggregates.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::spatial::services::{Language, resolve_bilingual};
use crate::store::{Document, value_as_i64, value_as_string};

/// Fields a detail's question id may be stored under, in priority order.
const QUESTION_ID_FIELDS: [&str; 3] = ["question_id", "questionId", "id"];
/// Fields a detail's score may be stored under, in priority order.
const SCORE_FIELDS: [&str; 4] = ["answer", "score", "rating", "value"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum EvaluationStatus {
    #[serde(rename = "Needs Revision")]
    NeedsRevision,
    #[serde(rename = "Awaiting Approval")]
    AwaitingApproval,
    Approved,
    Rejected,
}

impl EvaluationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EvaluationStatus::NeedsRevision => "Needs Revision",
            EvaluationStatus::AwaitingApproval => "Awaiting Approval",
            EvaluationStatus::Approved => "Approved",
            EvaluationStatus::Rejected => "Rejected",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        [
            EvaluationStatus::NeedsRevision,
            EvaluationStatus::AwaitingApproval,
            EvaluationStatus::Approved,
            EvaluationStatus::Rejected,
        ]
        .into_iter()
        .find(|status| status.as_str() == value)
    }
}

impl fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric view of a score value; numeric strings are coerced.
fn coerce_score(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|score| score.is_finite())
}

/// One per-question entry of an evaluation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EvaluationDetail {
    raw: Map<String, Value>,
}

impl EvaluationDetail {
    pub fn new(raw: Map<String, Value>) -> Self {
        Self { raw }
    }

    fn first_present(&self, fields: &[&str]) -> Option<&Value> {
        fields
            .iter()
            .find_map(|field| self.raw.get(*field).filter(|value| !value.is_null()))
    }

    pub fn question_id(&self) -> Option<String> {
        QUESTION_ID_FIELDS
            .iter()
            .find_map(|field| self.raw.get(*field).and_then(value_as_string))
    }

    /// Score of the first populated score field. A non-numeric value there
    /// makes the detail unscorable; later fields are not consulted.
    pub fn score(&self) -> Option<f64> {
        self.first_present(&SCORE_FIELDS).and_then(coerce_score)
    }
}

/// Typed view of an `evaluation_history` document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EvaluationHistoryDoc {
    pub id: String,
    pub evaluation_id: Option<String>,
    pub company_id: Option<String>,
    pub evaluation_year: Option<i32>,
    pub evaluation_month: Option<u32>,
    pub overall_score: Option<f64>,
    pub status: Option<EvaluationStatus>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub details: Vec<EvaluationDetail>,
}

impl EvaluationHistoryDoc {
    pub fn from_document(doc: &Document) -> Self {
        let details = match doc.get("details") {
            Some(Value::Array(entries)) => entries
                .iter()
                .filter_map(|entry| entry.as_object().cloned().map(EvaluationDetail::new))
                .collect(),
            _ => Vec::new(),
        };

        let int_field = |field: &str| doc.get(field).and_then(value_as_i64);

        Self {
            id: doc.id.clone(),
            evaluation_id: doc
                .string_field("evaluation_id")
                .or_else(|| doc.string_field("evaluationId")),
            company_id: doc.string_field("company_id"),
            evaluation_year: int_field("evaluation_year").and_then(|y| i32::try_from(y).ok()),
            evaluation_month: int_field("evaluation_month")
                .and_then(|m| u32::try_from(m).ok())
                .filter(|m| (1..=12).contains(m)),
            overall_score: doc.get("overall_score").and_then(coerce_score),
            status: doc
                .get("status")
                .and_then(Value::as_str)
                .and_then(EvaluationStatus::parse),
            created_at: doc.string_field("created_at"),
            updated_at: doc.string_field("updated_at"),
            details,
        }
    }

    /// Evaluation this history entry belongs to; the entry itself when the
    /// reference is missing.
    pub fn parent_evaluation_id(&self) -> &str {
        self.evaluation_id.as_deref().unwrap_or(&self.id)
    }
}

/// Bilingual label of a company or question.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LookupEntry {
    pub id: String,
    pub name_ar: Option<String>,
    pub name_en: Option<String>,
}

impl LookupEntry {
    pub fn from_company(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            name_ar: doc.string_field("name_ar"),
            name_en: doc.string_field("name_en"),
        }
    }

    /// Questions carry their label as a name or as question text.
    pub fn from_question(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            name_ar: doc
                .string_field("name_ar")
                .or_else(|| doc.string_field("text_ar")),
            name_en: doc
                .string_field("name_en")
                .or_else(|| doc.string_field("text_en")),
        }
    }

    pub fn name(&self, language: Language) -> Option<&str> {
        resolve_bilingual(language, self.name_ar.as_deref(), self.name_en.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detail(value: Value) -> EvaluationDetail {
        EvaluationDetail::new(value.as_object().cloned().unwrap())
    }

    #[test]
    fn score_resolves_first_populated_field() {
        assert_eq!(detail(json!({"answer": 4})).score(), Some(4.0));
        assert_eq!(detail(json!({"answer": null, "rating": "3.5"})).score(), Some(3.5));
        assert_eq!(detail(json!({"value": 0})).score(), Some(0.0));
        assert_eq!(detail(json!({})).score(), None);
    }

    #[test]
    fn non_numeric_first_score_makes_detail_unscorable() {
        assert_eq!(detail(json!({"answer": "abc"})).score(), None);
        assert_eq!(detail(json!({"answer": "abc", "score": 5})).score(), None);
        assert_eq!(detail(json!({"answer": true})).score(), None);
    }

    #[test]
    fn question_id_falls_back_through_aliases() {
        assert_eq!(detail(json!({"questionId": "q2", "id": "x"})).question_id().as_deref(), Some("q2"));
        assert_eq!(detail(json!({"id": 7})).question_id().as_deref(), Some("7"));
        assert_eq!(detail(json!({"answer": 1})).question_id(), None);
    }

    #[test]
    fn history_doc_parses_fields_leniently() {
        let doc = Document::new(
            "h1",
            json!({
                "evaluationId": "e1",
                "company_id": "c1",
                "evaluation_year": "2024",
                "evaluation_month": 13,
                "status": "Needs Revision",
                "details": [{"question_id": "q1", "answer": 5}, "junk"]
            })
            .as_object()
            .cloned()
            .unwrap(),
        );
        let history = EvaluationHistoryDoc::from_document(&doc);
        assert_eq!(history.parent_evaluation_id(), "e1");
        assert_eq!(history.evaluation_year, Some(2024));
        assert_eq!(history.evaluation_month, None);
        assert_eq!(history.status, Some(EvaluationStatus::NeedsRevision));
        assert_eq!(history.details.len(), 1);
    }

    #[test]
    fn question_lookup_uses_text_when_names_absent() {
        let doc = Document::new(
            "q1",
            json!({"text_ar": "هل البوابة مغلقة؟", "name_en": "Gate locked"})
                .as_object()
                .cloned()
                .unwrap(),
        );
        let entry = LookupEntry::from_question(&doc);
        assert_eq!(entry.name(Language::Ar), Some("هل البوابة مغلقة؟"));
        assert_eq!(entry.name(Language::En), Some("Gate locked"));
    }
}
