//! SQL translation of [`FieldFilter`] predicates over the JSON `data` column.
//!
//! Postgres stores bodies as `jsonb`, SQLite as JSON text. Predicates a
//! backend cannot express return `None` and are evaluated on the loaded rows.

use sea_orm::DbBackend;
use sea_orm::sea_query::{Expr, SimpleExpr};
use serde_json::Value;

use crate::store::FieldFilter;

type SqlValue = sea_orm::Value;

/// Integer literal with an optional sign, matching what `value_as_i64` parses.
const PG_INTEGER_TEXT: &str = r"^[+-]?[0-9]+$";
/// GLOB matching any text holding a non-digit.
const SQLITE_NON_DIGIT: &str = "*[^0-9]*";

/// SQL condition equivalent to `filter.matches(..)`, when the backend has one.
pub fn condition(backend: DbBackend, filter: &FieldFilter) -> Option<SimpleExpr> {
    match backend {
        DbBackend::Postgres => Some(postgres(filter)),
        DbBackend::Sqlite => sqlite(filter),
        _ => None,
    }
}

// Postgres custom SQL takes numbered `$N` placeholders, SQLite takes `?`.
fn postgres(filter: &FieldFilter) -> SimpleExpr {
    match filter {
        // jsonb equality is structural; a missing key yields NULL.
        FieldFilter::Eq { field, value } => Expr::cust_with_values(
            "(data -> $1) = CAST($2 AS jsonb)",
            [
                SqlValue::from(field.as_str()),
                SqlValue::from(value.to_string()),
            ],
        ),
        FieldFilter::Between { field, min, max } => Expr::cust_with_values(
            "(CASE \
               WHEN jsonb_typeof(data -> $1) = 'number' \
                    AND (data ->> $1)::numeric = trunc((data ->> $1)::numeric) \
                 THEN (data ->> $1)::numeric \
               WHEN jsonb_typeof(data -> $1) = 'string' AND trim(data ->> $1) ~ $2 \
                 THEN trim(data ->> $1)::numeric \
             END) BETWEEN $3 AND $4",
            [
                SqlValue::from(field.as_str()),
                SqlValue::from(PG_INTEGER_TEXT),
                SqlValue::from(*min),
                SqlValue::from(*max),
            ],
        ),
    }
}

fn json_path(field: &str) -> SqlValue {
    SqlValue::from(format!("$.\"{}\"", field.replace('"', "\\\"")))
}

fn sqlite(filter: &FieldFilter) -> Option<SimpleExpr> {
    match filter {
        FieldFilter::Eq { field, value } => sqlite_eq(field, value),
        FieldFilter::Between { field, min, max } => {
            let path = json_path(field);
            Some(Expr::cust_with_values(
                "(CASE \
                   WHEN json_type(data, ?) = 'integer' THEN json_extract(data, ?) \
                   WHEN json_type(data, ?) = 'real' \
                        AND json_extract(data, ?) = CAST(json_extract(data, ?) AS INTEGER) \
                     THEN json_extract(data, ?) \
                   WHEN json_type(data, ?) = 'text' \
                        AND ltrim(trim(json_extract(data, ?)), '+-') <> '' \
                        AND ltrim(trim(json_extract(data, ?)), '+-') NOT GLOB ? \
                     THEN CAST(trim(json_extract(data, ?)) AS INTEGER) \
                 END) BETWEEN ? AND ?",
                [
                    path.clone(),
                    path.clone(),
                    path.clone(),
                    path.clone(),
                    path.clone(),
                    path.clone(),
                    path.clone(),
                    path.clone(),
                    path.clone(),
                    SqlValue::from(SQLITE_NON_DIGIT),
                    path,
                    SqlValue::from(*min),
                    SqlValue::from(*max),
                ],
            ))
        }
    }
}

fn sqlite_eq(field: &str, value: &Value) -> Option<SimpleExpr> {
    let path = json_path(field);
    let expr = match value {
        Value::Null => Expr::cust_with_values("json_type(data, ?) = 'null'", [path]),
        Value::Bool(true) => Expr::cust_with_values("json_type(data, ?) = 'true'", [path]),
        Value::Bool(false) => Expr::cust_with_values("json_type(data, ?) = 'false'", [path]),
        Value::String(text) => Expr::cust_with_values(
            "json_type(data, ?) = 'text' AND json_extract(data, ?) = ?",
            [path.clone(), path, SqlValue::from(text.as_str())],
        ),
        Value::Number(number) => {
            let bound = match number.as_i64() {
                Some(int) => SqlValue::from(int),
                None => SqlValue::from(number.as_f64()?),
            };
            Expr::cust_with_values(
                "json_type(data, ?) IN ('integer', 'real') AND json_extract(data, ?) = ?",
                [path.clone(), path, bound],
            )
        }
        Value::Array(_) | Value::Object(_) => return None,
    };
    Some(expr)
}
