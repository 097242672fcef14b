//! Document entity model
//!
//! This module contains the SeaORM entity model for the documents table. Each
//! row is one document of a named collection with its JSON body.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

/// Stored document, keyed by collection and document id
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    /// Collection name (e.g. `buildings`, `evaluation_history`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub collection: String,

    /// Document identifier, unique within its collection
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Document body; always a JSON object
    #[sea_orm(column_type = "JsonBinary")]
    pub data: JsonValue,

    /// Timestamp when the document was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the document was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
