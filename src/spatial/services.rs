//! Capabilities injected into the navigator: language, permissions and
//! blocking dialogs.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Permission required to create spatial items.
pub const PERMISSION_SPATIAL_CREATE: &str = "spatial.create";
/// Permission required to update spatial items.
pub const PERMISSION_SPATIAL_UPDATE: &str = "spatial.update";
/// Permission required to delete spatial items.
pub const PERMISSION_SPATIAL_DELETE: &str = "spatial.delete";

/// Active UI language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ar,
    En,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Ar => "ar",
            Language::En => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ar" => Ok(Language::Ar),
            "en" => Ok(Language::En),
            other => Err(format!("unsupported language '{other}'")),
        }
    }
}

/// Pick the name in `language`, falling back to the other language.
///
/// Blank values count as missing.
pub fn resolve_bilingual<'a>(
    language: Language,
    name_ar: Option<&'a str>,
    name_en: Option<&'a str>,
) -> Option<&'a str> {
    let non_blank = |s: Option<&'a str>| s.filter(|v| !v.trim().is_empty());
    let (preferred, other) = match language {
        Language::Ar => (name_ar, name_en),
        Language::En => (name_en, name_ar),
    };
    non_blank(preferred).or_else(|| non_blank(other))
}

/// Client-side permission lookup, consulted before any mutation.
pub trait PermissionChecker: Send + Sync {
    fn has_permission(&self, code: &str) -> bool;
}

/// Fixed set of granted permission codes.
#[derive(Debug, Clone, Default)]
pub struct StaticPermissions {
    granted: HashSet<String>,
}

impl StaticPermissions {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            granted: codes.into_iter().map(Into::into).collect(),
        }
    }

    /// Every spatial mutation permission.
    pub fn spatial_admin() -> Self {
        Self::new([
            PERMISSION_SPATIAL_CREATE,
            PERMISSION_SPATIAL_UPDATE,
            PERMISSION_SPATIAL_DELETE,
        ])
    }
}

impl PermissionChecker for StaticPermissions {
    fn has_permission(&self, code: &str) -> bool {
        self.granted.contains(code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    Confirm,
    Error,
    PermissionDenied,
}

/// Content of a blocking dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogSpec {
    pub kind: DialogKind,
    pub title: String,
    pub message: String,
}

impl DialogSpec {
    pub fn confirm_delete(name: &str) -> Self {
        Self {
            kind: DialogKind::Confirm,
            title: "Confirm deletion".to_string(),
            message: format!("Delete \"{name}\"? This cannot be undone."),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: DialogKind::Error,
            title: "Operation failed".to_string(),
            message: message.into(),
        }
    }

    pub fn permission_denied(code: &str) -> Self {
        Self {
            kind: DialogKind::PermissionDenied,
            title: "Permission denied".to_string(),
            message: format!("You do not have the '{code}' permission."),
        }
    }
}

/// Blocking dialogs shown to the operator.
#[async_trait]
pub trait DialogService: Send + Sync {
    /// Resolves to `true` when the user confirms.
    async fn confirm(&self, spec: DialogSpec) -> bool;

    async fn alert(&self, spec: DialogSpec);
}
