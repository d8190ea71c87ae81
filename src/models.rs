use std::{fmt, str::FromStr};

use chrono::NaiveDateTime;
use diesel::{
    deserialize::{self, FromSql, FromSqlRow},
    expression::AsExpression,
    pg::{Pg, PgValue},
    prelude::*,
    serialize::{self, Output, ToSql},
    sql_types::Text,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

/// Declares a fieldless enum stored as a text column and serialized as its
/// canonical string.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsExpression, FromSqlRow)]
        #[diesel(sql_type = Text)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let trimmed = value.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|candidate| candidate.as_str().eq_ignore_ascii_case(trimmed))
                    .ok_or_else(|| UnknownVariant {
                        kind: stringify!($name),
                        value: trimmed.to_string(),
                    })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }

        impl ToSql<Text, Pg> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                <str as ToSql<Text, Pg>>::to_sql(self.as_str(), out)
            }
        }

        impl FromSql<Text, Pg> for $name {
            fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                let raw = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
                Ok(raw.parse()?)
            }
        }
    };
}

text_enum! {
    /// Approval lifecycle of a document, in forward order.
    pub enum DocumentStatus {
        Draft => "DRAFT",
        Review => "REVIEW",
        Approved => "APPROVED",
        Signed => "SIGNED",
        Filed => "FILED",
        Archived => "ARCHIVED",
    }
}

impl DocumentStatus {
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Draft => Some(Self::Review),
            Self::Review => Some(Self::Approved),
            Self::Approved => Some(Self::Signed),
            Self::Signed => Some(Self::Filed),
            Self::Filed => Some(Self::Archived),
            Self::Archived => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }

    /// True when `target` is this status or its immediate successor.
    pub fn is_forward_step(self, target: Self) -> bool {
        target == self || self.next() == Some(target)
    }
}

text_enum! {
    pub enum DocumentType {
        Contract => "CONTRACT",
        Nda => "NDA",
        Lease => "LEASE",
        Agreement => "AGREEMENT",
        Memo => "MEMO",
        Letter => "LETTER",
        CourtFiling => "COURT_FILING",
        Other => "OTHER",
    }
}

impl DocumentType {
    /// Types reviewed with contract expectations (termination, governing law).
    pub fn is_contractual(self) -> bool {
        matches!(
            self,
            Self::Contract | Self::Nda | Self::Lease | Self::Agreement
        )
    }
}

impl Default for DocumentType {
    fn default() -> Self {
        Self::Other
    }
}

text_enum! {
    pub enum AnalysisType {
        Summary => "summary",
        KeyPoints => "key_points",
        FullAnalysis => "full_analysis",
        LegalReview => "legal_review",
        ComplianceCheck => "compliance_check",
    }
}

text_enum! {
    pub enum TaskStatus {
        Pending => "PENDING",
        Processing => "PROCESSING",
        Completed => "COMPLETED",
        Failed => "FAILED",
    }
}

impl TaskStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(
    Debug, Clone, PartialEq, Serialize, Queryable, Identifiable, Insertable, AsChangeset,
)]
#[diesel(table_name = documents)]
#[diesel(treat_none_as_null = true)]
pub struct Document {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub content: String,
    pub status: DocumentStatus,
    pub document_type: DocumentType,
    /// Bumped by every content-changing edit; the compare-and-swap token.
    pub edit_version: i32,
    /// Number of snapshots appended to the version log.
    pub snapshot_count: i32,
    pub case_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub file_url: Option<String>,
    pub file_checksum: Option<String>,
    /// Latest analysis result per analysis type.
    pub analysis: Value,
    pub created_by: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Document {
    /// Version label shown to users: one past the number of snapshots.
    pub fn version(&self) -> i32 {
        self.snapshot_count + 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Queryable, Identifiable, Insertable, Associations)]
#[diesel(table_name = document_versions)]
#[diesel(belongs_to(Document))]
pub struct DocumentVersion {
    pub id: Uuid,
    pub document_id: Uuid,
    pub version_number: i32,
    pub title: String,
    pub content: String,
    pub file_url: Option<String>,
    pub change_description: Option<String>,
    pub created_by: Uuid,
    pub created_at: NaiveDateTime,
}

#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Associations,
)]
#[diesel(table_name = comments)]
#[diesel(belongs_to(Document))]
#[diesel(treat_none_as_null = true)]
pub struct Comment {
    pub id: Uuid,
    pub document_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
    /// Character offset into the document content.
    pub position: Option<i32>,
    pub quoted_text: Option<String>,
    pub mentions: Vec<Uuid>,
    pub resolved: bool,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<NaiveDateTime>,
    pub created_by: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Comment {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(
    Debug, Clone, PartialEq, Serialize, Queryable, Identifiable, Insertable, AsChangeset,
)]
#[diesel(table_name = tags)]
#[diesel(treat_none_as_null = true)]
pub struct Tag {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub color: Option<String>,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Queryable, Insertable, Associations)]
#[diesel(table_name = document_tags)]
#[diesel(belongs_to(Document))]
#[diesel(belongs_to(Tag))]
#[diesel(primary_key(document_id, tag_id))]
pub struct DocumentTag {
    pub document_id: Uuid,
    pub tag_id: Uuid,
    pub assigned_at: NaiveDateTime,
}

#[derive(
    Debug, Clone, PartialEq, Serialize, Queryable, Identifiable, Insertable, AsChangeset,
)]
#[diesel(table_name = analysis_tasks)]
#[diesel(treat_none_as_null = true)]
pub struct AnalysisTask {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub document_id: Uuid,
    pub analysis_type: AnalysisType,
    pub status: TaskStatus,
    pub input_payload: Value,
    pub output_payload: Option<Value>,
    pub error_message: Option<String>,
    pub attempts: i32,
    pub requested_by: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing_ignores_case() {
        assert_eq!(
            "signed".parse::<DocumentStatus>().unwrap(),
            DocumentStatus::Signed
        );
        assert_eq!(
            "COURT_FILING".parse::<DocumentType>().unwrap(),
            DocumentType::CourtFiling
        );
        let err = "shredded".parse::<DocumentStatus>().unwrap_err();
        assert_eq!(err.to_string(), "unknown DocumentStatus 'shredded'");
    }

    #[test]
    fn lifecycle_walks_forward_to_archived() {
        let mut status = DocumentStatus::Draft;
        let mut seen = vec![status];
        while let Some(next) = status.next() {
            status = next;
            seen.push(status);
        }
        assert_eq!(seen, DocumentStatus::ALL);
        assert!(DocumentStatus::Archived.is_terminal());
    }

    #[test]
    fn forward_step_rejects_skips_and_reversals() {
        assert!(DocumentStatus::Draft.is_forward_step(DocumentStatus::Review));
        assert!(DocumentStatus::Review.is_forward_step(DocumentStatus::Review));
        assert!(!DocumentStatus::Draft.is_forward_step(DocumentStatus::Approved));
        assert!(!DocumentStatus::Signed.is_forward_step(DocumentStatus::Draft));
    }

    #[test]
    fn analysis_type_serializes_as_snake_case() {
        let json = serde_json::to_string(&AnalysisType::ComplianceCheck).unwrap();
        assert_eq!(json, "\"compliance_check\"");
        let parsed: AnalysisType = serde_json::from_str("\"key_points\"").unwrap();
        assert_eq!(parsed, AnalysisType::KeyPoints);
    }
}
