use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::sync_state::SyncMetadata;

/// Publication status of a tool
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToolStatus {
    #[default]
    Draft,
    PendingReview,
    /// Visible in the catalog and eligible for indexing
    Approved,
    Archived,
}

/// Tool entity - the authoritative catalog record stored in MongoDB
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Unique identifier (stored as _id in MongoDB)
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub long_description: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Capabilities ("full-text search", "regex")
    #[serde(default)]
    pub functionality: Vec<String>,
    #[serde(default)]
    pub use_cases: Vec<String>,
    /// How the tool is used ("cli", "api", "gui")
    #[serde(default)]
    pub interface: Vec<String>,
    /// Where it runs ("self-hosted", "saas")
    #[serde(default)]
    pub deployment: Vec<String>,
    #[serde(default)]
    pub pricing_model: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub status: ToolStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_metadata: Option<SyncMetadata>,
}

impl Tool {
    /// Create a draft tool with empty content
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            slug: slug.into(),
            description: String::new(),
            long_description: None,
            category: String::new(),
            tags: Vec::new(),
            functionality: Vec::new(),
            use_cases: Vec::new(),
            interface: Vec::new(),
            deployment: Vec::new(),
            pricing_model: None,
            website_url: None,
            logo_url: None,
            status: ToolStatus::Draft,
            created_at: now,
            updated_at: now,
            sync_metadata: None,
        }
    }

    /// Only approved tools are indexed
    pub fn is_eligible(&self) -> bool {
        self.status == ToolStatus::Approved
    }

    /// Fields whose value differs between `self` and `other`
    pub fn changed_fields(&self, other: &Tool) -> Vec<ToolField> {
        use strum::IntoEnumIterator;

        ToolField::iter()
            .filter(|field| self.field_value(*field) != other.field_value(*field))
            .collect()
    }

    /// JSON view of a single field, used for diffing and fingerprinting
    pub fn field_value(&self, field: ToolField) -> serde_json::Value {
        use serde_json::json;

        match field {
            ToolField::Name => json!(self.name),
            ToolField::Slug => json!(self.slug),
            ToolField::Description => json!(self.description),
            ToolField::LongDescription => json!(self.long_description),
            ToolField::Category => json!(self.category),
            ToolField::Tags => json!(self.tags),
            ToolField::Functionality => json!(self.functionality),
            ToolField::UseCases => json!(self.use_cases),
            ToolField::Interface => json!(self.interface),
            ToolField::Deployment => json!(self.deployment),
            ToolField::PricingModel => json!(self.pricing_model),
            ToolField::WebsiteUrl => json!(self.website_url),
            ToolField::LogoUrl => json!(self.logo_url),
            ToolField::Status => json!(self.status),
        }
    }
}

/// Content fields of a tool, by their stored name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ToolField {
    Name,
    Slug,
    Description,
    LongDescription,
    Category,
    Tags,
    Functionality,
    UseCases,
    Interface,
    Deployment,
    PricingModel,
    WebsiteUrl,
    LogoUrl,
    Status,
}

/// Counts of approved tools by sync state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub total: u64,
    pub synced: u64,
    pub pending: u64,
    pub failed: u64,
    /// Tools with at least one collection marked stale
    pub stale: u64,
    /// Approved tools that have no tracking block yet
    pub unsynced: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_tool_status_serialization() {
        assert_eq!(ToolStatus::PendingReview.to_string(), "pending_review");
        assert_eq!(
            serde_json::to_value(ToolStatus::Approved).unwrap(),
            serde_json::json!("approved")
        );
    }

    #[test]
    fn test_tool_field_names() {
        assert_eq!(ToolField::from_str("use_cases").unwrap(), ToolField::UseCases);
        assert_eq!(ToolField::LongDescription.to_string(), "long_description");
        assert!(ToolField::from_str("updated_at").is_err());
    }

    #[test]
    fn test_changed_fields() {
        let before = Tool::new("ripgrep", "ripgrep");
        let mut after = before.clone();
        after.website_url = Some("https://example.com".to_string());
        after.tags = vec!["search".to_string()];
        after.updated_at = Utc::now();

        assert_eq!(
            before.changed_fields(&after),
            vec![ToolField::Tags, ToolField::WebsiteUrl]
        );
        assert!(before.changed_fields(&before).is_empty());
    }

    #[test]
    fn test_tool_serializes_id_as_underscore_id() {
        let tool = Tool::new("fd", "fd");
        let json = serde_json::to_value(&tool).unwrap();
        assert!(json.get("_id").is_some());
        assert!(json.get("sync_metadata").is_none());

        let back: Tool = serde_json::from_value(json).unwrap();
        assert_eq!(back, tool);
    }

    #[test]
    fn test_eligibility() {
        let mut tool = Tool::new("jq", "jq");
        assert!(!tool.is_eligible());
        tool.status = ToolStatus::Approved;
        assert!(tool.is_eligible());
    }
}
