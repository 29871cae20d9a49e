use domain_tools::{CollectionName, Tool};
use serde_json::{Value, json};

/// Display metadata stored next to every vector.
///
/// Identical across collections apart from `collection`; never contains the
/// embedded text.
pub fn build_payload(tool: &Tool, collection: CollectionName) -> Value {
    json!({
        "tool_id": tool.id.to_string(),
        "name": tool.name,
        "slug": tool.slug,
        "category": tool.category,
        "tags": tool.tags,
        "pricing_model": tool.pricing_model,
        "website_url": tool.website_url,
        "logo_url": tool.logo_url,
        "collection": collection.as_str(),
        "status": tool.status,
    })
}
