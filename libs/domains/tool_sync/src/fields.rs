//! Static field → collection table.
//!
//! Declared once here and inverted once on first use; everything else asks
//! through the detector.

use std::collections::BTreeMap;

use domain_tools::{CollectionName, ToolField};
use once_cell::sync::Lazy;

const TOOLS: &[ToolField] = &[
    ToolField::Name,
    ToolField::Description,
    ToolField::LongDescription,
    ToolField::Category,
    ToolField::Tags,
];

const FUNCTIONALITY: &[ToolField] = &[
    ToolField::Name,
    ToolField::Description,
    ToolField::Functionality,
];

const USECASES: &[ToolField] = &[ToolField::Name, ToolField::UseCases, ToolField::Tags];

const INTERFACE: &[ToolField] = &[
    ToolField::Name,
    ToolField::Interface,
    ToolField::Deployment,
];

/// Copied into every collection's payload by `build_payload`
pub(crate) const PAYLOAD_FIELDS: &[ToolField] = &[
    ToolField::Name,
    ToolField::Slug,
    ToolField::Category,
    ToolField::Tags,
    ToolField::PricingModel,
    ToolField::WebsiteUrl,
    ToolField::LogoUrl,
    ToolField::Status,
];

static COLLECTIONS_BY_FIELD: Lazy<BTreeMap<ToolField, Vec<CollectionName>>> = Lazy::new(|| {
    let mut table: BTreeMap<ToolField, Vec<CollectionName>> = BTreeMap::new();
    for collection in CollectionName::ALL {
        for field in embedded_fields(collection) {
            table.entry(*field).or_default().push(collection);
        }
    }
    table
});

/// Fields whose values feed `collection`'s embedded content
pub(crate) fn embedded_fields(collection: CollectionName) -> &'static [ToolField] {
    match collection {
        CollectionName::Tools => TOOLS,
        CollectionName::Functionality => FUNCTIONALITY,
        CollectionName::Usecases => USECASES,
        CollectionName::Interface => INTERFACE,
    }
}

/// Collections embedding `field`, in declared order
pub(crate) fn collections_for(field: ToolField) -> &'static [CollectionName] {
    COLLECTIONS_BY_FIELD
        .get(&field)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

pub(crate) fn is_payload_field(field: ToolField) -> bool {
    PAYLOAD_FIELDS.contains(&field)
}
