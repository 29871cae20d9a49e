//! Collection-specific text generation.
//!
//! The registry is the factory the orchestrator asks for each collection's
//! content. Default generators read only the fields that feed that
//! collection's fingerprint.

use std::collections::HashMap;
use std::sync::Arc;

use domain_tools::{CollectionName, Tool};

use crate::error::SyncError;

/// Turns a tool into the text embedded for one collection
#[cfg_attr(test, mockall::automock)]
pub trait ContentGenerator: Send + Sync {
    fn generate(&self, tool: &Tool) -> String;
}

/// Line-based templates over a collection's embedded fields
#[derive(Debug, Clone, Copy)]
pub struct TemplateContentGenerator {
    collection: CollectionName,
}

impl TemplateContentGenerator {
    pub fn new(collection: CollectionName) -> Self {
        Self { collection }
    }
}

impl ContentGenerator for TemplateContentGenerator {
    fn generate(&self, tool: &Tool) -> String {
        let mut lines = Lines::default();
        lines.text(&tool.name);

        match self.collection {
            CollectionName::Tools => {
                lines.text(&tool.description);
                lines.text(tool.long_description.as_deref().unwrap_or_default());
                lines.labeled("Category", &tool.category);
                lines.list("Tags", &tool.tags);
            }
            CollectionName::Functionality => {
                lines.text(&tool.description);
                lines.list("Capabilities", &tool.functionality);
            }
            CollectionName::Usecases => {
                lines.list("Use cases", &tool.use_cases);
                lines.list("Tags", &tool.tags);
            }
            CollectionName::Interface => {
                lines.list("Interfaces", &tool.interface);
                lines.list("Deployment", &tool.deployment);
            }
        }

        lines.0.join("\n")
    }
}

#[derive(Default)]
struct Lines(Vec<String>);

impl Lines {
    fn text(&mut self, value: &str) {
        let value = value.trim();
        if !value.is_empty() {
            self.0.push(value.to_string());
        }
    }

    fn labeled(&mut self, label: &str, value: &str) {
        let value = value.trim();
        if !value.is_empty() {
            self.0.push(format!("{label}: {value}"));
        }
    }

    fn list(&mut self, label: &str, values: &[String]) {
        let values: Vec<&str> = values
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .collect();
        if !values.is_empty() {
            self.0.push(format!("{label}: {}", values.join(", ")));
        }
    }
}

/// Content generators keyed by collection
#[derive(Clone)]
pub struct ContentGeneratorRegistry {
    generators: HashMap<CollectionName, Arc<dyn ContentGenerator>>,
}

impl ContentGeneratorRegistry {
    /// Registry without any generator
    pub fn empty() -> Self {
        Self {
            generators: HashMap::new(),
        }
    }

    /// Replace the generator for `collection`
    pub fn with_generator(
        mut self,
        collection: CollectionName,
        generator: Arc<dyn ContentGenerator>,
    ) -> Self {
        self.generators.insert(collection, generator);
        self
    }

    pub fn get(&self, collection: CollectionName) -> Option<&Arc<dyn ContentGenerator>> {
        self.generators.get(&collection)
    }

    /// Generate `collection`'s content; blank output is an error
    pub fn generate(&self, tool: &Tool, collection: CollectionName) -> Result<String, SyncError> {
        let generator = self.get(collection).ok_or_else(|| SyncError::ContentGeneration {
            collection,
            message: "no content generator registered".to_string(),
        })?;

        let content = generator.generate(tool);
        if content.trim().is_empty() {
            return Err(SyncError::ContentGeneration {
                collection,
                message: "generated content is empty".to_string(),
            });
        }

        Ok(content)
    }
}

impl Default for ContentGeneratorRegistry {
    fn default() -> Self {
        CollectionName::ALL
            .iter()
            .fold(Self::empty(), |registry, collection| {
                registry.with_generator(
                    *collection,
                    Arc::new(TemplateContentGenerator::new(*collection)),
                )
            })
    }
}
