// Copyright (c) 2024 Mike Tsao

use crate::types::ModuleKey;
use derive_builder::Builder;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// The broad families a module definition is indexed under.
#[derive(
    Clone, Copy, Debug, Default, Display, EnumIter, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    #[allow(missing_docs)]
    #[default]
    Oscillator,
    #[allow(missing_docs)]
    Filter,
    #[allow(missing_docs)]
    Effect,
    #[allow(missing_docs)]
    Modulator,
    #[allow(missing_docs)]
    Utility,
    #[allow(missing_docs)]
    Sequencer,
}

/// The entitlement level gating access to a module definition.
#[derive(
    Clone, Copy, Debug, Default, Display, EnumIter, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    /// Available to everyone.
    #[default]
    Free,
    /// Requires an entitlement check to instantiate.
    Premium,
}

/// Everything the registry knows about a kind of module, apart from its
/// constructor. Immutable once registered, except by explicit
/// re-registration.
#[derive(Clone, Debug, PartialEq, Builder, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleDescriptor {
    /// The definition's unique key.
    #[builder(setter(into))]
    pub key: ModuleKey,
    /// The family the definition is indexed under.
    pub category: Category,
    /// The entitlement level required to instantiate it.
    #[builder(default)]
    pub tier: Tier,
    /// A relative CPU-cost rating, for load planning in the host.
    #[builder(default)]
    pub cpu_cost: f32,
    /// The definition's semantic version.
    #[builder(default = "\"0.1.0\".to_string()", setter(into))]
    pub version: String,
    /// A human-readable summary.
    #[builder(default, setter(into))]
    pub description: String,
    /// Free-form tags for filtering.
    #[builder(default, setter(each(name = "tag", into)))]
    pub tags: Vec<String>,
    /// Initial parameter values. `create_instance` options are merged over
    /// these.
    #[builder(default)]
    pub defaults: FxHashMap<String, f64>,
}

/// A pure read query over module definitions. Populated fields compose by
/// logical AND.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModuleFilter {
    /// Match only this category.
    pub category: Option<Category>,
    /// Match only this tier.
    pub tier: Option<Tier>,
    /// Match only definitions carrying this tag.
    pub tag: Option<String>,
    /// Case-insensitive free-text search over key, description, and tags.
    pub search: Option<String>,
}
impl ModuleFilter {
    /// Whether the given descriptor satisfies every populated field.
    pub fn matches(&self, descriptor: &ModuleDescriptor) -> bool {
        if let Some(category) = self.category {
            if descriptor.category != category {
                return false;
            }
        }
        if let Some(tier) = self.tier {
            if descriptor.tier != tier {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !descriptor.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = descriptor.key.0.to_lowercase().contains(&needle)
                || descriptor.description.to_lowercase().contains(&needle)
                || descriptor
                    .tags
                    .iter()
                    .any(|t| t.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}
