//! Display type names for elements whose native tag is too generic.
//!
//! Exporters scatter the meaningful type label across `ObjectType`, nested
//! `type.name` objects, "Family and Type" properties and the element name.
//! Each source contributes weighted candidates; the best scored one wins.

use super::properties::properties;
use crate::model::{MetadataGraph, MetadataObject};
use crate::normalize::{normalize, text};
use serde_json::Value;

/// Prefix shared by every IFC entity tag.
pub const IFC_PREFIX: &str = "ifc";

/// Tags that say nothing about what the element is.
const GENERIC_TAGS: &[&str] = &["product", "element", "buildingelement"];

/// Normalized property names that carry a type label without containing "type".
const TYPE_PROPERTY_NAMES: &[&str] = &["reference", "typename", "familyandtype", "familytype"];

pub const UNKNOWN_TYPE: &str = "Unknown";

const WEIGHT_NESTED_TYPE: u32 = 10;
const WEIGHT_OBJECT_TYPE: u32 = 9;
const WEIGHT_TYPE_FIELD: u32 = 8;
const WEIGHT_TYPE_PROPERTY: u32 = 6;
const WEIGHT_NAME: u32 = 5;

/// Where a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    NestedTypeName,
    ObjectType,
    TypeField,
    TypeProperty,
    Name,
}

impl CandidateSource {
    #[must_use]
    pub fn weight(self) -> u32 {
        match self {
            CandidateSource::NestedTypeName => WEIGHT_NESTED_TYPE,
            CandidateSource::ObjectType => WEIGHT_OBJECT_TYPE,
            CandidateSource::TypeField => WEIGHT_TYPE_FIELD,
            CandidateSource::TypeProperty => WEIGHT_TYPE_PROPERTY,
            CandidateSource::Name => WEIGHT_NAME,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub value: String,
    pub source: CandidateSource,
}

impl Candidate {
    fn new(value: String, source: CandidateSource) -> Self {
        Self { value, source }
    }

    /// Source weight plus a bonus of one per twelve characters, capped at 3.
    #[must_use]
    pub fn score(&self) -> u32 {
        let bonus = (self.len() / 12).min(3) as u32;
        self.source.weight() + bonus
    }

    fn len(&self) -> usize {
        self.value.chars().count()
    }
}

fn starts_with_ifc(s: &str) -> bool {
    s.trim().to_lowercase().starts_with(IFC_PREFIX)
}

/// Whether the native tag is already a specific, displayable type.
#[must_use]
pub fn is_specific_tag(tag: &str) -> bool {
    let lower = tag.trim().to_lowercase();
    !lower.is_empty() && !GENERIC_TAGS.contains(&lower.as_str()) && !lower.starts_with(IFC_PREFIX)
}

/// Candidates are accepted only if they look like real type names.
#[must_use]
pub fn is_acceptable(candidate: &str) -> bool {
    let trimmed = candidate.trim();
    trimmed.chars().count() >= 2 && !starts_with_ifc(trimmed)
}

fn nested_name(value: &Value) -> Option<String> {
    let Value::Object(map) = value else {
        return None;
    };
    ["name", "Name"]
        .iter()
        .filter_map(|k| map.get(*k))
        .find_map(text)
}

/// Collects candidates in priority order. Rejected strings are filtered out.
#[must_use]
pub fn candidates(obj: &MetadataObject, graph: &MetadataGraph) -> Vec<Candidate> {
    let mut found = Vec::new();

    for key in ["type", "Type"] {
        if let Some(name) = obj.field(key).and_then(nested_name) {
            found.push(Candidate::new(name, CandidateSource::NestedTypeName));
        }
    }

    for key in ["ObjectType", "TypeName"] {
        if let Some(value) = obj.field(key).and_then(text) {
            found.push(Candidate::new(value, CandidateSource::ObjectType));
        }
    }

    if let Some(value) = obj
        .field("Type")
        .filter(|v| !v.is_object() || nested_name(v).is_none())
        .and_then(text)
    {
        found.push(Candidate::new(value, CandidateSource::TypeField));
    }

    for prop in properties(obj, graph) {
        let key = normalize(prop.name);
        if key.contains("type") || TYPE_PROPERTY_NAMES.contains(&key.as_str()) {
            if let Some(value) = text(prop.value) {
                found.push(Candidate::new(value, CandidateSource::TypeProperty));
            }
        }
    }

    if let Some(name) = obj.name.as_deref().map(str::trim) {
        if !name.is_empty() && !starts_with_ifc(name) {
            found.push(Candidate::new(name.to_string(), CandidateSource::Name));
        }
    }

    found.retain(|c| is_acceptable(&c.value));
    found
}

/// Picks the best candidate: highest score, then longest. On a full tie the
/// earliest candidate in priority order wins.
#[must_use]
pub fn best_candidate(candidates: &[Candidate]) -> Option<&Candidate> {
    candidates.iter().fold(None, |best: Option<&Candidate>, c| match best {
        Some(b) if (b.score(), b.len()) >= (c.score(), c.len()) => Some(b),
        _ => Some(c),
    })
}

/// Resolves the display type name of an element. Never returns an empty
/// string.
#[must_use]
pub fn resolve_type_name(obj: &MetadataObject, graph: &MetadataGraph) -> String {
    if is_specific_tag(&obj.ifc_type) {
        return obj.ifc_type.clone();
    }

    let found = candidates(obj, graph);
    if let Some(best) = best_candidate(&found) {
        return best.value.clone();
    }

    let tag = obj.ifc_type.trim();
    if tag.is_empty() {
        UNKNOWN_TYPE.to_string()
    } else {
        tag.to_string()
    }
}
