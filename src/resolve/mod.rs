pub mod measure;
pub mod properties;
pub mod type_name;

pub use measure::{resolve_value, DEFAULT_VALUE};
pub use properties::{properties, ResolvedProperty};
pub use type_name::{resolve_type_name, UNKNOWN_TYPE};

use crate::model::{ClassificationKey, MetadataGraph, MetadataObject};

/// The (category, resolved type) pair an element is classified under.
#[must_use]
pub fn classification_key(obj: &MetadataObject, graph: &MetadataGraph) -> ClassificationKey {
    ClassificationKey::new(obj.ifc_type.clone(), resolve_type_name(obj, graph))
}
