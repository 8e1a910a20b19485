use crate::error::LoadError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

/// Native type tags of spatial-structure objects. These are containers, not
/// building elements, and never take part in a take-off.
pub const SPATIAL_TYPES: &[&str] = &[
    "ifcproject",
    "ifcsite",
    "ifcbuilding",
    "ifcbuildingstorey",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertySet {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: Vec<Property>,
}

/// One element as exported by the viewer's metadata store.
///
/// Property sets arrive in two shapes: embedded in `property_sets`, or
/// referenced by id through `property_set_ids` into the graph-level table.
/// Every field the exporter adds beyond these lands in `attributes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataObject {
    pub id: String,
    #[serde(rename = "type", default)]
    pub ifc_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub props: Option<Map<String, Value>>,
    #[serde(default)]
    pub property_set_ids: Vec<String>,
    #[serde(default)]
    pub property_sets: Vec<PropertySet>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl MetadataObject {
    #[must_use]
    pub fn new(id: impl Into<String>, ifc_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ifc_type: ifc_type.into(),
            ..Self::default()
        }
    }

    /// Looks up a top-level field, first among the free attributes and then in
    /// the nested `props` bag. Keys are matched exactly.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.attributes
            .get(key)
            .or_else(|| self.props.as_ref().and_then(|p| p.get(key)))
            .filter(|v| !v.is_null())
    }

    /// Whether this object is a spatial container or carries no type tag.
    #[must_use]
    pub fn is_spatial(&self) -> bool {
        let tag = self.ifc_type.trim().to_lowercase();
        tag.is_empty() || SPATIAL_TYPES.contains(&tag.as_str())
    }
}

/// The model-wide metadata graph: objects in file order plus the property-set
/// table used by indirect references.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataGraph {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "metaObjects", default)]
    objects: Vec<MetadataObject>,
    #[serde(rename = "propertySets", default, with = "property_set_table")]
    property_sets: HashMap<String, PropertySet>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl MetadataGraph {
    #[must_use]
    pub fn new(objects: Vec<MetadataObject>, property_sets: Vec<PropertySet>) -> Self {
        let property_sets = property_sets
            .into_iter()
            .filter_map(|ps| ps.id.clone().map(|id| (id, ps)))
            .collect();
        let mut graph = Self {
            id: None,
            objects,
            property_sets,
            index: HashMap::new(),
        };
        graph.reindex();
        graph
    }

    /// Reads a xeokit-style metadata JSON file (`metaObjects` + `propertySets`).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path_ref = path.as_ref();
        let content = std::fs::read_to_string(path_ref).map_err(|source| LoadError::FileRead {
            path: path_ref.to_path_buf(),
            source,
        })?;
        Self::from_json(&content).map_err(|source| LoadError::InvalidJson {
            path: path_ref.to_path_buf(),
            source,
        })
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        let mut graph: Self = serde_json::from_str(content)?;
        graph.reindex();
        Ok(graph)
    }

    fn reindex(&mut self) {
        self.index = self
            .objects
            .iter()
            .enumerate()
            .map(|(i, o)| (o.id.clone(), i))
            .collect();
    }

    #[must_use]
    pub fn objects(&self) -> &[MetadataObject] {
        &self.objects
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&MetadataObject> {
        self.index.get(id).map(|&i| &self.objects[i])
    }

    #[must_use]
    pub fn property_set(&self, id: &str) -> Option<&PropertySet> {
        self.property_sets.get(id)
    }

    /// Objects that are building elements (spatial containers excluded), in
    /// file order.
    pub fn elements(&self) -> impl Iterator<Item = &MetadataObject> {
        self.objects.iter().filter(|o| !o.is_spatial())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// The JSON form is an array of sets carrying their own ids; in memory the
/// table is keyed by id.
mod property_set_table {
    use super::PropertySet;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::HashMap;

    pub fn serialize<S: Serializer>(
        table: &HashMap<String, PropertySet>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut sets: Vec<&PropertySet> = table.values().collect();
        sets.sort_by(|a, b| a.id.cmp(&b.id));
        sets.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HashMap<String, PropertySet>, D::Error> {
        let sets = Vec::<PropertySet>::deserialize(deserializer)?;
        Ok(sets
            .into_iter()
            .filter_map(|ps| ps.id.clone().map(|id| (id, ps)))
            .collect())
    }
}
