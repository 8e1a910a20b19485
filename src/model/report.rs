use super::UnitKind;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Tag bucket for elements without a tag ("marca") value.
pub const NO_TAG: &str = "no-tag";

/// Classification identity of an element: its IFC category and resolved type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassificationKey {
    pub category: String,
    pub type_name: String,
}

impl ClassificationKey {
    #[must_use]
    pub fn new(category: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            type_name: type_name.into(),
        }
    }
}

/// Running sums for every unit kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Quantities {
    pub count: usize,
    pub length: f64,
    pub area: f64,
    pub volume: f64,
    pub mass: f64,
}

impl Quantities {
    #[must_use]
    pub fn get(&self, kind: UnitKind) -> f64 {
        match kind {
            UnitKind::Count => self.count as f64,
            UnitKind::Length => self.length,
            UnitKind::Area => self.area,
            UnitKind::Volume => self.volume,
            UnitKind::Mass => self.mass,
        }
    }
}

impl AddAssign for Quantities {
    fn add_assign(&mut self, rhs: Self) {
        self.count += rhs.count;
        self.length += rhs.length;
        self.area += rhs.area;
        self.volume += rhs.volume;
        self.mass += rhs.mass;
    }
}

/// Leaf of the take-off: all elements sharing (category, type, tag).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementGroup {
    pub category: String,
    pub type_name: String,
    pub tag: String,
    pub quantities: Quantities,
    pub element_ids: Vec<String>,
}

impl ElementGroup {
    #[must_use]
    pub fn key(&self) -> ClassificationKey {
        ClassificationKey::new(&self.category, &self.type_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeGroup {
    pub type_name: String,
    pub totals: Quantities,
    pub groups: Vec<ElementGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub category: String,
    pub totals: Quantities,
    pub types: Vec<TypeGroup>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TakeoffReport {
    pub categories: Vec<CategoryGroup>,
}

impl TakeoffReport {
    #[must_use]
    pub fn total_elements(&self) -> usize {
        self.categories.iter().map(|c| c.totals.count).sum()
    }

    #[must_use]
    pub fn total_types(&self) -> usize {
        self.categories.iter().map(|c| c.types.len()).sum()
    }

    /// Leaf groups in report order.
    pub fn groups(&self) -> impl Iterator<Item = &ElementGroup> {
        self.categories
            .iter()
            .flat_map(|c| c.types.iter())
            .flat_map(|t| t.groups.iter())
    }

    #[must_use]
    pub fn type_group(&self, key: &ClassificationKey) -> Option<&TypeGroup> {
        self.categories
            .iter()
            .find(|c| c.category == key.category)
            .and_then(|c| c.types.iter().find(|t| t.type_name == key.type_name))
    }
}
