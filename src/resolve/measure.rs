//! One numeric quantity per element and unit kind.
//!
//! Lookup order: a synonym-named property, then the element's bounding box in
//! the viewer, then the count-like default of `1`.

use super::properties::properties;
use crate::model::{MetadataGraph, MetadataObject, UnitKind};
use crate::normalize::{normalize, numeric};
use crate::scene::{Aabb, SceneHost, SceneLookup};

/// Returned when neither properties nor geometry give a value.
pub const DEFAULT_VALUE: f64 = 1.0;

// Synonyms are stored in normalized form.
const LENGTH_SYNONYMS: &[&str] = &[
    "length",
    "netlength",
    "grosslength",
    "longitud",
    "longitudneta",
    "longitudbruta",
    "largo",
    "lange",
];

const AREA_SYNONYMS: &[&str] = &[
    "netarea",
    "grossarea",
    "area",
    "netsidearea",
    "grosssidearea",
    "netsurfacearea",
    "grosssurfacearea",
    "surfacearea",
    "outersurfacearea",
    "netfootprintarea",
    "grossfootprintarea",
    "superficie",
    "superficieneta",
    "superficiebruta",
    "areaneta",
    "areabruta",
    "flache",
];

const VOLUME_SYNONYMS: &[&str] = &[
    "netvolume",
    "grossvolume",
    "volume",
    "volumen",
    "volumenneto",
    "volumenbruto",
];

const MASS_SYNONYMS: &[&str] = &[
    "netweight",
    "grossweight",
    "weight",
    "mass",
    "netmass",
    "grossmass",
    "masa",
    "peso",
    "pesoneto",
    "pesobruto",
    "gewicht",
];

/// Normalized property names accepted for `kind`. Count has none.
#[must_use]
pub fn synonyms(kind: UnitKind) -> &'static [&'static str] {
    match kind {
        UnitKind::Count => &[],
        UnitKind::Length => LENGTH_SYNONYMS,
        UnitKind::Area => AREA_SYNONYMS,
        UnitKind::Volume => VOLUME_SYNONYMS,
        UnitKind::Mass => MASS_SYNONYMS,
    }
}

/// How an element presents its faces, for the area fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaShape {
    /// Lateral face: `max(dx, dz) × dy`.
    Wall,
    /// Plan face: `dx × dz`.
    Horizontal,
    /// Largest vertical face: `max(dx × dy, dz × dy)`.
    Opening,
    /// Largest of the three faces.
    Other,
}

impl AreaShape {
    #[must_use]
    pub fn for_tag(ifc_type: &str) -> Self {
        let tag = normalize(ifc_type);
        let tag = tag.strip_prefix("ifc").unwrap_or(&tag);
        if tag.contains("wall") {
            AreaShape::Wall
        } else if ["slab", "floor", "roof", "ceiling"]
            .iter()
            .any(|k| tag.contains(k))
        {
            AreaShape::Horizontal
        } else if tag.contains("window") || tag.contains("door") {
            AreaShape::Opening
        } else {
            AreaShape::Other
        }
    }
}

/// First positive numeric value of a synonym-named property.
#[must_use]
pub fn property_value(obj: &MetadataObject, graph: &MetadataGraph, kind: UnitKind) -> Option<f64> {
    let accepted = synonyms(kind);
    if accepted.is_empty() {
        return None;
    }
    properties(obj, graph)
        .filter(|p| accepted.contains(&normalize(p.name).as_str()))
        .filter_map(|p| numeric(p.value))
        .find(|v| *v > 0.0)
}

/// Quantity derived from a bounding box. Mass and count have no geometric
/// form.
#[must_use]
pub fn geometric_value(aabb: &Aabb, kind: UnitKind, ifc_type: &str) -> Option<f64> {
    let (dx, dy, dz) = aabb.extents();
    let value = match kind {
        UnitKind::Length => dx.max(dy).max(dz),
        UnitKind::Area => match AreaShape::for_tag(ifc_type) {
            AreaShape::Wall => dx.max(dz) * dy,
            AreaShape::Horizontal => dx * dz,
            AreaShape::Opening => (dx * dy).max(dz * dy),
            AreaShape::Other => (dx * dy).max(dx * dz).max(dy * dz),
        },
        UnitKind::Volume => dx * dy * dz,
        UnitKind::Count | UnitKind::Mass => return None,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Resolves the quantity of `obj` in `kind`. Always `>= 0`; `1` when no
/// signal exists, and exactly `1` for [`UnitKind::Count`].
#[must_use]
pub fn resolve_value<H: SceneHost + ?Sized>(
    obj: &MetadataObject,
    graph: &MetadataGraph,
    kind: UnitKind,
    scene: Option<&SceneLookup<'_, H>>,
) -> f64 {
    if kind == UnitKind::Count {
        return DEFAULT_VALUE;
    }

    if let Some(value) = property_value(obj, graph, kind) {
        return value;
    }

    let geometric = scene
        .and_then(|s| s.aabb(&obj.id))
        .and_then(|aabb| geometric_value(&aabb, kind, &obj.ifc_type));
    if let Some(value) = geometric {
        tracing::trace!(element = %obj.id, %kind, value, "quantity from bounding box");
        return value;
    }

    DEFAULT_VALUE
}
