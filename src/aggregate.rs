//! Category → type → tag take-off over a whole metadata graph.

use crate::error::AggregateError;
use crate::model::{
    CategoryGroup, ElementGroup, MetadataGraph, MetadataObject, Quantities, TakeoffReport,
    TypeGroup, UnitKind, NO_TAG,
};
use crate::normalize::{compare_labels, normalize, text};
use crate::resolve::{properties, resolve_type_name, resolve_value};
use crate::scene::{SceneHost, SceneLookup};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

/// Fields and property names (normalized) holding the element tag ("marca").
const TAG_FIELDS: &[&str] = &["Tag", "tag", "Mark", "Marca"];
const TAG_PROPERTIES: &[&str] = &["tag", "mark", "marca"];

/// Shared flag raised when the model behind a running pass is replaced.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::Acquire)
    }
}

/// Tag of an element, from a tag field or a tag-named property.
#[must_use]
pub fn element_tag(obj: &MetadataObject, graph: &MetadataGraph) -> Option<String> {
    TAG_FIELDS
        .iter()
        .find_map(|k| obj.field(k).and_then(text))
        .or_else(|| {
            properties(obj, graph)
                .filter(|p| TAG_PROPERTIES.contains(&normalize(p.name).as_str()))
                .find_map(|p| text(p.value))
        })
}

/// Quantities contributed by a single element.
#[must_use]
pub fn element_quantities<H: SceneHost + ?Sized>(
    obj: &MetadataObject,
    graph: &MetadataGraph,
    scene: Option<&SceneLookup<'_, H>>,
) -> Quantities {
    Quantities {
        count: 1,
        length: resolve_value(obj, graph, UnitKind::Length, scene),
        area: resolve_value(obj, graph, UnitKind::Area, scene),
        volume: resolve_value(obj, graph, UnitKind::Volume, scene),
        mass: resolve_value(obj, graph, UnitKind::Mass, scene),
    }
}

#[derive(Default)]
struct TypeAccumulator {
    groups: Vec<ElementGroup>,
    by_tag: HashMap<String, usize>,
}

/// Builds the take-off. Never fails; see [`aggregate_cancellable`].
#[must_use]
pub fn aggregate<H: SceneHost + ?Sized>(
    graph: &MetadataGraph,
    scene: Option<&SceneLookup<'_, H>>,
) -> TakeoffReport {
    aggregate_cancellable(graph, scene, &CancelFlag::new()).unwrap_or_default()
}

/// Builds the take-off, checking `cancel` before each element.
///
/// Categories and types are sorted by display label; element groups keep the
/// order in which their first element appears in the graph.
pub fn aggregate_cancellable<H: SceneHost + ?Sized>(
    graph: &MetadataGraph,
    scene: Option<&SceneLookup<'_, H>>,
    cancel: &CancelFlag,
) -> Result<TakeoffReport, AggregateError> {
    let mut tree: HashMap<String, HashMap<String, TypeAccumulator>> = HashMap::new();

    for obj in graph.elements() {
        if cancel.is_cancelled() {
            tracing::debug!("aggregation abandoned: model replaced");
            return Err(AggregateError::Cancelled);
        }

        let type_name = resolve_type_name(obj, graph);
        let tag = element_tag(obj, graph).unwrap_or_else(|| NO_TAG.to_string());
        let quantities = element_quantities(obj, graph, scene);

        let acc = tree
            .entry(obj.ifc_type.clone())
            .or_default()
            .entry(type_name.clone())
            .or_default();

        let index = *acc.by_tag.entry(tag.clone()).or_insert_with(|| {
            acc.groups.push(ElementGroup {
                category: obj.ifc_type.clone(),
                type_name,
                tag,
                quantities: Quantities::default(),
                element_ids: Vec::new(),
            });
            acc.groups.len() - 1
        });

        let group = &mut acc.groups[index];
        group.quantities += quantities;
        group.element_ids.push(obj.id.clone());
    }

    let mut categories: Vec<CategoryGroup> = tree
        .into_iter()
        .map(|(category, types)| {
            let mut types: Vec<TypeGroup> = types
                .into_iter()
                .map(|(type_name, acc)| {
                    let mut totals = Quantities::default();
                    for g in &acc.groups {
                        totals += g.quantities;
                    }
                    TypeGroup {
                        type_name,
                        totals,
                        groups: acc.groups,
                    }
                })
                .collect();
            types.sort_by(|a, b| compare_labels(&a.type_name, &b.type_name));

            let mut totals = Quantities::default();
            for t in &types {
                totals += t.totals;
            }
            CategoryGroup {
                category,
                totals,
                types,
            }
        })
        .collect();
    categories.sort_by(|a, b| compare_labels(&a.category, &b.category));

    let report = TakeoffReport { categories };
    tracing::debug!(
        categories = report.categories.len(),
        types = report.total_types(),
        elements = report.total_elements(),
        "take-off aggregated"
    );
    Ok(report)
}

/// Sortable columns of the element-group table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Tag,
    Count,
    Length,
    Area,
    Volume,
    Mass,
}

impl FromStr for SortColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "tag" | "marca" => Ok(SortColumn::Tag),
            "count" | "ut" => Ok(SortColumn::Count),
            "length" | "ml" => Ok(SortColumn::Length),
            "area" | "m2" => Ok(SortColumn::Area),
            "volume" | "m3" => Ok(SortColumn::Volume),
            "mass" | "kg" => Ok(SortColumn::Mass),
            _ => Err(format!("unknown sort column '{s}'")),
        }
    }
}

impl fmt::Display for SortColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortColumn::Tag => "tag",
            SortColumn::Count => "count",
            SortColumn::Length => "length",
            SortColumn::Area => "area",
            SortColumn::Volume => "volume",
            SortColumn::Mass => "mass",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Tri-state column sort: ascending, descending, then back to insertion
/// order. Clicking a different column starts over on that column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortState {
    active: Option<(SortColumn, SortDirection)>,
}

impl SortState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn click(&mut self, column: SortColumn) {
        self.active = match self.active {
            Some((c, SortDirection::Ascending)) if c == column => {
                Some((c, SortDirection::Descending))
            }
            Some((c, SortDirection::Descending)) if c == column => None,
            _ => Some((column, SortDirection::Ascending)),
        };
    }

    #[must_use]
    pub fn active(&self) -> Option<(SortColumn, SortDirection)> {
        self.active
    }

    /// Stable sort of `groups`; insertion order when no column is active.
    #[must_use]
    pub fn apply<'a>(&self, groups: &'a [ElementGroup]) -> Vec<&'a ElementGroup> {
        let mut sorted: Vec<&ElementGroup> = groups.iter().collect();
        if let Some((column, direction)) = self.active {
            sorted.sort_by(|a, b| {
                let ord = compare_by(column, a, b);
                match direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
        }
        sorted
    }
}

fn compare_by(column: SortColumn, a: &ElementGroup, b: &ElementGroup) -> Ordering {
    let (qa, qb) = (&a.quantities, &b.quantities);
    match column {
        SortColumn::Tag => compare_labels(&a.tag, &b.tag),
        SortColumn::Count => qa.count.cmp(&qb.count),
        SortColumn::Length => qa.length.total_cmp(&qb.length),
        SortColumn::Area => qa.area.total_cmp(&qb.area),
        SortColumn::Volume => qa.volume.total_cmp(&qb.volume),
        SortColumn::Mass => qa.mass.total_cmp(&qb.mass),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Property, PropertySet};
    use crate::scene::InMemoryScene;
    use serde_json::json;

    fn wall(id: &str, tag: Option<&str>, area: f64) -> MetadataObject {
        let mut obj = MetadataObject::new(id, "IfcWall");
        obj.attributes.insert("ObjectType".into(), json!("Muro 20"));
        if let Some(tag) = tag {
            obj.attributes.insert("Tag".into(), json!(tag));
        }
        obj.property_sets.push(PropertySet {
            id: None,
            name: Some("Qto_WallBaseQuantities".into()),
            properties: vec![Property {
                name: "NetSideArea".into(),
                value: json!(area),
            }],
        });
        obj
    }

    fn no_scene() -> Option<&'static SceneLookup<'static, InMemoryScene>> {
        None
    }

    fn sample_graph() -> MetadataGraph {
        let mut door = MetadataObject::new("d1", "IfcDoor");
        door.attributes.insert("ObjectType".into(), json!("Puerta 82"));
        let storey = MetadataObject::new("s1", "IfcBuildingStorey");
        MetadataGraph::new(
            vec![
                storey,
                wall("w1", Some("M2"), 10.0),
                wall("w2", Some("M1"), 4.0),
                door,
                wall("w3", Some("M2"), 6.0),
                wall("w4", None, 1.5),
            ],
            Vec::new(),
        )
    }

    #[test]
    fn test_groups_sum_per_tag() {
        let report = aggregate(&sample_graph(), no_scene());
        let names: Vec<&str> = report.categories.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["IfcDoor", "IfcWall"]);

        let walls = &report.categories[1].types[0];
        assert_eq!(walls.type_name, "Muro 20");
        let tags: Vec<&str> = walls.groups.iter().map(|g| g.tag.as_str()).collect();
        assert_eq!(tags, vec!["M2", "M1", NO_TAG]);

        let m2 = &walls.groups[0];
        assert_eq!(m2.quantities.count, 2);
        assert_eq!(m2.quantities.area, 16.0);
        assert_eq!(m2.element_ids, vec!["w1".to_string(), "w3".to_string()]);
        // No length/volume/mass signal: each element contributes the default.
        assert_eq!(m2.quantities.length, 2.0);
        assert_eq!(walls.totals.count, 4);
        assert_eq!(walls.totals.area, 21.5);
        assert_eq!(report.total_elements(), 5);
    }

    #[test]
    fn test_spatial_objects_are_skipped() {
        let report = aggregate(&sample_graph(), no_scene());
        assert!(report.categories.iter().all(|c| c.category != "IfcBuildingStorey"));
    }

    #[test]
    fn test_aggregation_is_deterministic() {
        let graph = sample_graph();
        let first = serde_json::to_string(&aggregate(&graph, no_scene())).unwrap();
        for _ in 0..5 {
            assert_eq!(serde_json::to_string(&aggregate(&graph, no_scene())).unwrap(), first);
        }
    }

    #[test]
    fn test_cancelled_pass_returns_error() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        assert_eq!(
            aggregate_cancellable(&sample_graph(), no_scene(), &cancel),
            Err(AggregateError::Cancelled)
        );
    }

    #[test]
    fn test_tag_from_property() {
        let mut obj = MetadataObject::new("x", "IfcWindow");
        obj.property_sets.push(PropertySet {
            id: None,
            name: None,
            properties: vec![Property {
                name: "Marca".into(),
                value: json!({"Value": "V-3"}),
            }],
        });
        assert_eq!(
            element_tag(&obj, &MetadataGraph::default()).as_deref(),
            Some("V-3")
        );
    }

    #[test]
    fn test_sort_is_tri_state() {
        let report = aggregate(&sample_graph(), no_scene());
        let groups = &report.categories[1].types[0].groups;
        let tags = |state: &SortState| -> Vec<String> {
            state.apply(groups).iter().map(|g| g.tag.clone()).collect()
        };

        let mut state = SortState::new();
        let original = tags(&state);

        state.click(SortColumn::Area);
        assert_eq!(tags(&state), vec![NO_TAG, "M1", "M2"]);
        state.click(SortColumn::Area);
        assert_eq!(tags(&state), vec!["M2", "M1", NO_TAG]);
        state.click(SortColumn::Area);
        assert_eq!(state.active(), None);
        assert_eq!(tags(&state), original);
    }

    #[test]
    fn test_switching_columns_sorts_by_second_only() {
        let report = aggregate(&sample_graph(), no_scene());
        let groups = &report.categories[1].types[0].groups;

        let mut state = SortState::new();
        state.click(SortColumn::Area);
        state.click(SortColumn::Tag);
        assert_eq!(
            state.active(),
            Some((SortColumn::Tag, SortDirection::Ascending))
        );
        let tags: Vec<&str> = state.apply(groups).iter().map(|g| g.tag.as_str()).collect();
        assert_eq!(tags, vec!["M1", "M2", NO_TAG]);
    }

    #[test]
    fn test_sort_column_parses_unit_codes() {
        assert_eq!("M2".parse::<SortColumn>(), Ok(SortColumn::Area));
        assert_eq!("Volume".parse::<SortColumn>(), Ok(SortColumn::Volume));
        assert!("price".parse::<SortColumn>().is_err());
    }
}
