use crate::model::{MetadataGraph, MetadataObject, Property};
use serde_json::Value;

/// A property as seen by the resolvers, regardless of where it was stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedProperty<'a> {
    pub set_name: Option<&'a str>,
    pub name: &'a str,
    pub value: &'a Value,
}

impl<'a> From<(&'a Property, Option<&'a str>)> for ResolvedProperty<'a> {
    fn from((prop, set_name): (&'a Property, Option<&'a str>)) -> Self {
        Self {
            set_name,
            name: &prop.name,
            value: &prop.value,
        }
    }
}

/// Iterates every property attached to `obj`, in this order: embedded
/// property sets, sets referenced by id through the graph table, then the
/// entries of the `props` bag.
///
/// Ids that do not resolve in the graph are skipped.
pub fn properties<'a>(
    obj: &'a MetadataObject,
    graph: &'a MetadataGraph,
) -> impl Iterator<Item = ResolvedProperty<'a>> + 'a {
    let inline = obj.property_sets.iter();
    let indirect = obj.property_set_ids.iter().filter_map(move |id| {
        let set = graph.property_set(id);
        if set.is_none() {
            tracing::trace!(element = %obj.id, property_set = %id, "unresolved property set");
        }
        set
    });

    let from_sets = inline.chain(indirect).flat_map(|set| {
        let set_name = set.name.as_deref();
        set.properties
            .iter()
            .map(move |p| ResolvedProperty::from((p, set_name)))
    });

    let from_bag = obj
        .props
        .iter()
        .flat_map(|bag| bag.iter())
        .map(|(name, value)| ResolvedProperty {
            set_name: None,
            name,
            value,
        });

    from_sets.chain(from_bag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PropertySet;
    use serde_json::json;

    fn set(id: &str, name: &str, props: &[(&str, Value)]) -> PropertySet {
        PropertySet {
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            properties: props
                .iter()
                .map(|(n, v)| Property {
                    name: (*n).to_string(),
                    value: v.clone(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_both_shapes_feed_one_sequence() {
        let mut obj = MetadataObject::new("w1", "IfcWall");
        obj.property_sets = vec![set("inline", "Pset_WallCommon", &[("IsExternal", json!(true))])];
        obj.property_set_ids = vec!["qto".into(), "missing".into()];
        let mut bag = serde_json::Map::new();
        bag.insert("Marca".into(), json!("M-1"));
        obj.props = Some(bag);

        let graph = MetadataGraph::new(
            vec![obj.clone()],
            vec![set("qto", "Qto_WallBaseQuantities", &[("NetSideArea", json!(12.0))])],
        );

        let names: Vec<&str> = properties(&obj, &graph).map(|p| p.name).collect();
        assert_eq!(names, vec!["IsExternal", "NetSideArea", "Marca"]);

        let qto = properties(&obj, &graph).nth(1).unwrap();
        assert_eq!(qto.set_name, Some("Qto_WallBaseQuantities"));
    }
}
