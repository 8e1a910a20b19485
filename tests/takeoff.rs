use pretty_assertions::assert_eq;
use serde_json::json;

use ifc_takeoff::aggregate::{aggregate, aggregate_cancellable, CancelFlag, SortColumn, SortState};
use ifc_takeoff::classification::{
    ClassificationAdapter, MemoryClassificationStore, OverrideDraft, Scope,
};
use ifc_takeoff::error::AggregateError;
use ifc_takeoff::highlight::{
    scene_elements, HighlightInput, HighlightMode, HighlightSnapshot, HighlightSynchronizer,
    Palette, ACCEPTED_COLOR, HIGHLIGHT_COLOR,
};
use ifc_takeoff::model::{ClassificationKey, MetadataGraph, UnitKind, NO_TAG};
use ifc_takeoff::scene::{Appearance, InMemoryScene, SceneHost};

fn graph() -> MetadataGraph {
    MetadataGraph::from_json(
        &json!({
            "id": "m1",
            "metaObjects": [
                {"id": "p", "type": "IfcProject", "name": "Vivienda"},
                {"id": "s", "type": "IfcBuildingStorey", "name": "Planta 1"},
                {"id": "w1", "type": "IfcWall", "ObjectType": "Muro 20", "Tag": "M1",
                 "propertySetIds": ["q1"]},
                {"id": "w2", "type": "IfcWall", "ObjectType": "Muro 20", "Tag": "M1"},
                {"id": "w3", "type": "IfcWall", "ObjectType": "Muro 20"},
                {"id": "d1", "type": "IfcDoor", "name": "Puerta 90"}
            ],
            "propertySets": [
                {"id": "q1", "name": "Qto_WallBaseQuantities",
                 "properties": [{"name": "NetSideArea", "value": 12.0}]}
            ]
        })
        .to_string(),
    )
    .unwrap()
}

fn scene() -> InMemoryScene {
    serde_json::from_value(json!({
        "model_id": "m1",
        "entities": {
            "m1#w1": {},
            "m1#w2": {"aabb": [0.0, 0.0, 0.0, 4.0, 3.0, 0.3]},
            "w3": {"visible": true, "color": [0.5, 0.5, 0.5, 1.0]},
            "m1#d1": {}
        }
    }))
    .unwrap()
}

fn wall_key() -> ClassificationKey {
    ClassificationKey::new("IfcWall", "Muro 20")
}

#[test]
fn report_groups_by_category_type_and_tag() {
    let graph = graph();
    let scene = scene();
    let report = aggregate(&graph, Some(&scene.lookup()));

    let categories: Vec<&str> = report.categories.iter().map(|c| c.category.as_str()).collect();
    assert_eq!(categories, vec!["IfcDoor", "IfcWall"]);
    assert_eq!(report.total_elements(), 4);
    assert_eq!(report.total_types(), 2);

    let walls = report.type_group(&wall_key()).unwrap();
    let tags: Vec<&str> = walls.groups.iter().map(|g| g.tag.as_str()).collect();
    assert_eq!(tags, vec!["M1", NO_TAG]);

    let m1 = &walls.groups[0];
    assert_eq!(m1.element_ids, vec!["w1".to_string(), "w2".to_string()]);
    assert_eq!(m1.quantities.count, 2);
    assert_eq!(m1.quantities.area, 24.0);
    assert_eq!(m1.quantities.mass, 2.0);

    assert_eq!(walls.totals.count, 3);
    assert_eq!(walls.totals.area, 25.0);

    let door = report
        .type_group(&ClassificationKey::new("IfcDoor", "Puerta 90"))
        .unwrap();
    assert_eq!(door.totals.count, 1);
}

#[test]
fn sorting_by_count_is_tri_state() {
    let graph = graph();
    let report = aggregate::<InMemoryScene>(&graph, None);
    let walls = report.type_group(&wall_key()).unwrap();

    let mut sort = SortState::new();
    let tags = |s: &SortState| -> Vec<String> {
        s.apply(&walls.groups).iter().map(|g| g.tag.clone()).collect()
    };

    sort.click(SortColumn::Count);
    assert_eq!(tags(&sort), vec![NO_TAG.to_string(), "M1".to_string()]);
    sort.click(SortColumn::Count);
    assert_eq!(tags(&sort), vec!["M1".to_string(), NO_TAG.to_string()]);
    sort.click(SortColumn::Count);
    assert!(sort.active().is_none());
    assert_eq!(tags(&sort), vec!["M1".to_string(), NO_TAG.to_string()]);
}

#[test]
fn cancelled_aggregation_returns_no_report() {
    let cancel = CancelFlag::new();
    cancel.cancel();
    let result = aggregate_cancellable::<InMemoryScene>(&graph(), None, &cancel);
    assert_eq!(result.unwrap_err(), AggregateError::Cancelled);
}

#[tokio::test]
async fn classify_then_highlight_round() {
    let graph = graph();
    let mut host = scene();
    let adapter = ClassificationAdapter::new(MemoryClassificationStore::new());
    let scope = Scope::project("p1");

    let row = adapter
        .save(
            OverrideDraft::new(wall_key(), UnitKind::Area).in_chapter("04", "02", "07"),
            &scope,
            None,
            &graph,
            Some(&host.lookup()),
        )
        .await
        .unwrap();
    assert_eq!(row.element_count, 3);
    assert_eq!(row.measured_value, 25.0);
    assert_eq!(row.code.as_deref(), Some("04.02.07.001"));

    let edited = adapter.edited_keys(&scope, None).await.unwrap();
    let elements = scene_elements(&graph, &host.lookup());
    let entities: Vec<&str> = elements.iter().map(|e| e.entity_id.as_str()).collect();
    assert_eq!(entities, vec!["m1#w1", "m1#w2", "w3", "m1#d1"]);

    let acceptance = |chapter: &str| chapter == "04";
    let input = HighlightInput {
        elements: &elements,
        edited: &edited,
        acceptance: &acceptance,
    };
    let mut sync = HighlightSynchronizer::new(Palette::default());

    sync.set_mode(HighlightMode::Highlight, &input, &mut host);
    assert_eq!(host.appearance("m1#w1").unwrap().color, HIGHLIGHT_COLOR);
    assert_eq!(host.appearance("m1#d1").unwrap(), Appearance::default());
    assert_eq!(sync.inspect_click("m1#w2"), Some(&wall_key()));
    assert_eq!(sync.inspect_click("m1#d1"), None);

    sync.set_mode(HighlightMode::OnlyEdited, &input, &mut host);
    assert!(!host.appearance("m1#d1").unwrap().visible);
    assert!(host.appearance("w3").unwrap().visible);
    assert_eq!(sync.state().affected().len(), 4);
    assert_eq!(sync.inspect_click("m1#d1"), None);

    sync.set_mode(HighlightMode::AcceptedBudget, &input, &mut host);
    assert_eq!(host.appearance("w3").unwrap().color, ACCEPTED_COLOR);
    assert!(host.appearance("m1#d1").unwrap().visible);

    sync.set_mode(HighlightMode::Normal, &input, &mut host);
    assert_eq!(host.appearance("m1#w1").unwrap(), Appearance::default());
    assert_eq!(
        host.appearance("w3").unwrap(),
        Appearance {
            visible: true,
            color: [0.5, 0.5, 0.5, 1.0],
        }
    );
    assert!(sync.state().affected().is_empty());
}

#[test]
fn separate_runs_restore_through_saved_snapshot() {
    let graph = graph();
    let mut edited = ifc_takeoff::highlight::EditedKeys::new();
    edited.insert(wall_key(), Some("04".to_string()));
    let acceptance = |_: &str| false;
    let path = std::env::temp_dir().join(format!("takeoff-scene-{}.json", std::process::id()));

    let mut snapshot = HighlightSnapshot {
        scene: scene(),
        ..HighlightSnapshot::default()
    };
    let elements = scene_elements(&graph, &snapshot.scene.lookup());
    let input = HighlightInput {
        elements: &elements,
        edited: &edited,
        acceptance: &acceptance,
    };
    let mut sync = HighlightSynchronizer::new(Palette::default());
    sync.set_mode(HighlightMode::Highlight, &input, &mut snapshot.scene);
    snapshot.highlight_state = sync.into_state();
    std::fs::write(&path, serde_json::to_string_pretty(&snapshot).unwrap()).unwrap();

    let mut reloaded = HighlightSnapshot::load(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(reloaded.scene.appearance("w3").unwrap().color, HIGHLIGHT_COLOR);

    let mut sync = HighlightSynchronizer::resume(
        Palette::default(),
        std::mem::take(&mut reloaded.highlight_state),
    );
    let mutations = sync.set_mode(HighlightMode::Normal, &input, &mut reloaded.scene);
    assert_eq!(mutations, 3);
    assert_eq!(reloaded.scene, scene());
}
