//! # IFC Takeoff
//!
//! Element classification and quantity take-off for IFC building models.
//!
//! ## Features
//!
//! - Resolve a meaningful type name for elements with generic IFC tags
//! - Measure each element in units, length, area, volume or mass, falling
//!   back to its bounding box when the exporter left quantities out
//! - Aggregate a whole model into category → type → tag groups
//! - Persist user classifications (budget chapter, preferred unit, name)
//! - Drive viewport highlighting of classified elements
//! - Export the take-off to CSV and JSON
//!
//! ## Example
//!
//! ```no_run
//! use ifc_takeoff::aggregate::aggregate;
//! use ifc_takeoff::model::MetadataGraph;
//! use ifc_takeoff::scene::InMemoryScene;
//!
//! let graph = MetadataGraph::load("model.json").expect("Failed to load");
//! let scene = InMemoryScene::load("scene.json").expect("Failed to load");
//! let report = aggregate(&graph, Some(&scene.lookup()));
//! println!("Types: {}", report.total_types());
//! ```

pub mod aggregate;
pub mod classification;
pub mod config;
pub mod error;
pub mod export;
pub mod highlight;
pub mod model;
pub mod normalize;
pub mod resolve;
pub mod scene;
