//! Rendering-host boundary.
//!
//! The viewer is a black box exposing, per entity, a visibility flag, a
//! colorize tint and an axis-aligned bounding box. Entity ids in the host and
//! element ids in the metadata graph do not always agree on format, so all
//! id probing is confined to [`SceneLookup`].

use crate::error::LoadError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Separator between a model id and an element id in host entity ids.
pub const DEFAULT_ID_SEPARATOR: &str = "#";

/// RGBA colour with components in `0.0..=1.0`.
pub type Rgba = [f32; 4];

/// Neutral tint the host applies when nothing has been colorized.
pub const DEFAULT_COLOR: Rgba = [1.0, 1.0, 1.0, 1.0];

/// Axis-aligned bounding box `[xmin, ymin, zmin, xmax, ymax, zmax]`; Y is up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 6]", into = "[f64; 6]")]
pub struct Aabb {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl From<[f64; 6]> for Aabb {
    fn from(b: [f64; 6]) -> Self {
        Self {
            min: [b[0], b[1], b[2]],
            max: [b[3], b[4], b[5]],
        }
    }
}

impl From<Aabb> for [f64; 6] {
    fn from(b: Aabb) -> Self {
        [b.min[0], b.min[1], b.min[2], b.max[0], b.max[1], b.max[2]]
    }
}

impl Aabb {
    /// Extents along X, Y (vertical) and Z. Inverted boxes yield zero.
    #[must_use]
    pub fn extents(&self) -> (f64, f64, f64) {
        (
            (self.max[0] - self.min[0]).max(0.0),
            (self.max[1] - self.min[1]).max(0.0),
            (self.max[2] - self.min[2]).max(0.0),
        )
    }
}

/// What the highlight layer reads and writes for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Appearance {
    pub visible: bool,
    pub color: Rgba,
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            visible: true,
            color: DEFAULT_COLOR,
        }
    }
}

/// The rendering host as the engine needs it.
///
/// Methods return `None` for unknown entity ids; callers treat that as an
/// element not (yet) loaded in the viewer.
pub trait SceneHost {
    fn appearance(&self, entity_id: &str) -> Option<Appearance>;

    /// Returns `false` when the entity does not exist.
    fn set_appearance(&mut self, entity_id: &str, appearance: Appearance) -> bool;

    fn aabb(&self, entity_id: &str) -> Option<Aabb>;
}

/// Resolves metadata element ids to host entity ids.
///
/// Tries, in order: the bare id, the id prefixed with the model id, and the id
/// with that prefix stripped.
pub struct SceneLookup<'a, H: SceneHost + ?Sized> {
    host: &'a H,
    model_id: Option<&'a str>,
    separator: &'a str,
}

impl<'a, H: SceneHost + ?Sized> SceneLookup<'a, H> {
    #[must_use]
    pub fn new(host: &'a H, model_id: Option<&'a str>) -> Self {
        Self {
            host,
            model_id,
            separator: DEFAULT_ID_SEPARATOR,
        }
    }

    #[must_use]
    pub fn with_separator(mut self, separator: &'a str) -> Self {
        self.separator = separator;
        self
    }

    #[must_use]
    pub fn host(&self) -> &'a H {
        self.host
    }

    fn variants(&self, element_id: &str) -> Vec<String> {
        let mut ids = vec![element_id.to_string()];
        if let Some(model_id) = self.model_id.filter(|m| !m.is_empty()) {
            let prefix = format!("{model_id}{}", self.separator);
            match element_id.strip_prefix(&prefix) {
                Some(stripped) => ids.push(stripped.to_string()),
                None => ids.push(format!("{prefix}{element_id}")),
            }
        }
        ids
    }

    /// The host entity id for `element_id`, if any variant exists.
    #[must_use]
    pub fn entity_id(&self, element_id: &str) -> Option<String> {
        self.variants(element_id)
            .into_iter()
            .find(|id| self.host.appearance(id).is_some())
    }

    #[must_use]
    pub fn aabb(&self, element_id: &str) -> Option<Aabb> {
        self.variants(element_id)
            .iter()
            .find_map(|id| self.host.aabb(id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneEntity {
    #[serde(default)]
    pub aabb: Option<Aabb>,
    #[serde(flatten)]
    pub appearance: Appearance,
}

/// A host snapshot held in memory; used by the CLI (loaded from JSON) and as a
/// test double.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryScene {
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub entities: BTreeMap<String, SceneEntity>,
}

impl InMemoryScene {
    #[must_use]
    pub fn new(model_id: Option<String>) -> Self {
        Self {
            model_id,
            entities: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, entity_id: impl Into<String>, aabb: Option<Aabb>) {
        self.entities.insert(
            entity_id.into(),
            SceneEntity {
                aabb,
                appearance: Appearance::default(),
            },
        );
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path_ref = path.as_ref();
        let content = std::fs::read_to_string(path_ref).map_err(|source| LoadError::FileRead {
            path: path_ref.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| LoadError::InvalidJson {
            path: path_ref.to_path_buf(),
            source,
        })
    }

    /// A lookup over this scene using its own model id.
    #[must_use]
    pub fn lookup(&self) -> SceneLookup<'_, Self> {
        SceneLookup::new(self, self.model_id.as_deref())
    }
}

impl SceneHost for InMemoryScene {
    fn appearance(&self, entity_id: &str) -> Option<Appearance> {
        self.entities.get(entity_id).map(|e| e.appearance)
    }

    fn set_appearance(&mut self, entity_id: &str, appearance: Appearance) -> bool {
        match self.entities.get_mut(entity_id) {
            Some(entity) => {
                entity.appearance = appearance;
                true
            }
            None => false,
        }
    }

    fn aabb(&self, entity_id: &str) -> Option<Aabb> {
        self.entities.get(entity_id).and_then(|e| e.aabb)
    }
}
