//! Viewport highlighting of classified ("edited") elements.
//!
//! [`transition`] is pure: it reads the host, never writes it, and returns the
//! list of appearance changes to apply. [`HighlightSynchronizer`] owns the
//! state between transitions and applies the changes.

use crate::aggregate::CancelFlag;
use crate::error::{AggregateError, LoadError};
use crate::model::{ClassificationKey, MetadataGraph};
use crate::resolve::classification_key;
use crate::scene::{Appearance, InMemoryScene, Rgba, SceneHost, SceneLookup};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

/// Classified keys mapped to their chapter id, if any.
pub type EditedKeys = HashMap<ClassificationKey, Option<String>>;

pub const HIGHLIGHT_COLOR: Rgba = [1.0, 0.8, 0.0, 1.0];
pub const ACCEPTED_COLOR: Rgba = [0.2, 0.75, 0.3, 1.0];
pub const PENDING_COLOR: Rgba = [1.0, 0.55, 0.0, 1.0];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HighlightMode {
    #[default]
    Normal,
    Highlight,
    OnlyEdited,
    HideEdited,
    AcceptedBudget,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub highlight: Rgba,
    pub accepted: Rgba,
    pub pending: Rgba,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            highlight: HIGHLIGHT_COLOR,
            accepted: ACCEPTED_COLOR,
            pending: PENDING_COLOR,
        }
    }
}

/// Tells whether a budget chapter has been accepted.
pub trait ChapterAcceptance {
    fn is_accepted(&self, chapter_id: &str) -> bool;
}

impl<F: Fn(&str) -> bool> ChapterAcceptance for F {
    fn is_accepted(&self, chapter_id: &str) -> bool {
        self(chapter_id)
    }
}

/// An element of the loaded model, resolved against the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneElement {
    pub element_id: String,
    pub entity_id: String,
    pub key: ClassificationKey,
}

/// Resolves every element of `graph` to its host entity and classification
/// key. Elements the host does not know are skipped.
#[must_use]
pub fn scene_elements<H: SceneHost + ?Sized>(
    graph: &MetadataGraph,
    lookup: &SceneLookup<'_, H>,
) -> Vec<SceneElement> {
    graph
        .elements()
        .filter_map(|obj| {
            let Some(entity_id) = lookup.entity_id(&obj.id) else {
                tracing::trace!(element = %obj.id, "element not in scene");
                return None;
            };
            Some(SceneElement {
                element_id: obj.id.clone(),
                entity_id,
                key: classification_key(obj, graph),
            })
        })
        .collect()
}

/// Everything a transition needs besides the previous state.
pub struct HighlightInput<'a> {
    pub elements: &'a [SceneElement],
    pub edited: &'a EditedKeys,
    pub acceptance: &'a dyn ChapterAcceptance,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub entity_id: String,
    pub appearance: Appearance,
}

/// What the active mode changed, and what to put back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightState {
    mode: HighlightMode,
    affected: BTreeSet<String>,
    originals: BTreeMap<String, Appearance>,
    edited_entities: HashMap<String, ClassificationKey>,
}

impl HighlightState {
    #[must_use]
    pub fn mode(&self) -> HighlightMode {
        self.mode
    }

    /// Entity ids mutated by the active mode.
    #[must_use]
    pub fn affected(&self) -> &BTreeSet<String> {
        &self.affected
    }

    /// Appearance of `entity_id` before the active mode touched it.
    #[must_use]
    pub fn original(&self, entity_id: &str) -> Option<Appearance> {
        self.originals.get(entity_id).copied()
    }

    /// The classification behind an affected, edited entity.
    #[must_use]
    pub fn edited_key(&self, entity_id: &str) -> Option<&ClassificationKey> {
        self.edited_entities.get(entity_id)
    }
}

fn target_appearance(
    mode: HighlightMode,
    chapter: Option<&Option<String>>,
    original: Appearance,
    acceptance: &dyn ChapterAcceptance,
    palette: &Palette,
) -> Option<Appearance> {
    match (mode, chapter) {
        (HighlightMode::Normal, _)
        | (
            HighlightMode::Highlight | HighlightMode::HideEdited | HighlightMode::AcceptedBudget,
            None,
        ) => None,
        (HighlightMode::Highlight, Some(_)) => Some(Appearance {
            color: palette.highlight,
            ..original
        }),
        (HighlightMode::OnlyEdited, Some(_)) => Some(Appearance {
            visible: true,
            color: palette.highlight,
        }),
        (HighlightMode::OnlyEdited, None) => Some(Appearance {
            visible: false,
            ..original
        }),
        (HighlightMode::HideEdited, Some(_)) => Some(Appearance {
            visible: false,
            ..original
        }),
        (HighlightMode::AcceptedBudget, Some(chapter)) => {
            let accepted = chapter
                .as_deref()
                .is_some_and(|c| acceptance.is_accepted(c));
            Some(Appearance {
                color: if accepted {
                    palette.accepted
                } else {
                    palette.pending
                },
                ..original
            })
        }
    }
}

/// Computes the move from `state` to `mode`.
///
/// The mutation list first restores every element the previous mode touched,
/// then applies the new mode. Originals are taken from the previous state when
/// known, so they never capture a tint applied by an earlier mode.
#[must_use]
pub fn transition<H: SceneHost + ?Sized>(
    state: &HighlightState,
    mode: HighlightMode,
    input: &HighlightInput<'_>,
    palette: &Palette,
    host: &H,
) -> (HighlightState, Vec<Mutation>) {
    let mut mutations: Vec<Mutation> = state
        .originals
        .iter()
        .map(|(entity_id, appearance)| Mutation {
            entity_id: entity_id.clone(),
            appearance: *appearance,
        })
        .collect();

    let mut next = HighlightState {
        mode,
        ..HighlightState::default()
    };

    for element in input.elements {
        if next.originals.contains_key(&element.entity_id) {
            continue;
        }
        let original = match state
            .original(&element.entity_id)
            .or_else(|| host.appearance(&element.entity_id))
        {
            Some(a) => a,
            None => continue,
        };

        let chapter = input.edited.get(&element.key);
        let Some(appearance) =
            target_appearance(mode, chapter, original, input.acceptance, palette)
        else {
            continue;
        };

        next.originals.insert(element.entity_id.clone(), original);
        next.affected.insert(element.entity_id.clone());
        if chapter.is_some() {
            next.edited_entities
                .insert(element.entity_id.clone(), element.key.clone());
        }
        mutations.push(Mutation {
            entity_id: element.entity_id.clone(),
            appearance,
        });
    }

    (next, mutations)
}

/// Owns the highlight state for one rendering host.
#[derive(Debug, Default)]
pub struct HighlightSynchronizer {
    state: HighlightState,
    palette: Palette,
}

impl HighlightSynchronizer {
    #[must_use]
    pub fn new(palette: Palette) -> Self {
        Self {
            state: HighlightState::default(),
            palette,
        }
    }

    /// Picks up a state saved by an earlier synchronizer, so its originals
    /// are restored by the next transition.
    #[must_use]
    pub fn resume(palette: Palette, state: HighlightState) -> Self {
        Self { state, palette }
    }

    #[must_use]
    pub fn into_state(self) -> HighlightState {
        self.state
    }

    #[must_use]
    pub fn state(&self) -> &HighlightState {
        &self.state
    }

    #[must_use]
    pub fn mode(&self) -> HighlightMode {
        self.state.mode
    }

    /// Switches to `mode` and applies the resulting mutations. Returns the
    /// number of mutations applied.
    pub fn set_mode<H: SceneHost + ?Sized>(
        &mut self,
        mode: HighlightMode,
        input: &HighlightInput<'_>,
        host: &mut H,
    ) -> usize {
        self.set_mode_unless_cancelled(mode, input, host, &CancelFlag::new())
            .unwrap_or_default()
    }

    /// Like [`set_mode`](Self::set_mode), but applies nothing and keeps the
    /// current state if `cancel` was raised while the transition was computed.
    pub fn set_mode_unless_cancelled<H: SceneHost + ?Sized>(
        &mut self,
        mode: HighlightMode,
        input: &HighlightInput<'_>,
        host: &mut H,
        cancel: &CancelFlag,
    ) -> Result<usize, AggregateError> {
        let (next, mutations) = transition(&self.state, mode, input, &self.palette, &*host);
        if cancel.is_cancelled() {
            return Err(AggregateError::Cancelled);
        }

        apply(host, &mutations);
        tracing::debug!(?mode, affected = next.affected.len(), "highlight mode applied");
        self.state = next;
        Ok(mutations.len())
    }

    /// Restores every mutated element and returns to [`HighlightMode::Normal`].
    pub fn restore_all<H: SceneHost + ?Sized>(&mut self, host: &mut H) {
        let mutations: Vec<Mutation> = self
            .state
            .originals
            .iter()
            .map(|(entity_id, appearance)| Mutation {
                entity_id: entity_id.clone(),
                appearance: *appearance,
            })
            .collect();
        apply(host, &mutations);
        self.state = HighlightState::default();
    }

    /// Forgets all saved originals without touching the host; the elements
    /// they belonged to are gone with the old model.
    pub fn model_replaced(&mut self) {
        self.state = HighlightState::default();
    }

    /// The classification a click on `entity_id` should inspect, if the
    /// entity is currently highlighted as edited.
    #[must_use]
    pub fn inspect_click(&self, entity_id: &str) -> Option<&ClassificationKey> {
        if !self.state.affected.contains(entity_id) {
            return None;
        }
        self.state.edited_key(entity_id)
    }
}

/// A scene snapshot stored together with the highlight state that produced
/// it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HighlightSnapshot {
    #[serde(flatten)]
    pub scene: InMemoryScene,
    #[serde(default)]
    pub highlight_state: HighlightState,
}

impl HighlightSnapshot {
    /// Loads a snapshot. A plain scene file has an empty highlight state.
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
}

fn apply<H: SceneHost + ?Sized>(host: &mut H, mutations: &[Mutation]) {
    for m in mutations {
        if !host.set_appearance(&m.entity_id, m.appearance) {
            tracing::trace!(entity = %m.entity_id, "entity missing in host");
        }
    }
}
