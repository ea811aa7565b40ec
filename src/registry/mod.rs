//! Authoritative board-square → visual-piece map
//!
//! The registry owns every [`VisualPiece`]. Other systems find pieces by
//! board position at the moment they need them and never hold on to a piece
//! across frames, so a removal can never leave a dangling reference behind.
//!
//! At most one piece occupies a square; [`PieceRegistry::spawn`] and
//! [`PieceRegistry::relocate`] refuse to break that.
//!
//! Models come from a [`ModelLibrary`]. When a library cannot resolve a model
//! the registry logs a warning and falls back to a primitive shape, which is
//! always available.

use crate::animation::{ClipSource, ModelAnimator};
use crate::board::{BoardPosition, Faction, PieceArchetype, Placement};
use crate::core::error::{AssetError, RegistryError};
use bevy::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Stable identity of a visual piece for as long as it lives
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect)]
pub struct PieceId(pub u64);

/// Procedural stand-in used when no model is available
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PrimitiveShape {
    Capsule { radius: f32, length: f32 },
    Cylinder { radius: f32, height: f32 },
    Cone { radius: f32, height: f32 },
    Cuboid { size: Vec3 },
    Sphere { radius: f32 },
}

impl PrimitiveShape {
    pub fn for_archetype(archetype: PieceArchetype) -> Self {
        match archetype {
            PieceArchetype::Sovereign => PrimitiveShape::Capsule {
                radius: 0.22,
                length: 0.6,
            },
            PieceArchetype::Caster => PrimitiveShape::Cone {
                radius: 0.28,
                height: 0.85,
            },
            PieceArchetype::Cleric => PrimitiveShape::Cylinder {
                radius: 0.2,
                height: 0.7,
            },
            PieceArchetype::Cavalry => PrimitiveShape::Cuboid {
                size: Vec3::new(0.3, 0.55, 0.45),
            },
            PieceArchetype::Bulwark => PrimitiveShape::Cuboid {
                size: Vec3::new(0.45, 0.6, 0.45),
            },
            PieceArchetype::Skirmisher => PrimitiveShape::Sphere { radius: 0.2 },
        }
    }

    /// Height of the shape above its base
    pub fn height(&self) -> f32 {
        match *self {
            PrimitiveShape::Capsule { radius, length } => length + radius * 2.0,
            PrimitiveShape::Cylinder { height, .. } | PrimitiveShape::Cone { height, .. } => height,
            PrimitiveShape::Cuboid { size } => size.y,
            PrimitiveShape::Sphere { radius } => radius * 2.0,
        }
    }
}

/// What the renderer should draw for a piece
#[derive(Clone, Debug, PartialEq)]
pub enum RenderHandle {
    /// An asset path the renderer loads
    Model { path: PathBuf },
    Primitive(PrimitiveShape),
}

/// A resolved model plus any clips that ship with it
#[derive(Clone, Debug, PartialEq)]
pub struct LoadedModel {
    pub handle: RenderHandle,
    pub clips: Vec<ClipSource>,
}

/// Render/model-loading collaborator
pub trait ModelLibrary: Send + Sync {
    fn load(&self, archetype: PieceArchetype, faction: Faction) -> Result<LoadedModel, AssetError>;
}

/// Always succeeds with a primitive and no clips
#[derive(Debug, Default, Clone, Copy)]
pub struct PrimitiveLibrary;

impl ModelLibrary for PrimitiveLibrary {
    fn load(&self, archetype: PieceArchetype, _faction: Faction) -> Result<LoadedModel, AssetError> {
        Ok(LoadedModel {
            handle: RenderHandle::Primitive(PrimitiveShape::for_archetype(archetype)),
            clips: Vec::new(),
        })
    }
}

/// Looks for `models/<archetype>.glb` under an asset root, with an optional
/// `models/<archetype>.clips.json` listing the clips baked into the model:
///
/// ```json
/// [{ "name": "Armature|Idle", "duration_secs": 2.0 }]
/// ```
#[derive(Debug, Clone)]
pub struct AssetDirLibrary {
    root: PathBuf,
}

impl AssetDirLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ModelLibrary for AssetDirLibrary {
    fn load(&self, archetype: PieceArchetype, _faction: Faction) -> Result<LoadedModel, AssetError> {
        let models = self.root.join("models");
        let model_path = models.join(format!("{}.glb", archetype.name()));
        if !model_path.exists() {
            return Err(AssetError::Missing(model_path));
        }

        let manifest = models.join(format!("{}.clips.json", archetype.name()));
        let clips = if manifest.exists() {
            let text = fs::read_to_string(&manifest).map_err(|source| AssetError::Io {
                path: manifest.clone(),
                source,
            })?;
            serde_json::from_str(&text).map_err(|source| AssetError::Parse {
                path: manifest.clone(),
                source,
            })?
        } else {
            Vec::new()
        };

        Ok(LoadedModel {
            handle: RenderHandle::Model {
                path: PathBuf::from("models").join(format!("{}.glb", archetype.name())),
            },
            clips,
        })
    }
}

/// A piece on the table
#[derive(Clone, Debug)]
pub struct VisualPiece {
    pub id: PieceId,
    pub archetype: PieceArchetype,
    pub faction: Faction,
    pub position: BoardPosition,
    /// Live world transform; tweens write here, the renderer reads it.
    pub transform: Transform,
    /// Material opacity in `[0, 1]`
    pub opacity: f32,
    pub render: RenderHandle,
}

impl VisualPiece {
    /// Transform of a piece standing at rest on `position`
    pub fn resting_transform(position: BoardPosition, faction: Faction) -> Transform {
        Transform::from_translation(position.to_world()).with_rotation(faction.resting_rotation())
    }
}

/// Owns every visual piece, keyed by board square
#[derive(Resource)]
pub struct PieceRegistry {
    pieces: HashMap<BoardPosition, VisualPiece>,
    library: Box<dyn ModelLibrary>,
    next_id: u64,
    revision: u64,
}

impl Default for PieceRegistry {
    fn default() -> Self {
        Self::new(Box::new(PrimitiveLibrary))
    }
}

impl PieceRegistry {
    pub fn new(library: Box<dyn ModelLibrary>) -> Self {
        Self {
            pieces: HashMap::new(),
            library,
            next_id: 1,
            revision: 0,
        }
    }

    /// Creates a piece on an empty square and registers its clips.
    pub fn spawn(
        &mut self,
        archetype: PieceArchetype,
        faction: Faction,
        position: BoardPosition,
        animator: &mut ModelAnimator,
    ) -> Result<PieceId, RegistryError> {
        if self.pieces.contains_key(&position) {
            return Err(RegistryError::Occupied(position));
        }

        let model = self.library.load(archetype, faction).unwrap_or_else(|e| {
            warn!(
                "[REGISTRY] {} {} falls back to a primitive: {}",
                faction, archetype, e
            );
            LoadedModel {
                handle: RenderHandle::Primitive(PrimitiveShape::for_archetype(archetype)),
                clips: Vec::new(),
            }
        });

        let id = PieceId(self.next_id);
        self.next_id += 1;
        animator.register(id, model.clips);

        self.pieces.insert(
            position,
            VisualPiece {
                id,
                archetype,
                faction,
                position,
                transform: VisualPiece::resting_transform(position, faction),
                opacity: 1.0,
                render: model.handle,
            },
        );
        self.revision += 1;
        Ok(id)
    }

    /// Destroys the piece on `position`, if any.
    pub fn remove(
        &mut self,
        position: BoardPosition,
        animator: &mut ModelAnimator,
    ) -> Option<VisualPiece> {
        let piece = self.pieces.remove(&position)?;
        animator.unregister(piece.id);
        self.revision += 1;
        Some(piece)
    }

    /// Moves a piece to an empty square and snaps it to rest there.
    pub fn relocate(&mut self, from: BoardPosition, to: BoardPosition) -> Result<(), RegistryError> {
        if from == to {
            return Ok(());
        }
        if self.pieces.contains_key(&to) {
            return Err(RegistryError::Occupied(to));
        }
        let mut piece = self.pieces.remove(&from).ok_or(RegistryError::Empty(from))?;
        piece.position = to;
        piece.transform.translation = to.to_world();
        self.pieces.insert(to, piece);
        self.revision += 1;
        Ok(())
    }

    /// Replaces every piece with `layout`.
    pub fn populate(&mut self, layout: &[Placement], animator: &mut ModelAnimator) {
        self.clear(animator);
        for placement in layout {
            if let Err(e) = self.spawn(
                placement.archetype,
                placement.faction,
                placement.position,
                animator,
            ) {
                warn!("[REGISTRY] Skipping placement: {}", e);
            }
        }
        info!("[REGISTRY] Board populated with {} pieces", self.pieces.len());
    }

    pub fn clear(&mut self, animator: &mut ModelAnimator) {
        for piece in self.pieces.values() {
            animator.unregister(piece.id);
        }
        self.pieces.clear();
        self.revision += 1;
    }

    pub fn get(&self, position: BoardPosition) -> Option<&VisualPiece> {
        self.pieces.get(&position)
    }

    pub fn get_mut(&mut self, position: BoardPosition) -> Option<&mut VisualPiece> {
        self.pieces.get_mut(&position)
    }

    pub fn find(&self, id: PieceId) -> Option<&VisualPiece> {
        self.pieces.values().find(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VisualPiece> {
        self.pieces.values()
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Bumped on every spawn, removal and relocation
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::ManualClock;
    use crate::board::standard_layout;

    fn sq(name: &str) -> BoardPosition {
        BoardPosition::from_algebraic(name).unwrap()
    }

    fn animator() -> ModelAnimator {
        ModelAnimator::new(Box::new(ManualClock::new()))
    }

    struct ClipLibrary;

    impl ModelLibrary for ClipLibrary {
        fn load(&self, archetype: PieceArchetype, _: Faction) -> Result<LoadedModel, AssetError> {
            if archetype == PieceArchetype::Skirmisher {
                return Err(AssetError::Missing(PathBuf::from("models/skirmisher.glb")));
            }
            Ok(LoadedModel {
                handle: RenderHandle::Model {
                    path: PathBuf::from("models/test.glb"),
                },
                clips: vec![ClipSource::new("Idle", 1.0)],
            })
        }
    }

    #[test]
    fn test_spawn_refuses_occupied_square() {
        let mut registry = PieceRegistry::default();
        let mut animator = animator();
        registry
            .spawn(PieceArchetype::Caster, Faction::Light, sq("d1"), &mut animator)
            .unwrap();
        let err = registry
            .spawn(PieceArchetype::Cleric, Faction::Dark, sq("d1"), &mut animator)
            .unwrap_err();
        assert_eq!(err, RegistryError::Occupied(sq("d1")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_missing_model_falls_back_to_primitive() {
        let mut registry = PieceRegistry::new(Box::new(ClipLibrary));
        let mut animator = animator();
        let pawn = registry
            .spawn(PieceArchetype::Skirmisher, Faction::Light, sq("a2"), &mut animator)
            .unwrap();
        let rook = registry
            .spawn(PieceArchetype::Bulwark, Faction::Light, sq("a1"), &mut animator)
            .unwrap();

        assert_eq!(
            registry.get(sq("a2")).unwrap().render,
            RenderHandle::Primitive(PrimitiveShape::Sphere { radius: 0.2 })
        );
        assert!(!animator.is_registered(pawn));
        assert!(animator.is_registered(rook));
    }

    #[test]
    fn test_relocate_enforces_occupancy() {
        let mut registry = PieceRegistry::default();
        let mut animator = animator();
        registry.populate(&standard_layout(), &mut animator);
        assert_eq!(registry.len(), 32);

        assert_eq!(
            registry.relocate(sq("e2"), sq("d2")),
            Err(RegistryError::Occupied(sq("d2")))
        );
        assert_eq!(
            registry.relocate(sq("e4"), sq("e5")),
            Err(RegistryError::Empty(sq("e4")))
        );

        let id = registry.get(sq("e2")).unwrap().id;
        registry.relocate(sq("e2"), sq("e4")).unwrap();
        let moved = registry.get(sq("e4")).unwrap();
        assert_eq!(moved.id, id);
        assert_eq!(moved.position, sq("e4"));
        assert_eq!(moved.transform.translation, sq("e4").to_world());
        assert!(registry.get(sq("e2")).is_none());
    }

    #[test]
    fn test_remove_unregisters_clips() {
        let mut registry = PieceRegistry::new(Box::new(ClipLibrary));
        let mut animator = animator();
        let id = registry
            .spawn(PieceArchetype::Caster, Faction::Dark, sq("d8"), &mut animator)
            .unwrap();
        let before = registry.revision();
        let removed = registry.remove(sq("d8"), &mut animator).unwrap();
        assert_eq!(removed.id, id);
        assert!(!animator.is_registered(id));
        assert!(registry.revision() > before);
        assert!(registry.remove(sq("d8"), &mut animator).is_none());
    }

    #[test]
    fn test_asset_dir_library() {
        let dir = tempfile::tempdir().unwrap();
        let models = dir.path().join("models");
        fs::create_dir_all(&models).unwrap();
        fs::write(models.join("caster.glb"), b"glTF").unwrap();
        fs::write(
            models.join("caster.clips.json"),
            r#"[{"name":"CastSpell","duration_secs":0.9}]"#,
        )
        .unwrap();
        fs::write(models.join("cleric.glb"), b"glTF").unwrap();
        fs::write(models.join("cleric.clips.json"), "{ not json").unwrap();

        let library = AssetDirLibrary::new(dir.path());
        let caster = library.load(PieceArchetype::Caster, Faction::Light).unwrap();
        assert_eq!(caster.clips, vec![ClipSource::new("CastSpell", 0.9)]);

        assert!(matches!(
            library.load(PieceArchetype::Cleric, Faction::Light),
            Err(AssetError::Parse { .. })
        ));
        assert!(matches!(
            library.load(PieceArchetype::Sovereign, Faction::Light),
            Err(AssetError::Missing(_))
        ));
    }
}
