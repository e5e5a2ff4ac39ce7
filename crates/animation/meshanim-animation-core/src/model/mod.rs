//! The document: base data, animations, the shared frame store, the current
//! animation and the edit history.
//!
//! Every public mutator validates its arguments first, then performs the edit
//! through `raw_*` primitives and records the matching [`AnimUndo`] command.
//! Commands replay through the same primitives, so forward edits and
//! undo/redo share one code path.

mod current;
mod frames;
mod keyframes;
mod lifecycle;
mod resample;

use std::ops::Range;

use meshanim_undo_core::{UndoManager, UndoTarget};

use crate::animation::{Animation, AnimationMode};
use crate::config::Config;
use crate::data::{Joint, ModelData, Point, Projection, Vertex};
use crate::error::AnimError;
use crate::frame_store::{shift_start, FrameAnimVertex, FrameStore};
use crate::interp::Vec3;
use crate::partitioned::PartitionedVec;
use crate::pose::{Pose, PoseCache};
use crate::position::{Position, PositionKind};
use crate::sampling::Trs;
use crate::undo::{AnimUndo, UndoOp};
use crate::Result;

pub use current::CurrentAnim;
pub(crate) use frames::{BlockSamples, FrameBlock};

#[derive(Debug)]
pub struct Model {
    cfg: Config,
    pub(crate) joints: Vec<Joint>,
    pub(crate) points: Vec<Point>,
    pub(crate) projections: Vec<Projection>,
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) anims: PartitionedVec<Animation>,
    pub(crate) frames: FrameStore,
    pub(crate) current: Option<CurrentAnim>,
    pub(crate) history: UndoManager<AnimUndo>,
    pub(crate) pose: PoseCache,
}

impl Default for Model {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/// Log a rejected mutation and hand the error back.
pub(crate) fn reject<T>(err: AnimError) -> Result<T> {
    log::warn!("rejected ({}): {err}", err.category());
    Err(err)
}

impl Model {
    pub fn new(cfg: Config) -> Self {
        let history = UndoManager::new(cfg.undo);
        Self {
            cfg,
            joints: Vec::new(),
            points: Vec::new(),
            projections: Vec::new(),
            vertices: Vec::new(),
            anims: PartitionedVec::new(),
            frames: FrameStore::new(),
            current: None,
            history,
            pose: PoseCache::default(),
        }
    }

    /// Install an externally constructed document. No history is recorded.
    pub fn from_data(data: ModelData) -> Result<Self> {
        Self::from_data_with_config(data, Config::default())
    }

    pub fn from_data_with_config(data: ModelData, cfg: Config) -> Result<Self> {
        data.validate_basic()?;
        let ModelData {
            joints,
            points,
            projections,
            vertices,
            animations,
            frames,
        } = data;

        let frames = if frames.is_empty() {
            FrameStore::from_vertices(vec![Vec::new(); vertices.len()])
        } else {
            FrameStore::from_vertices(frames)
        }
        .ok_or_else(|| AnimError::invalid_data("frame store arrays differ in length"))?;
        let anims = PartitionedVec::from_vec(animations)
            .map_err(|_| AnimError::invalid_data("animations are not ordered by mode"))?;

        let mut model = Self::new(cfg);
        model.joints = joints;
        model.points = points;
        model.projections = projections;
        model.vertices = vertices;
        model.anims = anims;
        model.frames = frames;
        for index in 0..model.anims.len() {
            if let Some(a) = model.anim_mut(index) {
                let count = a.frame_count();
                a.selected_frames.resize(count, false);
            }
            model.reset_copy_chains(index);
        }
        log::debug!(
            "installed model: {} animations, {} vertices, {} frame slots",
            model.anims.len(),
            model.vertices.len(),
            model.frames.slots()
        );
        Ok(model)
    }

    /// Export the document in the shape accepted by [`Model::from_data`].
    pub fn to_data(&self) -> ModelData {
        ModelData {
            joints: self.joints.clone(),
            points: self.points.clone(),
            projections: self.projections.clone(),
            vertices: self.vertices.clone(),
            animations: self.anims.as_slice().to_vec(),
            frames: if self.frames.slots() == 0 {
                Vec::new()
            } else {
                self.frames.clone().into_vertices()
            },
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Replace the configuration. History limits apply immediately.
    pub fn set_config(&mut self, cfg: Config) {
        self.history.set_config(cfg.undo);
        self.cfg = cfg;
    }

    // ----- base data (not recorded) -----

    pub fn add_joint(&mut self, joint: Joint) -> usize {
        self.joints.push(joint);
        self.touch();
        self.joints.len() - 1
    }

    pub fn add_point(&mut self, point: Point) -> usize {
        self.points.push(point);
        self.touch();
        self.points.len() - 1
    }

    pub fn add_projection(&mut self, projection: Projection) -> usize {
        self.projections.push(projection);
        self.touch();
        self.projections.len() - 1
    }

    /// Append a vertex; its frame store array starts with empty samples.
    pub fn add_vertex(&mut self, vertex: Vertex) -> usize {
        self.vertices.push(vertex);
        self.frames.push_vertex();
        self.touch();
        self.vertices.len() - 1
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn projections(&self) -> &[Projection] {
        &self.projections
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn frame_store(&self) -> &FrameStore {
        &self.frames
    }

    pub fn position_exists(&self, pos: Position) -> bool {
        let n = match pos.kind {
            PositionKind::Joint => self.joints.len(),
            PositionKind::Point => self.points.len(),
            PositionKind::Vertex => self.vertices.len(),
            PositionKind::Projection => self.projections.len(),
        };
        pos.idx() < n
    }

    /// Un-animated value of a Position. Joint keyframes are relative to the
    /// joint's bind transform, so joints report identity.
    pub fn base_trs(&self, pos: Position) -> Option<Trs> {
        match pos.kind {
            PositionKind::Joint => (pos.idx() < self.joints.len()).then_some(Trs::IDENTITY),
            PositionKind::Point => self
                .points
                .get(pos.idx())
                .map(|p| Trs::new(p.trans, p.rot, p.scale)),
            PositionKind::Projection => self
                .projections
                .get(pos.idx())
                .map(|p| Trs::new(p.trans, p.rot, p.scale)),
            PositionKind::Vertex => self
                .vertices
                .get(pos.idx())
                .map(|v| Trs::new(v.coord, [0.0; 3], [1.0; 3])),
        }
    }

    pub(crate) fn base_coord(&self, vertex: usize) -> Vec3 {
        self.vertices.get(vertex).map_or([0.0; 3], |v| v.coord)
    }

    // ----- animation list -----

    pub fn animation_count(&self) -> usize {
        self.anims.len()
    }

    pub fn animation(&self, anim: usize) -> Option<&Animation> {
        self.anims.get(anim)
    }

    pub fn animations(&self) -> &[Animation] {
        self.anims.as_slice()
    }

    /// Global index range occupied by `mode`.
    pub fn partition_range(&self, mode: AnimationMode) -> Range<usize> {
        self.anims.partition_range(mode as usize)
    }

    /// Global index of the `index`-th animation of `mode`.
    pub fn animation_index(&self, mode: AnimationMode, index: usize) -> Option<usize> {
        let range = self.partition_range(mode);
        let global = range.start.checked_add(index)?;
        (global < range.end).then_some(global)
    }

    pub(crate) fn anim_checked(&self, anim: usize) -> Result<&Animation> {
        match self.anims.get(anim) {
            Some(a) => Ok(a),
            None => reject(AnimError::AnimationNotFound { anim }),
        }
    }

    pub(crate) fn frame_checked(&self, anim: usize, frame: usize) -> Result<&Animation> {
        let a = self.anim_checked(anim)?;
        if frame >= a.frame_count() {
            return reject(AnimError::InvalidFrame {
                anim,
                frame,
                count: a.frame_count(),
            });
        }
        Ok(a)
    }

    /// Mutable access for raw primitives; invalidates the pose cache.
    pub(crate) fn anim_mut(&mut self, anim: usize) -> Option<&mut Animation> {
        self.pose.invalidate();
        self.anims.get_mut(anim)
    }

    #[inline]
    pub(crate) fn touch(&mut self) {
        self.pose.invalidate();
    }

    pub(crate) fn record(&mut self, op: UndoOp) {
        self.history.add(AnimUndo::new(op));
    }

    /// Splice the frame store on behalf of `owner` and shift every other
    /// allocated range that starts after the splice.
    pub(crate) fn splice_store(
        &mut self,
        owner: usize,
        at: usize,
        remove: usize,
        count: usize,
        runs: Vec<Vec<FrameAnimVertex>>,
    ) -> Vec<Vec<FrameAnimVertex>> {
        let removed = self.frames.splice(at, remove, count, runs);
        for (index, a) in self.anims.iter_mut().enumerate() {
            if index == owner {
                continue;
            }
            if let Some(start) = a.frame0.as_mut() {
                *start = shift_start(*start, at, remove, count);
            }
        }
        self.pose.invalidate();
        removed
    }

    // ----- pose cache -----

    /// Recompute the cached pose for the current animation if anything
    /// changed since the last call.
    pub fn validate_anim(&mut self) -> &Pose {
        let key = self.current.map(|c| (c.index, c.frame, c.time));
        if self.pose.needs_update(key) {
            let pose = match self.current {
                Some(c) => crate::pose::evaluate(self, Some(c.index), c.frame, c.time),
                None => crate::pose::evaluate(self, None, 0, 0.0),
            };
            self.pose.store(key, pose);
        }
        self.pose.pose()
    }

    /// Last validated pose; may be stale until [`Model::validate_anim`] runs.
    pub fn pose(&self) -> &Pose {
        self.pose.pose()
    }

    pub fn pose_is_dirty(&self) -> bool {
        self.pose.is_dirty()
    }

    // ----- history -----

    pub fn history(&self) -> &UndoManager<AnimUndo> {
        &self.history
    }

    /// Close the current transaction.
    pub fn operation_complete(&mut self, label: &str) -> bool {
        self.history.operation_complete(label)
    }

    /// Revert the last transaction, committing uncommitted edits first.
    pub fn undo(&mut self) -> Option<String> {
        meshanim_undo_core::undo(self)
    }

    pub fn redo(&mut self) -> Option<String> {
        meshanim_undo_core::redo(self)
    }

    /// Revert and drop the uncommitted edits (UI cancel).
    pub fn undo_current(&mut self) -> bool {
        meshanim_undo_core::undo_current(self)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.history.undo_label()
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.history.redo_label()
    }

    pub fn set_saved(&mut self) {
        self.history.set_saved();
    }

    pub fn is_saved(&self) -> bool {
        self.history.is_saved()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

impl UndoTarget for Model {
    type Command = AnimUndo;

    fn undo_manager(&mut self) -> &mut UndoManager<AnimUndo> {
        &mut self.history
    }
}
