//! Meshanim Animation Core (engine-agnostic)
//!
//! Keyframe and frame-sampled animation for a 3D model editor: skeletal
//! joint keyframes, point and projection keyframes, per-vertex frame samples
//! in a shared frame store, and undoable editing of all of it through
//! [`meshanim_undo_core`].
//!
//! [`Model`] is the entry point. Public mutators validate, edit, and record
//! an [`AnimUndo`] command; callers close an undo step with
//! [`Model::operation_complete`].

pub mod animation;
pub mod config;
pub mod data;
pub mod error;
pub mod frame_store;
pub mod interp;
pub mod keyframe;
pub mod math;
pub mod model;
pub mod partitioned;
pub mod pose;
pub mod position;
pub mod sampling;
pub mod undo;

pub type Result<T> = std::result::Result<T, AnimError>;

// Re-exports for consumers (file-format and viewport layers)
pub use animation::{Animation, AnimationMode, Family};
pub use config::Config;
pub use data::{parse_model_json, Influence, Joint, ModelData, Point, Projection, Vertex};
pub use error::AnimError;
pub use frame_store::{FrameAnimVertex, FrameStore};
pub use interp::{lerp_vec3, slerp_euler, Vec3};
pub use keyframe::{Channel, Interp, Keyframe, KeyframeList};
pub use glam::DMat4;
pub use model::{CurrentAnim, Model};
pub use partitioned::{Partitioned, PartitionedVec};
pub use pose::Pose;
pub use position::{Position, PositionKind};
pub use sampling::{interpolate_channel, interpolate_keys, interpolate_samples, Interpolated, Trs};
pub use undo::AnimUndo;
pub use meshanim_undo_core::{UndoConfig, UndoManager};
