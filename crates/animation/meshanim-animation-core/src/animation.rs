//! Animation records and their mode partitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::keyframe::{Channel, Keyframe, KeyframeList};
use crate::partitioned::Partitioned;
use crate::position::{Position, PositionKind};

/// Declaration order is the partition order of the model's animation list.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AnimationMode {
    /// Joint keyframes only.
    Skeletal,
    /// Vertex samples plus point and projection keyframes.
    Frame,
    /// Both families.
    Complex,
}

/// Channel family a Position belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Family {
    Skeletal,
    Frame,
}

impl Family {
    #[inline]
    pub fn of(pos: Position) -> Family {
        match pos.kind {
            PositionKind::Joint => Family::Skeletal,
            PositionKind::Point | PositionKind::Vertex | PositionKind::Projection => Family::Frame,
        }
    }
}

impl AnimationMode {
    pub const ALL: [AnimationMode; 3] = [
        AnimationMode::Skeletal,
        AnimationMode::Frame,
        AnimationMode::Complex,
    ];

    #[inline]
    pub fn has_skeletal(self) -> bool {
        matches!(self, AnimationMode::Skeletal | AnimationMode::Complex)
    }

    #[inline]
    pub fn has_frame(self) -> bool {
        matches!(self, AnimationMode::Frame | AnimationMode::Complex)
    }

    #[inline]
    pub fn supports(self, family: Family) -> bool {
        match family {
            Family::Skeletal => self.has_skeletal(),
            Family::Frame => self.has_frame(),
        }
    }
}

/// One animation. Constructed by [`crate::Model::add_animation`] or
/// externally and installed through [`crate::ModelData`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Animation {
    pub(crate) mode: AnimationMode,
    pub name: String,
    pub fps: f64,
    pub wrap: bool,
    /// Declared total duration in timetable units; may exceed the last entry.
    pub duration: f64,
    /// Frame index to time. Non-decreasing; its length is the frame count.
    pub timetable: Vec<f64>,
    /// Start of this animation's slots in the shared frame store. Only set
    /// for frame-capable animations that have been written to.
    #[serde(default)]
    pub frame0: Option<usize>,
    #[serde(default, with = "keyframe_map")]
    pub keyframes: BTreeMap<Position, KeyframeList>,
    #[serde(default)]
    pub selected_frames: Vec<bool>,
}

impl Partitioned for Animation {
    #[inline]
    fn partition(&self) -> usize {
        self.mode as usize
    }
}

impl Animation {
    pub fn new(mode: AnimationMode, name: impl Into<String>, fps: f64) -> Self {
        Self {
            mode,
            name: name.into(),
            fps,
            wrap: false,
            duration: 0.0,
            timetable: Vec::new(),
            frame0: None,
            keyframes: BTreeMap::new(),
            selected_frames: Vec::new(),
        }
    }

    #[inline]
    pub fn mode(&self) -> AnimationMode {
        self.mode
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.timetable.len()
    }

    #[inline]
    pub fn frame_time(&self, frame: usize) -> Option<f64> {
        self.timetable.get(frame).copied()
    }

    /// Duration used for seam wrapping: the declared duration, or the last
    /// timetable entry when that is later.
    pub fn wrap_duration(&self) -> f64 {
        let last = self.timetable.last().copied().unwrap_or(0.0);
        self.duration.max(last)
    }

    /// Last frame whose time is at or before `time` (frame 0 for earlier times).
    pub fn frame_at_time(&self, time: f64) -> Option<usize> {
        if self.timetable.is_empty() {
            return None;
        }
        let after = self.timetable.partition_point(|&t| t <= time);
        Some(after.saturating_sub(1))
    }

    pub fn keyframe(&self, frame: usize, pos: Position, channel: Channel) -> Option<&Keyframe> {
        let frame = u32::try_from(frame).ok()?;
        self.keyframes.get(&pos)?.get(frame, channel)
    }

    pub fn keyframe_count(&self) -> usize {
        self.keyframes.values().map(KeyframeList::len).sum()
    }

    pub fn has_family_keyframes(&self, family: Family) -> bool {
        self.keyframes
            .iter()
            .any(|(pos, list)| Family::of(*pos) == family && !list.is_empty())
    }

    /// Real-time length in seconds.
    pub fn seconds(&self) -> f64 {
        if self.fps > 0.0 {
            self.wrap_duration() / self.fps
        } else {
            0.0
        }
    }
}

/// Serializes the keyframe map as a list of `{position, keys}` entries so
/// formats with string-only map keys can carry it.
mod keyframe_map {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::keyframe::KeyframeList;
    use crate::position::Position;

    #[derive(Serialize)]
    struct EntryRef<'a> {
        position: &'a Position,
        keys: &'a KeyframeList,
    }

    #[derive(Deserialize)]
    struct Entry {
        position: Position,
        keys: KeyframeList,
    }

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<Position, KeyframeList>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        s.collect_seq(
            map.iter()
                .map(|(position, keys)| EntryRef { position, keys }),
        )
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<BTreeMap<Position, KeyframeList>, D::Error> {
        let entries = Vec::<Entry>::deserialize(d)?;
        Ok(entries
            .into_iter()
            .map(|e| (e.position, e.keys))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyframe::Interp;

    #[test]
    fn frame_lookup_by_time() {
        let mut a = Animation::new(AnimationMode::Skeletal, "walk", 30.0);
        a.timetable = vec![0.0, 1.0, 2.0, 2.0, 5.0];
        assert_eq!(a.frame_at_time(-1.0), Some(0));
        assert_eq!(a.frame_at_time(1.5), Some(1));
        assert_eq!(a.frame_at_time(2.0), Some(3));
        assert_eq!(a.frame_at_time(9.0), Some(4));
        a.duration = 4.0;
        assert_eq!(a.wrap_duration(), 5.0);
    }

    #[test]
    fn modes_and_families() {
        assert!(AnimationMode::Complex.supports(Family::Skeletal));
        assert!(AnimationMode::Complex.supports(Family::Frame));
        assert!(!AnimationMode::Skeletal.supports(Family::Frame));
        assert_eq!(Family::of(Position::projection(0)), Family::Frame);
        assert!(AnimationMode::Skeletal < AnimationMode::Frame);
    }

    #[test]
    fn keyframes_serialize_as_entry_list() {
        let mut a = Animation::new(AnimationMode::Frame, "blink", 24.0);
        a.timetable = vec![0.0, 1.0];
        let mut list = KeyframeList::new();
        let key = Keyframe::new(1, Channel::Translate, [1.0, 2.0, 3.0], Interp::Lerp);
        list.insert(key);
        a.keyframes.insert(Position::point(0), list);

        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["keyframes"][0]["position"]["kind"], "Point");
        let back: Animation = serde_json::from_value(json).unwrap();
        assert_eq!(back, a);
    }
}
