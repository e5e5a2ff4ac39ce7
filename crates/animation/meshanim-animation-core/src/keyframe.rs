//! Keyframe records and the per-Position keyframe list.

use serde::{Deserialize, Serialize};

use crate::interp::Vec3;

/// Interpolation mode of a keyframe or frame sample.
///
/// Stored on keyframes: `Step`, `Lerp`, `Copy`.
/// Stored on frame samples: those plus `None` (no sample at this frame) and
/// `Void` (sample that resolves to the base mesh coordinate).
/// Request-only, never stored: `Keep` and `CopyIfAbsent`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interp {
    /// No data. Passing it to a setter deletes the keyframe/sample.
    #[default]
    None,
    /// Hold this value until the next keyframe.
    Step,
    /// Blend towards the next keyframe.
    Lerp,
    /// Placeholder for the nearest earlier concrete keyframe's value. Holds.
    Copy,
    /// Frame samples only: the base mesh coordinate. Holds.
    Void,
    /// Keep the existing mode and only change the value.
    Keep,
    /// Write as `Copy` unless something already exists at this frame.
    CopyIfAbsent,
}

impl Interp {
    /// True for modes that may be stored on a keyframe.
    #[inline]
    pub fn is_keyframe_mode(self) -> bool {
        matches!(self, Interp::Step | Interp::Lerp | Interp::Copy)
    }

    /// True for modes that may be stored on a frame sample.
    #[inline]
    pub fn is_sample_mode(self) -> bool {
        matches!(
            self,
            Interp::None | Interp::Step | Interp::Lerp | Interp::Copy | Interp::Void
        )
    }

    /// Present and carrying its own value (a Copy source).
    #[inline]
    pub fn is_concrete(self) -> bool {
        matches!(self, Interp::Step | Interp::Lerp | Interp::Void)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Channel {
    Translate,
    Rotate,
    Scale,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Translate, Channel::Rotate, Channel::Scale];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// One keyframe of one channel of one Position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub frame: u32,
    pub channel: Channel,
    pub value: Vec3,
    pub interp: Interp,
}

impl Keyframe {
    pub fn new(frame: u32, channel: Channel, value: Vec3, interp: Interp) -> Self {
        Self {
            frame,
            channel,
            value,
            interp,
        }
    }

    #[inline]
    pub fn frame_index(&self) -> usize {
        self.frame as usize
    }
}

/// Keyframes of one Position, kept sorted by frame within each channel.
///
/// Serialized as a single frame-sorted list of [`Keyframe`] records.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Keyframe>", into = "Vec<Keyframe>")]
pub struct KeyframeList {
    channels: [Vec<Keyframe>; 3],
}

impl From<Vec<Keyframe>> for KeyframeList {
    fn from(keys: Vec<Keyframe>) -> Self {
        let mut list = KeyframeList::default();
        for key in keys {
            list.insert(key);
        }
        list
    }
}

impl From<KeyframeList> for Vec<Keyframe> {
    fn from(list: KeyframeList) -> Self {
        let mut keys: Vec<Keyframe> = list.channels.into_iter().flatten().collect();
        keys.sort_by_key(|k| (k.frame, k.channel));
        keys
    }
}

impl KeyframeList {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn channel(&self, channel: Channel) -> &[Keyframe] {
        &self.channels[channel.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.channels.iter().all(Vec::is_empty)
    }

    pub fn len(&self) -> usize {
        self.channels.iter().map(Vec::len).sum()
    }

    /// All keyframes, channel by channel.
    pub fn iter(&self) -> impl Iterator<Item = &Keyframe> {
        self.channels.iter().flatten()
    }

    /// Binary search for `frame` in `channel`.
    #[inline]
    pub fn find(&self, frame: u32, channel: Channel) -> Result<usize, usize> {
        self.channels[channel.index()].binary_search_by_key(&frame, |k| k.frame)
    }

    pub fn get(&self, frame: u32, channel: Channel) -> Option<&Keyframe> {
        let idx = self.find(frame, channel).ok()?;
        self.channels[channel.index()].get(idx)
    }

    /// Insert, replacing any keyframe on the same frame and channel.
    pub fn insert(&mut self, key: Keyframe) -> Option<Keyframe> {
        let list = &mut self.channels[key.channel.index()];
        match list.binary_search_by_key(&key.frame, |k| k.frame) {
            Ok(idx) => Some(std::mem::replace(&mut list[idx], key)),
            Err(idx) => {
                list.insert(idx, key);
                None
            }
        }
    }

    pub fn remove(&mut self, frame: u32, channel: Channel) -> Option<Keyframe> {
        let idx = self.find(frame, channel).ok()?;
        Some(self.channels[channel.index()].remove(idx))
    }

    /// Shift every keyframe at or after `at` by `count` frames.
    pub(crate) fn open_gap(&mut self, at: u32, count: u32) {
        for key in self.channels.iter_mut().flatten() {
            if key.frame >= at {
                key.frame += count;
            }
        }
    }

    /// Remove keyframes in `[at, at + count)` and shift later ones down.
    /// Removed keyframes are returned with frames relative to `at`.
    pub(crate) fn close_gap(&mut self, at: u32, count: u32) -> Vec<Keyframe> {
        let mut removed = Vec::new();
        for list in &mut self.channels {
            list.retain_mut(|key| {
                if key.frame < at {
                    true
                } else if key.frame < at + count {
                    let mut k = key.clone();
                    k.frame -= at;
                    removed.push(k);
                    false
                } else {
                    key.frame -= count;
                    true
                }
            });
        }
        removed
    }

    /// Recompute every `Copy` keyframe of `channel` from the nearest earlier
    /// concrete keyframe. Without one, wrapping animations use the last
    /// concrete keyframe of the channel and others use `base`.
    pub(crate) fn reset_copy_chain(&mut self, channel: Channel, wrap: bool, base: Vec3) {
        let list = &mut self.channels[channel.index()];
        let mut source = if wrap {
            list.iter()
                .rev()
                .find(|k| k.interp != Interp::Copy)
                .map(|k| k.value)
        } else {
            None
        };
        for key in list.iter_mut() {
            if key.interp == Interp::Copy {
                key.value = source.unwrap_or(base);
            } else {
                source = Some(key.value);
            }
        }
    }
}
