//! Interpolation engine.
//!
//! Keyframe channels and per-vertex frame samples share one algorithm:
//! - `prev` is the latest entry at or before the query time, `next` the
//!   earliest one after it.
//! - Without a `prev`, wrapping animations use the last entry one duration
//!   earlier; others hold the first entry. Without a `next`, wrapping
//!   animations use the first entry one duration later; others hold `prev`.
//! - `Copy` entries resolve to the nearest earlier concrete entry (wrapping
//!   around the end when enabled), or to the base value. `Void` samples
//!   resolve to the base value.
//! - `Lerp` blends from `prev` to `next`; every other mode holds `prev`.

use glam::DMat4;
use serde::{Deserialize, Serialize};

use crate::animation::Animation;
use crate::frame_store::FrameAnimVertex;
use crate::interp::{lerp_vec3, slerp_euler, Vec3};
use crate::keyframe::{Channel, Interp, Keyframe, KeyframeList};
use crate::math::from_trs;

/// Translate/rotate/scale triple. Rotation is Euler XYZ in radians.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trs {
    pub translate: Vec3,
    pub rotate: Vec3,
    pub scale: Vec3,
}

impl Default for Trs {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Trs {
    pub const IDENTITY: Trs = Trs {
        translate: [0.0; 3],
        rotate: [0.0; 3],
        scale: [1.0; 3],
    };

    pub fn new(translate: Vec3, rotate: Vec3, scale: Vec3) -> Self {
        Self {
            translate,
            rotate,
            scale,
        }
    }

    #[inline]
    pub fn channel(&self, channel: Channel) -> Vec3 {
        match channel {
            Channel::Translate => self.translate,
            Channel::Rotate => self.rotate,
            Channel::Scale => self.scale,
        }
    }

    pub fn matrix(&self) -> DMat4 {
        from_trs(self.translate, self.rotate, self.scale)
    }
}

/// Per-channel result. `None` means the channel has no keyframes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Interpolated {
    pub translate: Option<Vec3>,
    pub rotate: Option<Vec3>,
    pub scale: Option<Vec3>,
}

impl Interpolated {
    pub fn channel(&self, channel: Channel) -> Option<Vec3> {
        match channel {
            Channel::Translate => self.translate,
            Channel::Rotate => self.rotate,
            Channel::Scale => self.scale,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.translate.is_none() && self.rotate.is_none() && self.scale.is_none()
    }

    /// Fill missing channels from `base`.
    pub fn or_base(&self, base: &Trs) -> Trs {
        Trs {
            translate: self.translate.unwrap_or(base.translate),
            rotate: self.rotate.unwrap_or(base.rotate),
            scale: self.scale.unwrap_or(base.scale),
        }
    }
}

/// Sparse, frame-ordered entries addressed by frame index.
pub(crate) trait Track {
    fn first(&self) -> Option<usize>;
    fn last(&self) -> Option<usize>;
    /// Latest entry with frame <= `frame`.
    fn at_or_before(&self, frame: usize) -> Option<usize>;
    /// Latest entry with frame < `frame`.
    fn before(&self, frame: usize) -> Option<usize>;
    /// Earliest entry with frame > `frame`.
    fn after(&self, frame: usize) -> Option<usize>;
    fn entry(&self, frame: usize) -> Option<(Interp, Vec3)>;
}

pub(crate) struct KeyTrack<'a>(pub &'a [Keyframe]);

impl Track for KeyTrack<'_> {
    fn first(&self) -> Option<usize> {
        self.0.first().map(Keyframe::frame_index)
    }

    fn last(&self) -> Option<usize> {
        self.0.last().map(Keyframe::frame_index)
    }

    fn at_or_before(&self, frame: usize) -> Option<usize> {
        let idx = self.0.partition_point(|k| k.frame_index() <= frame);
        idx.checked_sub(1).map(|i| self.0[i].frame_index())
    }

    fn before(&self, frame: usize) -> Option<usize> {
        let idx = self.0.partition_point(|k| k.frame_index() < frame);
        idx.checked_sub(1).map(|i| self.0[i].frame_index())
    }

    fn after(&self, frame: usize) -> Option<usize> {
        let idx = self.0.partition_point(|k| k.frame_index() <= frame);
        self.0.get(idx).map(Keyframe::frame_index)
    }

    fn entry(&self, frame: usize) -> Option<(Interp, Vec3)> {
        let idx = self
            .0
            .binary_search_by_key(&frame, Keyframe::frame_index)
            .ok()?;
        let key = &self.0[idx];
        Some((key.interp, key.value))
    }
}

/// One vertex's samples for one animation, indexed by relative frame.
pub(crate) struct SampleTrack<'a>(pub &'a [FrameAnimVertex]);

impl Track for SampleTrack<'_> {
    fn first(&self) -> Option<usize> {
        self.0.iter().position(FrameAnimVertex::is_present)
    }

    fn last(&self) -> Option<usize> {
        self.0.iter().rposition(FrameAnimVertex::is_present)
    }

    fn at_or_before(&self, frame: usize) -> Option<usize> {
        let end = (frame + 1).min(self.0.len());
        self.0[..end].iter().rposition(FrameAnimVertex::is_present)
    }

    fn before(&self, frame: usize) -> Option<usize> {
        let end = frame.min(self.0.len());
        self.0[..end].iter().rposition(FrameAnimVertex::is_present)
    }

    fn after(&self, frame: usize) -> Option<usize> {
        let start = frame + 1;
        self.0
            .get(start..)?
            .iter()
            .position(FrameAnimVertex::is_present)
            .map(|i| start + i)
    }

    fn entry(&self, frame: usize) -> Option<(Interp, Vec3)> {
        self.0
            .get(frame)
            .filter(|s| s.is_present())
            .map(|s| (s.interp, s.coord))
    }
}

/// Time axis of one animation.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Timing<'a> {
    pub times: &'a [f64],
    pub wrap: bool,
    pub duration: f64,
}

impl<'a> Timing<'a> {
    pub fn of(anim: &'a Animation) -> Self {
        Self {
            times: &anim.timetable,
            wrap: anim.wrap,
            duration: anim.wrap_duration(),
        }
    }

    fn wraps(&self) -> bool {
        self.wrap && self.duration > 0.0
    }

    fn time_of(&self, frame: usize) -> f64 {
        self.times.get(frame).copied().unwrap_or(0.0)
    }

    /// Normalized query time and the last frame at or before it.
    fn locate(&self, hint: usize, time: f64) -> (f64, Option<usize>) {
        let time = if self.wraps() {
            time.rem_euclid(self.duration)
        } else {
            time
        };
        let t = self.times;
        if hint < t.len() && t[hint] <= time && t.get(hint + 1).map_or(true, |&n| n > time) {
            return (time, Some(hint));
        }
        (time, t.partition_point(|&x| x <= time).checked_sub(1))
    }
}

/// Value of the entry at `frame` with `Copy` and `Void` resolved.
pub(crate) fn resolve<T: Track>(track: &T, frame: usize, wrap: bool, base: Vec3) -> Vec3 {
    let concrete = |f: usize| match track.entry(f) {
        Some((Interp::Void, _)) => Some(base),
        Some((interp, value)) if interp.is_concrete() => Some(value),
        _ => None,
    };
    if let Some(v) = concrete(frame) {
        return v;
    }
    let mut cur = frame;
    while let Some(f) = track.before(cur) {
        if let Some(v) = concrete(f) {
            return v;
        }
        cur = f;
    }
    if wrap {
        let mut cur = track.last();
        while let Some(f) = cur.filter(|&f| f > frame) {
            if let Some(v) = concrete(f) {
                return v;
            }
            cur = track.before(f);
        }
    }
    base
}

/// Mode a `Keep` write borrows: the next `Step`/`Lerp` entry after `frame`,
/// then (when wrapping) the first one from the start, else `Lerp`.
pub(crate) fn next_concrete_mode<T: Track>(track: &T, frame: usize, wrap: bool) -> Interp {
    let mode_at = |f: usize| match track.entry(f) {
        Some((interp @ (Interp::Step | Interp::Lerp), _)) => Some(interp),
        _ => None,
    };
    let mut cur = track.after(frame);
    while let Some(f) = cur {
        if let Some(interp) = mode_at(f) {
            return interp;
        }
        cur = track.after(f);
    }
    if wrap {
        let mut cur = track.first();
        while let Some(f) = cur.filter(|&f| f < frame) {
            if let Some(interp) = mode_at(f) {
                return interp;
            }
            cur = track.after(f);
        }
    }
    Interp::Lerp
}

/// Evaluate a track at `time`. `None` when the track is empty.
pub(crate) fn sample_track<T: Track>(
    track: &T,
    timing: &Timing<'_>,
    hint: usize,
    time: f64,
    base: Vec3,
    blend: fn(Vec3, Vec3, f64) -> Vec3,
) -> Option<Vec3> {
    let first = track.first()?;
    let last = track.last()?;
    let wrap = timing.wraps();
    let (time, at) = timing.locate(hint, time);

    let found = at.and_then(|f| track.at_or_before(f));
    let (prev, prev_time, next) = match found {
        Some(p) => {
            let next = match track.after(p) {
                Some(n) => Some((n, timing.time_of(n))),
                None if wrap => Some((first, timing.time_of(first) + timing.duration)),
                None => None,
            };
            (p, timing.time_of(p), next)
        }
        None if wrap => (
            last,
            timing.time_of(last) - timing.duration,
            Some((first, timing.time_of(first))),
        ),
        None => return Some(resolve(track, first, false, base)),
    };

    let prev_value = resolve(track, prev, wrap, base);
    let interp = track.entry(prev).map_or(Interp::Step, |(i, _)| i);
    let Some((next, next_time)) = next.filter(|_| interp == Interp::Lerp) else {
        return Some(prev_value);
    };
    if time <= prev_time || next_time <= prev_time {
        return Some(prev_value);
    }
    let next_value = resolve(track, next, wrap, base);
    if time >= next_time {
        return Some(next_value);
    }
    let t = (time - prev_time) / (next_time - prev_time);
    Some(blend(prev_value, next_value, t))
}

fn blend_for(channel: Channel) -> fn(Vec3, Vec3, f64) -> Vec3 {
    match channel {
        Channel::Rotate => slerp_euler,
        Channel::Translate | Channel::Scale => lerp_vec3,
    }
}

/// Interpolate one channel of a keyframe list.
pub fn interpolate_channel(
    anim: &Animation,
    list: &KeyframeList,
    channel: Channel,
    frame: usize,
    time: f64,
    base: Vec3,
) -> Option<Vec3> {
    sample_track(
        &KeyTrack(list.channel(channel)),
        &Timing::of(anim),
        frame,
        time,
        base,
        blend_for(channel),
    )
}

/// Interpolate all three channels of a keyframe list.
pub fn interpolate_keys(
    anim: &Animation,
    list: &KeyframeList,
    frame: usize,
    time: f64,
    base: &Trs,
) -> Interpolated {
    let ch = |c: Channel| interpolate_channel(anim, list, c, frame, time, base.channel(c));
    Interpolated {
        translate: ch(Channel::Translate),
        rotate: ch(Channel::Rotate),
        scale: ch(Channel::Scale),
    }
}

/// Interpolate one vertex from the animation's slice of its sample array.
pub fn interpolate_samples(
    anim: &Animation,
    samples: &[FrameAnimVertex],
    frame: usize,
    time: f64,
    base: Vec3,
) -> Option<Vec3> {
    sample_track(
        &SampleTrack(samples),
        &Timing::of(anim),
        frame,
        time,
        base,
        lerp_vec3,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::AnimationMode;

    fn approx(a: f64, b: f64, eps: f64) {
        assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
    }

    fn anim(count: usize, wrap: bool) -> Animation {
        let mut a = Animation::new(AnimationMode::Skeletal, "a", 30.0);
        a.timetable = (0..count).map(|i| i as f64).collect();
        a.duration = count as f64;
        a.wrap = wrap;
        a
    }

    fn list(keys: &[(u32, f64, Interp)]) -> KeyframeList {
        let mut l = KeyframeList::new();
        for &(f, x, i) in keys {
            l.insert(Keyframe::new(f, Channel::Translate, [x, 0.0, 0.0], i));
        }
        l
    }

    fn tx(a: &Animation, l: &KeyframeList, time: f64) -> f64 {
        interpolate_channel(a, l, Channel::Translate, 0, time, [0.0; 3]).unwrap()[0]
    }

    #[test]
    fn lerp_between_keys() {
        let a = anim(10, false);
        let l = list(&[(0, 0.0, Interp::Lerp), (9, 10.0, Interp::Lerp)]);
        approx(tx(&a, &l, 4.0), 40.0 / 9.0, 1e-12);
        approx(tx(&a, &l, -3.0), 0.0, 0.0);
        approx(tx(&a, &l, 20.0), 10.0, 0.0);
    }

    #[test]
    fn step_holds_previous() {
        let a = anim(10, false);
        let l = list(&[(2, 1.0, Interp::Step), (6, 5.0, Interp::Lerp)]);
        approx(tx(&a, &l, 5.9), 1.0, 0.0);
        approx(tx(&a, &l, 6.0), 5.0, 0.0);
    }

    #[test]
    fn wrap_blends_across_seam() {
        // Keys at 2 and 8 in a 10-long loop: 9 is a quarter of the way back.
        let a = anim(10, true);
        let l = list(&[(2, 0.0, Interp::Lerp), (8, 4.0, Interp::Lerp)]);
        approx(tx(&a, &l, 9.0), 3.0, 1e-12);
        approx(tx(&a, &l, 0.0), 2.0, 1e-12);
        approx(tx(&a, &l, -1.0), 3.0, 1e-12);
    }

    #[test]
    fn copy_resolves_to_earlier_concrete() {
        let a = anim(10, false);
        let l = list(&[(1, 7.0, Interp::Step), (4, 0.0, Interp::Copy)]);
        approx(tx(&a, &l, 6.0), 7.0, 0.0);
    }

    #[test]
    fn void_sample_resolves_to_base() {
        let a = anim(4, false);
        let samples = [
            FrameAnimVertex::new([2.0, 0.0, 0.0], Interp::Lerp),
            FrameAnimVertex::EMPTY,
            FrameAnimVertex::new([9.0, 9.0, 9.0], Interp::Void),
            FrameAnimVertex::EMPTY,
        ];
        let v = interpolate_samples(&a, &samples, 0, 1.0, [1.0, 1.0, 1.0]).unwrap();
        approx(v[0], 1.5, 1e-12);
        let v = interpolate_samples(&a, &samples, 0, 3.0, [1.0, 1.0, 1.0]).unwrap();
        assert_eq!(v, [1.0, 1.0, 1.0]);
        assert!(interpolate_samples(&a, &[FrameAnimVertex::EMPTY; 4], 0, 1.0, [0.0; 3]).is_none());
    }

    #[test]
    fn stale_hint_is_ignored() {
        let a = anim(10, false);
        let l = list(&[(0, 0.0, Interp::Lerp), (9, 9.0, Interp::Lerp)]);
        let v = interpolate_channel(&a, &l, Channel::Translate, 7, 2.5, [0.0; 3]).unwrap();
        approx(v[0], 2.5, 1e-12);
    }
}
