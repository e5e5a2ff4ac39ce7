//! Interpolation hot paths: keyframe lookup, vertex samples and the pose cache.
//!
//! Run with: cargo bench -p meshanim-animation-core

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use meshanim_animation_core::{AnimationMode, Channel, Interp, Joint, Model, Position, Vertex};

/// A chain of `joints` joints keyed on every frame, plus a frame animation
/// sampling `joints` vertices.
fn build_model(joints: usize, frames: usize) -> Model {
    let mut model = Model::default();
    for j in 0..joints {
        let parent = j.checked_sub(1);
        model.add_joint(Joint::new(format!("j{j}"), parent, [0.0, 1.0, 0.0]));
        model.add_vertex(Vertex::bound([0.0, j as f64, 0.0], j));
    }

    let skel = model.add_animation(AnimationMode::Skeletal, "walk");
    model.set_frame_count(skel, frames, None).ok();
    for j in 0..joints {
        let pos = Position::joint(j as u32);
        for f in 0..frames {
            let phase = (f + j) as f64 * 0.1;
            model
                .set_keyframe(skel, f, pos, Channel::Rotate, [0.0, 0.0, phase.sin()], Interp::Lerp)
                .ok();
            if f % 4 == 0 {
                model
                    .set_keyframe(skel, f, pos, Channel::Translate, [0.0, 1.0, phase], Interp::Step)
                    .ok();
            }
        }
    }

    let frame = model.add_animation(AnimationMode::Frame, "morph");
    model.set_frame_count(frame, frames, None).ok();
    for v in 0..joints {
        for f in (0..frames).step_by(2) {
            model
                .set_frame_vertex(frame, f, v, [f as f64, v as f64, 0.0], Interp::Lerp)
                .ok();
        }
    }
    model.clear_history();
    model
}

fn sample_times(model: &Model, anim: usize, steps: usize) -> Vec<(usize, f64)> {
    let Some(a) = model.animation(anim) else {
        return Vec::new();
    };
    let span = a.wrap_duration();
    (0..steps)
        .map(|i| {
            let t = span * i as f64 / steps as f64;
            (a.frame_at_time(t).unwrap_or(0), t)
        })
        .collect()
}

fn bench_keyframes(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpolate_keys");
    for &frames in &[16usize, 128, 1024] {
        let model = build_model(8, frames);
        let anim = model.animation_index(AnimationMode::Skeletal, 0).unwrap_or(0);
        let times = sample_times(&model, anim, 256);
        group.bench_with_input(BenchmarkId::from_parameter(frames), &times, |b, times| {
            b.iter(|| {
                for &(frame, t) in times {
                    black_box(model.interpolate(anim, frame, t, Position::joint(3)));
                }
            });
        });
    }
    group.finish();
}

fn bench_samples(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpolate_vertex");
    for &frames in &[16usize, 128, 1024] {
        let model = build_model(8, frames);
        let anim = model.animation_index(AnimationMode::Frame, 0).unwrap_or(0);
        let times = sample_times(&model, anim, 256);
        group.bench_with_input(BenchmarkId::from_parameter(frames), &times, |b, times| {
            b.iter(|| {
                for &(frame, t) in times {
                    black_box(model.interpolate_vertex(anim, frame, t, 5));
                }
            });
        });
    }
    group.finish();
}

fn bench_pose(c: &mut Criterion) {
    let mut model = build_model(32, 128);
    model.set_current_animation(AnimationMode::Skeletal, 0);
    let mut step = 0u32;
    c.bench_function("validate_anim", |b| {
        b.iter(|| {
            step = (step + 1) % 128;
            model.set_current_animation_frame(step as usize).ok();
            black_box(model.validate_anim().joint_abs.len());
        });
    });
}

criterion_group!(benches, bench_keyframes, bench_samples, bench_pose);
criterion_main!(benches);
