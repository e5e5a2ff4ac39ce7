use meshanim_animation_core::{
    AnimError, AnimationMode, Channel, FrameAnimVertex, Interp, Model, Point, Position, Vertex,
};

fn sample(x: f64, interp: Interp) -> FrameAnimVertex {
    FrameAnimVertex::new([x, 0.0, 0.0], interp)
}

/// Two frame animations with allocated storage: `a` (4 frames, slots 0..4)
/// followed by `b` (3 frames, slots 4..7).
fn two_frame_anims() -> Model {
    let mut model = Model::default();
    model.add_vertex(Vertex::new([0.0; 3]));
    model.add_vertex(Vertex::new([1.0, 0.0, 0.0]));
    model.add_point(Point::new("tip", None, [0.0; 3]));

    let a = model.add_animation(AnimationMode::Frame, "a");
    let b = model.add_animation(AnimationMode::Frame, "b");
    model.set_frame_count(a, 4, None).unwrap();
    model.set_frame_count(b, 3, None).unwrap();
    model.set_frame_vertex(a, 1, 0, [1.0, 0.0, 0.0], Interp::Lerp).unwrap();
    model.set_frame_vertex(b, 2, 1, [5.0, 0.0, 0.0], Interp::Step).unwrap();
    model
        .set_keyframe(a, 3, Position::point(0), Channel::Translate, [0.0, 3.0, 0.0], Interp::Lerp)
        .unwrap();
    model.operation_complete("setup");
    model
}

#[test]
fn storage_is_allocated_on_first_sample_write() {
    let model = two_frame_anims();
    assert_eq!(model.animation(0).unwrap().frame0, Some(0));
    assert_eq!(model.animation(1).unwrap().frame0, Some(4));
    assert_eq!(model.frame_store().slots(), 7);
    assert_eq!(model.frame_vertex(0, 1, 0), Some(&sample(1.0, Interp::Lerp)));
    assert_eq!(model.frame_vertex(1, 2, 1), Some(&sample(5.0, Interp::Step)));
    assert!(model.frame_vertex(1, 3, 1).is_none());
    assert!(model.has_frame_data(0) && model.has_frame_data(1));
}

#[test]
fn grow_then_shrink_at_end_restores_everything() {
    let mut model = two_frame_anims();
    let before = model.animation(0).unwrap().clone();

    model.set_frame_count(0, 7, None).unwrap();
    assert_eq!(model.animation(0).unwrap().timetable, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    // The following range moved with the splice.
    assert_eq!(model.animation(1).unwrap().frame0, Some(7));
    assert_eq!(model.frame_vertex(1, 2, 1), Some(&sample(5.0, Interp::Step)));

    model.set_frame_count(0, 4, None).unwrap();
    assert_eq!(model.animation(0), Some(&before));
    assert_eq!(model.animation(1).unwrap().frame0, Some(4));
    assert_eq!(model.frame_vertex(0, 1, 0), Some(&sample(1.0, Interp::Lerp)));
    assert_eq!(model.frame_vertex(1, 2, 1), Some(&sample(5.0, Interp::Step)));
}

#[test]
fn grow_then_shrink_in_the_middle_restores_everything() {
    let mut model = two_frame_anims();
    let before = model.animation(0).unwrap().clone();
    let tip = Position::point(0);

    model.set_frame_count(0, 6, Some(1)).unwrap();
    let times = &model.animation(0).unwrap().timetable;
    assert_eq!(times.len(), 6);
    assert!((times[1] - 1.0 / 3.0).abs() < 1e-12 && (times[2] - 2.0 / 3.0).abs() < 1e-12);
    assert!(model.keyframe(0, 5, tip, Channel::Translate).is_some());
    assert_eq!(model.frame_vertex(0, 3, 0), Some(&sample(1.0, Interp::Lerp)));
    assert!(!model.frame_vertex(0, 1, 0).unwrap().is_present());

    model.set_frame_count(0, 4, Some(1)).unwrap();
    assert_eq!(model.animation(0), Some(&before));
    assert_eq!(model.frame_vertex(0, 1, 0), Some(&sample(1.0, Interp::Lerp)));
}

#[test]
fn resize_requests_outside_the_animation_are_rejected() {
    let mut model = two_frame_anims();
    let err = model.set_frame_count(0, 6, Some(5)).unwrap_err();
    assert!(matches!(err, AnimError::FrameCapacity { at: 5, diff: 2, count: 4, .. }));
    let err = model.set_frame_count(0, 2, Some(3)).unwrap_err();
    assert!(matches!(err, AnimError::FrameCapacity { at: 3, diff: -2, .. }));
    assert!(model.set_frame_count(9, 2, None).is_err());
    assert_eq!(model.anim_frame_count(0), Some(4));
}

#[test]
fn emptying_an_animation_releases_its_range() {
    let mut model = two_frame_anims();
    model.set_frame_count(0, 0, None).unwrap();
    let a = model.animation(0).unwrap();
    assert!(a.frame0.is_none());
    assert!(a.keyframes.is_empty());
    assert_eq!(model.animation(1).unwrap().frame0, Some(0));
    assert_eq!(model.frame_store().slots(), 3);
    assert_eq!(model.frame_vertex(1, 2, 1), Some(&sample(5.0, Interp::Step)));
}

#[test]
fn compat_resize_resets_the_timetable() {
    let mut model = two_frame_anims();
    model.set_anim_frame_time(0, 3, 10.0).unwrap();
    model.set_frame_count_compat(0, 5).unwrap();
    assert_eq!(model.animation(0).unwrap().timetable, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn frame_times_stay_ordered() {
    let mut model = two_frame_anims();
    assert!(matches!(
        model.set_anim_frame_time(0, 2, 0.5),
        Err(AnimError::InvalidTime { .. })
    ));
    model.set_anim_frame_time(0, 2, 1.5).unwrap();
    assert_eq!(model.anim_frame_time(0, 2), Some(1.5));
    assert!(model.set_anim_frame_time(0, 4, 9.0).is_err());

    assert!(model.set_anim_time_frame(0, 2.0).is_err());
    model.set_anim_time_frame(0, 8.0).unwrap();
    assert_eq!(model.anim_time_frame(0), Some(8.0));
    assert!((model.animation(0).unwrap().seconds() - 8.0 / 30.0).abs() < 1e-12);
}

#[test]
fn fps_limits_come_from_config() {
    let mut model = two_frame_anims();
    assert!(matches!(model.set_anim_fps(0, 0.0), Err(AnimError::InvalidFps { .. })));
    assert!(model.set_anim_fps(0, 5000.0).is_err());
    model.set_anim_fps(0, 24.0).unwrap();
    assert_eq!(model.anim_fps(0), Some(24.0));
}

#[test]
fn selection_follows_frames() {
    let mut model = two_frame_anims();
    model.select_anim_frame(0, 2, true).unwrap();
    assert!(model.is_anim_frame_selected(0, 2));
    model.set_frame_count(0, 5, Some(0)).unwrap();
    assert!(model.is_anim_frame_selected(0, 3));
    assert!(!model.is_anim_frame_selected(0, 2));
    model.clear_anim_frame_selection(0).unwrap();
    assert!(!model.is_anim_frame_selected(0, 3));
    assert!(model.select_anim_frame(0, 5, true).is_err());
}

#[test]
fn selection_changes_mark_the_pose_stale() {
    let mut model = two_frame_anims();
    model.validate_anim();
    assert!(!model.pose_is_dirty());
    model.select_anim_frame(0, 1, true).unwrap();
    assert!(model.pose_is_dirty());
    model.operation_complete("select");

    model.validate_anim();
    model.clear_anim_frame_selection(0).unwrap();
    assert!(model.pose_is_dirty());

    model.validate_anim();
    model.undo();
    assert!(model.pose_is_dirty());
    assert!(model.is_anim_frame_selected(0, 1));
}

#[test]
fn sample_requests_follow_keep_and_copy_rules() {
    let mut model = two_frame_anims();
    // Keep on an empty frame borrows the next sample's mode.
    model.set_frame_vertex(0, 0, 0, [2.0, 0.0, 0.0], Interp::Keep).unwrap();
    assert_eq!(model.frame_vertex(0, 0, 0), Some(&sample(2.0, Interp::Lerp)));
    // CopyIfAbsent leaves existing samples alone.
    model.set_frame_vertex(0, 1, 0, [0.0; 3], Interp::CopyIfAbsent).unwrap();
    assert_eq!(model.frame_vertex(0, 1, 0), Some(&sample(1.0, Interp::Lerp)));
    // None deletes.
    model.set_frame_vertex(0, 1, 0, [0.0; 3], Interp::None).unwrap();
    assert!(!model.frame_vertex(0, 1, 0).unwrap().is_present());
    assert!(matches!(
        model.set_frame_vertex(0, 1, 7, [0.0; 3], Interp::Lerp),
        Err(AnimError::InvalidVertex { vertex: 7 })
    ));
}
