use meshanim_animation_core::math::translation;
use meshanim_animation_core::{parse_model_json, AnimationMode, Model, ModelData};
use meshanim_test_fixtures::models;

fn approx3(a: [f64; 3], b: [f64; 3], eps: f64) {
    for i in 0..3 {
        assert!((a[i] - b[i]).abs() <= eps, "left={a:?} right={b:?} eps={eps}");
    }
}

fn load(name: &str) -> Model {
    let json = models::json(name).expect("fixture json");
    let data = parse_model_json(&json).expect("fixture parses");
    Model::from_data(data).expect("fixture installs")
}

#[test]
fn every_fixture_installs_and_round_trips() {
    assert_eq!(models::keys(), vec!["arm".to_string(), "blink".to_string()]);
    for key in models::keys() {
        let data: ModelData = models::load(&key).unwrap();
        let model = Model::from_data(data.clone()).unwrap();
        assert_eq!(model.to_data(), data, "{key}");
        assert!(!model.can_undo(), "{key}: install must not record history");

        let text = serde_json::to_string(&model.to_data()).unwrap();
        assert_eq!(parse_model_json(&text).unwrap(), data, "{key}");
    }
}

#[test]
fn blink_fixture_interpolates_samples_and_points() {
    let model = load("blink");
    assert_eq!(model.partition_range(AnimationMode::Frame), 0..1);
    assert!(model.is_anim_frame_selected(0, 1));

    let v0 = model.interpolate_vertex(0, 1, 1.0, 0).unwrap();
    approx3(v0, [0.0, 0.5, 0.0], 1e-12);
    // Void holds the base coordinate; the Copy sample resolves to it too.
    let v1 = model.interpolate_vertex(0, 1, 1.5, 1).unwrap();
    approx3(v1, [1.0, 1.0, 0.0], 1e-12);
    let v1 = model.interpolate_vertex(0, 2, 2.0, 1).unwrap();
    approx3(v1, [1.0, 1.0, 0.0], 1e-12);

    let lid = meshanim_animation_core::Position::point(0);
    let trs = model.interpolate_or_base(0, 2, 2.0, lid).unwrap();
    approx3(trs.translate, [0.0, 0.5, 0.0], 1e-12);
    approx3(trs.scale, [1.0, 1.0, 1.0], 0.0);
}

#[test]
fn pose_cache_follows_current_animation() {
    let mut model = load("arm");
    assert!(model.pose_is_dirty());
    let rest = model.validate_anim().clone();
    assert!(!model.pose_is_dirty());
    assert_eq!(rest.anim, None);
    approx3(rest.vertices[1], [0.0, 2.0, 0.0], 1e-12);

    model.set_current_animation(AnimationMode::Skeletal, 0);
    model.set_current_animation_time(1.0).unwrap();
    assert!(model.pose_is_dirty());
    let pose = model.validate_anim().clone();
    assert_eq!(pose.anim, Some(0));
    let bent = [-(0.5f64).sin(), 1.0 + (0.5f64).cos(), 0.0];
    approx3(pose.vertices[1], bent, 1e-9);
    approx3(translation(&pose.points[0]), bent, 1e-9);
    approx3(pose.vertices[0], [0.0; 3], 1e-12);
    assert_eq!(model.pose(), &pose);

    // Wrapped: one duration later is the same pose.
    model.set_current_animation_time(5.0).unwrap();
    let wrapped = model.validate_anim().clone();
    approx3(wrapped.vertices[1], bent, 1e-9);

    model.set_anim_wrap(0, false).unwrap();
    assert!(model.pose_is_dirty());
}

#[test]
fn malformed_documents_are_rejected() {
    let json = models::json("blink").unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
    value["animations"][0]["frame0"] = serde_json::json!(2);
    assert!(parse_model_json(&value.to_string()).is_err());
    assert!(parse_model_json("{ not json").is_err());
}
