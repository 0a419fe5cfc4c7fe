//! Integration tests: host-driven bakes
//!
//! Covers attribute output, ground-plane lifecycle across success and
//! failure, and partial failure in multi-object bakes.

mod common;

use std::panic::{catch_unwind, AssertUnwindSafe};

use common::*;
use vertex_ao::ground_plane::GROUND_PLANE_NAME;
use vertex_ao::prelude::*;

fn ground_config() -> BakeConfig {
    BakeConfig::new(32, 1.0).with_ground_plane(true)
}

// ============================================================================
// Attribute output
// ============================================================================

#[test]
fn bake_writes_every_corner() {
    init_logging();
    let scene = Scene::new();
    let id = scene.add_object("sphere", test_sphere());

    let report = bake_object(&scene, id, &BakeConfig::new(16, 1.0)).unwrap();
    let attribute = scene.attribute(id, "VertexPaintTintColor").unwrap();
    assert_eq!(attribute.data().len(), report.corners * 4);
    assert!(attribute.data().chunks_exact(4).all(|c| c[3] == 1.0));
    assert!((report.mean_occlusion - 1.0).abs() < 1e-5);
    assert_eq!(report.query_failures, 0);
}

#[test]
fn rebake_overwrites_previous_values() {
    let scene = Scene::new();
    let id = scene.add_object("floor", test_floor());

    fill_object(&scene, id, ColorTarget::TintColor, [0.2, 0.4, 0.6], None, None).unwrap();
    let filled = scene.attribute(id, "VertexPaintTintColor").unwrap();
    assert_eq!(&filled.data()[..4], &[0.2, 0.4, 0.6, 1.0]);

    bake_object(&scene, id, &BakeConfig::new(8, 1.0)).unwrap();
    let baked = scene.attribute(id, "VertexPaintTintColor").unwrap();
    assert!(baked.data().iter().all(|&c| c == 1.0));
}

// ============================================================================
// Ground plane lifecycle
// ============================================================================

#[test]
fn ground_plane_darkens_underside() {
    let scene = Scene::new();
    let id = scene.add_object("cube", Mesh::cube(1.0));

    let without = bake_object(&scene, id, &BakeConfig::new(64, 1.0)).unwrap();
    let with = bake_object(&scene, id, &ground_config()).unwrap();

    assert!(with.ground_plane);
    assert!(
        with.mean_occlusion < without.mean_occlusion,
        "with {} without {}",
        with.mean_occlusion,
        without.mean_occlusion
    );
}

#[test]
fn ground_plane_darkens_contact_vertex() {
    let scene = Scene::new();
    let mesh = test_sphere().with_transform(Mat4::from_translation(Vec3::new(0.0, 0.0, 2.7)));
    let south = mesh.vertex_count() - 1;
    let ring: Vec<usize> = mesh.vertex_adjacency()[south].iter().map(|&v| v as usize).collect();
    let id = scene.add_object("sphere", mesh.clone());

    bake_object(&scene, id, &BakeConfig::new(64, 1.0).with_ground_plane(true)).unwrap();
    let attribute = scene.attribute(id, "VertexPaintTintColor").unwrap();

    let mut per_vertex = vec![None; mesh.vertex_count()];
    for face in &mesh.faces {
        for (vertex, corner) in face.loops() {
            per_vertex[vertex as usize] = Some(attribute.data()[corner as usize * 4]);
        }
    }
    let pole = per_vertex[south].unwrap();
    assert!(pole < 0.5, "contact vertex {pole}");
    for &v in &ring {
        let ring_value = per_vertex[v].unwrap();
        assert!(pole <= ring_value, "contact vertex {pole} above ring vertex {v} at {ring_value}");
    }
}

#[test]
fn ground_plane_absent_after_success() {
    let scene = Scene::new();
    let id = scene.add_object("cube", Mesh::cube(1.0));
    assert_eq!(scene.find(GROUND_PLANE_NAME), None);

    bake_object(&scene, id, &ground_config()).unwrap();
    assert_eq!(scene.find(GROUND_PLANE_NAME), None);
    assert_eq!(scene.len(), 1);
}

#[test]
fn ground_plane_absent_after_commit_failure() {
    let mut host = FaultyHost::new(Scene::new());
    host.fail_commit = true;
    let id = host.scene.add_object("cube", Mesh::cube(1.0));

    let err = bake_object(&host, id, &ground_config()).unwrap_err();
    assert!(matches!(err, BakeError::Host(_)));
    assert_eq!(host.occluders_added(), 1);
    assert_eq!(host.scene.find(GROUND_PLANE_NAME), None);
    assert_eq!(host.scene.len(), 1);
}

#[test]
fn ground_plane_absent_after_panic_mid_bake() {
    let mut host = FaultyHost::new(Scene::new());
    host.panic_queries = true;
    let id = host.scene.add_object("cube", Mesh::cube(1.0));

    let outcome = catch_unwind(AssertUnwindSafe(|| bake_object(&host, id, &ground_config())));
    assert!(outcome.is_err());
    assert_eq!(host.occluders_added(), 1);
    assert_eq!(host.scene.find(GROUND_PLANE_NAME), None);
    assert_eq!(host.scene.len(), 1);
    assert!(host.scene.attribute(id, "VertexPaintTintColor").is_none());
}

#[test]
fn ground_plane_absent_after_invalid_mesh() {
    let host = FaultyHost::new(Scene::new());
    let empty = Mesh::new(Vec::new(), Vec::new());
    let id = host.scene.add_object("empty", empty);

    let err = bake_object(&host, id, &ground_config()).unwrap_err();
    assert!(matches!(err, BakeError::InvalidInput(_)));
    assert_eq!(host.occluders_added(), 0);
    assert_eq!(host.scene.len(), 1);
}

#[test]
fn failed_removal_is_not_fatal() {
    init_logging();
    let mut host = FaultyHost::new(Scene::new());
    host.fail_remove = true;
    let id = host.scene.add_object("cube", Mesh::cube(1.0));

    let report = bake_object(&host, id, &ground_config()).unwrap();
    assert!(report.ground_plane);
    // The host refused, so the occluder is still there
    assert!(host.scene.find(GROUND_PLANE_NAME).is_some());
}

#[test]
fn scene_query_failures_count_as_misses() {
    let mut host = FaultyHost::new(Scene::new());
    host.fail_queries = true;
    let id = host.scene.add_object("floor", test_floor());
    host.scene.add_object("roof", test_roof(0.01));

    let report = bake_object(&host, id, &BakeConfig::new(16, 1.0).with_max_distance(100.0)).unwrap();
    assert!(report.query_failures > 0);
    assert!((report.mean_occlusion - 1.0).abs() < 1e-5);
}

// ============================================================================
// Multi-object bakes
// ============================================================================

#[test]
fn partial_failure_keeps_going() {
    init_logging();
    let scene = Scene::new();
    let good_a = scene.add_object("good_a", Mesh::cube(1.0));
    let broken = scene.add_object("broken", Mesh::new(Vec::new(), Vec::new()));
    let good_b = scene.add_object("good_b", test_sphere());
    let removed = scene.add_object("removed", Mesh::cube(1.0));
    scene.remove_object(removed).unwrap();

    let summary = bake_objects(&scene, &[good_a, broken, good_b, removed], &ground_config());

    assert_eq!(summary.succeeded(), 2);
    assert_eq!(summary.failed(), 2);
    assert_eq!(summary.failures[0].object, "broken");
    assert!(matches!(summary.failures[0].error, BakeError::InvalidInput(_)));
    assert!(matches!(summary.failures[1].error, BakeError::UnknownObject(_)));
    assert!(summary.message().contains("2 of 4"));

    assert!(scene.attribute(good_a, "VertexPaintTintColor").is_some());
    assert!(scene.attribute(good_b, "VertexPaintTintColor").is_some());
    assert_eq!(scene.find(GROUND_PLANE_NAME), None);
}

#[test]
fn invalid_config_fails_every_object() {
    let scene = Scene::new();
    let ids = [scene.add_object("a", Mesh::cube(1.0)), scene.add_object("b", Mesh::cube(1.0))];

    let summary = bake_objects(&scene, &ids, &BakeConfig::new(0, 0.5));
    assert_eq!(summary.succeeded(), 0);
    assert!(summary
        .failures
        .iter()
        .all(|f| matches!(f.error, BakeError::InvalidInput(_))));
    assert!(scene.attribute(ids[0], "VertexPaintTintColor").is_none());
}

#[test]
fn config_from_json_drives_bake() {
    let scene = Scene::new();
    let id = scene.add_object("cube", Mesh::cube(1.0));
    let config = BakeConfig::from_json_str(
        r#"{
            "ray_count": 8,
            "strategy": "jittered_normal",
            "target": "VertexPaintBlendParams",
            "grading": { "tint": [0.1, 0.2, 0.3] }
        }"#,
    )
    .unwrap();

    let report = bake_object(&scene, id, &config).unwrap();
    assert_eq!(report.target, ColorTarget::BlendParams);
    assert!(scene.attribute(id, "VertexPaintBlendParams").is_some());
}
