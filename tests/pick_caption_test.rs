use model_viewer::{
    camera::{Camera, Projection, ndc_from_pixels},
    catalog::DEFAULT_FEATURE,
    cgmath::{Deg, InnerSpace, Point3},
    config::{NO_FEATURE_CAPTION, ViewerConfig},
    data_structures::scene_graph::SurfaceId,
    pick::Ray,
};

use crate::common::test_utils::{RecordingUi, UiCall, headless_model, headless_viewer};

mod common;

const WIDTH: f32 = 800.0;
const HEIGHT: f32 = 600.0;

fn camera_and_projection() -> (Camera, Projection) {
    let config = ViewerConfig::default();
    (
        Camera::from_config(&config.camera, &config.controls),
        Projection::new(WIDTH as u32, HEIGHT as u32, Deg(45.0), 1.0, 1000.0),
    )
}

fn ray_through_pixel(x: f32, y: f32) -> Ray {
    let (camera, projection) = camera_and_projection();
    camera.cast_ray(ndc_from_pixels(x, y, WIDTH, HEIGHT), &projection)
}

fn ray_towards(point: Point3<f32>) -> Ray {
    let (camera, _) = camera_and_projection();
    Ray::new(camera.position, point - camera.position)
}

#[test]
fn clicking_the_model_shows_its_feature() {
    let mut ui = RecordingUi::new();
    let mut viewer = headless_viewer();
    let request = viewer.select("Falcon", &mut ui);
    viewer.complete(request.ticket, Ok(headless_model(&[[0.0; 3]])), &mut ui);

    // the single cube sits at the model offset
    let (camera, projection) = camera_and_projection();
    let centre = camera
        .project_to_screen(Point3::new(0.0, 1.15, -1.0), &projection, WIDTH, HEIGHT)
        .unwrap();
    let hit = viewer.click(&ray_through_pixel(centre.x, centre.y), &mut ui).unwrap();

    let model_surface = viewer.scene().model_root().unwrap().surfaces[0].id;
    assert_eq!(hit.surface, model_surface);
    assert_eq!(ui.caption, DEFAULT_FEATURE);
    assert_eq!(viewer.caption(), Some(DEFAULT_FEATURE));
}

#[test]
fn clicking_the_ground_shows_the_fallback_text() {
    let mut ui = RecordingUi::new();
    let mut viewer = headless_viewer();
    let request = viewer.select("Falcon", &mut ui);
    viewer.complete(request.ticket, Ok(headless_model(&[[0.0; 3]])), &mut ui);

    let hit = viewer.click(&ray_towards(Point3::new(2.0, 0.0, 5.0)), &mut ui).unwrap();
    assert_eq!(hit.surface, SurfaceId::GROUND);
    assert_eq!(ui.caption, NO_FEATURE_CAPTION);
}

#[test]
fn ground_is_pickable_without_a_model() {
    let mut ui = RecordingUi::new();
    let mut viewer = headless_viewer();
    assert!(viewer.click(&ray_through_pixel(400.0, 595.0), &mut ui).is_some());
    assert_eq!(ui.caption, NO_FEATURE_CAPTION);
}

#[test]
fn a_miss_leaves_the_caption_alone() {
    let mut ui = RecordingUi::new();
    let mut viewer = headless_viewer();
    let request = viewer.select("Falcon", &mut ui);
    viewer.complete(request.ticket, Ok(headless_model(&[[0.0; 3]])), &mut ui);
    viewer.click(&ray_towards(Point3::new(0.0, 1.15, -1.0)), &mut ui);
    let calls = ui.calls.len();

    // top of the viewport looks above the horizon
    assert!(viewer.click(&ray_through_pixel(400.0, 2.0), &mut ui).is_none());
    assert_eq!(ui.caption, DEFAULT_FEATURE);
    assert_eq!(ui.calls.len(), calls);
}

#[test]
fn nearest_surface_wins() {
    let mut ui = RecordingUi::new();
    let mut viewer = headless_viewer();
    let request = viewer.select("Adam Head", &mut ui);
    // two cubes on the line of sight, the second one further from the camera
    let (camera, _) = camera_and_projection();
    let towards_target = (Point3::new(0.0, 1.15, -1.0) - camera.position).normalize();
    let near = Point3::new(0.0, 0.0, 0.0) - towards_target * 3.0;
    viewer.complete(
        request.ticket,
        Ok(headless_model(&[[near.x, near.y, near.z], [0.0; 3]])),
        &mut ui,
    );

    let hit = viewer.click(&ray_towards(Point3::new(0.0, 1.15, -1.0)), &mut ui).unwrap();
    let root = viewer.scene().model_root().unwrap();
    assert_eq!(hit.surface, root.surfaces[0].id);
    assert_ne!(hit.surface, root.surfaces[1].id);
}

#[test]
fn caption_is_cleared_on_switch_and_restored_by_click() {
    let mut ui = RecordingUi::new();
    let mut viewer = headless_viewer();
    let request = viewer.select("Falcon", &mut ui);
    viewer.complete(request.ticket, Ok(headless_model(&[[0.0; 3]])), &mut ui);
    viewer.click(&ray_towards(Point3::new(0.0, 1.15, -1.0)), &mut ui);

    let request = viewer.select("Adam Head", &mut ui);
    assert_eq!(ui.caption, "");
    // the old model is gone, so the ray now ends on the ground
    let hit = viewer.click(&ray_towards(Point3::new(0.0, 1.15, -1.0)), &mut ui).unwrap();
    assert_eq!(hit.surface, SurfaceId::GROUND);

    viewer.complete(request.ticket, Ok(headless_model(&[[0.0; 3]])), &mut ui);
    viewer.click(&ray_towards(Point3::new(0.0, 1.15, -1.0)), &mut ui);
    assert_eq!(
        ui.calls.last(),
        Some(&UiCall::SetCaption(DEFAULT_FEATURE.to_string()))
    );
}
