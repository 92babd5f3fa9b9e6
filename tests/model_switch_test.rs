use model_viewer::{
    config::NO_FEATURE_CAPTION,
    catalog::DEFAULT_FEATURE,
    cgmath::Vector3,
    ui::Ui,
    viewer::LoadOutcome,
};

use crate::common::test_utils::{RecordingUi, UiCall, headless_model, headless_viewer};

mod common;

#[test]
fn completed_load_attaches_exactly_one_root() {
    let mut ui = RecordingUi::new();
    let mut viewer = headless_viewer();

    let request = viewer.select("Adam Head", &mut ui);
    assert_eq!(request.key, "Adam Head");
    assert_eq!(request.descriptor.scene_path(), "public/models/adamHead/adamHead.gltf");
    assert!(viewer.scene().model_root().is_none());

    let outcome = viewer.complete(request.ticket, Ok(headless_model(&[[0.0; 3], [2.0, 0.0, 0.0]])), &mut ui);
    assert_eq!(
        outcome,
        LoadOutcome::Attached {
            key: "Adam Head".to_string(),
            surfaces: 2
        }
    );
    assert_eq!(viewer.scene().model_root_count(), 1);
    assert_eq!(viewer.scene().model_root().unwrap().key, "Adam Head");
    assert!(!ui.progress_visible);
    assert_eq!(ui.calls, vec![UiCall::ClearCaption, UiCall::HideProgress]);
}

#[test]
fn switching_replaces_the_previous_root() {
    let mut ui = RecordingUi::new();
    let mut viewer = headless_viewer();

    for key in ["Falcon", "BiWaze", "Adam Head", "Falcon"] {
        let request = viewer.select(key, &mut ui);
        viewer.complete(request.ticket, Ok(headless_model(&[[0.0; 3]])), &mut ui);
        assert_eq!(viewer.scene().model_root_count(), 1);
        assert_eq!(viewer.scene().model_root().unwrap().key, key);
        assert_eq!(viewer.captions().len(), 1);
    }
}

#[test]
fn selection_clears_caption_and_detaches_immediately() {
    let mut ui = RecordingUi::new();
    let mut viewer = headless_viewer();
    let request = viewer.select("Falcon", &mut ui);
    viewer.complete(request.ticket, Ok(headless_model(&[[0.0; 3]])), &mut ui);
    let old_surface = viewer.scene().model_root().unwrap().surfaces[0].id;
    ui.set_caption("stale caption");

    viewer.select("BiWaze", &mut ui);
    assert_eq!(ui.caption, "");
    assert_eq!(viewer.caption(), None);
    assert_eq!(viewer.scene().model_root_count(), 0);
    assert_eq!(viewer.captions().caption_for(old_surface), NO_FEATURE_CAPTION);
}

#[test]
fn stale_completion_is_discarded() {
    let mut ui = RecordingUi::new();
    let mut viewer = headless_viewer();

    let slow = viewer.select("Falcon", &mut ui);
    let fast = viewer.select("Adam Head", &mut ui);

    assert_eq!(
        viewer.complete(fast.ticket, Ok(headless_model(&[[0.0; 3]])), &mut ui),
        LoadOutcome::Attached {
            key: "Adam Head".to_string(),
            surfaces: 1
        }
    );
    assert_eq!(
        viewer.complete(slow.ticket, Ok(headless_model(&[[0.0; 3], [1.0; 3]])), &mut ui),
        LoadOutcome::Stale
    );
    assert_eq!(viewer.scene().model_root_count(), 1);
    assert_eq!(viewer.scene().model_root().unwrap().key, "Adam Head");
    assert_eq!(viewer.scene().model_root().unwrap().surfaces.len(), 1);
}

#[test]
fn stale_completion_before_current_one_never_shows() {
    let mut ui = RecordingUi::new();
    let mut viewer = headless_viewer();

    let slow = viewer.select("Falcon", &mut ui);
    let fast = viewer.select("BiWaze", &mut ui);

    assert_eq!(
        viewer.complete(slow.ticket, Ok(headless_model(&[[0.0; 3]])), &mut ui),
        LoadOutcome::Stale
    );
    assert!(viewer.scene().model_root().is_none());
    assert!(ui.progress_visible);
    assert!(viewer.is_loading());

    viewer.complete(fast.ticket, Ok(headless_model(&[[0.0; 3]])), &mut ui);
    assert_eq!(viewer.scene().model_root().unwrap().key, "BiWaze");
}

#[test]
fn unknown_key_falls_back_to_default() {
    let mut ui = RecordingUi::new();
    let mut viewer = headless_viewer();
    let request = viewer.select("Death Star", &mut ui);
    assert_eq!(request.key, "Falcon");
    assert_eq!(
        request.descriptor.scene_path(),
        "public/models/millennium_falcon/scene1.gltf"
    );
    assert_eq!(viewer.selected_key(), Some("Falcon"));
}

#[test]
fn failed_load_leaves_viewer_usable() {
    let mut ui = RecordingUi::new();
    let mut viewer = headless_viewer();

    let request = viewer.select("BiWaze", &mut ui);
    let outcome = viewer.complete(
        request.ticket,
        Err(anyhow::anyhow!("public/models/export/biwaze.gltf: not found")),
        &mut ui,
    );
    assert_eq!(outcome, LoadOutcome::Failed);
    assert!(viewer.scene().model_root().is_none());
    assert!(ui.progress_visible);
    assert!(!ui.calls.contains(&UiCall::HideProgress));

    let request = viewer.select("Falcon", &mut ui);
    viewer.complete(request.ticket, Ok(headless_model(&[[0.0; 3]])), &mut ui);
    assert_eq!(viewer.scene().model_root_count(), 1);
    assert!(!ui.progress_visible);
}

#[test]
fn attached_root_is_placed_and_captioned() {
    let mut ui = RecordingUi::new();
    let mut viewer = headless_viewer();
    let request = viewer.select("BiWaze", &mut ui);
    viewer.complete(request.ticket, Ok(headless_model(&[[0.0; 3], [3.0, 0.0, 0.0]])), &mut ui);

    let root = viewer.scene().model_root().unwrap();
    assert_eq!(root.transform().position, Vector3::new(0.0, 1.15, -1.0));
    assert_eq!(root.transform().scale, Vector3::new(0.02, 0.02, 0.02));
    for surface in &root.surfaces {
        assert_eq!(viewer.captions().get(surface.id), Some(DEFAULT_FEATURE));
    }
}
