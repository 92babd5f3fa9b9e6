//! The page elements the viewer writes to.
//!
//! The viewer only talks to its surroundings through the [`Ui`] trait: the
//! caption display, the progress indicator and the annotation markers. On
//! the web these are DOM elements ([`DomUi`]); natively they are replaced by
//! log output and the window title ([`LogUi`]).

use cgmath::Point2;

pub trait Ui {
    /// Empties the caption display.
    fn clear_caption(&mut self);
    fn set_caption(&mut self, text: &str);
    /// Hides the progress indicator. It is never shown again.
    fn hide_progress(&mut self);
    /// Screen position of an annotation anchor in pixels, `None` when it cannot be projected.
    fn place_annotation(&mut self, id: &str, position: Option<Point2<f32>>);
}

/// Native stand-in for the page: captions go to the log and the window title.
#[derive(Default)]
pub struct LogUi {
    window: Option<std::sync::Arc<winit::window::Window>>,
    title: String,
}

impl LogUi {
    pub fn new(window: Option<std::sync::Arc<winit::window::Window>>, title: &str) -> Self {
        Self {
            window,
            title: title.to_string(),
        }
    }

    fn show(&self, caption: &str) {
        if let Some(window) = &self.window {
            if caption.is_empty() {
                window.set_title(&self.title);
            } else {
                window.set_title(&format!("{} - {}", self.title, caption));
            }
        }
    }
}

impl Ui for LogUi {
    fn clear_caption(&mut self) {
        self.show("");
    }

    fn set_caption(&mut self, text: &str) {
        log::info!("Feature: {}", text);
        self.show(text);
    }

    fn hide_progress(&mut self) {
        log::debug!("Progress indicator hidden");
    }

    fn place_annotation(&mut self, id: &str, position: Option<Point2<f32>>) {
        log::trace!("Annotation {} at {:?}", id, position);
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::{DomUi, bind_model_dropdown};

#[cfg(target_arch = "wasm32")]
mod web {
    use cgmath::Point2;
    use wasm_bindgen::{JsCast, closure::Closure};
    use winit::event_loop::EventLoopProxy;

    use super::Ui;
    use crate::flow::ViewerEvent;

    pub const FEATURES_ID: &str = "features";
    pub const PROGRESS_ID: &str = "progress-container";
    pub const DROPDOWN_ID: &str = "model-dropdown";

    fn document() -> Option<web_sys::Document> {
        web_sys::window().and_then(|win| win.document())
    }

    /// Writes captions into `#features` and hides `#progress-container`.
    #[derive(Default)]
    pub struct DomUi;

    impl DomUi {
        fn with_element(id: &str, f: impl FnOnce(web_sys::Element)) {
            match document().and_then(|doc| doc.get_element_by_id(id)) {
                Some(element) => f(element),
                None => log::warn!("Element #{} not found", id),
            }
        }
    }

    impl Ui for DomUi {
        fn clear_caption(&mut self) {
            Self::with_element(FEATURES_ID, |element| element.set_inner_html(""));
        }

        fn set_caption(&mut self, text: &str) {
            Self::with_element(FEATURES_ID, |element| element.set_inner_html(text));
        }

        fn hide_progress(&mut self) {
            Self::with_element(PROGRESS_ID, |element| {
                let hidden = element
                    .dyn_into::<web_sys::HtmlElement>()
                    .map_err(|_| wasm_bindgen::JsValue::from_str("not an HtmlElement"))
                    .and_then(|html| html.style().set_property("display", "none"));
                if let Err(e) = hidden {
                    log::warn!("Could not hide #{}: {:?}", PROGRESS_ID, e);
                }
            });
        }

        // The page positions its annotations itself; the projected position is computed but not written.
        fn place_annotation(&mut self, _id: &str, _position: Option<Point2<f32>>) {}
    }

    /// Forwards `change` events of `#model-dropdown` to the event loop.
    pub fn bind_model_dropdown(proxy: EventLoopProxy<ViewerEvent>) {
        let Some(element) = document().and_then(|doc| doc.get_element_by_id(DROPDOWN_ID)) else {
            log::warn!("Element #{} not found, model selection disabled", DROPDOWN_ID);
            return;
        };
        let Ok(select) = element.dyn_into::<web_sys::HtmlSelectElement>() else {
            log::warn!("#{} is not a select element", DROPDOWN_ID);
            return;
        };
        let target = select.clone();
        let on_change = Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
            if let Err(e) = proxy.send_event(ViewerEvent::Select(target.value())) {
                log::error!("Failed to forward model selection: {}", e);
            }
        });
        if let Err(e) =
            select.add_event_listener_with_callback("change", on_change.as_ref().unchecked_ref())
        {
            log::error!("Could not listen on #{}: {:?}", DROPDOWN_ID, e);
        }
        // the listener lives as long as the page
        on_change.forget();
    }
}
