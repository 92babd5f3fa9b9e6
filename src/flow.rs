//! Application event loop.
//!
//! [`App`] drives the viewer from winit events. Model loads and the wasm
//! context creation run asynchronously and report back through the event
//! loop proxy as [`ViewerEvent`]s, so all viewer state is only ever touched
//! on the event loop thread.
//!
//! # Lifecycle
//!
//! Each redraw:
//! 1. Advance the orbit controller and upload the camera uniform
//! 2. Upload pending model transforms
//! 3. Render ground and model
//! 4. Project the annotation anchors
//! 5. Request the next redraw

use std::{fmt::Debug, sync::Arc};

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    camera::ndc_from_pixels,
    config::ViewerConfig,
    context::Context,
    data_structures::scene_graph::ModelRoot,
    render::draw_scene,
    resources::{load_ground, load_model},
    ui::Ui,
    viewer::{LoadRequest, LoadTicket, Viewer},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

const WINDOW_TITLE: &str = "Model Viewer";

/// Events delivered to the event loop from outside winit.
pub enum ViewerEvent {
    /// The asynchronously created state is ready (wasm only, natively creation blocks).
    #[cfg(target_arch = "wasm32")]
    Initialized(Box<AppState>),
    /// A model was picked in the catalog by its display name.
    Select(String),
    Loaded {
        ticket: LoadTicket,
        result: anyhow::Result<ModelRoot>,
    },
}

impl Debug for ViewerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(target_arch = "wasm32")]
            Self::Initialized(_) => f.write_str("Initialized"),
            Self::Select(key) => f.debug_tuple("Select").field(key).finish(),
            Self::Loaded { ticket, result } => f
                .debug_struct("Loaded")
                .field("ticket", ticket)
                .field("ok", &result.is_ok())
                .finish(),
        }
    }
}

/// Everything that exists once the GPU context is up.
pub struct AppState {
    pub(crate) ctx: Context,
    viewer: Viewer,
    ui: Box<dyn Ui>,
    pointer: PhysicalPosition<f64>,
}

impl AppState {
    async fn new(window: Arc<Window>, config: &ViewerConfig) -> anyhow::Result<Self> {
        let ctx = Context::new(window.clone(), config).await?;
        let ground = load_ground(&config.ground, &ctx.device, &ctx.queue, &ctx.material_layout);
        let viewer = Viewer::new(config, ground);

        #[cfg(not(target_arch = "wasm32"))]
        let ui: Box<dyn Ui> = Box::new(crate::ui::LogUi::new(Some(window), WINDOW_TITLE));
        #[cfg(target_arch = "wasm32")]
        let ui: Box<dyn Ui> = {
            let _ = window;
            Box::new(crate::ui::DomUi)
        };

        Ok(Self {
            ctx,
            viewer,
            ui,
            pointer: PhysicalPosition::new(0.0, 0.0),
        })
    }

    fn select(&mut self, key: &str) -> LoadRequest {
        self.viewer.select(key, self.ui.as_mut())
    }

    fn click(&mut self) {
        let ndc = ndc_from_pixels(
            self.pointer.x as f32,
            self.pointer.y as f32,
            self.ctx.config.width as f32,
            self.ctx.config.height as f32,
        );
        let ray = self
            .ctx
            .camera
            .camera
            .cast_ray(ndc, &self.ctx.projection);
        if self.viewer.click(&ray, self.ui.as_mut()).is_none() {
            log::debug!("Click at {:?} hit nothing", self.pointer);
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        // invoke main render loop
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.ctx.is_surface_configured() {
            return Ok(());
        }

        self.ctx.update_camera();
        self.viewer.scene_mut().write_to_buffers(&self.ctx.queue);
        draw_scene(&self.ctx, self.viewer.scene())?;

        let (width, height) = (self.ctx.config.width as f32, self.ctx.config.height as f32);
        self.viewer.update_annotations(
            &self.ctx.camera.camera,
            &self.ctx.projection,
            width,
            height,
            self.ui.as_mut(),
        );
        Ok(())
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<ViewerEvent>,
    config: ViewerConfig,
    state: Option<AppState>,
    initializing: bool,
}

impl App {
    fn new(event_loop: &EventLoop<ViewerEvent>, config: ViewerConfig) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            config,
            state: None,
            initializing: false,
        })
    }

    fn on_initialized(&mut self, mut state: AppState) {
        // Important: Trigger a resize and redraw now that we are initialized
        let size = state.ctx.window.inner_size();
        state.ctx.resize(size.width, size.height);

        #[cfg(target_arch = "wasm32")]
        crate::ui::bind_model_dropdown(self.proxy.clone());

        let request = state.viewer.select_default(state.ui.as_mut());
        self.start_load(&state, request);
        state.ctx.window.request_redraw();
        self.state = Some(state);
    }

    /// Runs `request` in the background; the result arrives as [`ViewerEvent::Loaded`].
    fn start_load(&self, state: &AppState, request: LoadRequest) {
        let device = state.ctx.device.clone();
        let queue = state.ctx.queue.clone();
        let layout = state.ctx.material_layout.clone();
        let asset_root = self.config.asset_root.clone();
        let proxy = self.proxy.clone();

        let load = async move {
            let result = load_model(
                &request.descriptor,
                &request.key,
                &asset_root,
                &device,
                &queue,
                &layout,
            )
            .await;
            if proxy
                .send_event(ViewerEvent::Loaded {
                    ticket: request.ticket,
                    result,
                })
                .is_err()
            {
                log::warn!("Event loop closed before {} finished loading", request.key);
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        self.async_runtime.spawn(load);
        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(load);
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn select_by_number(&self, key: &winit::keyboard::Key) {
        let winit::keyboard::Key::Character(text) = key else {
            return;
        };
        let Some(digit) = text.chars().next().and_then(|c| c.to_digit(10)) else {
            return;
        };
        let Some(state) = self.state.as_ref() else {
            return;
        };
        let Some(name) = (digit as usize)
            .checked_sub(1)
            .and_then(|idx| state.viewer.catalog().by_index(idx))
        else {
            return;
        };
        if let Err(e) = self.proxy.send_event(ViewerEvent::Select(name.to_string())) {
            log::error!("{}", e);
        }
    }
}

impl ApplicationHandler<ViewerEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() || self.initializing {
            return;
        }

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title(WINDOW_TITLE);

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowAttributesExtWebSys;
            window_attributes = window_attributes.with_append(true);
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Cannot create the viewer window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let config = self.config.clone();
        let init_future = async move { AppState::new(window, &config).await };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok(state) => self.on_initialized(state),
                Err(e) => {
                    log::error!(
                        "App initialization failed. Cannot create the main context: {:?}",
                        e
                    );
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            self.initializing = true;
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match init_future.await {
                    Ok(state) => {
                        if proxy
                            .send_event(ViewerEvent::Initialized(Box::new(state)))
                            .is_err()
                        {
                            log::error!("Event loop closed during initialization");
                        }
                    }
                    Err(e) => log::error!(
                        "App initialization failed. Cannot create the main context: {:?}",
                        e
                    ),
                }
            });
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            #[cfg(target_arch = "wasm32")]
            ViewerEvent::Initialized(state) => {
                // This is the message from our wasm `spawn_local`
                self.initializing = false;
                self.on_initialized(*state);
            }
            ViewerEvent::Select(key) => {
                if let Some(mut state) = self.state.take() {
                    let request = state.select(&key);
                    self.start_load(&state, request);
                    self.state = Some(state);
                }
            }
            ViewerEvent::Loaded { ticket, result } => {
                if let Some(state) = &mut self.state {
                    state.viewer.complete(ticket, result, state.ui.as_mut());
                }
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        #[cfg(not(target_arch = "wasm32"))]
        if let WindowEvent::KeyboardInput {
            event: key_event, ..
        } = &event
        {
            if key_event.state == ElementState::Pressed && !key_event.repeat {
                self.select_by_number(&key_event.logical_key);
            }
        }

        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        let viewport_height = state.ctx.viewport_height();
        state
            .ctx
            .camera
            .controller
            .handle_window_events(&event, viewport_height);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.ctx.resize(size.width, size.height),
            WindowEvent::CursorMoved { position, .. } => state.pointer = position,
            WindowEvent::MouseInput {
                state: ElementState::Released,
                button: MouseButton::Left,
                ..
            } => state.click(),
            WindowEvent::RedrawRequested => match state.render() {
                Ok(_) => {}
                // Reconfigure the surface if it's lost or outdated
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    let size = state.ctx.window.inner_size();
                    state.ctx.resize(size.width, size.height);
                }
                Err(e) => {
                    log::error!("Unable to render {}", e);
                }
            },
            _ => {}
        }
    }
}

/// Opens the viewer window and runs until it is closed.
pub fn run(config: ViewerConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    log::info!(
        "Starting viewer with models {:?}",
        config.catalog.keys().collect::<Vec<_>>()
    );

    let event_loop: EventLoop<ViewerEvent> = EventLoop::with_user_event().build()?;
    let app = App::new(&event_loop, config)?;

    #[cfg(not(target_arch = "wasm32"))]
    {
        let mut app = app;
        event_loop.run_app(&mut app)?;
    }

    #[cfg(target_arch = "wasm32")]
    {
        use winit::platform::web::EventLoopExtWebSys;
        event_loop.spawn_app(app);
    }

    Ok(())
}
