//! Core engine implementation
//!
//! [`Engine`] composes the three long-lived pieces and runs the loop:
//!
//! ```text
//! initialize(config) ──▶ run(app) ──▶ shutdown()
//!                          │
//!                          ├─ pump window events
//!                          ├─ app.update(scene, frame)
//!                          ├─ scene.update(dt)          behaviors + draw order
//!                          └─ renderer.render_frame(scene)
//! ```

use std::time::Duration;

use thiserror::Error;

use crate::application::{AppError, Application, FrameContext};
use crate::config::{ApplicationConfig, ConfigError};
use crate::foundation::logging;
use crate::render::vulkan::{FrameOutcome, GlfwWindow, Renderer, VulkanError, WindowError};
use crate::render::window::{BackendKind, Platform};
use crate::scene::SceneCoordinator;

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration rejected before startup
    #[error("Invalid configuration")]
    Config(#[from] ConfigError),

    /// Window or windowing backend failure
    #[error("Window error")]
    Window(#[from] WindowError),

    /// Vulkan failure outside of recoverable swapchain staleness
    #[error("Vulkan error")]
    Vulkan(#[from] VulkanError),

    /// Error returned by the application
    #[error("Application error")]
    Application(#[from] AppError),
}

/// Main engine struct
///
/// Field order is drop order: scene data, then the renderer, then the
/// window whose surface the renderer presents to.
pub struct Engine {
    scene: SceneCoordinator,
    renderer: Renderer,
    window: Box<dyn Platform>,
    config: ApplicationConfig,
    shut_down: bool,
}

impl Engine {
    /// Validate `config`, start logging, open the window and bring up Vulkan.
    ///
    /// Every failure here is fatal for the process.
    pub fn initialize(config: ApplicationConfig) -> Result<Self, EngineError> {
        logging::init(&config.engine.log_level);
        config.validate()?;

        log::info!("Initializing engine...");

        let mut window: Box<dyn Platform> = match config.window.backend {
            BackendKind::Glfw => Box::new(GlfwWindow::new(
                &config.window.title,
                config.window.width,
                config.window.height,
            )?),
        };

        let renderer = Renderer::new(window.as_mut(), &config.renderer)?;

        Ok(Self {
            scene: SceneCoordinator::new(),
            renderer,
            window,
            config,
            shut_down: false,
        })
    }

    /// Configuration the engine was started with
    pub fn config(&self) -> &ApplicationConfig {
        &self.config
    }

    /// Scene being rendered
    pub fn scene(&self) -> &SceneCoordinator {
        &self.scene
    }

    /// Frame synchronizer and Vulkan state
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Surface width over height; 1.0 until a swapchain exists
    pub fn aspect_ratio(&self) -> f32 {
        match self.renderer.surface_extent() {
            Some(extent) if extent.height > 0 => extent.width as f32 / extent.height as f32,
            _ => 1.0,
        }
    }

    /// Build the swapchain, let `app` populate the scene, then loop until
    /// the window asks to quit.
    pub fn run(&mut self, app: &mut dyn Application) -> Result<(), EngineError> {
        // A minimized window has nothing to build against yet
        while !self.renderer.rebuild(self.window.as_ref(), &mut self.scene)? {
            self.window.pump_events();
            if self.window.is_quit_requested() {
                return Ok(());
            }
            std::thread::sleep(Duration::from_millis(16));
        }

        app.setup(&mut self.scene, &mut self.renderer.resource_factory())?;
        log::info!("Scene ready with {} entities, starting main loop", self.scene.len());

        loop {
            self.window.pump_events();
            if self.window.is_quit_requested() {
                break;
            }
            if self.window.take_resized() {
                self.renderer.request_rebuild();
            }

            let aspect_ratio = self.aspect_ratio();
            let input = self.window.input();
            let frame = FrameContext {
                input,
                delta_time: input.frame_time(),
                aspect_ratio,
            };
            app.update(&mut self.scene, &frame)?;
            self.scene.update(frame.delta_time);

            match self.renderer.render_frame(self.window.as_ref(), &mut self.scene)? {
                FrameOutcome::Presented => {}
                FrameOutcome::Rebuilt => log::debug!("Frame replaced by swapchain rebuild"),
                FrameOutcome::Skipped => std::thread::sleep(Duration::from_millis(16)),
            }
        }

        app.shutdown(&mut self.scene);
        log::info!("Main loop finished");
        Ok(())
    }

    /// Release scene GPU resources and wait for the device. Safe to call
    /// more than once.
    pub fn shutdown(&mut self) -> Result<(), EngineError> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;

        log::info!("Shutting down engine...");
        self.renderer.shutdown(&mut self.scene)?;
        Ok(())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            logging::report("Engine shutdown failed", &e);
        }
    }
}
