//! Window management using GLFW
//!
//! Provides window creation, event handling and input tracking for Vulkan

use glfw::{Action, Key, WindowEvent};
use thiserror::Error;

use crate::foundation::time::Timer;
use crate::input::{InputState, KeyCode};
use crate::render::window::Platform;

/// Errors raised by the GLFW window
#[derive(Error, Debug)]
pub enum WindowError {
    /// `glfwInit` failed
    #[error("GLFW initialization failed")]
    InitializationFailed,

    /// The window or its context could not be created
    #[error("Window creation failed")]
    CreationFailed,

    /// Any other GLFW failure
    #[error("GLFW error: {0}")]
    GlfwError(String),
}

/// Result alias for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// GLFW window with per-frame input state
pub struct GlfwWindow {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, WindowEvent)>,
    timer: Timer,
    frame_time: f32,
    cursor: Option<(f64, f64)>,
    mouse_delta: (f32, f32),
    resized: bool,
    quit_requested: bool,
}

impl GlfwWindow {
    /// Open a resizable window without a client API
    pub fn new(title: &str, width: u32, height: u32) -> WindowResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors).map_err(|_| WindowError::InitializationFailed)?;

        if !glfw.vulkan_supported() {
            return Err(WindowError::GlfwError("Vulkan loader not found".to_string()));
        }

        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(true));

        let (mut window, events) = glfw
            .create_window(width, height, title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_key_polling(true);
        window.set_close_polling(true);
        window.set_cursor_pos_polling(true);
        window.set_framebuffer_size_polling(true);

        log::info!("Created {}x{} window '{}'", width, height, title);

        Ok(Self {
            glfw,
            window,
            events,
            timer: Timer::new(),
            frame_time: 0.0,
            cursor: None,
            mouse_delta: (0.0, 0.0),
            resized: false,
            quit_requested: false,
        })
    }

    fn handle_event(&mut self, event: WindowEvent) {
        match event {
            WindowEvent::Key(Key::Escape, _, Action::Press, _) | WindowEvent::Close => {
                self.quit_requested = true;
            }
            WindowEvent::FramebufferSize(width, height) => {
                log::debug!("Framebuffer resized to {}x{}", width, height);
                self.resized = true;
            }
            WindowEvent::CursorPos(x, y) => {
                if let Some((last_x, last_y)) = self.cursor {
                    self.mouse_delta.0 += (x - last_x) as f32;
                    self.mouse_delta.1 += (y - last_y) as f32;
                }
                self.cursor = Some((x, y));
            }
            _ => {}
        }
    }
}

impl Platform for GlfwWindow {
    fn pump_events(&mut self) {
        self.timer.update();
        self.frame_time = self.timer.delta_time();
        self.mouse_delta = (0.0, 0.0);

        self.glfw.poll_events();
        let events: Vec<WindowEvent> = glfw::flush_messages(&self.events).map(|(_, event)| event).collect();
        for event in events {
            self.handle_event(event);
        }
    }

    fn request_quit(&mut self) {
        self.quit_requested = true;
    }

    fn is_quit_requested(&self) -> bool {
        self.quit_requested || self.window.should_close()
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (width.max(0) as u32, height.max(0) as u32)
    }

    fn take_resized(&mut self) -> bool {
        std::mem::take(&mut self.resized)
    }

    fn required_instance_extensions(&self) -> WindowResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or_else(|| WindowError::GlfwError("Failed to get required extensions".to_string()))
    }

    fn create_surface(&mut self, instance: ash::vk::Instance) -> WindowResult<ash::vk::SurfaceKHR> {
        let mut surface = ash::vk::SurfaceKHR::null();
        let result = self.window.create_window_surface(instance, std::ptr::null(), &mut surface);

        if result == ash::vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(WindowError::GlfwError(format!("Failed to create Vulkan surface: {:?}", result)))
        }
    }

    fn input(&self) -> &dyn InputState {
        self
    }
}

impl InputState for GlfwWindow {
    fn frame_time(&self) -> f32 {
        self.frame_time
    }

    fn is_key_down(&self, key: KeyCode) -> bool {
        matches!(self.window.get_key(to_glfw_key(key)), Action::Press | Action::Repeat)
    }

    fn mouse_delta(&self) -> (f32, f32) {
        self.mouse_delta
    }
}

fn to_glfw_key(key: KeyCode) -> Key {
    match key {
        KeyCode::A => Key::A,
        KeyCode::B => Key::B,
        KeyCode::C => Key::C,
        KeyCode::D => Key::D,
        KeyCode::E => Key::E,
        KeyCode::F => Key::F,
        KeyCode::G => Key::G,
        KeyCode::H => Key::H,
        KeyCode::I => Key::I,
        KeyCode::J => Key::J,
        KeyCode::K => Key::K,
        KeyCode::L => Key::L,
        KeyCode::M => Key::M,
        KeyCode::N => Key::N,
        KeyCode::O => Key::O,
        KeyCode::P => Key::P,
        KeyCode::Q => Key::Q,
        KeyCode::R => Key::R,
        KeyCode::S => Key::S,
        KeyCode::T => Key::T,
        KeyCode::U => Key::U,
        KeyCode::V => Key::V,
        KeyCode::W => Key::W,
        KeyCode::X => Key::X,
        KeyCode::Y => Key::Y,
        KeyCode::Z => Key::Z,
        KeyCode::Num0 => Key::Num0,
        KeyCode::Num1 => Key::Num1,
        KeyCode::Num2 => Key::Num2,
        KeyCode::Num3 => Key::Num3,
        KeyCode::Num4 => Key::Num4,
        KeyCode::Num5 => Key::Num5,
        KeyCode::Num6 => Key::Num6,
        KeyCode::Num7 => Key::Num7,
        KeyCode::Num8 => Key::Num8,
        KeyCode::Num9 => Key::Num9,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Enter => Key::Enter,
        KeyCode::Space => Key::Space,
        KeyCode::Escape => Key::Escape,
    }
}
