//! Solar system demo
//!
//! A sun, eight planets and a moon spinning and orbiting under a single
//! point light. WASD moves the camera, Q/E turn it, holding Space lets the
//! mouse look around, T/G lift and lower Mercury and Escape quits.
//!
//! Settings are read from `solar_system.toml` when it exists.

mod bodies;
mod solar_system;

use std::process::ExitCode;

use solar_engine::config::{ApplicationConfig, Config};
use solar_engine::foundation::logging;
use solar_engine::Engine;

use crate::solar_system::{default_models_dir, SolarSystemApp};

const CONFIG_PATH: &str = "solar_system.toml";

fn main() -> ExitCode {
    let config = match ApplicationConfig::load_or_default(CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            logging::init("info");
            logging::report(&format!("Failed to load {}", CONFIG_PATH), &e);
            return ExitCode::FAILURE;
        }
    };

    let mut engine = match Engine::initialize(config.clone()) {
        Ok(engine) => engine,
        Err(e) => {
            logging::report("Engine initialization failed", &e);
            return ExitCode::FAILURE;
        }
    };

    let mut app = SolarSystemApp::new(config, default_models_dir());
    let result = engine.run(&mut app);
    let shutdown = engine.shutdown();

    match result.and(shutdown) {
        Ok(()) => {
            log::info!("Solar system demo finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            logging::report("Solar system demo failed", &e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solar_engine::config::ConfigFormat;

    #[test]
    fn test_shipped_config_parses() {
        let text = include_str!("../../solar_system.toml");
        let config = ApplicationConfig::from_str_with_format(text, ConfigFormat::Toml).unwrap();
        assert_eq!(config.window.width, 1920);
        assert_eq!(config.camera.position, [0.0, 10.0, -200.0]);
        assert!(config.validate().is_ok());
    }
}
