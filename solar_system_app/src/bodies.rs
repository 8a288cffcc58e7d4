//! Celestial body table for the solar system scene

use solar_engine::foundation::math::{Vec3, Vec4};
use solar_engine::scene::Material;

/// One body of the scene
#[derive(Debug, Clone, PartialEq)]
pub struct BodySpec {
    /// Model file stem under `resources/models/`
    pub name: &'static str,
    /// Starting position
    pub position: [f32; 3],
    /// Radius of the generated sphere when no model file exists
    pub fallback_radius: f32,
    /// Turns per second around +Y
    pub spin_speed: f32,
    /// Index of the body this one orbits, with turns per second
    pub orbit: Option<(usize, f32)>,
    /// Index of the body whose movement this one follows
    pub parent: Option<usize>,
    /// Diffuse color
    pub diffuse: [f32; 4],
}

impl BodySpec {
    /// Lit material with the shared ambient and specular terms
    pub fn material(&self) -> Material {
        Material::default()
            .with_diffuse(Vec4::from(self.diffuse))
            .with_ambient(Vec4::new(0.1, 0.1, 0.1, 1.0))
            .with_specular(Vec4::new(0.2, 0.2, 0.2, 1.0))
            .with_shininess(32.0)
            .with_lighting(true)
    }

    /// Starting position
    pub fn position(&self) -> Vec3 {
        Vec3::from(self.position)
    }
}

/// Index of the sun in [`BODIES`]
pub const SUN: usize = 0;

/// Index of the body moved by T/G
pub const FIRST_PLANET: usize = 1;

const EARTH: usize = 3;

/// Sun, planets and moon in registration order
pub const BODIES: [BodySpec; 10] = [
    BodySpec {
        name: "sun",
        position: [0.0, 0.0, 0.0],
        fallback_radius: 30.0,
        spin_speed: 0.005,
        orbit: None,
        parent: None,
        diffuse: [0.4, 0.4, 0.4, 1.0],
    },
    BodySpec {
        name: "mercury",
        position: [100.0, 0.0, 0.0],
        fallback_radius: 1.5,
        spin_speed: 0.003,
        orbit: Some((SUN, 0.02)),
        parent: None,
        diffuse: [0.525, 0.35, 0.18, 1.0],
    },
    BodySpec {
        name: "venus",
        position: [200.0, 0.0, 0.0],
        fallback_radius: 2.5,
        spin_speed: 0.001,
        orbit: Some((SUN, 0.015)),
        parent: None,
        diffuse: [1.0, 0.5, 0.5, 1.0],
    },
    BodySpec {
        name: "earth",
        position: [300.0, 0.0, 0.0],
        fallback_radius: 2.0,
        spin_speed: 0.015,
        orbit: Some((SUN, 0.012)),
        parent: None,
        diffuse: [0.0, 0.6, 1.0, 1.0],
    },
    BodySpec {
        name: "moon",
        position: [303.0, 0.0, 0.0],
        fallback_radius: 0.5,
        spin_speed: 0.01,
        orbit: Some((EARTH, 0.1)),
        parent: Some(EARTH),
        diffuse: [0.8, 0.8, 0.8, 1.0],
    },
    BodySpec {
        name: "mars",
        position: [500.0, 0.0, 0.0],
        fallback_radius: 2.0,
        spin_speed: 0.015,
        orbit: Some((SUN, 0.01)),
        parent: None,
        diffuse: [1.0, 0.0, 0.0, 1.0],
    },
    BodySpec {
        name: "jupiter",
        position: [800.0, 0.0, 0.0],
        fallback_radius: 12.0,
        spin_speed: 0.02,
        orbit: Some((SUN, 0.005)),
        parent: None,
        diffuse: [1.0, 0.8, 0.6, 1.0],
    },
    BodySpec {
        name: "saturn",
        position: [1100.0, 0.0, 0.0],
        fallback_radius: 10.0,
        spin_speed: 0.019,
        orbit: Some((SUN, 0.002)),
        parent: None,
        diffuse: [1.0, 1.0, 0.6, 1.0],
    },
    BodySpec {
        name: "uranus",
        position: [1500.0, 0.0, 0.0],
        fallback_radius: 6.0,
        spin_speed: 0.016,
        orbit: Some((SUN, 0.001)),
        parent: None,
        diffuse: [0.0, 0.4, 1.0, 1.0],
    },
    BodySpec {
        name: "neptune",
        position: [1900.0, 0.0, 0.0],
        fallback_radius: 6.0,
        spin_speed: 0.017,
        orbit: Some((SUN, 0.0005)),
        parent: None,
        diffuse: [0.0, 0.2, 0.6, 1.0],
    },
];

/// The sun glows instead of being lit
pub fn sun_material() -> Material {
    Material::default()
        .with_diffuse(Vec4::new(0.4, 0.4, 0.4, 1.0))
        .with_emissive(Vec4::new(1.0, 0.2, 0.0, 1.0))
        .with_ambient(Vec4::new(0.1, 0.1, 0.1, 1.0))
        .with_specular(Vec4::new(0.2, 0.2, 0.2, 1.0))
        .with_shininess(100.0)
        .with_lighting(false)
}
