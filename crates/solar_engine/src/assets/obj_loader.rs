//! OBJ file loader for 3D models
//!
//! Vertices are indexed by OBJ position: every `v` line becomes one
//! [`Vertex`] and face corners reference it directly, picking up the normal
//! named by the corner. Polygons are fan-triangulated.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::foundation::math::Vec3;
use crate::render::vertex::Vertex;

/// Mesh loading failures
#[derive(Error, Debug)]
pub enum ObjError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed statement
    #[error("Parse error on line {line}: {message}")]
    ParseError {
        /// 1-based line number
        line: usize,
        /// What was wrong with the statement
        message: String,
    },
    /// File parsed but holds no usable mesh
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Vertex and index lists ready for upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// One vertex per OBJ position
    pub vertices: Vec<Vertex>,
    /// Triangle list indices into `vertices`
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Bundle vertex and index lists
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }
    /// Multiply every position by `factor`
    pub fn scaled(mut self, factor: f32) -> Self {
        for vertex in &mut self.vertices {
            for component in &mut vertex.position {
                *component *= factor;
            }
        }
        self
    }
}

/// Face corner: position, texture coordinate and normal indices (0-based)
#[derive(Debug, Clone, Copy)]
struct Corner {
    position: usize,
    normal: Option<usize>,
}

/// Loads OBJ files and keeps every parsed file in memory
#[derive(Debug, Default)]
pub struct ObjLoader {
    cache: HashMap<PathBuf, MeshData>,
}

impl ObjLoader {
    /// Loader with an empty cache
    pub fn new() -> Self {
        Self::default()
    }
    /// Load `path`, returning the cached copy when it was read before
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<MeshData, ObjError> {
        let path = path.as_ref();
        if let Some(mesh) = self.cache.get(path) {
            log::debug!("OBJ cache hit: {}", path.display());
            return Ok(mesh.clone());
        }

        let source = fs::read_to_string(path)?;
        let mesh = Self::parse(&source)?;
        log::info!(
            "Loaded {}: {} vertices, {} indices",
            path.display(),
            mesh.vertices.len(),
            mesh.indices.len()
        );

        self.cache.insert(path.to_path_buf(), mesh.clone());
        Ok(mesh)
    }
    /// Whether `path` is already cached
    pub fn is_cached<P: AsRef<Path>>(&self, path: P) -> bool {
        self.cache.contains_key(path.as_ref())
    }
    /// Parse OBJ text
    pub fn parse(source: &str) -> Result<MeshData, ObjError> {
        let mut vertices = Vec::new();
        let mut normals: Vec<[f32; 3]> = Vec::new();
        let mut faces: Vec<(usize, Vec<Corner>)> = Vec::new();

        for (number, line) in source.lines().enumerate() {
            let line_number = number + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut parts = line.split_whitespace();
            match parts.next() {
                Some("v") => {
                    let [x, y, z] = parse_floats(parts, line_number)?;
                    vertices.push(Vertex::new(Vec3::new(x, y, z), Vec3::zeros()));
                }
                Some("vn") => {
                    normals.push(parse_floats(parts, line_number)?);
                }
                Some("f") => {
                    let corners = parts
                        .map(|token| parse_corner(token, line_number))
                        .collect::<Result<Vec<_>, _>>()?;
                    if corners.len() < 3 {
                        return Err(ObjError::ParseError {
                            line: line_number,
                            message: format!("Face needs at least 3 corners, found {}", corners.len()),
                        });
                    }
                    faces.push((line_number, corners));
                }
                // Texture coordinates, groups, materials and smoothing are not used
                _ => {}
            }
        }

        if vertices.is_empty() {
            return Err(ObjError::InvalidFormat("No vertices found in OBJ file".to_string()));
        }

        let mut indices = Vec::with_capacity(faces.len() * 3);
        for (line_number, corners) in &faces {
            for corner in corners {
                let vertex = vertices.get_mut(corner.position).ok_or_else(|| {
                    ObjError::InvalidFormat(format!(
                        "Position index {} out of bounds on line {}",
                        corner.position + 1,
                        line_number
                    ))
                })?;
                if let Some(normal_index) = corner.normal {
                    let normal = normals.get(normal_index).ok_or_else(|| {
                        ObjError::InvalidFormat(format!(
                            "Normal index {} out of bounds on line {}",
                            normal_index + 1,
                            line_number
                        ))
                    })?;
                    vertex.normal = *normal;
                }
            }

            // Fan triangulation
            for i in 1..corners.len() - 1 {
                indices.push(corners[0].position as u32);
                indices.push(corners[i].position as u32);
                indices.push(corners[i + 1].position as u32);
            }
        }

        Ok(MeshData::new(vertices, indices))
    }
}

fn parse_floats<'a>(mut parts: impl Iterator<Item = &'a str>, line: usize) -> Result<[f32; 3], ObjError> {
    let mut values = [0.0; 3];
    for value in &mut values {
        let token = parts.next().ok_or_else(|| ObjError::ParseError {
            line,
            message: "Expected three components".to_string(),
        })?;
        *value = token.parse().map_err(|_| ObjError::ParseError {
            line,
            message: format!("Invalid number '{}'", token),
        })?;
    }
    Ok(values)
}

fn parse_index(token: &str, line: usize) -> Result<usize, ObjError> {
    let index: usize = token.parse().map_err(|_| ObjError::ParseError {
        line,
        message: format!("Invalid index '{}'", token),
    })?;
    // OBJ indices are 1-based
    index.checked_sub(1).ok_or_else(|| ObjError::ParseError {
        line,
        message: "Index 0 is not valid in OBJ".to_string(),
    })
}

/// `p`, `p/t`, `p//n` or `p/t/n`
fn parse_corner(token: &str, line: usize) -> Result<Corner, ObjError> {
    let mut fields = token.split('/');
    let position = parse_index(fields.next().unwrap_or_default(), line)?;
    let _texture = fields.next();
    let normal = match fields.next() {
        Some(field) if !field.is_empty() => Some(parse_index(field, line)?),
        _ => None,
    };
    Ok(Corner { position, normal })
}
