//! Wavefront OBJ parsing.
//!
//! Reads `v`, `vt`, `vn` and `f` lines. Face corners are `v/vt/vn`
//! triples with 1-based indices; `vt` and `vn` may be omitted. Each
//! distinct triple becomes one output vertex, and polygons with more than
//! three corners are fanned into triangles.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use glam::{Vec2, Vec3};
use log::info;
use thiserror::Error;

use super::MeshData;
use crate::terrain::Vertex;

#[derive(Error, Debug)]
pub enum ObjError {
    #[error("Cannot open OBJ file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },
    #[error("Line {line} references {kind} {index}, but only {available} are defined")]
    IndexOutOfRange {
        line: usize,
        kind: &'static str,
        index: usize,
        available: usize,
    },
    #[error("OBJ file has no faces")]
    NoFaces,
}

/// Load an OBJ mesh from disk.
pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<MeshData, ObjError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ObjError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let mesh = parse_obj(&content)?;
    info!(
        "Loaded model {}: {} vertices, {} indices",
        path.display(),
        mesh.vertices.len(),
        mesh.indices.len()
    );
    Ok(mesh)
}

fn parse_floats<const N: usize>(parts: &[&str], line: usize) -> Result<[f32; N], ObjError> {
    if parts.len() < N {
        return Err(ObjError::ParseError {
            line,
            message: format!("expected {} components, got {}", N, parts.len()),
        });
    }
    let mut out = [0.0; N];
    for (slot, s) in out.iter_mut().zip(parts) {
        *slot = s.parse().map_err(|_| ObjError::ParseError {
            line,
            message: format!("expected number, got '{}'", s),
        })?;
    }
    Ok(out)
}

/// Resolve one 1-based index field against a list of `available` items.
fn parse_index(
    field: &str,
    kind: &'static str,
    available: usize,
    line: usize,
) -> Result<usize, ObjError> {
    let index: usize = field.parse().map_err(|_| ObjError::ParseError {
        line,
        message: format!("invalid {} index '{}'", kind, field),
    })?;
    if index == 0 || index > available {
        return Err(ObjError::IndexOutOfRange {
            line,
            kind,
            index,
            available,
        });
    }
    Ok(index - 1)
}

type Corner = (usize, Option<usize>, Option<usize>);

/// Parse OBJ content string (useful for testing)
pub fn parse_obj(content: &str) -> Result<MeshData, ObjError> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut tex_coords: Vec<Vec2> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();

    let mut vertices: Vec<Vertex> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();
    let mut seen: HashMap<Corner, u32> = HashMap::new();

    for (line_idx, raw) in content.lines().enumerate() {
        let line = line_idx + 1;
        let mut parts = raw.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };
        let rest: Vec<&str> = parts.collect();

        match tag {
            "v" => positions.push(Vec3::from_array(parse_floats::<3>(&rest, line)?)),
            "vt" => tex_coords.push(Vec2::from_array(parse_floats::<2>(&rest, line)?)),
            "vn" => normals.push(Vec3::from_array(parse_floats::<3>(&rest, line)?)),
            "f" => {
                if rest.len() < 3 {
                    return Err(ObjError::ParseError {
                        line,
                        message: format!("face needs at least 3 corners, got {}", rest.len()),
                    });
                }

                let mut corners = Vec::with_capacity(rest.len());
                for corner in &rest {
                    let mut fields = corner.split('/');
                    let first = fields.next().unwrap_or("");
                    let v = parse_index(first, "vertex", positions.len(), line)?;
                    let vt = match fields.next() {
                        Some(s) if !s.is_empty() => {
                            Some(parse_index(s, "texture coordinate", tex_coords.len(), line)?)
                        }
                        _ => None,
                    };
                    let vn = match fields.next() {
                        Some(s) if !s.is_empty() => {
                            Some(parse_index(s, "normal", normals.len(), line)?)
                        }
                        _ => None,
                    };

                    let key = (v, vt, vn);
                    let index = *seen.entry(key).or_insert_with(|| {
                        // OBJ texture space starts bottom-left; ours starts top-left
                        let uv = vt.map_or(Vec2::ZERO, |i| tex_coords[i]);
                        vertices.push(Vertex {
                            position: positions[v].to_array(),
                            tex_coords: [uv.x, 1.0 - uv.y],
                            normal: vn.map_or(Vec3::Y, |i| normals[i]).to_array(),
                        });
                        (vertices.len() - 1) as u32
                    });
                    corners.push(index);
                }

                for k in 1..corners.len() - 1 {
                    indices.extend_from_slice(&[corners[0], corners[k], corners[k + 1]]);
                }
            }
            // Groups, materials and smoothing are not used
            _ => {}
        }
    }

    if indices.is_empty() {
        return Err(ObjError::NoFaces);
    }

    Ok(MeshData { vertices, indices })
}
