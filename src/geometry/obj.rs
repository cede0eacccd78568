//! Minimal Wavefront OBJ reader
//!
//! Reads `v`, `vn` and `f` records. Faces with more than three corners are
//! fan-triangulated; faces without normals get the geometric normal.

use std::path::Path;

use glam::Vec3;

use super::{procedural, Mesh, Triangle};
use crate::core::error::Error;
use crate::core::types::Result;

/// Parse OBJ text into a mesh
pub fn parse_obj(name: &str, text: &str, color: Vec3) -> Result<Mesh> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();
    let mut triangles = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let mut parts = line.split_whitespace();
        let Some(tag) = parts.next() else { continue };

        match tag {
            "v" => positions.push(parse_vec3(parts, line_no)?),
            "vn" => normals.push(parse_vec3(parts, line_no)?.normalize_or_zero()),
            "f" => {
                let corners = parts
                    .map(|c| parse_corner(c, positions.len(), normals.len(), line_no))
                    .collect::<Result<Vec<_>>>()?;
                if corners.len() < 3 {
                    return Err(Error::Geometry(format!(
                        "{}:{}: face with {} corners", name, line_no + 1, corners.len()
                    )));
                }
                for i in 1..corners.len() - 1 {
                    let [a, b, c] = [corners[0], corners[i], corners[i + 1]];
                    let mut tri = Triangle::flat(positions[a.0], positions[b.0], positions[c.0]);
                    if let (Some(na), Some(nb), Some(nc)) = (a.1, b.1, c.1) {
                        tri.normals = [normals[na], normals[nb], normals[nc]];
                    }
                    triangles.push(tri);
                }
            }
            _ => {}
        }
    }

    Ok(Mesh::new(name, triangles, color))
}

/// Load and parse an OBJ file
pub fn load_obj(path: &Path, color: Vec3) -> Result<Mesh> {
    let text = std::fs::read_to_string(path)?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mesh".to_string());
    parse_obj(&name, &text, color)
}

/// Load an OBJ file, substituting a placeholder if it fails or is empty
pub fn load_mesh_or_placeholder(path: &Path, color: Vec3) -> Mesh {
    match load_obj(path, color) {
        Ok(mesh) if mesh.triangle_count() > 0 => {
            log::info!("Loaded mesh '{}' ({} triangles)", mesh.name, mesh.triangle_count());
            mesh.normalized(2.0)
        }
        Ok(_) => {
            log::warn!("Mesh {} has no triangles, using placeholder", path.display());
            procedural::placeholder()
        }
        Err(e) => {
            log::warn!("Failed to load mesh {}: {}, using placeholder", path.display(), e);
            procedural::placeholder()
        }
    }
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>, line_no: usize) -> Result<Vec3> {
    let mut next = || -> Result<f32> {
        parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| Error::Geometry(format!("line {}: expected 3 numbers", line_no + 1)))
    };
    Ok(Vec3::new(next()?, next()?, next()?))
}

/// Resolve a 1-based (or negative, relative) OBJ index
fn resolve_index(raw: &str, count: usize, line_no: usize) -> Result<usize> {
    let idx: i64 = raw
        .parse()
        .map_err(|_| Error::Geometry(format!("line {}: bad index '{}'", line_no + 1, raw)))?;
    let resolved = if idx < 0 { count as i64 + idx } else { idx - 1 };
    if resolved < 0 || resolved >= count as i64 {
        return Err(Error::Geometry(format!(
            "line {}: index {} out of range (have {})", line_no + 1, idx, count
        )));
    }
    Ok(resolved as usize)
}

/// Parse a `v`, `v/vt`, `v//vn` or `v/vt/vn` face corner
fn parse_corner(
    corner: &str,
    position_count: usize,
    normal_count: usize,
    line_no: usize,
) -> Result<(usize, Option<usize>)> {
    let mut fields = corner.split('/');
    let position = resolve_index(fields.next().unwrap_or(""), position_count, line_no)?;
    let normal = match fields.nth(1) {
        Some(n) if !n.is_empty() => Some(resolve_index(n, normal_count, line_no)?),
        _ => None,
    };
    Ok((position, normal))
}
