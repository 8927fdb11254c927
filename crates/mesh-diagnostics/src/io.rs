//! Mesh file loading for STL (binary/ASCII) and NAS (Nastran) formats.
//!
//! STL triangles are emitted exactly as stored: three fresh vertex rows
//! per facet, no vertex merging. NAS files are read in two passes so the
//! vertex and face tables can be preallocated.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use hashbrown::HashMap;
use nalgebra::Vector3;
use tracing::{debug, info, warn};

use crate::error::{DiagError, DiagResult};
use crate::types::Mesh;

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Stl,
    Nas,
}

impl MeshFormat {
    /// Detect format from file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .and_then(|ext| match ext.as_str() {
                "stl" => Some(MeshFormat::Stl),
                "nas" => Some(MeshFormat::Nas),
                _ => None,
            })
    }
}

/// A mesh loaded from file, with per-facet normals when the format
/// carries them (binary and ASCII STL do, NAS does not).
#[derive(Debug, Clone)]
pub struct LoadedMesh {
    pub mesh: Mesh,
    pub face_normals: Option<Vec<Vector3<f32>>>,
}

/// Load a mesh from file, auto-detecting format from extension.
pub fn load_mesh(path: &Path) -> DiagResult<LoadedMesh> {
    let format = MeshFormat::from_path(path).ok_or_else(|| DiagError::UnsupportedFormat {
        extension: path.extension().and_then(|e| e.to_str()).map(String::from),
    })?;

    info!("loading mesh from {:?} (format: {:?})", path, format);

    let loaded = match format {
        MeshFormat::Stl => load_stl(path)?,
        MeshFormat::Nas => load_nas(path)?,
    };

    if loaded.mesh.is_empty() {
        return Err(DiagError::EmptyMesh {
            details: format!("{} contains no usable vertices or faces", path.display()),
        });
    }

    if let Some((min, max)) = loaded.mesh.bounds() {
        debug!(
            vertices = loaded.mesh.vertex_count(),
            faces = loaded.mesh.face_count(),
            bounds = format!(
                "[{:.1}, {:.1}, {:.1}] to [{:.1}, {:.1}, {:.1}]",
                min.x, min.y, min.z, max.x, max.y, max.z
            ),
            "mesh loaded"
        );
    }

    Ok(loaded)
}

fn open(path: &Path) -> DiagResult<File> {
    File::open(path).map_err(|e| DiagError::IoRead {
        path: path.to_path_buf(),
        source: e,
    })
}

fn parse_error(path: &Path, details: impl Into<String>) -> DiagError {
    DiagError::ParseError {
        path: path.to_path_buf(),
        details: details.into(),
    }
}

// ---------------------------------------------------------------------------
// STL
// ---------------------------------------------------------------------------

/// A binary STL is assumed when the 80-byte header holds any byte that is
/// neither printable ASCII nor whitespace.
fn header_is_binary(header: &[u8]) -> bool {
    header.iter().any(|&b| {
        let printable = (0x20..=0x7e).contains(&b);
        let whitespace = matches!(b, b'\t' | b'\n' | 0x0b | 0x0c | b'\r');
        !printable && !whitespace
    })
}

fn load_stl(path: &Path) -> DiagResult<LoadedMesh> {
    let mut file = open(path)?;
    let mut header = Vec::with_capacity(80);
    (&mut file)
        .take(80)
        .read_to_end(&mut header)
        .map_err(|e| DiagError::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;

    if header_is_binary(&header) {
        load_stl_binary(path, file)
    } else {
        load_stl_ascii(path)
    }
}

fn load_stl_binary(path: &Path, mut file: File) -> DiagResult<LoadedMesh> {
    let io_err = |e| DiagError::IoRead {
        path: path.to_path_buf(),
        source: e,
    };

    file.seek(SeekFrom::Start(80)).map_err(io_err)?;
    let mut reader = BufReader::new(file);

    let mut count_bytes = [0u8; 4];
    reader
        .read_exact(&mut count_bytes)
        .map_err(|_| parse_error(path, "truncated binary STL: missing triangle count"))?;
    let triangle_count = u32::from_le_bytes(count_bytes) as usize;

    debug!(triangles = triangle_count, "binary STL");

    let mut mesh = Mesh::with_capacity(triangle_count * 3, triangle_count);
    let mut normals = Vec::with_capacity(triangle_count);

    // Each record: normal (3 f32), three vertices (9 f32), attribute (u16).
    let mut record = [0u8; 50];
    for i in 0..triangle_count {
        reader.read_exact(&mut record).map_err(|_| {
            parse_error(
                path,
                format!("truncated binary STL: triangle {i} of {triangle_count}"),
            )
        })?;

        let f = |offset: usize| {
            f32::from_le_bytes([
                record[offset],
                record[offset + 1],
                record[offset + 2],
                record[offset + 3],
            ])
        };

        normals.push(Vector3::new(f(0), f(4), f(8)));
        let base = mesh.vertices.len() as u32;
        for v in 0..3 {
            let offset = 12 + v * 12;
            mesh.vertices
                .push(nalgebra::Point3::new(f(offset), f(offset + 4), f(offset + 8)));
        }
        mesh.faces.push([base, base + 1, base + 2]);
        // The trailing attribute byte count is discarded.
    }

    Ok(LoadedMesh {
        mesh,
        face_normals: Some(normals),
    })
}

fn load_stl_ascii(path: &Path) -> DiagResult<LoadedMesh> {
    let reader = BufReader::new(open(path)?);

    let mut mesh = Mesh::new();
    let mut normals = Vec::new();
    let mut vertices_in_facet = 0u32;

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| DiagError::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut tokens = line.split_whitespace();

        match tokens.next() {
            Some("facet") => {
                // "facet normal nx ny nz"
                if tokens.next() != Some("normal") {
                    continue;
                }
                let normal = parse_three_floats(&mut tokens)
                    .ok_or_else(|| parse_error(path, format!("bad facet normal at line {}", line_num + 1)))?;
                normals.push(Vector3::new(normal[0], normal[1], normal[2]));
                vertices_in_facet = 0;
            }
            Some("vertex") => {
                let coords = parse_three_floats(&mut tokens)
                    .ok_or_else(|| parse_error(path, format!("bad vertex at line {}", line_num + 1)))?;
                mesh.vertices
                    .push(nalgebra::Point3::new(coords[0], coords[1], coords[2]));
                vertices_in_facet += 1;
                if vertices_in_facet == 3 {
                    let base = mesh.vertices.len() as u32 - 3;
                    mesh.faces.push([base, base + 1, base + 2]);
                    vertices_in_facet = 0;
                }
            }
            _ => {}
        }
    }

    debug!(faces = mesh.face_count(), "ASCII STL");
    Ok(LoadedMesh {
        mesh,
        face_normals: Some(normals),
    })
}

fn parse_three_floats(tokens: &mut std::str::SplitWhitespace<'_>) -> Option<[f32; 3]> {
    let x = tokens.next()?.parse().ok()?;
    let y = tokens.next()?.parse().ok()?;
    let z = tokens.next()?.parse().ok()?;
    Some([x, y, z])
}

// ---------------------------------------------------------------------------
// NAS (Nastran)
// ---------------------------------------------------------------------------

/// Load a NAS file.
///
/// `GRID*` records span two physical lines (`id cont x y` then `cont z`);
/// `CTRIA3` records reference nodes by id. The first pass counts records
/// so the tables can be preallocated; the second pass fills them and maps
/// node ids to row indices. `CTRIA3` rows referencing undefined nodes are
/// dropped with a warning. Other record types are ignored.
fn load_nas(path: &Path) -> DiagResult<LoadedMesh> {
    // Pass 1: count GRID* and CTRIA3 records.
    let mut vertex_count = 0usize;
    let mut face_count = 0usize;
    {
        let reader = BufReader::new(open(path)?);
        let mut lines = reader.lines();
        while let Some(line) = lines.next() {
            let line = line.map_err(|e| DiagError::IoRead {
                path: path.to_path_buf(),
                source: e,
            })?;
            if line.starts_with("GRID*") {
                vertex_count += 1;
                // The continuation line carries the z coordinate.
                let _ = lines.next();
            } else if line.starts_with("CTRIA3") {
                face_count += 1;
            }
        }
    }

    if vertex_count == 0 {
        return Ok(LoadedMesh {
            mesh: Mesh::new(),
            face_normals: None,
        });
    }

    // Pass 2: fill the preallocated tables.
    let mut mesh = Mesh::with_capacity(vertex_count, face_count);
    let mut node_map: HashMap<i64, u32> = HashMap::with_capacity(vertex_count);

    let reader = BufReader::new(open(path)?);
    let mut lines = reader.lines();
    let mut line_num = 0usize;

    while let Some(line) = lines.next() {
        line_num += 1;
        let line = line.map_err(|e| DiagError::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut tokens = line.split_whitespace();

        match tokens.next() {
            Some("GRID*") => {
                let node_id: i64 = tokens
                    .next()
                    .and_then(|t| t.parse().ok())
                    .ok_or_else(|| parse_error(path, format!("bad GRID* id at line {line_num}")))?;
                let _continuation = tokens.next();
                let x: f32 = tokens
                    .next()
                    .and_then(|t| t.parse().ok())
                    .ok_or_else(|| parse_error(path, format!("bad GRID* x at line {line_num}")))?;
                let y: f32 = tokens
                    .next()
                    .and_then(|t| t.parse().ok())
                    .ok_or_else(|| parse_error(path, format!("bad GRID* y at line {line_num}")))?;

                let cont = lines
                    .next()
                    .transpose()
                    .map_err(|e| DiagError::IoRead {
                        path: path.to_path_buf(),
                        source: e,
                    })?
                    .ok_or_else(|| {
                        parse_error(path, format!("truncated GRID* record at line {line_num}"))
                    })?;
                line_num += 1;
                let mut cont_tokens = cont.split_whitespace();
                let _marker = cont_tokens.next();
                let z: f32 = cont_tokens
                    .next()
                    .and_then(|t| t.parse().ok())
                    .ok_or_else(|| parse_error(path, format!("bad GRID* z at line {line_num}")))?;

                node_map.insert(node_id, mesh.vertices.len() as u32);
                mesh.vertices.push(nalgebra::Point3::new(x, y, z));
            }
            Some("CTRIA3") => {
                let _elem_id = tokens.next();
                let _property_id = tokens.next();
                let ids: Option<[i64; 3]> = (|| {
                    Some([
                        tokens.next()?.parse().ok()?,
                        tokens.next()?.parse().ok()?,
                        tokens.next()?.parse().ok()?,
                    ])
                })();
                let Some(ids) = ids else {
                    return Err(parse_error(
                        path,
                        format!("bad CTRIA3 record at line {line_num}"),
                    ));
                };

                match (
                    node_map.get(&ids[0]),
                    node_map.get(&ids[1]),
                    node_map.get(&ids[2]),
                ) {
                    (Some(&a), Some(&b), Some(&c)) => mesh.faces.push([a, b, c]),
                    _ => {
                        // Reference to a node defined later or not at all.
                        warn!(line = line_num, "CTRIA3 references undefined node, dropped");
                    }
                }
            }
            _ => {}
        }
    }

    debug!(
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        "NAS loaded"
    );
    Ok(LoadedMesh {
        mesh,
        face_normals: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection_is_case_insensitive() {
        assert_eq!(
            MeshFormat::from_path(Path::new("model.STL")),
            Some(MeshFormat::Stl)
        );
        assert_eq!(
            MeshFormat::from_path(Path::new("car.nas")),
            Some(MeshFormat::Nas)
        );
        assert_eq!(MeshFormat::from_path(Path::new("scene.obj")), None);
        assert_eq!(MeshFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_header_classification() {
        let ascii = b"solid test mesh exported by some CAD tool\n";
        assert!(!header_is_binary(ascii));

        let mut binary = [0u8; 80];
        binary[..5].copy_from_slice(b"solid");
        assert!(header_is_binary(&binary));
    }

    #[test]
    fn test_parse_three_floats() {
        let mut tokens = "1.0 -2.5 3e-1".split_whitespace();
        assert_eq!(parse_three_floats(&mut tokens), Some([1.0, -2.5, 0.3]));

        let mut short = "1.0 2.0".split_whitespace();
        assert_eq!(parse_three_floats(&mut short), None);

        let mut bad = "1.0 2.0 abc".split_whitespace();
        assert_eq!(parse_three_floats(&mut bad), None);
    }
}
