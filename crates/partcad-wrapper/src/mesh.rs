//! Builtin triangle mesh backend: STL and OBJ.
//!
//! STL input may be ASCII or binary; STL output is always binary. OBJ faces
//! with more than three corners are fan-triangulated and negative (relative)
//! indices are resolved against the vertices read so far.

use std::collections::HashMap;
use std::fs;
use std::io::{self, BufWriter, Cursor, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use partcad_core::{WrapperOperation, WrapperRequest, WrapperResponse};
use serde_json::json;
use thiserror::Error;

const STL_HEADER_LEN: usize = 80;
const STL_TRIANGLE_LEN: usize = 50;

/// Errors while reading or writing meshes.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("{format} parse error at line {line}: {message}")]
    Parse {
        format: &'static str,
        line: usize,
        message: String,
    },

    #[error("truncated binary STL: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error("mesh backend does not handle format '{0}'")]
    UnsupportedFormat(String),

    #[error("mesh backend does not handle operation '{0}'")]
    UnsupportedOperation(String),

    #[error("missing {0} in request")]
    MissingField(&'static str),
}

impl MeshError {
    fn parse(format: &'static str, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            format,
            line,
            message: message.into(),
        }
    }
}

/// An indexed triangle mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<[f32; 3]>,
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    /// Returns the bounding box as `(min, max)`, or `None` when empty.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let first = *self.vertices.first()?;
        Some(self.vertices.iter().fold((first, first), |(mut lo, mut hi), v| {
            for i in 0..3 {
                lo[i] = lo[i].min(v[i]);
                hi[i] = hi[i].max(v[i]);
            }
            (lo, hi)
        }))
    }

    fn normal(&self, tri: &[u32; 3]) -> [f32; 3] {
        let [a, b, c] = tri.map(|i| self.vertices[i as usize]);
        let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
        let n = [
            u[1] * v[2] - u[2] * v[1],
            u[2] * v[0] - u[0] * v[2],
            u[0] * v[1] - u[1] * v[0],
        ];
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        if len > 0.0 {
            [n[0] / len, n[1] / len, n[2] / len]
        } else {
            [0.0; 3]
        }
    }

    /// Summary used as the opaque shape handle in responses.
    pub fn summary(&self) -> serde_json::Value {
        let bounds = self.bounds().map(|(lo, hi)| json!({ "min": lo, "max": hi }));
        json!({
            "vertices": self.vertices.len(),
            "triangles": self.triangles.len(),
            "bounds": bounds,
        })
    }
}

/// Deduplicates vertices while building triangle soup into an indexed mesh.
#[derive(Default)]
struct MeshBuilder {
    mesh: Mesh,
    index: HashMap<[u32; 3], u32>,
}

impl MeshBuilder {
    fn vertex(&mut self, v: [f32; 3]) -> u32 {
        let key = v.map(f32::to_bits);
        if let Some(&i) = self.index.get(&key) {
            return i;
        }
        let i = self.mesh.vertices.len() as u32;
        self.mesh.vertices.push(v);
        self.index.insert(key, i);
        i
    }

    fn triangle(&mut self, a: [f32; 3], b: [f32; 3], c: [f32; 3]) {
        let tri = [self.vertex(a), self.vertex(b), self.vertex(c)];
        self.mesh.triangles.push(tri);
    }
}

// ============================================================================
// STL
// ============================================================================

/// Parses ASCII or binary STL.
pub fn read_stl(data: &[u8]) -> Result<Mesh, MeshError> {
    if is_binary_stl(data) {
        return read_binary_stl(data);
    }
    // A binary file with a "solid" header and trailing padding fails the
    // size check; a text parse of non-text bytes that finds nothing is one
    // of those.
    match read_ascii_stl(data) {
        Ok(mesh) if !mesh.triangles.is_empty() || !has_binary_bytes(data) => Ok(mesh),
        Err(e) if !has_binary_bytes(data) => Err(e),
        _ => read_binary_stl(data).map_err(|_| {
            MeshError::parse("STL", 1, "neither a text STL nor a valid binary STL")
        }),
    }
}

fn has_binary_bytes(data: &[u8]) -> bool {
    data.iter()
        .any(|&b| b == 0 || (b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r')))
}

fn is_binary_stl(data: &[u8]) -> bool {
    if data.len() < STL_HEADER_LEN + 4 {
        return false;
    }
    let count = u32::from_le_bytes([data[80], data[81], data[82], data[83]]) as usize;
    // ASCII files also start with "solid", so the size check decides.
    data.len() == STL_HEADER_LEN + 4 + count * STL_TRIANGLE_LEN || !data.starts_with(b"solid")
}

fn read_binary_stl(data: &[u8]) -> Result<Mesh, MeshError> {
    let mut cursor = Cursor::new(data);
    cursor.set_position(STL_HEADER_LEN as u64);
    let truncated = |_: io::Error| MeshError::Truncated {
        expected: STL_HEADER_LEN + 4,
        found: data.len(),
    };
    let count = cursor.read_u32::<LittleEndian>().map_err(truncated)? as usize;

    let expected = STL_HEADER_LEN + 4 + count * STL_TRIANGLE_LEN;
    if data.len() < expected {
        return Err(MeshError::Truncated {
            expected,
            found: data.len(),
        });
    }

    let mut builder = MeshBuilder::default();
    for _ in 0..count {
        let [a, b, c] = read_facet(&mut cursor).map_err(|_| MeshError::Truncated {
            expected,
            found: data.len(),
        })?;
        builder.triangle(a, b, c);
    }
    Ok(builder.mesh)
}

fn read_facet(cursor: &mut Cursor<&[u8]>) -> io::Result<[[f32; 3]; 3]> {
    let _normal = read_vec3(cursor)?;
    let corners = [read_vec3(cursor)?, read_vec3(cursor)?, read_vec3(cursor)?];
    let _attr = cursor.read_u16::<LittleEndian>()?;
    Ok(corners)
}

fn read_vec3(cursor: &mut Cursor<&[u8]>) -> io::Result<[f32; 3]> {
    Ok([
        cursor.read_f32::<LittleEndian>()?,
        cursor.read_f32::<LittleEndian>()?,
        cursor.read_f32::<LittleEndian>()?,
    ])
}

fn read_ascii_stl(data: &[u8]) -> Result<Mesh, MeshError> {
    let text = String::from_utf8_lossy(data);
    let mut builder = MeshBuilder::default();
    let mut corners: Vec<[f32; 3]> = Vec::with_capacity(3);

    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("vertex") => {
                let v = parse_vec3(&mut tokens)
                    .ok_or_else(|| MeshError::parse("STL", line_no, "bad vertex"))?;
                corners.push(v);
            }
            Some("endloop") => {
                if corners.len() != 3 {
                    return Err(MeshError::parse(
                        "STL",
                        line_no,
                        format!("facet has {} vertices", corners.len()),
                    ));
                }
                builder.triangle(corners[0], corners[1], corners[2]);
                corners.clear();
            }
            _ => {}
        }
    }

    if !text.trim_start().starts_with("solid") {
        return Err(MeshError::parse("STL", 1, "missing 'solid' header"));
    }
    if !corners.is_empty() {
        return Err(MeshError::parse(
            "STL",
            text.lines().count(),
            "facet is not closed by 'endloop'",
        ));
    }
    Ok(builder.mesh)
}

fn parse_vec3<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> Option<[f32; 3]> {
    let x = tokens.next()?.parse().ok()?;
    let y = tokens.next()?.parse().ok()?;
    let z = tokens.next()?.parse().ok()?;
    Some([x, y, z])
}

/// Writes binary STL.
pub fn write_stl<W: Write>(mesh: &Mesh, mut out: W) -> io::Result<()> {
    let mut header = [0u8; STL_HEADER_LEN];
    let tag = b"partcad mesh";
    header[..tag.len()].copy_from_slice(tag);
    out.write_all(&header)?;
    out.write_u32::<LittleEndian>(mesh.triangles.len() as u32)?;
    for tri in &mesh.triangles {
        for c in mesh.normal(tri) {
            out.write_f32::<LittleEndian>(c)?;
        }
        for &i in tri {
            for c in mesh.vertices[i as usize] {
                out.write_f32::<LittleEndian>(c)?;
            }
        }
        out.write_u16::<LittleEndian>(0)?;
    }
    out.flush()
}

// ============================================================================
// OBJ
// ============================================================================

/// Parses the geometry of a Wavefront OBJ file. Texture coordinates,
/// normals, groups and materials are ignored.
pub fn read_obj(data: &[u8]) -> Result<Mesh, MeshError> {
    let text = String::from_utf8_lossy(data);
    let mut mesh = Mesh::default();

    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("v") => {
                let v = parse_vec3(&mut tokens)
                    .ok_or_else(|| MeshError::parse("OBJ", line_no, "bad vertex"))?;
                mesh.vertices.push(v);
            }
            Some("f") => {
                let corners = tokens
                    .map(|t| resolve_obj_index(t, mesh.vertices.len()))
                    .collect::<Option<Vec<u32>>>()
                    .ok_or_else(|| MeshError::parse("OBJ", line_no, "bad face index"))?;
                if corners.len() < 3 {
                    return Err(MeshError::parse(
                        "OBJ",
                        line_no,
                        "face needs at least three vertices",
                    ));
                }
                for k in 1..corners.len() - 1 {
                    mesh.triangles.push([corners[0], corners[k], corners[k + 1]]);
                }
            }
            _ => {}
        }
    }
    Ok(mesh)
}

/// Resolves one `v`, `v/vt` or `v/vt/vn` token to a zero-based index.
fn resolve_obj_index(token: &str, vertex_count: usize) -> Option<u32> {
    let raw: i64 = token.split('/').next()?.parse().ok()?;
    let index = match raw {
        0 => return None,
        r if r > 0 => r - 1,
        r => vertex_count as i64 + r,
    };
    if index < 0 || index as usize >= vertex_count {
        return None;
    }
    u32::try_from(index).ok()
}

/// Writes a Wavefront OBJ file.
pub fn write_obj<W: Write>(mesh: &Mesh, mut out: W) -> io::Result<()> {
    writeln!(out, "# partcad mesh")?;
    for v in &mesh.vertices {
        writeln!(out, "v {} {} {}", v[0], v[1], v[2])?;
    }
    for t in &mesh.triangles {
        writeln!(out, "f {} {} {}", t[0] + 1, t[1] + 1, t[2] + 1)?;
    }
    out.flush()
}

// ============================================================================
// Backend
// ============================================================================

/// The builtin mesh backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshWrapper;

impl MeshWrapper {
    /// Formats this backend reads and writes.
    pub const FORMATS: &'static [&'static str] = &["stl", "obj"];

    fn load(&self, path: &Path, format: &str) -> Result<Mesh, MeshError> {
        let mut data = Vec::new();
        fs::File::open(path)
            .and_then(|mut f| f.read_to_end(&mut data))
            .map_err(|e| MeshError::Read {
                path: path.display().to_string(),
                source: e,
            })?;
        match format {
            "stl" => read_stl(&data),
            "obj" => read_obj(&data),
            other => Err(MeshError::UnsupportedFormat(other.to_string())),
        }
    }

    fn save(&self, mesh: &Mesh, path: &Path, format: &str) -> Result<(), MeshError> {
        let write_err = |e| MeshError::Write {
            path: path.display().to_string(),
            source: e,
        };
        if !Self::FORMATS.contains(&format) {
            return Err(MeshError::UnsupportedFormat(format.to_string()));
        }
        let file = fs::File::create(path).map_err(write_err)?;
        let out = BufWriter::new(file);
        match format {
            "stl" => write_stl(mesh, out),
            _ => write_obj(mesh, out),
        }
        .map_err(write_err)
    }

    fn execute(&self, path: &Path, request: &WrapperRequest) -> Result<Mesh, MeshError> {
        let source = match request.source_format.as_deref() {
            Some(format) => format.to_string(),
            None => path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .ok_or(MeshError::MissingField("source_format"))?,
        };

        match request.operation {
            WrapperOperation::Read => self.load(path, &source),
            WrapperOperation::Convert => {
                let target = request
                    .target_format
                    .as_deref()
                    .ok_or(MeshError::MissingField("target_format"))?;
                let output = request
                    .output_path
                    .as_deref()
                    .ok_or(MeshError::MissingField("output_path"))?;
                if !Self::FORMATS.contains(&target) {
                    return Err(MeshError::UnsupportedFormat(target.to_string()));
                }
                let mesh = self.load(path, &source)?;
                self.save(&mesh, output, target)?;
                Ok(mesh)
            }
            WrapperOperation::Extrude => Err(MeshError::UnsupportedOperation("extrude".into())),
        }
    }
}

impl crate::protocol::ProcessWrapper for MeshWrapper {
    fn process(&self, path: &Path, request: &WrapperRequest) -> WrapperResponse {
        match self.execute(path, request) {
            Ok(mesh) => WrapperResponse::success(Some(mesh.summary())),
            Err(e) => WrapperResponse::failure(e.to_string()),
        }
    }
}
