/// STL codec for binary and ASCII formats
use std::fmt::Write as _;

use nalgebra::{Point3, Vector3};
use nom::{
    bytes::complete::{tag, take},
    character::complete::{multispace0, multispace1, not_line_ending},
    combinator::all_consuming,
    multi::{count, many0},
    number::complete::{float, le_f32, le_u16},
    sequence::{preceded, tuple},
    IResult,
};
use serde::{Deserialize, Serialize};

use crate::error::StlError;
use crate::geometry::GeometryBuffer;

/// Binary header size in bytes.
const HEADER_SIZE: usize = 80;
/// Header plus the little-endian triangle count.
const PREAMBLE_SIZE: usize = HEADER_SIZE + 4;
/// Normal, three corners and the attribute word.
const FACET_SIZE: usize = 50;

const ASCII_SOLID_NAME: &str = "exported";

/// Output flavour for the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StlFormat {
    #[default]
    Ascii,
    Binary,
}

type Facet = [Point3<f32>; 3];

/// Detect the format and decode.
///
/// Text starting with `solid` is tried as ASCII first. Some binary
/// exporters also start their header with `solid`, so a failed ASCII parse
/// falls back to binary when the byte length matches the binary layout.
pub fn decode(data: &[u8]) -> Result<GeometryBuffer, StlError> {
    if looks_like_ascii(data) {
        if let Ok(text) = std::str::from_utf8(data) {
            match decode_ascii(text) {
                Ok(geometry) => return Ok(geometry),
                Err(err) if !has_binary_layout(data) => return Err(err),
                Err(_) => {}
            }
        }
    }
    decode_binary(data)
}

/// Decode a binary STL body.
pub fn decode_binary(data: &[u8]) -> Result<GeometryBuffer, StlError> {
    if data.len() < PREAMBLE_SIZE {
        return Err(StlError::TooSmall(data.len()));
    }

    let declared = declared_facets(data);
    let body = &data[PREAMBLE_SIZE..];
    let available = body.len() / FACET_SIZE;
    if available < declared {
        return Err(StlError::Truncated {
            declared,
            available,
        });
    }

    let (_, facets) = count(binary_facet, declared)(body).map_err(|_| StlError::Truncated {
        declared,
        available,
    })?;
    Ok(facets_to_geometry(facets))
}

/// Decode ASCII STL text.
pub fn decode_ascii(input: &str) -> Result<GeometryBuffer, StlError> {
    match all_consuming(ascii_solid)(input) {
        Ok((_, facets)) => Ok(facets_to_geometry(facets)),
        Err(err) => Err(StlError::Ascii(err.to_string())),
    }
}

/// Encode one or more buffers as a single STL solid.
pub fn encode(geometries: &[GeometryBuffer], format: StlFormat) -> Vec<u8> {
    match format {
        StlFormat::Ascii => encode_ascii(geometries).into_bytes(),
        StlFormat::Binary => encode_binary(geometries),
    }
}

pub fn encode_binary(geometries: &[GeometryBuffer]) -> Vec<u8> {
    let facet_count: usize = geometries.iter().map(GeometryBuffer::triangle_count).sum();
    let mut out = Vec::with_capacity(PREAMBLE_SIZE + facet_count * FACET_SIZE);

    let mut header = [b' '; HEADER_SIZE];
    let text = b"binary STL exported by meshpad";
    header[..text.len()].copy_from_slice(text);
    out.extend_from_slice(&header);
    out.extend_from_slice(&(facet_count as u32).to_le_bytes());

    for facet in facets(geometries) {
        let normal = facet_normal(&facet);
        for value in normal.iter().chain(facet.iter().flat_map(|p| p.coords.iter())) {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out.extend_from_slice(&0u16.to_le_bytes());
    }
    out
}

pub fn encode_ascii(geometries: &[GeometryBuffer]) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(out, "solid {ASCII_SOLID_NAME}");
    for facet in facets(geometries) {
        let n = facet_normal(&facet);
        let _ = writeln!(out, "  facet normal {:.6e} {:.6e} {:.6e}", n.x, n.y, n.z);
        let _ = writeln!(out, "    outer loop");
        for p in &facet {
            let _ = writeln!(out, "      vertex {:.6e} {:.6e} {:.6e}", p.x, p.y, p.z);
        }
        let _ = writeln!(out, "    endloop");
        let _ = writeln!(out, "  endfacet");
    }
    let _ = writeln!(out, "endsolid {ASCII_SOLID_NAME}");
    out
}

fn looks_like_ascii(data: &[u8]) -> bool {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    data[start..].starts_with(b"solid")
}

fn has_binary_layout(data: &[u8]) -> bool {
    data.len() >= PREAMBLE_SIZE
        && declared_facets(data)
            .checked_mul(FACET_SIZE)
            .and_then(|body| body.checked_add(PREAMBLE_SIZE))
            == Some(data.len())
}

fn declared_facets(data: &[u8]) -> usize {
    let mut word = [0u8; 4];
    word.copy_from_slice(&data[HEADER_SIZE..PREAMBLE_SIZE]);
    u32::from_le_bytes(word) as usize
}

/// Each facet keeps its own three corners; indices are sequential.
fn facets_to_geometry(facets: Vec<Facet>) -> GeometryBuffer {
    let positions: Vec<Point3<f32>> = facets.into_iter().flatten().collect();
    let indices = (0..positions.len() as u32).collect();
    GeometryBuffer::new(positions, indices)
}

fn facets(geometries: &[GeometryBuffer]) -> impl Iterator<Item = Facet> + '_ {
    geometries
        .iter()
        .flat_map(|g| g.triangles().map(move |t| g.triangle_positions(t)))
}

fn facet_normal([a, b, c]: &Facet) -> Vector3<f32> {
    (b - a)
        .cross(&(c - a))
        .try_normalize(0.0)
        .unwrap_or_else(Vector3::zeros)
}

fn binary_point(input: &[u8]) -> IResult<&[u8], Point3<f32>> {
    let (input, (x, y, z)) = tuple((le_f32, le_f32, le_f32))(input)?;
    Ok((input, Point3::new(x, y, z)))
}

fn binary_facet(input: &[u8]) -> IResult<&[u8], Facet> {
    // Stored normals are often wrong; they are recomputed from the corners.
    let (input, _normal) = take(12usize)(input)?;
    let (input, (a, b, c)) = tuple((binary_point, binary_point, binary_point))(input)?;
    let (input, _attributes) = le_u16(input)?;
    Ok((input, [a, b, c]))
}

fn ascii_solid(input: &str) -> IResult<&str, Vec<Facet>> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    let (input, _name) = not_line_ending(input)?;
    let (input, facets) = many0(ascii_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;
    let (input, _name) = not_line_ending(input)?;
    let (input, _) = multispace0(input)?;
    Ok((input, facets))
}

fn ascii_facet(input: &str) -> IResult<&str, Facet> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, _normal) = ascii_vector(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, a) = ascii_vertex(input)?;
    let (input, b) = ascii_vertex(input)?;
    let (input, c) = ascii_vertex(input)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;
    Ok((input, [a, b, c]))
}

fn ascii_vertex(input: &str) -> IResult<&str, Point3<f32>> {
    let (input, _) = preceded(multispace0, tag("vertex"))(input)?;
    let (input, [x, y, z]) = ascii_vector(input)?;
    Ok((input, Point3::new(x, y, z)))
}

fn ascii_vector(input: &str) -> IResult<&str, [f32; 3]> {
    let (input, x) = preceded(multispace1, float)(input)?;
    let (input, y) = preceded(multispace1, float)(input)?;
    let (input, z) = preceded(multispace1, float)(input)?;
    Ok((input, [x, y, z]))
}
