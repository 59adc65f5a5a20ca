//! Sub-model mesh parsing (`3D/Objects/object_N.model`)

use crate::error::{Error, Result};
use crate::model::{Mesh, Triangle, Vertex};
use quick_xml::Reader;
use quick_xml::events::Event;

use super::{XML_BUFFER_CAPACITY, local_name};

/// Parse a sub-model part, returning `(object_id, mesh)` for every
/// `<object>` that carries mesh data
///
/// Objects without a `<mesh>` child are skipped. A triangle referencing a
/// vertex index out of range makes the whole part unusable — the caller
/// absorbs that as a warning and the referencing components stay
/// unresolved.
pub(super) fn parse_sub_model(xml: &str) -> Result<Vec<(usize, Mesh)>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut parsed = Vec::new();
    let mut buf = Vec::with_capacity(XML_BUFFER_CAPACITY);

    let mut current_id: Option<usize> = None;
    let mut current_mesh: Option<Mesh> = None;

    loop {
        let event = reader.read_event_into(&mut buf)?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let name = e.name();
                let name_str = std::str::from_utf8(name.as_ref())
                    .map_err(|e| Error::XmlAttr(e.to_string()))?;

                match local_name(name_str) {
                    "object" => {
                        current_id = Some(parse_object_id(e)?);
                        current_mesh = None;
                    }
                    "mesh" => current_mesh = Some(Mesh::new()),
                    "vertex" => {
                        if let Some(mesh) = current_mesh.as_mut() {
                            mesh.vertices.push(parse_vertex(e)?);
                        }
                    }
                    "triangle" => {
                        if let Some(mesh) = current_mesh.as_mut() {
                            mesh.triangles.push(parse_triangle(e)?);
                        }
                    }
                    _ => {}
                }
            }
            Event::End(ref e) => {
                let name = e.name();
                let name_str = std::str::from_utf8(name.as_ref())
                    .map_err(|e| Error::XmlAttr(e.to_string()))?;

                if local_name(name_str) == "object" {
                    if let (Some(id), Some(mesh)) = (current_id.take(), current_mesh.take()) {
                        validate_indices(id, &mesh)?;
                        parsed.push((id, mesh));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(parsed)
}

/// Every triangle index must be a valid vertex index
fn validate_indices(id: usize, mesh: &Mesh) -> Result<()> {
    let vertex_count = mesh.vertices.len();
    for triangle in &mesh.triangles {
        let max = triangle.v1.max(triangle.v2).max(triangle.v3);
        if max >= vertex_count {
            return Err(Error::ParseError(format!(
                "object {}: triangle index {} out of range ({} vertices)",
                id, max, vertex_count
            )));
        }
    }
    Ok(())
}

fn parse_object_id(e: &quick_xml::events::BytesStart) -> Result<usize> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"id" {
            let value =
                std::str::from_utf8(&attr.value).map_err(|e| Error::XmlAttr(e.to_string()))?;
            return Ok(value.parse::<usize>()?);
        }
    }
    Err(Error::XmlAttr("object missing id attribute".to_string()))
}

/// Parse a vertex element without building an attribute map
fn parse_vertex(e: &quick_xml::events::BytesStart) -> Result<Vertex> {
    let mut x: Option<f64> = None;
    let mut y: Option<f64> = None;
    let mut z: Option<f64> = None;

    let parse_f64 = |value: &[u8]| -> Result<f64> {
        let value_str = std::str::from_utf8(value).map_err(|e| Error::XmlAttr(e.to_string()))?;
        Ok(value_str.parse::<f64>()?)
    };

    for attr in e.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            b"x" => x = Some(parse_f64(&attr.value)?),
            b"y" => y = Some(parse_f64(&attr.value)?),
            b"z" => z = Some(parse_f64(&attr.value)?),
            _ => {}
        }
    }

    let x = x.ok_or_else(|| Error::XmlAttr("vertex missing x attribute".to_string()))?;
    let y = y.ok_or_else(|| Error::XmlAttr("vertex missing y attribute".to_string()))?;
    let z = z.ok_or_else(|| Error::XmlAttr("vertex missing z attribute".to_string()))?;

    Ok(Vertex::new(x, y, z))
}

/// Parse a triangle element without building an attribute map
fn parse_triangle(e: &quick_xml::events::BytesStart) -> Result<Triangle> {
    let mut v1: Option<usize> = None;
    let mut v2: Option<usize> = None;
    let mut v3: Option<usize> = None;

    let parse_index = |value: &[u8]| -> Result<usize> {
        let value_str = std::str::from_utf8(value).map_err(|e| Error::XmlAttr(e.to_string()))?;
        Ok(value_str.parse::<usize>()?)
    };

    for attr in e.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            b"v1" => v1 = Some(parse_index(&attr.value)?),
            b"v2" => v2 = Some(parse_index(&attr.value)?),
            b"v3" => v3 = Some(parse_index(&attr.value)?),
            _ => {}
        }
    }

    let v1 = v1.ok_or_else(|| Error::XmlAttr("triangle missing v1 attribute".to_string()))?;
    let v2 = v2.ok_or_else(|| Error::XmlAttr("triangle missing v2 attribute".to_string()))?;
    let v3 = v3.ok_or_else(|| Error::XmlAttr("triangle missing v3 attribute".to_string()))?;

    Ok(Triangle::new(v1, v2, v3))
}
