//! Assembly root parsing (`3D/3dmodel.model`)
//!
//! The assembly root carries model metadata, the assembly objects (which
//! reference geometry in sub-model parts through components) and the build
//! items. Mesh data itself lives in the sub-model parts.

use crate::error::{Error, Result};
use crate::model::{AssemblyObject, BuildItem, Component, MetadataEntry};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::BTreeMap;

use super::{XML_BUFFER_CAPACITY, attr_by_local_name, local_name, parse_attributes};

/// Parse the assembly root XML
///
/// Returns the model metadata (file order, unique names), the assembly
/// objects keyed by id, and the build items in file order.
pub(super) fn parse_assembly(
    xml: &str,
) -> Result<(
    Vec<MetadataEntry>,
    BTreeMap<usize, AssemblyObject>,
    Vec<BuildItem>,
)> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut metadata: Vec<MetadataEntry> = Vec::new();
    let mut objects = BTreeMap::new();
    let mut build_items = Vec::new();

    let mut buf = Vec::with_capacity(XML_BUFFER_CAPACITY);
    let mut text_buf = Vec::with_capacity(XML_BUFFER_CAPACITY);

    let mut saw_model = false;
    let mut in_resources = false;
    let mut in_components = false;
    let mut in_build = false;
    let mut current_object: Option<AssemblyObject> = None;

    loop {
        let event = reader.read_event_into(&mut buf)?;
        let is_empty_element = matches!(event, Event::Empty(_));

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let name = e.name();
                let name_str = std::str::from_utf8(name.as_ref())
                    .map_err(|e| Error::XmlAttr(e.to_string()))?;

                match local_name(name_str) {
                    "model" => saw_model = true,
                    "metadata" => {
                        let attrs = parse_attributes(e)?;
                        let name = attrs.get("name").cloned().unwrap_or_default();

                        let value = if is_empty_element {
                            String::new()
                        } else {
                            // The value is the element's text content; an
                            // End event right away means an empty value.
                            text_buf.clear();
                            match reader.read_event_into(&mut text_buf)? {
                                Event::Text(t) => t
                                    .xml_content()
                                    .map_err(|e| Error::XmlAttr(e.to_string()))?
                                    .trim()
                                    .to_string(),
                                _ => String::new(),
                            }
                        };

                        // Names stay unique; a duplicate updates the value
                        // in place, keeping the original position.
                        match metadata.iter_mut().find(|entry| entry.name == name) {
                            Some(entry) => entry.value = value,
                            None => metadata.push(MetadataEntry::new(name, value)),
                        }
                    }
                    "resources" => in_resources = true,
                    "object" if in_resources => {
                        let object = parse_object(e)?;
                        if is_empty_element {
                            objects.insert(object.id, object);
                        } else {
                            current_object = Some(object);
                        }
                    }
                    "components" => in_components = true,
                    "component" if in_components => {
                        if let Some(object) = current_object.as_mut() {
                            object.components.push(parse_component(e)?);
                        }
                    }
                    "build" => in_build = true,
                    "item" if in_build => build_items.push(parse_build_item(e)?),
                    _ => {}
                }
            }
            Event::End(ref e) => {
                let name = e.name();
                let name_str = std::str::from_utf8(name.as_ref())
                    .map_err(|e| Error::XmlAttr(e.to_string()))?;

                match local_name(name_str) {
                    "object" => {
                        if let Some(object) = current_object.take() {
                            objects.insert(object.id, object);
                        }
                    }
                    "components" => in_components = false,
                    "resources" => in_resources = false,
                    "build" => in_build = false,
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_model {
        return Err(Error::malformed_assembly(
            crate::opc::MODEL_PATH,
            "missing <model> element",
        ));
    }

    Ok((metadata, objects, build_items))
}

/// Parse an assembly-level object element
fn parse_object(e: &quick_xml::events::BytesStart) -> Result<AssemblyObject> {
    let attrs = parse_attributes(e)?;

    let id = attrs
        .get("id")
        .ok_or_else(|| Error::XmlAttr("object missing id attribute".to_string()))?
        .parse::<usize>()?;

    let mut object = AssemblyObject::new(id);
    if let Some(uuid) = attr_by_local_name(&attrs, "UUID") {
        object.uuid = uuid;
    }

    Ok(object)
}

/// Parse a component element
fn parse_component(e: &quick_xml::events::BytesStart) -> Result<Component> {
    let attrs = parse_attributes(e)?;

    let objectid = match attrs.get("objectid") {
        Some(value) => value.parse::<usize>()?,
        None => 0,
    };

    Ok(Component {
        path: attr_by_local_name(&attrs, "path").unwrap_or_default(),
        objectid,
        uuid: attr_by_local_name(&attrs, "UUID").unwrap_or_default(),
        transform: attrs.get("transform").cloned().unwrap_or_default(),
    })
}

/// Parse a build item element
fn parse_build_item(e: &quick_xml::events::BytesStart) -> Result<BuildItem> {
    let attrs = parse_attributes(e)?;

    let objectid = match attrs.get("objectid") {
        Some(value) => value.parse::<usize>()?,
        None => 0,
    };

    Ok(BuildItem {
        objectid,
        uuid: attr_by_local_name(&attrs, "UUID").unwrap_or_default(),
        transform: attrs.get("transform").cloned().unwrap_or_default(),
        printable: attrs.get("printable").map(|v| v == "1").unwrap_or(true),
    })
}
