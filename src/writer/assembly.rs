//! Assembly and sub-model XML serialization

use crate::error::Result;
use crate::model::{BuildItem, Component, ExportMesh, MetadataEntry};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use super::{AssembledGroup, NS_BAMBU, NS_CORE, NS_PROD, emit, into_xml_string};

/// Vendor metadata entry stamped into every model part
const BAMBU_VERSION_KEY: &str = "BambuStudio:3mfVersion";

/// Start a `<model>` element with the three namespace declarations every
/// Bambu model part carries
fn model_element() -> BytesStart<'static> {
    let mut elem = BytesStart::new("model");
    elem.push_attribute(("unit", "millimeter"));
    elem.push_attribute(("xml:lang", "en-US"));
    elem.push_attribute(("xmlns", NS_CORE));
    elem.push_attribute(("xmlns:p", NS_PROD));
    elem.push_attribute(("xmlns:BambuStudio", NS_BAMBU));
    elem.push_attribute(("requiredextensions", "p"));
    elem
}

/// Write one `<metadata name="...">value</metadata>` entry
fn write_metadata<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: &str,
) -> Result<()> {
    let mut elem = BytesStart::new("metadata");
    elem.push_attribute(("name", name));
    emit(writer, Event::Start(elem), "metadata element")?;
    emit(writer, Event::Text(BytesText::new(value)), "metadata value")?;
    emit(writer, Event::End(BytesEnd::new("metadata")), "metadata end")
}

/// Build the main assembly XML (`3D/3dmodel.model`)
///
/// The `Application` entry always comes first — Bambu Studio reads it to
/// recognize its own files — with a round-tripped value winning over the
/// host-supplied one. Remaining round-tripped metadata follows in its
/// original order.
pub(super) fn build_main_model(
    groups: &[AssembledGroup],
    build_items: &[BuildItem],
    metadata: &[MetadataEntry],
    application: &str,
) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 1);

    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        "XML declaration",
    )?;
    emit(&mut writer, Event::Start(model_element()), "model element")?;

    let app_value = metadata
        .iter()
        .find(|entry| entry.name == "Application" && !entry.value.is_empty())
        .map(|entry| entry.value.as_str())
        .unwrap_or(application);
    write_metadata(&mut writer, "Application", app_value)?;
    write_metadata(&mut writer, BAMBU_VERSION_KEY, "1")?;

    for entry in metadata {
        if entry.name == "Application" || entry.name == BAMBU_VERSION_KEY {
            continue;
        }
        if entry.value.is_empty() {
            continue;
        }
        write_metadata(&mut writer, &entry.name, &entry.value)?;
    }

    emit(
        &mut writer,
        Event::Start(BytesStart::new("resources")),
        "resources element",
    )?;
    for group in groups {
        let mut elem = BytesStart::new("object");
        elem.push_attribute(("id", group.id.to_string().as_str()));
        elem.push_attribute(("p:UUID", group.uuid.as_str()));
        elem.push_attribute(("type", "model"));
        emit(&mut writer, Event::Start(elem), "object element")?;

        emit(
            &mut writer,
            Event::Start(BytesStart::new("components")),
            "components element",
        )?;
        for component in &group.components {
            write_component(&mut writer, component)?;
        }
        emit(
            &mut writer,
            Event::End(BytesEnd::new("components")),
            "components end",
        )?;
        emit(&mut writer, Event::End(BytesEnd::new("object")), "object end")?;
    }
    emit(
        &mut writer,
        Event::End(BytesEnd::new("resources")),
        "resources end",
    )?;

    let mut build = BytesStart::new("build");
    build.push_attribute(("p:UUID", uuid::Uuid::new_v4().to_string().as_str()));
    emit(&mut writer, Event::Start(build), "build element")?;
    for item in build_items {
        let mut elem = BytesStart::new("item");
        elem.push_attribute(("objectid", item.objectid.to_string().as_str()));
        elem.push_attribute(("p:UUID", item.uuid.as_str()));
        if !item.transform.is_empty() {
            elem.push_attribute(("transform", item.transform.as_str()));
        }
        elem.push_attribute(("printable", if item.printable { "1" } else { "0" }));
        emit(&mut writer, Event::Empty(elem), "build item")?;
    }
    emit(&mut writer, Event::End(BytesEnd::new("build")), "build end")?;
    emit(&mut writer, Event::End(BytesEnd::new("model")), "model end")?;

    into_xml_string(writer)
}

fn write_component<W: std::io::Write>(writer: &mut Writer<W>, component: &Component) -> Result<()> {
    let mut elem = BytesStart::new("component");
    elem.push_attribute(("p:path", component.path.as_str()));
    elem.push_attribute(("objectid", component.objectid.to_string().as_str()));
    elem.push_attribute(("p:UUID", component.uuid.as_str()));
    if !component.transform.is_empty() {
        elem.push_attribute(("transform", component.transform.as_str()));
    }
    emit(writer, Event::Empty(elem), "component")
}

/// Build one sub-model part containing the group's mesh data
///
/// `components` is aligned with `children` and supplies the part ids and
/// UUIDs; vertices are scaled from scene units to millimeters.
pub(super) fn build_sub_model(
    children: &[ExportMesh],
    components: &[Component],
    scale: f64,
) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 1);

    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        "XML declaration",
    )?;
    emit(&mut writer, Event::Start(model_element()), "model element")?;
    write_metadata(&mut writer, BAMBU_VERSION_KEY, "1")?;

    emit(
        &mut writer,
        Event::Start(BytesStart::new("resources")),
        "resources element",
    )?;

    for (child, component) in children.iter().zip(components) {
        let mut elem = BytesStart::new("object");
        elem.push_attribute(("id", component.objectid.to_string().as_str()));
        elem.push_attribute(("p:UUID", component.uuid.as_str()));
        elem.push_attribute(("type", "model"));
        emit(&mut writer, Event::Start(elem), "object element")?;
        emit(
            &mut writer,
            Event::Start(BytesStart::new("mesh")),
            "mesh element",
        )?;

        emit(
            &mut writer,
            Event::Start(BytesStart::new("vertices")),
            "vertices element",
        )?;
        for vertex in &child.mesh.vertices {
            let mut v_elem = BytesStart::new("vertex");
            v_elem.push_attribute(("x", (vertex.x * scale).to_string().as_str()));
            v_elem.push_attribute(("y", (vertex.y * scale).to_string().as_str()));
            v_elem.push_attribute(("z", (vertex.z * scale).to_string().as_str()));
            emit(&mut writer, Event::Empty(v_elem), "vertex")?;
        }
        emit(
            &mut writer,
            Event::End(BytesEnd::new("vertices")),
            "vertices end",
        )?;

        emit(
            &mut writer,
            Event::Start(BytesStart::new("triangles")),
            "triangles element",
        )?;
        for triangle in &child.mesh.triangles {
            let mut t_elem = BytesStart::new("triangle");
            t_elem.push_attribute(("v1", triangle.v1.to_string().as_str()));
            t_elem.push_attribute(("v2", triangle.v2.to_string().as_str()));
            t_elem.push_attribute(("v3", triangle.v3.to_string().as_str()));
            emit(&mut writer, Event::Empty(t_elem), "triangle")?;
        }
        emit(
            &mut writer,
            Event::End(BytesEnd::new("triangles")),
            "triangles end",
        )?;

        emit(&mut writer, Event::End(BytesEnd::new("mesh")), "mesh end")?;
        emit(&mut writer, Event::End(BytesEnd::new("object")), "object end")?;
    }

    emit(
        &mut writer,
        Event::End(BytesEnd::new("resources")),
        "resources end",
    )?;
    emit(&mut writer, Event::End(BytesEnd::new("model")), "model end")?;

    into_xml_string(writer)
}
