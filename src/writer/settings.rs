//! Bambu config serialization (`model_settings.config`, `slice_info.config`)

use crate::error::Result;
use crate::model::{AssembleItem, ExportGroup, SettingsPlate, SlicePlate};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};

use super::{AssembledGroup, emit, into_xml_string};

/// Write one `<metadata key="..." value="..."/>` row
fn write_kv_row<W: std::io::Write>(
    writer: &mut Writer<W>,
    key: &str,
    value: &str,
) -> Result<()> {
    let mut elem = BytesStart::new("metadata");
    elem.push_attribute(("key", key));
    elem.push_attribute(("value", value));
    emit(writer, Event::Empty(elem), "metadata row")
}

/// Build `Metadata/model_settings.config`
///
/// One `<object>`/`<part>` block per group and child, using the reconciled
/// ids (which match the assembly model and the sub-model parts), followed
/// by the reconciled `<plate>` and `<assemble>` sections.
pub(super) fn build_model_settings(
    groups: &[ExportGroup],
    assembled: &[AssembledGroup],
    ms_plates: &[SettingsPlate],
    ms_assemble: &[AssembleItem],
) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        "XML declaration",
    )?;
    emit(
        &mut writer,
        Event::Start(BytesStart::new("config")),
        "config element",
    )?;

    for (group, asm) in groups.iter().zip(assembled) {
        let mut elem = BytesStart::new("object");
        elem.push_attribute(("id", asm.id.to_string().as_str()));
        emit(&mut writer, Event::Start(elem), "object element")?;

        write_kv_row(&mut writer, "name", &group.name)?;
        write_kv_row(&mut writer, "extruder", &group.extruder.to_string())?;

        // Part ids must match the objectids in the sub-model part; the
        // assembled components were built in child order, so zip is safe.
        for (child, component) in group.children.iter().zip(&asm.components) {
            let mut part = BytesStart::new("part");
            part.push_attribute(("id", component.objectid.to_string().as_str()));
            part.push_attribute(("subtype", child.subtype.as_str()));
            emit(&mut writer, Event::Start(part), "part element")?;

            let part_name = child.part_name.as_deref().unwrap_or(child.name.as_str());
            write_kv_row(&mut writer, "name", part_name)?;
            if let Some(extruder) = child.extruder {
                write_kv_row(&mut writer, "extruder", &extruder.to_string())?;
            }

            emit(&mut writer, Event::End(BytesEnd::new("part")), "part end")?;
        }

        emit(&mut writer, Event::End(BytesEnd::new("object")), "object end")?;
    }

    for plate in ms_plates {
        emit(
            &mut writer,
            Event::Start(BytesStart::new("plate")),
            "plate element",
        )?;
        for (key, value) in &plate.metadata {
            write_kv_row(&mut writer, key, value)?;
        }
        for instance in &plate.instances {
            emit(
                &mut writer,
                Event::Start(BytesStart::new("model_instance")),
                "model_instance element",
            )?;
            for (key, value) in &instance.entries {
                write_kv_row(&mut writer, key, value)?;
            }
            emit(
                &mut writer,
                Event::End(BytesEnd::new("model_instance")),
                "model_instance end",
            )?;
        }
        emit(&mut writer, Event::End(BytesEnd::new("plate")), "plate end")?;
    }

    if !ms_assemble.is_empty() {
        emit(
            &mut writer,
            Event::Start(BytesStart::new("assemble")),
            "assemble element",
        )?;
        for item in ms_assemble {
            let mut elem = BytesStart::new("assemble_item");
            elem.push_attribute(("object_id", item.object_id.as_str()));
            elem.push_attribute(("instance_id", item.instance_id.as_str()));
            if !item.transform.is_empty() {
                elem.push_attribute(("transform", item.transform.as_str()));
            }
            if !item.offset.is_empty() {
                elem.push_attribute(("offset", item.offset.as_str()));
            }
            emit(&mut writer, Event::Empty(elem), "assemble_item")?;
        }
        emit(
            &mut writer,
            Event::End(BytesEnd::new("assemble")),
            "assemble end",
        )?;
    }

    emit(&mut writer, Event::End(BytesEnd::new("config")), "config end")?;
    into_xml_string(writer)
}

/// Build `Metadata/slice_info.config`
///
/// A `<header>` block with the client type and version, then the
/// reconciled (or freshly generated default) plates.
pub(super) fn build_slice_info(plates: &[SlicePlate], application: &str) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        "XML declaration",
    )?;
    emit(
        &mut writer,
        Event::Start(BytesStart::new("config")),
        "config element",
    )?;

    // The version is the application string without the product prefix,
    // e.g. "BambuStudio-02.00.00.00" -> "02.00.00.00".
    let version = application
        .split_once('-')
        .map(|(_, version)| version)
        .unwrap_or(application);

    emit(
        &mut writer,
        Event::Start(BytesStart::new("header")),
        "header element",
    )?;
    let mut item = BytesStart::new("header_item");
    item.push_attribute(("key", "X-BBL-Client-Type"));
    item.push_attribute(("value", "slicer"));
    emit(&mut writer, Event::Empty(item), "header_item")?;
    let mut item = BytesStart::new("header_item");
    item.push_attribute(("key", "X-BBL-Client-Version"));
    item.push_attribute(("value", version));
    emit(&mut writer, Event::Empty(item), "header_item")?;
    emit(&mut writer, Event::End(BytesEnd::new("header")), "header end")?;

    for plate in plates {
        emit(
            &mut writer,
            Event::Start(BytesStart::new("plate")),
            "plate element",
        )?;
        for (key, value) in &plate.metadata {
            write_kv_row(&mut writer, key, value)?;
        }
        for object in &plate.objects {
            let mut elem = BytesStart::new("object");
            elem.push_attribute(("identify_id", object.identify_id.as_str()));
            elem.push_attribute(("name", object.name.as_str()));
            elem.push_attribute(("skipped", if object.skipped { "true" } else { "false" }));
            emit(&mut writer, Event::Empty(elem), "plate object")?;
        }
        for filament in &plate.filaments {
            let mut elem = BytesStart::new("filament");
            elem.push_attribute(("id", filament.id.to_string().as_str()));
            if !filament.tray_info_idx.is_empty() {
                elem.push_attribute(("tray_info_idx", filament.tray_info_idx.as_str()));
            }
            elem.push_attribute(("type", filament.material.as_str()));
            elem.push_attribute(("color", filament.color.as_str()));
            if !filament.used_m.is_empty() {
                elem.push_attribute(("used_m", filament.used_m.as_str()));
            }
            if !filament.used_g.is_empty() {
                elem.push_attribute(("used_g", filament.used_g.as_str()));
            }
            emit(&mut writer, Event::Empty(elem), "plate filament")?;
        }
        emit(&mut writer, Event::End(BytesEnd::new("plate")), "plate end")?;
    }

    emit(&mut writer, Event::End(BytesEnd::new("config")), "config end")?;
    into_xml_string(writer)
}
