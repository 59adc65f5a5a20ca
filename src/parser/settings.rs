//! Bambu config parsing (`Metadata/model_settings.config`,
//! `Metadata/slice_info.config`)
//!
//! Both parts are simple attribute-based XML with no namespace. The
//! `<plate>` and `<assemble>` sections of `model_settings.config` are kept
//! as opaque key/value rows for round-trip.

use crate::error::{Error, Result};
use crate::model::{
    AssembleItem, AssemblyObject, Filament, ModelInstance, ModelSettingsEntry, PartInfo,
    PlateFilament, PlateObject, SettingsPlate, SlicePlate,
};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::BTreeMap;

use super::{XML_BUFFER_CAPACITY, parse_attributes};

/// Parse `model_settings.config`
///
/// Returns the per-object settings tree plus the `<plate>`/`<assemble>`
/// round-trip sections.
pub(super) fn parse_model_settings(
    xml: &str,
) -> Result<(
    BTreeMap<usize, ModelSettingsEntry>,
    Vec<SettingsPlate>,
    Vec<AssembleItem>,
)> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = BTreeMap::new();
    let mut plates = Vec::new();
    let mut assemble = Vec::new();

    let mut buf = Vec::with_capacity(XML_BUFFER_CAPACITY);

    let mut current_object: Option<(usize, ModelSettingsEntry)> = None;
    let mut current_part: Option<PartInfo> = None;
    let mut current_plate: Option<SettingsPlate> = None;
    let mut current_instance: Option<ModelInstance> = None;
    let mut in_assemble = false;

    loop {
        let event = reader.read_event_into(&mut buf)?;
        let is_empty_element = matches!(event, Event::Empty(_));

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let name = e.name();
                let name_str = std::str::from_utf8(name.as_ref())
                    .map_err(|e| Error::XmlAttr(e.to_string()))?;

                match name_str {
                    "object" => {
                        let attrs = parse_attributes(e)?;
                        let id = attrs
                            .get("id")
                            .ok_or_else(|| {
                                Error::XmlAttr("object missing id attribute".to_string())
                            })?
                            .parse::<usize>()?;
                        let entry = ModelSettingsEntry::new();
                        if is_empty_element {
                            entries.insert(id, entry);
                        } else {
                            current_object = Some((id, entry));
                        }
                    }
                    "part" => {
                        let attrs = parse_attributes(e)?;
                        let id = attrs
                            .get("id")
                            .ok_or_else(|| {
                                Error::XmlAttr("part missing id attribute".to_string())
                            })?
                            .parse::<usize>()?;
                        let mut part = PartInfo::new(id);
                        if let Some(subtype) = attrs.get("subtype") {
                            part.subtype = subtype.clone();
                        }
                        if is_empty_element {
                            if let Some((_, entry)) = current_object.as_mut() {
                                entry.parts.insert(part.id, part);
                            }
                        } else {
                            current_part = Some(part);
                        }
                    }
                    "mesh_stat" => {
                        let attrs = parse_attributes(e)?;
                        if let Some(part) = current_part.as_mut() {
                            if let Some(count) = attrs.get("face_count") {
                                part.face_count = count.parse::<usize>()?;
                            }
                        }
                    }
                    "metadata" => {
                        let attrs = parse_attributes(e)?;
                        let key = attrs.get("key").cloned().unwrap_or_default();
                        let value = attrs.get("value").cloned().unwrap_or_default();

                        // Context decides where the row lands: instance
                        // rows before plate rows, part fields before
                        // object fields.
                        if let Some(instance) = current_instance.as_mut() {
                            instance.entries.push((key, value));
                        } else if let Some(plate) = current_plate.as_mut() {
                            plate.metadata.push((key, value));
                        } else if let Some(part) = current_part.as_mut() {
                            match key.as_str() {
                                "name" => part.name = value,
                                "extruder" => {
                                    part.extruder = if value.is_empty() {
                                        None
                                    } else {
                                        Some(value.parse::<usize>()?)
                                    };
                                }
                                _ => {}
                            }
                        } else if let Some((_, entry)) = current_object.as_mut() {
                            match key.as_str() {
                                "name" => entry.name = value,
                                "extruder" => {
                                    entry.extruder = if value.is_empty() {
                                        1
                                    } else {
                                        value.parse::<usize>()?
                                    };
                                }
                                _ => {}
                            }
                        }
                    }
                    "plate" => {
                        let plate = SettingsPlate::default();
                        if !is_empty_element {
                            current_plate = Some(plate);
                        }
                    }
                    "model_instance" => {
                        let instance = ModelInstance::default();
                        if is_empty_element {
                            if let Some(plate) = current_plate.as_mut() {
                                plate.instances.push(instance);
                            }
                        } else {
                            current_instance = Some(instance);
                        }
                    }
                    "assemble" => in_assemble = true,
                    "assemble_item" if in_assemble => {
                        let attrs = parse_attributes(e)?;
                        assemble.push(AssembleItem {
                            object_id: attrs.get("object_id").cloned().unwrap_or_default(),
                            instance_id: attrs.get("instance_id").cloned().unwrap_or_default(),
                            transform: attrs.get("transform").cloned().unwrap_or_default(),
                            offset: attrs.get("offset").cloned().unwrap_or_default(),
                        });
                    }
                    _ => {}
                }
            }
            Event::End(ref e) => match e.name().as_ref() {
                b"object" => {
                    if let Some((id, entry)) = current_object.take() {
                        entries.insert(id, entry);
                    }
                }
                b"part" => {
                    if let Some(part) = current_part.take() {
                        if let Some((_, entry)) = current_object.as_mut() {
                            entry.parts.insert(part.id, part);
                        }
                    }
                }
                b"plate" => {
                    if let Some(plate) = current_plate.take() {
                        plates.push(plate);
                    }
                }
                b"model_instance" => {
                    if let Some(instance) = current_instance.take() {
                        if let Some(plate) = current_plate.as_mut() {
                            plate.instances.push(instance);
                        }
                    }
                }
                b"assemble" => in_assemble = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok((entries, plates, assemble))
}

/// Parse `slice_info.config`
///
/// Returns the global filament table (first-wins union across all plates,
/// keyed by filament id) and the slice plates in file order. The
/// `<header>` block is not interpreted.
pub(super) fn parse_slice_info(
    xml: &str,
) -> Result<(BTreeMap<usize, Filament>, Vec<SlicePlate>)> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut filaments = BTreeMap::new();
    let mut plates = Vec::new();

    let mut buf = Vec::with_capacity(XML_BUFFER_CAPACITY);
    let mut current_plate: Option<SlicePlate> = None;

    loop {
        let event = reader.read_event_into(&mut buf)?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let name = e.name();
                let name_str = std::str::from_utf8(name.as_ref())
                    .map_err(|e| Error::XmlAttr(e.to_string()))?;

                match name_str {
                    "plate" => current_plate = Some(SlicePlate::default()),
                    "metadata" => {
                        if let Some(plate) = current_plate.as_mut() {
                            let attrs = parse_attributes(e)?;
                            let key = attrs.get("key").cloned().unwrap_or_default();
                            let value = attrs.get("value").cloned().unwrap_or_default();
                            if key == "index" {
                                plate.index = value.parse::<usize>()?;
                            }
                            plate.metadata.push((key, value));
                        }
                    }
                    "object" => {
                        if let Some(plate) = current_plate.as_mut() {
                            let attrs = parse_attributes(e)?;
                            plate.objects.push(PlateObject {
                                identify_id: attrs
                                    .get("identify_id")
                                    .cloned()
                                    .unwrap_or_default(),
                                name: attrs.get("name").cloned().unwrap_or_default(),
                                skipped: attrs.get("skipped").map(|v| v == "true").unwrap_or(false),
                            });
                        }
                    }
                    "filament" => {
                        if let Some(plate) = current_plate.as_mut() {
                            let attrs = parse_attributes(e)?;
                            let id = attrs
                                .get("id")
                                .ok_or_else(|| {
                                    Error::XmlAttr("filament missing id attribute".to_string())
                                })?
                                .parse::<usize>()?;
                            let entry = PlateFilament {
                                id,
                                material: attrs.get("type").cloned().unwrap_or_default(),
                                color: attrs
                                    .get("color")
                                    .cloned()
                                    .unwrap_or_else(|| "#808080".to_string()),
                                tray_info_idx: attrs
                                    .get("tray_info_idx")
                                    .cloned()
                                    .unwrap_or_default(),
                                used_m: attrs.get("used_m").cloned().unwrap_or_default(),
                                used_g: attrs.get("used_g").cloned().unwrap_or_default(),
                            };

                            // Global table: first occurrence wins on
                            // conflicting type/color for the same id.
                            filaments.entry(id).or_insert_with(|| Filament {
                                id,
                                material: entry.material.clone(),
                                color: entry.color.clone(),
                                tray_info_idx: entry.tray_info_idx.clone(),
                            });

                            plate.filaments.push(entry);
                        }
                    }
                    _ => {}
                }
            }
            Event::End(ref e) => {
                if e.name().as_ref() == b"plate" {
                    if let Some(plate) = current_plate.take() {
                        plates.push(plate);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok((filaments, plates))
}

/// Overwrite assembly object names/extruders from the settings tree
///
/// Objects without a settings entry keep their defaults.
pub(super) fn enrich_objects(
    objects: &mut BTreeMap<usize, AssemblyObject>,
    settings: &BTreeMap<usize, ModelSettingsEntry>,
) {
    for (id, object) in objects.iter_mut() {
        if let Some(entry) = settings.get(id) {
            object.name = entry.name.clone();
            object.extruder = entry.extruder;
        }
    }
}
