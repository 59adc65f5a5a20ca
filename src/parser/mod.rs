//! XML parsing: package bytes to the in-memory data model

mod assembly;
mod settings;
mod submodel;

use crate::error::{Error, Result, Warning};
use crate::model::Package;
use crate::opc::{
    Container, MODEL_PATH, MODEL_SETTINGS_PATH, PROJECT_SETTINGS_PATH, SLICE_INFO_PATH,
};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// Default buffer capacity for XML parsing (4KB)
const XML_BUFFER_CAPACITY: usize = 4096;

/// Result of one parse call
#[derive(Debug, Clone)]
pub struct ParseReport {
    /// The parsed package
    pub package: Package,
    /// File name stem of the parsed path, for host default naming; empty
    /// when parsing from a reader
    pub file_name: String,
    /// Non-fatal conditions absorbed during the parse
    pub warnings: Vec<Warning>,
}

/// Parse a Bambu 3MF file from a path
pub fn parse_file(path: impl AsRef<Path>) -> Result<ParseReport> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let mut report = parse_reader(file)?;
    report.file_name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(report)
}

/// Parse a Bambu 3MF package from a reader
pub fn parse_reader<R: Read + std::io::Seek>(reader: R) -> Result<ParseReport> {
    let mut container = Container::open(reader)?;
    let mut warnings = Vec::new();

    // 1. Assembly root: the one part this crate requires.
    let assembly_xml = container
        .read_part_string(MODEL_PATH)?
        .ok_or_else(|| Error::malformed_assembly(MODEL_PATH, "part is missing from the package"))?;
    let (metadata, mut objects, build_items) =
        assembly::parse_assembly(&assembly_xml).map_err(|err| match err {
            Error::MalformedAssembly { .. } => err,
            other => Error::malformed_assembly(MODEL_PATH, other),
        })?;

    // 2. Resolve each distinct sub-model path exactly once.
    let mut sub_paths: Vec<String> = Vec::new();
    for obj in objects.values() {
        for comp in &obj.components {
            if !comp.path.is_empty() && !sub_paths.contains(&comp.path) {
                sub_paths.push(comp.path.clone());
            }
        }
    }

    let mut meshes = HashMap::new();
    for path in &sub_paths {
        match container.read_part_string(path)? {
            None => {
                warn!("sub-model part '{}' is missing", path);
                warnings.push(Warning::MissingPart { path: path.clone() });
            }
            Some(xml) => match submodel::parse_sub_model(&xml) {
                Ok(parsed) => {
                    for (objectid, mesh) in parsed {
                        meshes.insert((path.clone(), objectid), mesh);
                    }
                }
                Err(err) => {
                    warn!("sub-model part '{}' is unparsable: {}", path, err);
                    warnings.push(Warning::MalformedPart {
                        path: path.clone(),
                        reason: err.to_string(),
                    });
                }
            },
        }
    }

    // Components whose geometry never resolved stay in the model for
    // round-trip but contribute no mesh.
    for obj in objects.values() {
        for comp in &obj.components {
            if !meshes.contains_key(&(comp.path.clone(), comp.objectid)) {
                warn!(
                    "component '{}' object {} has no geometry",
                    comp.path, comp.objectid
                );
                warnings.push(Warning::UnresolvedComponent {
                    path: comp.path.clone(),
                    objectid: comp.objectid,
                });
            }
        }
    }

    // 3. Bambu metadata configs, all optional.
    let (model_settings, ms_plates, ms_assemble) =
        match container.read_part_string(MODEL_SETTINGS_PATH)? {
            None => {
                warnings.push(Warning::MissingPart {
                    path: MODEL_SETTINGS_PATH.to_string(),
                });
                Default::default()
            }
            Some(xml) => match settings::parse_model_settings(&xml) {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!("'{}' is unparsable: {}", MODEL_SETTINGS_PATH, err);
                    warnings.push(Warning::MalformedPart {
                        path: MODEL_SETTINGS_PATH.to_string(),
                        reason: err.to_string(),
                    });
                    Default::default()
                }
            },
        };

    let (filaments, plates) = match container.read_part_string(SLICE_INFO_PATH)? {
        None => {
            warnings.push(Warning::MissingPart {
                path: SLICE_INFO_PATH.to_string(),
            });
            Default::default()
        }
        Some(xml) => match settings::parse_slice_info(&xml) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("'{}' is unparsable: {}", SLICE_INFO_PATH, err);
                warnings.push(Warning::MalformedPart {
                    path: SLICE_INFO_PATH.to_string(),
                    reason: err.to_string(),
                });
                Default::default()
            }
        },
    };

    let project_settings = match container.read_part_string(PROJECT_SETTINGS_PATH)? {
        Some(raw) => raw,
        None => {
            warnings.push(Warning::MissingPart {
                path: PROJECT_SETTINGS_PATH.to_string(),
            });
            String::new()
        }
    };

    // 4. Enrich assembly objects with names/extruders from model_settings.
    settings::enrich_objects(&mut objects, &model_settings);

    debug!(
        "parsed package: {} objects, {} build items, {} meshes, {} plates",
        objects.len(),
        build_items.len(),
        meshes.len(),
        plates.len()
    );

    Ok(ParseReport {
        package: Package {
            metadata,
            objects,
            build_items,
            meshes,
            filaments,
            plates,
            model_settings,
            ms_plates,
            ms_assemble,
            project_settings,
        },
        file_name: String::new(),
        warnings,
    })
}

/// Extract the local name from a potentially namespaced XML element name
///
/// Bambu model files mix core, production and vendor namespaces; matching
/// on local names tolerates whatever prefixes a writer chose.
pub(crate) fn local_name(name_str: &str) -> &str {
    match name_str.rfind(':') {
        Some(pos) => &name_str[pos + 1..],
        None => name_str,
    }
}

/// Collect all attributes of an element into an owned map
pub(crate) fn parse_attributes(
    e: &quick_xml::events::BytesStart,
) -> Result<HashMap<String, String>> {
    let mut attrs = HashMap::with_capacity(8);

    for attr in e.attributes() {
        let attr = attr?;
        let key =
            std::str::from_utf8(attr.key.as_ref()).map_err(|e| Error::XmlAttr(e.to_string()))?;
        let value = std::str::from_utf8(&attr.value).map_err(|e| Error::XmlAttr(e.to_string()))?;

        attrs.insert(key.to_string(), value.to_string());
    }

    Ok(attrs)
}

/// Get an attribute value by its local name, regardless of namespace prefix
///
/// `p:UUID` and `y:UUID` both have local name `UUID`.
pub(crate) fn attr_by_local_name(attrs: &HashMap<String, String>, name: &str) -> Option<String> {
    attrs.iter().find_map(|(key, value)| {
        if local_name(key) == name {
            Some(value.clone())
        } else {
            None
        }
    })
}
