//! Types crossing the export boundary
//!
//! The host hands the exporter an ordered list of [`ExportGroup`]s — one
//! per buildable object, each with its triangulated child meshes — plus
//! the [`RoundTripData`] it stored at import time. Previously stored ids,
//! UUIDs and transforms ride along as typed optionals so the exporter can
//! reuse them; absent values are allocated or generated fresh.

use std::collections::{BTreeMap, HashMap};

use crate::transform::{M_TO_MM, Matrix4};

use super::package::{BuildItem, Mesh, MetadataEntry, Package};
use super::settings::{AssembleItem, Filament, SettingsPlate, SlicePlate};

/// One exportable group: a buildable object and its part meshes
#[derive(Debug, Clone, PartialEq)]
pub struct ExportGroup {
    /// Object name; used for `model_settings.config` and matched against
    /// stale slice-plate entries
    pub name: String,
    /// Previously stored assembly object id, if any
    pub object_id: Option<usize>,
    /// Previously stored object UUID, if any
    pub uuid: Option<String>,
    /// Object-level extruder default
    pub extruder: usize,
    /// Previously stored build-item transform string, if any
    pub build_transform: Option<String>,
    /// Current placement, encoded when no stored transform exists
    pub build_matrix: Option<Matrix4>,
    /// Whether the build item is printable
    pub printable: bool,
    /// Part meshes in component order
    pub children: Vec<ExportMesh>,
}

impl ExportGroup {
    /// Create a group with defaults (extruder 1, printable)
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            object_id: None,
            uuid: None,
            extruder: 1,
            build_transform: None,
            build_matrix: None,
            printable: true,
            children: Vec::new(),
        }
    }
}

/// One part mesh inside an export group
#[derive(Debug, Clone, PartialEq)]
pub struct ExportMesh {
    /// Child name; the part name falls back to this
    pub name: String,
    /// Previously stored part id, if any
    pub part_id: Option<usize>,
    /// Previously stored part UUID, if any
    pub uuid: Option<String>,
    /// Previously stored part display name, if any
    pub part_name: Option<String>,
    /// Part subtype, `normal_part` by default
    pub subtype: String,
    /// Extruder override; `None` means "use the object default"
    pub extruder: Option<usize>,
    /// Previously stored component transform string, if any
    pub component_transform: Option<String>,
    /// Current local placement, encoded when no stored transform exists
    pub local_matrix: Option<Matrix4>,
    /// Triangulated geometry in the group's local frame, in the scene unit
    pub mesh: Mesh,
}

impl ExportMesh {
    /// Create a child with defaults around the given mesh
    pub fn new(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            name: name.into(),
            part_id: None,
            uuid: None,
            part_name: None,
            subtype: "normal_part".to_string(),
            extruder: None,
            component_transform: None,
            local_matrix: None,
            mesh,
        }
    }
}

/// Export configuration supplied by the host
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// Value of the `Application` metadata entry, e.g.
    /// `BambuStudio-02.00.00.00`. Bambu Studio reads this to recognize its
    /// own files. A round-tripped `Application` entry takes precedence.
    pub application: String,
    /// Scale from scene units to package millimeters; `M_TO_MM` for a
    /// meter-based scene, `1.0` when geometry is already in millimeters
    pub scale: f64,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            application: "BambuStudio-02.00.00.00".to_string(),
            scale: M_TO_MM,
        }
    }
}

/// Outcome of an export call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The package was written
    Finished,
    /// Nothing to export; no file was written
    Cancelled,
}

/// Vendor data the host persists between a parse and a later export
///
/// This crate never stores state itself; the host keeps these blobs (for
/// example as JSON, with the `serde` feature) and hands them back when
/// exporting so plate layout, filament definitions and project settings
/// survive the round-trip.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoundTripData {
    /// Raw `project_settings.config` contents
    pub project_settings: String,
    /// Model-level metadata in original order
    pub model_metadata: Vec<MetadataEntry>,
    /// Slice plates from `slice_info.config`
    pub plates: Vec<SlicePlate>,
    /// Global filament table
    pub filaments: BTreeMap<usize, Filament>,
    /// `<plate>` sections of `model_settings.config`
    pub ms_plates: Vec<SettingsPlate>,
    /// `<assemble>` section of `model_settings.config`
    pub ms_assemble: Vec<AssembleItem>,
}

impl RoundTripData {
    /// Capture the round-trip blobs from a parsed package
    pub fn from_package(package: &Package) -> Self {
        Self {
            project_settings: package.project_settings.clone(),
            model_metadata: package.metadata.clone(),
            plates: package.plates.clone(),
            filaments: package.filaments.clone(),
            ms_plates: package.ms_plates.clone(),
            ms_assemble: package.ms_assemble.clone(),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl Package {
    /// Convert a parsed package into export groups
    ///
    /// Groups follow build-item order (the placement order), with any
    /// objects lacking a build item appended afterwards. Stored ids,
    /// UUIDs and transform strings are carried verbatim; components whose
    /// geometry was never resolved are dropped. Vertices stay in
    /// package-native millimeters, so export the result with
    /// [`ExportOptions::scale`] set to `1.0`.
    pub fn to_export_groups(&self) -> Vec<ExportGroup> {
        let mut item_for_object: HashMap<usize, &BuildItem> = HashMap::new();
        for item in &self.build_items {
            item_for_object.entry(item.objectid).or_insert(item);
        }

        // One group per object, in build-item (placement) order; objects
        // never placed on the plate come last.
        let mut ordered: Vec<usize> = Vec::new();
        for item in &self.build_items {
            if self.objects.contains_key(&item.objectid) && !ordered.contains(&item.objectid) {
                ordered.push(item.objectid);
            }
        }
        for id in self.objects.keys() {
            if !ordered.contains(id) {
                ordered.push(*id);
            }
        }

        ordered
            .iter()
            .filter_map(|id| self.objects.get(id))
            .map(|obj| {
                let settings = self.model_settings.get(&obj.id);
                let item = item_for_object.get(&obj.id);

                let children = obj
                    .components
                    .iter()
                    .filter_map(|comp| {
                        let mesh = self.mesh(&comp.path, comp.objectid)?;
                        let part =
                            settings.and_then(|entry| entry.parts.get(&comp.objectid));
                        let part_name = part
                            .map(|p| p.name.clone())
                            .and_then(|name| non_empty(&name));
                        Some(ExportMesh {
                            name: part_name
                                .clone()
                                .unwrap_or_else(|| format!("part_{}", comp.objectid)),
                            part_id: Some(comp.objectid),
                            uuid: non_empty(&comp.uuid),
                            part_name,
                            subtype: part
                                .map(|p| p.subtype.clone())
                                .unwrap_or_else(|| "normal_part".to_string()),
                            extruder: part.and_then(|p| p.extruder),
                            component_transform: non_empty(&comp.transform),
                            local_matrix: None,
                            mesh: mesh.clone(),
                        })
                    })
                    .collect();

                ExportGroup {
                    name: if obj.name.is_empty() {
                        format!("object_{}", obj.id)
                    } else {
                        obj.name.clone()
                    },
                    object_id: Some(obj.id),
                    uuid: non_empty(&obj.uuid),
                    extruder: obj.extruder,
                    build_transform: item.and_then(|i| non_empty(&i.transform)),
                    build_matrix: None,
                    printable: item.map(|i| i.printable).unwrap_or(true),
                    children,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AssemblyObject, Component, Triangle, Vertex};

    fn sample_package() -> Package {
        let mut package = Package::new();

        let mut obj = AssemblyObject::new(3);
        obj.name = "Bracket".to_string();
        obj.uuid = "uuid-3".to_string();
        obj.components.push(Component {
            path: "/3D/Objects/object_3.model".to_string(),
            objectid: 1,
            uuid: "uuid-3-1".to_string(),
            transform: "1 0 0 0 1 0 0 0 1 5 0 0".to_string(),
        });
        obj.components.push(Component {
            path: "/3D/Objects/object_3.model".to_string(),
            objectid: 2,
            uuid: String::new(),
            transform: String::new(),
        });
        package.objects.insert(3, obj);

        let mut item = BuildItem::new(3);
        item.transform = "1 0 0 0 1 0 0 0 1 10 20 0".to_string();
        item.printable = false;
        package.build_items.push(item);

        let mut mesh = Mesh::new();
        mesh.vertices.push(Vertex::new(0.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::new(1.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::new(0.0, 1.0, 0.0));
        mesh.triangles.push(Triangle::new(0, 1, 2));
        package
            .meshes
            .insert(("/3D/Objects/object_3.model".to_string(), 1), mesh);
        // No mesh for component objectid 2: it must be dropped.

        package
    }

    #[test]
    fn test_groups_carry_stored_values() {
        let groups = sample_package().to_export_groups();
        assert_eq!(groups.len(), 1);

        let group = &groups[0];
        assert_eq!(group.name, "Bracket");
        assert_eq!(group.object_id, Some(3));
        assert_eq!(group.uuid.as_deref(), Some("uuid-3"));
        assert_eq!(
            group.build_transform.as_deref(),
            Some("1 0 0 0 1 0 0 0 1 10 20 0")
        );
        assert!(!group.printable);
    }

    #[test]
    fn test_unresolved_components_are_dropped() {
        let groups = sample_package().to_export_groups();
        let group = &groups[0];
        assert_eq!(group.children.len(), 1);
        assert_eq!(group.children[0].part_id, Some(1));
        assert_eq!(group.children[0].mesh.vertices.len(), 3);
        // The stored component transform rides along verbatim.
        assert_eq!(
            group.children[0].component_transform.as_deref(),
            Some("1 0 0 0 1 0 0 0 1 5 0 0")
        );
    }
}
