//! Core package types: assembly objects, components, build items, meshes

use std::collections::{BTreeMap, HashMap};

use super::settings::{AssembleItem, Filament, ModelSettingsEntry, SettingsPlate, SlicePlate};

/// A single model-level metadata entry (e.g. Title, Designer, Application)
///
/// Entries keep the order they appear in the assembly part; names are
/// unique within one package.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetadataEntry {
    /// Metadata name
    pub name: String,
    /// Metadata value
    pub value: String,
}

impl MetadataEntry {
    /// Create a new metadata entry
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The root parse/serialize unit: one Bambu Studio 3MF package
///
/// Built once per parse; the host copies what it needs into its own scene
/// representation. There is no in-place mutation API.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Package {
    /// Model-level metadata in file order, names unique
    pub metadata: Vec<MetadataEntry>,
    /// Assembly objects keyed by assembly object id
    pub objects: BTreeMap<usize, AssemblyObject>,
    /// Build items in file order; this is the placement order and is
    /// preserved on round-trip
    pub build_items: Vec<BuildItem>,
    /// Parsed mesh geometry keyed by (sub-model path, object id)
    pub meshes: HashMap<(String, usize), Mesh>,
    /// Global filament table keyed by filament slot id
    pub filaments: BTreeMap<usize, Filament>,
    /// Slice plates from `slice_info.config`, in file order
    pub plates: Vec<SlicePlate>,
    /// Per-object settings from `model_settings.config`
    pub model_settings: BTreeMap<usize, ModelSettingsEntry>,
    /// `<plate>` sections of `model_settings.config`, carried verbatim
    pub ms_plates: Vec<SettingsPlate>,
    /// `<assemble>` section of `model_settings.config`, carried verbatim
    pub ms_assemble: Vec<AssembleItem>,
    /// Raw contents of `project_settings.config` (typically JSON), never
    /// interpreted by this crate
    pub project_settings: String,
}

impl Package {
    /// Create an empty package
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a metadata value by name
    pub fn metadata_value(&self, name: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.value.as_str())
    }

    /// Insert a metadata entry, updating the value in place when the name
    /// already exists (names stay unique, first position wins)
    pub fn upsert_metadata(&mut self, name: &str, value: impl Into<String>) {
        match self.metadata.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => entry.value = value.into(),
            None => self.metadata.push(MetadataEntry::new(name, value)),
        }
    }

    /// Mesh geometry for a component reference, if it was resolved
    pub fn mesh(&self, path: &str, objectid: usize) -> Option<&Mesh> {
        self.meshes.get(&(path.to_string(), objectid))
    }
}

/// A top-level buildable entity referencing geometry through components
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyObject {
    /// Object id, unique within the package
    pub id: usize,
    /// Production-extension UUID, empty when the file carries none
    pub uuid: String,
    /// Display name, filled in from `model_settings.config` when present
    pub name: String,
    /// Object-level extruder default (1-based filament slot)
    pub extruder: usize,
    /// Component references in file order
    pub components: Vec<Component>,
}

impl AssemblyObject {
    /// Create an assembly object with defaults (no name, extruder 1)
    pub fn new(id: usize) -> Self {
        Self {
            id,
            uuid: String::new(),
            name: String::new(),
            extruder: 1,
            components: Vec::new(),
        }
    }
}

/// A reference from an assembly object to geometry in a sub-model part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Sub-model part path (e.g. `/3D/Objects/object_3.model`)
    pub path: String,
    /// Object id within that sub-model
    pub objectid: usize,
    /// Production-extension UUID, empty when absent
    pub uuid: String,
    /// Raw 12-float transform string; empty means identity
    pub transform: String,
}

/// A placement of an assembly object on the build plate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildItem {
    /// Referenced assembly object id
    pub objectid: usize,
    /// Production-extension UUID, empty when absent
    pub uuid: String,
    /// Raw 12-float transform string; empty means identity
    pub transform: String,
    /// Whether the item is printable
    pub printable: bool,
}

impl BuildItem {
    /// Create a build item with defaults (printable, identity transform)
    pub fn new(objectid: usize) -> Self {
        Self {
            objectid,
            uuid: String::new(),
            transform: String::new(),
            printable: true,
        }
    }
}

/// Triangulated mesh geometry from one sub-model object
///
/// Coordinates are package-native millimeters. Every triangle index is
/// less than the vertex count; sub-models violating this are rejected
/// during parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions; index is the 0-based vertex index
    pub vertices: Vec<Vertex>,
    /// Vertex-index triples
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    /// Create an empty mesh
    pub fn new() -> Self {
        Self::default()
    }
}

/// A single vertex position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Z coordinate
    pub z: f64,
}

impl Vertex {
    /// Create a vertex
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// A triangle as three vertex indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    /// First vertex index
    pub v1: usize,
    /// Second vertex index
    pub v2: usize,
    /// Third vertex index
    pub v3: usize,
}

impl Triangle {
    /// Create a triangle
    pub fn new(v1: usize, v2: usize, v3: usize) -> Self {
        Self { v1, v2, v3 }
    }
}
