//! Types for the Bambu metadata config parts
//!
//! `model_settings.config` and `slice_info.config` are simple
//! attribute-based XML with no namespace. The `<plate>` and `<assemble>`
//! sections of `model_settings.config` are carried as ordered key/value
//! rows rather than modeled further: their internal schema varies across
//! Bambu Studio versions and this crate's obligation is lossless
//! carry-through, not interpretation.

/// Ordered key/value rows as they appear in the config XML
pub type KeyValues = Vec<(String, String)>;

/// Look up a value in ordered key/value rows
pub fn kv_get<'a>(rows: &'a KeyValues, key: &str) -> Option<&'a str> {
    rows.iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Set a value in ordered key/value rows, appending when the key is new
pub fn kv_set(rows: &mut KeyValues, key: &str, value: impl Into<String>) {
    match rows.iter_mut().find(|(k, _)| k == key) {
        Some((_, v)) => *v = value.into(),
        None => rows.push((key.to_string(), value.into())),
    }
}

/// Per-object settings from `model_settings.config`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelSettingsEntry {
    /// Object display name
    pub name: String,
    /// Object-level extruder default
    pub extruder: usize,
    /// Per-part settings keyed by part id
    pub parts: std::collections::BTreeMap<usize, PartInfo>,
}

impl ModelSettingsEntry {
    /// Create an entry with defaults (no name, extruder 1)
    pub fn new() -> Self {
        Self {
            name: String::new(),
            extruder: 1,
            parts: std::collections::BTreeMap::new(),
        }
    }
}

/// Settings for one part of an object
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartInfo {
    /// Part id, matching the objectid in the sub-model file
    pub id: usize,
    /// Part display name
    pub name: String,
    /// Part subtype, `normal_part` when unspecified
    pub subtype: String,
    /// Extruder override; `None` means "use the object default". A present
    /// value — including 0, should a file ever carry one — is a deliberate
    /// override.
    pub extruder: Option<usize>,
    /// Triangle count recorded by Bambu Studio in `<mesh_stat>`
    pub face_count: usize,
}

impl PartInfo {
    /// Create part info with defaults
    pub fn new(id: usize) -> Self {
        Self {
            id,
            name: String::new(),
            subtype: "normal_part".to_string(),
            extruder: None,
            face_count: 0,
        }
    }

    /// The extruder this part prints with: part override when present,
    /// else the object-level default
    pub fn resolved_extruder(&self, object_default: usize) -> usize {
        self.extruder.unwrap_or(object_default)
    }
}

/// One filament slot from the global filament table
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Filament {
    /// Filament slot id
    pub id: usize,
    /// Material type, e.g. `PLA`
    pub material: String,
    /// Hex color, `#RRGGBB` or `#AARRGGBB`
    pub color: String,
    /// Bambu tray info index, carried verbatim
    pub tray_info_idx: String,
}

/// One plate from `slice_info.config`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlicePlate {
    /// 1-based plate index; contiguous after reconciliation
    pub index: usize,
    /// Objects placed on this plate
    pub objects: Vec<PlateObject>,
    /// Filaments used on this plate
    pub filaments: Vec<PlateFilament>,
    /// Free-form plate metadata rows (includes the `index` key)
    pub metadata: KeyValues,
}

/// One object entry on a slice plate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlateObject {
    /// Bambu identify id, carried verbatim
    pub identify_id: String,
    /// Object name, matched against live object names on export
    pub name: String,
    /// Whether the object is skipped when slicing
    pub skipped: bool,
}

/// One filament entry on a slice plate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlateFilament {
    /// Filament slot id
    pub id: usize,
    /// Material type
    pub material: String,
    /// Hex color
    pub color: String,
    /// Bambu tray info index
    pub tray_info_idx: String,
    /// Estimated filament length used, carried verbatim
    pub used_m: String,
    /// Estimated filament weight used, carried verbatim
    pub used_g: String,
}

/// A `<plate>` section of `model_settings.config`, carried for round-trip
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SettingsPlate {
    /// Plate metadata rows (includes the `index` key)
    pub metadata: KeyValues,
    /// Model instances placed on the plate
    pub instances: Vec<ModelInstance>,
}

/// One `<model_instance>` row of a settings plate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelInstance {
    /// Opaque key/value rows; `object_id` links back to an assembly object
    pub entries: KeyValues,
}

impl ModelInstance {
    /// Look up an entry value by key
    pub fn value(&self, key: &str) -> Option<&str> {
        kv_get(&self.entries, key)
    }
}

/// One `<assemble_item>` of the `<assemble>` section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AssembleItem {
    /// Referenced assembly object id, as written in the file
    pub object_id: String,
    /// Instance id within that object
    pub instance_id: String,
    /// Raw transform string, carried verbatim
    pub transform: String,
    /// Raw offset string, carried verbatim
    pub offset: String,
}
