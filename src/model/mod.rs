//! Data model for Bambu Studio 3MF packages
//!
//! All types here are plain value structures. A [`Package`] is built once
//! per parse and once per export; nothing holds a handle back into the ZIP
//! container after parsing completes.

mod export;
mod package;
mod settings;

pub use export::{ExportGroup, ExportMesh, ExportOptions, ExportOutcome, RoundTripData};
pub use package::{
    AssemblyObject, BuildItem, Component, Mesh, MetadataEntry, Package, Triangle, Vertex,
};
pub use settings::{
    AssembleItem, Filament, KeyValues, ModelInstance, ModelSettingsEntry, PartInfo, PlateFilament,
    PlateObject, SettingsPlate, SlicePlate, kv_get, kv_set,
};
