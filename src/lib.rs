//! # bambu3mf
//!
//! A pure Rust reader and writer for Bambu Studio 3MF project packages.
//!
//! Bambu Studio saves projects as ZIP-based OPC containers holding the
//! 3MF assembly model, per-object sub-model mesh parts, and Bambu-specific
//! configuration (`model_settings.config`, `slice_info.config`,
//! `project_settings.config`). This crate converts between that on-disk
//! format and an in-memory [`Package`], and back — reconciling stale
//! references on export and carrying vendor data it does not otherwise
//! interpret.
//!
//! ## Features
//!
//! - Pure Rust implementation with no unsafe code
//! - Parse the whole package: assembly, meshes, plates, filaments, settings
//! - Lossless round-trip of plate layout, assemble data and project settings
//! - Lenient toward real-world files: optional parts and malformed
//!   transforms degrade to defaults instead of failing the parse
//!
//! ## Example
//!
//! ```no_run
//! use bambu3mf::{ExportOptions, RoundTripData, export_file, parse_file};
//!
//! # fn main() -> bambu3mf::Result<()> {
//! let report = parse_file("FlowerClock.3mf")?;
//! println!(
//!     "{}: {} objects, {} plates",
//!     report.file_name,
//!     report.package.objects.len(),
//!     report.package.plates.len()
//! );
//!
//! // Re-export the parsed package unchanged. Parsed vertices are in
//! // millimeters already, so no unit scaling applies.
//! let groups = report.package.to_export_groups();
//! let round_trip = RoundTripData::from_package(&report.package);
//! let options = ExportOptions {
//!     scale: 1.0,
//!     ..ExportOptions::default()
//! };
//! export_file("out.3mf", &groups, &round_trip, &options)?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod model;
pub mod opc;
pub mod parser;
pub mod reconcile;
pub mod transform;
pub mod writer;

pub use error::{Error, Result, Warning};
pub use model::{
    AssembleItem, AssemblyObject, BuildItem, Component, ExportGroup, ExportMesh, ExportOptions,
    ExportOutcome, Filament, Mesh, MetadataEntry, ModelInstance, ModelSettingsEntry, Package,
    PartInfo, PlateFilament, PlateObject, RoundTripData, SettingsPlate, SlicePlate, Triangle,
    Vertex,
};
pub use parser::{ParseReport, parse_file, parse_reader};
pub use transform::{IDENTITY_TRANSFORM, M_TO_MM, MM_TO_M, Matrix4};
pub use writer::{export_file, export_to_writer};
