//! Serialization: the data model back to a Bambu 3MF package
//!
//! The export path takes the host's groups plus the round-trip blobs,
//! reconciles ids and stale references, serializes every part and packs
//! the OPC container.

mod assembly;
mod settings;

use crate::error::{Error, Result};
use crate::model::{
    BuildItem, Component, ExportGroup, ExportOptions, ExportOutcome, RoundTripData,
};
use crate::opc::{self, PackageParts};
use crate::reconcile;
use crate::transform::{self, IDENTITY_TRANSFORM};
use quick_xml::Writer;
use quick_xml::events::Event;
use std::collections::HashSet;
use std::io::Write as IoWrite;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

/// Core 3MF namespace
pub(crate) const NS_CORE: &str = "http://schemas.microsoft.com/3dmanufacturing/core/2015/02";

/// 3MF production extension namespace
pub(crate) const NS_PROD: &str = "http://schemas.microsoft.com/3dmanufacturing/production/2015/06";

/// Bambu vendor namespace
pub(crate) const NS_BAMBU: &str = "http://schemas.bambulab.com/package/2021";

/// One group with its ids assigned and components resolved, ready to
/// serialize
pub(crate) struct AssembledGroup {
    /// Assembly object id
    pub id: usize,
    /// Object UUID (stored or freshly generated)
    pub uuid: String,
    /// Component references into the sub-model, one per child
    pub components: Vec<Component>,
}

/// Export groups to a file path
///
/// With zero exportable groups the operation is cancelled and no file is
/// created; that is the expected outcome, not a failure.
pub fn export_file(
    path: impl AsRef<Path>,
    groups: &[ExportGroup],
    round_trip: &RoundTripData,
    options: &ExportOptions,
) -> Result<ExportOutcome> {
    if groups.is_empty() {
        debug!("export cancelled: no exportable groups");
        return Ok(ExportOutcome::Cancelled);
    }

    let file = std::fs::File::create(path.as_ref())?;
    let (_, outcome) = export_to_writer(file, groups, round_trip, options)?;
    info!("exported {} groups to {:?}", groups.len(), path.as_ref());
    Ok(outcome)
}

/// Export groups to a writer
///
/// Returns the writer along with the outcome; nothing is written when the
/// export is cancelled.
pub fn export_to_writer<W: IoWrite + std::io::Seek>(
    writer: W,
    groups: &[ExportGroup],
    round_trip: &RoundTripData,
    options: &ExportOptions,
) -> Result<(W, ExportOutcome)> {
    if groups.is_empty() {
        return Ok((writer, ExportOutcome::Cancelled));
    }

    let ids = reconcile::assign_ids(groups);

    // Assemble every group: sub-model path, component references and the
    // serialized sub-model part.
    let mut assembled = Vec::with_capacity(groups.len());
    let mut sub_models = Vec::with_capacity(groups.len());
    let mut build_items = Vec::with_capacity(groups.len());

    for (group, group_ids) in groups.iter().zip(&ids) {
        let sub_path = format!("/3D/Objects/object_{}.model", group_ids.object_id);

        let mut components = Vec::with_capacity(group.children.len());
        for (child, &part_id) in group.children.iter().zip(&group_ids.part_ids) {
            let transform = child
                .component_transform
                .clone()
                .or_else(|| {
                    child
                        .local_matrix
                        .as_ref()
                        .map(|matrix| transform::encode(matrix, options.scale))
                })
                .unwrap_or_else(|| IDENTITY_TRANSFORM.to_string());

            components.push(Component {
                path: sub_path.clone(),
                objectid: part_id,
                uuid: child
                    .uuid
                    .clone()
                    .unwrap_or_else(|| Uuid::new_v4().to_string()),
                transform,
            });
        }

        let sub_xml = assembly::build_sub_model(&group.children, &components, options.scale)?;
        sub_models.push((sub_path, sub_xml));

        build_items.push(BuildItem {
            objectid: group_ids.object_id,
            uuid: Uuid::new_v4().to_string(),
            transform: group
                .build_transform
                .clone()
                .or_else(|| {
                    group
                        .build_matrix
                        .as_ref()
                        .map(|matrix| transform::encode(matrix, options.scale))
                })
                .unwrap_or_else(|| IDENTITY_TRANSFORM.to_string()),
            printable: group.printable,
        });

        assembled.push(AssembledGroup {
            id: group_ids.object_id,
            uuid: group
                .uuid
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            components,
        });
    }

    // Reconcile the round-trip blobs against what actually survives.
    let valid_ids: HashSet<String> = assembled.iter().map(|a| a.id.to_string()).collect();
    let valid_names: HashSet<String> = groups.iter().map(|g| g.name.clone()).collect();

    let mut ms_plates = reconcile::prune_settings_plates(round_trip.ms_plates.clone(), &valid_ids);
    let mut ms_assemble = reconcile::prune_assemble(round_trip.ms_assemble.clone(), &valid_ids);
    let mut plates = reconcile::prune_slice_plates(round_trip.plates.clone(), &valid_names);

    if ms_plates.is_empty() {
        (ms_plates, ms_assemble) = reconcile::default_settings_plates(&ids);
    }
    if plates.is_empty() {
        plates = reconcile::default_slice_plates(groups, &round_trip.filaments);
    }

    let main_model = assembly::build_main_model(
        &assembled,
        &build_items,
        &round_trip.model_metadata,
        &options.application,
    )?;
    let model_settings =
        settings::build_model_settings(groups, &assembled, &ms_plates, &ms_assemble)?;
    let slice_info = settings::build_slice_info(&plates, &options.application)?;

    let parts = PackageParts {
        main_model,
        sub_models,
        model_settings,
        slice_info,
        project_settings: if round_trip.project_settings.is_empty() {
            None
        } else {
            Some(round_trip.project_settings.clone())
        },
    };

    let writer = opc::create_package(writer, &parts)?;
    debug!(
        "wrote package: {} groups, {} plates, {} settings plates",
        groups.len(),
        plates.len(),
        ms_plates.len()
    );

    Ok((writer, ExportOutcome::Finished))
}

/// Write one event, mapping failures into an XmlWrite error
pub(super) fn emit<W: IoWrite>(writer: &mut Writer<W>, event: Event, what: &str) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::xml_write(format!("Failed to write {}: {}", what, e)))
}

/// Finish an XML buffer into a string
pub(super) fn into_xml_string(writer: Writer<Vec<u8>>) -> Result<String> {
    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::xml_write(format!("Serialized XML is not UTF-8: {}", e)))
}
