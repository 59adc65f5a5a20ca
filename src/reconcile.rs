//! ID allocation and stale-reference reconciliation for the export path
//!
//! Everything here is a pure function over the data model: the writer
//! feeds in the host's current groups and round-trip blobs, and gets back
//! a self-consistent set of ids, plates and assemble items. No I/O.

use std::collections::{BTreeSet, HashSet};

use crate::model::{
    AssembleItem, ExportGroup, Filament, ModelInstance, PlateFilament, SettingsPlate, SlicePlate,
    kv_set,
};

/// A next-free-positive-integer generator seeded from already-used ids
///
/// Allocation is first-fit ascending from 1, so freed ids are reused
/// before the range grows.
#[derive(Debug, Default, Clone)]
pub struct IdAllocator {
    used: BTreeSet<usize>,
}

impl IdAllocator {
    /// Create an empty allocator
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an allocator with the given ids already claimed
    pub fn seeded(ids: impl IntoIterator<Item = usize>) -> Self {
        Self {
            used: ids.into_iter().collect(),
        }
    }

    /// Claim a specific id; returns false when it was already taken
    pub fn claim(&mut self, id: usize) -> bool {
        self.used.insert(id)
    }

    /// Allocate the lowest unused positive integer
    pub fn allocate(&mut self) -> usize {
        let mut candidate = 1;
        for &used in &self.used {
            if used > candidate {
                break;
            }
            if used == candidate {
                candidate += 1;
            }
        }
        self.used.insert(candidate);
        candidate
    }
}

/// The ids assigned to one export group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupIds {
    /// Assembly object id (also names the sub-model part)
    pub object_id: usize,
    /// Part ids, one per child in order
    pub part_ids: Vec<usize>,
}

/// Assign assembly and part ids to every group
///
/// Stored ids are reused verbatim; missing ones are allocated from a
/// single package-wide allocator seeded with every stored id, so both id
/// kinds stay unique across the whole export.
pub fn assign_ids(groups: &[ExportGroup]) -> Vec<GroupIds> {
    let mut allocator = IdAllocator::new();
    for group in groups {
        if let Some(id) = group.object_id {
            allocator.claim(id);
        }
        for child in &group.children {
            if let Some(id) = child.part_id {
                allocator.claim(id);
            }
        }
    }

    groups
        .iter()
        .map(|group| GroupIds {
            object_id: group.object_id.unwrap_or_else(|| allocator.allocate()),
            part_ids: group
                .children
                .iter()
                .map(|child| child.part_id.unwrap_or_else(|| allocator.allocate()))
                .collect(),
        })
        .collect()
}

/// Drop model_instance rows referencing deleted objects
///
/// Plates left with no instances are discarded and the survivors are
/// renumbered to a contiguous 1-based sequence in their original order.
pub fn prune_settings_plates(
    plates: Vec<SettingsPlate>,
    valid_object_ids: &HashSet<String>,
) -> Vec<SettingsPlate> {
    let mut kept: Vec<SettingsPlate> = plates
        .into_iter()
        .filter_map(|mut plate| {
            plate.instances.retain(|instance| {
                instance
                    .value("object_id")
                    .map(|id| valid_object_ids.contains(id))
                    .unwrap_or(false)
            });
            if plate.instances.is_empty() {
                None
            } else {
                Some(plate)
            }
        })
        .collect();

    for (i, plate) in kept.iter_mut().enumerate() {
        kv_set(&mut plate.metadata, "index", (i + 1).to_string());
    }

    kept
}

/// Drop assemble_item rows referencing deleted objects
pub fn prune_assemble(
    items: Vec<AssembleItem>,
    valid_object_ids: &HashSet<String>,
) -> Vec<AssembleItem> {
    items
        .into_iter()
        .filter(|item| valid_object_ids.contains(&item.object_id))
        .collect()
}

/// Drop slice-plate object rows referencing deleted names
///
/// Plates left with no objects are discarded and the survivors are
/// renumbered to a contiguous 1-based sequence in their original order.
pub fn prune_slice_plates(
    plates: Vec<SlicePlate>,
    valid_names: &HashSet<String>,
) -> Vec<SlicePlate> {
    let mut kept: Vec<SlicePlate> = plates
        .into_iter()
        .filter_map(|mut plate| {
            plate.objects.retain(|obj| valid_names.contains(&obj.name));
            if plate.objects.is_empty() {
                None
            } else {
                Some(plate)
            }
        })
        .collect();

    for (i, plate) in kept.iter_mut().enumerate() {
        plate.index = i + 1;
        kv_set(&mut plate.metadata, "index", (i + 1).to_string());
    }

    kept
}

/// Generate settings plate and assemble data for a from-scratch export
///
/// All groups land on plate 1 with `instance_id "0"` and sequential
/// `identify_id` values.
pub fn default_settings_plates(ids: &[GroupIds]) -> (Vec<SettingsPlate>, Vec<AssembleItem>) {
    let mut instances = Vec::new();
    let mut assemble = Vec::new();

    for (idx, group_ids) in ids.iter().enumerate() {
        let object_id = group_ids.object_id.to_string();
        instances.push(ModelInstance {
            entries: vec![
                ("object_id".to_string(), object_id.clone()),
                ("instance_id".to_string(), "0".to_string()),
                ("identify_id".to_string(), idx.to_string()),
            ],
        });
        assemble.push(AssembleItem {
            object_id,
            instance_id: "0".to_string(),
            transform: String::new(),
            offset: String::new(),
        });
    }

    let plate = SettingsPlate {
        metadata: vec![
            ("index".to_string(), "1".to_string()),
            ("locked".to_string(), "false".to_string()),
        ],
        instances,
    };

    (vec![plate], assemble)
}

/// Generate a single slice-info plate for a from-scratch export
///
/// Lists every group by name with sequential identify ids and carries the
/// stored global filament table onto the plate.
pub fn default_slice_plates(
    groups: &[ExportGroup],
    filaments: &std::collections::BTreeMap<usize, Filament>,
) -> Vec<SlicePlate> {
    let objects = groups
        .iter()
        .enumerate()
        .map(|(idx, group)| crate::model::PlateObject {
            identify_id: idx.to_string(),
            name: group.name.clone(),
            skipped: false,
        })
        .collect();

    let plate_filaments = filaments
        .values()
        .map(|filament| PlateFilament {
            id: filament.id,
            material: filament.material.clone(),
            color: filament.color.clone(),
            tray_info_idx: filament.tray_info_idx.clone(),
            used_m: String::new(),
            used_g: String::new(),
        })
        .collect();

    vec![SlicePlate {
        index: 1,
        objects,
        filaments: plate_filaments,
        metadata: vec![("index".to_string(), "1".to_string())],
    }]
}
