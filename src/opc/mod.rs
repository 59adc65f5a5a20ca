//! OPC (Open Packaging Conventions) handling for Bambu 3MF packages
//!
//! Bambu project files are ZIP archives following the OPC standard. Beyond
//! the assembly model and content-types/relationship parts they carry
//! Bambu-specific configuration under `Metadata/`.

mod reader;
mod writer;

pub use reader::Container;
pub use writer::{PackageParts, create_package};

/// Main assembly model path within the archive
pub const MODEL_PATH: &str = "3D/3dmodel.model";

/// Content types file path
pub const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";

/// Root relationships file path
pub const RELS_PATH: &str = "_rels/.rels";

/// Model relationships file path (enumerates the sub-model parts)
pub const MODEL_RELS_PATH: &str = "3D/_rels/3dmodel.model.rels";

/// Bambu model settings config path
pub const MODEL_SETTINGS_PATH: &str = "Metadata/model_settings.config";

/// Bambu slice info config path
pub const SLICE_INFO_PATH: &str = "Metadata/slice_info.config";

/// Bambu project settings config path (optional part)
pub const PROJECT_SETTINGS_PATH: &str = "Metadata/project_settings.config";
