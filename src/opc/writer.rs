//! Package writing: assembling the OPC container for an export

use super::{
    CONTENT_TYPES_PATH, MODEL_PATH, MODEL_RELS_PATH, MODEL_SETTINGS_PATH, PROJECT_SETTINGS_PATH,
    RELS_PATH, SLICE_INFO_PATH,
};
use crate::error::Result;

/// The serialized parts of one export, ready to be packed
pub struct PackageParts {
    /// XML of the main assembly model (`3D/3dmodel.model`)
    pub main_model: String,
    /// Sub-model parts as (path, XML) pairs; paths may carry a leading `/`
    pub sub_models: Vec<(String, String)>,
    /// XML of `Metadata/model_settings.config`
    pub model_settings: String,
    /// XML of `Metadata/slice_info.config`
    pub slice_info: String,
    /// Raw `Metadata/project_settings.config` contents; omitted when `None`
    pub project_settings: Option<String>,
}

/// Create a complete Bambu 3MF package (ZIP archive)
///
/// Writes the content-types part, the root and model relationship parts,
/// the assembly model, every sub-model, and the Bambu metadata configs.
/// Returns the writer after finishing the archive.
pub fn create_package<W: std::io::Write + std::io::Seek>(
    writer: W,
    parts: &PackageParts,
) -> Result<W> {
    use std::io::Write;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default();

    let mut write_part = |zip: &mut ZipWriter<W>, name: &str, content: &str| -> Result<()> {
        zip.start_file(name, options)?;
        zip.write_all(content.as_bytes())?;
        Ok(())
    };

    write_part(&mut zip, CONTENT_TYPES_PATH, CONTENT_TYPES_XML)?;
    write_part(&mut zip, RELS_PATH, ROOT_RELS_XML)?;
    write_part(&mut zip, MODEL_PATH, &parts.main_model)?;

    let sub_paths: Vec<&str> = parts
        .sub_models
        .iter()
        .map(|(path, _)| path.as_str())
        .collect();
    write_part(&mut zip, MODEL_RELS_PATH, &model_rels_xml(&sub_paths))?;

    for (path, xml) in &parts.sub_models {
        write_part(&mut zip, path.trim_start_matches('/'), xml)?;
    }

    write_part(&mut zip, MODEL_SETTINGS_PATH, &parts.model_settings)?;
    write_part(&mut zip, SLICE_INFO_PATH, &parts.slice_info)?;

    if let Some(project_settings) = &parts.project_settings {
        write_part(&mut zip, PROJECT_SETTINGS_PATH, project_settings)?;
    }

    let writer = zip.finish()?;

    Ok(writer)
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
 <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
 <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
 <Default Extension="png" ContentType="image/png"/>
 <Default Extension="config" ContentType="text/xml"/>
</Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
 <Relationship Target="/3D/3dmodel.model" Id="rel0" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
</Relationships>"#;

/// Build the model relationships part enumerating every sub-model path
fn model_rels_xml(sub_model_paths: &[&str]) -> String {
    let mut lines = vec![
        r#"<?xml version="1.0" encoding="UTF-8"?>"#.to_string(),
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#
            .to_string(),
    ];
    for (i, path) in sub_model_paths.iter().enumerate() {
        lines.push(format!(
            r#" <Relationship Target="{}" Id="rel{}" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>"#,
            path,
            i + 1
        ));
    }
    lines.push("</Relationships>".to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_rels_enumerates_sub_models() {
        let xml = model_rels_xml(&[
            "/3D/Objects/object_1.model",
            "/3D/Objects/object_2.model",
        ]);
        assert!(xml.contains(r#"Target="/3D/Objects/object_1.model" Id="rel1""#));
        assert!(xml.contains(r#"Target="/3D/Objects/object_2.model" Id="rel2""#));
    }
}
