//! End-to-end parse / export / re-parse round-trip tests against a
//! synthetic Bambu Studio package built in memory

use bambu3mf::{ExportOptions, RoundTripData, Warning, export_to_writer, parse_reader};
use std::io::{Cursor, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const MAIN_MODEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xml:lang="en-US" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02" xmlns:p="http://schemas.microsoft.com/3dmanufacturing/production/2015/06" xmlns:BambuStudio="http://schemas.bambulab.com/package/2021" requiredextensions="p">
 <metadata name="Application">BambuStudio-01.10.00.81</metadata>
 <metadata name="BambuStudio:3mfVersion">1</metadata>
 <metadata name="Title">Test Project</metadata>
 <metadata name="Designer">Jane</metadata>
 <resources>
  <object id="3" p:UUID="00010000-0000-0000-0000-000000000003" type="model">
   <components>
    <component p:path="/3D/Objects/object_3.model" objectid="1" p:UUID="00020000-0000-0000-0000-000000000001" transform="1 0 0 0 1 0 0 0 1 0 0 0"/>
    <component p:path="/3D/Objects/object_3.model" objectid="2" p:UUID="00020000-0000-0000-0000-000000000002" transform="1 0 0 0 1 0 0 0 1 4.5 0 0"/>
   </components>
  </object>
  <object id="4" p:UUID="00010000-0000-0000-0000-000000000004" type="model">
   <components>
    <component p:path="/3D/Objects/object_4.model" objectid="5" p:UUID="00020000-0000-0000-0000-000000000005" transform="1 0 0 0 1 0 0 0 1 0 0 0"/>
   </components>
  </object>
 </resources>
 <build p:UUID="00030000-0000-0000-0000-000000000001">
  <item objectid="3" p:UUID="00040000-0000-0000-0000-000000000003" transform="1 0 0 0 1 0 0 0 1 128.5 120 0" printable="1"/>
  <item objectid="4" p:UUID="00040000-0000-0000-0000-000000000004" transform="1 0 0 0 1 0 0 0 1 60.25 90 0" printable="0"/>
 </build>
</model>"#;

const OBJECT_3: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xml:lang="en-US" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02" xmlns:p="http://schemas.microsoft.com/3dmanufacturing/production/2015/06" requiredextensions="p">
 <metadata name="BambuStudio:3mfVersion">1</metadata>
 <resources>
  <object id="1" p:UUID="00020000-0000-0000-0000-000000000001" type="model">
   <mesh>
    <vertices>
     <vertex x="0" y="0" z="0"/>
     <vertex x="10" y="0" z="0"/>
     <vertex x="5" y="8.66" z="0"/>
     <vertex x="5" y="2.89" z="8.16"/>
    </vertices>
    <triangles>
     <triangle v1="0" v2="1" v3="2"/>
     <triangle v1="0" v2="1" v3="3"/>
     <triangle v1="1" v2="2" v3="3"/>
     <triangle v1="0" v2="2" v3="3"/>
    </triangles>
   </mesh>
  </object>
  <object id="2" p:UUID="00020000-0000-0000-0000-000000000002" type="model">
   <mesh>
    <vertices>
     <vertex x="0.1" y="0.2" z="0.3"/>
     <vertex x="1.5" y="0" z="0"/>
     <vertex x="0" y="1.5" z="0"/>
    </vertices>
    <triangles>
     <triangle v1="0" v2="1" v3="2"/>
    </triangles>
   </mesh>
  </object>
 </resources>
</model>"#;

const OBJECT_4: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xml:lang="en-US" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02" xmlns:p="http://schemas.microsoft.com/3dmanufacturing/production/2015/06" requiredextensions="p">
 <metadata name="BambuStudio:3mfVersion">1</metadata>
 <resources>
  <object id="5" p:UUID="00020000-0000-0000-0000-000000000005" type="model">
   <mesh>
    <vertices>
     <vertex x="0" y="0" z="0"/>
     <vertex x="20" y="0" z="0"/>
     <vertex x="20" y="20" z="0"/>
     <vertex x="0" y="20" z="0"/>
    </vertices>
    <triangles>
     <triangle v1="0" v2="1" v3="2"/>
     <triangle v1="0" v2="2" v3="3"/>
    </triangles>
   </mesh>
  </object>
 </resources>
</model>"#;

const MODEL_SETTINGS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<config>
  <object id="3">
    <metadata key="name" value="Bracket"/>
    <metadata key="extruder" value="2"/>
    <part id="1" subtype="normal_part">
      <metadata key="name" value="Bracket_Body"/>
      <metadata key="extruder" value="3"/>
      <mesh_stat face_count="4"/>
    </part>
    <part id="2" subtype="normal_part">
      <metadata key="name" value="Bracket_Mod"/>
    </part>
  </object>
  <object id="4">
    <metadata key="name" value="Lid"/>
    <metadata key="extruder" value="1"/>
    <part id="5" subtype="normal_part">
      <metadata key="name" value="Lid_Main"/>
    </part>
  </object>
  <plate>
    <metadata key="index" value="1"/>
    <metadata key="locked" value="false"/>
    <model_instance>
      <metadata key="object_id" value="3"/>
      <metadata key="instance_id" value="0"/>
      <metadata key="identify_id" value="463"/>
    </model_instance>
    <model_instance>
      <metadata key="object_id" value="4"/>
      <metadata key="instance_id" value="0"/>
      <metadata key="identify_id" value="508"/>
    </model_instance>
  </plate>
  <assemble>
   <assemble_item object_id="3" instance_id="0" transform="1 0 0 0 1 0 0 0 1 128.5 120 0" offset="0 0 0"/>
   <assemble_item object_id="4" instance_id="0" transform="1 0 0 0 1 0 0 0 1 60.25 90 0" offset="0 0 0"/>
  </assemble>
</config>"#;

const SLICE_INFO: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<config>
  <header>
    <header_item key="X-BBL-Client-Type" value="slicer"/>
    <header_item key="X-BBL-Client-Version" value="01.10.00.81"/>
  </header>
  <plate>
    <metadata key="index" value="1"/>
    <metadata key="prediction" value="5601"/>
    <object identify_id="463" name="Bracket" skipped="false"/>
    <filament id="1" tray_info_idx="GFL99" type="PLA" color="#00FF00" used_m="1.2" used_g="3.9"/>
    <filament id="4" tray_info_idx="GFL98" type="PLA" color="#C12E1F" used_m="0.5" used_g="1.4"/>
  </plate>
  <plate>
    <metadata key="index" value="2"/>
    <object identify_id="508" name="Lid" skipped="false"/>
    <filament id="4" tray_info_idx="GFL97" type="PETG" color="#FFFFFF" used_m="2.0" used_g="6.0"/>
  </plate>
</config>"##;

const PROJECT_SETTINGS: &str = r#"{"printer_model": "X1 Carbon", "nozzle_diameter": "0.4"}"#;

/// Build the synthetic package as an in-memory ZIP
fn build_fixture() -> Cursor<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    let parts: &[(&str, &str)] = &[
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
 <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
 <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
 <Default Extension="config" ContentType="text/xml"/>
</Types>"#,
        ),
        (
            "_rels/.rels",
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
 <Relationship Target="/3D/3dmodel.model" Id="rel0" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
</Relationships>"#,
        ),
        ("3D/3dmodel.model", MAIN_MODEL),
        ("3D/Objects/object_3.model", OBJECT_3),
        ("3D/Objects/object_4.model", OBJECT_4),
        ("Metadata/model_settings.config", MODEL_SETTINGS),
        ("Metadata/slice_info.config", SLICE_INFO),
        ("Metadata/project_settings.config", PROJECT_SETTINGS),
    ];

    for (name, content) in parts {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }

    zip.finish().unwrap()
}

#[test]
fn test_parse_fixture_structure() {
    let report = parse_reader(build_fixture()).expect("fixture should parse");
    let package = &report.package;

    assert!(report.warnings.is_empty(), "{:?}", report.warnings);

    // Metadata
    assert_eq!(
        package.metadata_value("Application"),
        Some("BambuStudio-01.10.00.81")
    );
    assert_eq!(package.metadata_value("Title"), Some("Test Project"));

    // Assembly structure
    assert_eq!(package.objects.len(), 2);
    assert_eq!(package.build_items.len(), 2);
    let total_components: usize = package
        .objects
        .values()
        .map(|obj| obj.components.len())
        .sum();
    assert_eq!(total_components, 3);

    // Enrichment from model_settings
    assert_eq!(package.objects[&3].name, "Bracket");
    assert_eq!(package.objects[&3].extruder, 2);
    assert_eq!(package.objects[&4].name, "Lid");
    assert_eq!(package.objects[&4].extruder, 1);

    // Meshes
    assert_eq!(package.meshes.len(), 3);
    let tetra = package.mesh("/3D/Objects/object_3.model", 1).unwrap();
    assert_eq!(tetra.vertices.len(), 4);
    assert_eq!(tetra.triangles.len(), 4);
    let total_vertices: usize = package.meshes.values().map(|m| m.vertices.len()).sum();
    let total_triangles: usize = package.meshes.values().map(|m| m.triangles.len()).sum();
    assert_eq!(total_vertices, 11);
    assert_eq!(total_triangles, 7);

    // Extruder resolution: part override > object default > 1
    let bracket = &package.model_settings[&3];
    assert_eq!(bracket.parts[&1].resolved_extruder(bracket.extruder), 3);
    assert_eq!(bracket.parts[&2].resolved_extruder(bracket.extruder), 2);
    assert_eq!(bracket.parts[&1].face_count, 4);
    let lid = &package.model_settings[&4];
    assert_eq!(lid.parts[&5].resolved_extruder(lid.extruder), 1);

    // Filament union keeps the first occurrence of slot 4
    let slot4 = &package.filaments[&4];
    assert_eq!(slot4.material, "PLA");
    assert_eq!(slot4.color, "#C12E1F");

    // Plates and round-trip blobs
    assert_eq!(package.plates.len(), 2);
    assert_eq!(package.plates[0].objects[0].name, "Bracket");
    assert_eq!(package.ms_plates.len(), 1);
    assert_eq!(package.ms_plates[0].instances.len(), 2);
    assert_eq!(package.ms_assemble.len(), 2);
    assert_eq!(package.project_settings, PROJECT_SETTINGS);
}

#[test]
fn test_export_reparse_reproduces_geometry_exactly() {
    let report = parse_reader(build_fixture()).unwrap();
    let package = report.package;

    let groups = package.to_export_groups();
    assert_eq!(groups.len(), 2);
    // Build-item order is preserved: object 3 first, then 4.
    assert_eq!(groups[0].object_id, Some(3));
    assert_eq!(groups[1].object_id, Some(4));
    assert!(!groups[1].printable);

    let round_trip = RoundTripData::from_package(&package);
    let options = ExportOptions {
        scale: 1.0,
        ..ExportOptions::default()
    };

    let (cursor, outcome) =
        export_to_writer(Cursor::new(Vec::new()), &groups, &round_trip, &options).unwrap();
    assert_eq!(outcome, bambu3mf::ExportOutcome::Finished);

    let reparsed = parse_reader(Cursor::new(cursor.into_inner()))
        .expect("exported package should parse")
        .package;

    // Exact geometry equality, mesh by mesh
    assert_eq!(reparsed.meshes, package.meshes);

    // Structure counts
    assert_eq!(reparsed.objects.len(), package.objects.len());
    assert_eq!(reparsed.build_items.len(), package.build_items.len());
    let components: usize = reparsed
        .objects
        .values()
        .map(|obj| obj.components.len())
        .sum();
    assert_eq!(components, 3);

    // Stored UUIDs and transforms carried verbatim
    assert_eq!(
        reparsed.objects[&3].uuid,
        "00010000-0000-0000-0000-000000000003"
    );
    assert_eq!(
        reparsed.objects[&3].components[1].transform,
        "1 0 0 0 1 0 0 0 1 4.5 0 0"
    );
    assert_eq!(
        reparsed.build_items[0].transform,
        "1 0 0 0 1 0 0 0 1 128.5 120 0"
    );
    assert!(!reparsed.build_items[1].printable);

    // Extruder resolution survives
    let bracket = &reparsed.model_settings[&3];
    assert_eq!(bracket.parts[&1].resolved_extruder(bracket.extruder), 3);
    assert_eq!(bracket.parts[&2].resolved_extruder(bracket.extruder), 2);

    // Round-tripped metadata and vendor blobs
    assert_eq!(
        reparsed.metadata_value("Application"),
        Some("BambuStudio-01.10.00.81")
    );
    assert_eq!(reparsed.metadata_value("Title"), Some("Test Project"));
    assert_eq!(reparsed.plates.len(), 2);
    assert_eq!(reparsed.ms_plates.len(), 1);
    assert_eq!(reparsed.ms_assemble.len(), 2);
    assert_eq!(reparsed.project_settings, PROJECT_SETTINGS);

    // Filament table survives via the slice plates
    assert_eq!(reparsed.filaments[&4].color, "#C12E1F");
}

#[test]
fn test_missing_sub_model_keeps_component_without_mesh() {
    // Same package but with object_4.model left out entirely.
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in [
        ("3D/3dmodel.model", MAIN_MODEL),
        ("3D/Objects/object_3.model", OBJECT_3),
        ("Metadata/model_settings.config", MODEL_SETTINGS),
        ("Metadata/slice_info.config", SLICE_INFO),
    ] {
        zip.start_file(name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    let cursor = zip.finish().unwrap();

    let report = parse_reader(cursor).expect("partial package should still parse");
    let package = &report.package;

    // The component survives for round-trip, with no mesh behind it.
    assert_eq!(package.objects[&4].components.len(), 1);
    assert!(package.mesh("/3D/Objects/object_4.model", 5).is_none());
    assert_eq!(package.meshes.len(), 2);

    assert!(report.warnings.contains(&Warning::MissingPart {
        path: "/3D/Objects/object_4.model".to_string()
    }));
    assert!(report.warnings.contains(&Warning::UnresolvedComponent {
        path: "/3D/Objects/object_4.model".to_string(),
        objectid: 5
    }));

    // Export drops the unresolved child but keeps the group.
    let groups = package.to_export_groups();
    assert_eq!(groups.len(), 2);
    assert!(groups[1].children.is_empty());
}

#[test]
fn test_package_without_configs_parses_with_defaults() {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in [
        ("3D/3dmodel.model", MAIN_MODEL),
        ("3D/Objects/object_3.model", OBJECT_3),
        ("3D/Objects/object_4.model", OBJECT_4),
    ] {
        zip.start_file(name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    let cursor = zip.finish().unwrap();

    let report = parse_reader(cursor).unwrap();
    let package = &report.package;

    // Absent configs yield defaults, never errors.
    assert!(package.model_settings.is_empty());
    assert!(package.plates.is_empty());
    assert!(package.filaments.is_empty());
    assert!(package.project_settings.is_empty());

    // Assembly defaults untouched without enrichment.
    assert_eq!(package.objects[&3].name, "");
    assert_eq!(package.objects[&3].extruder, 1);
}

#[test]
fn test_not_a_zip_is_package_open_error() {
    let err = parse_reader(Cursor::new(b"garbage bytes".to_vec())).unwrap_err();
    assert!(matches!(err, bambu3mf::Error::PackageOpen { .. }));
}

#[test]
fn test_missing_assembly_root_is_malformed() {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("Metadata/slice_info.config", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(SLICE_INFO.as_bytes()).unwrap();
    let cursor = zip.finish().unwrap();

    let err = parse_reader(cursor).unwrap_err();
    assert!(matches!(err, bambu3mf::Error::MalformedAssembly { .. }));
}
