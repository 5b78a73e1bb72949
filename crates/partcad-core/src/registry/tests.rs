//! Tests for the format registry.

use super::*;
use crate::tables::{assembly, part, sketch};
use pretty_assertions::assert_eq;

fn sketch_registry() -> FormatRegistry {
    let mut registry = FormatRegistry::new();
    registry
        .register_group(Domain::Sketch, "basic", &[sketch::BASIC])
        .unwrap();
    registry
        .register_group(Domain::Sketch, "file", &[sketch::DXF, sketch::SVG])
        .unwrap();
    registry
        .register_group(Domain::Sketch, "script", &[sketch::CADQUERY, sketch::BUILD123D])
        .unwrap();
    registry
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn test_resolve_sketch_scenario() {
    let registry = sketch_registry();

    let svg = registry.resolve(Domain::Sketch, "svg").unwrap();
    assert_eq!(svg, Format::new("svg", "svg"));
    assert_eq!(svg.ext(), "svg");

    let err = registry.resolve(Domain::Sketch, "stl").unwrap_err();
    assert_eq!(
        err,
        FormatError::UnknownFormat {
            domain: Domain::Sketch,
            name: "stl".to_string()
        }
    );
}

#[test]
fn test_distinct_names_resolve_to_distinct_formats() {
    let registry = FormatRegistry::builtin().unwrap();
    for domain in Domain::ALL {
        let formats: Vec<Format> = registry.domain(domain).formats().collect();
        for a in &formats {
            for b in &formats {
                if a.name() != b.name() {
                    assert_ne!(
                        registry.resolve(domain, a.name()).unwrap(),
                        registry.resolve(domain, b.name()).unwrap()
                    );
                }
            }
        }
    }
}

#[test]
fn test_domains_are_independent() {
    let registry = FormatRegistry::builtin().unwrap();
    assert!(registry.resolve(Domain::Part, "stl").is_ok());
    assert!(registry.resolve(Domain::Sketch, "stl").is_err());
    assert_eq!(
        registry.resolve(Domain::Assembly, "step").unwrap(),
        assembly::STEP
    );
    assert!(registry.resolve(Domain::Assembly, "assy").is_ok());
    assert!(registry.resolve(Domain::Part, "assy").is_err());
}

// ============================================================================
// Registration
// ============================================================================

#[test]
fn test_duplicate_name_is_rejected_atomically() {
    let mut registry = sketch_registry();
    let before: Vec<String> = registry
        .groups_of(Domain::Sketch)
        .iter()
        .map(|g| g.name().to_string())
        .collect();

    let err = registry
        .register_group(
            Domain::Sketch,
            "vector",
            &[Format::new("pdf", "pdf"), Format::new("svg", "svgz")],
        )
        .unwrap_err();

    assert!(matches!(
        err,
        FormatError::DuplicateFormat { ref name, ref existing, .. }
            if name == "svg" && existing == "file"
    ));

    let after: Vec<String> = registry
        .groups_of(Domain::Sketch)
        .iter()
        .map(|g| g.name().to_string())
        .collect();
    assert_eq!(before, after);
    // The non-conflicting member must not have leaked in either.
    assert!(registry.resolve(Domain::Sketch, "pdf").is_err());
}

#[test]
fn test_duplicate_within_one_group_is_rejected() {
    let mut registry = FormatRegistry::new();
    let err = registry
        .register_group(Domain::Part, "model", &[part::STEP, part::STEP])
        .unwrap_err();
    assert!(matches!(err, FormatError::DuplicateFormat { .. }));
    assert!(registry.groups_of(Domain::Part).is_empty());
}

#[test]
fn test_same_name_in_other_domain_is_fine() {
    let mut registry = sketch_registry();
    registry
        .register_group(Domain::Part, "render", &[part::SVG, part::PNG])
        .unwrap();
    assert!(registry.resolve(Domain::Part, "svg").is_ok());
}

#[test]
fn test_duplicate_group_name() {
    let mut registry = sketch_registry();
    let err = registry
        .register_group(Domain::Sketch, "file", &[Format::new("pdf", "pdf")])
        .unwrap_err();
    assert!(matches!(err, FormatError::DuplicateGroup { .. }));
}

#[test]
fn test_reregistering_a_group_reports_the_format() {
    let mut registry = FormatRegistry::new();
    registry
        .register_group(Domain::Sketch, "file", &[sketch::DXF])
        .unwrap();
    let err = registry
        .register_group(Domain::Sketch, "file", &[sketch::DXF])
        .unwrap_err();
    assert!(matches!(
        err,
        FormatError::DuplicateFormat { ref name, ref existing, .. }
            if name == "dxf" && existing == "file"
    ));
    assert_eq!(registry.groups_of(Domain::Sketch).len(), 1);
}

#[test]
fn test_groups_keep_insertion_order() {
    let registry = FormatRegistry::builtin().unwrap();
    let names: Vec<&str> = registry
        .groups_of(Domain::Sketch)
        .iter()
        .map(|g| g.name())
        .collect();
    assert_eq!(names, vec!["basic", "file", "script"]);
}

// ============================================================================
// Capabilities
// ============================================================================

#[test]
fn test_capability_views() {
    let registry = FormatRegistry::builtin().unwrap();

    let output = registry.capability(Domain::Part, "convert_output").unwrap();
    assert_eq!(
        output.names(),
        vec!["step", "brep", "stl", "obj", "3mf", "threejs", "gltf"]
    );
    assert!(!output.contains("cadquery"));

    let importable = registry.capability(Domain::Part, "importable").unwrap();
    assert_eq!(
        importable.by_ext("py"),
        vec![part::CADQUERY, part::BUILD123D, part::AI_CADQUERY, part::AI_BUILD123D]
    );

    let yaml = registry
        .capability(Domain::Assembly, "yaml_described")
        .unwrap();
    assert_eq!(yaml.get("assy"), Some(assembly::ASSY));
}

#[test]
fn test_unknown_capability_and_group() {
    let mut registry = sketch_registry();
    assert!(matches!(
        registry.capability(Domain::Sketch, "printable"),
        Err(FormatError::UnknownCapability { .. })
    ));
    assert!(matches!(
        registry.register_capability(Domain::Sketch, "vector", &["file", "pdf"]),
        Err(FormatError::UnknownGroup { .. })
    ));
}

#[test]
fn test_formats_by_ext() {
    let registry = FormatRegistry::builtin().unwrap();
    assert_eq!(
        registry.formats_by_ext(Domain::Sketch, "py"),
        vec![sketch::CADQUERY, sketch::BUILD123D]
    );
    assert!(registry.formats_by_ext(Domain::Part, "dwg").is_empty());
}

#[test]
fn test_is_registered_checks_extension() {
    let registry = FormatRegistry::builtin().unwrap();
    assert!(registry.is_registered(Domain::Part, &part::STL));
    assert!(!registry.is_registered(Domain::Part, &Format::new("stl", "stla")));
}

#[test]
fn test_domain_parsing() {
    assert_eq!("parts".parse::<Domain>().unwrap(), Domain::Part);
    assert_eq!("sketch".parse::<Domain>().unwrap(), Domain::Sketch);
    assert!("scene".parse::<Domain>().is_err());
    assert_eq!(Domain::Assembly.manifest_key(), "assemblies");
}
