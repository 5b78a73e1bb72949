//! Builtin format tables.
//!
//! This is a closed enumeration: adding a format means adding a constant
//! here and listing it in a group, so conversion dispatch stays exhaustive.

use crate::error::FormatError;
use crate::format::Format;
use crate::registry::{Domain, FormatRegistry};

/// Sketch formats.
pub mod sketch {
    use crate::format::Format;

    pub const BASIC: Format = Format::new("basic", "basic");
    pub const DXF: Format = Format::new("dxf", "dxf");
    pub const SVG: Format = Format::new("svg", "svg");
    pub const CADQUERY: Format = Format::new("cadquery", "py");
    pub const BUILD123D: Format = Format::new("build123d", "py");

    pub const BASIC_GROUP: &[Format] = &[BASIC];
    pub const FILE_GROUP: &[Format] = &[DXF, SVG];
    pub const SCRIPT_GROUP: &[Format] = &[CADQUERY, BUILD123D];
}

/// Part formats.
pub mod part {
    use crate::format::Format;

    pub const STEP: Format = Format::new("step", "step");
    pub const BREP: Format = Format::new("brep", "brep");
    pub const STL: Format = Format::new("stl", "stl");
    pub const OBJ: Format = Format::new("obj", "obj");
    pub const THREE_MF: Format = Format::new("3mf", "3mf");

    pub const SCAD: Format = Format::new("scad", "scad");
    pub const CADQUERY: Format = Format::new("cadquery", "py");
    pub const BUILD123D: Format = Format::new("build123d", "py");

    pub const SVG: Format = Format::new("svg", "svg");
    pub const PNG: Format = Format::new("png", "png");

    pub const KICAD: Format = Format::new("kicad", "kicad_pcb");

    pub const AI_CADQUERY: Format = Format::new("ai-cadquery", "py");
    pub const AI_BUILD123D: Format = Format::new("ai-build123d", "py");
    pub const AI_OPENSCAD: Format = Format::new("ai-openscad", "scad");

    pub const ALIAS: Format = Format::new("alias", "");
    pub const ENRICH: Format = Format::new("enrich", "");

    pub const EXTRUDE: Format = Format::new("extrude", "");
    pub const SWEEP: Format = Format::new("sweep", "");

    pub const THREEJS: Format = Format::new("threejs", "json");
    pub const GLTF: Format = Format::new("gltf", "gltf");

    pub const MODEL_GROUP: &[Format] = &[STEP, BREP, STL, OBJ, THREE_MF];
    pub const SCRIPT_GROUP: &[Format] = &[SCAD, CADQUERY, BUILD123D];
    pub const RENDER_GROUP: &[Format] = &[SVG, PNG];
    pub const CIRCUIT_GROUP: &[Format] = &[KICAD];
    pub const AI_GROUP: &[Format] = &[AI_CADQUERY, AI_BUILD123D, AI_OPENSCAD];
    pub const META_GROUP: &[Format] = &[ALIAS, ENRICH];
    pub const OPS_GROUP: &[Format] = &[EXTRUDE, SWEEP];
    pub const EXCHANGE_GROUP: &[Format] = &[THREEJS, GLTF];
}

/// Assembly formats.
pub mod assembly {
    use crate::format::Format;

    pub const ASSY: Format = Format::new("assy", "assy");
    pub const STEP: Format = Format::new("step", "step");

    pub const YAML_GROUP: &[Format] = &[ASSY];
    pub const IMPORTABLE_GROUP: &[Format] = &[STEP];
}

type GroupTable = &'static [(&'static str, &'static [Format])];
type CapabilityTable = &'static [(&'static str, &'static [&'static str])];

const SKETCH_GROUPS: GroupTable = &[
    ("basic", sketch::BASIC_GROUP),
    ("file", sketch::FILE_GROUP),
    ("script", sketch::SCRIPT_GROUP),
];

const SKETCH_CAPABILITIES: CapabilityTable = &[
    ("yaml_described", &["basic"]),
    ("file_based", &["file"]),
    ("script_based", &["script"]),
    ("importable", &["file", "script"]),
];

const PART_GROUPS: GroupTable = &[
    ("model", part::MODEL_GROUP),
    ("script", part::SCRIPT_GROUP),
    ("render", part::RENDER_GROUP),
    ("circuit", part::CIRCUIT_GROUP),
    ("ai", part::AI_GROUP),
    ("meta", part::META_GROUP),
    ("ops", part::OPS_GROUP),
    ("exchange", part::EXCHANGE_GROUP),
];

const PART_CAPABILITIES: CapabilityTable = &[
    ("inspectable", &["model", "script", "meta", "ops", "circuit"]),
    ("convert_input", &["model", "script", "exchange", "meta", "ops"]),
    ("convert_output", &["model", "exchange"]),
    ("export", &["model", "script", "render"]),
    ("importable", &["model", "script", "ai"]),
    ("ai_generated", &["ai"]),
    ("script", &["script"]),
    ("meta", &["meta"]),
];

const ASSEMBLY_GROUPS: GroupTable = &[
    ("yaml", assembly::YAML_GROUP),
    ("importable", assembly::IMPORTABLE_GROUP),
];

const ASSEMBLY_CAPABILITIES: CapabilityTable = &[
    ("yaml_described", &["yaml"]),
    ("importable", &["importable"]),
];

impl FormatRegistry {
    /// Builds the registry holding every builtin format.
    ///
    /// Fails only if the tables above break the one-owner-per-name rule.
    pub fn builtin() -> Result<Self, FormatError> {
        let mut registry = FormatRegistry::new();
        let tables = [
            (Domain::Sketch, SKETCH_GROUPS, SKETCH_CAPABILITIES),
            (Domain::Part, PART_GROUPS, PART_CAPABILITIES),
            (Domain::Assembly, ASSEMBLY_GROUPS, ASSEMBLY_CAPABILITIES),
        ];
        for (domain, groups, capabilities) in tables {
            for (name, formats) in groups {
                registry.register_group(domain, name, formats)?;
            }
            for (name, selected) in capabilities {
                registry.register_capability(domain, name, selected)?;
            }
        }
        tracing::debug!("format registry initialized");
        Ok(registry)
    }
}
