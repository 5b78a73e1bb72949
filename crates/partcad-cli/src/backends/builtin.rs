//! Builtin backend table.

use partcad_core::Domain;
use partcad_wrapper::BackendInterface;

use super::BackendSpec;

enum Via {
    Python(&'static str),
    Builtin(&'static str),
}

struct Row {
    name: &'static str,
    domain: Domain,
    via: Via,
    convert: &'static [(&'static str, &'static [&'static str])],
}

const OCP_OUTPUTS: &[&str] = &["step", "brep", "stl", "3mf", "obj", "gltf", "threejs"];

const BUILTIN: &[Row] = &[
    Row {
        name: "mesh",
        domain: Domain::Part,
        via: Via::Builtin("mesh"),
        convert: &[("stl", &["obj"]), ("obj", &["stl"])],
    },
    Row {
        name: "ocp-step",
        domain: Domain::Part,
        via: Via::Python("step.py"),
        convert: &[("step", &["brep", "stl", "3mf", "gltf", "threejs"])],
    },
    Row {
        name: "ocp-brep",
        domain: Domain::Part,
        via: Via::Python("brep.py"),
        convert: &[("brep", &["step", "stl", "3mf", "gltf", "threejs"])],
    },
    Row {
        name: "ocp-3mf",
        domain: Domain::Part,
        via: Via::Python("3mf.py"),
        convert: &[("3mf", &["step", "brep"])],
    },
    Row {
        name: "cadquery",
        domain: Domain::Part,
        via: Via::Python("cadquery.py"),
        convert: &[("cadquery", OCP_OUTPUTS)],
    },
    Row {
        name: "build123d",
        domain: Domain::Part,
        via: Via::Python("build123d.py"),
        convert: &[("build123d", OCP_OUTPUTS)],
    },
    Row {
        name: "openscad",
        domain: Domain::Part,
        via: Via::Python("openscad.py"),
        convert: &[("scad", &["stl", "3mf"])],
    },
    Row {
        name: "extrude",
        domain: Domain::Part,
        via: Via::Python("extrude.py"),
        convert: &[("extrude", &["step", "brep", "stl"])],
    },
    Row {
        name: "sketch-cadquery",
        domain: Domain::Sketch,
        via: Via::Python("cadquery.py"),
        convert: &[("cadquery", &["dxf", "svg"])],
    },
    Row {
        name: "sketch-build123d",
        domain: Domain::Sketch,
        via: Via::Python("build123d.py"),
        convert: &[("build123d", &["dxf", "svg"])],
    },
    Row {
        name: "render-dxf",
        domain: Domain::Sketch,
        via: Via::Python("render_dxf.py"),
        convert: &[("dxf", &["svg"])],
    },
];

/// Returns the builtin backend declarations in table order.
pub fn builtin_specs() -> Vec<BackendSpec> {
    BUILTIN
        .iter()
        .map(|row| {
            let interface = match row.via {
                Via::Python(script) => BackendInterface::python(script),
                Via::Builtin(name) => BackendInterface::builtin(name),
            };
            row.convert.iter().fold(
                BackendSpec::new(row.name, row.domain, interface),
                |spec, (source, targets)| spec.converts(source, targets),
            )
        })
        .collect()
}
