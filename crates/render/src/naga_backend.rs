//! Offline shader validation with naga.
//!
//! Compiling a stage parses and validates WGSL and records the stage's
//! location interface. Linking checks that every fragment input is written
//! by the vertex stage with the same type. No GPU is involved, so this runs
//! in tests and from the command line.

use crate::mesh::{AttributeFormat, AttributeLayout};
use crate::shader::{ShaderBackend, ShaderError, StageKind};
use naga::valid::{Capabilities, ValidationFlags, Validator};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Entry point names every stage must provide.
pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// User locations and their types, builtins excluded.
pub type StageInterface = BTreeMap<u32, naga::TypeInner>;

/// A parsed and validated stage.
#[derive(Debug)]
pub struct CompiledStage {
    pub kind: StageKind,
    pub entry_point: String,
    pub inputs: StageInterface,
    pub outputs: StageInterface,
    pub module: naga::Module,
}

/// What survives a successful link.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedProgram {
    pub label: String,
    pub vertex_entry: String,
    pub fragment_entry: String,
    pub vertex_inputs: StageInterface,
    pub varyings: StageInterface,
}

impl ValidatedProgram {
    /// Check that `layouts` feed every vertex input with a matching format.
    pub fn check_vertex_layouts(&self, layouts: &[AttributeLayout]) -> Result<(), String> {
        let mut problems = String::new();
        for (location, ty) in &self.vertex_inputs {
            let provided = layouts.iter().find_map(|l| l.attribute(*location));
            match provided {
                None => {
                    let _ = writeln!(problems, "location {location}: no attribute provided");
                }
                Some(attr) if !format_matches(attr.format, ty) => {
                    let _ = writeln!(
                        problems,
                        "location {location}: {:?} does not match {ty:?}",
                        attr.format
                    );
                }
                Some(_) => {}
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}

fn format_matches(format: AttributeFormat, ty: &naga::TypeInner) -> bool {
    let size = match format.components() {
        2 => naga::VectorSize::Bi,
        3 => naga::VectorSize::Tri,
        _ => naga::VectorSize::Quad,
    };
    *ty == naga::TypeInner::Vector {
        size,
        scalar: naga::Scalar::F32,
    }
}

fn naga_stage(kind: StageKind) -> naga::ShaderStage {
    match kind {
        StageKind::Vertex => naga::ShaderStage::Vertex,
        StageKind::Fragment => naga::ShaderStage::Fragment,
        StageKind::Other => naga::ShaderStage::Compute,
    }
}

fn entry_name(kind: StageKind) -> &'static str {
    match kind {
        StageKind::Vertex => VERTEX_ENTRY,
        StageKind::Fragment => FRAGMENT_ENTRY,
        StageKind::Other => "main",
    }
}

/// Add the location bindings carried by `ty`/`binding` to `interface`,
/// looking through struct members.
fn collect_locations(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    interface: &mut StageInterface,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => {
            interface.insert(*location, module.types[ty].inner.clone());
        }
        Some(naga::Binding::BuiltIn(_)) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(module, member.ty, member.binding.as_ref(), interface);
                }
            }
        }
    }
}

/// Parse, validate and locate the entry point for `kind`.
pub fn compile_wgsl_stage(
    kind: StageKind,
    label: &str,
    source: &str,
) -> Result<CompiledStage, ShaderError> {
    let compile_error = |log: String| ShaderError::Compile {
        stage: kind,
        label: label.to_string(),
        log,
    };

    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| compile_error(e.emit_to_string(source)))?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|e| compile_error(e.emit_to_string(source)))?;

    let wanted = entry_name(kind);
    let entry = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == naga_stage(kind) && ep.name == wanted)
        .ok_or_else(|| compile_error(format!("no {kind} entry point named '{wanted}'")))?;

    let mut inputs = StageInterface::new();
    for arg in &entry.function.arguments {
        collect_locations(&module, arg.ty, arg.binding.as_ref(), &mut inputs);
    }
    let mut outputs = StageInterface::new();
    if let Some(result) = &entry.function.result {
        collect_locations(&module, result.ty, result.binding.as_ref(), &mut outputs);
    }

    let entry_point = entry.name.clone();
    Ok(CompiledStage {
        kind,
        entry_point,
        inputs,
        outputs,
        module,
    })
}

/// Check that the vertex outputs cover the fragment inputs.
pub fn link_interfaces(
    label: &str,
    vertex: &CompiledStage,
    fragment: &CompiledStage,
) -> Result<(), ShaderError> {
    let mut log = String::new();
    if vertex.kind != StageKind::Vertex || fragment.kind != StageKind::Fragment {
        let _ = writeln!(
            log,
            "expected vertex + fragment stages, got {} + {}",
            vertex.kind, fragment.kind
        );
    }
    for (location, ty) in &fragment.inputs {
        match vertex.outputs.get(location) {
            None => {
                let _ = writeln!(
                    log,
                    "fragment input at location {location} is not written by the vertex stage"
                );
            }
            Some(out) if out != ty => {
                let _ = writeln!(
                    log,
                    "location {location}: vertex writes {out:?}, fragment reads {ty:?}"
                );
            }
            Some(_) => {}
        }
    }
    if log.is_empty() {
        Ok(())
    } else {
        Err(ShaderError::Link {
            label: label.to_string(),
            log,
        })
    }
}

/// CPU-only backend: stages are naga modules, programs are interface
/// summaries.
#[derive(Debug, Default)]
pub struct NagaBackend;

impl ShaderBackend for NagaBackend {
    type Stage = CompiledStage;
    type Program = ValidatedProgram;

    fn compile_stage(
        &mut self,
        kind: StageKind,
        label: &str,
        source: &str,
    ) -> Result<CompiledStage, ShaderError> {
        compile_wgsl_stage(kind, label, source)
    }

    fn link(
        &mut self,
        label: &str,
        vertex: CompiledStage,
        fragment: CompiledStage,
    ) -> Result<ValidatedProgram, ShaderError> {
        link_interfaces(label, &vertex, &fragment)?;
        Ok(ValidatedProgram {
            label: label.to_string(),
            vertex_entry: vertex.entry_point,
            fragment_entry: fragment.entry_point,
            vertex_inputs: vertex.inputs,
            varyings: fragment.inputs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{ColorVertex, LitVertex};
    use crate::shader::build_program;

    const VS: &str = r#"
struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) color: vec4<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip = vec4<f32>(position, 1.0);
    out.color = color;
    return out;
}
"#;

    const FS: &str = r#"
@fragment
fn fs_main(@location(0) color: vec4<f32>) -> @location(0) vec4<f32> {
    return color;
}
"#;

    #[test]
    fn valid_pair_builds() {
        let program = build_program(&mut NagaBackend, "pair", VS, FS).unwrap();
        assert_eq!(program.vertex_entry, "vs_main");
        assert_eq!(program.fragment_entry, "fs_main");
        assert_eq!(program.vertex_inputs.len(), 2);
        assert_eq!(program.varyings.len(), 1);
    }

    #[test]
    fn fragment_syntax_error_reports_fragment_stage() {
        let broken = "@fragment fn fs_main( -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";
        let err = build_program(&mut NagaBackend, "broken", VS, broken).unwrap_err();
        match err {
            ShaderError::Compile { stage, log, .. } => {
                assert_eq!(stage, StageKind::Fragment);
                assert!(!log.trim().is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn validation_error_is_a_compile_error() {
        let bad_types = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    let x: f32 = vec3<f32>(1.0);
    return vec4<f32>(x);
}
"#;
        let err = compile_wgsl_stage(StageKind::Fragment, "types", bad_types).unwrap_err();
        assert!(matches!(err, ShaderError::Compile { stage: StageKind::Fragment, .. }));
    }

    #[test]
    fn missing_entry_point_is_reported() {
        let err = compile_wgsl_stage(StageKind::Vertex, "no-entry", FS).unwrap_err();
        let log = err.log().unwrap();
        assert!(log.contains("vs_main"));
    }

    #[test]
    fn unwritten_varying_fails_link() {
        let fs = r#"
@fragment
fn fs_main(@location(3) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(uv, 0.0, 1.0);
}
"#;
        let err = build_program(&mut NagaBackend, "mismatch", VS, fs).unwrap_err();
        match err {
            ShaderError::Link { label, log } => {
                assert_eq!(label, "mismatch");
                assert!(log.contains("location 3"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn mistyped_varying_fails_link() {
        let fs = r#"
@fragment
fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(color, 1.0);
}
"#;
        let err = build_program(&mut NagaBackend, "mistyped", VS, fs).unwrap_err();
        assert!(matches!(err, ShaderError::Link { .. }));
    }

    #[test]
    fn vertex_inputs_checked_against_layouts() {
        let program = build_program(&mut NagaBackend, "pair", VS, FS).unwrap();
        assert!(program
            .check_vertex_layouts(&[AttributeLayout::of::<ColorVertex>()])
            .is_ok());
        let problems = program
            .check_vertex_layouts(&[AttributeLayout::of::<LitVertex>()])
            .unwrap_err();
        assert!(problems.contains("location 1"));
    }
}
