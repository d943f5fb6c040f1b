//! WGSL front end: parse, validate, and link a vertex/fragment pair with
//! naga before any GPU object is created, so diagnostics come back as text.

use std::collections::BTreeSet;

use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{Binding, Module, ShaderStage, TypeInner};
use rusty_gpu_shared::ShaderCompileError;

/// A validated, linked shader program ready for pipeline creation.
#[derive(Debug)]
pub struct LinkedProgram {
    pub vertex: Module,
    pub fragment: Module,
    pub vertex_entry: String,
    pub fragment_entry: String,
}

/// Creates a linked program from vertex and fragment WGSL sources.
///
/// Fails with every available diagnostic concatenated: compile errors for
/// both stages first, then link errors.
pub fn make_shader(vertex_src: &str, fragment_src: &str) -> Result<LinkedProgram, ShaderCompileError> {
    let vertex = compile("vertex", vertex_src);
    let fragment = compile("fragment", fragment_src);

    let (vertex, fragment) = match (vertex, fragment) {
        (Ok(v), Ok(f)) => (v, f),
        (v, f) => {
            let msg = [v.err(), f.err()].into_iter().flatten().collect::<Vec<_>>().join("\n");
            return Err(ShaderCompileError::new(msg));
        }
    };

    link(vertex, fragment).map_err(|e| ShaderCompileError::new(format!("Program link failed:\n{e}")))
}

/// Parse and validate one WGSL source, rendering errors against the source.
pub fn compile(stage: &str, src: &str) -> Result<Module, String> {
    let module = naga::front::wgsl::parse_str(src)
        .map_err(|e| format!("{stage} shader:\n{}", e.emit_to_string(src)))?;
    Validator::new(ValidationFlags::all(), Capabilities::default())
        .validate(&module)
        .map_err(|e| format!("{stage} shader:\n{}", e.emit_to_string(src)))?;
    Ok(module)
}

fn link(vertex: Module, fragment: Module) -> Result<LinkedProgram, String> {
    let vs = vertex
        .entry_points
        .iter()
        .find(|ep| ep.stage == ShaderStage::Vertex)
        .ok_or("vertex source has no @vertex entry point")?;
    let fs = fragment
        .entry_points
        .iter()
        .find(|ep| ep.stage == ShaderStage::Fragment)
        .ok_or("fragment source has no @fragment entry point")?;

    let produced: BTreeSet<u32> = match &vs.function.result {
        Some(result) => locations(&vertex, result.ty, result.binding.as_ref()),
        None => BTreeSet::new(),
    };
    let consumed: BTreeSet<u32> = fs
        .function
        .arguments
        .iter()
        .flat_map(|arg| locations(&fragment, arg.ty, arg.binding.as_ref()))
        .collect();

    let missing: Vec<String> = consumed
        .difference(&produced)
        .map(|l| format!("@location({l})"))
        .collect();
    if !missing.is_empty() {
        return Err(format!(
            "fragment inputs {} are not written by vertex entry point `{}`",
            missing.join(", "),
            vs.name
        ));
    }

    let vertex_entry = vs.name.clone();
    let fragment_entry = fs.name.clone();
    Ok(LinkedProgram {
        vertex,
        fragment,
        vertex_entry,
        fragment_entry,
    })
}

/// User-defined IO locations of a value, looking through one struct level.
fn locations(module: &Module, ty: naga::Handle<naga::Type>, binding: Option<&Binding>) -> BTreeSet<u32> {
    if let Some(Binding::Location { location, .. }) = binding {
        return BTreeSet::from([*location]);
    }
    match &module.types[ty].inner {
        TypeInner::Struct { members, .. } => members
            .iter()
            .filter_map(|m| match m.binding {
                Some(Binding::Location { location, .. }) => Some(location),
                _ => None,
            })
            .collect(),
        _ => BTreeSet::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusty_gpu_shared::shaders::{FRAGMENT_ENTRY, TRIANGLE_FRAG, TRIANGLE_VERT, VERTEX_ENTRY};

    #[test]
    fn test_builtin_sources_link() {
        let program = make_shader(TRIANGLE_VERT, TRIANGLE_FRAG).unwrap();
        assert_eq!(program.vertex_entry, VERTEX_ENTRY);
        assert_eq!(program.fragment_entry, FRAGMENT_ENTRY);
    }

    #[test]
    fn test_syntax_error_carries_diagnostic() {
        let broken = TRIANGLE_FRAG.replace("return color;", "return color");
        let err = make_shader(TRIANGLE_VERT, &broken).unwrap_err();
        assert!(err.message.starts_with("fragment shader:"), "{}", err.message);
        assert!(err.message.contains("expected"), "{}", err.message);
    }

    #[test]
    fn test_both_stages_reported() {
        let err = make_shader("fn vs_main( {", "@fragment fn fs_main() -> @location(0) vec4<f32> { return 1; }")
            .unwrap_err();
        assert!(err.message.contains("vertex shader:"), "{}", err.message);
        assert!(err.message.contains("fragment shader:"), "{}", err.message);
    }

    #[test]
    fn test_type_error_is_validation_diagnostic() {
        let bad = "@fragment fn fs_main() -> @location(0) vec4<f32> { let x: f32 = vec2<f32>(1.0, 2.0); return vec4<f32>(x); }";
        let err = make_shader(TRIANGLE_VERT, bad).unwrap_err();
        assert!(err.message.starts_with("fragment shader:"), "{}", err.message);
    }

    #[test]
    fn test_unmatched_location_fails_link() {
        let frag = "@fragment fn fs_main(@location(3) uv: vec2<f32>) -> @location(0) vec4<f32> { return vec4<f32>(uv, 0.0, 1.0); }";
        let err = make_shader(TRIANGLE_VERT, frag).unwrap_err();
        assert!(err.message.starts_with("Program link failed:"), "{}", err.message);
        assert!(err.message.contains("@location(3)"), "{}", err.message);
    }

    #[test]
    fn test_missing_entry_point_fails_link() {
        let err = make_shader(TRIANGLE_FRAG, TRIANGLE_FRAG).unwrap_err();
        assert!(err.message.contains("no @vertex entry point"), "{}", err.message);
    }
}
