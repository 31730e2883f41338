//! Shader program builds.
//!
//! A program is two stages compiled independently and then linked. The
//! graphics side is reached only through [`ShaderBackend`], so the build
//! order and error reporting are the same for the offline validator and the
//! GPU device.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Which pipeline stage a piece of source belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Vertex,
    Fragment,
    Other,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StageKind::Vertex => "vertex",
            StageKind::Fragment => "fragment",
            StageKind::Other => "other",
        })
    }
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("cannot read shader source {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{stage} shader compile error in '{label}':\n{log}")]
    Compile {
        stage: StageKind,
        label: String,
        log: String,
    },

    #[error("program link error in '{label}':\n{log}")]
    Link { label: String, log: String },
}

impl ShaderError {
    /// Compiler or linker diagnostic text, if any.
    pub fn log(&self) -> Option<&str> {
        match self {
            ShaderError::Io { .. } => None,
            ShaderError::Compile { log, .. } | ShaderError::Link { log, .. } => Some(log),
        }
    }
}

/// Compiles stages and links them into programs.
///
/// `link` takes the stages by value: once a program exists the per-stage
/// objects are gone.
pub trait ShaderBackend {
    type Stage;
    type Program;

    fn compile_stage(
        &mut self,
        kind: StageKind,
        label: &str,
        source: &str,
    ) -> Result<Self::Stage, ShaderError>;

    fn link(
        &mut self,
        label: &str,
        vertex: Self::Stage,
        fragment: Self::Stage,
    ) -> Result<Self::Program, ShaderError>;
}

pub fn read_shader_source(path: &Path) -> Result<String, ShaderError> {
    fs::read_to_string(path).map_err(|source| ShaderError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Compile both stages and link them.
pub fn build_program<B: ShaderBackend>(
    backend: &mut B,
    label: &str,
    vertex_source: &str,
    fragment_source: &str,
) -> Result<B::Program, ShaderError> {
    let vertex = backend.compile_stage(StageKind::Vertex, label, vertex_source)?;
    let fragment = backend.compile_stage(StageKind::Fragment, label, fragment_source)?;
    let program = backend.link(label, vertex, fragment)?;
    tracing::debug!("built shader program '{label}'");
    Ok(program)
}

/// Read both sources, then build. Nothing is compiled unless both reads
/// succeed.
pub fn build_program_from_files<B: ShaderBackend>(
    backend: &mut B,
    label: &str,
    vertex_path: &Path,
    fragment_path: &Path,
) -> Result<B::Program, ShaderError> {
    let vertex_source = read_shader_source(vertex_path)?;
    let fragment_source = read_shader_source(fragment_path)?;
    build_program(backend, label, &vertex_source, &fragment_source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Accepts any source without the word "error"; counts every call.
    #[derive(Default)]
    struct RecordingBackend {
        compiled: Vec<StageKind>,
        linked: usize,
        released: usize,
    }

    struct FakeStage(StageKind);

    impl ShaderBackend for RecordingBackend {
        type Stage = FakeStage;
        type Program = (StageKind, StageKind);

        fn compile_stage(
            &mut self,
            kind: StageKind,
            label: &str,
            source: &str,
        ) -> Result<FakeStage, ShaderError> {
            self.compiled.push(kind);
            if source.contains("error") {
                return Err(ShaderError::Compile {
                    stage: kind,
                    label: label.to_string(),
                    log: format!("0:1: syntax error in {kind} stage"),
                });
            }
            Ok(FakeStage(kind))
        }

        fn link(
            &mut self,
            _label: &str,
            vertex: FakeStage,
            fragment: FakeStage,
        ) -> Result<Self::Program, ShaderError> {
            self.linked += 1;
            let program = (vertex.0, fragment.0);
            drop((vertex, fragment));
            self.released += 2;
            Ok(program)
        }
    }

    #[test]
    fn builds_vertex_then_fragment_then_links() {
        let mut backend = RecordingBackend::default();
        let program = build_program(&mut backend, "demo", "vs", "fs").unwrap();
        assert_eq!(program, (StageKind::Vertex, StageKind::Fragment));
        assert_eq!(backend.compiled, vec![StageKind::Vertex, StageKind::Fragment]);
        assert_eq!(backend.linked, 1);
        assert_eq!(backend.released, 2);
    }

    #[test]
    fn fragment_failure_is_tagged_and_skips_link() {
        let mut backend = RecordingBackend::default();
        let err = build_program(&mut backend, "demo", "vs", "error").unwrap_err();
        match &err {
            ShaderError::Compile { stage, label, log } => {
                assert_eq!(*stage, StageKind::Fragment);
                assert_eq!(label, "demo");
                assert!(!log.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().starts_with("fragment shader compile error"));
        assert_eq!(backend.linked, 0);
    }

    #[test]
    fn missing_file_fails_before_any_compile() {
        let dir = tempfile::tempdir().unwrap();
        let vs = dir.path().join("present.vert.wgsl");
        fs::File::create(&vs).unwrap().write_all(b"vs").unwrap();
        let fs_path = dir.path().join("missing.frag.wgsl");

        let mut backend = RecordingBackend::default();
        let err = build_program_from_files(&mut backend, "demo", &vs, &fs_path).unwrap_err();
        match err {
            ShaderError::Io { path, .. } => assert_eq!(path, fs_path),
            other => panic!("unexpected error: {other}"),
        }
        assert!(backend.compiled.is_empty());
        assert_eq!(backend.linked, 0);
    }

    #[test]
    fn io_error_has_no_log() {
        let err = read_shader_source(Path::new("/nonexistent/shader.wgsl")).unwrap_err();
        assert!(err.log().is_none());
        assert!(err.to_string().contains("/nonexistent/shader.wgsl"));
    }
}
