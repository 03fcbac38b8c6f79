//! Minification of build output with v3 source maps.
//!
//! [`OxcMinifier`] runs the oxc compressor (and optionally the mangler) over
//! each script and prints it with oxc's codegen, which also produces the map.

use std::path::{Path, PathBuf};

use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{CompressOptions, MangleOptions, Minifier as Compressor, MinifierOptions};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use explorer_js::{parse, SyntaxError, SCRIPT_SOURCE};

use crate::error::MinifyError;
use crate::output::write_output;

/// Output of a minifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Minified {
    pub code: String,
    pub map: SourceMap,
}

/// Why a minifier could not process a script.
#[derive(Debug, thiserror::Error)]
pub enum MinifierError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("Invalid source map: {0}")]
    SourceMap(#[from] serde_json::Error),
}

/// Shrinks JavaScript source.
pub trait Minifier: Send + Sync {
    /// `file` names the minified output; `source_name` the input it maps to.
    fn minify(&self, source: &str, file: &str, source_name: &str) -> Result<Minified, MinifierError>;
}

/// Source map, revision 3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u8,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub sources_content: Vec<String>,
    #[serde(default)]
    pub names: Vec<String>,
    pub mappings: String,
}

/// Compresses scripts with oxc. Output is a single line with comments
/// removed; legal `/*!` comments are kept by codegen.
#[derive(Debug, Clone, Copy, Default)]
pub struct OxcMinifier {
    /// Also rename local bindings.
    pub mangle: bool,
}

impl OxcMinifier {
    pub fn mangled() -> Self {
        Self { mangle: true }
    }
}

impl Minifier for OxcMinifier {
    fn minify(&self, source: &str, file: &str, source_name: &str) -> Result<Minified, MinifierError> {
        let allocator = Allocator::default();
        let mut program = parse(&allocator, source, SCRIPT_SOURCE)?;

        let options = MinifierOptions {
            mangle: self.mangle.then(MangleOptions::default),
            compress: Some(CompressOptions::default()),
        };
        let compressed = Compressor::new(options).minify(&allocator, &mut program);

        let printed = Codegen::new()
            .with_options(CodegenOptions {
                source_map_path: Some(PathBuf::from(source_name)),
                ..CodegenOptions::minify()
            })
            .with_scoping(compressed.scoping)
            .build(&program);

        let mut map = match printed.map {
            Some(map) => serde_json::from_str::<SourceMap>(&map.to_json_string())?,
            None => SourceMap {
                version: 3,
                file: String::new(),
                sources: Vec::new(),
                sources_content: Vec::new(),
                names: Vec::new(),
                mappings: String::new(),
            },
        };
        map.file = file.to_string();
        map.sources = vec![source_name.to_string()];
        map.sources_content = vec![source.to_string()];

        Ok(Minified {
            code: printed.code.trim_end().to_string(),
            map,
        })
    }
}

/// Minify every `*.js` under `dir` (skipping `*.min.js`) into `*.min.js`
/// plus `*.min.js.map`. Returns the written `.min.js` paths, sorted.
pub fn minify_directory(dir: &Path, minifier: &dyn Minifier) -> Result<Vec<PathBuf>, MinifyError> {
    let mut inputs = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|source| MinifyError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_file() && name.ends_with(".js") && !name.ends_with(".min.js") {
            inputs.push(entry.into_path());
        }
    }

    let mut written = inputs
        .par_iter()
        .map(|input| minify_file(input, minifier))
        .collect::<Result<Vec<_>, _>>()?;
    written.sort();

    tracing::info!("Minified {} file(s) in {}", written.len(), dir.display());
    Ok(written)
}

fn minify_file(input: &Path, minifier: &dyn Minifier) -> Result<PathBuf, MinifyError> {
    let source = std::fs::read_to_string(input).map_err(|source| MinifyError::Io {
        path: input.to_path_buf(),
        source,
    })?;

    let source_name = input.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let stem = source_name.trim_end_matches(".js");
    let min_name = format!("{stem}.min.js");
    let map_name = format!("{min_name}.map");

    let minified = minifier
        .minify(&source, &min_name, &source_name)
        .map_err(|source| MinifyError::Minify {
            path: input.to_path_buf(),
            source,
        })?;

    let min_path = input.with_file_name(&min_name);
    let map_path = input.with_file_name(&map_name);
    let map_json = serde_json::to_string(&minified.map).map_err(|source| MinifyError::SourceMap {
        path: map_path.clone(),
        source,
    })?;
    let code = format!("{}\n//# sourceMappingURL={map_name}\n", minified.code);

    write_output(&min_path, code.as_bytes()).map_err(|source| MinifyError::Io {
        path: min_path.clone(),
        source,
    })?;
    write_output(&map_path, map_json.as_bytes()).map_err(|source| MinifyError::Io {
        path: map_path.clone(),
        source,
    })?;
    tracing::debug!("{} -> {}", input.display(), min_path.display());

    Ok(min_path)
}
