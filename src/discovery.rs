//! Template discovery for batch compilation.
//!
//! The host toolchain parses `.weft` sources and writes each template's AST
//! next to it as `<name>.tpl.json`. This module scans a build directory for
//! those files and compiles every one on its own compiler instance, so the
//! batch parallelizes without coordination.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::ast::Node;
use crate::cache::IncrementalCache;
use crate::compiler::{compile_template, CompilerOptions};
use crate::opcode::CompileOutput;

const TEMPLATE_SUFFIX: &str = ".tpl.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateManifest {
    pub name: String,
    pub path: String,
    pub output: CompileOutput,
}

/// Compile every template AST under `base_dir`. Files that fail to read,
/// parse, or compile are reported and skipped; the batch continues.
pub fn discover_templates(base_dir: &Path, options: &CompilerOptions) -> Vec<TemplateManifest> {
    compile_batch(base_dir, options, None)
}

/// Same as [`discover_templates`], but consults the cache first and records
/// fresh results in it.
pub fn discover_templates_with_cache(
    base_dir: &Path,
    options: &CompilerOptions,
    cache: &IncrementalCache,
) -> Vec<TemplateManifest> {
    compile_batch(base_dir, options, Some(cache))
}

fn compile_batch(
    base_dir: &Path,
    options: &CompilerOptions,
    cache: Option<&IncrementalCache>,
) -> Vec<TemplateManifest> {
    if !base_dir.exists() {
        return Vec::new();
    }

    let files = find_template_files(base_dir);

    files
        .par_iter()
        .filter_map(|path| match compile_template_file(path, options, cache) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                eprintln!("[Weft] Failed to compile template {:?}: {}", path, e);
                None
            }
        })
        .collect()
}

/// Recursively find all `*.tpl.json` files in a directory.
pub fn find_template_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).follow_links(true).into_iter().flatten() {
        let path = entry.path();
        if path.is_file() {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.ends_with(TEMPLATE_SUFFIX) {
                    files.push(path.to_path_buf());
                }
            }
        }
    }

    files
}

fn compile_template_file(
    path: &Path,
    options: &CompilerOptions,
    cache: Option<&IncrementalCache>,
) -> Result<TemplateManifest, String> {
    let source = fs::read_to_string(path).map_err(|e| format!("Failed to read file: {}", e))?;
    let path_str = path.to_string_lossy().to_string();
    let name = template_name(path).ok_or_else(|| "Invalid filename".to_string())?;

    if let Some(cache) = cache {
        if let Some(output) = cache.get(&path_str, &source) {
            return Ok(TemplateManifest {
                name,
                path: path_str,
                output,
            });
        }
    }

    let nodes: Vec<Node> =
        serde_json::from_str(&source).map_err(|e| format!("Invalid template AST: {}", e))?;
    let output = compile_template(&nodes, options.clone()).map_err(|e| e.to_string())?;

    if let Some(cache) = cache {
        cache.set(&path_str, &source, output.clone());
    }

    Ok(TemplateManifest {
        name,
        path: path_str,
        output,
    })
}

/// Template name from its file name: `pages/home.tpl.json` is `home`.
fn template_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let name = file_name.strip_suffix(TEMPLATE_SUFFIX)?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
