//! Import resolution: walking the `import` graph of a schema file.
//!
//! Each import name is located by probing the search directories in
//! order; the first readable match wins. A file reached along several
//! import paths is loaded once. The merged definition list puts a file's
//! own items ahead of its imports' items.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::CompileError;
use crate::opts::CompileOpts;
use crate::parse::ParseFailure;
use crate::types::RawItem;

/// The flat definition list and the set of files it came from.
#[derive(Debug)]
pub struct Loaded {
    pub items: Vec<RawItem>,
    pub files: Vec<PathBuf>,
}

/// Loads `path` and, recursively, everything it imports.
pub fn resolve_imports(path: &Path, opts: &CompileOpts) -> Result<Loaded, CompileError> {
    let mut search_dirs: Vec<PathBuf> = Vec::new();
    if let Some(parent) = path.parent() {
        search_dirs.push(parent.to_path_buf());
    }
    search_dirs.extend(opts.import_dirs.iter().cloned());

    let mut seen = HashSet::new();
    seen.insert(path.to_path_buf());

    let mut loaded = Loaded {
        items: Vec::new(),
        files: vec![path.to_path_buf()],
    };
    load_one(path, &search_dirs, opts, &mut seen, &mut loaded)?;
    Ok(loaded)
}

fn load_one(
    path: &Path,
    search_dirs: &[PathBuf],
    opts: &CompileOpts,
    seen: &mut HashSet<PathBuf>,
    loaded: &mut Loaded,
) -> Result<(), CompileError> {
    let contents = opts.file_ops.read_file(path)?;
    let items = opts
        .parser
        .parse(path, &contents)
        .map_err(|failure| match failure {
            ParseFailure::Scan(detail) => CompileError::ScanError {
                file: path.display().to_string(),
                detail,
            },
            ParseFailure::Parse(detail) => CompileError::ParseError {
                file: path.display().to_string(),
                detail,
            },
        })?;
    debug!(file = %path.display(), items = items.len(), "loaded schema file");

    // The file's own definitions come first, then its imports' contents.
    let mut imports = Vec::new();
    for item in items {
        match item {
            RawItem::Import(name) => imports.push(name),
            other => loaded.items.push(other),
        }
    }

    for name in imports {
        let import_path = match locate(&name, search_dirs, opts) {
            Some(p) => p,
            None => return Err(CompileError::ImportNotFound(name)),
        };
        // Mark before descending so a failing file is not re-reported and
        // diamond imports load once.
        if !seen.insert(import_path.clone()) {
            continue;
        }
        loaded.files.push(import_path.clone());
        load_one(&import_path, search_dirs, opts, seen, loaded)?;
    }
    Ok(())
}

/// Walks the search directories in order and returns the first readable
/// match for an import name.
fn locate(name: &str, search_dirs: &[PathBuf], opts: &CompileOpts) -> Option<PathBuf> {
    for dir in search_dirs {
        let candidate = dir.join(name);
        if opts.file_ops.read_file_info(&candidate).is_ok() {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fileops::MemFileOps;

    fn opts_with_files(files: &[(&str, &str)]) -> CompileOpts {
        let mut ops = MemFileOps::new();
        for (path, text) in files {
            ops = ops.with_file(*path, text.as_bytes().to_vec());
        }
        CompileOpts {
            file_ops: Box::new(ops),
            ..Default::default()
        }
    }

    #[test]
    fn declarer_comes_before_imports() {
        let opts = opts_with_files(&[
            (
                "main.defs",
                r#"[{"import": "a.defs"}, {"enum": {"name": "Main", "symbols": [["M", 0]]}}]"#,
            ),
            ("a.defs", r#"[{"enum": {"name": "A", "symbols": [["A", 0]]}}]"#),
        ]);
        let loaded = resolve_imports(Path::new("main.defs"), &opts).unwrap();
        let names: Vec<&str> = loaded
            .items
            .iter()
            .map(|item| match item {
                RawItem::Enum(e) => e.name.as_str(),
                _ => "?",
            })
            .collect();
        assert_eq!(names, ["Main", "A"]);
        assert_eq!(loaded.files.len(), 2);
    }

    #[test]
    fn diamond_imports_load_once() {
        let opts = opts_with_files(&[
            ("main.defs", r#"[{"import": "a.defs"}, {"import": "b.defs"}]"#),
            ("a.defs", r#"[{"import": "shared.defs"}]"#),
            ("b.defs", r#"[{"import": "shared.defs"}]"#),
            (
                "shared.defs",
                r#"[{"enum": {"name": "Shared", "symbols": [["S", 0]]}}]"#,
            ),
        ]);
        let loaded = resolve_imports(Path::new("main.defs"), &opts).unwrap();
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.files.len(), 4);
    }

    #[test]
    fn search_dirs_are_walked_in_order() {
        let mut opts = opts_with_files(&[
            ("main.defs", r#"[{"import": "dep.defs"}]"#),
            (
                "first/dep.defs",
                r#"[{"enum": {"name": "First", "symbols": [["F", 0]]}}]"#,
            ),
            (
                "second/dep.defs",
                r#"[{"enum": {"name": "Second", "symbols": [["S", 0]]}}]"#,
            ),
        ]);
        opts.import_dirs = vec![PathBuf::from("first"), PathBuf::from("second")];
        let loaded = resolve_imports(Path::new("main.defs"), &opts).unwrap();
        assert!(matches!(&loaded.items[0], RawItem::Enum(e) if e.name == "First"));
    }

    #[test]
    fn missing_import_is_reported_by_name() {
        let opts = opts_with_files(&[("main.defs", r#"[{"import": "nowhere.defs"}]"#)]);
        let err = resolve_imports(Path::new("main.defs"), &opts).unwrap_err();
        assert!(matches!(err, CompileError::ImportNotFound(name) if name == "nowhere.defs"));
    }

    #[test]
    fn parse_failures_surface_unchanged() {
        let opts = opts_with_files(&[("main.defs", "not json")]);
        assert!(matches!(
            resolve_imports(Path::new("main.defs"), &opts),
            Err(CompileError::ParseError { .. })
        ));
    }
}
