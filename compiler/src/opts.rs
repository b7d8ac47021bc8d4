//! Compilation options, the library-surface analog of the CLI flags.

use std::path::PathBuf;

use crate::features::{CopyBytes, VerifyMode};
use crate::fileops::{FileOps, OsFileOps};
use crate::parse::{JsonDefsParser, SchemaParser};
use crate::types::Def;

pub struct CompileOpts {
    /// Import search path, walked in order. The importing file's own
    /// directory is always tried first.
    pub import_dirs: Vec<PathBuf>,
    /// Output directory. Defaults to the source file's directory (or the
    /// current directory when compiling from pre-parsed definitions).
    pub out_dir: Option<PathBuf>,
    /// Return an in-memory codec module instead of writing files.
    pub binary: bool,
    /// Emit typed message structs in the generated types file.
    pub type_specs: bool,
    pub verify: VerifyMode,
    pub copy_bytes: CopyBytes,
    /// The file-system collaborator.
    pub file_ops: Box<dyn FileOps>,
    /// The `.proto`-side parser collaborator.
    pub parser: Box<dyn SchemaParser>,
    /// Diagnostic hook receiving the normalized, dependency-ordered
    /// definitions before lowering.
    pub probe_defs: Option<Box<dyn Fn(&[Def])>>,
}

impl Default for CompileOpts {
    fn default() -> Self {
        CompileOpts {
            import_dirs: Vec::new(),
            out_dir: None,
            binary: false,
            type_specs: false,
            verify: VerifyMode::Optionally,
            copy_bytes: CopyBytes::Auto,
            file_ops: Box::new(OsFileOps),
            parser: Box::new(JsonDefsParser),
            probe_defs: None,
        }
    }
}
