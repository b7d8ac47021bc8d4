//! The pipeline driver: `file()` and `msg_defs()` entry points.
//!
//! Stages run strictly in sequence (import resolution, normalization
//! with verification, topological sort, feature negotiation, lowering,
//! artifact emission) and each stage's failure is returned upward
//! unchanged. The artifact is either a pair of rendered source files or,
//! under the `binary` option, an in-memory [`CodecModule`].

use std::path::{Path, PathBuf};

use tracing::debug;

use protopod_schema::decode;
use protopod_schema::defs::MsgDefs;
use protopod_schema::encode;
use protopod_schema::error::{DecodeError, EncodeError, VerifyError};
use protopod_schema::merge;
use protopod_schema::value::MsgVal;
use protopod_schema::verify;

use crate::error::CompileError;
use crate::features::{negotiate, Features, VerifyMode};
use crate::gen::{render_codec, render_types};
use crate::imports::resolve_imports;
use crate::lower::lower;
use crate::normalize::normalize;
use crate::opts::CompileOpts;
use crate::toposort::{sort_defs, TopoOutcome};
use crate::types::RawItem;

/// What a compilation produced.
pub enum Artifact {
    /// Paths of the written codec and types files.
    Files(Vec<PathBuf>),
    /// The in-memory codec module (`binary` option).
    Module(Box<CodecModule>),
}

pub struct Compiled {
    pub module_name: String,
    pub artifact: Artifact,
    /// Advisories surfaced during compilation, e.g. the cycle demotion
    /// of type annotations.
    pub warnings: Vec<String>,
}

/// Loads a schema file, resolves its imports, and compiles it.
pub fn file(path: &Path, opts: &CompileOpts) -> Result<Compiled, CompileError> {
    let loaded = resolve_imports(path, opts)?;
    let module_name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "schema".to_string());
    compile_items(&module_name, &loaded.items, Some(path), opts)
}

/// Compiles a pre-parsed definition list, bypassing import resolution.
pub fn msg_defs(
    module_name: &str,
    items: &[RawItem],
    opts: &CompileOpts,
) -> Result<Compiled, CompileError> {
    compile_items(module_name, items, None, opts)
}

fn compile_items(
    module_name: &str,
    items: &[RawItem],
    source: Option<&Path>,
    opts: &CompileOpts,
) -> Result<Compiled, CompileError> {
    let defs = normalize(items)?;
    let (defs, outcome) = sort_defs(defs);
    debug!(module = module_name, defs = defs.len(), ?outcome, "schema normalized");

    if let Some(probe) = &opts.probe_defs {
        probe(&defs);
    }

    let (features, warnings) = negotiate(opts, outcome == TopoOutcome::Cyclic);
    let msg_defs = lower(&defs)?;

    let artifact = if opts.binary {
        Artifact::Module(Box::new(CodecModule {
            name: module_name.to_string(),
            defs: msg_defs,
            features,
        }))
    } else {
        let out_dir = match (&opts.out_dir, source) {
            (Some(dir), _) => dir.clone(),
            (None, Some(path)) => path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            (None, None) => PathBuf::from("."),
        };
        let codec_path = out_dir.join(format!("{}.rs", module_name));
        let types_path = out_dir.join(format!("{}_types.rs", module_name));
        opts.file_ops
            .write_file(&codec_path, render_codec(module_name, &msg_defs, &features).as_bytes())?;
        opts.file_ops
            .write_file(&types_path, render_types(module_name, &msg_defs, &features).as_bytes())?;
        Artifact::Files(vec![codec_path, types_path])
    };

    Ok(Compiled {
        module_name: module_name.to_string(),
        artifact,
        warnings,
    })
}

/// The in-memory form of a generated codec: the compiled schema tables
/// plus the negotiated features, exposing the same operations a rendered
/// codec module exports.
pub struct CodecModule {
    name: String,
    defs: MsgDefs,
    features: Features,
}

impl CodecModule {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn features(&self) -> &Features {
        &self.features
    }

    /// Schema introspection.
    pub fn get_msg_defs(&self) -> &MsgDefs {
        &self.defs
    }

    /// An all-absent value of the named message type.
    pub fn new_msg(&self, msg_name: &str) -> Option<MsgVal<'_>> {
        self.defs.msg(msg_name).map(MsgVal::new)
    }

    /// Encodes under the negotiated verify mode: `always` verifies every
    /// call, `optionally` and `never` do not (use [`encode_msg_opt`] for
    /// the per-call switch).
    ///
    /// [`encode_msg_opt`]: CodecModule::encode_msg_opt
    pub fn encode_msg(&self, msg: &MsgVal<'_>) -> Result<Vec<u8>, EncodeError> {
        self.encode_msg_opt(msg, false)
    }

    pub fn encode_msg_opt(&self, msg: &MsgVal<'_>, do_verify: bool) -> Result<Vec<u8>, EncodeError> {
        let verify_now = match self.features.verify {
            VerifyMode::Always => true,
            VerifyMode::Optionally => do_verify,
            VerifyMode::Never => false,
        };
        if verify_now {
            verify::verify_msg(&self.defs, msg)?;
        }
        encode::encode_msg(&self.defs, msg)
    }

    /// Decodes under the negotiated bytes policy.
    pub fn decode_msg<'a>(&'a self, msg_name: &str, bytes: &'a [u8]) -> Result<MsgVal<'a>, DecodeError> {
        decode::decode_msg_with(&self.defs, msg_name, bytes, self.features.bytes_policy)
    }

    pub fn merge_msgs<'a>(&'a self, prev: &MsgVal<'a>, new: &MsgVal<'a>) -> MsgVal<'a> {
        merge::merge_msgs(&self.defs, prev, new)
    }

    /// Always active, whatever the negotiated verify mode.
    pub fn verify_msg(&self, msg: &MsgVal<'_>) -> Result<(), VerifyError> {
        verify::verify_msg(&self.defs, msg)
    }

    /// The codec and types sources this module would be written as.
    pub fn render(&self) -> (String, String) {
        (
            render_codec(&self.name, &self.defs, &self.features),
            render_types(&self.name, &self.defs, &self.features),
        )
    }
}
