//! protopod
//!
//! A proto2 schema compiler and wire-format codec toolkit. This facade
//! crate re-exports the public surface of the compiler and the runtime:
//!
//! - `protopod-compiler`: the staged pipeline behind [`file`] and
//!   [`msg_defs`], producing codec source files or an in-memory
//!   [`CodecModule`],
//! - `protopod-schema`: the wire primitives, schema tables, and the
//!   encode / decode / merge / verify engines.

pub use protopod_compiler::{
    file, msg_defs, Artifact, CodecModule, CompileError, CompileOpts, Compiled, CopyBytes,
    DefsProblem, FileOps, JsonDefsParser, MemFileOps, OsFileOps, SchemaParser, VerifyMode,
};
pub use protopod_schema::{
    decode_msg, encode_msg, merge_msgs, verify_msg, BytesPolicy, DecodeError, EncodeError,
    MsgDefs, MsgVal, Value, VerifyError,
};

/// Pretty-prints compiled definitions as JSON, for diagnostics and
/// tooling.
pub fn defs_to_json(defs: &MsgDefs) -> String {
    serde_json::to_string_pretty(defs).unwrap()
}

pub mod error {
    pub use protopod_compiler::{CompileError, DefsProblem};
    pub use protopod_schema::error::{DecodeError, EncodeError, VerifyError, VerifyReason};
}

pub mod schema {
    pub use protopod_schema::*;
}

pub mod compiler {
    pub use protopod_compiler::*;
}
