//! protopod-compiler
//!
//! The proto2 schema compiler. This crate implements:
//!  1) Import resolution over a pluggable file system (`imports`),
//!  2) Schema normalization and verification (`normalize`),
//!  3) Dependency ordering of message definitions (`toposort`),
//!  4) Feature negotiation (`features`),
//!  5) Lowering to the runtime schema tables (`lower`),
//!  6) Codec source emission (`gen`), and
//!  7) The `file` / `msg_defs` entry points (`compile`).
//!
//! The `.proto` lexer and parser are external collaborators plugged in
//! through the [`SchemaParser`] trait; the built-in [`JsonDefsParser`]
//! reads the raw definition shape from JSON.

pub mod compile;
pub mod error;
pub mod features;
pub mod fileops;
pub mod gen;
pub mod imports;
pub mod lower;
pub mod normalize;
pub mod opts;
pub mod parse;
pub mod toposort;
pub mod types;
pub mod utils;

pub use compile::{file, msg_defs, Artifact, CodecModule, Compiled};
pub use error::{CompileError, DefsProblem};
pub use features::{CopyBytes, Features, VerifyMode};
pub use fileops::{FileOps, MemFileOps, OsFileOps};
pub use opts::CompileOpts;
pub use parse::{JsonDefsParser, ParseFailure, SchemaParser};
