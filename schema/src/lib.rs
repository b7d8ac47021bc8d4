//! Runtime support for protopod codecs.
//!
//! This crate holds everything a compiled codec needs at run time: the
//! proto2 wire primitives, the compiled schema tables ([`MsgDefs`]), the
//! dynamic [`Value`] representation, and the four engines that operate on
//! them (encode, decode, merge, verify). Codec modules emitted by
//! `protopod-compiler` embed their schema tables and call into these
//! engines; the same tables can be driven directly, as below.
//!
//! ```
//! use protopod_schema::defs::{FieldDef, FieldType, MsgDef, MsgDefs, Occurrence, ScalarType};
//! use protopod_schema::value::{MsgVal, Value};
//! use protopod_schema::{decode, encode};
//!
//! let defs = MsgDefs::new(
//!     vec![MsgDef::new(
//!         "Probe",
//!         vec![FieldDef::new(
//!             "id",
//!             1,
//!             1,
//!             FieldType::Scalar(ScalarType::Int32),
//!             Occurrence::Required,
//!         )],
//!     )],
//!     vec![],
//! );
//!
//! let mut msg = MsgVal::new(defs.msg("Probe").unwrap());
//! msg.set(1, Value::Int32(150));
//!
//! let bytes = encode::encode_msg(&defs, &msg).unwrap();
//! assert_eq!(bytes, [0x08, 0x96, 0x01]);
//! assert_eq!(decode::decode_msg(&defs, "Probe", &bytes).unwrap(), msg);
//! ```
//!
//! [`MsgDefs`]: defs::MsgDefs
//! [`Value`]: value::Value

pub mod decode;
pub mod defs;
pub mod encode;
pub mod error;
pub mod merge;
pub mod value;
pub mod verify;
pub mod wire;

pub use decode::{decode_msg, decode_msg_with, BytesPolicy};
pub use defs::{DefaultVal, EnumDef, FieldDef, FieldType, MsgDef, MsgDefs, Occurrence, ScalarType};
pub use encode::encode_msg;
pub use error::{DecodeError, EncodeError, VerifyError, VerifyReason};
pub use merge::merge_msgs;
pub use value::{MsgVal, Value};
pub use verify::verify_msg;
