use thiserror::Error;

/// Errors raised while decoding a proto2 wire-format buffer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("truncated input")]
    Truncated,

    #[error("malformed wire type {wire_type} for field {fnum}")]
    MalformedWireType { fnum: u32, wire_type: u8 },

    #[error("field number 0 is not allowed on the wire")]
    ZeroFieldNumber,

    #[error("varint longer than 10 bytes")]
    MalformedVarint,

    #[error("packed block of {len} bytes is not a multiple of the element size {elem_size}")]
    BadPackedLength { len: usize, elem_size: usize },

    #[error("unknown message type {0:?}")]
    UnknownMsg(String),
}

/// Errors raised while encoding an in-memory value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("unknown message type {0:?}")]
    UnknownMsg(String),

    #[error("missing required field {msg}.{field}")]
    MissingRequired { msg: String, field: String },

    #[error("field {msg}.{field} holds a value of the wrong kind")]
    BadValue { msg: String, field: String },

    #[error("unknown symbol {sym:?} for enum {enum_name}")]
    BadEnumSymbol { enum_name: String, sym: String },

    #[error(transparent)]
    Invalid(#[from] VerifyError),
}

/// The structured failure produced by the verifier: what went wrong, a
/// rendering of the offending value, and the dotted field path from the
/// root of the message that pinpoints it (repeated elements carry their
/// index, e.g. `points[2].x`).
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{path}: {reason}, got {value}")]
pub struct VerifyError {
    pub reason: VerifyReason,
    pub value: String,
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VerifyReason {
    #[error("expected an integer")]
    NotAnInteger,
    #[error("integer out of range for the field type")]
    IntOutOfRange,
    #[error("expected a numeric value")]
    NotNumeric,
    #[error("expected a boolean")]
    NotBool,
    #[error("expected a string")]
    NotString,
    #[error("expected a byte sequence")]
    NotBytes,
    #[error("not a declared symbol of the field's enum")]
    BadEnumSymbol,
    #[error("expected a list")]
    NotAList,
    #[error("expected a message value")]
    NotAMsg,
    #[error("message value is of the wrong type")]
    WrongMsg,
    #[error("required field is absent")]
    MissingRequired,
}
