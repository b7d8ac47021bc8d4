//! The encoder engine: in-memory values to proto2 wire bytes.
//!
//! Fields are emitted in declaration order as a linear append. Required
//! fields are always emitted, absent optional fields are omitted, and an
//! empty repeated field emits nothing at all (no key, no zero-length
//! marker). Packed repeated fields of fixed-width scalars take a fast
//! path: the block length is `count * element_size`, so no scratch buffer
//! is needed. Varint-sized elements and sub-messages are staged through a
//! stack-local scratch writer first to learn their length.

use crate::defs::{FieldDef, FieldType, MsgDef, MsgDefs, Occurrence, ScalarType};
use crate::error::EncodeError;
use crate::value::{MsgVal, Value};
use crate::wire::{zigzag32, zigzag64, WireWriter};

/// Encodes `msg` against its message type in `defs`.
pub fn encode_msg(defs: &MsgDefs, msg: &MsgVal<'_>) -> Result<Vec<u8>, EncodeError> {
    let def = defs
        .msg(msg.name)
        .ok_or_else(|| EncodeError::UnknownMsg(msg.name.to_string()))?;
    let mut w = WireWriter::new();
    encode_fields(defs, def, msg, &mut w)?;
    Ok(w.data())
}

fn encode_fields(
    defs: &MsgDefs,
    def: &MsgDef,
    msg: &MsgVal<'_>,
    w: &mut WireWriter,
) -> Result<(), EncodeError> {
    for field in &def.fields {
        let slot = msg.fields.get(field.rnum - 1).and_then(|v| v.as_ref());
        match field.occurrence {
            Occurrence::Required => {
                let value = slot.ok_or_else(|| EncodeError::MissingRequired {
                    msg: def.name.clone(),
                    field: field.name.clone(),
                })?;
                encode_one(defs, def, field, value, w)?;
            }
            Occurrence::Optional => {
                if let Some(value) = slot {
                    encode_one(defs, def, field, value, w)?;
                }
            }
            Occurrence::Repeated => {
                let Some(value) = slot else { continue };
                let Value::List(items) = value else {
                    return Err(bad_value(def, field));
                };
                if items.is_empty() {
                    continue;
                }
                if field.packed {
                    encode_packed(defs, def, field, items, w)?;
                } else {
                    for item in items {
                        encode_one(defs, def, field, item, w)?;
                    }
                }
            }
        }
    }
    Ok(())
}

/// Emits the field key followed by one element value.
fn encode_one(
    defs: &MsgDefs,
    def: &MsgDef,
    field: &FieldDef,
    value: &Value<'_>,
    w: &mut WireWriter,
) -> Result<(), EncodeError> {
    match field.typ {
        FieldType::Scalar(s) => {
            w.write_varint(field.key() as u64);
            encode_scalar(s, value, def, field, w)
        }
        FieldType::Enum(ei) => {
            w.write_varint(field.key() as u64);
            let num = enum_number(defs, ei, value, def, field)?;
            // Two's-complement 32-bit reinterpretation, sign-extended:
            // negative enum values occupy 10 bytes.
            w.write_varint(num as i64 as u64);
            Ok(())
        }
        FieldType::Msg(mi) => {
            let Value::Msg(sub) = value else {
                return Err(bad_value(def, field));
            };
            let sub_def = defs.msg_at(mi);
            if sub.name != sub_def.name {
                return Err(bad_value(def, field));
            }
            let mut scratch = WireWriter::new();
            encode_fields(defs, sub_def, sub, &mut scratch)?;
            w.write_varint(field.key() as u64);
            w.write_len_prefixed(scratch.as_slice());
            Ok(())
        }
    }
}

fn encode_packed(
    defs: &MsgDefs,
    def: &MsgDef,
    field: &FieldDef,
    items: &[Value<'_>],
    w: &mut WireWriter,
) -> Result<(), EncodeError> {
    w.write_varint(field.key() as u64);
    if let Some(size) = field.fixed_elem_size() {
        // Size-known fast path: length is count * element_size.
        w.write_varint((items.len() * size) as u64);
        for item in items {
            match field.typ {
                FieldType::Scalar(s) => encode_scalar(s, item, def, field, w)?,
                _ => return Err(bad_value(def, field)),
            }
        }
    } else {
        let mut scratch = WireWriter::new();
        for item in items {
            match field.typ {
                FieldType::Scalar(s) => encode_scalar(s, item, def, field, &mut scratch)?,
                FieldType::Enum(ei) => {
                    let num = enum_number(defs, ei, item, def, field)?;
                    scratch.write_varint(num as i64 as u64);
                }
                FieldType::Msg(_) => return Err(bad_value(def, field)),
            }
        }
        w.write_len_prefixed(scratch.as_slice());
    }
    Ok(())
}

fn encode_scalar(
    s: ScalarType,
    value: &Value<'_>,
    def: &MsgDef,
    field: &FieldDef,
    w: &mut WireWriter,
) -> Result<(), EncodeError> {
    match s {
        ScalarType::Int32 => {
            let v = int_in_range(value, i32::MIN as i128, i32::MAX as i128, def, field)? as i32;
            // Sign-extended to 64 bits first: negative int32 takes 10 bytes.
            w.write_varint(v as i64 as u64);
        }
        ScalarType::Int64 => {
            let v = int_in_range(value, i64::MIN as i128, i64::MAX as i128, def, field)? as i64;
            w.write_varint(v as u64);
        }
        ScalarType::Uint32 => {
            let v = int_in_range(value, 0, u32::MAX as i128, def, field)? as u32;
            w.write_varint(v as u64);
        }
        ScalarType::Uint64 => {
            let v = int_in_range(value, 0, u64::MAX as i128, def, field)? as u64;
            w.write_varint(v);
        }
        ScalarType::Sint32 => {
            let v = int_in_range(value, i32::MIN as i128, i32::MAX as i128, def, field)? as i32;
            w.write_varint(zigzag32(v) as u64);
        }
        ScalarType::Sint64 => {
            let v = int_in_range(value, i64::MIN as i128, i64::MAX as i128, def, field)? as i64;
            w.write_varint(zigzag64(v));
        }
        ScalarType::Bool => {
            let Value::Bool(v) = value else {
                return Err(bad_value(def, field));
            };
            w.write_byte(u8::from(*v));
        }
        ScalarType::Fixed32 => {
            let v = int_in_range(value, 0, u32::MAX as i128, def, field)? as u32;
            w.write_fixed32(v);
        }
        ScalarType::Sfixed32 => {
            let v = int_in_range(value, i32::MIN as i128, i32::MAX as i128, def, field)? as i32;
            w.write_fixed32(v as u32);
        }
        ScalarType::Float => {
            let v = value.as_numeric().ok_or_else(|| bad_value(def, field))?;
            w.write_fixed32((v as f32).to_bits());
        }
        ScalarType::Fixed64 => {
            let v = int_in_range(value, 0, u64::MAX as i128, def, field)? as u64;
            w.write_fixed64(v);
        }
        ScalarType::Sfixed64 => {
            let v = int_in_range(value, i64::MIN as i128, i64::MAX as i128, def, field)? as i64;
            w.write_fixed64(v as u64);
        }
        ScalarType::Double => {
            let v = value.as_numeric().ok_or_else(|| bad_value(def, field))?;
            w.write_fixed64(v.to_bits());
        }
        ScalarType::String => {
            let Value::Str(v) = value else {
                return Err(bad_value(def, field));
            };
            w.write_len_prefixed(v.as_bytes());
        }
        ScalarType::Bytes => {
            let Value::Bytes(v) = value else {
                return Err(bad_value(def, field));
            };
            w.write_len_prefixed(v);
        }
    }
    Ok(())
}

/// The enum number to put on the wire. A declared symbol is mapped through
/// the enum def; a raw integer (e.g. an unknown value carried through a
/// decode) passes straight through.
fn enum_number(
    defs: &MsgDefs,
    ei: usize,
    value: &Value<'_>,
    def: &MsgDef,
    field: &FieldDef,
) -> Result<i32, EncodeError> {
    let enum_def = defs.enum_at(ei);
    match value {
        Value::Enum(sym) => enum_def
            .number_of(sym)
            .ok_or_else(|| EncodeError::BadEnumSymbol {
                enum_name: enum_def.name.clone(),
                sym: sym.to_string(),
            }),
        _ => {
            let v = int_in_range(value, i32::MIN as i128, i32::MAX as i128, def, field)?;
            Ok(v as i32)
        }
    }
}

fn int_in_range(
    value: &Value<'_>,
    min: i128,
    max: i128,
    def: &MsgDef,
    field: &FieldDef,
) -> Result<i128, EncodeError> {
    match value.as_integer() {
        Some(v) if v >= min && v <= max => Ok(v),
        _ => Err(bad_value(def, field)),
    }
}

fn bad_value(def: &MsgDef, field: &FieldDef) -> EncodeError {
    EncodeError::BadValue {
        msg: def.name.clone(),
        field: field.name.clone(),
    }
}
