//! The decoder engine: proto2 wire bytes to in-memory values.
//!
//! Per message the decoder is a three-state machine: read a field key,
//! read (or skip) the value it announces, and finalize at end of buffer.
//! Unknown field numbers are skipped by wire type; wire types 3/4/6/7
//! fail with a malformed-wire-type error and a short read fails with a
//! truncated error.
//!
//! Merge-on-receive applies within a single decode: scalars are
//! last-wins, sub-message occurrences merge recursively, and repeated
//! fields append. Repeated accumulators are plain `Vec`s pushed in wire
//! order, so no finalizer reversal pass is needed.

use std::borrow::Cow;

use serde::Serialize;

use crate::defs::{FieldDef, FieldType, MsgDef, MsgDefs, Occurrence, ScalarType};
use crate::error::DecodeError;
use crate::merge::merge_with_def;
use crate::value::{MsgVal, Value};
use crate::wire::{unzigzag32, unzigzag64, WireReader, WireType};

/// What to do with a decoded `bytes` field: alias the input buffer, copy
/// out of it, or copy only when the input buffer is at least `T` times as
/// long as the slice (the heuristic that keeps a small field from pinning
/// a large root buffer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BytesPolicy {
    Never,
    Always,
    Threshold(u32),
}

/// Decodes `bytes` as a value of message type `name`, aliasing decoded
/// `bytes` fields into the input buffer.
pub fn decode_msg<'a>(
    defs: &'a MsgDefs,
    name: &str,
    bytes: &'a [u8],
) -> Result<MsgVal<'a>, DecodeError> {
    decode_msg_with(defs, name, bytes, BytesPolicy::Never)
}

/// Decodes with an explicit bytes-copy policy. The observable bytes are
/// identical under every policy; only the aliasing differs.
pub fn decode_msg_with<'a>(
    defs: &'a MsgDefs,
    name: &str,
    bytes: &'a [u8],
    policy: BytesPolicy,
) -> Result<MsgVal<'a>, DecodeError> {
    let def = defs
        .msg(name)
        .ok_or_else(|| DecodeError::UnknownMsg(name.to_string()))?;
    let mut r = WireReader::new(bytes);
    decode_fields(defs, def, &mut r, policy, bytes.len())
}

fn decode_fields<'a>(
    defs: &'a MsgDefs,
    def: &'a MsgDef,
    r: &mut WireReader<'a>,
    policy: BytesPolicy,
    root_len: usize,
) -> Result<MsgVal<'a>, DecodeError> {
    let mut msg = MsgVal::new(def);
    while !r.is_at_end() {
        let (fnum, wire_type) = r.read_key()?;
        match def.field_by_fnum(fnum) {
            Some(field) => decode_field(defs, field, wire_type, r, policy, root_len, &mut msg)?,
            None => r.skip(wire_type)?,
        }
    }
    Ok(msg)
}

fn decode_field<'a>(
    defs: &'a MsgDefs,
    field: &'a FieldDef,
    wire_type: WireType,
    r: &mut WireReader<'a>,
    policy: BytesPolicy,
    root_len: usize,
    msg: &mut MsgVal<'a>,
) -> Result<(), DecodeError> {
    let elem_wire_type = field.elem_wire_type();

    if field.occurrence == Occurrence::Repeated {
        if wire_type == WireType::LengthDelimited && elem_wire_type != WireType::LengthDelimited {
            // A packed block, whether or not the field was declared
            // packed: packed and unpacked occurrences may interleave.
            let block = r.read_len_slice()?;
            decode_packed_block(defs, field, block, msg)?;
        } else if wire_type == elem_wire_type {
            let value = read_elem(defs, field, r, policy, root_len)?;
            push_elem(msg, field, value);
        } else {
            r.skip(wire_type)?;
        }
        return Ok(());
    }

    if wire_type != elem_wire_type {
        // A wire-type mismatch is treated like an unknown field.
        return r.skip(wire_type);
    }

    let value = read_elem(defs, field, r, policy, root_len)?;
    let slot = &mut msg.fields[field.rnum - 1];
    *slot = match (slot.take(), value) {
        // Sub-message occurrences merge; everything else is last-wins.
        (Some(Value::Msg(prev)), Value::Msg(new)) => {
            let sub_def = match field.typ {
                FieldType::Msg(mi) => defs.msg_at(mi),
                _ => unreachable!("message value decoded for non-message field"),
            };
            Some(Value::Msg(merge_with_def(defs, sub_def, &prev, &new)))
        }
        (_, new) => Some(new),
    };
    Ok(())
}

fn decode_packed_block<'a>(
    defs: &'a MsgDefs,
    field: &'a FieldDef,
    block: &'a [u8],
    msg: &mut MsgVal<'a>,
) -> Result<(), DecodeError> {
    let mut br = WireReader::new(block);
    if let Some(size) = field.fixed_elem_size() {
        if block.len() % size != 0 {
            return Err(DecodeError::BadPackedLength {
                len: block.len(),
                elem_size: size,
            });
        }
    }
    while !br.is_at_end() {
        // Packed elements never carry keys and are never length-delimited,
        // so the policy and root length are irrelevant here.
        let value = read_elem(defs, field, &mut br, BytesPolicy::Never, block.len())?;
        push_elem(msg, field, value);
    }
    Ok(())
}

fn push_elem<'a>(msg: &mut MsgVal<'a>, field: &FieldDef, value: Value<'a>) {
    let slot = &mut msg.fields[field.rnum - 1];
    if !matches!(slot, Some(Value::List(_))) {
        *slot = Some(Value::List(Vec::new()));
    }
    if let Some(list) = slot {
        list.push(value);
    }
}

/// Reads one element value of the field's type. Inverts the encoder
/// exactly; length-delimited values first read a length varint and then
/// slice that many bytes.
fn read_elem<'a>(
    defs: &'a MsgDefs,
    field: &'a FieldDef,
    r: &mut WireReader<'a>,
    policy: BytesPolicy,
    root_len: usize,
) -> Result<Value<'a>, DecodeError> {
    match field.typ {
        FieldType::Scalar(s) => read_scalar(s, r, policy, root_len),
        FieldType::Enum(ei) => {
            let num = r.read_varint()? as i64 as i32;
            match defs.enum_at(ei).symbol_of(num) {
                Some(sym) => Ok(Value::Enum(sym)),
                // An undeclared number is carried through as the integer.
                None => Ok(Value::Int32(num)),
            }
        }
        FieldType::Msg(mi) => {
            let sub = r.read_len_slice()?;
            let mut sr = WireReader::new(sub);
            let value = decode_fields(defs, defs.msg_at(mi), &mut sr, policy, root_len)?;
            Ok(Value::Msg(value))
        }
    }
}

fn read_scalar<'a>(
    s: ScalarType,
    r: &mut WireReader<'a>,
    policy: BytesPolicy,
    root_len: usize,
) -> Result<Value<'a>, DecodeError> {
    Ok(match s {
        ScalarType::Int32 => Value::Int32(r.read_varint()? as i64 as i32),
        ScalarType::Int64 => Value::Int64(r.read_varint()? as i64),
        ScalarType::Uint32 => Value::Uint32(r.read_varint()? as u32),
        ScalarType::Uint64 => Value::Uint64(r.read_varint()?),
        ScalarType::Sint32 => Value::Int32(unzigzag32(r.read_varint()? as u32)),
        ScalarType::Sint64 => Value::Int64(unzigzag64(r.read_varint()?)),
        ScalarType::Bool => Value::Bool(r.read_varint()? != 0),
        ScalarType::Fixed32 => Value::Uint32(r.read_fixed32()?),
        ScalarType::Sfixed32 => Value::Int32(r.read_fixed32()? as i32),
        ScalarType::Float => Value::Float(f32::from_bits(r.read_fixed32()?)),
        ScalarType::Fixed64 => Value::Uint64(r.read_fixed64()?),
        ScalarType::Sfixed64 => Value::Int64(r.read_fixed64()? as i64),
        ScalarType::Double => Value::Double(f64::from_bits(r.read_fixed64()?)),
        ScalarType::String => Value::Str(String::from_utf8_lossy(r.read_len_slice()?)),
        ScalarType::Bytes => {
            let slice = r.read_len_slice()?;
            let copy = match policy {
                BytesPolicy::Never => false,
                BytesPolicy::Always => true,
                BytesPolicy::Threshold(t) => root_len >= (t as usize).saturating_mul(slice.len()),
            };
            if copy {
                Value::Bytes(Cow::Owned(slice.to_vec()))
            } else {
                Value::Bytes(Cow::Borrowed(slice))
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{EnumDef, FieldDef, MsgDef};

    fn defs() -> MsgDefs {
        MsgDefs::new(
            vec![
                MsgDef::new(
                    "Sub",
                    vec![
                        FieldDef::new("a", 1, 1, FieldType::Scalar(ScalarType::Int32), Occurrence::Optional),
                        FieldDef::new("b", 2, 2, FieldType::Scalar(ScalarType::Int32), Occurrence::Optional),
                    ],
                ),
                MsgDef::new(
                    "Top",
                    vec![
                        FieldDef::new("x", 1, 1, FieldType::Scalar(ScalarType::Int32), Occurrence::Optional),
                        FieldDef::new("xs", 2, 2, FieldType::Scalar(ScalarType::Int32), Occurrence::Repeated)
                            .packed(),
                        FieldDef::new("sub", 3, 3, FieldType::Msg(0), Occurrence::Optional),
                        FieldDef::new("data", 4, 4, FieldType::Scalar(ScalarType::Bytes), Occurrence::Optional),
                        FieldDef::new("e", 5, 5, FieldType::Enum(0), Occurrence::Optional),
                    ],
                ),
            ],
            vec![EnumDef::new("E", vec![("A".to_string(), 0), ("B".to_string(), 2)])],
        )
    }

    #[test]
    fn scalar_last_wins() {
        let defs = defs();
        // x=1 then x=150: the later occurrence overwrites.
        let bytes = [0x08, 0x01, 0x08, 0x96, 0x01];
        let msg = decode_msg(&defs, "Top", &bytes).unwrap();
        assert_eq!(msg.get(1), Some(&Value::Int32(150)));
    }

    #[test]
    fn packed_and_unpacked_interleave() {
        let defs = defs();
        // Packed block [3, 270], then a bare varint occurrence 86942.
        let bytes = [0x12, 0x03, 0x03, 0x8E, 0x02, 0x10, 0x9E, 0xA7, 0x05];
        let msg = decode_msg(&defs, "Top", &bytes).unwrap();
        assert_eq!(
            msg.get(2),
            Some(&Value::List(vec![
                Value::Int32(3),
                Value::Int32(270),
                Value::Int32(86942)
            ]))
        );
    }

    #[test]
    fn submessage_occurrences_merge() {
        let defs = defs();
        // Two occurrences of `sub`, one setting a and one setting b.
        let bytes = [0x1A, 0x02, 0x08, 0x01, 0x1A, 0x02, 0x10, 0x02];
        let msg = decode_msg(&defs, "Top", &bytes).unwrap();
        let sub = msg.get(3).and_then(|v| v.as_msg()).unwrap();
        assert_eq!(sub.get(1), Some(&Value::Int32(1)));
        assert_eq!(sub.get(2), Some(&Value::Int32(2)));
    }

    #[test]
    fn unknown_fields_are_skipped() {
        let defs = defs();
        let bytes = [
            0x50, 0x00, // fnum 10, varint 0
            0x08, 0x96, 0x01, // x = 150
            0x62, 0x03, 1, 2, 3, // fnum 12, length-delimited
            0x65, 0, 0, 0, 0, // fnum 12, fixed32
            0x61, 0, 0, 0, 0, 0, 0, 0, 0, // fnum 12, fixed64
        ];
        let msg = decode_msg(&defs, "Top", &bytes).unwrap();
        assert_eq!(msg.get(1), Some(&Value::Int32(150)));
    }

    #[test]
    fn unknown_enum_number_is_kept_as_integer() {
        let defs = defs();
        let bytes = [0x28, 0x07];
        let msg = decode_msg(&defs, "Top", &bytes).unwrap();
        assert_eq!(msg.get(5), Some(&Value::Int32(7)));

        let bytes = [0x28, 0x02];
        let msg = decode_msg(&defs, "Top", &bytes).unwrap();
        assert_eq!(msg.get(5), Some(&Value::Enum("B")));
    }

    #[test]
    fn truncation_and_bad_wire_types() {
        let defs = defs();
        assert_eq!(
            decode_msg(&defs, "Top", &[0x08]),
            Err(DecodeError::Truncated)
        );
        assert_eq!(
            decode_msg(&defs, "Top", &[0x22, 0x05, 1, 2]),
            Err(DecodeError::Truncated)
        );
        assert_eq!(
            decode_msg(&defs, "Top", &[0x0B]),
            Err(DecodeError::MalformedWireType {
                fnum: 1,
                wire_type: 3
            })
        );
        assert_eq!(
            decode_msg(&defs, "Missing", &[]),
            Err(DecodeError::UnknownMsg("Missing".to_string()))
        );
    }

    #[test]
    fn bytes_policy_controls_aliasing() {
        let defs = defs();
        let bytes = [0x22, 0x03, 9, 8, 7];

        let msg = decode_msg_with(&defs, "Top", &bytes, BytesPolicy::Never).unwrap();
        assert!(matches!(
            msg.get(4),
            Some(Value::Bytes(Cow::Borrowed([9, 8, 7])))
        ));

        let msg = decode_msg_with(&defs, "Top", &bytes, BytesPolicy::Always).unwrap();
        assert!(matches!(msg.get(4), Some(Value::Bytes(Cow::Owned(_)))));

        // Input is 5 bytes, slice is 3: a threshold of 2 (needs >= 6) does
        // not copy, a threshold of 1 (needs >= 3) does.
        let msg = decode_msg_with(&defs, "Top", &bytes, BytesPolicy::Threshold(2)).unwrap();
        assert!(matches!(
            msg.get(4),
            Some(Value::Bytes(Cow::Borrowed([9, 8, 7])))
        ));
        let msg = decode_msg_with(&defs, "Top", &bytes, BytesPolicy::Threshold(1)).unwrap();
        assert!(matches!(msg.get(4), Some(Value::Bytes(Cow::Owned(_)))));
    }
}
