//! The compiled schema tables that every engine dispatches on.
//!
//! A [`MsgDefs`] value is the normalized, lowered form of a schema: message
//! and enum definitions in dependency order, with type references turned
//! into indices and lookup maps built up front. Engines never walk names at
//! runtime except at the public entry points.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::wire::{field_key, WireType};

/// The fifteen scalar field types of proto2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Sint32,
    Sint64,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Bool,
    Fixed32,
    Sfixed32,
    Float,
    Fixed64,
    Sfixed64,
    Double,
    String,
    Bytes,
}

impl ScalarType {
    pub fn wire_type(self) -> WireType {
        match self {
            ScalarType::Sint32
            | ScalarType::Sint64
            | ScalarType::Int32
            | ScalarType::Int64
            | ScalarType::Uint32
            | ScalarType::Uint64
            | ScalarType::Bool => WireType::Varint,
            ScalarType::Fixed32 | ScalarType::Sfixed32 | ScalarType::Float => WireType::Fixed32,
            ScalarType::Fixed64 | ScalarType::Sfixed64 | ScalarType::Double => WireType::Fixed64,
            ScalarType::String | ScalarType::Bytes => WireType::LengthDelimited,
        }
    }

    /// Element size in bytes when it is statically known, i.e. for the
    /// fixed-width scalars. Packed encoding of these needs no scratch
    /// buffer because the block length is `count * size`.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            ScalarType::Fixed32 | ScalarType::Sfixed32 | ScalarType::Float => Some(4),
            ScalarType::Fixed64 | ScalarType::Sfixed64 | ScalarType::Double => Some(8),
            _ => None,
        }
    }

    /// Whether `[packed]` is admissible on a repeated field of this type.
    /// Everything numeric packs; `string` and `bytes` do not.
    pub fn packable(self) -> bool {
        !matches!(self, ScalarType::String | ScalarType::Bytes)
    }

    pub fn proto_name(self) -> &'static str {
        match self {
            ScalarType::Sint32 => "sint32",
            ScalarType::Sint64 => "sint64",
            ScalarType::Int32 => "int32",
            ScalarType::Int64 => "int64",
            ScalarType::Uint32 => "uint32",
            ScalarType::Uint64 => "uint64",
            ScalarType::Bool => "bool",
            ScalarType::Fixed32 => "fixed32",
            ScalarType::Sfixed32 => "sfixed32",
            ScalarType::Float => "float",
            ScalarType::Fixed64 => "fixed64",
            ScalarType::Sfixed64 => "sfixed64",
            ScalarType::Double => "double",
            ScalarType::String => "string",
            ScalarType::Bytes => "bytes",
        }
    }
}

/// A field's type: a scalar, or an index into the enum or message tables
/// of the owning [`MsgDefs`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum FieldType {
    Scalar(ScalarType),
    Enum(usize),
    Msg(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Occurrence {
    Required,
    Optional,
    Repeated,
}

/// A canonicalized `default` option value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DefaultVal {
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    Str(String),
    Bytes(Vec<u8>),
    Enum(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDef {
    pub name: String,
    /// The wire-level field number.
    pub fnum: u32,
    /// The dense 1-based ordinal used for positional access into a
    /// message value's field vector.
    pub rnum: usize,
    pub typ: FieldType,
    pub occurrence: Occurrence,
    pub packed: bool,
    pub default: Option<DefaultVal>,
}

impl FieldDef {
    pub fn new(
        name: impl Into<String>,
        fnum: u32,
        rnum: usize,
        typ: FieldType,
        occurrence: Occurrence,
    ) -> FieldDef {
        FieldDef {
            name: name.into(),
            fnum,
            rnum,
            typ,
            occurrence,
            packed: false,
            default: None,
        }
    }

    pub fn packed(mut self) -> FieldDef {
        self.packed = true;
        self
    }

    pub fn with_default(mut self, default: DefaultVal) -> FieldDef {
        self.default = Some(default);
        self
    }

    /// The wire type of a single element of this field.
    pub fn elem_wire_type(&self) -> WireType {
        match self.typ {
            FieldType::Scalar(s) => s.wire_type(),
            FieldType::Enum(_) => WireType::Varint,
            FieldType::Msg(_) => WireType::LengthDelimited,
        }
    }

    /// The varint key emitted ahead of this field's value. A packed
    /// repeated field is framed as one length-delimited record.
    pub fn key(&self) -> u32 {
        let wire_type = if self.packed && self.occurrence == Occurrence::Repeated {
            WireType::LengthDelimited
        } else {
            self.elem_wire_type()
        };
        field_key(self.fnum, wire_type)
    }

    /// Element size for the packed fast path, when statically known.
    pub fn fixed_elem_size(&self) -> Option<usize> {
        match self.typ {
            FieldType::Scalar(s) => s.fixed_size(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumDef {
    pub name: String,
    /// Declared `(symbol, number)` pairs, in declaration order. Numbers
    /// are signed 32-bit; negative values take 10 bytes on the wire.
    pub symbols: Vec<(String, i32)>,
    #[serde(skip)]
    by_sym: HashMap<String, usize>,
    #[serde(skip)]
    by_num: HashMap<i32, usize>,
}

impl EnumDef {
    pub fn new(name: impl Into<String>, symbols: Vec<(String, i32)>) -> EnumDef {
        let mut by_sym = HashMap::new();
        let mut by_num = HashMap::new();
        for (i, (sym, num)) in symbols.iter().enumerate() {
            by_sym.entry(sym.clone()).or_insert(i);
            // The first symbol wins for aliased numbers.
            by_num.entry(*num).or_insert(i);
        }
        EnumDef {
            name: name.into(),
            symbols,
            by_sym,
            by_num,
        }
    }

    pub fn number_of(&self, sym: &str) -> Option<i32> {
        self.by_sym.get(sym).map(|&i| self.symbols[i].1)
    }

    pub fn symbol_of(&self, num: i32) -> Option<&str> {
        self.by_num.get(&num).map(|&i| self.symbols[i].0.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MsgDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
    #[serde(skip)]
    by_fnum: HashMap<u32, usize>,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
}

impl MsgDef {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDef>) -> MsgDef {
        let mut by_fnum = HashMap::new();
        let mut by_name = HashMap::new();
        for (i, field) in fields.iter().enumerate() {
            by_fnum.entry(field.fnum).or_insert(i);
            by_name.entry(field.name.clone()).or_insert(i);
        }
        MsgDef {
            name: name.into(),
            fields,
            by_fnum,
            by_name,
        }
    }

    pub fn field_by_fnum(&self, fnum: u32) -> Option<&FieldDef> {
        self.by_fnum.get(&fnum).map(|&i| &self.fields[i])
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldDef> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    /// Positional ordinal of a field, for indexing into a message value.
    pub fn rnum_of(&self, name: &str) -> Option<usize> {
        self.field_by_name(name).map(|f| f.rnum)
    }
}

/// A complete compiled schema: what `get_msg_defs()` hands back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MsgDefs {
    pub msgs: Vec<MsgDef>,
    pub enums: Vec<EnumDef>,
    #[serde(skip)]
    msg_index: HashMap<String, usize>,
    #[serde(skip)]
    enum_index: HashMap<String, usize>,
}

impl MsgDefs {
    pub fn new(msgs: Vec<MsgDef>, enums: Vec<EnumDef>) -> MsgDefs {
        let msg_index = msgs
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name.clone(), i))
            .collect();
        let enum_index = enums
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();
        MsgDefs {
            msgs,
            enums,
            msg_index,
            enum_index,
        }
    }

    pub fn msg(&self, name: &str) -> Option<&MsgDef> {
        self.msg_index.get(name).map(|&i| &self.msgs[i])
    }

    pub fn msg_index_of(&self, name: &str) -> Option<usize> {
        self.msg_index.get(name).copied()
    }

    pub fn msg_at(&self, index: usize) -> &MsgDef {
        &self.msgs[index]
    }

    pub fn enum_def(&self, name: &str) -> Option<&EnumDef> {
        self.enum_index.get(name).map(|&i| &self.enums[i])
    }

    pub fn enum_at(&self, index: usize) -> &EnumDef {
        &self.enums[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_wire_types() {
        assert_eq!(ScalarType::Int32.wire_type(), WireType::Varint);
        assert_eq!(ScalarType::Sint64.wire_type(), WireType::Varint);
        assert_eq!(ScalarType::Bool.wire_type(), WireType::Varint);
        assert_eq!(ScalarType::Float.wire_type(), WireType::Fixed32);
        assert_eq!(ScalarType::Sfixed32.wire_type(), WireType::Fixed32);
        assert_eq!(ScalarType::Double.wire_type(), WireType::Fixed64);
        assert_eq!(ScalarType::Fixed64.wire_type(), WireType::Fixed64);
        assert_eq!(ScalarType::String.wire_type(), WireType::LengthDelimited);
        assert_eq!(ScalarType::Bytes.wire_type(), WireType::LengthDelimited);
    }

    #[test]
    fn field_keys() {
        let f = FieldDef::new(
            "x",
            1,
            1,
            FieldType::Scalar(ScalarType::Int32),
            Occurrence::Required,
        );
        assert_eq!(f.key(), 0x08);

        let f = FieldDef::new(
            "xs",
            1,
            1,
            FieldType::Scalar(ScalarType::Int32),
            Occurrence::Repeated,
        )
        .packed();
        assert_eq!(f.key(), 0x0A);

        let f = FieldDef::new(
            "f",
            2,
            1,
            FieldType::Scalar(ScalarType::Fixed32),
            Occurrence::Optional,
        );
        assert_eq!(f.key(), 0x15);
    }

    #[test]
    fn enum_lookup() {
        let e = EnumDef::new(
            "Mode",
            vec![("OFF".to_string(), 0), ("ON".to_string(), 1), ("STANDBY".to_string(), -1)],
        );
        assert_eq!(e.number_of("ON"), Some(1));
        assert_eq!(e.number_of("STANDBY"), Some(-1));
        assert_eq!(e.number_of("MISSING"), None);
        assert_eq!(e.symbol_of(-1), Some("STANDBY"));
        assert_eq!(e.symbol_of(7), None);
    }

    #[test]
    fn msg_lookup() {
        let m = MsgDef::new(
            "Probe",
            vec![
                FieldDef::new("id", 1, 1, FieldType::Scalar(ScalarType::Int32), Occurrence::Required),
                FieldDef::new("tag", 3, 2, FieldType::Scalar(ScalarType::String), Occurrence::Optional),
            ],
        );
        assert_eq!(m.field_by_fnum(3).map(|f| f.name.as_str()), Some("tag"));
        assert_eq!(m.field_by_fnum(2), None);
        assert_eq!(m.rnum_of("tag"), Some(2));
    }
}
