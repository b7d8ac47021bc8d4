//! Dynamic message values.
//!
//! A [`Value`] can represent anything a schema describes and is converted
//! to and from wire bytes by the engine modules. Enum symbols and message
//! names are stored as string slices borrowed from their [`MsgDefs`], and
//! decoded strings/bytes may borrow the input buffer, so a `Value` can
//! outlive neither the defs it was built against nor (when borrowed) the
//! buffer it was decoded from.
//!
//! [`MsgDefs`]: crate::defs::MsgDefs

use std::borrow::Cow;
use std::fmt;

use crate::defs::MsgDef;

#[derive(Clone, PartialEq)]
pub enum Value<'a> {
    Int32(i32),
    Int64(i64),
    Uint32(u32),
    Uint64(u64),
    Bool(bool),
    Float(f32),
    Double(f64),
    Str(Cow<'a, str>),
    Bytes(Cow<'a, [u8]>),
    /// A declared enum symbol, borrowed from the defs.
    Enum(&'a str),
    Msg(MsgVal<'a>),
    /// The accumulator for a repeated field, in wire order.
    List(Vec<Value<'a>>),
}

impl<'a> Value<'a> {
    pub fn str(s: &str) -> Value<'static> {
        Value::Str(Cow::Owned(s.to_owned()))
    }

    pub fn bytes(b: &[u8]) -> Value<'static> {
        Value::Bytes(Cow::Owned(b.to_vec()))
    }

    /// The value as a lossless signed integer, when it is one of the
    /// integer variants. Used for cross-width acceptance with an explicit
    /// range check at the use site.
    pub fn as_integer(&self) -> Option<i128> {
        match *self {
            Value::Int32(v) => Some(v as i128),
            Value::Int64(v) => Some(v as i128),
            Value::Uint32(v) => Some(v as i128),
            Value::Uint64(v) => Some(v as i128),
            _ => None,
        }
    }

    /// The value as a double, accepting the float variants and (per the
    /// proto2 contract for `float`/`double` fields) the integer variants.
    pub fn as_numeric(&self) -> Option<f64> {
        match *self {
            Value::Float(v) => Some(v as f64),
            Value::Double(v) => Some(v),
            _ => self.as_integer().map(|v| v as f64),
        }
    }

    /// Extracts a [`Bool`](#variant.Bool). Returns `false` otherwise.
    pub fn as_bool(&self) -> bool {
        match *self {
            Value::Bool(v) => v,
            _ => false,
        }
    }

    /// Extracts a [`Str`](#variant.Str) or the symbol of an
    /// [`Enum`](#variant.Enum). Returns `""` otherwise.
    pub fn as_str(&self) -> &str {
        match *self {
            Value::Str(ref v) => v,
            Value::Enum(v) => v,
            _ => "",
        }
    }

    /// Extracts [`Bytes`](#variant.Bytes). Returns `&[]` otherwise.
    pub fn as_bytes(&self) -> &[u8] {
        match *self {
            Value::Bytes(ref v) => v,
            _ => &[],
        }
    }

    /// Extracts the elements of a [`List`](#variant.List). Returns an
    /// empty slice otherwise.
    pub fn as_list(&self) -> &[Value<'a>] {
        match *self {
            Value::List(ref vs) => vs.as_slice(),
            _ => &[],
        }
    }

    pub fn as_msg(&self) -> Option<&MsgVal<'a>> {
        match *self {
            Value::Msg(ref m) => Some(m),
            _ => None,
        }
    }

    /// Appends to a [`List`](#variant.List). Does nothing otherwise.
    pub fn push(&mut self, value: Value<'a>) {
        if let Value::List(ref mut vs) = *self {
            vs.push(value);
        }
    }
}

/// An in-memory message: its qualified name (borrowed from the defs) and
/// one slot per field, indexed positionally by `rnum - 1`. `None` is the
/// "absent" sentinel for optional fields and for never-touched repeated
/// fields (equivalent to an empty list on the wire).
#[derive(Clone, PartialEq)]
pub struct MsgVal<'a> {
    pub name: &'a str,
    pub fields: Vec<Option<Value<'a>>>,
}

impl<'a> MsgVal<'a> {
    /// An all-absent value of the given message type.
    pub fn new(def: &'a MsgDef) -> MsgVal<'a> {
        MsgVal {
            name: &def.name,
            fields: vec![None; def.fields.len()],
        }
    }

    /// The field slot for the given `rnum`. Panics when `rnum` is out of
    /// range for the message type.
    pub fn get(&self, rnum: usize) -> Option<&Value<'a>> {
        self.fields[rnum - 1].as_ref()
    }

    pub fn set(&mut self, rnum: usize, value: Value<'a>) {
        self.fields[rnum - 1] = Some(value);
    }

    pub fn clear(&mut self, rnum: usize) {
        self.fields[rnum - 1] = None;
    }

    /// Looks a field up by name through the message's def and returns its
    /// value, if present.
    pub fn get_by_name(&self, def: &MsgDef, name: &str) -> Option<&Value<'a>> {
        def.rnum_of(name).and_then(|rnum| self.get(rnum))
    }

    pub fn set_by_name(&mut self, def: &MsgDef, name: &str, value: Value<'a>) {
        if let Some(rnum) = def.rnum_of(name) {
            self.set(rnum, value);
        }
    }
}

impl<'a> fmt::Debug for Value<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match *self {
            Value::Int32(v) => v.fmt(f),
            Value::Int64(v) => v.fmt(f),
            Value::Uint32(v) => v.fmt(f),
            Value::Uint64(v) => v.fmt(f),
            Value::Bool(v) => v.fmt(f),
            Value::Float(v) => v.fmt(f),
            Value::Double(v) => v.fmt(f),
            Value::Str(ref v) => v.fmt(f),
            Value::Bytes(ref v) => v.fmt(f),
            Value::Enum(v) => f.write_str(v),
            Value::Msg(ref m) => m.fmt(f),
            Value::List(ref vs) => vs.fmt(f),
        }
    }
}

impl<'a> fmt::Debug for MsgVal<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{} {{", self.name)?;
        let mut first = true;
        for (i, slot) in self.fields.iter().enumerate() {
            if let Some(value) = slot {
                if first {
                    first = false;
                } else {
                    write!(f, ", ")?;
                }
                write!(f, "#{}: {:?}", i + 1, value)?;
            }
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{FieldDef, FieldType, Occurrence, ScalarType};

    fn probe_def() -> MsgDef {
        MsgDef::new(
            "Probe",
            vec![
                FieldDef::new("id", 1, 1, FieldType::Scalar(ScalarType::Int32), Occurrence::Required),
                FieldDef::new("tags", 2, 2, FieldType::Scalar(ScalarType::String), Occurrence::Repeated),
            ],
        )
    }

    #[test]
    fn slots() {
        let def = probe_def();
        let mut msg = MsgVal::new(&def);
        assert_eq!(msg.get(1), None);

        msg.set(1, Value::Int32(7));
        assert_eq!(msg.get(1), Some(&Value::Int32(7)));

        msg.set_by_name(&def, "tags", Value::List(vec![Value::str("a")]));
        assert_eq!(msg.get_by_name(&def, "tags").map(|v| v.as_list().len()), Some(1));

        msg.clear(1);
        assert_eq!(msg.get(1), None);
    }

    #[test]
    fn integer_coercion() {
        assert_eq!(Value::Int32(-5).as_integer(), Some(-5));
        assert_eq!(Value::Uint64(u64::MAX).as_integer(), Some(u64::MAX as i128));
        assert_eq!(Value::Double(1.5).as_integer(), None);
        assert_eq!(Value::Int32(3).as_numeric(), Some(3.0));
        assert_eq!(Value::Float(0.5).as_numeric(), Some(0.5));
        assert_eq!(Value::Bool(true).as_numeric(), None);
    }

    #[test]
    fn debug_rendering() {
        let def = probe_def();
        let mut msg = MsgVal::new(&def);
        msg.set(1, Value::Int32(150));
        msg.set(2, Value::List(vec![Value::str("a"), Value::str("b")]));
        assert_eq!(format!("{:?}", msg), "Probe {#1: 150, #2: [\"a\", \"b\"]}");
    }
}
