//! The merger engine: proto2 merge rules over in-memory values.
//!
//! For each field of two values of the same message type: an absent side
//! loses, a present scalar from `new` wins, sub-messages merge
//! recursively, and repeated fields concatenate `prev ++ new`.

use crate::defs::{FieldType, MsgDef, MsgDefs, Occurrence};
use crate::value::{MsgVal, Value};

/// Merges two values that share a message type. Passing values of
/// different message types is a caller error; the result is built against
/// `prev`'s type.
pub fn merge_msgs<'a>(defs: &'a MsgDefs, prev: &MsgVal<'a>, new: &MsgVal<'a>) -> MsgVal<'a> {
    debug_assert_eq!(prev.name, new.name, "merge_msgs across message types");
    match defs.msg(prev.name) {
        Some(def) => merge_with_def(defs, def, prev, new),
        None => new.clone(),
    }
}

pub(crate) fn merge_with_def<'a>(
    defs: &'a MsgDefs,
    def: &'a MsgDef,
    prev: &MsgVal<'a>,
    new: &MsgVal<'a>,
) -> MsgVal<'a> {
    let mut out = MsgVal::new(def);
    for field in &def.fields {
        let i = field.rnum - 1;
        let p = prev.fields.get(i).and_then(|v| v.as_ref());
        let n = new.fields.get(i).and_then(|v| v.as_ref());
        out.fields[i] = match (p, n) {
            (None, None) => None,
            (Some(v), None) | (None, Some(v)) => Some(v.clone()),
            (Some(pv), Some(nv)) => Some(merge_field(defs, field, pv, nv)),
        };
    }
    out
}

fn merge_field<'a>(
    defs: &'a MsgDefs,
    field: &'a crate::defs::FieldDef,
    prev: &Value<'a>,
    new: &Value<'a>,
) -> Value<'a> {
    if field.occurrence == Occurrence::Repeated {
        let mut items = prev.as_list().to_vec();
        items.extend_from_slice(new.as_list());
        return Value::List(items);
    }
    if let FieldType::Msg(mi) = field.typ {
        if let (Value::Msg(pm), Value::Msg(nm)) = (prev, new) {
            return Value::Msg(merge_with_def(defs, defs.msg_at(mi), pm, nm));
        }
    }
    new.clone()
}
