//! Lowering: normalized definitions to runtime schema tables.
//!
//! The ordered [`Def`] sequence is turned into a [`MsgDefs`] value:
//! message and enum references become table indices and the per-field
//! lookup maps are built. The encode, decode, merge, and verify engines
//! all dispatch on the result. A reference that fails to map here is an
//! internal error, since the verification pass already vouched for it.

use std::collections::HashMap;

use protopod_schema::defs::{EnumDef, FieldDef, FieldType, MsgDef, MsgDefs};

use crate::error::CompileError;
use crate::types::{Def, TypeRef};

pub fn lower(defs: &[Def]) -> Result<MsgDefs, CompileError> {
    let mut msg_index: HashMap<&str, usize> = HashMap::new();
    let mut enum_index: HashMap<&str, usize> = HashMap::new();
    for def in defs {
        match def {
            Def::Msg(m) => {
                let next = msg_index.len();
                msg_index.insert(&m.name, next);
            }
            Def::Enum(e) => {
                let next = enum_index.len();
                enum_index.insert(&e.name, next);
            }
        }
    }

    let mut msgs = Vec::new();
    let mut enums = Vec::new();
    for def in defs {
        match def {
            Def::Enum(e) => enums.push(EnumDef::new(e.name.clone(), e.symbols.clone())),
            Def::Msg(m) => {
                let mut fields = Vec::with_capacity(m.fields.len());
                for field in &m.fields {
                    let typ = match &field.typ {
                        TypeRef::Scalar(s) => FieldType::Scalar(*s),
                        TypeRef::Msg(name) => {
                            FieldType::Msg(lookup(&msg_index, name, "lower")?)
                        }
                        TypeRef::Enum(name) => {
                            FieldType::Enum(lookup(&enum_index, name, "lower")?)
                        }
                    };
                    let mut lowered =
                        FieldDef::new(field.name.clone(), field.fnum, field.rnum, typ, field.occurrence);
                    if field.packed {
                        lowered = lowered.packed();
                    }
                    if let Some(default) = &field.default {
                        lowered = lowered.with_default(default.clone());
                    }
                    fields.push(lowered);
                }
                msgs.push(MsgDef::new(m.name.clone(), fields));
            }
        }
    }
    Ok(MsgDefs::new(msgs, enums))
}

fn lookup(
    index: &HashMap<&str, usize>,
    name: &str,
    stage: &'static str,
) -> Result<usize, CompileError> {
    index.get(name).copied().ok_or_else(|| CompileError::Internal {
        stage,
        detail: format!("unmapped type reference {:?}", name),
    })
}
