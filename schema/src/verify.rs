//! The verifier engine: a recursive typed walk over a message value.
//!
//! The first violation stops the walk and is reported with the dotted
//! field path from the root, so `points[2].x` means the `x` field of the
//! third element of the repeated `points` field.

use crate::defs::{FieldDef, FieldType, MsgDef, MsgDefs, Occurrence, ScalarType};
use crate::error::{VerifyError, VerifyReason};
use crate::value::{MsgVal, Value};

/// Checks `msg` against its message type in `defs`.
pub fn verify_msg(defs: &MsgDefs, msg: &MsgVal<'_>) -> Result<(), VerifyError> {
    let Some(def) = defs.msg(msg.name) else {
        return Err(VerifyError {
            reason: VerifyReason::WrongMsg,
            value: msg.name.to_string(),
            path: String::new(),
        });
    };
    verify_fields(defs, def, msg, &mut Vec::new())
}

fn verify_fields(
    defs: &MsgDefs,
    def: &MsgDef,
    msg: &MsgVal<'_>,
    path: &mut Vec<String>,
) -> Result<(), VerifyError> {
    for field in &def.fields {
        let slot = msg.fields.get(field.rnum - 1).and_then(|v| v.as_ref());
        match (field.occurrence, slot) {
            (Occurrence::Required, None) => {
                path.push(field.name.clone());
                return Err(fail(VerifyReason::MissingRequired, "absent", path));
            }
            (Occurrence::Required, Some(value)) | (Occurrence::Optional, Some(value)) => {
                path.push(field.name.clone());
                verify_value(defs, field, value, path)?;
                path.pop();
            }
            (Occurrence::Optional, None) | (Occurrence::Repeated, None) => {}
            (Occurrence::Repeated, Some(value)) => {
                let Value::List(items) = value else {
                    path.push(field.name.clone());
                    return Err(fail_value(VerifyReason::NotAList, value, path));
                };
                for (i, item) in items.iter().enumerate() {
                    path.push(format!("{}[{}]", field.name, i));
                    verify_value(defs, field, item, path)?;
                    path.pop();
                }
            }
        }
    }
    Ok(())
}

fn verify_value(
    defs: &MsgDefs,
    field: &FieldDef,
    value: &Value<'_>,
    path: &mut Vec<String>,
) -> Result<(), VerifyError> {
    match field.typ {
        FieldType::Scalar(s) => verify_scalar(s, value, path),
        FieldType::Enum(ei) => match value {
            Value::Enum(sym) if defs.enum_at(ei).number_of(sym).is_some() => Ok(()),
            _ => Err(fail_value(VerifyReason::BadEnumSymbol, value, path)),
        },
        FieldType::Msg(mi) => {
            let Value::Msg(sub) = value else {
                return Err(fail_value(VerifyReason::NotAMsg, value, path));
            };
            let sub_def = defs.msg_at(mi);
            if sub.name != sub_def.name {
                return Err(fail_value(VerifyReason::WrongMsg, value, path));
            }
            verify_fields(defs, sub_def, sub, path)
        }
    }
}

fn verify_scalar(s: ScalarType, value: &Value<'_>, path: &[String]) -> Result<(), VerifyError> {
    match s {
        ScalarType::Int32 | ScalarType::Sint32 | ScalarType::Sfixed32 => {
            verify_int(value, i32::MIN as i128, i32::MAX as i128, path)
        }
        ScalarType::Int64 | ScalarType::Sint64 | ScalarType::Sfixed64 => {
            verify_int(value, i64::MIN as i128, i64::MAX as i128, path)
        }
        ScalarType::Uint32 | ScalarType::Fixed32 => verify_int(value, 0, u32::MAX as i128, path),
        ScalarType::Uint64 | ScalarType::Fixed64 => verify_int(value, 0, u64::MAX as i128, path),
        ScalarType::Float | ScalarType::Double => match value.as_numeric() {
            Some(_) => Ok(()),
            None => Err(fail_value(VerifyReason::NotNumeric, value, path)),
        },
        ScalarType::Bool => match value {
            Value::Bool(_) => Ok(()),
            _ => Err(fail_value(VerifyReason::NotBool, value, path)),
        },
        ScalarType::String => match value {
            Value::Str(_) => Ok(()),
            _ => Err(fail_value(VerifyReason::NotString, value, path)),
        },
        ScalarType::Bytes => match value {
            Value::Bytes(_) => Ok(()),
            _ => Err(fail_value(VerifyReason::NotBytes, value, path)),
        },
    }
}

fn verify_int(value: &Value<'_>, min: i128, max: i128, path: &[String]) -> Result<(), VerifyError> {
    match value.as_integer() {
        Some(v) if v >= min && v <= max => Ok(()),
        Some(_) => Err(fail_value(VerifyReason::IntOutOfRange, value, path)),
        None => Err(fail_value(VerifyReason::NotAnInteger, value, path)),
    }
}

fn fail(reason: VerifyReason, value: &str, path: &[String]) -> VerifyError {
    VerifyError {
        reason,
        value: value.to_string(),
        path: path.join("."),
    }
}

fn fail_value(reason: VerifyReason, value: &Value<'_>, path: &[String]) -> VerifyError {
    fail(reason, &format!("{:?}", value), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{EnumDef, FieldDef, MsgDefs};

    fn defs() -> MsgDefs {
        MsgDefs::new(
            vec![
                MsgDef::new(
                    "Point",
                    vec![
                        FieldDef::new("x", 1, 1, FieldType::Scalar(ScalarType::Int32), Occurrence::Required),
                        FieldDef::new("y", 2, 2, FieldType::Scalar(ScalarType::Int32), Occurrence::Required),
                    ],
                ),
                MsgDef::new(
                    "Shape",
                    vec![
                        FieldDef::new("name", 1, 1, FieldType::Scalar(ScalarType::String), Occurrence::Optional),
                        FieldDef::new("points", 2, 2, FieldType::Msg(0), Occurrence::Repeated),
                        FieldDef::new("kind", 3, 3, FieldType::Enum(0), Occurrence::Optional),
                    ],
                ),
            ],
            vec![EnumDef::new("Kind", vec![("OPEN".to_string(), 0), ("CLOSED".to_string(), 1)])],
        )
    }

    #[test]
    fn valid_value_passes() {
        let defs = defs();
        let point_def = defs.msg("Point").unwrap();
        let shape_def = defs.msg("Shape").unwrap();

        let mut p = MsgVal::new(point_def);
        p.set(1, Value::Int32(1));
        p.set(2, Value::Int64(2)); // wider variant, in range

        let mut shape = MsgVal::new(shape_def);
        shape.set(1, Value::str("triangle"));
        shape.set(2, Value::List(vec![Value::Msg(p)]));
        shape.set(3, Value::Enum("OPEN"));

        assert_eq!(verify_msg(&defs, &shape), Ok(()));
    }

    #[test]
    fn missing_required_is_reported_with_path() {
        let defs = defs();
        let point_def = defs.msg("Point").unwrap();
        let shape_def = defs.msg("Shape").unwrap();

        let mut p = MsgVal::new(point_def);
        p.set(1, Value::Int32(1));

        let mut shape = MsgVal::new(shape_def);
        shape.set(2, Value::List(vec![Value::Msg(p)]));

        let err = verify_msg(&defs, &shape).unwrap_err();
        assert_eq!(err.reason, VerifyReason::MissingRequired);
        assert_eq!(err.path, "points[0].y");
    }

    #[test]
    fn out_of_range_integer_is_reported() {
        let defs = defs();
        let point_def = defs.msg("Point").unwrap();
        let shape_def = defs.msg("Shape").unwrap();

        let mut p = MsgVal::new(point_def);
        p.set(1, Value::Int64(1 << 40));
        p.set(2, Value::Int32(0));

        let mut shape = MsgVal::new(shape_def);
        shape.set(2, Value::List(vec![Value::Msg(p)]));

        let err = verify_msg(&defs, &shape).unwrap_err();
        assert_eq!(err.reason, VerifyReason::IntOutOfRange);
        assert_eq!(err.path, "points[0].x");
    }

    #[test]
    fn wrong_kinds_are_reported() {
        let defs = defs();
        let shape_def = defs.msg("Shape").unwrap();

        let mut shape = MsgVal::new(shape_def);
        shape.set(1, Value::Int32(5));
        let err = verify_msg(&defs, &shape).unwrap_err();
        assert_eq!(err.reason, VerifyReason::NotString);
        assert_eq!(err.path, "name");

        let mut shape = MsgVal::new(shape_def);
        shape.set(3, Value::Enum("MISSING"));
        let err = verify_msg(&defs, &shape).unwrap_err();
        assert_eq!(err.reason, VerifyReason::BadEnumSymbol);
        assert_eq!(err.path, "kind");

        // An unknown enum number carried as an integer fails the symbol check.
        let mut shape = MsgVal::new(shape_def);
        shape.set(3, Value::Int32(9));
        let err = verify_msg(&defs, &shape).unwrap_err();
        assert_eq!(err.reason, VerifyReason::BadEnumSymbol);
    }
}
