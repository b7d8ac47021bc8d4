//! Schema normalization.
//!
//! Turns the raw parsed item list into flat, verified definitions, in
//! this order: absolutify names against the current package/message
//! scope, flatten nested definitions to top level, resolve type
//! references, apply `extend` blocks, assign dense `rnum` ordinals, and
//! canonicalize field options. A final verification pass collects every
//! invariant violation before the pipeline gives up.

use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use regex::Regex;

use protopod_schema::defs::{DefaultVal, Occurrence, ScalarType};
use protopod_schema::wire::MAX_FNUM;

use crate::error::{CompileError, DefsProblem};
use crate::types::{
    Def, EnumNorm, FieldNorm, MsgNorm, RawExtend, RawField, RawItem, RawLit, RawMsg, RawOpt,
    RawType, TypeRef,
};

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RefKind {
    Msg,
    Enum,
}

/// Normalizes and verifies a raw item list.
pub fn normalize(items: &[RawItem]) -> Result<Vec<Def>, CompileError> {
    let mut problems = Vec::new();

    // Absolute name and kind of every definition, for reference
    // resolution. The first definition wins on duplicates; the
    // verification pass reports them.
    let mut kinds: HashMap<String, RefKind> = HashMap::new();
    collect_kinds(items, &mut Vec::new(), &mut kinds);

    let mut defs: Vec<Def> = Vec::new();
    let mut extends: Vec<(Vec<String>, RawExtend)> = Vec::new();
    let mut scope: Vec<String> = Vec::new();
    for item in items {
        match item {
            RawItem::Package(pkg) => {
                scope = pkg.split('.').map(str::to_string).collect();
            }
            RawItem::Import(_) => {} // consumed by the import resolver
            RawItem::Enum(e) => {
                defs.push(Def::Enum(EnumNorm {
                    name: qualify(&scope, &e.name),
                    symbols: e.symbols.clone(),
                }));
            }
            RawItem::Msg(m) => flatten_msg(m, &scope, &kinds, &mut defs, &mut extends, &mut problems),
            RawItem::Extend(x) => extends.push((scope.clone(), x.clone())),
        }
    }

    apply_extends(&extends, &kinds, &mut defs, &mut problems);

    for def in &mut defs {
        if let Def::Msg(m) = def {
            for (i, field) in m.fields.iter_mut().enumerate() {
                field.rnum = i + 1;
            }
        }
    }

    problems.extend(verify_defs(&defs));
    if problems.is_empty() {
        Ok(defs)
    } else {
        Err(CompileError::VerifyDefsFailed(problems))
    }
}

fn collect_kinds(items: &[RawItem], scope: &mut Vec<String>, kinds: &mut HashMap<String, RefKind>) {
    for item in items {
        match item {
            RawItem::Package(pkg) => {
                *scope = pkg.split('.').map(str::to_string).collect();
            }
            RawItem::Enum(e) => {
                kinds.entry(qualify(scope, &e.name)).or_insert(RefKind::Enum);
            }
            RawItem::Msg(m) => {
                kinds.entry(qualify(scope, &m.name)).or_insert(RefKind::Msg);
                scope.push(m.name.clone());
                collect_kinds(&m.nested, scope, kinds);
                scope.pop();
            }
            RawItem::Import(_) | RawItem::Extend(_) => {}
        }
    }
}

fn flatten_msg(
    msg: &RawMsg,
    scope: &[String],
    kinds: &HashMap<String, RefKind>,
    defs: &mut Vec<Def>,
    extends: &mut Vec<(Vec<String>, RawExtend)>,
    problems: &mut Vec<DefsProblem>,
) {
    let name = qualify(scope, &msg.name);
    let mut inner_scope: Vec<String> = scope.to_vec();
    inner_scope.push(msg.name.clone());

    let fields = msg
        .fields
        .iter()
        .map(|f| convert_field(f, &inner_scope, kinds, &name, problems))
        .collect();
    defs.push(Def::Msg(MsgNorm { name, fields }));

    for item in &msg.nested {
        match item {
            RawItem::Enum(e) => {
                defs.push(Def::Enum(EnumNorm {
                    name: qualify(&inner_scope, &e.name),
                    symbols: e.symbols.clone(),
                }));
            }
            RawItem::Msg(m) => flatten_msg(m, &inner_scope, kinds, defs, extends, problems),
            RawItem::Extend(x) => extends.push((inner_scope.clone(), x.clone())),
            RawItem::Package(_) | RawItem::Import(_) => {}
        }
    }
}

fn apply_extends(
    extends: &[(Vec<String>, RawExtend)],
    kinds: &HashMap<String, RefKind>,
    defs: &mut [Def],
    problems: &mut Vec<DefsProblem>,
) {
    for (scope, ext) in extends {
        let target = match resolve_name(&ext.msg, scope, kinds) {
            Some((name, RefKind::Msg)) => name,
            _ => {
                problems.push(DefsProblem::UnknownExtendTarget(ext.msg.clone()));
                continue;
            }
        };
        let fields: Vec<FieldNorm> = ext
            .fields
            .iter()
            .map(|f| convert_field(f, scope, kinds, &target, problems))
            .collect();
        let target_msg = defs.iter_mut().find_map(|def| match def {
            Def::Msg(m) if m.name == target => Some(m),
            _ => None,
        });
        if let Some(m) = target_msg {
            m.fields.extend(fields);
        }
    }
}

fn convert_field(
    field: &RawField,
    scope: &[String],
    kinds: &HashMap<String, RefKind>,
    msg_name: &str,
    problems: &mut Vec<DefsProblem>,
) -> FieldNorm {
    let typ = match &field.typ {
        RawType::Scalar(s) => TypeRef::Scalar(*s),
        RawType::Named(name) => match resolve_name(name, scope, kinds) {
            Some((abs, RefKind::Msg)) => TypeRef::Msg(abs),
            Some((abs, RefKind::Enum)) => TypeRef::Enum(abs),
            // Left as written; the verification pass reports it.
            None => TypeRef::Msg(name.clone()),
        },
    };

    let packed = field.opts.iter().any(|o| matches!(o, RawOpt::Packed));
    let default_lit = field.opts.iter().rev().find_map(|o| match o {
        RawOpt::Default(lit) => Some(lit),
        _ => None,
    });
    let default = default_lit.and_then(|lit| match canonical_default(&typ, lit) {
        Ok(d) => Some(d),
        Err(detail) => {
            problems.push(DefsProblem::BadDefault {
                msg: msg_name.to_string(),
                field: field.name.clone(),
                detail,
            });
            None
        }
    });

    FieldNorm {
        name: field.name.clone(),
        fnum: field.fnum,
        rnum: 0, // assigned once extension fields are in place
        typ,
        occurrence: field.occurrence,
        packed,
        default,
    }
}

fn qualify(scope: &[String], name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", scope.join("."), name)
    }
}

/// Resolves a type reference from the innermost scope outward. A leading
/// dot roots the name absolutely.
fn resolve_name(
    name: &str,
    scope: &[String],
    kinds: &HashMap<String, RefKind>,
) -> Option<(String, RefKind)> {
    if let Some(rooted) = name.strip_prefix('.') {
        return kinds.get(rooted).map(|&k| (rooted.to_string(), k));
    }
    for depth in (0..=scope.len()).rev() {
        let candidate = qualify(&scope[..depth], name);
        if let Some(&kind) = kinds.get(&candidate) {
            return Some((candidate, kind));
        }
    }
    None
}

fn canonical_default(typ: &TypeRef, lit: &RawLit) -> Result<DefaultVal, String> {
    fn int_of(lit: &RawLit) -> Option<i128> {
        match *lit {
            RawLit::Int(v) => Some(v as i128),
            RawLit::Uint(v) => Some(v as i128),
            _ => None,
        }
    }

    fn ranged(lit: &RawLit, min: i128, max: i128) -> Result<i128, String> {
        match int_of(lit) {
            Some(v) if v >= min && v <= max => Ok(v),
            Some(_) => Err("integer out of range for the field type".to_string()),
            None => Err("expected an integer".to_string()),
        }
    }

    match typ {
        TypeRef::Scalar(s) => match s {
            ScalarType::Int32 | ScalarType::Sint32 | ScalarType::Sfixed32 => {
                ranged(lit, i32::MIN as i128, i32::MAX as i128).map(|v| DefaultVal::Int(v as i64))
            }
            ScalarType::Int64 | ScalarType::Sint64 | ScalarType::Sfixed64 => {
                ranged(lit, i64::MIN as i128, i64::MAX as i128).map(|v| DefaultVal::Int(v as i64))
            }
            ScalarType::Uint32 | ScalarType::Fixed32 => {
                ranged(lit, 0, u32::MAX as i128).map(|v| DefaultVal::Uint(v as u64))
            }
            ScalarType::Uint64 | ScalarType::Fixed64 => {
                ranged(lit, 0, u64::MAX as i128).map(|v| DefaultVal::Uint(v as u64))
            }
            ScalarType::Float | ScalarType::Double => match *lit {
                RawLit::Float(v) => Ok(DefaultVal::Float(v)),
                _ => int_of(lit)
                    .map(|v| DefaultVal::Float(v as f64))
                    .ok_or_else(|| "expected a number".to_string()),
            },
            ScalarType::Bool => match *lit {
                RawLit::Bool(v) => Ok(DefaultVal::Bool(v)),
                _ => Err("expected a boolean".to_string()),
            },
            ScalarType::String => match lit {
                RawLit::Str(v) => Ok(DefaultVal::Str(v.clone())),
                _ => Err("expected a string".to_string()),
            },
            ScalarType::Bytes => match lit {
                RawLit::Str(v) => Ok(DefaultVal::Bytes(v.clone().into_bytes())),
                _ => Err("expected a string".to_string()),
            },
        },
        TypeRef::Enum(_) => match lit {
            // Declaredness is checked by the verification pass.
            RawLit::Str(sym) => Ok(DefaultVal::Enum(sym.clone())),
            _ => Err("expected an enum symbol".to_string()),
        },
        TypeRef::Msg(_) => Err("message fields cannot have a default".to_string()),
    }
}

/// The validation pass over normalized definitions: rejects anything that
/// violates the schema invariants, reporting every violation found.
pub fn verify_defs(defs: &[Def]) -> Vec<DefsProblem> {
    let mut problems = Vec::new();

    let mut names = HashSet::new();
    let mut kinds: HashMap<&str, RefKind> = HashMap::new();
    for def in defs {
        if !names.insert(def.name()) {
            problems.push(DefsProblem::DuplicateType(def.name().to_string()));
        }
        check_qualified_name(def.name(), &mut problems);
        kinds.entry(def.name()).or_insert(match def {
            Def::Msg(_) => RefKind::Msg,
            Def::Enum(_) => RefKind::Enum,
        });
    }

    for def in defs {
        match def {
            Def::Enum(e) => verify_enum(e, &mut problems),
            Def::Msg(m) => verify_msg_def(m, &kinds, defs, &mut problems),
        }
    }
    problems
}

fn verify_enum(e: &EnumNorm, problems: &mut Vec<DefsProblem>) {
    if e.symbols.is_empty() {
        problems.push(DefsProblem::EmptyEnum(e.name.clone()));
    }
    let mut seen = HashSet::new();
    for (sym, _) in &e.symbols {
        if !IDENTIFIER.is_match(sym) {
            problems.push(DefsProblem::BadName(sym.clone()));
        }
        if !seen.insert(sym.as_str()) {
            problems.push(DefsProblem::DuplicateEnumSymbol {
                enum_name: e.name.clone(),
                sym: sym.clone(),
            });
        }
    }
}

fn verify_msg_def(
    m: &MsgNorm,
    kinds: &HashMap<&str, RefKind>,
    defs: &[Def],
    problems: &mut Vec<DefsProblem>,
) {
    let mut field_names = HashSet::new();
    let mut fnums = HashSet::new();
    for field in &m.fields {
        if !IDENTIFIER.is_match(&field.name) {
            problems.push(DefsProblem::BadName(field.name.clone()));
        }
        if !field_names.insert(field.name.as_str()) {
            problems.push(DefsProblem::DuplicateFieldName {
                msg: m.name.clone(),
                field: field.name.clone(),
            });
        }
        if !fnums.insert(field.fnum) {
            problems.push(DefsProblem::DuplicateFnum {
                msg: m.name.clone(),
                fnum: field.fnum,
            });
        }
        if field.fnum == 0 || field.fnum > MAX_FNUM {
            problems.push(DefsProblem::BadFnum {
                msg: m.name.clone(),
                field: field.name.clone(),
                max: MAX_FNUM,
            });
        }

        let (reference, expected) = match &field.typ {
            TypeRef::Scalar(_) => (None, RefKind::Msg),
            TypeRef::Msg(name) => (Some(name), RefKind::Msg),
            TypeRef::Enum(name) => (Some(name), RefKind::Enum),
        };
        if let Some(name) = reference {
            if kinds.get(name.as_str()) != Some(&expected) {
                problems.push(DefsProblem::UnresolvedRef {
                    msg: m.name.clone(),
                    field: field.name.clone(),
                    reference: name.clone(),
                });
            }
        }

        if field.packed && !packable(field) {
            problems.push(DefsProblem::BadPacked {
                msg: m.name.clone(),
                field: field.name.clone(),
            });
        }

        if let (TypeRef::Enum(enum_name), Some(DefaultVal::Enum(sym))) = (&field.typ, &field.default)
        {
            let declared = defs.iter().any(|d| match d {
                Def::Enum(e) => &e.name == enum_name && e.symbols.iter().any(|(s, _)| s == sym),
                Def::Msg(_) => false,
            });
            if !declared {
                problems.push(DefsProblem::BadDefault {
                    msg: m.name.clone(),
                    field: field.name.clone(),
                    detail: format!("{:?} is not a symbol of {}", sym, enum_name),
                });
            }
        }
    }
}

fn packable(field: &FieldNorm) -> bool {
    if field.occurrence != Occurrence::Repeated {
        return false;
    }
    match &field.typ {
        TypeRef::Scalar(s) => s.packable(),
        TypeRef::Enum(_) => true,
        TypeRef::Msg(_) => false,
    }
}

fn check_qualified_name(name: &str, problems: &mut Vec<DefsProblem>) {
    let ok = !name.is_empty() && name.split('.').all(|seg| IDENTIFIER.is_match(seg));
    if !ok {
        problems.push(DefsProblem::BadName(name.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawEnum;

    fn field(name: &str, fnum: u32, typ: RawType, occurrence: Occurrence) -> RawField {
        RawField {
            name: name.to_string(),
            fnum,
            typ,
            occurrence,
            opts: vec![],
        }
    }

    #[test]
    fn nested_defs_are_flattened_and_absolutified() {
        let items = vec![
            RawItem::Package("pkg".to_string()),
            RawItem::Msg(RawMsg {
                name: "Outer".to_string(),
                fields: vec![
                    field("inner", 1, RawType::Named("Inner".to_string()), Occurrence::Optional),
                    field("kind", 2, RawType::Named("Kind".to_string()), Occurrence::Optional),
                ],
                nested: vec![
                    RawItem::Msg(RawMsg {
                        name: "Inner".to_string(),
                        fields: vec![field("x", 1, RawType::Scalar(ScalarType::Int32), Occurrence::Optional)],
                        nested: vec![],
                    }),
                    RawItem::Enum(RawEnum {
                        name: "Kind".to_string(),
                        symbols: vec![("A".to_string(), 0)],
                    }),
                ],
            }),
        ];

        let defs = normalize(&items).unwrap();
        let names: Vec<&str> = defs.iter().map(|d| d.name()).collect();
        assert_eq!(names, ["pkg.Outer", "pkg.Outer.Inner", "pkg.Outer.Kind"]);

        let Def::Msg(outer) = &defs[0] else { panic!() };
        assert_eq!(outer.fields[0].typ, TypeRef::Msg("pkg.Outer.Inner".to_string()));
        assert_eq!(outer.fields[1].typ, TypeRef::Enum("pkg.Outer.Kind".to_string()));
    }

    #[test]
    fn rooted_references_skip_scope_resolution() {
        let items = vec![
            RawItem::Msg(RawMsg {
                name: "A".to_string(),
                fields: vec![field("b", 1, RawType::Named(".B".to_string()), Occurrence::Optional)],
                nested: vec![],
            }),
            RawItem::Msg(RawMsg {
                name: "B".to_string(),
                fields: vec![],
                nested: vec![],
            }),
        ];
        let defs = normalize(&items).unwrap();
        let Def::Msg(a) = &defs[0] else { panic!() };
        assert_eq!(a.fields[0].typ, TypeRef::Msg("B".to_string()));
    }

    #[test]
    fn extends_append_fields_and_rnums_stay_dense() {
        let items = vec![
            RawItem::Msg(RawMsg {
                name: "M".to_string(),
                fields: vec![field("a", 1, RawType::Scalar(ScalarType::Int32), Occurrence::Optional)],
                nested: vec![],
            }),
            RawItem::Extend(RawExtend {
                msg: "M".to_string(),
                fields: vec![field("ext", 100, RawType::Scalar(ScalarType::String), Occurrence::Optional)],
            }),
        ];
        let defs = normalize(&items).unwrap();
        let Def::Msg(m) = &defs[0] else { panic!() };
        assert_eq!(m.fields.len(), 2);
        assert_eq!(m.fields[1].name, "ext");
        assert_eq!(m.fields[0].rnum, 1);
        assert_eq!(m.fields[1].rnum, 2);
    }

    #[test]
    fn option_normalization() {
        let mut f = field("xs", 1, RawType::Scalar(ScalarType::Int32), Occurrence::Repeated);
        f.opts = vec![RawOpt::Packed, RawOpt::Packed];
        let mut g = field("y", 2, RawType::Scalar(ScalarType::Sint32), Occurrence::Optional);
        g.opts = vec![
            RawOpt::Default(RawLit::Int(1)),
            RawOpt::Default(RawLit::Int(-7)),
        ];
        let items = vec![RawItem::Msg(RawMsg {
            name: "M".to_string(),
            fields: vec![f, g],
            nested: vec![],
        })];
        let defs = normalize(&items).unwrap();
        let Def::Msg(m) = &defs[0] else { panic!() };
        assert!(m.fields[0].packed);
        assert_eq!(m.fields[1].default, Some(DefaultVal::Int(-7)));
    }

    #[test]
    fn invariant_violations_are_collected() {
        let items = vec![
            RawItem::Msg(RawMsg {
                name: "M".to_string(),
                fields: vec![
                    field("a", 1, RawType::Scalar(ScalarType::Int32), Occurrence::Optional),
                    field("a", 1, RawType::Named("Nowhere".to_string()), Occurrence::Optional),
                    {
                        let mut f = field("s", 2, RawType::Scalar(ScalarType::String), Occurrence::Repeated);
                        f.opts = vec![RawOpt::Packed];
                        f
                    },
                ],
                nested: vec![],
            }),
            RawItem::Msg(RawMsg {
                name: "M".to_string(),
                fields: vec![],
                nested: vec![],
            }),
        ];
        let Err(CompileError::VerifyDefsFailed(problems)) = normalize(&items) else {
            panic!("expected verification failure");
        };
        assert!(problems.iter().any(|p| matches!(p, DefsProblem::DuplicateType(n) if n == "M")));
        assert!(problems
            .iter()
            .any(|p| matches!(p, DefsProblem::DuplicateFieldName { field, .. } if field == "a")));
        assert!(problems
            .iter()
            .any(|p| matches!(p, DefsProblem::DuplicateFnum { fnum: 1, .. })));
        assert!(problems
            .iter()
            .any(|p| matches!(p, DefsProblem::UnresolvedRef { reference, .. } if reference == "Nowhere")));
        assert!(problems.iter().any(|p| matches!(p, DefsProblem::BadPacked { .. })));
    }

    #[test]
    fn bad_defaults_are_reported() {
        let mut f = field("x", 1, RawType::Scalar(ScalarType::Int32), Occurrence::Optional);
        f.opts = vec![RawOpt::Default(RawLit::Int(1 << 40))];
        let items = vec![RawItem::Msg(RawMsg {
            name: "M".to_string(),
            fields: vec![f],
            nested: vec![],
        })];
        let Err(CompileError::VerifyDefsFailed(problems)) = normalize(&items) else {
            panic!("expected verification failure");
        };
        assert!(problems.iter().any(|p| matches!(p, DefsProblem::BadDefault { .. })));
    }
}
