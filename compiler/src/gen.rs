//! Source emission: rendering a compiled schema as Rust text.
//!
//! Two files are produced per compilation. The codec file embeds the
//! schema tables and exports `encode_msg` / `decode_msg` / `merge_msgs` /
//! `verify_msg` / `get_msg_defs` wrappers with the negotiated verify mode
//! and bytes policy baked in. The types file is the header: enum
//! definitions always, typed message structs when type annotations are
//! enabled. Rendering is deterministic: the same schema and features
//! produce byte-identical output.

use protopod_schema::decode::BytesPolicy;
use protopod_schema::defs::{
    DefaultVal, EnumDef, FieldDef, FieldType, MsgDef, MsgDefs, Occurrence, ScalarType,
};

use crate::features::{Features, VerifyMode};
use crate::utils::quote;

/// Converts a single name segment to PascalCase. Underscore-separated and
/// fully uppercase names are folded word by word; mixed-case names keep
/// their interior casing.
fn to_pascal_case(s: &str) -> String {
    if s.contains('_') {
        s.split('_')
            .filter(|word| !word.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    None => String::new(),
                    Some(first) => {
                        first.to_uppercase().to_string() + &chars.as_str().to_lowercase()
                    }
                }
            })
            .collect()
    } else {
        let mut chars = s.chars();
        match chars.next() {
            None => String::new(),
            Some(first) if s == s.to_uppercase() => {
                first.to_uppercase().to_string() + &chars.as_str().to_lowercase()
            }
            Some(first) => first.to_uppercase().to_string() + chars.as_str(),
        }
    }
}

/// Converts a string to snake_case, keeping acronyms intact so that
/// "sessionID" becomes "session_id".
fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut snake = String::new();
    for i in 0..chars.len() {
        let c = chars[i];
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                if !prev.is_uppercase() || (i + 1 < chars.len() && chars[i + 1].is_lowercase()) {
                    snake.push('_');
                }
            }
            snake.extend(c.to_lowercase());
        } else {
            snake.push(c);
        }
    }
    snake
}

/// Escapes Rust reserved keywords by suffixing with an underscore.
fn escape_rust_keyword(s: &str) -> String {
    const KEYWORDS: [&str; 35] = [
        "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn",
        "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref",
        "return", "self", "Self", "static", "struct", "super", "trait", "true", "type", "unsafe",
        "use", "where", "while",
    ];
    if KEYWORDS.contains(&s) {
        format!("{}_", s)
    } else {
        s.to_string()
    }
}

/// A qualified name like `pkg.Outer.Inner` as a flat Rust type name.
fn rust_type_name(qualified: &str) -> String {
    qualified.split('.').map(to_pascal_case).collect()
}

fn rust_field_name(name: &str) -> String {
    escape_rust_keyword(&to_snake_case(name))
}

/// Renders the codec module source.
pub fn render_codec(module: &str, defs: &MsgDefs, features: &Features) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("// @generated by protopod from {}. Do not edit.", module));
    lines.push(String::new());
    lines.push("use lazy_static::lazy_static;".to_string());
    lines.push(String::new());
    lines.push("use protopod_schema::decode::BytesPolicy;".to_string());

    let any_default = defs
        .msgs
        .iter()
        .any(|m| m.fields.iter().any(|f| f.default.is_some()));
    let mut defs_imports = vec!["FieldDef", "FieldType", "MsgDef", "MsgDefs", "Occurrence", "ScalarType"];
    if any_default {
        defs_imports.insert(0, "DefaultVal");
    }
    if !defs.enums.is_empty() {
        defs_imports.insert(0, "EnumDef");
    }
    defs_imports.sort_unstable();
    lines.push(format!(
        "use protopod_schema::defs::{{{}}};",
        defs_imports.join(", ")
    ));
    lines.push("use protopod_schema::error::{DecodeError, EncodeError, VerifyError};".to_string());
    lines.push("use protopod_schema::value::MsgVal;".to_string());
    lines.push("use protopod_schema::{decode, encode, merge, verify};".to_string());
    lines.push(String::new());
    lines.push("lazy_static! {".to_string());
    lines.push("    static ref DEFS: MsgDefs = build_defs();".to_string());
    lines.push("}".to_string());
    lines.push(String::new());

    lines.push("fn build_defs() -> MsgDefs {".to_string());
    lines.push("    MsgDefs::new(".to_string());
    lines.push("        vec![".to_string());
    for msg in &defs.msgs {
        render_msg_def(msg, &mut lines);
    }
    lines.push("        ],".to_string());
    lines.push("        vec![".to_string());
    for e in &defs.enums {
        render_enum_def(e, &mut lines);
    }
    lines.push("        ],".to_string());
    lines.push("    )".to_string());
    lines.push("}".to_string());
    lines.push(String::new());

    lines.push("/// The compiled schema behind this module.".to_string());
    lines.push("pub fn get_msg_defs() -> &'static MsgDefs {".to_string());
    lines.push("    &DEFS".to_string());
    lines.push("}".to_string());
    lines.push(String::new());

    match features.verify {
        VerifyMode::Always => {
            lines.push("pub fn encode_msg(msg: &MsgVal<'_>) -> Result<Vec<u8>, EncodeError> {".to_string());
            lines.push("    verify::verify_msg(&DEFS, msg)?;".to_string());
            lines.push("    encode::encode_msg(&DEFS, msg)".to_string());
            lines.push("}".to_string());
        }
        VerifyMode::Never => {
            lines.push("pub fn encode_msg(msg: &MsgVal<'_>) -> Result<Vec<u8>, EncodeError> {".to_string());
            lines.push("    encode::encode_msg(&DEFS, msg)".to_string());
            lines.push("}".to_string());
        }
        VerifyMode::Optionally => {
            lines.push("pub fn encode_msg(msg: &MsgVal<'_>) -> Result<Vec<u8>, EncodeError> {".to_string());
            lines.push("    encode_msg_opt(msg, false)".to_string());
            lines.push("}".to_string());
            lines.push(String::new());
            lines.push(
                "pub fn encode_msg_opt(msg: &MsgVal<'_>, do_verify: bool) -> Result<Vec<u8>, EncodeError> {"
                    .to_string(),
            );
            lines.push("    if do_verify {".to_string());
            lines.push("        verify::verify_msg(&DEFS, msg)?;".to_string());
            lines.push("    }".to_string());
            lines.push("    encode::encode_msg(&DEFS, msg)".to_string());
            lines.push("}".to_string());
        }
    }
    lines.push(String::new());

    let policy = match features.bytes_policy {
        BytesPolicy::Never => "BytesPolicy::Never".to_string(),
        BytesPolicy::Always => "BytesPolicy::Always".to_string(),
        BytesPolicy::Threshold(t) => format!("BytesPolicy::Threshold({})", t),
    };
    lines.push(
        "pub fn decode_msg<'a>(bytes: &'a [u8], msg_name: &str) -> Result<MsgVal<'a>, DecodeError> {"
            .to_string(),
    );
    lines.push(format!(
        "    decode::decode_msg_with(&DEFS, msg_name, bytes, {})",
        policy
    ));
    lines.push("}".to_string());
    lines.push(String::new());

    lines.push("pub fn merge_msgs<'a>(prev: &MsgVal<'a>, new: &MsgVal<'a>) -> MsgVal<'a> {".to_string());
    lines.push("    merge::merge_msgs(&DEFS, prev, new)".to_string());
    lines.push("}".to_string());
    lines.push(String::new());

    lines.push("pub fn verify_msg(msg: &MsgVal<'_>) -> Result<(), VerifyError> {".to_string());
    lines.push("    verify::verify_msg(&DEFS, msg)".to_string());
    lines.push("}".to_string());
    lines.push(String::new());

    lines.join("\n")
}

fn render_msg_def(msg: &MsgDef, lines: &mut Vec<String>) {
    lines.push("            MsgDef::new(".to_string());
    lines.push(format!("                {},", quote(&msg.name)));
    lines.push("                vec![".to_string());
    for field in &msg.fields {
        lines.push(format!("                    {},", render_field_def(field)));
    }
    lines.push("                ],".to_string());
    lines.push("            ),".to_string());
}

fn render_field_def(field: &FieldDef) -> String {
    let typ = match field.typ {
        FieldType::Scalar(s) => format!("FieldType::Scalar(ScalarType::{:?})", s),
        FieldType::Enum(i) => format!("FieldType::Enum({})", i),
        FieldType::Msg(i) => format!("FieldType::Msg({})", i),
    };
    let mut text = format!(
        "FieldDef::new({}, {}, {}, {}, Occurrence::{:?})",
        quote(&field.name),
        field.fnum,
        field.rnum,
        typ,
        field.occurrence
    );
    if field.packed {
        text.push_str(".packed()");
    }
    if let Some(default) = &field.default {
        text.push_str(&format!(".with_default({})", render_default(default)));
    }
    text
}

fn render_default(default: &DefaultVal) -> String {
    match default {
        DefaultVal::Int(v) => format!("DefaultVal::Int({})", v),
        DefaultVal::Uint(v) => format!("DefaultVal::Uint({})", v),
        DefaultVal::Float(v) => format!("DefaultVal::Float({:?})", v),
        DefaultVal::Bool(v) => format!("DefaultVal::Bool({})", v),
        DefaultVal::Str(v) => format!("DefaultVal::Str({}.to_string())", quote(v)),
        DefaultVal::Bytes(v) => {
            let items: Vec<String> = v.iter().map(|b| b.to_string()).collect();
            format!("DefaultVal::Bytes(vec![{}])", items.join(", "))
        }
        DefaultVal::Enum(v) => format!("DefaultVal::Enum({}.to_string())", quote(v)),
    }
}

fn render_enum_def(e: &EnumDef, lines: &mut Vec<String>) {
    let symbols: Vec<String> = e
        .symbols
        .iter()
        .map(|(sym, num)| format!("({}.to_string(), {})", quote(sym), num))
        .collect();
    lines.push(format!(
        "            EnumDef::new({}, vec![{}]),",
        quote(&e.name),
        symbols.join(", ")
    ));
}

/// Renders the types file: enums always, message structs only when type
/// annotations are enabled.
pub fn render_types(module: &str, defs: &MsgDefs, features: &Features) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("// @generated by protopod from {}. Do not edit.", module));
    lines.push(String::new());

    for e in &defs.enums {
        let type_name = rust_type_name(&e.name);
        lines.push(format!("/// Symbols of `{}`.", e.name));
        lines.push("#[derive(Debug, Clone, Copy, PartialEq, Eq)]".to_string());
        lines.push(format!("pub enum {} {{", type_name));
        for (sym, _) in &e.symbols {
            lines.push(format!("    {},", escape_rust_keyword(&to_pascal_case(sym))));
        }
        lines.push("}".to_string());
        lines.push(String::new());

        lines.push(format!("impl {} {{", type_name));
        lines.push("    /// The wire number of this symbol.".to_string());
        lines.push("    pub fn number(self) -> i32 {".to_string());
        lines.push("        match self {".to_string());
        for (sym, num) in &e.symbols {
            lines.push(format!(
                "            {}::{} => {},",
                type_name,
                escape_rust_keyword(&to_pascal_case(sym)),
                num
            ));
        }
        lines.push("        }".to_string());
        lines.push("    }".to_string());
        lines.push("}".to_string());
        lines.push(String::new());

        // proto2's implicit default is the first declared symbol.
        if let Some((first, _)) = e.symbols.first() {
            lines.push(format!("impl Default for {} {{", type_name));
            lines.push("    fn default() -> Self {".to_string());
            lines.push(format!(
                "        {}::{}",
                type_name,
                escape_rust_keyword(&to_pascal_case(first))
            ));
            lines.push("    }".to_string());
            lines.push("}".to_string());
            lines.push(String::new());
        }
    }

    if features.type_specs {
        for msg in &defs.msgs {
            lines.push(format!("/// Typed shape of `{}`.", msg.name));
            lines.push("#[derive(Debug, Clone, PartialEq, Default)]".to_string());
            lines.push(format!("pub struct {} {{", rust_type_name(&msg.name)));
            for field in &msg.fields {
                lines.push(format!(
                    "    pub {}: {},",
                    rust_field_name(&field.name),
                    rust_field_type(field, defs)
                ));
            }
            lines.push("}".to_string());
            lines.push(String::new());
        }
    }

    lines.join("\n")
}

fn rust_field_type(field: &FieldDef, defs: &MsgDefs) -> String {
    let elem = match field.typ {
        FieldType::Scalar(s) => rust_scalar_type(s).to_string(),
        FieldType::Enum(i) => rust_type_name(&defs.enum_at(i).name),
        FieldType::Msg(i) => rust_type_name(&defs.msg_at(i).name),
    };
    match field.occurrence {
        Occurrence::Required => elem,
        Occurrence::Optional => format!("Option<{}>", elem),
        Occurrence::Repeated => format!("Vec<{}>", elem),
    }
}

fn rust_scalar_type(s: ScalarType) -> &'static str {
    match s {
        ScalarType::Sint32 | ScalarType::Int32 | ScalarType::Sfixed32 => "i32",
        ScalarType::Sint64 | ScalarType::Int64 | ScalarType::Sfixed64 => "i64",
        ScalarType::Uint32 | ScalarType::Fixed32 => "u32",
        ScalarType::Uint64 | ScalarType::Fixed64 => "u64",
        ScalarType::Bool => "bool",
        ScalarType::Float => "f32",
        ScalarType::Double => "f64",
        ScalarType::String => "String",
        ScalarType::Bytes => "Vec<u8>",
    }
}
