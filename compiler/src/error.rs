use thiserror::Error;

/// Pipeline-level failures. Every stage returns its failure upward
/// unchanged; nothing is caught or retried inside the pipeline.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("import not found: {0:?}")]
    ImportNotFound(String),

    #[error("scan error in {file}: {detail}")]
    ScanError { file: String, detail: String },

    #[error("parse error in {file}: {detail}")]
    ParseError { file: String, detail: String },

    #[error("{}", render_problems(.0))]
    VerifyDefsFailed(Vec<DefsProblem>),

    /// A failure in a generation stage after the schema passed
    /// verification. These indicate a bug, not bad input.
    #[error("internal error in {stage}: {detail}")]
    Internal {
        stage: &'static str,
        detail: String,
    },
}

fn render_problems(problems: &[DefsProblem]) -> String {
    let mut out = String::from("schema verification failed:");
    for p in problems {
        out.push_str("\n  - ");
        out.push_str(&p.to_string());
    }
    out
}

/// One invariant violation found while verifying a normalized schema.
/// All violations are collected before the pipeline gives up.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DefsProblem {
    #[error("type {0:?} is defined twice")]
    DuplicateType(String),

    #[error("invalid name {0:?}")]
    BadName(String),

    #[error("{msg}: field {field:?} is declared twice")]
    DuplicateFieldName { msg: String, field: String },

    #[error("{msg}: field number {fnum} is used twice")]
    DuplicateFnum { msg: String, fnum: u32 },

    #[error("{msg}.{field}: field number must be positive and at most {max}")]
    BadFnum { msg: String, field: String, max: u32 },

    #[error("{msg}.{field}: reference to undefined type {reference:?}")]
    UnresolvedRef {
        msg: String,
        field: String,
        reference: String,
    },

    #[error("extend target {0:?} is not a defined message")]
    UnknownExtendTarget(String),

    #[error("{msg}.{field}: [packed] is only admissible on repeated numeric fields")]
    BadPacked { msg: String, field: String },

    #[error("{msg}.{field}: bad default value: {detail}")]
    BadDefault {
        msg: String,
        field: String,
        detail: String,
    },

    #[error("enum {enum_name}: symbol {sym:?} is declared twice")]
    DuplicateEnumSymbol { enum_name: String, sym: String },

    #[error("enum {0} has no symbols")]
    EmptyEnum(String),
}
