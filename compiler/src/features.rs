//! Feature negotiation: the generation-time decisions that shape the
//! emitted codec.

use serde::Serialize;
use tracing::warn;

use protopod_schema::decode::BytesPolicy;

use crate::opts::CompileOpts;

/// When generated encoding verifies the value first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyMode {
    /// Every encode verifies first.
    Always,
    /// Encode accepts a per-call switch.
    Optionally,
    /// Encode never verifies. `verify_msg` itself stays exported and
    /// active when called directly.
    Never,
}

/// The caller-facing `copy_bytes` option, resolved to a [`BytesPolicy`]
/// during negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyBytes {
    Never,
    Always,
    /// Copy when the runtime supports a cheap sub-buffer copy. Ours does,
    /// so this resolves to `Always`.
    Auto,
    /// Copy only when the input buffer is at least this many times the
    /// length of the decoded slice.
    Threshold(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Features {
    /// Emit typed message structs in the generated types file. Forced off
    /// when the message graph is cyclic, since a cycle cannot be expressed
    /// structurally without indirection.
    pub type_specs: bool,
    pub bytes_policy: BytesPolicy,
    pub verify: VerifyMode,
}

/// Decides the features for one compilation. Returns the negotiated set
/// and any warnings to surface to the caller.
pub fn negotiate(opts: &CompileOpts, cyclic: bool) -> (Features, Vec<String>) {
    let mut warnings = Vec::new();

    let type_specs = if opts.type_specs && cyclic {
        let text = "type annotations disabled: the message graph is cyclic".to_string();
        warn!("{}", text);
        warnings.push(text);
        false
    } else {
        opts.type_specs
    };

    let bytes_policy = match opts.copy_bytes {
        CopyBytes::Never => BytesPolicy::Never,
        CopyBytes::Always | CopyBytes::Auto => BytesPolicy::Always,
        CopyBytes::Threshold(t) => BytesPolicy::Threshold(t),
    };

    let features = Features {
        type_specs,
        bytes_policy,
        verify: opts.verify,
    };
    (features, warnings)
}
