//! Source-level input contract consumed by the lowering pass (§3 "Source
//! entities").
//!
//! These types are the data an upstream parser hands the core: the core
//! never parses YAML itself (§1 Non-goals). Map-valued fields use
//! [`IndexMap`] because insertion order is a correctness requirement for
//! downstream declaration-order iteration (§6 "stable iteration order over
//! maps").

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use asdl_diagnostics::SourceSpan;

/// Opaque identifier for a parsed source file, assigned by the caller's
/// import graph (§6 "Import graph: mapping from file path → parsed AST").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub u32);

impl FileId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

/// A parsed source document: one file's worth of imports, modules, and
/// devices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub file_id: FileId,
    /// Import alias → target file, used to resolve qualified `alias.symbol`
    /// instance references.
    pub imports: IndexMap<String, FileId>,
    pub top: Option<String>,
    pub modules: IndexMap<String, ModuleDecl>,
    pub devices: IndexMap<String, DeviceDecl>,
    pub span: Option<SourceSpan>,
}

impl Document {
    pub fn new(file_id: FileId) -> Self {
        Self {
            file_id,
            imports: IndexMap::new(),
            top: None,
            modules: IndexMap::new(),
            devices: IndexMap::new(),
            span: None,
        }
    }
}

/// A named pattern definition usable via `<@name>` within the module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedPatternDecl {
    /// Group token string, e.g. `"<0|1>"`.
    pub expr: String,
    pub tag: Option<String>,
    pub span: Option<SourceSpan>,
}

/// One endpoint string within a net's endpoint list; a leading `!` marks it
/// suppressed for default-binding override semantics (§4.4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointRef {
    /// Endpoint pattern expression text, `!` stripped.
    pub expr: String,
    pub suppressed: bool,
    pub span: Option<SourceSpan>,
}

impl EndpointRef {
    /// Parse the raw authored token, stripping a leading `!`.
    pub fn from_raw(raw: &str, span: Option<SourceSpan>) -> Self {
        match raw.strip_prefix('!') {
            Some(rest) => Self {
                expr: rest.to_string(),
                suppressed: true,
                span,
            },
            None => Self {
                expr: raw.to_string(),
                suppressed: false,
                span,
            },
        }
    }
}

/// A net declaration: its endpoint list, in authored order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetDecl {
    pub endpoints: Vec<EndpointRef>,
    pub span: Option<SourceSpan>,
}

/// Default port bindings applied to every instance referencing `reference`
/// that does not already wire that port explicitly (§4.4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceDefaultDecl {
    pub reference: String,
    /// port → net token.
    pub bindings: IndexMap<String, String>,
    pub span: Option<SourceSpan>,
}

/// A module declaration: patterns, instances, nets, instance defaults, and
/// variables (§3 "ModuleDecl").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDecl {
    pub name: String,
    pub patterns: IndexMap<String, NamedPatternDecl>,
    /// instance name-token → instance expression (`"ref key=val …"`).
    pub instances: IndexMap<String, String>,
    /// net name-token → endpoint list. A net token prefixed `$` is a port.
    pub nets: IndexMap<String, NetDecl>,
    pub instance_defaults: Vec<InstanceDefaultDecl>,
    pub variables: IndexMap<String, String>,
    pub span: Option<SourceSpan>,
}

impl ModuleDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            patterns: IndexMap::new(),
            instances: IndexMap::new(),
            nets: IndexMap::new(),
            instance_defaults: Vec::new(),
            variables: IndexMap::new(),
            span: None,
        }
    }
}

/// A named backend implementation for a device: template text plus its own
/// parameter/variable/prop layers (§3 "DeviceDecl").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendDecl {
    pub name: String,
    pub template: String,
    pub parameters: IndexMap<String, String>,
    pub variables: IndexMap<String, String>,
    /// Opaque key/value metadata not subject to template merging rules.
    pub props: IndexMap<String, String>,
    pub span: Option<SourceSpan>,
}

/// A device declaration: an ordered port list and one or more named
/// backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceDecl {
    pub name: String,
    pub ports: Vec<String>,
    pub parameters: IndexMap<String, String>,
    pub backends: IndexMap<String, BackendDecl>,
    pub span: Option<SourceSpan>,
}

impl DeviceDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ports: Vec::new(),
            parameters: IndexMap::new(),
            backends: IndexMap::new(),
            span: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_ref_strips_suppression_marker() {
        let e = EndpointRef::from_raw("!m1.d", None);
        assert!(e.suppressed);
        assert_eq!(e.expr, "m1.d");

        let e = EndpointRef::from_raw("m1.d", None);
        assert!(!e.suppressed);
        assert_eq!(e.expr, "m1.d");
    }
}
