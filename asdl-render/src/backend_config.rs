//! Backend config: the mapping of system-template name → template string
//! that every netlist backend must supply (§4.8 "Backend config").

use ahash::AHashSet;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The seven system templates every backend must define.
pub const REQUIRED_SYSTEM_TEMPLATES: [&str; 7] = [
    "__netlist_header__",
    "__netlist_footer__",
    "__subckt_header__",
    "__subckt_header_params__",
    "__subckt_footer__",
    "__subckt_call__",
    "__subckt_call_params__",
];

/// Placeholders a system template MUST reference.
pub fn required_placeholders(template_name: &str) -> AHashSet<&'static str> {
    let fields: &[&str] = match template_name {
        "__subckt_header__" => &["name"],
        "__subckt_header_params__" => &["name", "params"],
        "__subckt_footer__" => &[],
        "__subckt_call__" => &["name", "ports", "ref"],
        "__subckt_call_params__" => &["name", "ports", "ref", "params"],
        "__netlist_header__" => &[],
        "__netlist_footer__" => &[],
        _ => &[],
    };
    fields.iter().copied().collect()
}

/// Placeholders a system template MAY reference.
pub fn allowed_placeholders(template_name: &str) -> AHashSet<&'static str> {
    let fields: &[&str] = match template_name {
        "__subckt_header__" => &["name", "ports", "file_id", "sym_name"],
        "__subckt_header_params__" => &["name", "ports", "params", "file_id", "sym_name"],
        "__subckt_footer__" => &["name", "sym_name"],
        "__subckt_call__" => &["name", "ports", "ref", "file_id", "sym_name"],
        "__subckt_call_params__" => &["name", "ports", "ref", "params", "file_id", "sym_name"],
        "__netlist_header__" | "__netlist_footer__" => {
            &["backend", "top", "file_id", "top_sym_name", "emit_date", "emit_time"]
        }
        _ => &[],
    };
    fields.iter().copied().collect()
}

/// A netlist backend's system-template table plus an optional display name,
/// as loaded from external configuration (§6 "External Interfaces").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendConfig {
    pub name: String,
    pub templates: IndexMap<String, String>,
}

impl BackendConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), templates: IndexMap::new() }
    }

    pub fn template(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_is_subset_of_allowed() {
        for name in REQUIRED_SYSTEM_TEMPLATES {
            let required = required_placeholders(name);
            let allowed = allowed_placeholders(name);
            assert!(required.is_subset(&allowed), "{name}: required not subset of allowed");
        }
    }
}
