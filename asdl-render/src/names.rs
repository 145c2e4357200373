//! Deterministic module-symbol → emitted-name mapping (§4.8 "Deterministic
//! module emission names").

use std::hash::Hash;

use ahash::AHashSet;
use asdl_diagnostics::Diagnostic;
use indexmap::IndexMap;

use crate::diagnostics::EMISSION_NAME_COLLISION;

fn sanitize_realization_token(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut last_was_sep = false;
    for c in value.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    let trimmed = out.trim_matches('_').to_string();
    if trimmed.is_empty() {
        "view".to_string()
    } else {
        trimmed
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}
fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_ident_start(c) => {}
        _ => return false,
    }
    chars.all(is_ident_char)
}

/// Map a module symbol (`cell` or `cell@view`) to its emitted realization
/// name: `cell@default`/bare `cell` -> `cell`, `cell@view` -> `cell_view`,
/// sanitizing non-identifier characters in each token.
pub fn realization_name_from_symbol(symbol: &str) -> String {
    let at_count = symbol.matches('@').count();
    if at_count == 0 && is_identifier(symbol) {
        return symbol.to_string();
    }
    if at_count == 1 {
        let (cell, view) = symbol.split_once('@').unwrap();
        if is_identifier(cell) && (view.is_empty() || is_identifier(view)) {
            return match view {
                "" | "default" => cell.to_string(),
                v => format!("{cell}_{}", sanitize_realization_token(v)),
            };
        }
        let cell_token = sanitize_realization_token(cell);
        return match view {
            "" | "default" => cell_token,
            v => format!("{cell_token}_{}", sanitize_realization_token(v)),
        };
    }
    sanitize_realization_token(&symbol.replace('@', "_"))
}

/// Build the module-key -> emitted-name map for a reachable-module list
/// (keyed by whatever identity the caller uses — there's no id type at the
/// netlist level, unlike upstream IRs), resolving base-name collisions with
/// `__2`, `__3`, ... suffixes in traversal order and warning on each.
pub fn build_module_emitted_names<K: Clone + Eq + Hash>(
    modules: &[(K, &str)],
) -> (IndexMap<K, String>, Vec<Diagnostic>) {
    let mut used_names: AHashSet<String> = AHashSet::default();
    let mut next_suffix_by_base: IndexMap<String, u32> = IndexMap::new();
    let mut emitted_names = IndexMap::new();
    let mut diagnostics = Vec::new();

    for (module_key, symbol) in modules {
        let base_name = realization_name_from_symbol(symbol);
        let mut emitted = base_name.clone();
        if used_names.contains(&emitted) {
            let mut next_suffix = *next_suffix_by_base.get(&base_name).unwrap_or(&2);
            while used_names.contains(&format!("{base_name}__{next_suffix}")) {
                next_suffix += 1;
            }
            emitted = format!("{base_name}__{next_suffix}");
            next_suffix_by_base.insert(base_name.clone(), next_suffix + 1);
            diagnostics.push(Diagnostic::warning(
                EMISSION_NAME_COLLISION,
                format!("Module symbol '{symbol}' emits as '{emitted}' after collision on base name '{base_name}'."),
                None,
                "render",
            ));
        } else {
            next_suffix_by_base.entry(base_name.clone()).or_insert(2);
        }
        used_names.insert(emitted.clone());
        emitted_names.insert(module_key.clone(), emitted);
    }
    (emitted_names, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_cell_maps_to_itself() {
        assert_eq!(realization_name_from_symbol("inv"), "inv");
    }

    #[test]
    fn view_suffix_is_appended() {
        assert_eq!(realization_name_from_symbol("inv@schematic"), "inv_schematic");
    }

    #[test]
    fn default_view_drops_suffix() {
        assert_eq!(realization_name_from_symbol("inv@default"), "inv");
    }

    #[test]
    fn collision_appends_numbered_suffix() {
        let (names, diags) = build_module_emitted_names(&[(0u32, "inv@schematic"), (1u32, "inv_schematic")]);
        assert_eq!(names[&0u32], "inv_schematic");
        assert_eq!(names[&1u32], "inv_schematic__2");
        assert_eq!(diags.len(), 1);
    }
}
