//! Baseline + rule resolution (§4.6 steps 2-4), ported from
//! `views/resolver.py`'s `resolve_view_bindings`.

use ahash::AHashMap;

use asdl_ast::FileId;
use asdl_diagnostics::Diagnostic;
use asdl_ir::atomized::AtomizedProgram;

use crate::diagnostics::{UNKNOWN_RULE_PATH, UNRESOLVED_BASELINE_VIEW, UNRESOLVED_VIEW_BINDING};
use crate::index::{build_instance_index, build_symbol_tables, module_symbol_exists, InstanceIndexEntry};
use crate::model::ViewProfile;

const SOURCE: &str = "viewbind";

/// Resolved binding outcome for one indexed hierarchical instance occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBinding {
    pub path: String,
    pub instance: String,
    /// Resolved module symbol, `cell` or `cell@view`.
    pub resolved: String,
    /// Rule id that last overrode the baseline, if any.
    pub rule_id: Option<String>,
    pub ref_file_id: FileId,
}

impl ResolvedBinding {
    pub fn full_path(&self) -> String {
        crate::index::join_hierarchy_path(&self.path, &self.instance)
    }
}

/// Resolve every hierarchical instance occurrence against `profile` (§4.6
/// steps 1-4). Returns `None` when baseline resolution or final verification
/// fails for any entry; the failing entries are reported as `Error`
/// diagnostics and resolution stops rather than producing a partial result,
/// since a dangling module reference would corrupt every downstream stage.
pub fn resolve_view_bindings(
    program: &AtomizedProgram,
    entry_file_id: FileId,
    top: Option<&str>,
    profile: &ViewProfile,
) -> (Option<Vec<ResolvedBinding>>, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let index = build_instance_index(program, entry_file_id, top);
    let tables = build_symbol_tables(program);

    let mut bindings: Vec<ResolvedBinding> = Vec::with_capacity(index.entries.len());
    let mut positions: AHashMap<String, usize> = AHashMap::default();
    let mut by_full_path: AHashMap<String, &InstanceIndexEntry> = AHashMap::default();

    for entry in &index.entries {
        let Some(resolved) = resolve_baseline_symbol(&tables, entry, &profile.view_order) else {
            diagnostics.push(Diagnostic::error(
                UNRESOLVED_BASELINE_VIEW,
                format!(
                    "unable to resolve baseline view for instance '{}' and logical module '{}'",
                    entry.full_path(),
                    entry.module
                ),
                None,
                SOURCE,
            ));
            return (None, diagnostics);
        };
        let full_path = entry.full_path();
        positions.insert(full_path.clone(), bindings.len());
        by_full_path.insert(full_path.clone(), entry);
        bindings.push(ResolvedBinding {
            path: entry.path.clone(),
            instance: entry.instance.clone(),
            resolved,
            rule_id: None,
            ref_file_id: entry.ref_file_id,
        });
    }

    for rule in &profile.rules {
        if let Some(path) = &rule.match_.path {
            if !index_has_hierarchy_path(&index, path) {
                diagnostics.push(Diagnostic::error(
                    UNKNOWN_RULE_PATH,
                    format!(
                        "rule '{}' match.path '{}' does not resolve to an existing hierarchy node",
                        rule.id.as_deref().unwrap_or("<unnamed>"),
                        path
                    ),
                    None,
                    SOURCE,
                ));
                return (None, diagnostics);
            }
        }
        for entry in match_index_entries(&index, &rule.match_) {
            let full_path = entry.full_path();
            if let Some(&position) = positions.get(&full_path) {
                bindings[position] = ResolvedBinding {
                    path: entry.path.clone(),
                    instance: entry.instance.clone(),
                    resolved: rule.bind.clone(),
                    rule_id: rule.id.clone(),
                    ref_file_id: entry.ref_file_id,
                };
            }
        }
    }

    for binding in &bindings {
        if !module_symbol_exists(&tables, &binding.resolved, binding.ref_file_id) {
            diagnostics.push(Diagnostic::error(
                UNRESOLVED_VIEW_BINDING,
                format!(
                    "resolved symbol '{}' for instance '{}' is not defined in the design",
                    binding.resolved,
                    binding.full_path()
                ),
                None,
                SOURCE,
            ));
            return (None, diagnostics);
        }
    }

    (Some(bindings), diagnostics)
}

fn resolve_baseline_symbol(
    tables: &crate::index::SymbolTables<'_>,
    entry: &InstanceIndexEntry,
    view_order: &[String],
) -> Option<String> {
    if entry.reference.contains('@') {
        return Some(entry.reference.clone());
    }
    for token in view_order {
        let candidate = if token == "default" {
            entry.module.clone()
        } else {
            format!("{}@{}", entry.module, token)
        };
        if module_symbol_exists(tables, &candidate, entry.ref_file_id) {
            return Some(candidate);
        }
    }
    None
}

fn index_has_hierarchy_path(index: &crate::index::InstanceIndex, path: &str) -> bool {
    if index.root_path.as_deref() == Some(path) {
        return true;
    }
    index.entries.iter().any(|e| e.full_path() == path)
}

fn match_index_entries<'a>(
    index: &'a crate::index::InstanceIndex,
    match_: &crate::model::ViewMatch,
) -> Vec<&'a InstanceIndexEntry> {
    index
        .entries
        .iter()
        .filter(|entry| entry_matches_scope(entry, match_.path.as_deref(), index.root_path.as_deref()))
        .filter(|entry| match_.instance.as_deref().map_or(true, |i| entry.instance == i))
        .filter(|entry| match_.module.as_deref().map_or(true, |m| entry.module == m))
        .collect()
}

fn entry_matches_scope(entry: &InstanceIndexEntry, path: Option<&str>, root_path: Option<&str>) -> bool {
    match path {
        None => root_path.is_some() && Some(entry.path.as_str()) == root_path,
        Some(path) => {
            let full_path = entry.full_path();
            full_path == path || full_path.starts_with(&format!("{path}."))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ViewMatch, ViewProfile, ViewRule};
    use asdl_ast::DeviceDecl;
    use asdl_ir::atomized::{AtomizedInstance, AtomizedModule, PatternOrigin};
    use asdl_ir::ids::{ExprId, InstanceId, ModuleId};
    use asdl_ir::patterned::ResolvedRef;

    fn origin() -> PatternOrigin {
        PatternOrigin::new(ExprId::from_raw(0), 0, "x")
    }

    fn sample_program(file: FileId) -> AtomizedProgram {
        let mut top = AtomizedModule::new(ModuleId::from_raw(0), "top", file);
        top.instances.insert(
            InstanceId::from_raw(0),
            AtomizedInstance {
                id: InstanceId::from_raw(0),
                name: "u1".into(),
                reference: ResolvedRef::Module {
                    file_id: file,
                    name: "inv".into(),
                },
                params: Default::default(),
                origin: origin(),
            },
        );
        let inv = AtomizedModule::new(ModuleId::from_raw(1), "inv", file);
        let inv_schematic = AtomizedModule::new(ModuleId::from_raw(2), "inv@schematic", file);

        let mut program = AtomizedProgram::new();
        program.modules.insert(ModuleId::from_raw(0), top);
        program.modules.insert(ModuleId::from_raw(1), inv);
        program.modules.insert(ModuleId::from_raw(2), inv_schematic);
        program.devices.insert("nfet".into(), DeviceDecl::new("nfet"));
        program
    }

    #[test]
    fn baseline_resolves_default_token_to_bare_cell() {
        let file = FileId::new(1);
        let program = sample_program(file);
        let profile = ViewProfile::new(None, vec!["default".into()], Vec::new()).unwrap();
        let (result, diags) = resolve_view_bindings(&program, file, Some("top"), &profile);
        assert!(diags.is_empty());
        let bindings = result.unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].resolved, "inv");
        assert_eq!(bindings[0].rule_id, None);
    }

    #[test]
    fn rule_override_wins_over_baseline() {
        let file = FileId::new(1);
        let program = sample_program(file);
        let m = ViewMatch::new(None, Some("u1".into()), None).unwrap();
        let rule = ViewRule::new(Some("r1".into()), m, "inv@schematic".into()).unwrap();
        let profile = ViewProfile::new(None, vec!["default".into()], vec![rule]).unwrap();
        let (result, diags) = resolve_view_bindings(&program, file, Some("top"), &profile);
        assert!(diags.is_empty());
        let bindings = result.unwrap();
        assert_eq!(bindings[0].resolved, "inv@schematic");
        assert_eq!(bindings[0].rule_id.as_deref(), Some("r1"));
    }

    #[test]
    fn unresolvable_baseline_is_an_error() {
        let file = FileId::new(1);
        let program = sample_program(file);
        let profile = ViewProfile::new(None, vec!["layout".into()], Vec::new()).unwrap();
        let (result, diags) = resolve_view_bindings(&program, file, Some("top"), &profile);
        assert!(result.is_none());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, UNRESOLVED_BASELINE_VIEW);
    }
}
