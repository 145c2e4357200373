//! Deterministic hierarchical instance indexing (§4.6 step 1), ported from
//! `views/instance_index.py`. Unlike the original, this walks the
//! [`AtomizedProgram`] directly rather than a post-projection NetlistIR
//! design, since spec control flow places view-binding before C7 projection.

use ahash::AHashMap;

use asdl_ast::FileId;
use asdl_ir::atomized::AtomizedProgram;
use asdl_ir::ids::ModuleId;
use asdl_ir::patterned::ResolvedRef;

/// One hierarchical module-instance occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceIndexEntry {
    /// Parent hierarchy path, excluding this instance's own leaf name.
    pub path: String,
    pub instance: String,
    /// Logical (undecorated) referenced module symbol.
    pub module: String,
    /// Authored referenced module symbol, `cell` or `cell@view`.
    pub reference: String,
    pub ref_file_id: FileId,
}

impl InstanceIndexEntry {
    pub fn full_path(&self) -> String {
        join_hierarchy_path(&self.path, &self.instance)
    }
}

pub fn join_hierarchy_path(parent_path: &str, instance: &str) -> String {
    if parent_path.is_empty() {
        instance.to_string()
    } else {
        format!("{parent_path}.{instance}")
    }
}

#[derive(Debug, Clone, Default)]
pub struct InstanceIndex {
    pub entries: Vec<InstanceIndexEntry>,
    pub root_path: Option<String>,
}

/// Module symbol tables used for baseline/rule existence checks (§4.6 step 2
/// and 4). Keyed both by `(file_id, name)` for in-file lookups and by bare
/// `name` for the unambiguous cross-file fallback.
pub struct SymbolTables<'a> {
    pub by_key: AHashMap<(FileId, &'a str), ModuleId>,
    pub by_name: AHashMap<&'a str, Vec<ModuleId>>,
}

pub fn build_symbol_tables(program: &AtomizedProgram) -> SymbolTables<'_> {
    let mut by_key = AHashMap::default();
    let mut by_name: AHashMap<&str, Vec<ModuleId>> = AHashMap::default();
    for (id, module) in &program.modules {
        by_key.insert((module.file_id, module.name.as_str()), *id);
        by_name.entry(module.name.as_str()).or_default().push(*id);
    }
    SymbolTables { by_key, by_name }
}

/// True when `symbol` resolves in-file (`file_id`), or unambiguously
/// cross-file by bare name (§4.6 step 2 "first candidate that exists", step 4
/// "verify every resolved symbol exists").
pub fn module_symbol_exists(tables: &SymbolTables<'_>, symbol: &str, file_id: FileId) -> bool {
    if tables.by_key.contains_key(&(file_id, symbol)) {
        return true;
    }
    matches!(tables.by_name.get(symbol), Some(ids) if ids.len() == 1)
}

/// Resolve the module symbol table entry the same way [`module_symbol_exists`]
/// validates it, for callers that need the id rather than a bool.
pub fn resolve_module_id(tables: &SymbolTables<'_>, symbol: &str, file_id: FileId) -> Option<ModuleId> {
    if let Some(id) = tables.by_key.get(&(file_id, symbol)) {
        return Some(*id);
    }
    match tables.by_name.get(symbol) {
        Some(ids) if ids.len() == 1 => Some(ids[0]),
        _ => None,
    }
}

fn logical_module_name(symbol: &str) -> &str {
    symbol.split('@').next().unwrap_or(symbol)
}

/// Resolve the top module the same way the original's `_resolve_top_module`
/// does: explicit `top` name (scoped to `entry_file_id` when unambiguous,
/// else any module with that name), else the unique module in
/// `entry_file_id`, else the sole module in the whole program.
pub fn resolve_top_module(
    program: &AtomizedProgram,
    entry_file_id: FileId,
    top: Option<&str>,
) -> Option<ModuleId> {
    if let Some(top) = top {
        if let Some((id, _)) = program
            .modules
            .iter()
            .find(|(_, m)| m.name == top && m.file_id == entry_file_id)
        {
            return Some(*id);
        }
        let mut matches = program.modules.iter().filter(|(_, m)| m.name == top);
        return matches.next().map(|(id, _)| *id);
    }

    let mut in_entry = program.modules.iter().filter(|(_, m)| m.file_id == entry_file_id);
    if let Some((id, _)) = in_entry.next() {
        if in_entry.next().is_none() {
            return Some(id).copied();
        }
        return None;
    }

    let mut all = program.modules.iter();
    match (all.next(), all.next()) {
        (Some((id, _)), None) => Some(*id),
        _ => None,
    }
}

/// Build the deterministic preorder-DFS instance index (§4.6 step 1),
/// including only instances that reference modules (device-referencing
/// instances are leaves and excluded, matching `include_devices=False`).
pub fn build_instance_index(program: &AtomizedProgram, entry_file_id: FileId, top: Option<&str>) -> InstanceIndex {
    let Some(top_id) = resolve_top_module(program, entry_file_id, top) else {
        return InstanceIndex::default();
    };
    let Some(top_module) = program.modules.get(&top_id) else {
        return InstanceIndex::default();
    };

    let mut entries = Vec::new();
    let mut stack = Vec::new();
    walk(program, top_id, &mut stack, &mut entries);
    InstanceIndex {
        entries,
        root_path: Some(top_module.name.clone()),
    }
}

fn walk(
    program: &AtomizedProgram,
    module_id: ModuleId,
    stack: &mut Vec<String>,
    entries: &mut Vec<InstanceIndexEntry>,
) {
    let Some(module) = program.modules.get(&module_id) else {
        return;
    };
    let path = stack.join(".");
    for instance in module.instances.values() {
        let ResolvedRef::Module { file_id, name } = &instance.reference else {
            continue;
        };
        entries.push(InstanceIndexEntry {
            path: path.clone(),
            instance: instance.name.clone(),
            module: logical_module_name(name).to_string(),
            reference: name.clone(),
            ref_file_id: *file_id,
        });

        let child_id = program
            .modules
            .iter()
            .find(|(_, m)| &m.name == name && m.file_id == *file_id)
            .map(|(id, _)| *id);
        if let Some(child_id) = child_id {
            stack.push(instance.name.clone());
            walk(program, child_id, stack, entries);
            stack.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asdl_ast::DeviceDecl;
    use asdl_ir::atomized::{AtomizedInstance, AtomizedModule, PatternOrigin};
    use asdl_ir::ids::{ExprId, InstanceId};

    fn origin() -> PatternOrigin {
        PatternOrigin::new(ExprId::from_raw(0), 0, "x")
    }

    fn module_ref(name: &str, file_id: FileId) -> ResolvedRef {
        ResolvedRef::Module {
            file_id,
            name: name.to_string(),
        }
    }

    #[test]
    fn index_walks_preorder_and_skips_devices() {
        let file = FileId::new(1);
        let mut top = AtomizedModule::new(ModuleId::from_raw(0), "top", file);
        top.instances.insert(
            InstanceId::from_raw(0),
            AtomizedInstance {
                id: InstanceId::from_raw(0),
                name: "u1".into(),
                reference: module_ref("inv", file),
                params: Default::default(),
                origin: origin(),
            },
        );
        top.instances.insert(
            InstanceId::from_raw(1),
            AtomizedInstance {
                id: InstanceId::from_raw(1),
                name: "u2".into(),
                reference: ResolvedRef::Device {
                    file_id: file,
                    name: "nfet".into(),
                },
                params: Default::default(),
                origin: origin(),
            },
        );
        let inv = AtomizedModule::new(ModuleId::from_raw(1), "inv", file);

        let mut program = AtomizedProgram::new();
        program.modules.insert(ModuleId::from_raw(0), top);
        program.modules.insert(ModuleId::from_raw(1), inv);
        program.devices.insert("nfet".into(), DeviceDecl::new("nfet"));

        let index = build_instance_index(&program, file, Some("top"));
        assert_eq!(index.entries.len(), 1);
        assert_eq!(index.entries[0].instance, "u1");
        assert_eq!(index.entries[0].module, "inv");
        assert_eq!(index.root_path.as_deref(), Some("top"));
    }

    #[test]
    fn symbol_exists_falls_back_to_unambiguous_name() {
        let file_a = FileId::new(1);
        let file_b = FileId::new(2);
        let mut program = AtomizedProgram::new();
        program
            .modules
            .insert(ModuleId::from_raw(0), AtomizedModule::new(ModuleId::from_raw(0), "inv", file_a));
        let tables = build_symbol_tables(&program);
        assert!(module_symbol_exists(&tables, "inv", file_b));
        assert!(!module_symbol_exists(&tables, "missing", file_b));
    }
}
