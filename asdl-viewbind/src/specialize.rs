//! Applying resolved bindings to the atomized graph (§4.6 "Applying
//! resolutions"): rewrite instance references to their resolved module, and
//! clone (specialize) modules whose descendants diverge per occurrence.
//!
//! Baseline resolution (view_order lookups) is a pure function of a logical
//! module name, its file id, and the profile — not of where in the
//! hierarchy it's instantiated — so two occurrences of the same module
//! always resolve identically *unless* a rule overrides one of them. A
//! module therefore only needs specializing when a rule fires somewhere in
//! its occurrence subtree; otherwise it is rewritten once, in place, and
//! shared by every occurrence (mirrors "unchanged modules remain shared").

use ahash::AHashMap;

use asdl_ast::FileId;
use asdl_ir::atomized::AtomizedProgram;
use asdl_ir::ids::ModuleId;
use asdl_ir::patterned::ResolvedRef;

use crate::index::{join_hierarchy_path, resolve_module_id, SymbolTables};
use crate::resolver::ResolvedBinding;

/// Deterministic FNV-1a hash of an occurrence path, folded into the upper
/// half of the `u32` id space so specialized file ids never collide with an
/// author-assigned one (§4.6 "new collision-safe file_id derived from a hash
/// of the occurrence path").
fn hash_file_id(path: &str) -> FileId {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in path.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    FileId::new(0x8000_0000 | (hash as u32 & 0x7fff_ffff))
}

fn is_strict_descendant(candidate: &str, occurrence_path: &str) -> bool {
    if occurrence_path.is_empty() {
        return !candidate.is_empty();
    }
    candidate.starts_with(&format!("{occurrence_path}."))
}

struct SpecializeCtx<'a> {
    program: &'a AtomizedProgram,
    tables: &'a SymbolTables<'a>,
    bindings_by_path: AHashMap<String, &'a ResolvedBinding>,
    next_id: u32,
    memo: AHashMap<ModuleId, ModuleId>,
    result: AHashMap<ModuleId, asdl_ir::atomized::AtomizedModule>,
}

impl<'a> SpecializeCtx<'a> {
    fn alloc_module_id(&mut self) -> ModuleId {
        let id = ModuleId::from_raw(self.next_id);
        self.next_id += 1;
        id
    }

    fn process(&mut self, module_id: ModuleId, occurrence_path: &str, is_root: bool) -> ModuleId {
        let needs_clone = !is_root
            && self
                .bindings_by_path
                .values()
                .any(|b| b.rule_id.is_some() && is_strict_descendant(&b.full_path(), occurrence_path));

        if !needs_clone {
            if let Some(&cached) = self.memo.get(&module_id) {
                return cached;
            }
        }

        let mut module = self
            .result
            .get(&module_id)
            .cloned()
            .unwrap_or_else(|| self.program.modules[&module_id].clone());

        let working_id = if needs_clone {
            module.file_id = hash_file_id(occurrence_path);
            self.alloc_module_id()
        } else {
            module_id
        };

        let instance_ids: Vec<_> = module.instances.keys().copied().collect();
        for inst_id in instance_ids {
            let (instance_name, is_module_ref) = {
                let instance = &module.instances[&inst_id];
                (instance.name.clone(), matches!(instance.reference, ResolvedRef::Module { .. }))
            };
            if !is_module_ref {
                continue;
            }
            let child_path = join_hierarchy_path(occurrence_path, &instance_name);
            let Some(binding) = self.bindings_by_path.get(child_path.as_str()).copied() else {
                continue;
            };
            let Some(target_seed_id) = resolve_module_id(self.tables, &binding.resolved, binding.ref_file_id) else {
                continue;
            };
            let child_final_id = self.process(target_seed_id, &child_path, false);
            let child_module = &self.result[&child_final_id];
            let new_reference = ResolvedRef::Module {
                file_id: child_module.file_id,
                name: child_module.name.clone(),
            };
            module.instances.get_mut(&inst_id).unwrap().reference = new_reference;
        }

        self.result.insert(working_id, module);
        if !needs_clone {
            self.memo.insert(module_id, working_id);
        }
        working_id
    }
}

/// Rewrite `program`'s instance references per `bindings` and clone modules
/// where occurrence-specific rule overrides require it (§4.6 final
/// paragraph). Returns a fresh [`AtomizedProgram`]; unreachable modules (not
/// visited via the top-down walk) pass through untouched.
pub fn apply_bindings(
    program: &AtomizedProgram,
    tables: &SymbolTables<'_>,
    top_id: ModuleId,
    bindings: &[ResolvedBinding],
) -> AtomizedProgram {
    let bindings_by_path = bindings.iter().map(|b| (b.full_path(), b)).collect();
    let next_id = program.modules.keys().map(|id| id.raw() + 1).max().unwrap_or(0);

    let mut ctx = SpecializeCtx {
        program,
        tables,
        bindings_by_path,
        next_id,
        memo: AHashMap::default(),
        result: AHashMap::default(),
    };

    let new_top_id = ctx.process(top_id, "", true);
    debug_assert_eq!(new_top_id, top_id, "the top module is never cloned");

    let mut out = AtomizedProgram::new();
    out.devices = program.devices.clone();
    for (id, module) in &program.modules {
        let module = ctx.result.remove(id).unwrap_or_else(|| module.clone());
        out.modules.insert(*id, module);
    }
    // Specialized clones got ids beyond the original range; append them in
    // allocation order so declaration-order iteration stays stable for the
    // modules that existed before view-binding ran.
    let mut extra: Vec<_> = ctx.result.into_iter().collect();
    extra.sort_by_key(|(id, _)| id.raw());
    for (id, module) in extra {
        out.modules.insert(id, module);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build_symbol_tables;
    use crate::model::{ViewMatch, ViewProfile, ViewRule};
    use crate::resolver::resolve_view_bindings;
    use asdl_ast::DeviceDecl;
    use asdl_ir::atomized::{AtomizedInstance, AtomizedModule, PatternOrigin};
    use asdl_ir::ids::{ExprId, InstanceId};

    fn origin() -> PatternOrigin {
        PatternOrigin::new(ExprId::from_raw(0), 0, "x")
    }

    #[test]
    fn rule_scoped_instance_specializes_only_its_own_parent() {
        let file = FileId::new(1);
        // top instantiates two copies of `buf`, each instantiating `inv`.
        // A rule overrides only top.a.u's child to the schematic view.
        let mut top = AtomizedModule::new(ModuleId::from_raw(0), "top", file);
        top.instances.insert(
            InstanceId::from_raw(0),
            AtomizedInstance {
                id: InstanceId::from_raw(0),
                name: "a".into(),
                reference: ResolvedRef::Module { file_id: file, name: "buf".into() },
                params: Default::default(),
                origin: origin(),
            },
        );
        top.instances.insert(
            InstanceId::from_raw(1),
            AtomizedInstance {
                id: InstanceId::from_raw(1),
                name: "b".into(),
                reference: ResolvedRef::Module { file_id: file, name: "buf".into() },
                params: Default::default(),
                origin: origin(),
            },
        );

        let mut buf = AtomizedModule::new(ModuleId::from_raw(1), "buf", file);
        buf.instances.insert(
            InstanceId::from_raw(2),
            AtomizedInstance {
                id: InstanceId::from_raw(2),
                name: "u".into(),
                reference: ResolvedRef::Module { file_id: file, name: "inv".into() },
                params: Default::default(),
                origin: origin(),
            },
        );

        let inv = AtomizedModule::new(ModuleId::from_raw(2), "inv", file);
        let inv_schematic = AtomizedModule::new(ModuleId::from_raw(3), "inv@schematic", file);

        let mut program = AtomizedProgram::new();
        program.modules.insert(ModuleId::from_raw(0), top);
        program.modules.insert(ModuleId::from_raw(1), buf);
        program.modules.insert(ModuleId::from_raw(2), inv);
        program.modules.insert(ModuleId::from_raw(3), inv_schematic);
        program.devices.insert("nfet".into(), DeviceDecl::new("nfet"));

        let m = ViewMatch::new(Some("top.a".into()), Some("u".into()), None).unwrap();
        let rule = ViewRule::new(Some("r1".into()), m, "inv@schematic".into()).unwrap();
        let profile = ViewProfile::new(None, vec!["default".into()], vec![rule]).unwrap();

        let (bindings, diags) = resolve_view_bindings(&program, file, Some("top"), &profile);
        assert!(diags.is_empty(), "{diags:?}");
        let bindings = bindings.unwrap();
        let tables = build_symbol_tables(&program);
        let out = apply_bindings(&program, &tables, ModuleId::from_raw(0), &bindings);

        // buf got specialized once (for occurrence "a") since its descendant
        // diverges only under that path; "b"'s buf instance keeps pointing
        // at the shared, unmodified buf module.
        assert_eq!(out.modules.len(), 5);

        let top_out = &out.modules[&ModuleId::from_raw(0)];
        let a_target_name = &top_out.instances[&InstanceId::from_raw(0)].reference;
        let b_target_name = &top_out.instances[&InstanceId::from_raw(1)].reference;
        let (ResolvedRef::Module { name: a_name, file_id: a_file }, ResolvedRef::Module { name: b_name, file_id: b_file }) =
            (a_target_name, b_target_name)
        else {
            panic!("expected module refs");
        };
        assert_eq!(a_name, "buf");
        assert_eq!(b_name, "buf");
        assert_ne!(a_file, b_file, "buf must be specialized per occurrence");
        assert_eq!(*b_file, file, "unaffected occurrence keeps the shared module");
    }
}
