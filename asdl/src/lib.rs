//! Facade crate: re-exports the per-stage crates and exposes the single
//! [`compile`] pipeline entry point (§2 "Control flow: Parse → C4 → C5 →
//! (optionally) C6 → C7 → C9 → C8 → netlist text").
//!
//! Each stage below returns `(artifact_or_null, diagnostics)`; `compile`
//! checks `has_error` after every stage and short-circuits to `(None,
//! diagnostics_so_far)` before invoking the next one, exactly as §7's
//! propagation policy requires. No stage in this crate ever panics or
//! raises on malformed input — failures are always diagnostics.

pub mod config;

pub use asdl_ast as ast;
pub use asdl_diagnostics as diagnostics;
pub use asdl_ir as ir;
pub use asdl_lower as lower;
pub use asdl_pattern as pattern;
pub use asdl_render as render;
pub use asdl_symbols as symbols;
pub use asdl_viewbind as viewbind;

pub use config::CompileOptions;

use asdl_ast::FileId;
use asdl_diagnostics::{has_error, Diagnostic};
use asdl_symbols::ProgramDb;

/// Run the full pipeline against `program`, rooted at `entry_file_id`
/// (§6 "a single netlist text string"). Returns `None` alongside the
/// accumulated diagnostics as soon as any stage records an error.
pub fn compile(program: &ProgramDb, entry_file_id: FileId, options: &CompileOptions) -> (Option<String>, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();

    log::debug!("compile: lowering AST to PatternedGraph (entry file {:?})", entry_file_id);
    let (patterned, lower_diags) = asdl_lower::lower_program(program);
    diagnostics.extend(lower_diags);
    let Some(patterned) = patterned else {
        return (None, diagnostics);
    };
    if has_error(&diagnostics) {
        return (None, diagnostics);
    }

    log::debug!("compile: atomizing patterned graph (max_atoms={})", options.max_atoms);
    let (atomized, atomize_diags) = asdl_lower::atomize_program(&patterned, options.max_atoms);
    diagnostics.extend(atomize_diags);
    let Some(atomized) = atomized else {
        return (None, diagnostics);
    };
    if has_error(&diagnostics) {
        return (None, diagnostics);
    }

    let top = program.document(entry_file_id).and_then(|doc| doc.top.clone());

    let atomized = match &options.view_profile {
        Some(profile) => {
            log::debug!("compile: applying view-binding profile");
            let (bound, viewbind_diags) = asdl_viewbind::bind_views(atomized, entry_file_id, top.as_deref(), profile);
            diagnostics.extend(viewbind_diags);
            let Some(bound) = bound else {
                return (None, diagnostics);
            };
            if has_error(&diagnostics) {
                return (None, diagnostics);
            }
            bound
        }
        None => atomized,
    };

    log::debug!("compile: projecting to NetlistIR");
    let design = asdl_lower::project_netlist(&atomized, entry_file_id, top);

    log::debug!("compile: verifying and rendering netlist");
    let (text, render_diags) = asdl_render::render(&design, &options.backend_config, &options.emit);
    diagnostics.extend(render_diags);
    (text, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use asdl_ast::{Document, ModuleDecl, NetDecl};

    #[test]
    fn aborts_before_render_when_lowering_fails() {
        let mut doc = Document::new(FileId::new(1));
        let mut module = ModuleDecl::new("top");
        module.instances.insert("u1".to_string(), "pdk.nfet".to_string());
        let mut net = NetDecl { endpoints: Vec::new(), span: None };
        net.endpoints.push(asdl_ast::EndpointRef::from_raw("u1.g", None));
        module.nets.insert("n".to_string(), net);
        doc.top = Some("top".to_string());
        doc.modules.insert("top".to_string(), module);

        let mut program = ProgramDb::new();
        program.insert(doc);

        let backend = asdl_render::BackendConfig::new("ngspice");
        let options = CompileOptions::new(backend);
        let (text, diags) = compile(&program, FileId::new(1), &options);

        assert!(text.is_none());
        assert!(has_error(&diags));
    }
}
