//! C6: the optional view-binding resolver (§4.6). Applies an externally
//! authored [`ViewProfile`] to rewrite module references along the instance
//! hierarchy of an [`AtomizedProgram`], specializing per-occurrence modules
//! whose nested overrides diverge.

pub mod diagnostics;
pub mod index;
pub mod model;
pub mod resolver;
pub mod specialize;

pub use model::{ViewBindError, ViewMatch, ViewProfile, ViewRule};
pub use resolver::{resolve_view_bindings, ResolvedBinding};

use asdl_ast::FileId;
use asdl_diagnostics::Diagnostic;
use asdl_ir::atomized::AtomizedProgram;

use index::{build_symbol_tables, resolve_top_module};

/// Turn a profile-construction failure into a diagnostic, for callers (the
/// `asdl` facade) that load a [`ViewProfile`] from external configuration.
pub fn invalid_profile_diagnostic(err: &ViewBindError) -> Diagnostic {
    Diagnostic::error(diagnostics::INVALID_VIEW_PROFILE, err.to_string(), None, "viewbind")
}

/// Run C6 end-to-end: resolve bindings against `profile`, then specialize
/// the atomized graph accordingly. `None` means baseline/rule resolution
/// failed outright (see the returned diagnostics); an input with no
/// resolvable top module is returned unchanged (view-binding has nothing to
/// walk, consistent with the original resolving no hierarchy at all).
pub fn bind_views(
    program: AtomizedProgram,
    entry_file_id: FileId,
    top: Option<&str>,
    profile: &ViewProfile,
) -> (Option<AtomizedProgram>, Vec<Diagnostic>) {
    log::debug!("view-binding against {} view(s) in view_order, {} rule(s)", profile.view_order.len(), profile.rules.len());
    let tables = build_symbol_tables(&program);
    let Some(top_id) = resolve_top_module(&program, entry_file_id, top) else {
        log::debug!("no resolvable top module; view-binding leaves the program unchanged");
        return (Some(program), Vec::new());
    };

    let (bindings, diagnostics) = resolve_view_bindings(&program, entry_file_id, top, profile);
    let Some(bindings) = bindings else {
        return (None, diagnostics);
    };
    log::debug!("resolved {} view binding(s) from top module {:?}", bindings.len(), top_id);

    let specialized = specialize::apply_bindings(&program, &tables, top_id, &bindings);
    (Some(specialized), diagnostics)
}
