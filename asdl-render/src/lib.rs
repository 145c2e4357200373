//! C8/C9: the backend template renderer and its pre-render verify pass
//! (§4.8, §4.9). Consumes the projected [`asdl_ir::netlist::NetlistDesign`]
//! and produces either netlist text or diagnostics.

pub mod backend_config;
pub mod diagnostics;
pub mod emit;
pub mod envvar;
pub mod names;
pub mod options;
pub mod params;
pub mod resolve;
pub mod templates;
pub mod verify;

pub use backend_config::BackendConfig;
pub use emit::emit_netlist;
pub use options::EmitOptions;
pub use verify::verify_design;

use asdl_diagnostics::{has_error, Diagnostic};
use asdl_ir::netlist::NetlistDesign;

/// Run C9 then C8: verify first, and only render if verification raised no
/// errors (§4.9 "Runs before rendering").
pub fn render(design: &NetlistDesign, backend_config: &BackendConfig, options: &EmitOptions) -> (Option<String>, Vec<Diagnostic>) {
    let mut diagnostics = verify_design(design, backend_config, options.backend_name.as_deref());
    if has_error(&diagnostics) {
        return (None, diagnostics);
    }
    let (text, render_diags) = emit_netlist(design, backend_config, options);
    diagnostics.extend(render_diags);
    (text, diagnostics)
}
