//! Lowering pipeline stages C4 (AST → PatternedGraph) and C5 (pattern
//! atomization), plus their shared diagnostic codes and parsing helpers.

pub mod ast_to_patterned;
pub mod atomize;
pub mod diagnostics;
pub mod instance_expr;
pub mod project;
pub mod variables;

pub use ast_to_patterned::lower_program;
pub use atomize::atomize_program;
pub use project::project_netlist;
