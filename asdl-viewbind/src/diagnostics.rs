//! Diagnostic codes emitted by the view-binding resolver (§4.6, §7).

use asdl_diagnostics::Code;

pub const INVALID_VIEW_PROFILE: Code = Code::new("VIEW", 1);
pub const UNRESOLVED_BASELINE_VIEW: Code = Code::new("VIEW", 2);
pub const UNKNOWN_RULE_PATH: Code = Code::new("VIEW", 3);
pub const UNRESOLVED_VIEW_BINDING: Code = Code::new("VIEW", 4);
