//! Diagnostic codes emitted by the lowering, atomization, and projection
//! passes (§7 "Error kinds").

use asdl_diagnostics::Code;

pub const INVALID_INSTANCE_EXPR: Code = Code::new("LOWER", 1);
pub const INVALID_ENDPOINT_EXPR: Code = Code::new("LOWER", 2);
pub const UNRESOLVED_UNQUALIFIED: Code = Code::new("LOWER", 3);
pub const UNRESOLVED_QUALIFIED: Code = Code::new("LOWER", 4);
pub const AMBIGUOUS_REFERENCE: Code = Code::new("LOWER", 5);
pub const UNDEFINED_MODULE_VARIABLE: Code = Code::new("LOWER", 6);
pub const RECURSIVE_MODULE_VARIABLE: Code = Code::new("LOWER", 7);
pub const DEFAULT_OVERRIDE: Code = Code::new("LOWER", 8);
pub const PATTERN_PARSE_ERROR: Code = Code::new("LOWER", 9);

pub const PATTERN_LENGTH_MISMATCH: Code = Code::new("ATOM", 1);
pub const PATTERN_COLLISION: Code = Code::new("ATOM", 2);
pub const UNKNOWN_ENDPOINT_INSTANCE: Code = Code::new("ATOM", 3);
pub const LITERAL_COLLISION: Code = Code::new("ATOM", 4);
pub const ATOMIZE_VERIFY_FAILED: Code = Code::new("ATOM", 5);
