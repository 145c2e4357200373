//! Diagnostic codes emitted by the C8 renderer and C9 verify pass (§4.8,
//! §4.9, §7 "Rendering").

use asdl_diagnostics::Code;

pub const MISSING_TOP: Code = Code::new("EMIT", 1);
pub const MISSING_BACKEND: Code = Code::new("EMIT", 2);
pub const MISSING_CONN: Code = Code::new("EMIT", 3);
pub const UNKNOWN_CONN_PORT: Code = Code::new("EMIT", 4);
pub const MISSING_PLACEHOLDER: Code = Code::new("EMIT", 5);
pub const UNKNOWN_REFERENCE: Code = Code::new("EMIT", 6);
pub const MALFORMED_TEMPLATE: Code = Code::new("EMIT", 7);
pub const UNRESOLVED_ENV_VAR: Code = Code::new("EMIT", 8);
pub const EMISSION_NAME_COLLISION: Code = Code::new("EMIT", 9);
pub const UNKNOWN_INSTANCE_PARAM: Code = Code::new("EMIT", 11);
/// Not named in spec.md §7's code list; added per the original renderer's
/// dedicated variable/param/prop key-collision check (§10.5).
pub const VARIABLE_KEY_COLLISION: Code = Code::new("EMIT", 12);
