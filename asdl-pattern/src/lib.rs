//! Parsing, expansion, and binding for ASDL pattern expressions — the mini
//! DSL embedded in net, instance, and endpoint name tokens.

pub mod bind;
pub mod expand;
pub mod parser;

pub use bind::{bind_patterns, BindingPlan};
pub use expand::{expand_endpoint, expand_pattern, DEFAULT_MAX_ATOMS};
pub use parser::{
    has_unnamed_groups, iter_pattern_groups, parse_pattern_expr, AxisSpec, GroupKind, Label,
    LabelVec, NamedPattern, PatternError, PatternExpr, PatternGroup, PatternLiteral,
    PatternSegment, PatternToken,
};
