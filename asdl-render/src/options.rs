//! Caller-supplied rendering options (§4.8, §6 "External Interfaces").

/// Options controlling C8 rendering. Timestamps are caller-supplied rather
/// than read from the wall clock, so a given `(design, options)` pair always
/// renders identical output (§5 "deterministic, stable IDs").
#[derive(Debug, Clone, Default)]
pub struct EmitOptions {
    /// Default backend name used when an instance doesn't name one
    /// explicitly; still overridden per-instance by `backend=`.
    pub backend_name: Option<String>,
    /// When false (the default), the top module is emitted without a
    /// subckt header/footer.
    pub top_as_subckt: bool,
    pub emit_date: Option<String>,
    pub emit_time: Option<String>,
}

impl EmitOptions {
    pub fn new() -> Self {
        Self::default()
    }
}
