//! Ambient pipeline options (§6 "External Interfaces", §9 SUPPLEMENTED
//! DETAIL 10.2/10.5).
//!
//! This crate only emits `log::debug!`/`log::trace!` calls at stage
//! boundaries; it never installs a subscriber itself (§0 "the library
//! crates use the `log` facade and only a top-level binary installs a
//! subscriber"). Binaries embedding [`crate::compile`] are expected to call
//! `env_logger::init()` (or any other `log`-compatible sink) before invoking
//! the pipeline.

use asdl_pattern::DEFAULT_MAX_ATOMS;
use asdl_render::{BackendConfig, EmitOptions};
use asdl_viewbind::ViewProfile;

/// Caller-controlled knobs for a single [`crate::compile`] run.
///
/// `backend_config` has no useful default (a backend with no system
/// templates can never render anything), so callers must supply one; every
/// other field defaults to the behavior the pipeline spec describes as the
/// baseline case (no view-binding profile applied, default atom cap,
/// default emit options).
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Cap on expansion size for any single pattern expression (§4.2.2,
    /// default 10,000 atoms).
    pub max_atoms: usize,
    /// When present, C6 view-binding runs between atomization and
    /// projection (§4.6). `None` skips the stage entirely, per the
    /// pipeline's "Parse → C4 → C5 → (optionally) C6 → C7" control flow.
    pub view_profile: Option<ViewProfile>,
    pub backend_config: BackendConfig,
    pub emit: EmitOptions,
}

impl CompileOptions {
    pub fn new(backend_config: BackendConfig) -> Self {
        Self {
            max_atoms: DEFAULT_MAX_ATOMS,
            view_profile: None,
            backend_config,
            emit: EmitOptions::new(),
        }
    }

    pub fn with_max_atoms(mut self, max_atoms: usize) -> Self {
        self.max_atoms = max_atoms;
        self
    }

    pub fn with_view_profile(mut self, profile: ViewProfile) -> Self {
        self.view_profile = Some(profile);
        self
    }

    pub fn with_emit_options(mut self, emit: EmitOptions) -> Self {
        self.emit = emit;
        self
    }
}
