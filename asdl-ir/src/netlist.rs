//! NetlistIR: the flattened, render-ready IR consumed by the template
//! engine (§3, §4.7).

use indexmap::IndexMap;

use asdl_ast::{DeviceDecl, FileId};

use crate::atomized::PatternOrigin;

/// What an instance line ultimately resolves to for rendering purposes.
#[derive(Debug, Clone)]
pub enum NetlistRef {
    /// `file_id` always identifies the exact resolved definition: ambiguous
    /// or unresolved references are rejected as errors back in C4 (§4.3),
    /// so by the time a reference reaches NetlistIR it is never missing or
    /// ambiguous by name alone.
    Module { name: String, file_id: FileId },
    /// `backend` is the instance's explicit `backend=` param value, if any;
    /// resolving it against the device's backend table (including the
    /// single-backend default) is the renderer's job (§4.8).
    Device { name: String, backend: Option<String> },
}

impl NetlistRef {
    pub fn name(&self) -> &str {
        match self {
            NetlistRef::Module { name, .. } => name,
            NetlistRef::Device { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NetlistInstance {
    pub name: String,
    pub reference: NetlistRef,
    /// port → net name, in the referenced module/device's port order.
    pub conns: IndexMap<String, String>,
    pub params: IndexMap<String, String>,
    pub origin: PatternOrigin,
}

#[derive(Debug, Clone)]
pub struct NetlistNet {
    pub name: String,
    pub is_port: bool,
}

#[derive(Debug, Clone)]
pub struct NetlistModule {
    pub name: String,
    pub file_id: FileId,
    pub port_order: Vec<String>,
    pub instances: Vec<NetlistInstance>,
    pub nets: Vec<NetlistNet>,
}

/// The whole flattened design, ready for §4.8 rendering (§3 "NetlistIR").
#[derive(Debug, Clone)]
pub struct NetlistDesign {
    pub entry_file_id: FileId,
    pub top: Option<String>,
    pub modules: Vec<NetlistModule>,
    pub devices: IndexMap<String, DeviceDecl>,
}

impl NetlistDesign {
    pub fn new(entry_file_id: FileId) -> Self {
        Self {
            entry_file_id,
            top: None,
            modules: Vec::new(),
            devices: IndexMap::new(),
        }
    }

    pub fn module(&self, name: &str) -> Option<&NetlistModule> {
        self.modules.iter().find(|m| m.name == name)
    }
}
