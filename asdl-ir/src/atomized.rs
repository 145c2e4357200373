//! AtomizedGraph: the IR where every name is a fully literal atom (§3, §4.5).

use indexmap::IndexMap;
use smallvec::SmallVec;

use asdl_ast::FileId;

use crate::ids::{EndpointId, ExprId, InstanceId, ModuleId, NetId};
use crate::patterned::ResolvedRef;

/// The group labels that produced one atom rarely exceed a handful of
/// splice segments, so this stays inline.
pub type PatternParts = SmallVec<[String; 4]>;

/// Links an atomized entity back to the pattern expression, segment, and
/// substitution values that produced it (§3 "Atomized entities").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternOrigin {
    pub expression_id: ExprId,
    pub segment_index: usize,
    pub base_name: String,
    pub pattern_parts: PatternParts,
}

impl PatternOrigin {
    pub fn new(expression_id: ExprId, segment_index: usize, base_name: impl Into<String>) -> Self {
        Self {
            expression_id,
            segment_index,
            base_name: base_name.into(),
            pattern_parts: PatternParts::new(),
        }
    }

    pub fn with_parts(mut self, parts: Vec<String>) -> Self {
        self.pattern_parts = parts.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct AtomizedNet {
    pub id: NetId,
    pub name: String,
    pub is_port: bool,
    pub origin: PatternOrigin,
}

#[derive(Debug, Clone)]
pub struct AtomizedInstance {
    pub id: InstanceId,
    pub name: String,
    pub reference: ResolvedRef,
    /// param name → (atom value, origin).
    pub params: IndexMap<String, (String, PatternOrigin)>,
    pub origin: PatternOrigin,
}

#[derive(Debug, Clone)]
pub struct AtomizedEndpoint {
    pub id: EndpointId,
    pub inst_id: InstanceId,
    pub port: String,
    pub net_id: NetId,
    pub origin: PatternOrigin,
}

#[derive(Debug, Clone)]
pub struct AtomizedModule {
    pub id: ModuleId,
    pub name: String,
    pub file_id: FileId,
    pub port_order: Vec<NetId>,
    pub nets: IndexMap<NetId, AtomizedNet>,
    pub instances: IndexMap<InstanceId, AtomizedInstance>,
    pub endpoints: IndexMap<EndpointId, AtomizedEndpoint>,
}

impl AtomizedModule {
    pub fn new(id: ModuleId, name: impl Into<String>, file_id: FileId) -> Self {
        Self {
            id,
            name: name.into(),
            file_id,
            port_order: Vec::new(),
            nets: IndexMap::new(),
            instances: IndexMap::new(),
            endpoints: IndexMap::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct AtomizedProgram {
    pub modules: IndexMap<ModuleId, AtomizedModule>,
    pub devices: IndexMap<String, asdl_ast::DeviceDecl>,
}

impl AtomizedProgram {
    pub fn new() -> Self {
        Self::default()
    }
}
