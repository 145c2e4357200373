//! PatternedGraph: the IR where names may still contain pattern
//! metacharacters (§3, §4.4).

use ahash::AHashMap;
use indexmap::IndexMap;

use asdl_ast::FileId;
use asdl_diagnostics::SourceSpan;
use asdl_pattern::PatternExpr;

use crate::ids::{EndpointId, EntityId, ExprId, InstanceId, ModuleId, NetId};

/// What an instance's `ref` token resolved to (§4.3/§4.4 step 3).
#[derive(Debug, Clone)]
pub enum ResolvedRef {
    Module { file_id: FileId, name: String },
    Device { file_id: FileId, name: String },
}

impl ResolvedRef {
    pub fn name(&self) -> &str {
        match self {
            ResolvedRef::Module { name, .. } => name,
            ResolvedRef::Device { name, .. } => name,
        }
    }

    pub fn file_id(&self) -> FileId {
        match self {
            ResolvedRef::Module { file_id, .. } => *file_id,
            ResolvedRef::Device { file_id, .. } => *file_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PatternedNet {
    pub id: NetId,
    pub name_expr: ExprId,
    pub is_port: bool,
}

#[derive(Debug, Clone)]
pub struct PatternedInstance {
    pub id: InstanceId,
    pub name_expr: ExprId,
    pub reference: ResolvedRef,
    /// param name → value-expression id, in authored order.
    pub params: IndexMap<String, ExprId>,
}

#[derive(Debug, Clone)]
pub struct PatternedEndpoint {
    pub id: EndpointId,
    pub net_id: NetId,
    pub expr: ExprId,
    pub suppressed: bool,
}

/// One module's worth of patterned entities (§3 "PatternedGraph").
#[derive(Debug, Clone)]
pub struct PatternedModule {
    pub id: ModuleId,
    pub name: String,
    pub file_id: FileId,
    pub nets: IndexMap<NetId, PatternedNet>,
    pub instances: IndexMap<InstanceId, PatternedInstance>,
    pub endpoints: IndexMap<EndpointId, PatternedEndpoint>,
    /// Nets declared with a leading `$`, in declaration order.
    pub port_order: Vec<NetId>,
}

impl PatternedModule {
    pub fn new(id: ModuleId, name: impl Into<String>, file_id: FileId) -> Self {
        Self {
            id,
            name: name.into(),
            file_id,
            nets: IndexMap::new(),
            instances: IndexMap::new(),
            endpoints: IndexMap::new(),
            port_order: Vec::new(),
        }
    }
}

/// Registries attached to the whole program (§3 "Registries").
#[derive(Debug, Default)]
pub struct Registries {
    pub pattern_expressions: AHashMap<ExprId, PatternExpr>,
    /// entity → (expression, segment index, token index) it was produced
    /// from, for provenance attribution during atomization.
    pub pattern_origins: AHashMap<EntityId, (ExprId, usize, usize)>,
    /// (instance, param name) → (expression, token index).
    pub param_pattern_origins: AHashMap<(InstanceId, String), (ExprId, usize)>,
    pub source_spans: AHashMap<EntityId, SourceSpan>,
    /// net → group slices used as schematic layout hints, kept opaque here.
    pub schematic_hints: AHashMap<NetId, Vec<(usize, usize)>>,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_expr(&mut self, id: ExprId, expr: PatternExpr) {
        self.pattern_expressions.insert(id, expr);
    }

    pub fn record_origin(&mut self, entity: EntityId, expr_id: ExprId, segment: usize, token: usize) {
        self.pattern_origins.insert(entity, (expr_id, segment, token));
    }

    pub fn record_span(&mut self, entity: EntityId, span: SourceSpan) {
        self.source_spans.insert(entity, span);
    }
}

/// A whole patterned program: every module plus pass-through device
/// declarations (devices aren't atomized themselves, only referenced by
/// name) and the program-wide registries.
#[derive(Debug, Default)]
pub struct PatternedProgram {
    pub modules: IndexMap<ModuleId, PatternedModule>,
    pub devices: IndexMap<String, asdl_ast::DeviceDecl>,
    pub registries: Registries,
}

impl PatternedProgram {
    pub fn new() -> Self {
        Self::default()
    }
}
