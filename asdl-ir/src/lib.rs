//! IR data model shared across the lowering, view-binding, and rendering
//! stages: [`patterned`], [`atomized`], and [`netlist`] artifacts, plus the
//! [`ids`] allocation scheme that links them through provenance.

pub mod atomized;
pub mod ids;
pub mod netlist;
pub mod patterned;

pub use atomized::{AtomizedEndpoint, AtomizedInstance, AtomizedModule, AtomizedNet, AtomizedProgram, PatternOrigin};
pub use ids::{DeviceId, EndpointId, EntityId, ExprId, IdAllocator, InstanceId, ModuleId, NetId};
pub use netlist::{NetlistDesign, NetlistInstance, NetlistModule, NetlistNet, NetlistRef};
pub use patterned::{
    PatternedEndpoint, PatternedInstance, PatternedModule, PatternedNet, PatternedProgram,
    Registries, ResolvedRef,
};
