//! C7: AtomizedGraph → NetlistIR projection (§4.7).
//!
//! A deterministic, mechanical flattening: no business-rule validation
//! happens here (that is C9's job) beyond what's needed to build the IR at
//! all, e.g. skipping an endpoint whose instance atom vanished upstream.

use ahash::AHashMap;
use indexmap::IndexMap;

use asdl_ir::atomized::AtomizedProgram;
use asdl_ir::ids::InstanceId;
use asdl_ir::netlist::{NetlistDesign, NetlistInstance, NetlistModule, NetlistNet, NetlistRef};
use asdl_ir::patterned::ResolvedRef;

/// Project every module of `atomized` into a [`NetlistDesign`] rooted at
/// `entry_file_id`/`top`. Modules and devices are carried through in their
/// original declaration order (§4.7); this pass never fails, so it returns
/// the design directly rather than the `(Option<_>, Vec<Diagnostic>)` shape
/// used upstream.
pub fn project_netlist(
    atomized: &AtomizedProgram,
    entry_file_id: asdl_ast::FileId,
    top: Option<String>,
) -> NetlistDesign {
    log::trace!("projecting {} module(s) into NetlistIR, top={top:?}", atomized.modules.len());
    let mut design = NetlistDesign::new(entry_file_id);
    design.top = top;
    design.devices = atomized.devices.clone();

    for module in atomized.modules.values() {
        let mut instances: IndexMap<InstanceId, NetlistInstance> = module
            .instances
            .iter()
            .map(|(id, instance)| {
                let reference = match &instance.reference {
                    ResolvedRef::Module { name, file_id } => NetlistRef::Module {
                        name: name.clone(),
                        file_id: *file_id,
                    },
                    ResolvedRef::Device { name, .. } => NetlistRef::Device {
                        name: name.clone(),
                        backend: instance.params.get("backend").map(|(v, _)| v.clone()),
                    },
                };
                let params: IndexMap<String, String> = instance
                    .params
                    .iter()
                    .filter(|(key, _)| key.as_str() != "backend")
                    .map(|(key, (value, _))| (key.clone(), value.clone()))
                    .collect();
                (
                    *id,
                    NetlistInstance {
                        name: instance.name.clone(),
                        reference,
                        conns: IndexMap::new(),
                        params,
                        origin: instance.origin.clone(),
                    },
                )
            })
            .collect();

        // nets' conns are derived from atomized endpoints, visited in
        // endpoint-id (i.e. declaration) order, and attached to the owning
        // instance rather than the net (§4.7 "each net's conns list
        // enumerates (port, net_name) pairs... belonging to instances").
        let net_name: AHashMap<_, _> = module.nets.iter().map(|(id, net)| (*id, net.name.clone())).collect();
        for endpoint in module.endpoints.values() {
            let Some(name) = net_name.get(&endpoint.net_id) else {
                continue;
            };
            if let Some(instance) = instances.get_mut(&endpoint.inst_id) {
                instance.conns.insert(endpoint.port.clone(), name.clone());
            }
        }

        let nets = module
            .nets
            .values()
            .map(|net| NetlistNet {
                name: net.name.clone(),
                is_port: net.is_port,
            })
            .collect();

        design.modules.push(NetlistModule {
            name: module.name.clone(),
            file_id: module.file_id,
            port_order: module
                .port_order
                .iter()
                .filter_map(|id| module.nets.get(id).map(|n| n.name.clone()))
                .collect(),
            instances: instances.into_values().collect(),
            nets,
        });
    }

    design
}
