//! Resolving a [`NetlistRef`] back to its [`NetlistModule`]/[`DeviceDecl`]
//! definition within a design, shared by the verify pass and the renderer.

use asdl_ast::{DeviceDecl, FileId};
use asdl_ir::netlist::{NetlistDesign, NetlistModule, NetlistRef};

/// Resolve a module reference by `(name, file_id)`. `file_id` is always
/// the exact file the reference was resolved against back in C4 (§4.3);
/// ambiguous or unresolved references never survive to NetlistIR, so there
/// is no name-only fallback to perform here.
pub fn select_module<'a>(design: &'a NetlistDesign, name: &str, file_id: FileId) -> Option<&'a NetlistModule> {
    design.modules.iter().find(|m| m.name == name && m.file_id == file_id)
}

pub fn select_device<'a>(design: &'a NetlistDesign, name: &str) -> Option<&'a DeviceDecl> {
    design.devices.get(name)
}

/// Resolve whichever definition `reference` points at, module or device.
pub enum Resolved<'a> {
    Module(&'a NetlistModule),
    Device(&'a DeviceDecl),
}

pub fn select_reference<'a>(design: &'a NetlistDesign, reference: &NetlistRef) -> Option<Resolved<'a>> {
    match reference {
        NetlistRef::Module { name, file_id } => select_module(design, name, *file_id).map(Resolved::Module),
        NetlistRef::Device { name, .. } => select_device(design, name).map(Resolved::Device),
    }
}
