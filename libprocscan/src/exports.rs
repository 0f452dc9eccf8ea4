//! Exports map collaborator (§6): `name -> address` built during module scan
//! when `imp_rec` is requested.

use std::collections::HashMap;

/// Registers one module's exports under a qualified `module!export` key so
/// names don't collide across modules.
pub fn add(map: &mut HashMap<String, usize>, module_name: &str, export_name: &str, remote_base: usize, export_rva: u32) {
    map.insert(
        format!("{module_name}!{export_name}"),
        remote_base + export_rva as usize,
    );
}
