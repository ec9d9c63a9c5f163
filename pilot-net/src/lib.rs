//! Built-in communicator plugins for the pilot communication manager
//! (spec.md §4.H). Selected at startup by the `COMMUNICATOR_PLUGIN`
//! environment variable, grounded on
//! `original_source/.../communicationmanager.py::get_plugin_confs`.

pub mod act;
pub mod harvester_sharefile;
pub mod panda;

use pilot_core::comm::CommunicatorPlugin;

/// Builds the communicator plugin selected via `COMMUNICATOR_PLUGIN`
/// (`act`, `harvestersf`, or unset/anything else → the Panda default).
pub fn plugin_from_env(endpoint: impl Into<String>) -> Box<dyn CommunicatorPlugin> {
    match std::env::var("COMMUNICATOR_PLUGIN").as_deref() {
        Ok("act") => Box::new(act::ActCommunicator::new(endpoint.into())),
        Ok("harvestersf") => Box::new(harvester_sharefile::HarvesterShareFileCommunicator::new(endpoint.into())),
        _ => Box::new(panda::PandaCommunicator::new(endpoint.into())),
    }
}
