// ── Banned component fast path ──
//
// Deny-listed components are cleaned out of the registry without cooking or
// diffing. The banned notification itself is informational and fires
// whether or not anything was found.

use serde_json::Value;
use tracing::warn;

use crate::adapter::Adapter;
use crate::model::{AuxId, BanPhase, PermAddr, Transition};

use super::Mediator;

impl Mediator {
    /// An adapter reported a deny-listed device address.
    pub(super) fn banned_device(
        &self,
        adapter: &dyn Adapter,
        address: &PermAddr,
        phase: BanPhase,
        data: Value,
    ) {
        let adapter_name = adapter.name();

        if let Some(device) = self.store().device_by_net(adapter_name, address) {
            if let Some(id) = device.id {
                // Best-effort removal; a failure is logged and the banned
                // notification still goes out.
                if let Err(err) = self.store().unregister_device(id) {
                    warn!(adapter = adapter_name, %address, error = %err, "banned device removal failed");
                }
            }
        }

        self.bus().publish(Transition::DeviceBanned {
            phase,
            adapter: adapter_name.to_owned(),
            address: address.clone(),
            data,
        });
    }

    /// An adapter reported a deny-listed gadget.
    ///
    /// Cleanup funnels through the single gadget removal path rather than
    /// touching the store directly.
    pub(super) fn banned_gadget(
        &self,
        adapter: &dyn Adapter,
        address: &PermAddr,
        aux_id: &AuxId,
        phase: BanPhase,
        data: Value,
    ) {
        let adapter_name = adapter.name();

        if let Some(gadget) = self.store().gadget_by_net(adapter_name, address, aux_id) {
            self.gadget_leaving(adapter_name, &gadget);
        }

        self.bus().publish(Transition::GadgetBanned {
            phase,
            adapter: adapter_name.to_owned(),
            address: address.clone(),
            aux_id: aux_id.clone(),
            data,
        });
    }
}
