// Mediator behavior tests: arrival idempotence, device-before-gadget
// ordering, diff-gated change emission, cascaded removal, and the banned
// fast path, driven through a scripted mock adapter.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::sync::broadcast;

use gridlink_core::{
    Adapter, AdapterEvent, AttrMap, AuxId, Device, DeviceTransform, EventBus, EventKind, Gadget,
    GadgetTransform, LifecycleChange, Mediator, MediatorConfig, NetStatus, PermAddr,
    RegistryStore, RemovalMode, TransformError, WireEvent,
};

// ── Mock adapter ────────────────────────────────────────────────────

/// Transform that copies `net` / `attrs` / `panel` sections out of the raw
/// JSON payload, optionally sleeping first. A `fail` key makes it error.
#[derive(Clone, Default)]
struct Cook {
    delay: Duration,
}

#[async_trait]
impl DeviceTransform for Cook {
    async fn cook(&self, mut draft: Device, raw: &Value) -> Result<Device, TransformError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if raw.get("fail").is_some() {
            return Err(TransformError::new("device cook failed"));
        }
        if let Some(net) = raw.get("net").and_then(Value::as_object) {
            draft.net = net.clone();
        }
        if let Some(attrs) = raw.get("attrs").and_then(Value::as_object) {
            draft.attrs = attrs.clone();
        }
        Ok(draft)
    }
}

#[async_trait]
impl GadgetTransform for Cook {
    async fn cook(&self, mut draft: Gadget, raw: &Value) -> Result<Gadget, TransformError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if raw.get("fail").is_some() {
            return Err(TransformError::new("gadget cook failed"));
        }
        if let Some(panel) = raw.get("panel").and_then(Value::as_object) {
            draft.panel = panel.clone();
        }
        if let Some(attrs) = raw.get("attrs").and_then(Value::as_object) {
            draft.attrs = attrs.clone();
        }
        Ok(draft)
    }
}

struct MockAdapter {
    name: &'static str,
    joinable: AtomicBool,
    device_cook: Option<Cook>,
    gadget_cook: Option<Cook>,
}

impl MockAdapter {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            joinable: AtomicBool::new(true),
            device_cook: Some(Cook::default()),
            gadget_cook: Some(Cook::default()),
        }
    }

    fn with_device_delay(mut self, delay: Duration) -> Self {
        self.device_cook = Some(Cook { delay });
        self
    }

    fn without_device_cook(mut self) -> Self {
        self.device_cook = None;
        self
    }

    fn without_gadget_cook(mut self) -> Self {
        self.gadget_cook = None;
        self
    }

    fn sealed(self) -> Self {
        self.joinable.store(false, Ordering::Relaxed);
        self
    }
}

impl Adapter for MockAdapter {
    fn name(&self) -> &str {
        self.name
    }

    fn permits_join(&self) -> bool {
        self.joinable.load(Ordering::Relaxed)
    }

    fn device_transform(&self) -> Option<&dyn DeviceTransform> {
        self.device_cook.as_ref().map(|c| c as &dyn DeviceTransform)
    }

    fn gadget_transform(&self) -> Option<&dyn GadgetTransform> {
        self.gadget_cook.as_ref().map(|c| c as &dyn GadgetTransform)
    }
}

// ── Harness ─────────────────────────────────────────────────────────

fn rig(config: MediatorConfig) -> (Arc<Mediator>, broadcast::Receiver<Arc<WireEvent>>) {
    let store = Arc::new(RegistryStore::new());
    let bus = EventBus::new(64);
    let wire_rx = bus.subscribe_wire();
    (Arc::new(Mediator::new(store, bus, config)), wire_rx)
}

fn drain(rx: &mut broadcast::Receiver<Arc<WireEvent>>) -> Vec<Arc<WireEvent>> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn kinds(events: &[Arc<WireEvent>]) -> Vec<EventKind> {
    events.iter().map(|e| e.kind).collect()
}

fn count(events: &[Arc<WireEvent>], kind: EventKind) -> usize {
    events.iter().filter(|e| e.kind == kind).count()
}

fn addr() -> PermAddr {
    PermAddr::new("00:11")
}

fn attrs(value: Value) -> AttrMap {
    value.as_object().cloned().unwrap_or_default()
}

fn device_incoming(adapter: &Arc<MockAdapter>, raw: Value) -> AdapterEvent {
    AdapterEvent::DeviceIncoming {
        adapter: Arc::clone(adapter) as Arc<dyn Adapter>,
        address: addr(),
        raw,
    }
}

fn gadget_incoming(adapter: &Arc<MockAdapter>, aux: &str, raw: Value) -> AdapterEvent {
    AdapterEvent::GadgetIncoming {
        adapter: Arc::clone(adapter) as Arc<dyn Adapter>,
        address: addr(),
        aux_id: AuxId::new(aux),
        raw,
    }
}

// ── Device lifecycle ────────────────────────────────────────────────

#[tokio::test]
async fn unknown_device_arrival_registers_once_and_online() {
    let (mediator, mut rx) = rig(MediatorConfig::default());
    let adapter = Arc::new(MockAdapter::new("zig-net"));

    mediator
        .handle(device_incoming(&adapter, json!({"net": {"status": "online"}})))
        .await;

    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::DeviceArrived), 1);
    assert_eq!(events.len(), 1, "arrival is the only derived event");

    let device = mediator.store().device_by_net("zig-net", &addr()).expect("registered");
    assert!(device.id.is_some());
    assert!(device.enabled);
    assert_eq!(device.status(), NetStatus::Online);
    assert_eq!(events[0].id, device.id);
}

#[tokio::test]
async fn second_incoming_is_a_reconnection_not_an_arrival() {
    let (mediator, mut rx) = rig(MediatorConfig::default());
    let adapter = Arc::new(MockAdapter::new("zig-net"));

    mediator
        .handle(device_incoming(&adapter, json!({"attrs": {"fw": "1.0"}})))
        .await;
    drain(&mut rx);

    mediator
        .handle(device_incoming(&adapter, json!({"attrs": {"fw": "1.1"}})))
        .await;

    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::DeviceArrived), 0);
    assert_eq!(count(&events, EventKind::DeviceAttrsChanged), 1);
    assert_eq!(mediator.store().device_count(), 1);
}

#[tokio::test]
async fn attrs_changed_fires_iff_values_differ() {
    // The distilled scenario: temp 20, temp 20 again, then temp 21.
    let (mediator, mut rx) = rig(MediatorConfig::default());
    let adapter = Arc::new(MockAdapter::new("zig-net"));

    mediator.handle(device_incoming(&adapter, json!({}))).await;
    drain(&mut rx);

    mediator
        .handle(device_incoming(&adapter, json!({"attrs": {"temp": 20}})))
        .await;
    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::DeviceAttrsChanged), 1);

    mediator
        .handle(device_incoming(&adapter, json!({"attrs": {"temp": 20}})))
        .await;
    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::DeviceAttrsChanged), 0, "equal values are a no-op");

    mediator
        .handle(device_incoming(&adapter, json!({"attrs": {"temp": 21}})))
        .await;
    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::DeviceAttrsChanged), 1);
    let changed = events
        .iter()
        .find(|e| e.kind == EventKind::DeviceAttrsChanged)
        .expect("attrs-changed present");
    assert_eq!(changed.data, json!({"temp": 21}));
}

#[tokio::test]
async fn unknown_device_is_dropped_when_join_not_permitted() {
    let (mediator, mut rx) = rig(MediatorConfig::default());
    let adapter = Arc::new(MockAdapter::new("zig-net").sealed());

    mediator.handle(device_incoming(&adapter, json!({}))).await;

    assert!(drain(&mut rx).is_empty());
    assert_eq!(mediator.store().device_count(), 0);
}

#[tokio::test]
async fn missing_device_transform_reports_error_and_drops() {
    let (mediator, mut rx) = rig(MediatorConfig::default());
    let adapter = Arc::new(MockAdapter::new("zig-net").without_device_cook());

    mediator.handle(device_incoming(&adapter, json!({}))).await;

    let events = drain(&mut rx);
    assert_eq!(kinds(&events), vec![EventKind::Error]);
    assert_eq!(mediator.store().device_count(), 0);
}

#[tokio::test]
async fn transform_failure_reports_error_without_mutation() {
    let (mediator, mut rx) = rig(MediatorConfig::default());
    let adapter = Arc::new(MockAdapter::new("zig-net"));

    mediator
        .handle(device_incoming(&adapter, json!({"fail": true})))
        .await;

    let events = drain(&mut rx);
    assert_eq!(kinds(&events), vec![EventKind::Error]);
    assert_eq!(mediator.store().device_count(), 0);
}

#[tokio::test]
async fn departure_flips_offline_and_keeps_the_record() {
    let (mediator, mut rx) = rig(MediatorConfig::default());
    let adapter = Arc::new(MockAdapter::new("zig-net"));

    mediator.handle(device_incoming(&adapter, json!({}))).await;
    drain(&mut rx);

    mediator
        .handle(AdapterEvent::DeviceLeaving {
            adapter: Arc::clone(&adapter) as Arc<dyn Adapter>,
            address: addr(),
            removal: RemovalMode::Departed,
        })
        .await;

    let events = drain(&mut rx);
    assert_eq!(
        kinds(&events),
        vec![EventKind::DeviceNetChanged, EventKind::DeviceStatusChanged],
        "offline flip flows through the diff path"
    );

    let device = mediator.store().device_by_net("zig-net", &addr()).expect("retained");
    assert_eq!(device.status(), NetStatus::Offline);
}

#[tokio::test]
async fn manual_leaving_cascades_gadgets_then_removes_device() {
    let (mediator, mut rx) = rig(MediatorConfig::default());
    let adapter = Arc::new(MockAdapter::new("zig-net"));

    mediator.handle(device_incoming(&adapter, json!({}))).await;
    mediator.handle(gadget_incoming(&adapter, "temp/0", json!({}))).await;
    mediator.handle(gadget_incoming(&adapter, "temp/1", json!({}))).await;
    drain(&mut rx);
    assert_eq!(mediator.store().gadget_count(), 2);

    mediator
        .handle(AdapterEvent::DeviceLeaving {
            adapter: Arc::clone(&adapter) as Arc<dyn Adapter>,
            address: addr(),
            removal: RemovalMode::Removed,
        })
        .await;

    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::GadgetLeft), 2);
    assert_eq!(count(&events, EventKind::DeviceLeft), 1);

    // gadget cascade completes before the device removal outcome
    let device_left_pos = events
        .iter()
        .position(|e| e.kind == EventKind::DeviceLeft)
        .expect("device left");
    let last_gadget_pos = events
        .iter()
        .rposition(|e| e.kind == EventKind::GadgetLeft)
        .expect("gadgets left");
    assert!(last_gadget_pos < device_left_pos);

    assert_eq!(mediator.store().device_count(), 0);
    assert_eq!(mediator.store().gadget_count(), 0);
}

#[tokio::test]
async fn leaving_unknown_device_is_a_noop() {
    let (mediator, mut rx) = rig(MediatorConfig::default());
    let adapter = Arc::new(MockAdapter::new("zig-net"));

    mediator
        .handle(AdapterEvent::DeviceLeaving {
            adapter: Arc::clone(&adapter) as Arc<dyn Adapter>,
            address: addr(),
            removal: RemovalMode::Removed,
        })
        .await;

    assert!(drain(&mut rx).is_empty());
}

// ── Status / net propagation ────────────────────────────────────────

#[tokio::test]
async fn net_change_with_status_emits_both_events_in_order() {
    let (mediator, mut rx) = rig(MediatorConfig::default());
    let adapter = Arc::new(MockAdapter::new("zig-net"));

    mediator.handle(device_incoming(&adapter, json!({}))).await;
    drain(&mut rx);

    mediator
        .handle(AdapterEvent::DeviceNetChanging {
            adapter: Arc::clone(&adapter) as Arc<dyn Adapter>,
            address: addr(),
            delta: attrs(json!({"status": "offline", "parent": "0x0"})),
        })
        .await;

    let events = drain(&mut rx);
    assert_eq!(
        kinds(&events),
        vec![EventKind::DeviceNetChanged, EventKind::DeviceStatusChanged]
    );
    assert_eq!(events[1].data, json!({"status": "offline"}));
}

#[tokio::test]
async fn net_change_without_status_stays_generic() {
    let (mediator, mut rx) = rig(MediatorConfig::default());
    let adapter = Arc::new(MockAdapter::new("zig-net"));

    mediator.handle(device_incoming(&adapter, json!({}))).await;
    drain(&mut rx);

    mediator
        .handle(AdapterEvent::DeviceNetChanging {
            adapter: Arc::clone(&adapter) as Arc<dyn Adapter>,
            address: addr(),
            delta: attrs(json!({"parent": "0x0"})),
        })
        .await;

    let events = drain(&mut rx);
    assert_eq!(kinds(&events), vec![EventKind::DeviceNetChanged]);
}

#[tokio::test]
async fn device_reporting_forces_online_and_diffs_attrs() {
    let (mediator, mut rx) = rig(MediatorConfig::default());
    let adapter = Arc::new(MockAdapter::new("zig-net"));

    mediator.handle(device_incoming(&adapter, json!({}))).await;
    mediator
        .handle(AdapterEvent::DeviceLeaving {
            adapter: Arc::clone(&adapter) as Arc<dyn Adapter>,
            address: addr(),
            removal: RemovalMode::Departed,
        })
        .await;
    drain(&mut rx);

    mediator
        .handle(AdapterEvent::DeviceReporting {
            adapter: Arc::clone(&adapter) as Arc<dyn Adapter>,
            address: addr(),
            attrs: attrs(json!({"temp": 20})),
        })
        .await;

    let events = drain(&mut rx);
    // offline -> online flip, raw delivery, then the attrs diff
    assert_eq!(
        kinds(&events),
        vec![
            EventKind::DeviceNetChanged,
            EventKind::DeviceStatusChanged,
            EventKind::DeviceReporting,
            EventKind::DeviceAttrsChanged,
        ]
    );

    let device = mediator.store().device_by_net("zig-net", &addr()).expect("device");
    assert_eq!(device.status(), NetStatus::Online);
}

// ── Gadget arrival ordering ─────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn gadget_waits_for_pending_device_registration() {
    let (mediator, mut rx) = rig(MediatorConfig::default());
    let adapter =
        Arc::new(MockAdapter::new("zig-net").with_device_delay(Duration::from_millis(100)));

    let dev = mediator.handle(device_incoming(&adapter, json!({})));
    let gad = mediator.handle(gadget_incoming(&adapter, "temp/0", json!({})));
    tokio::join!(dev, gad);

    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::DeviceArrived), 1);
    assert_eq!(count(&events, EventKind::GadgetArrived), 1);

    let device = mediator.store().device_by_net("zig-net", &addr()).expect("device");
    let gadget = mediator
        .store()
        .gadget_by_net("zig-net", &addr(), &AuxId::new("temp/0"))
        .expect("gadget registered after the device");
    assert_eq!(gadget.device_id, device.id);
}

#[tokio::test(start_paused = true)]
async fn gadget_is_discarded_when_the_wait_budget_elapses() {
    let config = MediatorConfig {
        registration_wait: Duration::from_millis(50),
    };
    let (mediator, mut rx) = rig(config);
    let adapter =
        Arc::new(MockAdapter::new("zig-net").with_device_delay(Duration::from_millis(200)));

    let dev = mediator.handle(device_incoming(&adapter, json!({})));
    let gad = mediator.handle(gadget_incoming(&adapter, "temp/0", json!({})));
    tokio::join!(dev, gad);

    let events = drain(&mut rx);
    // the device still arrives; the gadget event vanished without an error
    assert_eq!(count(&events, EventKind::DeviceArrived), 1);
    assert_eq!(count(&events, EventKind::GadgetArrived), 0);
    assert_eq!(count(&events, EventKind::Error), 0);
    assert_eq!(mediator.store().gadget_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn gadget_wait_is_pending_until_the_device_registers() {
    let (mediator, mut rx) = rig(MediatorConfig::default());
    let adapter =
        Arc::new(MockAdapter::new("zig-net").with_device_delay(Duration::from_millis(100)));

    let mut dev = tokio_test::task::spawn(mediator.handle(device_incoming(&adapter, json!({}))));
    assert!(dev.poll().is_pending(), "device cook still running");

    let mut gad =
        tokio_test::task::spawn(mediator.handle(gadget_incoming(&adapter, "temp/0", json!({}))));
    assert!(gad.poll().is_pending(), "gadget must not register first");
    assert_eq!(mediator.store().gadget_count(), 0);

    tokio::time::advance(Duration::from_millis(100)).await;
    assert!(dev.poll().is_ready());
    assert!(gad.poll().is_ready());

    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::DeviceArrived), 1);
    assert_eq!(count(&events, EventKind::GadgetArrived), 1);
}

#[tokio::test]
async fn gadget_without_known_or_pending_device_is_dropped() {
    let (mediator, mut rx) = rig(MediatorConfig::default());
    let adapter = Arc::new(MockAdapter::new("zig-net"));

    mediator.handle(gadget_incoming(&adapter, "temp/0", json!({}))).await;

    assert!(drain(&mut rx).is_empty());
    assert_eq!(mediator.store().gadget_count(), 0);
}

#[tokio::test]
async fn missing_gadget_transform_reports_error() {
    let (mediator, mut rx) = rig(MediatorConfig::default());
    let adapter = Arc::new(MockAdapter::new("zig-net").without_gadget_cook());

    mediator.handle(device_incoming(&adapter, json!({}))).await;
    drain(&mut rx);

    mediator.handle(gadget_incoming(&adapter, "temp/0", json!({}))).await;

    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::Error), 1);
    assert_eq!(mediator.store().gadget_count(), 0);
}

#[tokio::test]
async fn second_gadget_incoming_refreshes_in_place() {
    let (mediator, mut rx) = rig(MediatorConfig::default());
    let adapter = Arc::new(MockAdapter::new("zig-net"));

    mediator.handle(device_incoming(&adapter, json!({}))).await;
    mediator
        .handle(gadget_incoming(&adapter, "temp/0", json!({"panel": {"class": "sensor"}})))
        .await;
    drain(&mut rx);

    mediator
        .handle(gadget_incoming(&adapter, "temp/0", json!({"panel": {"class": "thermostat"}})))
        .await;

    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::GadgetArrived), 0);
    assert_eq!(count(&events, EventKind::GadgetPanelChanged), 1);
    assert_eq!(mediator.store().gadget_count(), 1);
}

// ── Gadget reporting ────────────────────────────────────────────────

#[tokio::test]
async fn replace_mode_reporting_is_diff_gated() {
    let (mediator, mut rx) = rig(MediatorConfig::default());
    let adapter = Arc::new(MockAdapter::new("zig-net"));

    mediator.handle(device_incoming(&adapter, json!({}))).await;
    mediator.handle(gadget_incoming(&adapter, "temp/0", json!({}))).await;
    drain(&mut rx);

    let report = |payload: Value, append: bool| AdapterEvent::GadgetReporting {
        adapter: Arc::clone(&adapter) as Arc<dyn Adapter>,
        address: addr(),
        aux_id: AuxId::new("temp/0"),
        attrs: attrs(payload),
        append,
    };

    mediator.handle(report(json!({"temp": 20}), false)).await;
    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::GadgetReporting), 1);
    assert_eq!(count(&events, EventKind::GadgetAttrsChanged), 1);

    mediator.handle(report(json!({"temp": 20}), false)).await;
    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::GadgetReporting), 1, "raw delivery always fires");
    assert_eq!(count(&events, EventKind::GadgetAttrsChanged), 0, "no diff, no change event");
}

#[tokio::test]
async fn append_mode_reporting_always_announces() {
    let (mediator, mut rx) = rig(MediatorConfig::default());
    let adapter = Arc::new(MockAdapter::new("zig-net"));

    mediator.handle(device_incoming(&adapter, json!({}))).await;
    mediator
        .handle(gadget_incoming(&adapter, "temp/0", json!({"attrs": {"temp": 20}})))
        .await;
    drain(&mut rx);

    mediator
        .handle(AdapterEvent::GadgetReporting {
            adapter: Arc::clone(&adapter) as Arc<dyn Adapter>,
            address: addr(),
            aux_id: AuxId::new("temp/0"),
            attrs: attrs(json!({"temp": 99, "hum": 40})),
            append: true,
        })
        .await;

    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::GadgetAttrsChanged), 1, "append is always-meaningful");

    // existing keys kept their values; only the new key landed
    let gadget = mediator
        .store()
        .gadget_by_net("zig-net", &addr(), &AuxId::new("temp/0"))
        .expect("gadget");
    assert_eq!(gadget.attrs.get("temp"), Some(&json!(20)));
    assert_eq!(gadget.attrs.get("hum"), Some(&json!(40)));
}

// ── Banned fast path ────────────────────────────────────────────────

#[tokio::test]
async fn banned_device_is_removed_and_always_notified() {
    let (mediator, mut rx) = rig(MediatorConfig::default());
    let adapter = Arc::new(MockAdapter::new("zig-net"));

    mediator.handle(device_incoming(&adapter, json!({}))).await;
    drain(&mut rx);

    mediator
        .handle(AdapterEvent::BannedDeviceIncoming {
            adapter: Arc::clone(&adapter) as Arc<dyn Adapter>,
            address: addr(),
            raw: json!({"mfr": "acme"}),
        })
        .await;

    let events = drain(&mut rx);
    assert_eq!(kinds(&events), vec![EventKind::DeviceBannedIncoming]);
    assert_eq!(mediator.store().device_count(), 0);

    // unknown address: still notified, nothing to remove
    mediator
        .handle(AdapterEvent::BannedDeviceReporting {
            adapter: Arc::clone(&adapter) as Arc<dyn Adapter>,
            address: PermAddr::new("ff:ff"),
            attrs: attrs(json!({"temp": 1})),
        })
        .await;

    let events = drain(&mut rx);
    assert_eq!(kinds(&events), vec![EventKind::DeviceBannedReporting]);
}

#[tokio::test]
async fn banned_gadget_funnels_through_the_leaving_cascade() {
    let (mediator, mut rx) = rig(MediatorConfig::default());
    let adapter = Arc::new(MockAdapter::new("zig-net"));

    mediator.handle(device_incoming(&adapter, json!({}))).await;
    mediator.handle(gadget_incoming(&adapter, "temp/0", json!({}))).await;
    drain(&mut rx);

    mediator
        .handle(AdapterEvent::BannedGadgetIncoming {
            adapter: Arc::clone(&adapter) as Arc<dyn Adapter>,
            address: addr(),
            aux_id: AuxId::new("temp/0"),
            raw: json!({}),
        })
        .await;

    let events = drain(&mut rx);
    assert_eq!(
        kinds(&events),
        vec![EventKind::GadgetLeft, EventKind::GadgetBannedIncoming]
    );
    assert_eq!(mediator.store().gadget_count(), 0);

    // the owner's gadget table no longer references it
    let device = mediator.store().device_by_net("zig-net", &addr()).expect("device");
    assert!(device.gadgets.is_empty());
}

// ── Props propagation ───────────────────────────────────────────────

#[tokio::test]
async fn props_updates_are_replace_diffed() {
    let (mediator, mut rx) = rig(MediatorConfig::default());
    let adapter = Arc::new(MockAdapter::new("zig-net"));

    mediator.handle(device_incoming(&adapter, json!({}))).await;
    drain(&mut rx);

    let id = mediator
        .store()
        .device_by_net("zig-net", &addr())
        .and_then(|d| d.id)
        .expect("device id");

    mediator
        .set_device_props(id, attrs(json!({"name": "hall router"})))
        .expect("props update");
    let events = drain(&mut rx);
    assert_eq!(kinds(&events), vec![EventKind::DevicePropsChanged]);
    assert_eq!(events[0].data, json!({"name": "hall router"}));

    // identical replace: nothing changed, nothing published
    mediator
        .set_device_props(id, attrs(json!({"name": "hall router"})))
        .expect("props update");
    assert!(drain(&mut rx).is_empty());

    // removed keys surface as null in the delta
    mediator.set_device_props(id, attrs(json!({}))).expect("props update");
    let events = drain(&mut rx);
    assert_eq!(kinds(&events), vec![EventKind::DevicePropsChanged]);
    assert_eq!(events[0].data, json!({"name": null}));
}

// ── Lifecycle passthrough ───────────────────────────────────────────

#[tokio::test]
async fn lifecycle_events_pass_through_unchanged() {
    let (mediator, mut rx) = rig(MediatorConfig::default());
    let adapter = Arc::new(MockAdapter::new("zig-net"));

    mediator
        .handle(AdapterEvent::Lifecycle {
            adapter: Arc::clone(&adapter) as Arc<dyn Adapter>,
            change: LifecycleChange::PermitJoin { time_left_secs: 60 },
        })
        .await;

    let events = drain(&mut rx);
    assert_eq!(kinds(&events), vec![EventKind::AdapterPermitJoin]);
    assert_eq!(events[0].data, json!({"timeLeft": 60}));
    assert_eq!(events[0].adapter, "zig-net");
}
