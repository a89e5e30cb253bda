//! # Session Engine
//!
//! One [`Engine`] per page. It owns the page tree and segment table, the
//! script registry, outbound flow control, the coalescing queue, resources
//! and alerts, and talks to the outside only through [`Transport`] and
//! [`Host`].
//!
//! ## Inbound
//!
//! `receive_block` acknowledges the previous outbound block, applies each
//! server message in order, reports broken segments and then flushes
//! whatever events queued up while the batch was applied. A message that
//! cannot be decoded stops the rest of its batch.
//!
//! ## Outbound
//!
//! Events go out through [`FlowControl`]. Posting any event first drains
//! the coalescing queue so queued values are never overtaken.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::host::{Host, Modal, Transport};
use crate::navigation::resolve_reload;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use trellis_dom::NodeId;
use trellis_messaging::{
    AlertBody, AlertStack, CoalescingQueue, DeterministicClock, FetchFormat, FetchRequest,
    FlowControl, ResourceRegistry,
};
use trellis_protocol::{
    names, EventRecord, NodeScripts, OutboundBlock, ProtocolError, ScriptCall, ServerMessage,
};
use trellis_segments::{ChangePipeline, PipelineReport, ScriptRegistry, SegmentStore};

pub struct Engine<T: Transport, H: Host> {
    config: EngineConfig,
    store: SegmentStore,
    scripts: ScriptRegistry,
    flow: FlowControl,
    coalescing: CoalescingQueue,
    clock: DeterministicClock,
    resources: ResourceRegistry,
    alerts: AlertStack,
    session_lost: bool,
    transport: T,
    host: H,
}

impl<T: Transport, H: Host> Engine<T, H> {
    /// Build an engine over `initial_content`. Segments are registered by
    /// [`Engine::initialise`].
    pub fn new(config: EngineConfig, initial_content: &str, transport: T, host: H) -> EngineResult<Self> {
        let mut store = SegmentStore::new(config.markers.clone());
        store.load_document(initial_content)?;

        Ok(Self {
            flow: FlowControl::new(config.max_inflight),
            coalescing: CoalescingQueue::new(config.coalesce_delay()),
            config,
            store,
            scripts: ScriptRegistry::new(),
            clock: DeterministicClock::new(),
            resources: ResourceRegistry::new(),
            alerts: AlertStack::new(),
            session_lost: false,
            transport,
            host,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &SegmentStore {
        &self.store
    }

    pub fn scripts_mut(&mut self) -> &mut ScriptRegistry {
        &mut self.scripts
    }

    pub fn flow(&self) -> &FlowControl {
        &self.flow
    }

    pub fn alerts(&self) -> &AlertStack {
        &self.alerts
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut ResourceRegistry {
        &mut self.resources
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Register the initial segments, run their initialisers, report broken
    /// markup, then run the document script
    pub fn initialise(&mut self, initialisers: &NodeScripts, doc_init_script: Option<&ScriptCall>) -> PipelineReport {
        info!(segments = self.store.len(), "initialising page");

        let mut pipeline = ChangePipeline::new(&mut self.store, &mut self.scripts);
        pipeline.register(&[]);
        pipeline.run_node_scripts(initialisers);
        let mut report = pipeline.finish();
        let events = std::mem::take(&mut report.events);
        self.post_records(events);

        self.report_broken_segments();

        if let Some(script) = doc_init_script {
            let mut pipeline = ChangePipeline::new(&mut self.store, &mut self.scripts);
            pipeline.run_document_script(script);
            let doc_report = pipeline.finish();
            report.scripts_run += doc_report.scripts_run;
            report.script_failures.extend(doc_report.script_failures);
            self.post_records(doc_report.events);
        }

        info!(registered = report.registered.len(), "page initialised");
        report
    }

    /// Apply one inbound batch of raw server messages
    pub fn receive_block(&mut self, messages: Vec<Value>) -> EngineResult<()> {
        self.apply_batch(messages.into_iter().map(ServerMessage::decode))
    }

    /// Apply an already-decoded batch
    pub fn receive_messages(&mut self, messages: Vec<ServerMessage>) -> EngineResult<()> {
        self.apply_batch(messages.into_iter().map(Ok))
    }

    fn apply_batch<I>(&mut self, messages: I) -> EngineResult<()>
    where
        I: Iterator<Item = Result<ServerMessage, ProtocolError>>,
    {
        self.flow.begin_receive();

        let mut outcome = Ok(());
        let mut applied = 0;
        for message in messages {
            match message {
                Ok(message) => {
                    self.dispatch(message);
                    applied += 1;
                }
                Err(violation) => {
                    error!(%violation, applied, "halting batch");
                    self.host.show_modal(Modal::ProtocolViolation {
                        msgtype: violation.msgtype().map(str::to_string),
                        reason: violation.to_string(),
                    });
                    outcome = Err(EngineError::Protocol(violation));
                    break;
                }
            }
        }
        debug!(applied, "batch applied");

        self.report_broken_segments();
        if let Some(block) = self.flow.end_receive() {
            self.transmit(block);
        }
        outcome
    }

    fn dispatch(&mut self, message: ServerMessage) {
        debug!(msgtype = message.msgtype(), "dispatching");
        match message {
            ServerMessage::ModifyPage { changes } => {
                let report = ChangePipeline::new(&mut self.store, &mut self.scripts).apply(&changes);
                debug!(
                    modified = report.modified.len(),
                    popups = report.popups.len(),
                    registered = report.registered.len(),
                    script_failures = report.script_failures.len(),
                    "page modified"
                );
                self.post_records(report.events);
            }
            ServerMessage::ExecuteJs { script } => {
                let mut pipeline = ChangePipeline::new(&mut self.store, &mut self.scripts);
                pipeline.run_document_script(&script);
                let report = pipeline.finish();
                self.post_records(report.events);
            }
            ServerMessage::AddDependencies { deps } => {
                for dependency in &deps {
                    self.host.add_dependency(dependency);
                }
            }
            ServerMessage::ResourceMessages { messages } => {
                for message in messages {
                    if let Err(failure) = self
                        .resources
                        .handle_message(&message.resource_id, &message.message)
                    {
                        warn!(resource_id = %message.resource_id, %failure, "resource message failed");
                        self.raise_alert(AlertBody::ClientError {
                            message: failure.to_string(),
                        });
                    }
                }
            }
            ServerMessage::ResourcesDisposed { resource_ids } => {
                for resource_id in &resource_ids {
                    if !self.resources.dispose(resource_id) {
                        debug!(resource_id = %resource_id, "disposing unknown resource");
                    }
                }
            }
            ServerMessage::InvalidPage => {
                if !self.session_lost {
                    self.session_lost = true;
                    error!("server lost track of this page");
                    self.host.show_modal(Modal::SessionLost);
                }
            }
            ServerMessage::ReloadPage(request) => {
                match resolve_reload(&self.host.current_location(), &request) {
                    Ok(navigation) => {
                        info!(?navigation, "navigating");
                        self.host.navigate(navigation);
                    }
                    Err(failure) => {
                        warn!(%failure, location = ?request.location, "cannot resolve reload target");
                        self.raise_alert(AlertBody::ClientError {
                            message: format!("Cannot navigate: {failure}"),
                        });
                    }
                }
            }
            ServerMessage::ErrorHandlingEvent(report) => {
                self.raise_alert(AlertBody::EventError(report));
            }
            ServerMessage::ErrorRetrievingResource(report) => {
                self.raise_alert(AlertBody::ResourceError(report));
            }
            ServerMessage::ErrorDuringUpdate(report) => {
                self.raise_alert(AlertBody::UpdateError(report));
            }
            ServerMessage::HtmlStructureFixes { fixes_by_model } => {
                let timestamp = self.host.now_millis();
                for fix_set in fixes_by_model {
                    self.alerts.push(AlertBody::StructureFixes(fix_set), timestamp);
                }
                self.host.alerts_changed(&self.alerts);
            }
        }
    }

    fn raise_alert(&mut self, body: AlertBody) {
        self.alerts.push(body, self.host.now_millis());
        self.host.alerts_changed(&self.alerts);
    }

    pub fn select_alert(&mut self, index: usize) -> bool {
        let changed = self.alerts.select(index);
        if changed {
            self.host.alerts_changed(&self.alerts);
        }
        changed
    }

    pub fn close_alerts(&mut self) {
        self.alerts.close();
        self.host.alerts_changed(&self.alerts);
    }

    fn report_broken_segments(&mut self) {
        let broken = self.store.take_broken();
        if !broken.is_empty() {
            warn!(?broken, "reporting broken segments");
            self.post_document_event(names::BROKEN_HTML_STRUCTURE, json!(broken));
        }
    }

    fn segment_id_or_warn(&mut self, node: NodeId, event_name: &str) -> Option<String> {
        match self.store.segment_id_for_node(node) {
            Some(segment_id) => Some(segment_id.to_string()),
            None => {
                warn!(event_name, ?node, "no segment owns the event source");
                if self.config.client_side_debugging {
                    self.raise_alert(AlertBody::UnattributedEvent {
                        event_name: event_name.to_string(),
                    });
                }
                None
            }
        }
    }

    /// Post an event from `node` on behalf of the segment that owns it.
    ///
    /// Returns false if no segment owns the node.
    pub fn post_event(&mut self, node: NodeId, event_name: &str, data: Value) -> bool {
        let Some(segment_id) = self.segment_id_or_warn(node, event_name) else {
            return false;
        };
        self.post_records(vec![EventRecord::segment(segment_id, event_name, data)]);
        true
    }

    pub fn post_document_event(&mut self, event_name: &str, data: Value) {
        self.post_records(vec![EventRecord::document(event_name, data)]);
    }

    /// Queue a latest-value-wins event. `producer` runs when the queue
    /// flushes, either after the coalescing delay or ahead of the next
    /// regular event.
    pub fn queue_coalesced_event<F>(&mut self, node: NodeId, event_name: &str, producer: F) -> bool
    where
        F: FnOnce() -> Value + Send + 'static,
    {
        let Some(segment_id) = self.segment_id_or_warn(node, event_name) else {
            return false;
        };
        self.coalescing
            .enqueue(&segment_id, event_name, Box::new(producer), self.clock.now());
        true
    }

    pub fn notify_popup_closed(&mut self, popup_id: &str) {
        self.post_document_event(names::NOTIFY_POPUP_CLOSED, json!(popup_id));
    }

    /// The page is going away
    pub fn close(&mut self) {
        self.post_document_event(names::CLOSE_PAGE, Value::Null);
    }

    pub fn fetch_resource(&mut self, resource_id: &str, format: FetchFormat) -> EngineResult<FetchRequest> {
        Ok(self.resources.fetch_request(resource_id, format)?)
    }

    pub fn send_resource_message(&mut self, resource_id: &str, message: Value) -> EngineResult<()> {
        let payload = self.resources.outgoing_message(resource_id, message)?;
        self.post_document_event(names::RESOURCE_MESSAGE, payload);
        Ok(())
    }

    /// When the coalescing queue wants to flush next
    pub fn next_deadline(&self) -> Option<Duration> {
        self.coalescing.deadline()
    }

    pub fn advance_clock(&mut self, dt: Duration) {
        self.clock.advance(dt);
        self.flush_due();
    }

    pub fn set_clock(&mut self, now: Duration) {
        self.clock.set(now);
        self.flush_due();
    }

    fn flush_due(&mut self) {
        if self.coalescing.is_due(self.clock.now()) {
            let events = self.coalescing.drain();
            debug!(events = events.len(), "flushing coalesced events");
            self.send(events);
        }
    }

    fn post_records(&mut self, records: Vec<EventRecord>) {
        if records.is_empty() {
            return;
        }
        let mut messages = self.coalescing.drain();
        messages.extend(records);
        self.send(messages);
    }

    fn send(&mut self, messages: Vec<EventRecord>) {
        if let Some(block) = self.flow.send_events(messages) {
            self.transmit(block);
        }
    }

    fn transmit(&mut self, block: OutboundBlock) {
        info!(
            id = block.id,
            messages = block.messages.len(),
            ack_immediately = block.ack_immediately,
            "sending block"
        );
        self.transport.send_block(block);
    }
}

impl<T: Transport, H: Host> std::fmt::Debug for Engine<T, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("segments", &self.store.len())
            .field("flow", &self.flow)
            .field("alerts", &self.alerts.len())
            .field("session_lost", &self.session_lost)
            .finish()
    }
}
