//! In-memory transport and host that record everything they are asked to do

use crate::host::{Host, Modal, Transport};
use crate::navigation::Navigation;
use trellis_messaging::AlertStack;
use trellis_protocol::OutboundBlock;
use url::Url;

#[derive(Debug, Default, Clone)]
pub struct RecordingTransport {
    pub blocks: Vec<OutboundBlock>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&mut self) -> Vec<OutboundBlock> {
        std::mem::take(&mut self.blocks)
    }
}

impl Transport for RecordingTransport {
    fn send_block(&mut self, block: OutboundBlock) {
        self.blocks.push(block);
    }
}

#[derive(Debug, Clone)]
pub struct RecordingHost {
    pub location: Url,
    pub navigations: Vec<Navigation>,
    pub modals: Vec<Modal>,
    pub dependencies: Vec<String>,
    /// Alert count each time the stack changed
    pub alert_updates: Vec<usize>,
    /// Reported as the wall clock
    pub clock_ms: i64,
}

impl RecordingHost {
    pub fn new(location: Url) -> Self {
        Self {
            location,
            navigations: Vec::new(),
            modals: Vec::new(),
            dependencies: Vec::new(),
            alert_updates: Vec::new(),
            clock_ms: 0,
        }
    }
}

impl Host for RecordingHost {
    fn current_location(&self) -> Url {
        self.location.clone()
    }

    fn navigate(&mut self, navigation: Navigation) {
        self.navigations.push(navigation);
    }

    fn show_modal(&mut self, modal: Modal) {
        self.modals.push(modal);
    }

    fn add_dependency(&mut self, dependency: &str) {
        self.dependencies.push(dependency.to_string());
    }

    fn alerts_changed(&mut self, alerts: &AlertStack) {
        self.alert_updates.push(alerts.len());
    }

    fn now_millis(&self) -> i64 {
        self.clock_ms
    }
}
