//! Stacked user notifications
//!
//! Several failures can surface at once. Rather than stacking modals they
//! queue up as pages; pushing selects the newest page and the user pages
//! through the rest.

use serde::Serialize;
use trellis_protocol::{
    EventErrorReport, ModelFixSet, ReportedFixKind, ResourceErrorReport, UpdateErrorReport,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertBody {
    EventError(EventErrorReport),
    ResourceError(ResourceErrorReport),
    UpdateError(UpdateErrorReport),
    StructureFixes(ModelFixSet),
    /// An event came from a node outside every segment
    UnattributedEvent { event_name: String },
    /// A client-side failure with no server report behind it
    ClientError { message: String },
}

impl AlertBody {
    pub fn headline(&self) -> String {
        match self {
            AlertBody::EventError(report) => match &report.event_seg_id {
                Some(_) => format!(
                    "Error handling event {}, sent from a segment belonging to an instance of {}, handled at a segment belonging to an instance of {}",
                    report.event_name,
                    report.event_model_type_name.as_deref().unwrap_or("?"),
                    report.handler_model_type_name.as_deref().unwrap_or("?"),
                ),
                None => format!("Error handling page event {}", report.event_name),
            },
            AlertBody::ResourceError(report) => format!(
                "Error retrieving resource associated with a segment belonging to an instance of {}",
                report.rsc_model_type_name.as_deref().unwrap_or("?")
            ),
            AlertBody::UpdateError(_) => "Error while updating after handling events".to_string(),
            AlertBody::StructureFixes(set) => format!(
                "The following HTML structure problems were detected in a presentation of a {}",
                set.model_type_name
            ),
            AlertBody::UnattributedEvent { event_name } => format!(
                "Unable to find the segment containing the element that raised {event_name}"
            ),
            AlertBody::ClientError { message } => message.clone(),
        }
    }

    /// Detail lines: fix descriptions for structure fixes, error markup
    /// for server reports
    pub fn details(&self) -> Vec<String> {
        match self {
            AlertBody::EventError(report) => vec![report.err_html.clone()],
            AlertBody::ResourceError(report) => vec![report.err_html.clone()],
            AlertBody::UpdateError(report) => vec![report.err_html.clone()],
            AlertBody::StructureFixes(set) => set
                .fixes
                .iter()
                .map(|fix| match fix.fix_type {
                    ReportedFixKind::CloseUnclosedTag => format!("Added missing end tag </{}>", fix.tag),
                    ReportedFixKind::DropCloseTagWithNoMatchingOpenTag => {
                        format!("Dropped orphan end tag </{}>", fix.tag)
                    }
                })
                .collect(),
            AlertBody::UnattributedEvent { .. } => vec![
                "This is likely due to tree manipulation moving the element outside the segment flow"
                    .to_string(),
            ],
            AlertBody::ClientError { .. } => Vec::new(),
        }
    }

    /// Segments a host may highlight while this alert is shown
    pub fn segment_ids(&self) -> Vec<&str> {
        match self {
            AlertBody::EventError(report) => report
                .event_seg_id
                .iter()
                .chain(report.handler_seg_id.iter())
                .map(String::as_str)
                .collect(),
            AlertBody::ResourceError(report) => report.rsc_seg_id.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub body: AlertBody,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default)]
pub struct AlertStack {
    alerts: Vec<Alert>,
    selected: Option<usize>,
}

impl AlertStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an alert raised at `timestamp` and select it
    pub fn push(&mut self, body: AlertBody, timestamp: i64) {
        self.alerts.push(Alert { body, timestamp });
        self.selected = Some(self.alerts.len() - 1);
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Page to alert `index`; out of range leaves the selection alone
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.alerts.len() {
            self.selected = Some(index);
            true
        } else {
            false
        }
    }

    pub fn current(&self) -> Option<&Alert> {
        self.selected.and_then(|i| self.alerts.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter()
    }

    /// The user dismissed the box: every page goes
    pub fn close(&mut self) {
        self.alerts.clear();
        self.selected = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_protocol::ReportedFix;

    fn client(message: &str) -> AlertBody {
        AlertBody::ClientError {
            message: message.to_string(),
        }
    }

    #[test]
    fn test_push_selects_newest() {
        let mut stack = AlertStack::new();
        stack.push(client("first"), 1_000);
        stack.push(client("second"), 2_000);

        assert_eq!(stack.len(), 2);
        assert_eq!(stack.selected(), Some(1));
        assert_eq!(stack.current().unwrap().body.headline(), "second");
        assert_eq!(stack.current().unwrap().timestamp, 2_000);

        assert!(stack.select(0));
        assert!(!stack.select(2));
        assert_eq!(stack.current().unwrap().body.headline(), "first");

        stack.close();
        assert!(stack.is_empty());
        assert!(stack.current().is_none());
    }

    #[test]
    fn test_structure_fix_details() {
        let body = AlertBody::StructureFixes(ModelFixSet {
            model_type_name: "Person".into(),
            fixes: vec![
                ReportedFix {
                    fix_type: ReportedFixKind::CloseUnclosedTag,
                    tag: "div".into(),
                },
                ReportedFix {
                    fix_type: ReportedFixKind::DropCloseTagWithNoMatchingOpenTag,
                    tag: "p".into(),
                },
            ],
        });

        assert!(body.headline().ends_with("a Person"));
        assert_eq!(
            body.details(),
            vec!["Added missing end tag </div>", "Dropped orphan end tag </p>"]
        );
    }

    #[test]
    fn test_page_event_error_has_no_segments() {
        let body = AlertBody::EventError(EventErrorReport {
            event_name: "unload".into(),
            event_seg_id: None,
            handler_seg_id: None,
            event_model_type_name: None,
            handler_model_type_name: None,
            err_html: "<pre>boom</pre>".into(),
        });
        assert_eq!(body.headline(), "Error handling page event unload");
        assert!(body.segment_ids().is_empty());
    }
}
