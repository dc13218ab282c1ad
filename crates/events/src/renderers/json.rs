//! JSON-lines renderer for hookrun events.
//!
//! Events go to stderr, one object per line, leaving stdout for the final
//! report document. This module is allowed to print as it's the output layer.

#![allow(clippy::print_stderr)]

use crate::bus::EventReceiver;
use crate::event::{EventCategory, HookrunEvent, SystemEvent};

/// JSON renderer that outputs events as JSON lines.
#[derive(Debug, Default)]
pub struct JsonRenderer {
    pretty: bool,
}

impl JsonRenderer {
    /// Create a new JSON renderer with compact output.
    #[must_use]
    pub const fn new() -> Self {
        Self { pretty: false }
    }

    /// Create a new JSON renderer with pretty-printed output.
    #[must_use]
    pub const fn pretty() -> Self {
        Self { pretty: true }
    }

    /// Consume events until a shutdown event arrives or the bus closes.
    pub async fn run(self, mut receiver: EventReceiver) {
        while let Some(event) = receiver.recv().await {
            if matches!(event.category, EventCategory::System(SystemEvent::Shutdown)) {
                break;
            }
            if let Some(line) = self.encode(&event) {
                eprintln!("{line}");
            }
        }
    }

    /// Encode a single event.
    #[must_use]
    pub fn encode(&self, event: &HookrunEvent) -> Option<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(event)
        } else {
            serde_json::to_string(event)
        };
        json.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventSource, RunEvent};
    use uuid::Uuid;

    #[test]
    fn test_encode_is_single_line_by_default() {
        let event = HookrunEvent::new(
            Uuid::new_v4(),
            EventSource::new("hookrun::run"),
            EventCategory::Run(RunEvent::Started {
                hook_count: 3,
                file_count: 9,
            }),
        );
        let line = JsonRenderer::new().encode(&event).unwrap();
        assert!(!line.contains('\n'));
        assert!(line.contains("\"hook_count\":3"));

        let pretty = JsonRenderer::pretty().encode(&event).unwrap();
        assert!(pretty.contains('\n'));
    }
}
