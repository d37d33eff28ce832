//! Structured span definitions for lifecycle tracing.

use std::time::Instant;
use tracing::{Level, Span, field, span};

use crate::plugins::{LifecyclePhase, OpaqueId};

/// Span around one lifecycle hook invocation.
pub struct LifecycleSpan {
    span: Span,
    start: Instant,
}

impl LifecycleSpan {
    pub fn new(phase: LifecyclePhase, plugin: &str, opaque_id: OpaqueId) -> Self {
        let span = match phase {
            LifecyclePhase::Setup => span!(
                Level::INFO,
                "plugin.setup",
                plugin = plugin,
                opaque_id = %opaque_id,
                outcome = field::Empty,
                duration_ms = field::Empty,
            ),
            LifecyclePhase::Start => span!(
                Level::INFO,
                "plugin.start",
                plugin = plugin,
                opaque_id = %opaque_id,
                outcome = field::Empty,
                duration_ms = field::Empty,
            ),
            LifecyclePhase::Stop => span!(
                Level::INFO,
                "plugin.stop",
                plugin = plugin,
                opaque_id = %opaque_id,
                outcome = field::Empty,
                duration_ms = field::Empty,
            ),
        };
        Self {
            span,
            start: Instant::now(),
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn finish(self, outcome: &'static str) {
        let duration_ms = self.start.elapsed().as_millis() as u64;
        self.span.record("outcome", outcome);
        self.span.record("duration_ms", duration_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_span() {
        let span = LifecycleSpan::new(LifecyclePhase::Setup, "order-0", OpaqueId::new());
        span.finish("ok");
    }
}
