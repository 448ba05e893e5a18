use crate::features::audit::repo::AuditSink;
use crate::shared::types::RequestContext;
use opsorch_core::AuditEntry;
use std::sync::Arc;

pub struct AuditService {
    sink: Arc<dyn AuditSink>,
}

impl AuditService {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Record that `action` succeeded on behalf of the request's actor.
    pub fn record(&self, action: &str, ctx: &RequestContext) {
        let entry = AuditEntry::new(action, ctx.request_id.clone())
            .with_actor(ctx.actor_type, ctx.actor_id.clone());
        self.sink.record(&entry);
    }
}
