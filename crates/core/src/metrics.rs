use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-wide shell counters, shared through an `Arc`.
#[derive(Default)]
pub struct Metrics {
    commands_routed: AtomicU64,
    commands_unrouted: AtomicU64,
    dispatch_failures: AtomicU64,
    llm_requests: AtomicU64,
    llm_failures: AtomicU64,
    component_restarts: AtomicU64,
    tasks_spawned: AtomicU64,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_commands_routed(&self) {
        self.commands_routed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_commands_unrouted(&self) {
        self.commands_unrouted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_dispatch_failures(&self) {
        self.dispatch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_llm_requests(&self) {
        self.llm_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_llm_failures(&self) {
        self.llm_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_component_restarts(&self) {
        self.component_restarts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_tasks_spawned(&self) {
        self.tasks_spawned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            commands_routed: self.commands_routed.load(Ordering::Relaxed),
            commands_unrouted: self.commands_unrouted.load(Ordering::Relaxed),
            dispatch_failures: self.dispatch_failures.load(Ordering::Relaxed),
            llm_requests: self.llm_requests.load(Ordering::Relaxed),
            llm_failures: self.llm_failures.load(Ordering::Relaxed),
            component_restarts: self.component_restarts.load(Ordering::Relaxed),
            tasks_spawned: self.tasks_spawned.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub commands_routed: u64,
    pub commands_unrouted: u64,
    pub dispatch_failures: u64,
    pub llm_requests: u64,
    pub llm_failures: u64,
    pub component_restarts: u64,
    pub tasks_spawned: u64,
}

impl MetricsSnapshot {
    pub fn llm_success_rate(&self) -> f64 {
        if self.llm_requests == 0 {
            return 1.0;
        }
        1.0 - (self.llm_failures as f64 / self.llm_requests as f64)
    }

    pub fn dispatch_success_rate(&self) -> f64 {
        if self.commands_routed == 0 {
            return 1.0;
        }
        1.0 - (self.dispatch_failures as f64 / self.commands_routed as f64)
    }
}
