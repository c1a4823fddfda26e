//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Cache Metrics
    pub static ref CACHE_HITS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tombstone_cache_hits_total", "Total number of cache hits"),
        &["cache_name"]
    ).expect("metric can be created");
    pub static ref CACHE_MISSES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tombstone_cache_misses_total", "Total number of cache misses"),
        &["cache_name"]
    ).expect("metric can be created");
    pub static ref CACHE_SIZE: IntGaugeVec = IntGaugeVec::new(
        Opts::new("tombstone_cache_size", "Current number of entries in cache"),
        &["cache_name"]
    ).expect("metric can be created");

    // Processing Metrics
    pub static ref ACCOUNTS_DELETED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tombstone_accounts_deleted_total", "Total number of account delete cascades"),
        &["locality", "status"]
    ).expect("metric can be created");
    pub static ref EVENTS_ENQUEUED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tombstone_events_enqueued_total", "Total number of events accepted by the dispatcher"),
        &["object_type", "activity_type"]
    ).expect("metric can be created");
    pub static ref EVENTS_REJECTED_TOTAL: IntCounter = IntCounter::new(
        "tombstone_events_rejected_total",
        "Total number of events refused after dispatcher shutdown"
    ).expect("metric can be created");
    pub static ref OUTBOX_ACTIVITIES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tombstone_outbox_activities_total", "Total number of activities written to the federation outbox"),
        &["activity_type"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tombstone_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(CACHE_HITS_TOTAL.clone()))
        .expect("CACHE_HITS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CACHE_MISSES_TOTAL.clone()))
        .expect("CACHE_MISSES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CACHE_SIZE.clone()))
        .expect("CACHE_SIZE can be registered");
    REGISTRY
        .register(Box::new(ACCOUNTS_DELETED_TOTAL.clone()))
        .expect("ACCOUNTS_DELETED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(EVENTS_ENQUEUED_TOTAL.clone()))
        .expect("EVENTS_ENQUEUED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(EVENTS_REJECTED_TOTAL.clone()))
        .expect("EVENTS_REJECTED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(OUTBOX_ACTIVITIES_TOTAL.clone()))
        .expect("OUTBOX_ACTIVITIES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
