// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

use tracing_subscriber::EnvFilter;

/// Initializes the global `tracing` subscriber. Log file setup and export
/// pipelines are out of scope (external collaborator); this only wires a
/// stderr formatter with env-filter-driven verbosity (`RUST_LOG`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
