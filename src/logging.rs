//=====================================================
// File: logging.rs
//=====================================================
// Author: SolvraOS Contributors
// License: Duality Public License (DPL v1.0)
// Goal: Tracing setup shared by the profiler binary and hosts
// Objective: One subscriber per process, labelled by component
//=====================================================

use std::sync::OnceLock;

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::SubscriberBuilder;

static INIT: OnceLock<()> = OnceLock::new();

/// Initialise tracing with a component label. `debug` lowers the default
/// level; `RUST_LOG` directives still apply on top.
pub fn init(component: &str, debug: bool) {
    INIT.get_or_init(|| {
        let level = if debug { Level::DEBUG } else { Level::INFO };
        // A host may already have installed a subscriber.
        let _ = SubscriberBuilder::default()
            .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
            .with_target(true)
            .with_writer(std::io::stderr)
            .compact()
            .try_init();
    });
    tracing::info!(component, "tracing initialised");
}

//=====================================================
// End of file
//=====================================================
