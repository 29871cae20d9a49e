//! Logging setup shared by the worker binaries.
//!
//! Development logs are pretty-printed, production logs are flattened JSON
//! with the current span attached. `RUST_LOG` replaces the default
//! directives entirely.

use crate::{Environment, env_optional};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, prelude::*};

/// Directives used when `RUST_LOG` is unset.
///
/// The sync crates log per collection and per sweep; the store and HTTP
/// client crates are kept one level quieter.
pub const PRODUCTION_DIRECTIVES: &str =
    "info,domain_tool_sync=info,mongodb=warn,qdrant_client=warn,reqwest=warn,h2=warn,hyper=warn";
pub const DEVELOPMENT_DIRECTIVES: &str =
    "info,domain_tool_sync=debug,domain_tools=debug,domain_vector=debug,database=debug,mongodb=info,h2=info,hyper=info";

/// Install color-eyre: error locations shown, environment section hidden.
/// Later calls are ignored.
pub fn install_color_eyre() {
    let _ = color_eyre::config::HookBuilder::default()
        .display_location_section(true)
        .display_env_section(false)
        .install();
}

/// The filter directives in effect for `environment`
pub fn filter_directives(environment: &Environment) -> String {
    env_optional("RUST_LOG").unwrap_or_else(|| default_directives(environment).to_string())
}

fn default_directives(environment: &Environment) -> &'static str {
    if environment.is_production() {
        PRODUCTION_DIRECTIVES
    } else {
        DEVELOPMENT_DIRECTIVES
    }
}

/// A `RUST_LOG` that does not parse falls back to the defaults instead of
/// silencing everything.
fn build_filter(environment: &Environment) -> EnvFilter {
    let directives = filter_directives(environment);
    EnvFilter::try_new(&directives).unwrap_or_else(|e| {
        eprintln!("Ignoring invalid RUST_LOG '{directives}': {e}");
        EnvFilter::new(default_directives(environment))
    })
}

/// Initialize the global subscriber for `service`.
///
/// Includes an `ErrorLayer` so eyre reports carry the span trace, e.g. the
/// `tool_id` of the sync that failed:
///
/// ```ignore
/// use tracing::instrument;
/// use eyre::{Result, WrapErr};
///
/// #[instrument(skip(service), fields(tool_id = %tool_id))]
/// async fn load_status(service: &SyncService, tool_id: Uuid) -> Result<Option<SyncMetadata>> {
///     service
///         .sync_status(tool_id)
///         .await
///         .wrap_err("Failed to load sync status")
/// }
/// ```
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_tracing(environment: &Environment, service: &str) {
    let filter = build_filter(environment);

    let result = if environment.is_production() {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(true)
                    .with_span_list(false)
                    .flatten_event(true),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false)
                    .pretty(),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    };

    match result {
        Ok(()) => info!(
            service,
            environment = ?environment,
            directives = %filter_directives(environment),
            "Tracing initialized"
        ),
        Err(_) => debug!(service, "Tracing already initialized"),
    }
}
