//! Tool Sync Worker - Entry Point
//!
//! Background worker that keeps the vector collections in sync with the tool catalog.

use core_config::tracing::install_color_eyre;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Install color-eyre first for colored error output
    install_color_eyre();

    zerg_tool_sync_worker::run().await
}
