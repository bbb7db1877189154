pub mod config;

pub mod models {
    pub mod error;
    pub use error::MixpanelError;

    pub mod event;
    pub use event::Event;

    pub mod properties;
    pub use properties::Properties;

    pub mod update;
    pub use update::{Action, UpdateOperation, Verb};
}

pub mod services {
    pub mod client;
    pub use client::Client;

    pub mod transport;
    pub use transport::Transport;
}

pub use models::{Action, Event, MixpanelError, Properties, UpdateOperation, Verb};
pub use services::client::{decode_request, request_url, ENGAGE_ENDPOINT, HOST, TRACK_ENDPOINT};
pub use services::{Client, Transport};

use color_eyre::eyre::Result;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};
use tracing_tree::HierarchicalLayer;

#[allow(clippy::missing_errors_doc)]
pub fn setup_tracing() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .map_or_else(|_| EnvFilter::new("info"), |env_filter| env_filter);

    Registry::default()
        .with(env_filter)
        .with(
            HierarchicalLayer::new(2)
                .with_targets(true)
                .with_bracketed_fields(true),
        )
        .with(ErrorLayer::default())
        .try_init()?;

    info!("Initialized tracing and logging systems");

    Ok(())
}
