//! Tracks one event and sets one profile property.
//!
//! Needs `MIXPANEL_TOKEN` (or a token in `MIXPANEL_TOKEN_FILE`).

use chrono::Utc;
use color_eyre::eyre::Result;
use mixpanel::{Client, Event, Properties, UpdateOperation};
use serde_json::json;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    mixpanel::setup_tracing()?;

    let settings = mixpanel::config::new_config()?;
    let client = Client::from_config(&settings);

    let mut props = Properties::new();
    props.insert("test".to_owned(), json!("testing"));

    let mut event = Event::new("rust-demo", props.clone()).with_timestamp(Utc::now());
    event.distinct_id = Some("2".to_owned());
    event.ip = Some("8.8.8.8".to_owned());
    event.group_key = Some("MPRS".to_owned());
    event.group_id = Some("MPRSDEMO".to_owned());
    if client.track(&event).await? {
        info!(event = %event.title, "Tracked event");
    } else {
        warn!(event = %event.title, "Mixpanel did not accept the event");
    }

    let update = UpdateOperation::set("2", props);
    if client.update(&update).await? {
        info!(distinct_id = %update.distinct_id, "Updated profile");
    } else {
        warn!(distinct_id = %update.distinct_id, "Mixpanel did not accept the update");
    }

    Ok(())
}
