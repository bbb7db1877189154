use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub debug: bool,
    pub token_file: Utf8PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            token_file: "/secrets/mixpanel".into(),
        }
    }
}
