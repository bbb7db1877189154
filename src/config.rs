use color_eyre::Result;
use config::{Config, Environment};
use secrecy::SecretString;
use std::fs::read_to_string;
use tap::Tap;
use tracing::{debug, info};

const TOKEN_KEY: &str = "token";

/// Loads settings from `MIXPANEL_*` environment variables.
///
/// The token is taken from `MIXPANEL_TOKEN` when it is set, otherwise it is
/// read from `token_file`.
#[tracing::instrument]
pub fn new_config() -> Result<Application> {
    let s = Config::builder()
        .add_source(Environment::with_prefix("mixpanel"))
        .build()?;

    let env_token = s.get_string(TOKEN_KEY).ok();
    let base: mixpanel_cfg::Config = s.try_deserialize()?;

    let token: SecretString = if let Some(token) = env_token {
        info!("Read Mixpanel token from environment");
        token.into()
    } else {
        let token_path = &base.token_file;
        debug!(?token_path, "Reading Mixpanel token");
        let token: SecretString = read_to_string(token_path)?
            .trim()
            .to_owned()
            .tap(|token| debug!(token_length = token.len()))
            .into();
        info!(?token_path, "Read Mixpanel token");
        token
    };

    Ok(Application { base, token })
}

#[tracing::instrument]
pub fn new_config_with_token(token: SecretString) -> Result<Application> {
    let s = Config::builder()
        .add_source(Environment::with_prefix("mixpanel"))
        .build()?;

    let base = s.try_deserialize()?;
    Ok(Application { base, token })
}

#[derive(Clone, Debug)]
pub struct Application {
    pub base: mixpanel_cfg::Config,
    pub token: SecretString,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;
    use std::env;
    use std::str::FromStr;
    use std::sync::{Mutex, MutexGuard, PoisonError};

    // Tests in this module share the process environment.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn lock_env() -> MutexGuard<'static, ()> {
        let guard = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        env::remove_var("MIXPANEL_TOKEN");
        env::remove_var("MIXPANEL_TOKEN_FILE");
        guard
    }

    #[test]
    fn token_file_is_trimmed() {
        let _env = lock_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixpanel");
        std::fs::write(&path, "tok\n").unwrap();
        env::set_var("MIXPANEL_TOKEN_FILE", &path);

        let settings = new_config();
        env::remove_var("MIXPANEL_TOKEN_FILE");

        let settings = settings.unwrap();
        assert_eq!(settings.token.expose_secret(), "tok");
        assert_eq!(settings.base.token_file.as_std_path(), path.as_path());
    }

    #[test]
    fn env_token_wins_over_file() {
        let _env = lock_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixpanel");
        std::fs::write(&path, "from-file").unwrap();
        env::set_var("MIXPANEL_TOKEN_FILE", &path);
        env::set_var("MIXPANEL_TOKEN", "from-env");

        let settings = new_config();
        env::remove_var("MIXPANEL_TOKEN_FILE");
        env::remove_var("MIXPANEL_TOKEN");

        assert_eq!(settings.unwrap().token.expose_secret(), "from-env");
    }

    #[test]
    fn missing_token_file_is_an_error() {
        let _env = lock_env();
        let dir = tempfile::tempdir().unwrap();
        env::set_var("MIXPANEL_TOKEN_FILE", dir.path().join("absent"));

        let settings = new_config();
        env::remove_var("MIXPANEL_TOKEN_FILE");

        assert!(settings.is_err());
    }

    #[test]
    fn explicit_token_is_kept() {
        let _env = lock_env();
        let token = SecretString::from_str("dummy-token").unwrap();
        let settings = new_config_with_token(token).unwrap();
        assert_eq!(settings.token.expose_secret(), "dummy-token");
    }
}
