use crate::{admin::AdminConfig, api, cli::commands::admin, flow};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::time::Duration;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: SecretString,
    pub prefix: String,
    pub admin: admin::Options,
    pub client_base_url: String,
    pub cors_origin: Option<String>,
}

impl Args {
    /// Split the arguments into the HTTP and admin API configurations.
    ///
    /// # Errors
    /// Returns an error if a URL or the route prefix is invalid.
    pub fn into_configs(self) -> Result<(api::Config, AdminConfig)> {
        let client_base_url = flow::parse_client_base_url(&self.client_base_url)?;

        let config = api::Config::new(self.port, self.dsn, &self.prefix, client_base_url)?
            .with_cors_origin(self.cors_origin);

        let mut admin_config = AdminConfig::new(&self.admin.url)
            .context("Invalid admin API URL")?
            .with_timeout(Duration::from_secs(self.admin.timeout_seconds))
            .with_fetch_attempts(self.admin.fetch_attempts);

        if let Some(username) = self.admin.username {
            admin_config = admin_config.with_basic_auth(username, self.admin.password);
        }

        Ok((config, admin_config))
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let (config, admin_config) = args.into_configs()?;

    debug!("Server config: {:?}, admin API: {:?}", config, admin_config);

    api::new(config, admin_config).await
}
