use crate::config::{ClientConfig, DispatcherConfig, TimeoutConfig};
use crate::utils::error::{CallError, Result};
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "listenable-call")]
#[command(about = "Fetch an HTTP endpoint through a listenable future")]
pub struct CliArgs {
    #[arg(long, help = "Base URL; must end in /")]
    pub base_url: Option<String>,

    #[arg(long, default_value = "/")]
    pub path: String,

    #[arg(long, default_value = "GET")]
    pub method: String,

    #[arg(long, help = "Request body, sent as text/plain")]
    pub data: Option<String>,

    #[arg(long, help = "TOML configuration file")]
    pub config: Option<String>,

    #[arg(long, help = "Print the full response instead of only the body")]
    pub response: bool,

    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    #[arg(long)]
    pub dispatcher_threads: Option<usize>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log as JSON")]
    pub log_json: bool,
}

impl CliArgs {
    /// The file configuration (if any) with command line values on top.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let mut config = match (&self.config, &self.base_url) {
            (Some(path), _) => ClientConfig::from_file(path)?,
            (None, Some(base_url)) => ClientConfig::new(base_url.clone()),
            (None, None) => {
                return Err(CallError::MissingConfigError {
                    field: "base_url (pass --base-url or --config)".to_string(),
                })
            }
        };

        if let Some(base_url) = &self.base_url {
            config.client.base_url = base_url.clone();
        }
        if let Some(seconds) = self.timeout_seconds {
            config
                .timeouts
                .get_or_insert_with(TimeoutConfig::default)
                .request_seconds = Some(seconds);
        }
        if let Some(threads) = self.dispatcher_threads {
            config.dispatcher = Some(DispatcherConfig { threads });
        }

        Ok(config)
    }

    pub fn http_method(&self) -> Result<reqwest::Method> {
        self.method
            .to_uppercase()
            .parse()
            .map_err(|_| CallError::InvalidConfigValueError {
                field: "method".to_string(),
                value: self.method.clone(),
                reason: "Not an HTTP method".to_string(),
            })
    }
}
