use clap::Parser;
use modelchain::config::ChainConfig;
use modelchain::errors::ConfigError;
use modelchain::observability::LogFormat;
use std::path::PathBuf;

/// Command line arguments for the modelchain server.
#[derive(Parser, Debug, Clone)]
#[command(name = "modelchain-server", version, about = "Model-chain article server over Ollama")]
pub struct Args {
    /// Host interface to bind
    #[arg(long, env = "MODELCHAIN_HOST", default_value = "0.0.0.0")]
    pub host: String,
    /// Port to listen on
    #[arg(long, env = "MODELCHAIN_PORT", default_value_t = 3001)]
    pub port: u16,
    /// TOML file with chain configuration
    #[arg(long, env = "MODELCHAIN_CONFIG")]
    pub config: Option<PathBuf>,
    /// Base URL of the Ollama API, overriding the config file
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,
    /// Log output format: text or json
    #[arg(long, env = "MODELCHAIN_LOG_FORMAT", default_value = "text")]
    pub log_format: LogFormat,
}

impl Args {
    /// Returns the socket address to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Loads the chain configuration and applies command line overrides.
    pub fn load_config(&self) -> Result<ChainConfig, ConfigError> {
        let config = match &self.config {
            Some(path) => ChainConfig::load(path)?,
            None => ChainConfig::default(),
        };
        Ok(match &self.ollama_url {
            Some(url) => config.with_base_url(url.clone()),
            None => config,
        })
    }
}
