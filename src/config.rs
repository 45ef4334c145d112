use std::{env, str::FromStr, sync::Arc};

#[derive(Debug, Clone)]
pub struct Config {
    pub logger: LoggerConfig,
    /// STUN server URLs passed to the engine's ICE agent.
    pub stun_servers: Arc<Vec<String>>,
    /// Optional bearer token sent with every signaling request.
    pub bearer_token: Option<Arc<str>>,
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub level: String,
    pub format: LoggerFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LoggerFormat {
    Pretty,
    Json,
    Compact,
}

impl FromStr for LoggerFormat {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(LoggerFormat::Pretty),
            "json" => Ok(LoggerFormat::Json),
            "compact" => Ok(LoggerFormat::Compact),
            _ => Err("Invalid logger format."),
        }
    }
}

pub fn read_config() -> Config {
    let level = env::var("WHEP_PLAY_LOGGER_LEVEL")
        .unwrap_or_else(|_| "info,webrtc=warn,webrtc_ice=warn".to_string());
    let format = match env::var("WHEP_PLAY_LOGGER_FORMAT") {
        Ok(value) => value.parse().unwrap_or_else(|err| {
            eprintln!("{err} Falling back to default.");
            LoggerFormat::Compact
        }),
        Err(_) => LoggerFormat::Compact,
    };

    let stun_servers = env::var("WHEP_PLAY_STUN_SERVERS")
        .map(|value| {
            value
                .split(',')
                .filter(|url| !url.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Config {
        logger: LoggerConfig { level, format },
        stun_servers: Arc::new(stun_servers),
        bearer_token: env::var("WHEP_PLAY_BEARER_TOKEN").ok().map(Arc::from),
    }
}
