use std::time::Duration;

const DEFAULT_CAPACITY: u64 = 5;
const DEFAULT_PRODUCER_DELAY_MS: u64 = 100;
const DEFAULT_CONSUMER_DELAY_MS: u64 = 150;
const DEFAULT_ITEMS: &str = "apple,banana,Capsicum,Dates";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {name} is not a number: {value:?}")]
    InvalidNumber { name: String, value: String },
    #[error("environment variable {name} must be at least {min}, got {value}")]
    OutOfRange { name: String, min: u64, value: u64 },
    #[error("environment variable {name} must be at most {max}, got {value}")]
    TooLarge { name: String, max: u64, value: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub capacity: usize,
    pub producers: usize,
    pub consumers: usize,
    pub producer_delay: Duration,
    pub consumer_delay: Duration,
    pub items: Vec<String>,
    pub metrics_port: Option<u16>,
}

impl Configuration {
    pub fn from_env() -> Result<Configuration, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Configuration, ConfigError> {
        let env = Env { lookup };

        Ok(Configuration {
            capacity: env.read_at_least("QUEUE_CAPACITY", 1)?.unwrap_or(DEFAULT_CAPACITY) as usize,
            producers: env.read_at_least("QUEUE_PRODUCERS", 1)?.unwrap_or(1) as usize,
            consumers: env.read_at_least("QUEUE_CONSUMERS", 1)?.unwrap_or(1) as usize,
            producer_delay: Duration::from_millis(
                env.read_int("PRODUCER_DELAY_MS")?
                    .unwrap_or(DEFAULT_PRODUCER_DELAY_MS),
            ),
            consumer_delay: Duration::from_millis(
                env.read_int("CONSUMER_DELAY_MS")?
                    .unwrap_or(DEFAULT_CONSUMER_DELAY_MS),
            ),
            items: parse_items(
                &env.read_string("QUEUE_ITEMS")
                    .unwrap_or_else(|| DEFAULT_ITEMS.to_string()),
            ),
            metrics_port: env.read_port("METRICS_PORT")?,
        })
    }
}

struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn read_string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.trim().is_empty())
    }

    fn read_int(&self, name: &str) -> Result<Option<u64>, ConfigError> {
        self.read_string(name)
            .map(|value| {
                value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidNumber {
                        name: name.to_string(),
                        value,
                    })
            })
            .transpose()
    }

    fn read_at_least(&self, name: &str, min: u64) -> Result<Option<u64>, ConfigError> {
        match self.read_int(name)? {
            Some(value) if value < min => Err(ConfigError::OutOfRange {
                name: name.to_string(),
                min,
                value,
            }),
            value => Ok(value),
        }
    }

    fn read_port(&self, name: &str) -> Result<Option<u16>, ConfigError> {
        self.read_int(name)?
            .map(|value| {
                u16::try_from(value).map_err(|_| ConfigError::TooLarge {
                    name: name.to_string(),
                    max: u16::MAX.into(),
                    value,
                })
            })
            .transpose()
    }
}

fn parse_items(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
