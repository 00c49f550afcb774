//! 桥接服务运行配置加载。

use std::env;
use std::time::Duration;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

pub const DEFAULT_SOURCE: &str = "udp:127.0.0.1:14550";
pub const DEFAULT_WS_PORT: u16 = 8765;
pub const DEFAULT_DIALECT: &str = "common";

/// `time_usec == 0` 的处理策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZeroTimeUsec {
    /// 视为缺失，回退到 `time_boot_ms`。
    #[default]
    Absent,
    /// 视为合法时间戳并保留。
    Valid,
}

/// 桥接服务运行配置。
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub source_endpoint: String,
    pub dialect: String,
    pub ws_host: String,
    pub ws_port: u16,
    pub heartbeat_timeout_secs: u64,
    pub poll_interval_us: u64,
    pub reconnect_min_ms: u64,
    pub reconnect_max_ms: u64,
    pub ping_interval_secs: u64,
    pub ping_timeout_secs: u64,
    pub subscriber_queue: usize,
    pub reader_queue: usize,
    pub zero_time_usec: ZeroTimeUsec,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            source_endpoint: DEFAULT_SOURCE.to_string(),
            dialect: DEFAULT_DIALECT.to_string(),
            ws_host: "0.0.0.0".to_string(),
            ws_port: DEFAULT_WS_PORT,
            heartbeat_timeout_secs: 5,
            poll_interval_us: 500,
            reconnect_min_ms: 200,
            reconnect_max_ms: 5000,
            ping_interval_secs: 20,
            ping_timeout_secs: 20,
            subscriber_queue: 1024,
            reader_queue: 4096,
            zero_time_usec: ZeroTimeUsec::Absent,
        }
    }
}

impl BridgeConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源读取配置（未设置的键取默认值）。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let reader = Reader { lookup };

        let config = Self {
            source_endpoint: reader
                .string("BRIDGE_SOURCE")
                .unwrap_or(defaults.source_endpoint),
            dialect: reader.string("BRIDGE_DIALECT").unwrap_or(defaults.dialect),
            ws_host: reader.string("BRIDGE_WS_HOST").unwrap_or(defaults.ws_host),
            ws_port: reader.parse_or("BRIDGE_WS_PORT", defaults.ws_port)?,
            heartbeat_timeout_secs: reader
                .parse_or("BRIDGE_HEARTBEAT_TIMEOUT_SECS", defaults.heartbeat_timeout_secs)?,
            poll_interval_us: reader
                .parse_or("BRIDGE_POLL_INTERVAL_US", defaults.poll_interval_us)?,
            reconnect_min_ms: reader
                .parse_or("BRIDGE_RECONNECT_MIN_MS", defaults.reconnect_min_ms)?,
            reconnect_max_ms: reader
                .parse_or("BRIDGE_RECONNECT_MAX_MS", defaults.reconnect_max_ms)?,
            ping_interval_secs: reader
                .parse_or("BRIDGE_PING_INTERVAL_SECS", defaults.ping_interval_secs)?,
            ping_timeout_secs: reader
                .parse_or("BRIDGE_PING_TIMEOUT_SECS", defaults.ping_timeout_secs)?,
            subscriber_queue: reader
                .parse_or("BRIDGE_SUBSCRIBER_QUEUE", defaults.subscriber_queue)?,
            reader_queue: reader.parse_or("BRIDGE_READER_QUEUE", defaults.reader_queue)?,
            zero_time_usec: read_zero_time_usec(&reader, defaults.zero_time_usec)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// 校验取值范围。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_endpoint.trim().is_empty() {
            return Err(invalid("BRIDGE_SOURCE", &self.source_endpoint));
        }
        if self.dialect.trim().is_empty() {
            return Err(invalid("BRIDGE_DIALECT", &self.dialect));
        }
        if self.poll_interval_us == 0 {
            return Err(invalid("BRIDGE_POLL_INTERVAL_US", "0"));
        }
        if self.reconnect_min_ms == 0 || self.reconnect_min_ms > self.reconnect_max_ms {
            return Err(ConfigError::Invalid(
                "BRIDGE_RECONNECT_MIN_MS".to_string(),
                format!(
                    "{} (must be > 0 and <= BRIDGE_RECONNECT_MAX_MS={})",
                    self.reconnect_min_ms, self.reconnect_max_ms
                ),
            ));
        }
        if self.ping_interval_secs == 0 {
            return Err(invalid("BRIDGE_PING_INTERVAL_SECS", "0"));
        }
        if self.subscriber_queue == 0 {
            return Err(invalid("BRIDGE_SUBSCRIBER_QUEUE", "0"));
        }
        if self.reader_queue == 0 {
            return Err(invalid("BRIDGE_READER_QUEUE", "0"));
        }
        Ok(())
    }

    /// WebSocket 监听地址。
    pub fn ws_addr(&self) -> String {
        format!("{}:{}", self.ws_host, self.ws_port)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.poll_interval_us)
    }

    pub fn reconnect_min(&self) -> Duration {
        Duration::from_millis(self.reconnect_min_ms)
    }

    pub fn reconnect_max(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_ms)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs)
    }
}

struct Reader<F> {
    lookup: F,
}

impl<F> Reader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> Option<String> {
        match (self.lookup)(key) {
            Some(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
            _ => None,
        }
    }

    fn parse_or<T: std::str::FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        let value = match self.string(key) {
            Some(value) => value,
            None => return Ok(default),
        };
        value
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid(key.to_string(), value))
    }
}

fn read_zero_time_usec<F>(reader: &Reader<F>, default: ZeroTimeUsec) -> Result<ZeroTimeUsec, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let key = "BRIDGE_ZERO_TIME_USEC";
    match reader.string(key) {
        None => Ok(default),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "absent" => Ok(ZeroTimeUsec::Absent),
            "valid" => Ok(ZeroTimeUsec::Valid),
            _ => Err(ConfigError::Invalid(key.to_string(), value)),
        },
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::Invalid(key.to_string(), value.to_string())
}
