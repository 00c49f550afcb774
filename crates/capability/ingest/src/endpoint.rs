use crate::IngestError;
use std::fmt;
use std::str::FromStr;

/// 运行时可选的 MAVLink 方言。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Common,
    ArduPilotMega,
    Minimal,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Common => "common",
            Dialect::ArduPilotMega => "ardupilotmega",
            Dialect::Minimal => "minimal",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = IngestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "common" => Ok(Dialect::Common),
            "ardupilotmega" => Ok(Dialect::ArduPilotMega),
            "minimal" => Ok(Dialect::Minimal),
            other => Err(IngestError::Config(format!("unknown dialect: {other}"))),
        }
    }
}

/// 数据源端点。
///
/// `udp:` 与不带前缀的 `host:port` 都表示本地监听；`tcp:` 表示主动连接。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MavlinkEndpoint {
    UdpIn(String),
    UdpOut(String),
    UdpBroadcast(String),
    TcpIn(String),
    TcpOut(String),
    Serial { port: String, baud: u32 },
}

impl MavlinkEndpoint {
    pub fn parse(value: &str) -> Result<Self, IngestError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(invalid(value, "empty endpoint"));
        }
        let Some((scheme, rest)) = value.split_once(':') else {
            return Err(invalid(value, "expected host:port"));
        };
        match scheme.to_ascii_lowercase().as_str() {
            "udp" | "udpin" => Ok(MavlinkEndpoint::UdpIn(socket_address(value, rest)?)),
            "udpout" => Ok(MavlinkEndpoint::UdpOut(socket_address(value, rest)?)),
            "udpbcast" => Ok(MavlinkEndpoint::UdpBroadcast(socket_address(value, rest)?)),
            "tcp" | "tcpout" => Ok(MavlinkEndpoint::TcpOut(socket_address(value, rest)?)),
            "tcpin" => Ok(MavlinkEndpoint::TcpIn(socket_address(value, rest)?)),
            "serial" => {
                let (port, baud) = rest
                    .rsplit_once(':')
                    .ok_or_else(|| invalid(value, "expected serial:<device>:<baud>"))?;
                let baud = baud
                    .parse::<u32>()
                    .map_err(|_| invalid(value, "invalid baud rate"))?;
                if port.is_empty() || baud == 0 {
                    return Err(invalid(value, "expected serial:<device>:<baud>"));
                }
                Ok(MavlinkEndpoint::Serial {
                    port: port.to_string(),
                    baud,
                })
            }
            _ => Ok(MavlinkEndpoint::UdpIn(socket_address(value, value)?)),
        }
    }

    /// `mavlink::connect` 使用的地址串。
    pub fn connection_string(&self) -> String {
        match self {
            MavlinkEndpoint::UdpIn(addr) => format!("udpin:{addr}"),
            MavlinkEndpoint::UdpOut(addr) => format!("udpout:{addr}"),
            MavlinkEndpoint::UdpBroadcast(addr) => format!("udpbcast:{addr}"),
            MavlinkEndpoint::TcpIn(addr) => format!("tcpin:{addr}"),
            MavlinkEndpoint::TcpOut(addr) => format!("tcpout:{addr}"),
            MavlinkEndpoint::Serial { port, baud } => format!("serial:{port}:{baud}"),
        }
    }
}

impl fmt::Display for MavlinkEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.connection_string())
    }
}

impl FromStr for MavlinkEndpoint {
    type Err = IngestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        MavlinkEndpoint::parse(value)
    }
}

fn socket_address(original: &str, address: &str) -> Result<String, IngestError> {
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| invalid(original, "expected host:port"))?;
    if host.is_empty() {
        return Err(invalid(original, "missing host"));
    }
    port.parse::<u16>()
        .map_err(|_| invalid(original, "invalid port"))?;
    Ok(address.to_string())
}

fn invalid(value: &str, reason: &str) -> IngestError {
    IngestError::Config(format!("invalid endpoint '{value}': {reason}"))
}
