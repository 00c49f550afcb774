use clap::Parser;
use mavbridge_config::BridgeConfig;

/// 命令行参数；给出时覆盖环境变量。
#[derive(Debug, Default, Parser)]
#[command(
    name = "mav-bridge",
    about = "Forward a MAVLink stream to WebSocket subscribers as JSON"
)]
pub struct Cli {
    /// MAVLink source endpoint [default: udp:127.0.0.1:14550]
    #[arg(long = "udp", value_name = "ENDPOINT")]
    pub udp: Option<String>,

    /// WebSocket listen port [default: 8765]
    #[arg(long = "ws", value_name = "PORT")]
    pub ws: Option<u16>,

    /// MAVLink dialect: common, ardupilotmega, minimal [default: common]
    #[arg(long, value_name = "NAME")]
    pub dialect: Option<String>,
}

impl Cli {
    pub fn apply(&self, config: &mut BridgeConfig) {
        if let Some(udp) = &self.udp {
            config.source_endpoint = udp.clone();
        }
        if let Some(port) = self.ws {
            config.ws_port = port;
        }
        if let Some(dialect) = &self.dialect {
            config.dialect = dialect.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "mav-bridge",
            "--udp",
            "udpin:0.0.0.0:14551",
            "--ws",
            "9000",
            "--dialect",
            "ardupilotmega",
        ])
        .expect("parse");
        let mut config = BridgeConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.source_endpoint, "udpin:0.0.0.0:14551");
        assert_eq!(config.ws_port, 9000);
        assert_eq!(config.dialect, "ardupilotmega");
    }

    #[test]
    fn missing_flags_keep_config() {
        let cli = Cli::try_parse_from(["mav-bridge"]).expect("parse");
        let mut config = BridgeConfig::default();
        config.ws_port = 7000;
        cli.apply(&mut config);
        assert_eq!(config.ws_port, 7000);
        assert_eq!(config.source_endpoint, "udp:127.0.0.1:14550");
    }

    #[test]
    fn unknown_flags_are_rejected() {
        assert!(Cli::try_parse_from(["mav-bridge", "--verbose"]).is_err());
        assert!(Cli::try_parse_from(["mav-bridge", "--ws", "not-a-port"]).is_err());
    }
}
