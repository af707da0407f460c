//! 服务端配置
//!
//! 从可选的 JSON 文件加载，文件不存在或格式无效时使用默认配置。
//! 环境变量 `CHESS_SERVER_ADDR`（`host:port`）优先于文件中的地址。

use std::path::Path;
use std::time::Duration;

use protocol::{NetworkConfig, READ_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};

/// 覆盖监听地址的环境变量
pub const ADDR_ENV: &str = "CHESS_SERVER_ADDR";

/// 服务端配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub network: NetworkConfig,
    /// 每帧读取超时（秒），`None` 表示不限
    pub read_timeout_secs: Option<u64>,
    /// 每个连接发送队列的容量
    pub outbound_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            read_timeout_secs: Some(READ_TIMEOUT_SECS),
            outbound_buffer: 32,
        }
    }
}

impl ServerConfig {
    /// 从文件加载配置，再应用环境变量覆盖
    pub fn load(path: Option<&Path>) -> Self {
        let mut config = match path {
            Some(path) => Self::load_file(path),
            None => Self::default(),
        };

        if let Ok(addr) = std::env::var(ADDR_ENV) {
            config.apply_addr_override(&addr);
        }

        config
    }

    fn load_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    tracing::info!("已加载配置: {:?}", path);
                    config
                }
                Err(e) => {
                    tracing::warn!("配置文件格式无效: {}，使用默认配置", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("无法读取配置文件 {:?}: {}，使用默认配置", path, e);
                Self::default()
            }
        }
    }

    /// 用 `host:port` 覆盖监听地址，格式无效时忽略
    pub fn apply_addr_override(&mut self, addr: &str) -> bool {
        let parsed = addr
            .rsplit_once(':')
            .and_then(|(host, port)| Some((host, port.parse::<u16>().ok()?)))
            .filter(|(host, _)| !host.is_empty());

        match parsed {
            Some((host, port)) => {
                self.network.host = host.to_string();
                self.network.port = port;
                true
            }
            None => {
                tracing::warn!("{} 格式无效: {}，忽略", ADDR_ENV, addr);
                false
            }
        }
    }

    /// 读取超时
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs.map(Duration::from_secs)
    }
}
