// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// 应用程序配置设置
///
/// 包含数据库、服务器、抓取器、传输层、作业监控和指标等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 数据库配置
    pub database: DatabaseSettings,
    /// 服务器配置
    pub server: ServerSettings,
    /// 抓取器配置
    pub scraper: ScraperSettings,
    /// 传输层配置
    pub transport: TransportSettings,
    /// 作业监控配置
    pub monitor: MonitorSettings,
    /// 指标导出配置
    pub metrics: MetricsSettings,
}

/// 数据库配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// 服务器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// 抓取器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperSettings {
    /// 批量写入阈值，缓冲区达到该数量时立即落库
    pub batch_threshold: usize,
    /// 单次页面请求超时时间（秒）
    pub request_timeout_secs: u64,
    /// 两次动作之间的最小随机延迟（毫秒）
    pub min_delay_ms: u64,
    /// 两次动作之间的最大随机延迟（毫秒）
    pub max_delay_ms: u64,
    /// 列表页最大翻页数
    pub max_listing_pages: u32,
    /// 空闲时轮询待处理作业的间隔（秒）
    pub poll_interval_secs: u64,
    /// 内置站点配置名称
    pub site: String,
    /// 站点配置 YAML 文件路径（可选，覆盖内置配置）
    pub site_profile_path: Option<String>,
}

/// 传输层配置设置
///
/// 由哪些值存在决定抓取策略链：远程浏览器 > 本地浏览器 > 纯 HTTP
#[derive(Debug, Clone, Deserialize)]
pub struct TransportSettings {
    /// HTTP 代理地址
    pub proxy_url: Option<String>,
    /// 远程托管浏览器的 WebSocket 地址
    pub remote_browser_ws: Option<String>,
    /// 是否启动本地浏览器
    pub local_browser: bool,
    /// 本地浏览器可执行文件路径（可选）
    pub chrome_executable: Option<String>,
    /// 浏览器视口宽度
    pub viewport_width: u32,
    /// 浏览器视口高度
    pub viewport_height: u32,
    /// 浏览器语言区域
    pub locale: String,
}

/// 作业监控配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorSettings {
    /// 是否启用停滞作业清理
    pub enabled: bool,
    /// 超过多少分钟没有进度视为停滞
    pub stale_after_minutes: i64,
    /// 扫描间隔（秒）
    pub sweep_interval_secs: u64,
}

/// 指标导出配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    /// 是否启用 Prometheus 导出
    pub enabled: bool,
    /// 导出监听地址
    pub listen_addr: String,
}

impl ScraperSettings {
    /// 页面请求超时
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 轮询间隔
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从默认值、配置文件和环境变量依次加载配置
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Self::with_defaults(Config::builder())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("LEADCRAWL").separator("__"));

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// 仅使用默认值构建配置，测试中使用
    pub fn defaults() -> Result<Self, ConfigError> {
        let settings: Settings = Self::with_defaults(Config::builder())?
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn with_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            // Default DB settings
            .set_default("database.url", "sqlite://leadcrawl.db?mode=rwc")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            // Default scraper settings
            .set_default("scraper.batch_threshold", 20)?
            .set_default("scraper.request_timeout_secs", 30)?
            .set_default("scraper.min_delay_ms", 1500)?
            .set_default("scraper.max_delay_ms", 4000)?
            .set_default("scraper.max_listing_pages", 5)?
            .set_default("scraper.poll_interval_secs", 5)?
            .set_default("scraper.site", "realtor")?
            // Default transport settings
            .set_default("transport.local_browser", false)?
            .set_default("transport.viewport_width", 1366)?
            .set_default("transport.viewport_height", 768)?
            .set_default("transport.locale", "en-US")?
            // Default monitor settings
            .set_default("monitor.enabled", true)?
            .set_default("monitor.stale_after_minutes", 15)?
            .set_default("monitor.sweep_interval_secs", 60)?
            // Default metrics settings
            .set_default("metrics.enabled", true)?
            .set_default("metrics.listen_addr", "0.0.0.0:9000")
    }

    /// 校验配置之间的约束
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scraper.batch_threshold == 0 {
            return Err(ConfigError::Message(
                "scraper.batch_threshold must be at least 1".to_string(),
            ));
        }
        if self.scraper.min_delay_ms > self.scraper.max_delay_ms {
            return Err(ConfigError::Message(
                "scraper.min_delay_ms must not exceed scraper.max_delay_ms".to_string(),
            ));
        }
        if self.monitor.stale_after_minutes <= 0 {
            return Err(ConfigError::Message(
                "monitor.stale_after_minutes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
