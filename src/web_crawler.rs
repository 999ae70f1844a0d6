//! Web爬取模块 - 集成Monolith抓取待转写的网页
//!
//! 此模块负责：
//! - 使用Monolith库抓取完整的网页内容
//! - 将网页转换为独立的HTML文档（CSS、图片等资源内嵌）
//! - 为后续的音标转写准备HTML内容
//!
//! 脚本一律不包含：转写后的页面是静态文档。

// 第三方crate导入
use anyhow::{Context, Result};
use tracing::{debug, info, warn};

// 本地模块导入
use crate::constants::crawler_config;

/// Web爬虫配置结构体
#[derive(Debug, Clone)]
pub struct WebCrawlerConfig {
    /// 目标URL
    pub url: String,
    /// 是否包含CSS样式
    pub include_css: bool,
    /// 是否包含图片资源
    pub include_images: bool,
    /// 用户代理字符串
    pub user_agent: String,
    /// 连接超时时间（秒）
    pub timeout: u64,
}

impl Default for WebCrawlerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            include_css: true,
            include_images: true,
            user_agent: crawler_config::DEFAULT_USER_AGENT.to_string(),
            timeout: crawler_config::DEFAULT_CRAWL_TIMEOUT,
        }
    }
}

/// Web爬虫主要结构体
///
/// 使用tokio::spawn_blocking封装Monolith的阻塞API，失败时按递增间隔重试。
pub struct WebCrawler {
    config: WebCrawlerConfig,
}

impl WebCrawler {
    /// 创建新的Web爬虫实例
    pub fn new(config: WebCrawlerConfig) -> Self {
        Self { config }
    }

    /// 使用默认配置创建Web爬虫
    pub fn with_url(url: &str) -> Self {
        let config = WebCrawlerConfig {
            url: url.to_string(),
            ..Default::default()
        };
        Self::new(config)
    }

    /// 配置资源包含选项
    pub fn include_resources(mut self, css: bool, images: bool) -> Self {
        self.config.include_css = css;
        self.config.include_images = images;
        self
    }

    /// 设置用户代理
    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.config.user_agent = user_agent.to_string();
        self
    }

    /// 设置连接超时
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.config.timeout = seconds;
        self
    }

    pub fn config(&self) -> &WebCrawlerConfig {
        &self.config
    }

    /// 执行网页爬取，返回HTML内容
    pub async fn crawl(&self) -> Result<String> {
        info!("🕷️ 开始爬取网页: {}", self.config.url);
        debug!("爬虫配置: {:?}", self.config);

        self.validate_url()?;

        self.crawl_website_with_retry()
            .await
            .with_context(|| format!("爬取网页失败: {}", self.config.url))
    }

    /// 验证URL格式
    fn validate_url(&self) -> Result<()> {
        if self.config.url.is_empty() {
            anyhow::bail!("URL不能为空");
        }

        if !self.config.url.starts_with("http://") && !self.config.url.starts_with("https://") {
            anyhow::bail!("URL必须以http://或https://开头");
        }

        Ok(())
    }

    /// 使用Monolith库进行实际的网页爬取
    async fn crawl_website(&self) -> Result<String> {
        let config = &self.config;

        let mut options = monolith::core::Options {
            no_css: !config.include_css,
            no_js: true,
            no_images: !config.include_images,
            user_agent: Some(config.user_agent.clone()),
            timeout: config.timeout,
            ignore_errors: false,
            silent: true,
            ..Default::default()
        };

        debug!(
            "Monolith选项: no_css={}, no_images={}, timeout={}s",
            options.no_css, options.no_images, options.timeout
        );

        let target_url = config.url.clone();

        // 在blocking线程中执行monolith操作
        let result = tokio::task::spawn_blocking(move || {
            use monolith::cache::Cache;
            use monolith::core::create_monolithic_document;

            let mut cache: Option<Cache> = Some(Cache::new(0, None));

            create_monolithic_document(target_url, &mut options, &mut cache)
        })
        .await
        .with_context(|| "Monolith任务执行失败")?;

        match result {
            Ok((html_bytes, title)) => {
                let html_content =
                    String::from_utf8(html_bytes).with_context(|| "转换HTML字节为字符串失败")?;

                if let Some(page_title) = title {
                    info!("📄 网页标题: {}", page_title);
                }
                info!("✅ 网页内容爬取完成，大小: {} 字节", html_content.len());

                Ok(html_content)
            }
            Err(e) => {
                anyhow::bail!("Monolith爬取失败: {}", e);
            }
        }
    }

    /// 带重试机制的网页爬取
    async fn crawl_website_with_retry(&self) -> Result<String> {
        let mut last_error: Option<anyhow::Error> = None;

        for attempt in 1..=crawler_config::MAX_CRAWL_RETRIES {
            match self.crawl_website().await {
                Ok(content) => {
                    if attempt > 1 {
                        info!("✅ 第 {} 次重试成功", attempt);
                    }
                    return Ok(content);
                }
                Err(e) => {
                    warn!(
                        "❌ 爬取失败 (尝试 {}/{}): {}",
                        attempt,
                        crawler_config::MAX_CRAWL_RETRIES,
                        e
                    );
                    last_error = Some(e);

                    if attempt < crawler_config::MAX_CRAWL_RETRIES {
                        let delay = std::time::Duration::from_secs(attempt as u64 * 2);
                        info!("⏳ 等待 {:?} 后重试...", delay);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("所有重试尝试均失败")))
    }
}
