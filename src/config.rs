//! 配置管理模块
//!
//! 提供CLI参数解析和转写配置管理功能

// 标准库导入
use std::path::PathBuf;

// 第三方crate导入
use clap::Parser;

// 本地模块导入
use crate::constants::{class_config, crawler_config, dictionary_config, font_config, output_config};
use crate::error::Result;
use crate::ipa_error;

/// 音标字体样式表配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontStylesheet {
    /// 字体族名称
    pub family: String,
    /// 字体文件地址（写入 @font-face 的 src）
    pub url: String,
}

/// 转写配置结构体
///
/// 控制DOM改写阶段使用的类名和附加处理。
/// 支持Builder模式进行链式配置。
///
/// # Examples
///
/// ```rust
/// use text_to_ipa::config::TranscriptionConfig;
///
/// let config = TranscriptionConfig::new()
///     .with_use_class("ipa")
///     .process_frames(false);
/// assert_eq!(config.use_class(), "ipa");
/// ```
#[derive(Debug, Clone)]
pub struct TranscriptionConfig {
    /// 临时标记类名
    marker_class: String,
    /// 已转写片段类名
    use_class: String,
    /// 保留原文片段类名
    exclude_class: String,
    /// 是否处理 data URI 内嵌的 iframe 文档
    process_frames: bool,
    /// 可选的字体样式表
    font: Option<FontStylesheet>,
}

impl TranscriptionConfig {
    /// 创建新的配置实例
    ///
    /// 默认值：
    /// - 标记类名: translate-to-ipa
    /// - 转写类名: use-trunic
    /// - 排除类名: exclude-trunic
    /// - 处理内嵌iframe: true
    /// - 不注入字体样式表
    pub fn new() -> Self {
        Self {
            marker_class: class_config::MARKER_CLASS.to_string(),
            use_class: class_config::USE_CLASS.to_string(),
            exclude_class: class_config::EXCLUDE_CLASS.to_string(),
            process_frames: true,
            font: None,
        }
    }

    pub fn marker_class(&self) -> &str {
        &self.marker_class
    }

    pub fn use_class(&self) -> &str {
        &self.use_class
    }

    pub fn exclude_class(&self) -> &str {
        &self.exclude_class
    }

    pub fn is_frames_enabled(&self) -> bool {
        self.process_frames
    }

    pub fn font(&self) -> Option<&FontStylesheet> {
        self.font.as_ref()
    }

    /// 设置临时标记类名
    pub fn with_marker_class(mut self, class: &str) -> Self {
        self.marker_class = class.to_string();
        self
    }

    /// 设置转写类名
    pub fn with_use_class(mut self, class: &str) -> Self {
        self.use_class = class.to_string();
        self
    }

    /// 设置排除类名
    pub fn with_exclude_class(mut self, class: &str) -> Self {
        self.exclude_class = class.to_string();
        self
    }

    /// 设置是否处理内嵌iframe
    pub fn process_frames(mut self, enable: bool) -> Self {
        self.process_frames = enable;
        self
    }

    /// 设置字体样式表
    pub fn with_font(mut self, family: &str, url: &str) -> Self {
        self.font = Some(FontStylesheet {
            family: family.to_string(),
            url: url.to_string(),
        });
        self
    }

    /// 校验类名：不能为空、不能含空白、三者互不相同
    pub fn validate(&self) -> Result<()> {
        let classes = [
            ("marker-class", &self.marker_class),
            ("use-class", &self.use_class),
            ("exclude-class", &self.exclude_class),
        ];

        for (field, class) in classes {
            if class.is_empty() || class.chars().any(char::is_whitespace) {
                return Err(ipa_error!(config, field, format!("无效的类名: '{}'", class)));
            }
        }

        if self.marker_class == self.use_class
            || self.marker_class == self.exclude_class
            || self.use_class == self.exclude_class
        {
            return Err(ipa_error!(config, "class", "标记、转写、排除类名必须互不相同"));
        }

        Ok(())
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// CLI参数结构
#[derive(Parser, Debug)]
#[command(author, version, about = "HTML音标转写CLI工具 - 将网页中的英文单词替换为IPA音标", long_about = None)]
pub struct Cli {
    /// 输入HTML文件、目录或网页URL
    #[arg(short, long, value_name = "FILE_DIR_OR_URL")]
    pub input: String,

    /// 输出路径 (可选，默认为输入文件名+_ipa)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// 词典文件路径或URL
    #[arg(short, long, default_value = dictionary_config::DEFAULT_DICTIONARY_PATH)]
    pub dictionary: String,

    /// 临时标记类名
    #[arg(long, default_value = class_config::MARKER_CLASS)]
    pub marker_class: String,

    /// 已转写片段的类名
    #[arg(long, default_value = class_config::USE_CLASS)]
    pub use_class: String,

    /// 未找到词条片段的类名
    #[arg(long, default_value = class_config::EXCLUDE_CLASS)]
    pub exclude_class: String,

    /// 音标字体族名称
    #[arg(long, default_value = font_config::DEFAULT_FONT_FAMILY)]
    pub font_family: String,

    /// 字体文件URL，指定后向<head>注入@font-face样式
    #[arg(long, value_name = "URL")]
    pub font_url: Option<String>,

    /// 不处理data URI内嵌的iframe文档
    #[arg(long)]
    pub no_frames: bool,

    /// 目录模式下的并发文件数
    #[arg(long, default_value_t = output_config::DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// 将JSON格式的处理报告写入文件
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// 详细输出模式
    #[arg(short, long)]
    pub verbose: bool,

    /// 静默模式 (仅输出错误)
    #[arg(short, long)]
    pub quiet: bool,

    /// 显示性能统计
    #[arg(long)]
    pub stats: bool,

    /// 爬取超时时间（秒）
    #[arg(long, default_value_t = crawler_config::DEFAULT_CRAWL_TIMEOUT, help = "网页爬取的超时时间（秒）")]
    pub crawl_timeout: u64,

    /// 自定义User-Agent
    #[arg(long, help = "自定义User-Agent字符串")]
    pub user_agent: Option<String>,

    /// 爬取时包含图片资源
    #[arg(long, help = "爬取网页时包含图片资源")]
    pub include_images: bool,

    /// 爬取时包含CSS样式
    #[arg(long, help = "爬取网页时包含CSS样式文件")]
    pub include_css: bool,
}

impl Cli {
    /// 根据命令行参数构建转写配置
    pub fn transcription_config(&self) -> Result<TranscriptionConfig> {
        let mut config = TranscriptionConfig::new()
            .with_marker_class(&self.marker_class)
            .with_use_class(&self.use_class)
            .with_exclude_class(&self.exclude_class)
            .process_frames(!self.no_frames);

        if let Some(url) = &self.font_url {
            config = config.with_font(&self.font_family, url);
        }

        config.validate()?;
        Ok(config)
    }
}
