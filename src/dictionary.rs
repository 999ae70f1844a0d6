//! 音标词典模块
//!
//! 负责把纯文本的英语→IPA词典解析为内存中的映射表，并提供查询。
//!
//! 词典格式：每行一个词条，字段之间以空白分隔
//!
//! ```text
//! hello /həˈloʊ/
//! read /ˈrɛd/, /ˈrid/
//! ```
//!
//! 只使用前两个字段，其余字段忽略。重复的单词以最后一行为准。

// 标准库导入
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

// 第三方crate导入
use tracing::{debug, info, warn};
use url::Url;

// 本地模块导入
use crate::constants::dictionary_config::{
    ALTERNATE_SEPARATOR, FRICATIVE_PLACEHOLDER, PRIMARY_STRESS, SECONDARY_STRESS,
    TRANSCRIPTION_DELIMITER, VOICELESS_DENTAL_FRICATIVE,
};
use crate::error::Result;
use crate::ipa_error;

/// 单次查询的结果
///
/// 每次查询时构造，由调用方立即消费。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    /// 找到唯一读音
    Found(String),
    /// 找到多个读音，已取第一个
    FoundAmbiguous(String),
    /// 词典中没有该单词，携带原始单词
    NotFound(String),
}

/// 查询状态（不含文本）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStatus {
    Found,
    Ambiguous,
    NotFound,
}

impl LookupResult {
    /// 结果文本：音标或原始单词
    pub fn text(&self) -> &str {
        match self {
            LookupResult::Found(text)
            | LookupResult::FoundAmbiguous(text)
            | LookupResult::NotFound(text) => text,
        }
    }

    pub fn status(&self) -> LookupStatus {
        match self {
            LookupResult::Found(_) => LookupStatus::Found,
            LookupResult::FoundAmbiguous(_) => LookupStatus::Ambiguous,
            LookupResult::NotFound(_) => LookupStatus::NotFound,
        }
    }
}

/// 英语→IPA词典
///
/// 加载后不可变；查询时由调用方负责转换为小写。
#[derive(Debug, Clone, Default)]
pub struct IpaDictionary {
    entries: HashMap<String, String>,
    skipped_lines: usize,
}

impl IpaDictionary {
    /// 创建空词典
    pub fn new() -> Self {
        Self::default()
    }

    /// 从词典文本解析
    pub fn load(source_text: &str) -> Self {
        info!("📖 开始解析词典...");

        let mut entries = HashMap::new();
        let mut skipped_lines = 0;

        for (line_no, line) in source_text.lines().enumerate() {
            let mut fields = line.split_whitespace();
            let word = match fields.next() {
                Some(word) => word,
                None => continue,
            };

            match fields.next() {
                Some(transcription) => {
                    entries.insert(word.to_string(), transcription.to_string());
                }
                None => {
                    // 以最后一行为准：缺少音标的行使之前的同名词条失效
                    entries.remove(word);
                    debug!("跳过缺少音标的词条 (第 {} 行): '{}'", line_no + 1, word);
                    skipped_lines += 1;
                }
            }
        }

        info!("✅ 词典解析完成: {} 个词条", entries.len());

        Self {
            entries,
            skipped_lines,
        }
    }

    /// 从指定来源异步加载词典
    pub async fn load_from(source: &DictionarySource) -> Result<Self> {
        let text = source.fetch_text().await?;
        let dictionary = Self::load(&text);

        if dictionary.is_empty() {
            warn!("⚠️  词典 {} 中没有任何有效词条", source);
        }

        Ok(dictionary)
    }

    /// 查询单词
    ///
    /// 永不失败：词典为空或单词不存在时返回 `NotFound`。
    /// 多个读音时标记为歧义并使用第一个读音，并清理重音符号和斜杠。
    pub fn lookup(&self, word: &str) -> LookupResult {
        if self.entries.is_empty() {
            warn!("⚠️  词典为空，是否已加载词典？查询: '{}'", word);
            return LookupResult::NotFound(word.to_string());
        }

        let stored = match self.entries.get(word) {
            Some(stored) => stored,
            None => return LookupResult::NotFound(word.to_string()),
        };

        let mut alternates = stored.split(ALTERNATE_SEPARATOR);
        let first = alternates.next().unwrap_or_default();
        let ambiguous = alternates.next().is_some();
        let cleaned = clean_transcription(first);

        if ambiguous {
            LookupResult::FoundAmbiguous(cleaned)
        } else {
            LookupResult::Found(cleaned)
        }
    }

    /// 词条数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 解析时因缺少音标字段被跳过的行数
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }
}

/// 清理单个读音：去掉主次重音、斜杠，θ 替换为占位符
pub fn clean_transcription(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            PRIMARY_STRESS | SECONDARY_STRESS | TRANSCRIPTION_DELIMITER => {}
            VOICELESS_DENTAL_FRICATIVE => out.push_str(FRICATIVE_PLACEHOLDER),
            other => out.push(other),
        }
    }
    out
}

/// 词典来源
///
/// 本地文件或通过HTTP获取的远程文件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictionarySource {
    /// 本地文件路径
    File(PathBuf),
    /// 远程URL
    Url(Url),
}

impl DictionarySource {
    /// 根据位置字符串判断来源类型
    pub fn parse(location: &str) -> Result<Self> {
        if location.trim().is_empty() {
            return Err(ipa_error!(input_validation, location, "词典位置不能为空"));
        }

        if let Ok(url) = Url::parse(location) {
            match url.scheme() {
                "http" | "https" => return Ok(DictionarySource::Url(url)),
                "file" => {
                    let path = url.to_file_path().map_err(|_| {
                        ipa_error!(input_validation, location, "无效的file URL")
                    })?;
                    return Ok(DictionarySource::File(path));
                }
                _ => {}
            }
        }

        Ok(DictionarySource::File(PathBuf::from(location)))
    }

    /// 读取词典原始文本
    pub async fn fetch_text(&self) -> Result<String> {
        info!("📥 加载词典: {}", self);

        match self {
            DictionarySource::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| ipa_error!(dictionary, path.display(), e)),
            DictionarySource::Url(url) => {
                let client = reqwest::Client::builder()
                    .timeout(Duration::from_secs(30))
                    .build()?;

                let response = client.get(url.clone()).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(ipa_error!(
                        network,
                        format!("词典下载返回错误状态: {}", url),
                        status.as_u16()
                    ));
                }

                Ok(response.text().await?)
            }
        }
    }
}

impl std::fmt::Display for DictionarySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DictionarySource::File(path) => write!(f, "{}", path.display()),
            DictionarySource::Url(url) => write!(f, "{}", url),
        }
    }
}
