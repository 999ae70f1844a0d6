//! 分词与标点剥离模块
//!
//! 将一个以空白分隔的词元拆分为：前导标点、单词本体、尾随标点。

use crate::constants::is_punctuation_symbol;

/// 拆分后的词元
///
/// `leading_punctuation + core + trailing_punctuation` 与原始词元完全一致。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Token {
    /// 去除两端标点后的单词本体（可以为空）
    pub core: String,
    /// 前导标点
    pub leading_punctuation: String,
    /// 尾随标点
    pub trailing_punctuation: String,
}

impl Token {
    /// 重新拼接为原始词元
    pub fn reconstruct(&self) -> String {
        self.wrap(&self.core)
    }

    /// 用原有标点包裹替换后的文本
    pub fn wrap(&self, replacement: &str) -> String {
        let mut out = String::with_capacity(
            self.leading_punctuation.len() + replacement.len() + self.trailing_punctuation.len(),
        );
        out.push_str(&self.leading_punctuation);
        out.push_str(replacement);
        out.push_str(&self.trailing_punctuation);
        out
    }
}

/// 剥离词元两端的标点
///
/// 先从开头贪婪剥离，再从结尾剥离。全部由标点组成的词元
/// 得到空的单词本体，所有字符归入前导标点。
pub fn split_punctuation(token: &str) -> Token {
    let rest = token.trim_start_matches(is_punctuation_symbol);
    let leading = &token[..token.len() - rest.len()];

    let core = rest.trim_end_matches(is_punctuation_symbol);
    let trailing = &rest[core.len()..];

    Token {
        core: core.to_string(),
        leading_punctuation: leading.to_string(),
        trailing_punctuation: trailing.to_string(),
    }
}

/// 按单个空格切分文本片段
///
/// 连续空格会产生空词元，与页面脚本的历史行为一致。
pub fn split_tokens(text: &str) -> Vec<&str> {
    text.split(crate::constants::tokenizer_config::TOKEN_SEPARATOR).collect()
}
