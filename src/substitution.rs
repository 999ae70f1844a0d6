//! 文本替换引擎
//!
//! 对一段文本按空格分词，逐个查询词典并用音标替换，保留两端标点。

use tracing::debug;

use crate::dictionary::{IpaDictionary, LookupStatus};
use crate::tokenizer::{split_punctuation, split_tokens};

/// 文本片段整体状态的计算策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusPolicy {
    /// 汇总所有词元：全部未找到才算未找到，任一歧义即为歧义
    #[default]
    Aggregate,
    /// 只保留最后一个词元的状态（兼容页面脚本的历史行为）
    LastToken,
}

/// 一次替换的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    /// 以单个空格连接并附带一个尾随空格的文本
    pub text: String,
    /// 按策略计算的整体状态
    pub status: LookupStatus,
    /// 每个词元的状态
    pub statuses: Vec<LookupStatus>,
}

impl Substitution {
    /// 去掉拼接时附加的尾随空格
    pub fn trimmed_text(&self) -> &str {
        self.text.strip_suffix(' ').unwrap_or(&self.text)
    }

    pub fn count(&self, status: LookupStatus) -> usize {
        self.statuses.iter().filter(|s| **s == status).count()
    }
}

/// 替换引擎，借用一个已加载的词典
#[derive(Debug, Clone, Copy)]
pub struct Substitutor<'d> {
    dictionary: &'d IpaDictionary,
    policy: StatusPolicy,
}

impl<'d> Substitutor<'d> {
    pub fn new(dictionary: &'d IpaDictionary) -> Self {
        Self {
            dictionary,
            policy: StatusPolicy::default(),
        }
    }

    /// 设置状态计算策略
    pub fn with_policy(mut self, policy: StatusPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 替换一段文本中的所有单词
    pub fn substitute(&self, text: &str) -> Substitution {
        let mut statuses = Vec::new();
        let mut out = String::with_capacity(text.len() * 2);

        for raw in split_tokens(text) {
            let token = split_punctuation(raw);
            let word = token.core.to_lowercase();
            let result = self.dictionary.lookup(&word);
            out.push_str(&token.wrap(result.text()));
            out.push(' ');
            statuses.push(result.status());
        }

        let status = self.overall_status(&statuses);
        debug!("替换 '{}' -> '{}' ({:?})", text, out, status);

        Substitution {
            text: out,
            status,
            statuses,
        }
    }

    fn overall_status(&self, statuses: &[LookupStatus]) -> LookupStatus {
        match self.policy {
            StatusPolicy::LastToken => statuses.last().copied().unwrap_or(LookupStatus::NotFound),
            StatusPolicy::Aggregate => {
                if statuses.iter().all(|s| *s == LookupStatus::NotFound) {
                    LookupStatus::NotFound
                } else if statuses.iter().any(|s| *s == LookupStatus::Ambiguous) {
                    LookupStatus::Ambiguous
                } else {
                    LookupStatus::Found
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dictionary() -> IpaDictionary {
        IpaDictionary::load("hello /həˈloʊ/\nworld /ˈwɝld/\nread /ˈrɛd/,/ˈrid/\n")
    }

    #[test]
    fn test_substitute_with_punctuation() {
        let dict = dictionary();
        let result = Substitutor::new(&dict).substitute("Hello, world!");
        assert_eq!(result.text, "həloʊ, wɝld! ");
        assert_eq!(result.trimmed_text(), "həloʊ, wɝld!");
        assert_eq!(result.status, LookupStatus::Found);
        assert_eq!(result.statuses.len(), 2);
    }

    #[test]
    fn test_not_found_keeps_lowercased_word() {
        let dict = dictionary();
        let result = Substitutor::new(&dict).substitute("(zzz)");
        assert_eq!(result.text, "(zzz) ");
        assert_eq!(result.status, LookupStatus::NotFound);
    }

    #[test]
    fn test_aggregate_status() {
        let dict = dictionary();
        let engine = Substitutor::new(&dict);

        let result = engine.substitute("read zzz");
        assert_eq!(result.status, LookupStatus::Ambiguous);
        assert_eq!(result.count(LookupStatus::NotFound), 1);

        let result = engine.substitute("hello zzz");
        assert_eq!(result.status, LookupStatus::Found);

        let result = engine.substitute("qqq zzz");
        assert_eq!(result.status, LookupStatus::NotFound);
    }

    #[test]
    fn test_last_token_status() {
        let dict = dictionary();
        let engine = Substitutor::new(&dict).with_policy(StatusPolicy::LastToken);

        assert_eq!(engine.substitute("zzz hello").status, LookupStatus::Found);
        assert_eq!(engine.substitute("hello zzz").status, LookupStatus::NotFound);
        assert_eq!(engine.substitute("zzz read").status, LookupStatus::Ambiguous);
    }

    #[test]
    fn test_consecutive_spaces() {
        let dict = dictionary();
        let result = Substitutor::new(&dict).substitute("hello  world");
        assert_eq!(result.text, "həloʊ  wɝld ");
        assert_eq!(result.statuses.len(), 3);
    }
}
