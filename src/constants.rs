/// 音标转写相关常量配置
///
/// 该文件定义了词典、样式类名、字体和爬取相关的默认值，方便统一管理和维护

/// 词典配置
pub mod dictionary_config {
    /// 默认词典文件路径
    pub const DEFAULT_DICTIONARY_PATH: &str = "resources/en_US.txt";

    /// 多读音之间的分隔符
    pub const ALTERNATE_SEPARATOR: char = ',';

    /// 主重音符号 ˈ
    pub const PRIMARY_STRESS: char = '\u{02c8}';

    /// 次重音符号 ˌ
    pub const SECONDARY_STRESS: char = '\u{02cc}';

    /// 清齿擦音 θ
    pub const VOICELESS_DENTAL_FRICATIVE: char = '\u{03b8}';

    /// θ 的ASCII占位符（自定义字体中的对应字形）
    pub const FRICATIVE_PLACEHOLDER: &str = "T";

    /// 音标两侧的斜杠
    pub const TRANSCRIPTION_DELIMITER: char = '/';
}

/// 分词配置
pub mod tokenizer_config {
    /// 需要从单词两端剥离的标点符号集合
    pub const PUNCTUATION_SYMBOLS: &str = "!?.,()[]{}-+=_/\\*<>:;\"'|\u{201d}\u{201c}";

    /// 文本片段的分词分隔符
    pub const TOKEN_SEPARATOR: char = ' ';
}

/// DOM样式类名配置
pub mod class_config {
    /// 临时标记类名（处理结束后移除）
    pub const MARKER_CLASS: &str = "translate-to-ipa";

    /// 已转写片段的类名
    pub const USE_CLASS: &str = "use-trunic";

    /// 未找到词条、保留原文片段的类名
    pub const EXCLUDE_CLASS: &str = "exclude-trunic";

    /// 不参与转写的原始文本元素
    pub const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "textarea", "iframe"];
}

/// 字体配置
pub mod font_config {
    /// 默认音标字体族名称
    pub const DEFAULT_FONT_FAMILY: &str = "Trunic";

    /// 注入样式表的元素ID
    pub const STYLESHEET_ID: &str = "text-to-ipa-font";
}

/// 网页爬取配置
pub mod crawler_config {
    /// 默认爬取超时时间（秒）
    pub const DEFAULT_CRAWL_TIMEOUT: u64 = 30;

    /// 默认User-Agent
    pub const DEFAULT_USER_AGENT: &str = "text-to-ipa/0.1.0 (Monolith Web Crawler)";

    /// 最大重试次数
    pub const MAX_CRAWL_RETRIES: u32 = 3;
}

/// 输出配置
pub mod output_config {
    /// 输出文件名后缀
    pub const OUTPUT_SUFFIX: &str = "ipa";

    /// 目录模式下默认并发文件数
    pub const DEFAULT_CONCURRENCY: usize = 4;

    /// 目录模式下识别的HTML扩展名
    pub const HTML_EXTENSIONS: &[&str] = &["html", "htm", "xhtml"];
}

/// 判断字符是否属于剥离的标点集合
pub fn is_punctuation_symbol(c: char) -> bool {
    tokenizer_config::PUNCTUATION_SYMBOLS.contains(c)
}

/// 判断扩展名是否为HTML文件
pub fn is_html_extension(ext: &str) -> bool {
    output_config::HTML_EXTENSIONS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(ext))
}

/// 判断元素是否为跳过转写的原始文本元素
pub fn is_skipped_element(tag_name: &str) -> bool {
    class_config::SKIPPED_ELEMENTS.contains(&tag_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_punctuation_symbols() {
        assert!(is_punctuation_symbol('!'));
        assert!(is_punctuation_symbol('\\'));
        assert!(is_punctuation_symbol('\u{201c}'));
        assert!(is_punctuation_symbol('"'));
        assert!(!is_punctuation_symbol('a'));
        assert!(!is_punctuation_symbol(' '));
        assert!(!is_punctuation_symbol('$'));
    }

    #[test]
    fn test_html_extension() {
        assert!(is_html_extension("html"));
        assert!(is_html_extension("HTM"));
        assert!(!is_html_extension("txt"));
    }

    #[test]
    fn test_skipped_elements() {
        assert!(is_skipped_element("script"));
        assert!(is_skipped_element("style"));
        assert!(!is_skipped_element("p"));
    }
}
