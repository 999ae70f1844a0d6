//! HTML处理模块
//!
//! 提供HTML解析、音标转写的DOM改写和序列化功能。
//!
//! 改写直接遍历解析后的节点树，只处理文本节点，分四个阶段：
//! 1. 标记：把每段连续的非空白字符包进临时标记 `<span>`
//! 2. 转写：对新建的标记逐个查询词典，替换为音标或标记为排除
//! 3. 合并：仅以空白分隔、类名相同的相邻标记合并为一个
//! 4. 去标记：移除临时标记类名，只保留转写/排除类名

// 标准库导入
use std::cell::RefCell;
use std::rc::Rc;

// 第三方crate导入
use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{parse_document, Attribute, LocalName, Namespace, QualName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom};
use regex::Regex;
use tracing::{debug, info, warn};

// 本地模块导入
use crate::config::{FontStylesheet, TranscriptionConfig};
use crate::constants::{font_config, is_skipped_element};
use crate::dictionary::{IpaDictionary, LookupStatus};
use crate::error;
use crate::ipa_error;
use crate::substitution::Substitutor;
use crate::utils::extract_base64_from_data_uri;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// 一次改写的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteReport {
    /// 新建的标记数量
    pub spans_marked: usize,
    /// 替换为音标的标记数量
    pub spans_translated: usize,
    /// 未找到词条、保留原文的标记数量
    pub spans_excluded: usize,
    /// 含多读音单词的标记数量
    pub spans_ambiguous: usize,
    pub tokens_found: usize,
    pub tokens_not_found: usize,
    /// 合并掉的标记数量
    pub spans_merged: usize,
    /// 转写过的内嵌iframe文档数量
    pub frames_rewritten: usize,
}

impl RewriteReport {
    /// 累加另一份统计
    pub fn absorb(&mut self, other: &RewriteReport) {
        self.spans_marked += other.spans_marked;
        self.spans_translated += other.spans_translated;
        self.spans_excluded += other.spans_excluded;
        self.spans_ambiguous += other.spans_ambiguous;
        self.tokens_found += other.tokens_found;
        self.tokens_not_found += other.tokens_not_found;
        self.spans_merged += other.spans_merged;
        self.frames_rewritten += other.frames_rewritten;
    }
}

/// DOM音标改写器
///
/// 每次调用独立运行，不在调用之间保留状态。
pub struct HtmlRewriter<'a> {
    substitutor: Substitutor<'a>,
    config: &'a TranscriptionConfig,
    word_run: Regex,
}

impl<'a> HtmlRewriter<'a> {
    /// 创建改写器，词典必须已加载完成
    pub fn new(dictionary: &'a IpaDictionary, config: &'a TranscriptionConfig) -> Result<Self> {
        let word_run = Regex::new(r"\S+").context("编译正则表达式失败")?;

        Ok(Self {
            substitutor: Substitutor::new(dictionary),
            config,
            word_run,
        })
    }

    /// 解析、改写并序列化一个HTML文档
    pub fn transcribe_html(&self, html: &str) -> Result<(String, RewriteReport)> {
        let dom = parse_html(html)?;
        let report = self.rewrite_document(&dom);

        if let Some(font) = self.config.font() {
            inject_font_stylesheet(&dom, font, self.config.use_class());
        }

        let output = serialize_dom_to_html(&dom)?;
        Ok((output, report))
    }

    /// 改写整个文档：只处理 `<body>`（没有body时处理整个文档）
    pub fn rewrite_document(&self, dom: &RcDom) -> RewriteReport {
        let root = find_element(&dom.document, "body").unwrap_or_else(|| dom.document.clone());
        let mut report = self.rewrite(&root);

        if self.config.is_frames_enabled() {
            self.rewrite_frames(&root, &mut report);
        }

        report
    }

    /// 对一个子树执行 标记 → 转写 → 合并 → 去标记
    pub fn rewrite(&self, root: &Handle) -> RewriteReport {
        let mut report = RewriteReport::default();

        let spans = self.mark(root);
        report.spans_marked = spans.len();
        debug!("标记了 {} 个文本片段", spans.len());

        self.translate(&spans, &mut report);
        report.spans_merged = self.coalesce(root);
        self.unmark(root);

        report
    }

    /// 标记阶段，返回新建的标记节点
    pub fn mark(&self, root: &Handle) -> Vec<Handle> {
        let mut fresh = Vec::new();
        self.mark_children(root, &mut fresh);
        fresh
    }

    fn mark_children(&self, parent: &Handle, fresh: &mut Vec<Handle>) {
        let children: Vec<Handle> = parent.children.borrow().clone();
        let mut rebuilt = Vec::with_capacity(children.len());
        let mut changed = false;

        for child in children {
            match child.data {
                NodeData::Text { ref contents } => {
                    let text = contents.borrow().to_string();
                    if self.word_run.is_match(&text) {
                        self.wrap_word_runs(&text, &mut rebuilt, fresh);
                        changed = true;
                        continue;
                    }
                }
                NodeData::Element { ref name, .. } => {
                    if !self.is_protected(&child, &name.local) {
                        self.mark_children(&child, fresh);
                    }
                }
                _ => {}
            }
            rebuilt.push(child);
        }

        if changed {
            replace_children(parent, rebuilt);
        }
    }

    fn wrap_word_runs(&self, text: &str, rebuilt: &mut Vec<Handle>, fresh: &mut Vec<Handle>) {
        let mut last = 0;
        for run in self.word_run.find_iter(text) {
            if run.start() > last {
                rebuilt.push(new_text(&text[last..run.start()]));
            }
            let span = new_span(self.config.marker_class(), run.as_str());
            fresh.push(span.clone());
            rebuilt.push(span);
            last = run.end();
        }
        if last < text.len() {
            rebuilt.push(new_text(&text[last..]));
        }
    }

    /// 原始文本元素和已处理过的片段不再改写
    fn is_protected(&self, node: &Handle, tag_name: &str) -> bool {
        if is_skipped_element(tag_name) {
            return true;
        }
        class_list(node).iter().any(|class| {
            class == self.config.marker_class()
                || class == self.config.use_class()
                || class == self.config.exclude_class()
        })
    }

    /// 转写阶段
    pub fn translate(&self, spans: &[Handle], report: &mut RewriteReport) {
        for span in spans {
            let original = text_content(span);
            let substitution = self.substitutor.substitute(&original.to_lowercase());

            report.tokens_not_found += substitution.count(LookupStatus::NotFound);
            report.tokens_found += substitution.statuses.len() - substitution.count(LookupStatus::NotFound);

            match substitution.status {
                LookupStatus::NotFound => {
                    add_class(span, self.config.exclude_class());
                    report.spans_excluded += 1;
                }
                status => {
                    replace_children(span, vec![new_text(substitution.trimmed_text())]);
                    add_class(span, self.config.use_class());
                    report.spans_translated += 1;
                    if status == LookupStatus::Ambiguous {
                        report.spans_ambiguous += 1;
                    }
                }
            }
        }
    }

    /// 合并阶段，重复执行直到没有可合并的标记，返回合并次数
    pub fn coalesce(&self, root: &Handle) -> usize {
        let mut total = 0;
        loop {
            let merged = self.coalesce_pass(root);
            if merged == 0 {
                break;
            }
            total += merged;
        }
        total
    }

    fn coalesce_pass(&self, parent: &Handle) -> usize {
        let children: Vec<Handle> = parent.children.borrow().clone();
        let mut rebuilt = Vec::with_capacity(children.len());
        let mut merged_here = 0;
        let mut merged_below = 0;
        let mut i = 0;

        while i < children.len() {
            let current = children[i].clone();
            i += 1;

            if !self.is_marker_span(&current) {
                merged_below += self.coalesce_pass(&current);
                rebuilt.push(current);
                continue;
            }

            let classes = class_list(&current);
            let mut absorbed = false;
            loop {
                let mut j = i;
                while j < children.len() && is_whitespace_text(&children[j]) {
                    j += 1;
                }
                let mergeable = j < children.len()
                    && self.is_marker_span(&children[j])
                    && class_list(&children[j]) == classes;
                if !mergeable {
                    break;
                }

                let mut moved: Vec<Handle> = children[i..j].to_vec();
                moved.extend(children[j].children.borrow().iter().cloned());
                append_children(&current, moved);

                merged_here += 1;
                absorbed = true;
                i = j + 1;
            }

            if absorbed {
                normalize_text(&current);
            }
            rebuilt.push(current);
        }

        if merged_here > 0 {
            replace_children(parent, rebuilt);
        }
        merged_here + merged_below
    }

    fn is_marker_span(&self, node: &Handle) -> bool {
        is_element(node, "span") && has_class(node, self.config.marker_class())
    }

    /// 去标记阶段
    pub fn unmark(&self, node: &Handle) {
        if is_element(node, "span") && has_class(node, self.config.marker_class()) {
            remove_class(node, self.config.marker_class());
        }
        for child in node.children.borrow().iter() {
            self.unmark(child);
        }
    }

    /// 转写 `data:text/html;base64` 形式的内嵌iframe文档
    fn rewrite_frames(&self, node: &Handle, report: &mut RewriteReport) {
        if let NodeData::Element { ref name, ref attrs, .. } = node.data {
            if &*name.local == "iframe" {
                let mut attrs = attrs.borrow_mut();
                if let Some(src) = attrs.iter_mut().find(|a| &*a.name.local == "src") {
                    match self.rewrite_frame_src(&src.value) {
                        Ok(Some((new_src, frame_report))) => {
                            src.value = StrTendril::from(new_src);
                            report.absorb(&frame_report);
                            report.frames_rewritten += 1;
                        }
                        Ok(None) => {}
                        Err(e) => warn!("⚠️  跳过无法处理的iframe文档: {}", e),
                    }
                }
            }
        }

        for child in node.children.borrow().iter() {
            self.rewrite_frames(child, report);
        }
    }

    fn rewrite_frame_src(&self, src: &str) -> Result<Option<(String, RewriteReport)>> {
        if !src.starts_with("data:text/html") {
            return Ok(None);
        }
        let comma = match src.find(',') {
            Some(pos) => pos,
            None => return Ok(None),
        };
        let header = &src[..comma];
        if !header.ends_with(";base64") {
            return Ok(None);
        }
        let encoded = match extract_base64_from_data_uri(src) {
            Some(encoded) => encoded,
            None => return Ok(None),
        };

        let decoded = general_purpose::STANDARD
            .decode(encoded.trim())
            .context("iframe内容Base64解码失败")?;
        let html = String::from_utf8(decoded).context("iframe内容不是有效的UTF-8")?;
        info!("🔍 转写内嵌iframe文档 ({} 字符)", html.len());

        let (rewritten, frame_report) = self.transcribe_html(&html)?;
        let new_src = format!("{},{}", header, general_purpose::STANDARD.encode(rewritten));
        Ok(Some((new_src, frame_report)))
    }
}

/// 向 `<head>` 注入音标字体样式表
///
/// 已存在同ID的样式元素时先移除，保证只注入一次。没有 `<head>` 时返回 false。
pub fn inject_font_stylesheet(dom: &RcDom, font: &FontStylesheet, use_class: &str) -> bool {
    let head = match find_element(&dom.document, "head") {
        Some(head) => head,
        None => {
            warn!("⚠️  文档没有<head>，跳过字体样式注入");
            return false;
        }
    };

    let mut children: Vec<Handle> = head
        .children
        .borrow()
        .iter()
        .filter(|child| {
            !(is_element(child, "style")
                && attribute_value(child, "id").as_deref() == Some(font_config::STYLESHEET_ID))
        })
        .cloned()
        .collect();

    let css = format!(
        "@font-face {{ font-family: \"{family}\"; src: url(\"{url}\"); }} .{class} {{ font-family: \"{family}\"; }}",
        family = font.family.replace('"', ""),
        url = font.url.replace('"', "%22"),
        class = use_class,
    );
    let style = new_element("style", &[("id", font_config::STYLESHEET_ID)]);
    append_children(&style, vec![new_text(&css)]);
    children.push(style);
    replace_children(&head, children);

    debug!("注入字体样式表: {}", font.family);
    true
}

/// 解析HTML文档
pub fn parse_html(html: &str) -> error::Result<RcDom> {
    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .map_err(|e| ipa_error!(html_parse, format!("解析失败: {}", e)))
}

/// 序列化DOM为HTML字符串
pub fn serialize_dom_to_html(dom: &RcDom) -> error::Result<String> {
    use html5ever::serialize::{serialize, SerializeOpts};
    use markup5ever_rcdom::SerializableHandle;
    use std::io::Cursor;

    let mut buffer = Vec::new();
    let cursor = Cursor::new(&mut buffer);

    serialize(
        cursor,
        &SerializableHandle::from(dom.document.clone()),
        SerializeOpts::default(),
    )
    .map_err(|e| ipa_error!(html_parse, format!("序列化失败: {}", e)))?;

    String::from_utf8(buffer).map_err(|e| ipa_error!(html_parse, format!("UTF-8转换失败: {}", e)))
}

// ---- 节点操作 ----

fn qual_name(namespace: &str, local: &str) -> QualName {
    QualName::new(None, Namespace::from(namespace), LocalName::from(local))
}

fn new_element(tag_name: &str, attrs: &[(&str, &str)]) -> Handle {
    let attrs = attrs
        .iter()
        .map(|(name, value)| Attribute {
            name: qual_name("", name),
            value: StrTendril::from_slice(value),
        })
        .collect();

    Node::new(NodeData::Element {
        name: qual_name(HTML_NAMESPACE, tag_name),
        attrs: RefCell::new(attrs),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

fn new_span(class: &str, text: &str) -> Handle {
    let span = new_element("span", &[("class", class)]);
    append_children(&span, vec![new_text(text)]);
    span
}

fn new_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from_slice(text)),
    })
}

fn append_children(parent: &Handle, nodes: Vec<Handle>) {
    for node in &nodes {
        node.parent.set(Some(Rc::downgrade(parent)));
    }
    parent.children.borrow_mut().extend(nodes);
}

fn replace_children(parent: &Handle, nodes: Vec<Handle>) {
    for node in &nodes {
        node.parent.set(Some(Rc::downgrade(parent)));
    }
    *parent.children.borrow_mut() = nodes;
}

/// 把只含文本的子节点合并为一个文本节点
fn normalize_text(node: &Handle) {
    let all_text = node
        .children
        .borrow()
        .iter()
        .all(|child| matches!(child.data, NodeData::Text { .. }));
    if all_text {
        let combined = text_content(node);
        replace_children(node, vec![new_text(&combined)]);
    }
}

fn find_element(node: &Handle, tag_name: &str) -> Option<Handle> {
    if is_element(node, tag_name) {
        return Some(node.clone());
    }
    node.children
        .borrow()
        .iter()
        .find_map(|child| find_element(child, tag_name))
}

fn is_element(node: &Handle, tag_name: &str) -> bool {
    match node.data {
        NodeData::Element { ref name, .. } => &*name.local == tag_name,
        _ => false,
    }
}

fn is_whitespace_text(node: &Handle) -> bool {
    match node.data {
        NodeData::Text { ref contents } => contents.borrow().chars().all(char::is_whitespace),
        _ => false,
    }
}

fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    out
}

fn collect_text(node: &Handle, out: &mut String) {
    if let NodeData::Text { ref contents } = node.data {
        out.push_str(&contents.borrow());
    }
    for child in node.children.borrow().iter() {
        collect_text(child, out);
    }
}

fn attribute_value(node: &Handle, attr_name: &str) -> Option<String> {
    match node.data {
        NodeData::Element { ref attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == attr_name)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

fn class_list(node: &Handle) -> Vec<String> {
    attribute_value(node, "class")
        .map(|value| value.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

fn has_class(node: &Handle, class: &str) -> bool {
    class_list(node).iter().any(|c| c == class)
}

fn set_class_list(node: &Handle, classes: &[String]) {
    if let NodeData::Element { ref attrs, .. } = node.data {
        let mut attrs = attrs.borrow_mut();
        let value = classes.join(" ");
        let existing = attrs.iter().position(|a| &*a.name.local == "class");

        match existing {
            Some(pos) if value.is_empty() => {
                attrs.remove(pos);
            }
            Some(pos) => attrs[pos].value = StrTendril::from(value),
            None if value.is_empty() => {}
            None => attrs.push(Attribute {
                name: qual_name("", "class"),
                value: StrTendril::from(value),
            }),
        }
    }
}

fn add_class(node: &Handle, class: &str) {
    let mut classes = class_list(node);
    if !classes.iter().any(|c| c == class) {
        classes.push(class.to_string());
        set_class_list(node, &classes);
    }
}

fn remove_class(node: &Handle, class: &str) {
    let mut classes = class_list(node);
    classes.retain(|c| c != class);
    set_class_list(node, &classes);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dictionary() -> IpaDictionary {
        IpaDictionary::load(
            "hello /həˈloʊ/\n\
             world /ˈwɝld/\n\
             read /ˈrɛd/,/ˈrid/\n\
             the /ðə/\n\
             book /ˈbʊk/\n",
        )
    }

    fn transcribe(html: &str) -> (String, RewriteReport) {
        let dict = dictionary();
        let config = TranscriptionConfig::default();
        let rewriter = HtmlRewriter::new(&dict, &config).unwrap();
        rewriter.transcribe_html(html).unwrap()
    }

    #[test]
    fn test_translate_and_coalesce() {
        let (html, report) = transcribe("<p>Hello, world!</p>");
        assert!(html.contains("<p><span class=\"use-trunic\">həloʊ, wɝld!</span></p>"), "{}", html);
        assert!(!html.contains("translate-to-ipa"));
        assert_eq!(report.spans_marked, 2);
        assert_eq!(report.spans_translated, 2);
        assert_eq!(report.spans_merged, 1);
    }

    #[test]
    fn test_missing_word_is_excluded() {
        let (html, report) = transcribe("<p>zzz</p>");
        assert!(html.contains("<p><span class=\"exclude-trunic\">zzz</span></p>"), "{}", html);
        assert_eq!(report.spans_excluded, 1);
        assert_eq!(report.tokens_not_found, 1);
    }

    #[test]
    fn test_mixed_spans_not_merged() {
        let (html, _) = transcribe("<p>Hello ZZZ world</p>");
        assert!(
            html.contains(
                "<p><span class=\"use-trunic\">həloʊ</span> <span class=\"exclude-trunic\">ZZZ</span> <span class=\"use-trunic\">wɝld</span></p>"
            ),
            "{}",
            html
        );
    }

    #[test]
    fn test_ambiguous_uses_first_alternate() {
        let (html, report) = transcribe("<p>Read the book.</p>");
        assert!(html.contains("<span class=\"use-trunic\">rɛd ðə bʊk.</span>"), "{}", html);
        assert_eq!(report.spans_ambiguous, 1);
    }

    #[test]
    fn test_markup_boundaries_preserved() {
        let (html, _) = transcribe("<p>Hello <b>world</b>!</p>");
        assert!(
            html.contains(
                "<p><span class=\"use-trunic\">həloʊ</span> <b><span class=\"use-trunic\">wɝld</span></b><span class=\"exclude-trunic\">!</span></p>"
            ),
            "{}",
            html
        );
    }

    #[test]
    fn test_entities_and_attributes_untouched() {
        let (html, _) = transcribe("<p title=\"hello\">Hello &amp; world</p>");
        assert!(html.contains("title=\"hello\""));
        assert!(html.contains("<span class=\"exclude-trunic\">&amp;</span>"), "{}", html);
    }

    #[test]
    fn test_raw_text_elements_skipped() {
        let (html, report) = transcribe(
            "<html><head><title>Hello</title></head><body><script>var hello = 1;</script><style>p { color: red; }</style><p>hello</p></body></html>",
        );
        assert!(html.contains("<title>Hello</title>"));
        assert!(html.contains("<script>var hello = 1;</script>"));
        assert!(html.contains("<style>p { color: red; }</style>"));
        assert_eq!(report.spans_marked, 1);
    }

    #[test]
    fn test_second_pass_is_idempotent() {
        let dict = dictionary();
        let config = TranscriptionConfig::default();
        let rewriter = HtmlRewriter::new(&dict, &config).unwrap();

        let (first, _) = rewriter.transcribe_html("<p>Hello zzz, world!</p>").unwrap();
        let (second, report) = rewriter.transcribe_html(&first).unwrap();

        assert_eq!(first, second);
        assert_eq!(report.spans_marked, 0);
        assert_eq!(report.spans_translated, 0);
    }

    #[test]
    fn test_empty_dictionary_excludes_everything() {
        let dict = IpaDictionary::new();
        let config = TranscriptionConfig::default();
        let rewriter = HtmlRewriter::new(&dict, &config).unwrap();

        let (html, report) = rewriter.transcribe_html("<p>Hello world</p>").unwrap();
        assert!(html.contains("<span class=\"exclude-trunic\">Hello world</span>"), "{}", html);
        assert_eq!(report.spans_translated, 0);
        assert_eq!(report.spans_excluded, 2);
    }

    #[test]
    fn test_custom_classes() {
        let dict = dictionary();
        let config = TranscriptionConfig::new()
            .with_marker_class("tmp")
            .with_use_class("ipa")
            .with_exclude_class("plain");
        let rewriter = HtmlRewriter::new(&dict, &config).unwrap();

        let (html, _) = rewriter.transcribe_html("<p>hello</p>").unwrap();
        assert!(html.contains("<span class=\"ipa\">həloʊ</span>"), "{}", html);
        assert!(!html.contains("tmp"));
    }

    #[test]
    fn test_frame_document_rewritten() {
        let inner = general_purpose::STANDARD.encode("<p>hello</p>");
        let page = format!("<iframe src=\"data:text/html;base64,{}\"></iframe>", inner);
        let (html, report) = transcribe(&page);

        assert_eq!(report.frames_rewritten, 1);
        assert_eq!(report.spans_translated, 1);

        let start = html.find("base64,").unwrap() + "base64,".len();
        let end = start + html[start..].find('"').unwrap();
        let decoded = general_purpose::STANDARD.decode(&html[start..end]).unwrap();
        let frame = String::from_utf8(decoded).unwrap();
        assert!(frame.contains("<span class=\"use-trunic\">həloʊ</span>"), "{}", frame);
    }

    #[test]
    fn test_frames_disabled() {
        let dict = dictionary();
        let config = TranscriptionConfig::new().process_frames(false);
        let rewriter = HtmlRewriter::new(&dict, &config).unwrap();

        let inner = general_purpose::STANDARD.encode("<p>hello</p>");
        let page = format!("<iframe src=\"data:text/html;base64,{}\"></iframe>", inner);
        let (html, report) = rewriter.transcribe_html(&page).unwrap();

        assert_eq!(report.frames_rewritten, 0);
        assert!(html.contains(&inner));
    }

    #[test]
    fn test_font_stylesheet_injected_once() {
        let font = FontStylesheet {
            family: "Trunic".to_string(),
            url: "fonts/Trunic.woff".to_string(),
        };
        let dom = parse_html("<html><head></head><body><p>hello</p></body></html>").unwrap();

        assert!(inject_font_stylesheet(&dom, &font, "use-trunic"));
        assert!(inject_font_stylesheet(&dom, &font, "use-trunic"));

        let html = serialize_dom_to_html(&dom).unwrap();
        assert_eq!(html.matches("text-to-ipa-font").count(), 1);
        assert!(html.contains("url(\"fonts/Trunic.woff\")"));
        assert!(html.contains(".use-trunic { font-family: \"Trunic\"; }"));
    }

    #[test]
    fn test_class_helpers() {
        let span = new_span("a", "text");
        add_class(&span, "b");
        add_class(&span, "b");
        assert_eq!(class_list(&span), vec!["a".to_string(), "b".to_string()]);

        remove_class(&span, "a");
        remove_class(&span, "b");
        assert!(attribute_value(&span, "class").is_none());
        assert_eq!(text_content(&span), "text");
    }
}
