//! text-to-ipa - HTML音标转写工具库
//!
//! 这个库提供了IPA词典加载、标点分词、文本替换、DOM改写以及网页爬取等核心功能。

pub mod config;
pub mod constants;
pub mod dictionary;
pub mod error;
pub mod html_processor;
pub mod stats;
pub mod substitution;
pub mod tokenizer;
pub mod transcriber;
pub mod utils;
pub mod web_crawler;
