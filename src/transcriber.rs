use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::config::TranscriptionConfig;
use crate::dictionary::IpaDictionary;
use crate::html_processor::{HtmlRewriter, RewriteReport};
use crate::stats::TranscriptionStats;
use crate::utils::{collect_html_files, mirror_output_path};
use crate::web_crawler::WebCrawler;

/// 音标转写器
///
/// 持有已加载的词典和转写配置，两者加载后只读，可在多个文档之间共享。
#[derive(Clone)]
pub struct Transcriber {
    dictionary: Arc<IpaDictionary>,
    config: Arc<TranscriptionConfig>,
}

impl Transcriber {
    pub fn new(dictionary: IpaDictionary, config: TranscriptionConfig) -> Self {
        Self {
            dictionary: Arc::new(dictionary),
            config: Arc::new(config),
        }
    }

    /// 同步转写一个HTML字符串
    pub fn transcribe_html(&self, html: &str) -> Result<(String, RewriteReport)> {
        HtmlRewriter::new(&self.dictionary, &self.config)?.transcribe_html(html)
    }

    /// 在blocking线程中转写，DOM只在该线程内存在
    async fn transcribe_blocking(&self, html: String) -> Result<(String, RewriteReport)> {
        let dictionary = Arc::clone(&self.dictionary);
        let config = Arc::clone(&self.config);

        tokio::task::spawn_blocking(move || {
            HtmlRewriter::new(&dictionary, &config)?.transcribe_html(&html)
        })
        .await
        .context("转写任务执行失败")?
    }

    /// 转写单个HTML文件
    pub async fn transcribe_file(&self, input: &Path, output: &Path) -> Result<TranscriptionStats> {
        let read_start = Instant::now();
        let html = tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("读取文件失败: {}", input.display()))?;
        let file_read_time = read_start.elapsed();

        debug!("📏 {} 文件大小: {} 字节", input.display(), html.len());

        let mut stats = self
            .transcribe_content(html, input.display().to_string(), output)
            .await?;
        stats.file_read_time = file_read_time;
        Ok(stats)
    }

    /// 爬取网页并转写
    pub async fn transcribe_url(&self, crawler: &WebCrawler, output: &Path) -> Result<TranscriptionStats> {
        let read_start = Instant::now();
        let html = crawler.crawl().await?;
        let file_read_time = read_start.elapsed();

        let mut stats = self
            .transcribe_content(html, crawler.config().url.clone(), output)
            .await?;
        stats.file_read_time = file_read_time;
        Ok(stats)
    }

    async fn transcribe_content(&self, html: String, source: String, output: &Path) -> Result<TranscriptionStats> {
        let input_size = html.len();

        let transcribe_start = Instant::now();
        let (transcribed, report) = self.transcribe_blocking(html).await?;
        let transcription_time = transcribe_start.elapsed();

        let write_start = Instant::now();
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("创建输出目录失败: {}", parent.display()))?;
            }
        }
        tokio::fs::write(output, &transcribed)
            .await
            .with_context(|| format!("写入文件失败: {}", output.display()))?;
        let file_write_time = write_start.elapsed();

        info!(
            "✅ {} -> {} (转写 {} / 未收录 {})",
            source,
            output.display(),
            report.spans_translated,
            report.spans_excluded
        );

        Ok(TranscriptionStats {
            source,
            output: output.display().to_string(),
            file_read_time: Default::default(),
            transcription_time,
            file_write_time,
            input_size,
            output_size: transcribed.len(),
            report,
        })
    }

    /// 转写目录中的所有HTML文件，输出到镜像目录
    ///
    /// 文件按 `concurrency` 个一批，批内并发处理。
    /// 返回成功的统计和失败的 (文件, 错误) 列表；单个文件失败不影响其他文件。
    pub async fn transcribe_directory(
        &self,
        input_root: &Path,
        output_root: &Path,
        concurrency: usize,
    ) -> (Vec<TranscriptionStats>, Vec<(String, String)>) {
        let files = collect_html_files(input_root);
        info!("📂 发现 {} 个HTML文件，并发数 {}", files.len(), concurrency.max(1));

        let jobs: Vec<(PathBuf, PathBuf)> = files
            .into_iter()
            .map(|file| {
                let output = mirror_output_path(input_root, &file, output_root);
                (file, output)
            })
            .collect();

        // 按并发数分批，每批并发处理
        let mut results: Vec<(PathBuf, Result<TranscriptionStats>)> = Vec::with_capacity(jobs.len());
        for (batch_idx, batch) in jobs.chunks(concurrency.max(1)).enumerate() {
            debug!("处理批次 {}: {} 个文件", batch_idx + 1, batch.len());
            let tasks = batch.iter().map(|(file, output)| async move {
                let result = self.transcribe_file(file, output).await;
                (file.clone(), result)
            });
            results.extend(join_all(tasks).await);
        }

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for (file, result) in results {
            match result {
                Ok(stats) => succeeded.push(stats),
                Err(e) => {
                    warn!("❌ 转写失败 {}: {:#}", file.display(), e);
                    failed.push((file.display().to_string(), format!("{:#}", e)));
                }
            }
        }

        succeeded.sort_by(|a, b| a.source.cmp(&b.source));
        (succeeded, failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn transcriber() -> Transcriber {
        let dictionary = IpaDictionary::load("hello /həˈloʊ/\nworld /ˈwɝld/\n");
        Transcriber::new(dictionary, TranscriptionConfig::default())
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("text-to-ipa-tr-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_transcribe_html() {
        let (html, report) = transcriber().transcribe_html("<p>Hello world</p>").unwrap();
        assert!(html.contains("<span class=\"use-trunic\">həloʊ wɝld</span>"), "{}", html);
        assert_eq!(report.spans_translated, 2);
    }

    #[tokio::test]
    async fn test_transcribe_file() {
        let dir = temp_dir("file");
        let input = dir.join("page.html");
        let output = dir.join("out/page_ipa.html");
        fs::write(&input, "<p>hello zzz</p>").unwrap();

        let stats = transcriber().transcribe_file(&input, &output).await.unwrap();
        assert_eq!(stats.report.spans_translated, 1);
        assert_eq!(stats.report.spans_excluded, 1);
        assert_eq!(stats.input_size, "<p>hello zzz</p>".len());

        let written = fs::read_to_string(&output).unwrap();
        assert!(written.contains("həloʊ"));
        assert_eq!(written.len(), stats.output_size);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_transcribe_missing_file() {
        let result = transcriber()
            .transcribe_file(Path::new("/nonexistent/page.html"), Path::new("/tmp/never.html"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_transcribe_directory() {
        let dir = temp_dir("dir");
        let input_root = dir.join("site");
        let output_root = dir.join("site_ipa");
        fs::create_dir_all(input_root.join("nested")).unwrap();
        fs::write(input_root.join("a.html"), "<p>hello</p>").unwrap();
        fs::write(input_root.join("nested/b.html"), "<p>world</p>").unwrap();
        fs::write(input_root.join("skip.txt"), "hello").unwrap();

        let (succeeded, failed) = transcriber()
            .transcribe_directory(&input_root, &output_root, 2)
            .await;

        assert_eq!(succeeded.len(), 2);
        assert!(failed.is_empty());
        assert!(fs::read_to_string(output_root.join("a.html")).unwrap().contains("həloʊ"));
        assert!(fs::read_to_string(output_root.join("nested/b.html")).unwrap().contains("wɝld"));
        assert!(!output_root.join("skip.txt").exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_transcribe_directory_in_batches() {
        let dir = temp_dir("batches");
        let input_root = dir.join("site");
        let output_root = dir.join("site_ipa");
        fs::create_dir_all(&input_root).unwrap();
        for name in ["a.html", "b.html", "c.html", "d.htm", "e.html"] {
            fs::write(input_root.join(name), "<p>hello</p>").unwrap();
        }
        fs::write(input_root.join("broken.html"), [0xffu8, 0xfe, 0x00]).unwrap();

        let (succeeded, failed) = transcriber()
            .transcribe_directory(&input_root, &output_root, 2)
            .await;

        assert_eq!(succeeded.len(), 5);
        assert_eq!(failed.len(), 1);
        assert!(failed[0].0.ends_with("broken.html"));
        let sources: Vec<&str> = succeeded.iter().map(|s| s.source.as_str()).collect();
        let mut sorted = sources.clone();
        sorted.sort();
        assert_eq!(sources, sorted);

        fs::remove_dir_all(&dir).unwrap();
    }
}
