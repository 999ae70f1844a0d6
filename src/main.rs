use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use text_to_ipa::config::Cli;
use text_to_ipa::dictionary::{DictionarySource, IpaDictionary};
use text_to_ipa::stats::{format_duration, print_performance_stats, RunStats};
use text_to_ipa::transcriber::Transcriber;
use text_to_ipa::utils::{
    generate_output_path_for_source, init_logging, validate_input_source, InputSource,
};
use text_to_ipa::web_crawler::WebCrawler;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志系统
    init_logging(cli.verbose, cli.quiet);

    let total_start = Instant::now();

    match run(&cli).await {
        Ok(stats) => {
            let total_duration = total_start.elapsed();

            if !cli.quiet {
                info!("✅ 转写完成！总耗时: {}", format_duration(total_duration));
            }

            // 显示统计
            if cli.stats || cli.verbose {
                print_performance_stats(&stats, total_duration);
            }

            if let Some(report_path) = &cli.report {
                write_report(report_path, &stats, total_duration).await?;
            }

            if !stats.failures.is_empty() {
                warn!("⚠️  {} 个文档转写失败", stats.failures.len());
                std::process::exit(1);
            }
        }
        Err(e) => {
            if cli.quiet {
                eprintln!("转写失败: {:#}", e);
            } else {
                error!("❌ 转写失败: {:#}", e);
            }
            std::process::exit(1);
        }
    }

    Ok(())
}

/// 转写核心流程：先加载词典，再按输入源类型处理文档
async fn run(cli: &Cli) -> Result<RunStats> {
    let config = cli.transcription_config()?;
    let source = validate_input_source(&cli.input)?;
    let output_path = generate_output_path_for_source(&source, &cli.output);

    if !cli.quiet {
        info!("🚀 启动音标转写");
        info!("📂 输入: {}", cli.input);
        info!("📄 输出: {}", output_path.display());
        info!("📖 词典: {}", cli.dictionary);
    }

    // 词典必须在转写之前加载完成
    let dictionary_start = Instant::now();
    let dictionary_source = DictionarySource::parse(&cli.dictionary)?;
    let dictionary = IpaDictionary::load_from(&dictionary_source).await?;
    let dictionary_load_time = dictionary_start.elapsed();

    let mut stats = RunStats {
        dictionary_load_time,
        dictionary_entries: dictionary.len(),
        dictionary_skipped_lines: dictionary.skipped_lines(),
        ..Default::default()
    };

    let transcriber = Transcriber::new(dictionary, config);

    match source {
        InputSource::File(path) => {
            let doc = transcriber.transcribe_file(&path, &output_path).await?;
            stats.documents.push(doc);
        }
        InputSource::Directory(dir) => {
            let (documents, failures) = transcriber
                .transcribe_directory(&dir, &output_path, cli.concurrency)
                .await;
            stats.documents = documents;
            stats.failures = failures;
        }
        InputSource::Url(url) => {
            let mut crawler = WebCrawler::with_url(url.as_str())
                .include_resources(cli.include_css, cli.include_images)
                .timeout(cli.crawl_timeout);
            if let Some(user_agent) = &cli.user_agent {
                crawler = crawler.user_agent(user_agent);
            }
            let doc = transcriber.transcribe_url(&crawler, &output_path).await?;
            stats.documents.push(doc);
        }
    }

    Ok(stats)
}

/// 写入JSON报告
async fn write_report(path: &Path, stats: &RunStats, total_duration: Duration) -> Result<()> {
    let report = serde_json::to_string_pretty(&stats.to_json(total_duration))
        .context("序列化报告失败")?;
    tokio::fs::write(path, report)
        .await
        .with_context(|| format!("写入报告失败: {}", path.display()))?;
    info!("📝 报告已写入: {}", path.display());
    Ok(())
}
