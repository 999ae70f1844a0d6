use std::time::Duration;

use serde_json::{json, Value};

use crate::html_processor::RewriteReport;

/// 单个文档的转写统计
#[derive(Debug, Clone, Default)]
pub struct TranscriptionStats {
    /// 文档来源（文件路径或URL）
    pub source: String,
    /// 输出路径
    pub output: String,
    pub file_read_time: Duration,
    pub transcription_time: Duration,
    pub file_write_time: Duration,
    pub input_size: usize,
    pub output_size: usize,
    pub report: RewriteReport,
}

/// 整次运行的汇总统计
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub dictionary_load_time: Duration,
    pub dictionary_entries: usize,
    /// 词典中缺少音标而被跳过的行数
    pub dictionary_skipped_lines: usize,
    pub documents: Vec<TranscriptionStats>,
    /// 处理失败的文档及错误信息
    pub failures: Vec<(String, String)>,
}

impl RunStats {
    /// 所有文档的改写统计之和
    pub fn total_report(&self) -> RewriteReport {
        let mut total = RewriteReport::default();
        for doc in &self.documents {
            total.absorb(&doc.report);
        }
        total
    }

    pub fn total_input_size(&self) -> usize {
        self.documents.iter().map(|d| d.input_size).sum()
    }

    pub fn total_output_size(&self) -> usize {
        self.documents.iter().map(|d| d.output_size).sum()
    }

    /// 生成JSON报告
    pub fn to_json(&self, total_duration: Duration) -> Value {
        let documents: Vec<Value> = self
            .documents
            .iter()
            .map(|doc| {
                json!({
                    "source": doc.source,
                    "output": doc.output,
                    "input_size": doc.input_size,
                    "output_size": doc.output_size,
                    "transcription_ms": doc.transcription_time.as_millis() as u64,
                    "report": report_to_json(&doc.report),
                })
            })
            .collect();

        let failures: Vec<Value> = self
            .failures
            .iter()
            .map(|(source, error)| json!({ "source": source, "error": error }))
            .collect();

        json!({
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "dictionary_entries": self.dictionary_entries,
            "dictionary_skipped_lines": self.dictionary_skipped_lines,
            "dictionary_load_ms": self.dictionary_load_time.as_millis() as u64,
            "total_ms": total_duration.as_millis() as u64,
            "totals": report_to_json(&self.total_report()),
            "documents": documents,
            "failures": failures,
        })
    }
}

fn report_to_json(report: &RewriteReport) -> Value {
    json!({
        "spans_marked": report.spans_marked,
        "spans_translated": report.spans_translated,
        "spans_excluded": report.spans_excluded,
        "spans_ambiguous": report.spans_ambiguous,
        "spans_merged": report.spans_merged,
        "tokens_found": report.tokens_found,
        "tokens_not_found": report.tokens_not_found,
        "frames_rewritten": report.frames_rewritten,
    })
}

/// 打印性能统计
pub fn print_performance_stats(stats: &RunStats, total_duration: Duration) {
    println!("\n📊 转写统计报告:");
    println!("═══════════════════════════════════════");

    // 时间分解
    println!("⏱️  时间分解:");
    println!("   词典加载: {}", format_duration(stats.dictionary_load_time));
    let read: Duration = stats.documents.iter().map(|d| d.file_read_time).sum();
    let transcribe: Duration = stats.documents.iter().map(|d| d.transcription_time).sum();
    let write: Duration = stats.documents.iter().map(|d| d.file_write_time).sum();
    println!("   文档读取: {}", format_duration(read));
    println!("   音标转写: {}", format_duration(transcribe));
    println!("   文件写入: {}", format_duration(write));
    println!("   总耗时: {}", format_duration(total_duration));

    // 文件统计
    let input_size = stats.total_input_size();
    let output_size = stats.total_output_size();
    println!("\n📏 文件统计:");
    println!("   处理文档: {} 个 (失败 {} 个)", stats.documents.len(), stats.failures.len());
    println!(
        "   输入大小: {} 字节 ({:.1} KB)",
        input_size,
        input_size as f64 / 1024.0
    );
    println!(
        "   输出大小: {} 字节 ({:.1} KB)",
        output_size,
        output_size as f64 / 1024.0
    );

    // 转写统计
    let report = stats.total_report();
    println!("\n🔤 转写统计:");
    println!("   词典词条: {} 个", stats.dictionary_entries);
    if stats.dictionary_skipped_lines > 0 {
        println!("   跳过词条: {} 行", stats.dictionary_skipped_lines);
    }
    println!("   标记片段: {} 个", report.spans_marked);
    println!("   已转写: {} 个", report.spans_translated);
    println!("   未收录: {} 个", report.spans_excluded);
    println!("   多读音: {} 个", report.spans_ambiguous);
    println!("   合并片段: {} 个", report.spans_merged);
    if report.frames_rewritten > 0 {
        println!("   内嵌iframe: {} 个", report.frames_rewritten);
    }

    let total_tokens = report.tokens_found + report.tokens_not_found;
    if total_tokens > 0 {
        println!(
            "   词典命中率: {:.1}%",
            report.tokens_found as f64 / total_tokens as f64 * 100.0
        );
    }
}

/// 格式化持续时间
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.3}s", duration.as_secs_f64())
    }
}
