use std::path::{Path, PathBuf};

use tracing::warn;
use url::Url;
use walkdir::WalkDir;

use crate::constants::{is_html_extension, output_config::OUTPUT_SUFFIX};
use crate::error::Result;
use crate::ipa_error;

/// 输入源类型枚举
///
/// 文档来源的统一抽象：本地文件、本地目录或网页URL。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// 本地文件路径
    File(PathBuf),
    /// 本地目录（递归处理其中的HTML文件）
    Directory(PathBuf),
    /// 网页URL
    Url(Url),
}

/// 初始化日志系统
pub fn init_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// 验证输入源
/// 判断输入是URL、目录还是文件路径，并返回相应的类型
pub fn validate_input_source(input: &str) -> Result<InputSource> {
    if input.trim().is_empty() {
        return Err(ipa_error!(input_validation, input, "输入不能为空"));
    }

    // 先尝试解析为URL
    if let Ok(url) = Url::parse(input) {
        match url.scheme() {
            "http" | "https" => return Ok(InputSource::Url(url)),
            "file" => {}
            scheme if scheme.len() > 1 => {
                return Err(ipa_error!(input_validation, input, format!("不支持的协议: {}", scheme)));
            }
            // Windows盘符（如 C:）会被解析为单字母协议，按路径处理
            _ => {}
        }
    }

    let path = match Url::parse(input) {
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .map_err(|_| ipa_error!(input_validation, input, "无效的file URL"))?,
        _ => PathBuf::from(input),
    };

    // 如果是相对路径，转换为绝对路径
    let absolute_path = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()?.join(path)
    };

    if absolute_path.is_dir() {
        Ok(InputSource::Directory(absolute_path))
    } else {
        validate_input_file(&absolute_path)?;
        Ok(InputSource::File(absolute_path))
    }
}

/// 验证输入文件
pub fn validate_input_file(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(ipa_error!(input_validation, path.display(), "输入文件不存在"));
    }

    if !path.is_file() {
        return Err(ipa_error!(input_validation, path.display(), "输入路径不是文件"));
    }

    if let Some(ext) = path.extension() {
        if !is_html_extension(&ext.to_string_lossy()) {
            warn!("⚠️  文件扩展名不是HTML: {}", ext.to_string_lossy());
        }
    }

    Ok(())
}

/// 为不同输入源生成输出路径
pub fn generate_output_path_for_source(source: &InputSource, output: &Option<PathBuf>) -> PathBuf {
    if let Some(output_path) = output {
        return output_path.clone();
    }

    match source {
        InputSource::File(path) => generate_output_path(path, &None),
        InputSource::Directory(dir) => {
            let name = dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "output".to_string());
            let output_name = format!("{}_{}", name, OUTPUT_SUFFIX);
            match dir.parent() {
                Some(parent) => parent.join(output_name),
                None => PathBuf::from(output_name),
            }
        }
        InputSource::Url(url) => {
            // 对于URL，使用域名和路径生成文件名
            let host = url.host_str().unwrap_or("webpage");
            let path_segments: Vec<&str> = url
                .path_segments()
                .map(|segments| segments.filter(|s| !s.is_empty()).collect())
                .unwrap_or_default();

            let filename = match path_segments.last() {
                None => format!("{}_{}_{}.html", host, "index", OUTPUT_SUFFIX),
                Some(page_name) => {
                    // 移除文件扩展名（如果有的话）
                    let page_name = match page_name.rfind('.') {
                        Some(dot_pos) => &page_name[..dot_pos],
                        None => page_name,
                    };
                    format!("{}_{}_{}.html", host, page_name, OUTPUT_SUFFIX)
                }
            };

            // 清理文件名中的非法字符
            let safe_filename = filename
                .chars()
                .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' { c } else { '_' })
                .collect::<String>();

            PathBuf::from(safe_filename)
        }
    }
}

/// 生成输出文件路径: input_ipa.html
pub fn generate_output_path(input: &Path, output: &Option<PathBuf>) -> PathBuf {
    if let Some(output_path) = output {
        return output_path.clone();
    }

    let stem = input.file_stem().unwrap_or_default();
    let output_name = match input.extension() {
        Some(extension) => format!(
            "{}_{}.{}",
            stem.to_string_lossy(),
            OUTPUT_SUFFIX,
            extension.to_string_lossy()
        ),
        None => format!("{}_{}", stem.to_string_lossy(), OUTPUT_SUFFIX),
    };

    match input.parent() {
        Some(parent) => parent.join(output_name),
        None => PathBuf::from(output_name),
    }
}

/// 递归收集目录中的HTML文件（按路径排序）
pub fn collect_html_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("⚠️  无法访问目录项: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .map(|ext| is_html_extension(&ext.to_string_lossy()))
                .unwrap_or(false)
        })
        .collect();

    files.sort();
    files
}

/// 目录模式下，把输入文件映射到输出目录中的对应位置
pub fn mirror_output_path(input_root: &Path, file: &Path, output_root: &Path) -> PathBuf {
    match file.strip_prefix(input_root) {
        Ok(relative) => output_root.join(relative),
        Err(_) => output_root.join(file.file_name().unwrap_or_default()),
    }
}

/// 从data URI中提取Base64内容
pub fn extract_base64_from_data_uri(data_uri: &str) -> Option<String> {
    data_uri
        .find(',')
        .map(|comma_pos| data_uri[comma_pos + 1..].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("text-to-ipa-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_generate_output_path() {
        let path = generate_output_path(Path::new("/tmp/pages/index.html"), &None);
        assert_eq!(path, PathBuf::from("/tmp/pages/index_ipa.html"));

        let explicit = Some(PathBuf::from("out.html"));
        assert_eq!(generate_output_path(Path::new("index.html"), &explicit), PathBuf::from("out.html"));
    }

    #[test]
    fn test_output_path_for_url() {
        let source = InputSource::Url(Url::parse("https://example.com/docs/guide.html").unwrap());
        assert_eq!(
            generate_output_path_for_source(&source, &None),
            PathBuf::from("example.com_guide_ipa.html")
        );

        let source = InputSource::Url(Url::parse("https://example.com/").unwrap());
        assert_eq!(
            generate_output_path_for_source(&source, &None),
            PathBuf::from("example.com_index_ipa.html")
        );
    }

    #[test]
    fn test_output_path_for_directory() {
        let source = InputSource::Directory(PathBuf::from("/tmp/site"));
        assert_eq!(generate_output_path_for_source(&source, &None), PathBuf::from("/tmp/site_ipa"));
    }

    #[test]
    fn test_validate_input_source() {
        assert!(matches!(
            validate_input_source("https://example.com").unwrap(),
            InputSource::Url(_)
        ));
        assert!(validate_input_source("ftp://example.com/page.html").is_err());
        assert!(validate_input_source("").is_err());
        assert!(validate_input_source("/nonexistent/text-to-ipa/page.html").is_err());

        let dir = temp_dir("source");
        assert_eq!(
            validate_input_source(&dir.to_string_lossy()).unwrap(),
            InputSource::Directory(dir.clone())
        );

        let file = dir.join("page.html");
        fs::write(&file, "<p>hello</p>").unwrap();
        assert_eq!(
            validate_input_source(&file.to_string_lossy()).unwrap(),
            InputSource::File(file.clone())
        );

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_collect_html_files() {
        let dir = temp_dir("collect");
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("a.html"), "").unwrap();
        fs::write(dir.join("nested/b.htm"), "").unwrap();
        fs::write(dir.join("notes.txt"), "").unwrap();

        let files = collect_html_files(&dir);
        assert_eq!(files, vec![dir.join("a.html"), dir.join("nested/b.htm")]);

        assert_eq!(
            mirror_output_path(&dir, &dir.join("nested/b.htm"), Path::new("/out")),
            PathBuf::from("/out/nested/b.htm")
        );

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_extract_base64_from_data_uri() {
        assert_eq!(
            extract_base64_from_data_uri("data:text/html;base64,PHA+"),
            Some("PHA+".to_string())
        );
        assert_eq!(extract_base64_from_data_uri("no-comma"), None);
    }
}
