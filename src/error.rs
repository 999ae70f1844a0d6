//! 统一错误处理模块
//!
//! 提供text-to-ipa项目的统一错误类型定义和处理机制。
//! 词典查询与文本替换本身从不返回错误，状态以数据形式返回；
//! 这里的错误只覆盖外壳层：文件、网络、HTML序列化、输入与配置。

// 标准库导入
use std::fmt;

// 第三方crate导入
use anyhow::Error as AnyhowError;

/// text-to-ipa 统一错误类型
#[derive(Debug)]
pub enum IpaError {
    /// 网络请求相关错误
    Network {
        /// 错误消息
        message: String,
        /// HTTP状态码（如果适用）
        status_code: Option<u16>
    },

    /// HTML解析或序列化错误
    HtmlParse {
        /// 具体错误信息
        details: String
    },

    /// 文件操作相关错误
    FileOperation {
        /// 文件路径
        path: String,
        /// 操作类型（读取、写入、创建等）
        operation: String,
        /// 底层错误信息
        source: String
    },

    /// 词典加载错误
    DictionaryLoad {
        /// 词典位置
        location: String,
        /// 错误原因
        reason: String
    },

    /// 配置相关错误
    Configuration {
        /// 配置项名称
        field: String,
        /// 错误原因
        reason: String
    },

    /// 输入验证错误
    InputValidation {
        /// 输入值
        input: String,
        /// 验证失败原因
        reason: String
    },

    /// 内部处理错误（包装anyhow::Error）
    Internal {
        /// 包装的错误
        source: AnyhowError
    },
}

impl fmt::Display for IpaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpaError::Network { message, status_code } => {
                if let Some(code) = status_code {
                    write!(f, "网络请求失败 [{}]: {}", code, message)
                } else {
                    write!(f, "网络请求失败: {}", message)
                }
            },
            IpaError::HtmlParse { details } => {
                write!(f, "HTML处理失败: {}", details)
            },
            IpaError::FileOperation { path, operation, source } => {
                write!(f, "文件{}操作失败 [{}]: {}", operation, path, source)
            },
            IpaError::DictionaryLoad { location, reason } => {
                write!(f, "词典加载失败 [{}]: {}", location, reason)
            },
            IpaError::Configuration { field, reason } => {
                write!(f, "配置错误 [{}]: {}", field, reason)
            },
            IpaError::InputValidation { input, reason } => {
                write!(f, "输入验证失败 [{}]: {}", input, reason)
            },
            IpaError::Internal { source } => {
                write!(f, "内部处理错误: {}", source)
            },
        }
    }
}

impl std::error::Error for IpaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IpaError::Internal { source } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// text-to-ipa 结果类型别名
pub type Result<T> = std::result::Result<T, IpaError>;

/// 便捷的错误创建宏
#[macro_export]
macro_rules! ipa_error {
    (network, $msg:expr, $code:expr) => {
        $crate::error::IpaError::Network {
            message: $msg.to_string(),
            status_code: Some($code)
        }
    };
    (html_parse, $details:expr) => {
        $crate::error::IpaError::HtmlParse {
            details: $details.to_string()
        }
    };
    (dictionary, $location:expr, $reason:expr) => {
        $crate::error::IpaError::DictionaryLoad {
            location: $location.to_string(),
            reason: $reason.to_string()
        }
    };
    (config, $field:expr, $reason:expr) => {
        $crate::error::IpaError::Configuration {
            field: $field.to_string(),
            reason: $reason.to_string()
        }
    };
    (input_validation, $input:expr, $reason:expr) => {
        $crate::error::IpaError::InputValidation {
            input: $input.to_string(),
            reason: $reason.to_string()
        }
    };
}

/// 从anyhow::Error转换为IpaError
impl From<AnyhowError> for IpaError {
    fn from(error: AnyhowError) -> Self {
        IpaError::Internal { source: error }
    }
}

/// 从reqwest::Error转换为IpaError
impl From<reqwest::Error> for IpaError {
    fn from(error: reqwest::Error) -> Self {
        let status_code = error.status().map(|s| s.as_u16());
        IpaError::Network {
            message: error.to_string(),
            status_code,
        }
    }
}

/// 从std::io::Error转换为IpaError
impl From<std::io::Error> for IpaError {
    fn from(error: std::io::Error) -> Self {
        IpaError::FileOperation {
            path: "unknown".to_string(),
            operation: "io".to_string(),
            source: error.to_string(),
        }
    }
}
