//! 应用程序错误类型
//!
//! 按关注点划分错误枚举，顶层用 `AppError` 汇总。
//! 注意：单个产品的抓取/评估失败不是错误，它们会被就地转换为
//! score=0 的 `EvaluationResult`，绝不越过阶段边界向上抛出。

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 商品目录抓取错误
    #[error("抓取错误: {0}")]
    Fetch(#[from] FetchError),
    /// 存储错误
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),
    /// 流水线运行级错误
    #[error("流水线错误: {0}")]
    Pipeline(#[from] PipelineError),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 并发数 / 批次大小非法
    #[error("配置项 {field} 非法: 值 {value} 必须 ≥ 1")]
    InvalidWorkerCount { field: &'static str, value: usize },
    /// 必需的凭据缺失
    #[error("凭据缺失: 请设置环境变量 {var}")]
    MissingCredential { var: &'static str },
    /// 凭据无法用作 HTTP 头
    #[error("凭据 {var} 包含非法字符，无法用作 HTTP 头")]
    InvalidCredential { var: &'static str },
    /// 构建 HTTP 客户端失败
    #[error("构建 HTTP 客户端失败: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// 商品目录抓取错误
///
/// 只在 `ProductFetcher` 的实现内部产生；并发抓取阶段会把它
/// 连同"未找到/无描述"一起转换为 score=0 的结果。
#[derive(Debug, Error)]
pub enum FetchError {
    /// 网络请求失败
    #[error("VTEX 请求失败 ({endpoint}): {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// API 返回错误状态码
    #[error("VTEX 返回错误状态 ({endpoint}): {status}")]
    BadStatus {
        endpoint: String,
        status: reqwest::StatusCode,
    },
    /// 响应 JSON 解析失败
    #[error("VTEX 响应解析失败: {0}")]
    JsonParse(#[source] reqwest::Error),
}

/// 存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// 文件读写失败
    #[error("文件读写失败: {0}")]
    Io(#[from] std::io::Error),
    /// CSV 解析/写入失败
    #[error("CSV 处理失败: {0}")]
    Csv(#[from] csv::Error),
    /// 输入CSV缺少 product_id 列
    #[error("CSV 文件 {path} 缺少 product_id 列")]
    MissingProductIdColumn { path: String },
}

/// 流水线运行级错误
///
/// 单项失败都被吸收为结果值，只有这里列出的条件会终止整个运行。
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 评估后端违反数量契约：返回的结果数少于送评产品数。
    /// 无法在不错位的前提下修补，只能提前终止（已刷出的批次仍然有效）。
    #[error("送评产品共 {expected} 个，评估后端仅返回 {received} 个结果，流水线提前终止")]
    EvaluationTruncated { expected: usize, received: usize },
    /// 并发抓取的信号量被关闭（正常运行中不应出现）
    #[error("并发抓取信号量已关闭: {0}")]
    Semaphore(#[from] tokio::sync::AcquireError),
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
