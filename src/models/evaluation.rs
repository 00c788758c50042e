use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Product;

/// 描述为空或过短时的固定理由
pub const SHORT_DESCRIPTION_REASON: &str = "Description empty or too short";

/// 产品未找到/无描述时的固定理由
pub const NOT_FOUND_REASON: &str = "Product not found in VTEX catalog or has no description";

/// 抓取失败类结果的 raw_response 哨兵值
pub const VTEX_API_ERROR: &str = "VTEX_API_ERROR";

/// 单个产品的质量评估结果
///
/// 不变量：`quality_score` 始终在 [0,5]；`product_id` 始终非空。
/// score=0 是哨兵值，表示"未能进行 AI 评估"（抓取失败、无记录、
/// 后端失败），不是质量判断；1 最好，5 最差。
/// reason / raw_response 在构造时统一清洗，不含换行和回车。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub product_id: String,
    pub quality_score: u8,
    pub evaluation_timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl EvaluationResult {
    /// AI 评估得出的结果（score 由解析层保证在 [1,5]）
    pub fn evaluated(
        product_id: impl Into<String>,
        quality_score: u8,
        reason: impl Into<String>,
        raw_response: impl Into<String>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            quality_score: quality_score.min(5),
            evaluation_timestamp: Utc::now(),
            reason: Some(sanitize(&reason.into())),
            raw_response: Some(sanitize(&raw_response.into())),
        }
    }

    /// 产品未找到或没有描述
    pub fn not_found(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            quality_score: 0,
            evaluation_timestamp: Utc::now(),
            reason: Some(NOT_FOUND_REASON.to_string()),
            raw_response: Some(VTEX_API_ERROR.to_string()),
        }
    }

    /// 抓取产品时发生传输/后端错误
    pub fn fetch_error(product_id: impl Into<String>, detail: &str) -> Self {
        Self {
            product_id: product_id.into(),
            quality_score: 0,
            evaluation_timestamp: Utc::now(),
            reason: Some(sanitize(&format!("VTEX API error: {detail}"))),
            raw_response: Some(VTEX_API_ERROR.to_string()),
        }
    }

    /// 描述过短，跳过 AI 评估直接判最差分
    ///
    /// 这是成本控制的短路，不是模型的质量判断。
    pub fn auto_scored(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            quality_score: 5,
            evaluation_timestamp: Utc::now(),
            reason: Some(SHORT_DESCRIPTION_REASON.to_string()),
            raw_response: None,
        }
    }

    /// 评估后端对单个产品的调用失败
    pub fn evaluation_failed(product_id: impl Into<String>, detail: &str) -> Self {
        Self {
            product_id: product_id.into(),
            quality_score: 0,
            evaluation_timestamp: Utc::now(),
            reason: Some(sanitize(&format!("Evaluation failed: {detail}"))),
            raw_response: Some(sanitize(detail)),
        }
    }

    /// 是否为"未能评估"的哨兵结果
    pub fn is_error(&self) -> bool {
        self.quality_score == 0
    }
}

/// 清洗理由/原始响应文本：去掉换行和回车，压掉首尾空白
fn sanitize(text: &str) -> String {
    text.replace(['\n', '\r'], " ").trim().to_string()
}

/// 交给持久化层的输出单元：一段产品记录和对应的评估结果
///
/// 允许 products 为空（纯错误批次）；错误结果永远不与 AI 评估
/// 结果混在同一个批次中。
#[derive(Debug, Clone, Default)]
pub struct EvaluationBatch {
    pub products: Vec<Product>,
    pub results: Vec<EvaluationResult>,
}

impl EvaluationBatch {
    pub fn is_empty(&self) -> bool {
        self.products.is_empty() && self.results.is_empty()
    }

    /// 整个批次是否只承载一次失败
    pub fn is_error_batch(&self) -> bool {
        self.products.is_empty() && !self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }
}
