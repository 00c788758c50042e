//! 产品描述评估服务 - 业务能力层
//!
//! 只负责"AI 评估"能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Gemini）
//!
//! ## 契约
//! 对 M 个产品返回恰好 M 个结果，顺序与输入一致；单个产品的
//! 调用失败被吸收为 score=0 的结果，绝不向外抛异常。批次装配
//! 依赖这个 1:1 顺序保持的映射。

use std::sync::OnceLock;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use futures::future::join_all;
use regex::Regex;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{EvaluationResult, Product};
use crate::utils::logging::truncate_text;

/// 解析失败时的兜底理由
const DEFAULT_REASON: &str = "Evaluation completed";

/// 分数越界时的固定理由
const INVALID_SCORE_REASON: &str = "Invalid score received, defaulted to poor quality";

/// 描述评估能力
///
/// 流水线只依赖这个接口。实现方自行限制内部并发，
/// 但必须保证返回结果与输入 1:1 且顺序一致。
#[async_trait]
pub trait DescriptionEvaluator: Send + Sync {
    async fn evaluate_products(&self, products: &[Product]) -> Vec<EvaluationResult>;
}

/// Gemini 评估服务
///
/// 职责：
/// - 为单个产品构建确定性的评估 prompt
/// - 调用 LLM API 并解析 SCORE / REASON 响应
/// - 用信号量限制同时在途的调用数
/// - 不出现批次、索引等流程概念
pub struct GeminiEvaluator {
    client: Client<OpenAIConfig>,
    model_name: String,
    semaphore: Semaphore,
}

impl GeminiEvaluator {
    /// 创建新的评估服务
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let client = Client::with_config(openai_config);

        Self {
            client,
            model_name: config.llm_model_name.clone(),
            semaphore: Semaphore::new(config.eval_concurrency),
        }
    }

    /// 通用的 LLM 调用函数
    ///
    /// 返回 LLM 的响应内容（字符串）
    async fn send_to_llm(&self, user_message: &str) -> anyhow::Result<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content("You are an expert evaluator of e-commerce product descriptions.")
            .build()?;

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .temperature(0.3)
            .max_tokens(1024u32)
            .build()?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            anyhow::anyhow!("LLM API 调用失败: {}", e)
        })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow::anyhow!("LLM 返回内容为空"))?;

        Ok(content.trim().to_string())
    }

    /// 评估单个产品
    ///
    /// 永不失败：调用异常被转换为 score=0 的结果，
    /// 保证输出槽位始终被填上。
    async fn evaluate_single(&self, product: &Product) -> EvaluationResult {
        let prompt = create_evaluation_prompt(product);

        match self.send_to_llm(&prompt).await {
            Ok(raw_response) => {
                let (score, reason) = parse_evaluation_response(&raw_response);
                info!("✓ 产品 {} 评估完成，得分 {}", product.product_id, score);
                debug!(
                    "产品 {} 原始响应: {}",
                    product.product_id,
                    truncate_text(&raw_response, 120)
                );
                EvaluationResult::evaluated(&product.product_id, score, reason, raw_response)
            }
            Err(e) => {
                warn!("⚠️ 产品 {} 评估失败: {}", product.product_id, e);
                EvaluationResult::evaluation_failed(&product.product_id, &e.to_string())
            }
        }
    }
}

#[async_trait]
impl DescriptionEvaluator for GeminiEvaluator {
    /// 并发评估一组产品
    ///
    /// `join_all` 保证结果顺序与输入一致，内部信号量保证
    /// 同时在途的调用不超过配置的并发数。
    async fn evaluate_products(&self, products: &[Product]) -> Vec<EvaluationResult> {
        let total = products.len();
        if total == 0 {
            return Vec::new();
        }

        info!("🧠 开始评估 {} 个产品描述", total);

        let futures = products.iter().map(|product| async {
            // 信号量已关闭时降级为错误结果，不绕过并发上限
            match self.semaphore.acquire().await {
                Ok(_permit) => self.evaluate_single(product).await,
                Err(e) => {
                    warn!("⚠️ 产品 {} 未能获得评估许可: {}", product.product_id, e);
                    EvaluationResult::evaluation_failed(&product.product_id, &e.to_string())
                }
            }
        });

        let results = join_all(futures).await;

        info!("✓ 完成 {} 个产品的评估", total);
        results
    }
}

/// 构建产品描述质量评估的 prompt
///
/// 对同一个产品始终产生相同的文本。
fn create_evaluation_prompt(product: &Product) -> String {
    format!(
        r#"
Evaluate the quality of this product description on a scale of 1-5, where:
1 = Excellent quality (clear, detailed, engaging, error-free)
2 = Good quality (mostly clear, some details, minor issues)
3 = Average quality (basic information, some clarity issues)
4 = Poor quality (unclear, missing key info, noticeable errors)
5 = Very poor quality (confusing, incomplete, major errors)

Product Name: {}
Product Description: {}

Provide your response in this exact format:
SCORE: [1-5]
REASON: [brief 150 characters explanation in English]

Consider:
- Clarity and comprehensibility
- Completeness of information
- Grammar and spelling
- Engagement and appeal
- Accuracy and helpfulness

Response:"#,
        product.name.as_deref().unwrap_or("N/A"),
        product.description.as_deref().unwrap_or("No description available"),
    )
}

/// 解析 LLM 的评估响应
///
/// 优先读取 `SCORE:` / `REASON:` 行，重复出现时以最后一次为准
/// （无法解析为整数的 SCORE 行不覆盖已有值）；没有 SCORE 行时
/// 退回到扫描响应中第一个独立出现的数字 1-5；仍找不到则默认 5 分。
/// 解析出的分数越界时钳到 5 并替换为固定理由。
fn parse_evaluation_response(raw_response: &str) -> (u8, String) {
    let mut score: Option<i64> = None;
    let mut reason: Option<String> = None;

    for line in raw_response.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("SCORE:") {
            if let Ok(value) = rest.trim().parse::<i64>() {
                score = Some(value);
            }
        } else if let Some(rest) = line.strip_prefix("REASON:") {
            reason = Some(rest.trim().to_string());
        }
    }

    let score = match score {
        Some(value) => value,
        None => i64::from(find_standalone_digit(raw_response).unwrap_or(5)),
    };

    if !(1..=5).contains(&score) {
        return (5, INVALID_SCORE_REASON.to_string());
    }

    (score as u8, reason.unwrap_or_else(|| DEFAULT_REASON.to_string()))
}

/// 在文本中找第一个独立出现的数字 1-5
fn find_standalone_digit(text: &str) -> Option<u8> {
    static DIGIT_RE: OnceLock<Regex> = OnceLock::new();
    let re = DIGIT_RE.get_or_init(|| Regex::new(r"\b([1-5])\b").expect("数字匹配正则非法"));

    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
