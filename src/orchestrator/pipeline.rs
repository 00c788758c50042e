//! 评估流水线 / 批次装配器
//!
//! ## 流程
//!
//! 1. **collecting-fetches**：并发抓取全部产品记录（`fetch_stage`）
//! 2. **classifying**：把抓取成功的产品分流为"跳过 AI"和"需要 AI"
//! 3. **awaiting-backend**：把需要 AI 的子序列整体送评估后端
//! 4. **assembling / batch-emitting**：按提交顺序把三类结果合并回
//!    一条流，切成批次经 channel 增量交给调用方持久化
//!
//! 任何状态都不跨运行保留；失败的运行不可恢复，调用方重新提交
//! 产品ID即可。唯一的运行级错误是后端违反数量契约（见
//! [`PipelineError::EvaluationTruncated`]），此时已刷出的批次依然有效。

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::clients::ProductFetcher;
use crate::config::Config;
use crate::error::{ConfigError, PipelineError};
use crate::models::{EvaluationBatch, EvaluationResult, Product};
use crate::orchestrator::fetch_stage::{fetch_products_concurrently, FetchOutcome};
use crate::services::eligibility;
use crate::services::DescriptionEvaluator;

/// 分流后的单项结局（按提交顺序排列）
enum ItemOutcome {
    /// 需要 AI 评估，结果稍后从评估序列中按游标取出
    NeedsAi { product: Product },
    /// 描述过短，已直接判分
    AutoScored {
        product: Product,
        result: EvaluationResult,
    },
    /// 抓取失败，已合成错误结果
    FetchFailed { result: EvaluationResult },
}

/// 评估流水线
///
/// 持有两个注入能力（抓取、评估）和并发/批次配置；
/// 每次调用是一次独立的运行。
pub struct EvaluationPipeline {
    fetcher: Arc<dyn ProductFetcher>,
    evaluator: Arc<dyn DescriptionEvaluator>,
    fetch_concurrency: usize,
    batch_size: usize,
    min_description_len: usize,
}

impl EvaluationPipeline {
    /// 创建新的流水线
    ///
    /// 非法配置（并发数、批次大小 < 1）在这里立即拒绝，
    /// 不等到工作开始。
    pub fn new(
        config: &Config,
        fetcher: Arc<dyn ProductFetcher>,
        evaluator: Arc<dyn DescriptionEvaluator>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            fetcher,
            evaluator,
            fetch_concurrency: config.fetch_concurrency,
            batch_size: config.batch_size,
            min_description_len: config.min_description_len,
        })
    }

    /// 运行流水线，经 channel 按装配顺序增量输出批次
    ///
    /// 每个提交的产品ID恰好产生一个结果（AI 评分、直接判分或
    /// 错误结果），唯一例外是后端违反数量契约：此时刷出已积累
    /// 的配对后返回 [`PipelineError::EvaluationTruncated`]。
    /// 接收端被丢弃视为调用方取消，运行平静结束。
    pub async fn evaluate_catalog_batches(
        &self,
        product_ids: &[String],
        sender: mpsc::Sender<EvaluationBatch>,
    ) -> Result<(), PipelineError> {
        let outcomes =
            fetch_products_concurrently(self.fetcher.clone(), product_ids, self.fetch_concurrency)
                .await?;

        // ========== 分流 ==========
        let mut items = Vec::with_capacity(outcomes.len());
        let mut needs_ai = Vec::new();

        for outcome in outcomes {
            match outcome {
                FetchOutcome::Fetched { product, .. } => {
                    let description = product.trimmed_description().unwrap_or_default();
                    if eligibility::quick_score(description, self.min_description_len).is_some() {
                        let result = EvaluationResult::auto_scored(&product.product_id);
                        items.push(ItemOutcome::AutoScored { product, result });
                    } else {
                        needs_ai.push(product.clone());
                        items.push(ItemOutcome::NeedsAi { product });
                    }
                }
                FetchOutcome::Failed { result, .. } => {
                    items.push(ItemOutcome::FetchFailed { result });
                }
            }
        }

        // ========== 送评估后端 ==========
        let expected = needs_ai.len();
        let ai_results = if needs_ai.is_empty() {
            info!("没有需要 AI 评估的产品");
            Vec::new()
        } else {
            self.evaluator.evaluate_products(&needs_ai).await
        };
        let received = ai_results.len();

        if received != expected {
            error!(
                "评估结果数量与送评产品数量不一致: 期望 {}，实际 {}",
                expected, received
            );
        }

        // ========== 按提交顺序装配并输出批次 ==========
        let mut ai_iter = ai_results.into_iter();
        let mut batch = EvaluationBatch::default();

        for item in items {
            match item {
                ItemOutcome::NeedsAi { product } => {
                    let Some(result) = ai_iter.next() else {
                        // 评估序列提前耗尽：刷出已积累的配对后终止，
                        // 绝不捏造缺失的结果
                        if !batch.is_empty() && !deliver(&sender, batch).await {
                            return Ok(());
                        }
                        return Err(PipelineError::EvaluationTruncated { expected, received });
                    };
                    batch.products.push(product);
                    batch.results.push(result);

                    if batch.len() >= self.batch_size {
                        if !deliver(&sender, std::mem::take(&mut batch)).await {
                            return Ok(());
                        }
                    }
                }
                ItemOutcome::AutoScored { product, result } => {
                    batch.products.push(product);
                    batch.results.push(result);

                    if batch.len() >= self.batch_size {
                        if !deliver(&sender, std::mem::take(&mut batch)).await {
                            return Ok(());
                        }
                    }
                }
                ItemOutcome::FetchFailed { result } => {
                    // 错误结果单独成批，先刷出当前批次（即使不满）
                    if !batch.is_empty() {
                        if !deliver(&sender, std::mem::take(&mut batch)).await {
                            return Ok(());
                        }
                    }
                    let error_batch = EvaluationBatch {
                        products: Vec::new(),
                        results: vec![result],
                    };
                    if !deliver(&sender, error_batch).await {
                        return Ok(());
                    }
                }
            }
        }

        // 流结束：刷出非空的余量
        if !batch.is_empty() && !deliver(&sender, batch).await {
            return Ok(());
        }

        Ok(())
    }

    /// 一次性收集全部批次的便捷入口
    pub async fn evaluate_catalog(
        &self,
        product_ids: &[String],
    ) -> Result<(Vec<Product>, Vec<EvaluationResult>), PipelineError> {
        let (sender, mut receiver) = mpsc::channel::<EvaluationBatch>(16);

        let collector = async move {
            let mut products = Vec::new();
            let mut results = Vec::new();
            while let Some(batch) = receiver.recv().await {
                products.extend(batch.products);
                results.extend(batch.results);
            }
            (products, results)
        };

        let (run, collected) = tokio::join!(
            self.evaluate_catalog_batches(product_ids, sender),
            collector
        );
        run?;
        Ok(collected)
    }
}

/// 发送批次；接收端已丢弃时返回 false（调用方取消）
async fn deliver(sender: &mpsc::Sender<EvaluationBatch>, batch: EvaluationBatch) -> bool {
    if sender.send(batch).await.is_err() {
        warn!("⚠️ 接收端已关闭，运行被取消，已刷出的批次保持有效");
        return false;
    }
    true
}
