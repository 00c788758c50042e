//! 并发抓取阶段
//!
//! 给定有序的产品ID列表，用有界并发从商品目录抓取每个产品的
//! 记录，并把结果按提交顺序交还。并发期间完成顺序是乱的，
//! 收齐 N 个结果之后按原始索引重排。
//!
//! 失败策略：抓不到记录、记录没有描述、传输错误，都在本阶段
//! 就地转换为 score=0 的最终结果，下游永远看不到抓取异常；
//! 单个又慢又坏的产品不会挡住其余 N-1 个结果的收集。
//! 本层不做重试（重试属于 `ProductFetcher` 实现内部）。

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{error, warn};

use crate::clients::ProductFetcher;
use crate::error::PipelineError;
use crate::models::{EvaluationResult, Product};

/// 单个产品的抓取结局
///
/// 携带原始提交索引；只在一次流水线运行内部存在，
/// 由本阶段产生、由批次装配器消费，从不持久化。
#[derive(Debug)]
pub enum FetchOutcome {
    /// 抓到了带描述的记录
    Fetched { index: usize, product: Product },
    /// 抓取失败，已合成 score=0 的最终结果
    Failed {
        index: usize,
        result: EvaluationResult,
    },
}

impl FetchOutcome {
    pub fn index(&self) -> usize {
        match self {
            FetchOutcome::Fetched { index, .. } | FetchOutcome::Failed { index, .. } => *index,
        }
    }
}

/// 并发抓取一组产品
///
/// 同时在途的抓取不超过 `concurrency`；返回的结果恰好 N 个，
/// 按原始提交顺序排列。
pub async fn fetch_products_concurrently(
    fetcher: Arc<dyn ProductFetcher>,
    product_ids: &[String],
    concurrency: usize,
) -> Result<Vec<FetchOutcome>, PipelineError> {
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut handles = Vec::with_capacity(product_ids.len());

    for (index, product_id) in product_ids.iter().enumerate() {
        let permit = semaphore.clone().acquire_owned().await?;
        let fetcher = fetcher.clone();
        let task_id = product_id.clone();

        let handle = tokio::spawn(async move {
            let _permit = permit;
            fetch_single(fetcher.as_ref(), index, &task_id).await
        });
        handles.push((index, product_id.clone(), handle));
    }

    // 等待全部任务落定（join 屏障），之后才允许读取
    let mut outcomes = Vec::with_capacity(handles.len());
    for (index, product_id, handle) in handles {
        match handle.await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                error!("[产品 {}] 抓取任务执行失败: {}", product_id, e);
                outcomes.push(FetchOutcome::Failed {
                    index,
                    result: EvaluationResult::fetch_error(product_id, &e.to_string()),
                });
            }
        }
    }

    // 恢复提交顺序
    outcomes.sort_by_key(FetchOutcome::index);
    Ok(outcomes)
}

/// 抓取单个产品并分类结局
async fn fetch_single(fetcher: &dyn ProductFetcher, index: usize, product_id: &str) -> FetchOutcome {
    match fetcher.fetch_product(product_id).await {
        Ok(Some(product)) if product.trimmed_description().is_some() => {
            FetchOutcome::Fetched { index, product }
        }
        Ok(_) => {
            warn!("[产品 {}] 未找到或没有描述", product_id);
            FetchOutcome::Failed {
                index,
                result: EvaluationResult::not_found(product_id),
            }
        }
        Err(e) => {
            error!("[产品 {}] 抓取失败: {}", product_id, e);
            FetchOutcome::Failed {
                index,
                result: EvaluationResult::fetch_error(product_id, &e.to_string()),
            }
        }
    }
}
