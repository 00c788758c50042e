//! 流水线集成测试
//!
//! 用桩实现替换抓取和评估两个注入能力，验证装配器的
//! 顺序、批次切分和部分失败语义。

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use catalog_evaluator::models::evaluation::{NOT_FOUND_REASON, SHORT_DESCRIPTION_REASON};
use catalog_evaluator::{
    Config, DescriptionEvaluator, EvaluationBatch, EvaluationPipeline, EvaluationResult,
    FetchError, PipelineError, Product, ProductFetcher,
};

/// 足够长的合格描述
const LONG_DESCRIPTION: &str = "A detailed and engaging product description text.";

fn product(product_id: &str, description: &str) -> Product {
    Product {
        product_id: product_id.to_string(),
        description: Some(description.to_string()),
        name: Some(format!("Product {product_id}")),
        category: None,
        brand: None,
    }
}

/// 单个产品ID的桩行为
#[derive(Clone)]
enum StubFetch {
    /// 返回带给定描述的产品
    Found(&'static str),
    /// 目录中不存在
    NotFound,
    /// 传输/后端错误
    Error,
    /// 延迟指定毫秒后返回产品（用于打乱完成顺序）
    Delay(&'static str, u64),
}

/// 桩抓取器：按ID查表，查不到则返回兜底描述
struct StubFetcher {
    behaviors: HashMap<String, StubFetch>,
    fallback_description: &'static str,
}

impl StubFetcher {
    fn new() -> Self {
        Self {
            behaviors: HashMap::new(),
            fallback_description: LONG_DESCRIPTION,
        }
    }

    fn with(mut self, product_id: &str, behavior: StubFetch) -> Self {
        self.behaviors.insert(product_id.to_string(), behavior);
        self
    }
}

#[async_trait]
impl ProductFetcher for StubFetcher {
    async fn fetch_product(&self, product_id: &str) -> Result<Option<Product>, FetchError> {
        match self.behaviors.get(product_id) {
            Some(StubFetch::Found(description)) => Ok(Some(product(product_id, description))),
            Some(StubFetch::NotFound) => Ok(None),
            Some(StubFetch::Error) => Err(FetchError::BadStatus {
                endpoint: format!("stub://{product_id}"),
                status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            }),
            Some(StubFetch::Delay(description, millis)) => {
                tokio::time::sleep(Duration::from_millis(*millis)).await;
                Ok(Some(product(product_id, description)))
            }
            None => Ok(Some(product(product_id, self.fallback_description))),
        }
    }
}

/// 桩评估器：记录每次送评的ID列表，按顺序返回固定分数；
/// `drop_last` > 0 时少返回若干结果（模拟违反数量契约）
struct StubEvaluator {
    calls: Mutex<Vec<Vec<String>>>,
    drop_last: usize,
}

impl StubEvaluator {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            drop_last: 0,
        }
    }

    fn dropping_last(drop_last: usize) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            drop_last,
        }
    }

    fn submitted_ids(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DescriptionEvaluator for StubEvaluator {
    async fn evaluate_products(&self, products: &[Product]) -> Vec<EvaluationResult> {
        let ids: Vec<String> = products.iter().map(|p| p.product_id.clone()).collect();
        self.calls.lock().unwrap().push(ids);

        let keep = products.len().saturating_sub(self.drop_last);
        products[..keep]
            .iter()
            .map(|p| EvaluationResult::evaluated(&p.product_id, 2, "stub reason", "SCORE: 2"))
            .collect()
    }
}

fn test_config(batch_size: usize) -> Config {
    Config {
        batch_size,
        ..Config::default()
    }
}

fn build_pipeline(
    config: &Config,
    fetcher: StubFetcher,
    evaluator: Arc<StubEvaluator>,
) -> EvaluationPipeline {
    EvaluationPipeline::new(config, Arc::new(fetcher), evaluator).unwrap()
}

fn ids(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

/// 运行流水线并收集所有输出批次
async fn run_collect(
    pipeline: &EvaluationPipeline,
    product_ids: &[String],
) -> (Vec<EvaluationBatch>, Result<(), PipelineError>) {
    let (sender, mut receiver) = mpsc::channel(32);
    let collector = async move {
        let mut batches = Vec::new();
        while let Some(batch) = receiver.recv().await {
            batches.push(batch);
        }
        batches
    };
    let (run, batches) = tokio::join!(
        pipeline.evaluate_catalog_batches(product_ids, sender),
        collector
    );
    (batches, run)
}

fn flattened_ids(batches: &[EvaluationBatch]) -> Vec<String> {
    batches
        .iter()
        .flat_map(|b| b.results.iter().map(|r| r.product_id.clone()))
        .collect()
}

#[tokio::test]
async fn test_success_and_not_found_split_into_separate_batches() {
    // p1 正常评估，p2 未找到：两个批次，错误单独成批
    let fetcher = StubFetcher::new()
        .with("p1", StubFetch::Found(LONG_DESCRIPTION))
        .with("p2", StubFetch::NotFound);
    let evaluator = Arc::new(StubEvaluator::new());
    let pipeline = build_pipeline(&test_config(50), fetcher, evaluator.clone());

    let (batches, run) = run_collect(&pipeline, &ids(&["p1", "p2"])).await;
    run.unwrap();

    assert_eq!(batches.len(), 2);

    assert_eq!(batches[0].products.len(), 1);
    assert_eq!(batches[0].results[0].product_id, "p1");
    assert_eq!(batches[0].results[0].quality_score, 2);

    assert!(batches[1].is_error_batch());
    assert_eq!(batches[1].results[0].product_id, "p2");
    assert_eq!(batches[1].results[0].quality_score, 0);
    assert_eq!(batches[1].results[0].reason.as_deref(), Some(NOT_FOUND_REASON));
}

#[tokio::test]
async fn test_short_description_skips_backend() {
    // 描述只有 2 个字符：直接判最差分，评估后端零调用
    let fetcher = StubFetcher::new().with("p3", StubFetch::Found("hi"));
    let evaluator = Arc::new(StubEvaluator::new());
    let pipeline = build_pipeline(&test_config(50), fetcher, evaluator.clone());

    let (batches, run) = run_collect(&pipeline, &ids(&["p3"])).await;
    run.unwrap();

    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].results.len(), 1);
    assert_eq!(batches[0].results[0].quality_score, 5);
    assert_eq!(
        batches[0].results[0].reason.as_deref(),
        Some(SHORT_DESCRIPTION_REASON)
    );
    assert!(evaluator.submitted_ids().is_empty());
}

#[tokio::test]
async fn test_eligible_description_reaches_backend() {
    // 恰好 20 个字符的描述必须送评，不做兜底判分
    let twenty: &'static str = "abcdefghijklmnopqrst";
    let fetcher = StubFetcher::new().with("p1", StubFetch::Found(twenty));
    let evaluator = Arc::new(StubEvaluator::new());
    let pipeline = build_pipeline(&test_config(50), fetcher, evaluator.clone());

    let (batches, run) = run_collect(&pipeline, &ids(&["p1"])).await;
    run.unwrap();

    assert_eq!(evaluator.submitted_ids(), vec![vec!["p1".to_string()]]);
    assert_eq!(batches[0].results[0].quality_score, 2);
}

#[tokio::test]
async fn test_batches_split_at_configured_size() {
    // 120 个全部合格的产品，批次大小 50 → 50/50/20
    let fetcher = StubFetcher::new();
    let evaluator = Arc::new(StubEvaluator::new());
    let pipeline = build_pipeline(&test_config(50), fetcher, evaluator.clone());

    let product_ids: Vec<String> = (0..120).map(|i| format!("p{i:03}")).collect();
    let (batches, run) = run_collect(&pipeline, &product_ids).await;
    run.unwrap();

    let sizes: Vec<usize> = batches.iter().map(EvaluationBatch::len).collect();
    assert_eq!(sizes, vec![50, 50, 20]);
    assert_eq!(flattened_ids(&batches), product_ids);
}

#[tokio::test]
async fn test_truncated_backend_flushes_pairs_then_fails() {
    // 后端少返回一个结果：刷出已完成的 2 对，然后显式报错
    let fetcher = StubFetcher::new();
    let evaluator = Arc::new(StubEvaluator::dropping_last(1));
    let pipeline = build_pipeline(&test_config(50), fetcher, evaluator.clone());

    let (batches, run) = run_collect(&pipeline, &ids(&["p1", "p2", "p3"])).await;

    match run {
        Err(PipelineError::EvaluationTruncated { expected, received }) => {
            assert_eq!(expected, 3);
            assert_eq!(received, 2);
        }
        other => panic!("期望数量契约错误，得到 {other:?}"),
    }

    // 已完成的配对保持有效，第三个结果没有被捏造
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);
    assert_eq!(flattened_ids(&batches), vec!["p1", "p2"]);
}

#[tokio::test]
async fn test_concurrent_fetch_preserves_submission_order() {
    // 靠前的产品抓得更慢，完成顺序与提交顺序相反，
    // 输出顺序仍必须与提交顺序一致
    let mut fetcher = StubFetcher::new();
    let product_ids: Vec<String> = (0..8).map(|i| format!("p{i}")).collect();
    for (i, id) in product_ids.iter().enumerate() {
        fetcher = fetcher.with(id, StubFetch::Delay(LONG_DESCRIPTION, (8 - i as u64) * 20));
    }
    let evaluator = Arc::new(StubEvaluator::new());
    let pipeline = build_pipeline(&test_config(50), fetcher, evaluator.clone());

    let (batches, run) = run_collect(&pipeline, &product_ids).await;
    run.unwrap();

    assert_eq!(flattened_ids(&batches), product_ids);
    // 送评顺序也必须与提交顺序一致
    assert_eq!(evaluator.submitted_ids(), vec![product_ids]);
}

#[tokio::test]
async fn test_error_batches_never_mix_with_evaluated_results() {
    let fetcher = StubFetcher::new()
        .with("bad1", StubFetch::Error)
        .with("bad2", StubFetch::NotFound)
        .with("short", StubFetch::Found("tiny"));
    let evaluator = Arc::new(StubEvaluator::new());
    let pipeline = build_pipeline(&test_config(2), fetcher, evaluator.clone());

    let product_ids = ids(&["ok1", "bad1", "ok2", "short", "bad2", "ok3"]);
    let (batches, run) = run_collect(&pipeline, &product_ids).await;
    run.unwrap();

    for batch in &batches {
        let error_count = batch.results.iter().filter(|r| r.is_error()).count();
        if error_count > 0 {
            // 错误批次只承载一次失败
            assert!(batch.is_error_batch());
            assert_eq!(batch.results.len(), 1);
        }
    }

    // 每个提交的ID恰好产生一个结果，顺序不变
    assert_eq!(flattened_ids(&batches), product_ids);

    // 传输错误的理由携带细节
    let bad1 = batches
        .iter()
        .flat_map(|b| b.results.iter())
        .find(|r| r.product_id == "bad1")
        .unwrap();
    assert_eq!(bad1.quality_score, 0);
    assert!(bad1.reason.as_deref().unwrap().starts_with("VTEX API error:"));
}

#[tokio::test]
async fn test_error_flushes_undersized_batch_first() {
    // 批次大小 3：错误出现时先刷出不满的当前批次
    let fetcher = StubFetcher::new().with("bad", StubFetch::NotFound);
    let evaluator = Arc::new(StubEvaluator::new());
    let pipeline = build_pipeline(&test_config(3), fetcher, evaluator.clone());

    let product_ids = ids(&["ok1", "ok2", "bad", "ok3"]);
    let (batches, run) = run_collect(&pipeline, &product_ids).await;
    run.unwrap();

    let sizes: Vec<usize> = batches.iter().map(EvaluationBatch::len).collect();
    assert_eq!(sizes, vec![2, 1, 1]);
    assert!(batches[1].is_error_batch());
}

#[tokio::test]
async fn test_duplicate_ids_processed_independently() {
    // 不去重时，重复ID各自独立处理，输出中出现两次
    let fetcher = StubFetcher::new();
    let evaluator = Arc::new(StubEvaluator::new());
    let pipeline = build_pipeline(&test_config(50), fetcher, evaluator.clone());

    let product_ids = ids(&["p1", "p2", "p1"]);
    let (batches, run) = run_collect(&pipeline, &product_ids).await;
    run.unwrap();

    assert_eq!(flattened_ids(&batches), product_ids);
}

#[tokio::test]
async fn test_dropped_receiver_cancels_run_quietly() {
    let fetcher = StubFetcher::new();
    let evaluator = Arc::new(StubEvaluator::new());
    let pipeline = build_pipeline(&test_config(1), fetcher, evaluator.clone());

    let (sender, receiver) = mpsc::channel(1);
    drop(receiver);

    let product_ids: Vec<String> = (0..4).map(|i| format!("p{i}")).collect();
    let run = pipeline.evaluate_catalog_batches(&product_ids, sender).await;
    assert!(run.is_ok());
}

#[tokio::test]
async fn test_evaluate_catalog_collects_all_results() {
    let fetcher = StubFetcher::new().with("missing", StubFetch::NotFound);
    let evaluator = Arc::new(StubEvaluator::new());
    let pipeline = build_pipeline(&test_config(2), fetcher, evaluator.clone());

    let product_ids = ids(&["p1", "missing", "p2", "p3"]);
    let (products, results) = pipeline.evaluate_catalog(&product_ids).await.unwrap();

    // 每个ID一个结果；错误结果没有对应的产品记录
    assert_eq!(results.len(), 4);
    assert_eq!(products.len(), 3);
}

#[tokio::test]
async fn test_invalid_config_rejected_at_construction() {
    let config = Config {
        fetch_concurrency: 0,
        ..Config::default()
    };
    let result = EvaluationPipeline::new(
        &config,
        Arc::new(StubFetcher::new()),
        Arc::new(StubEvaluator::new()),
    );
    assert!(result.is_err());
}
