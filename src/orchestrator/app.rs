//! 应用主结构 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责一次完整评估运行的生命周期。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：校验配置、构建 VTEX 客户端和评估服务
//! 2. **输入加载**：从CSV读取产品ID（可选去重）
//! 3. **任务登记**：在 JobStore 中登记运行并维护进度
//! 4. **增量持久化**：流水线每输出一个批次就立即落盘
//! 5. **全局统计**：汇总整次运行的处理结果

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::clients::{ProductFetcher, VtexClient};
use crate::config::Config;
use crate::error::StorageError;
use crate::models::EvaluationBatch;
use crate::orchestrator::pipeline::EvaluationPipeline;
use crate::services::storage::read_product_ids;
use crate::services::{
    CsvStorage, DescriptionEvaluator, GeminiEvaluator, InMemoryJobStore, JobStore,
};
use crate::utils::logging;

/// 应用主结构
pub struct App {
    config: Config,
    pipeline: EvaluationPipeline,
    storage: CsvStorage,
    job_store: Arc<dyn JobStore>,
}

/// 一次运行的统计
#[derive(Debug, Default)]
struct RunStats {
    saved: usize,
    errors: usize,
}

impl App {
    /// 初始化应用
    ///
    /// 配置和凭据问题在这里立即失败，不做任何工作。
    pub fn initialize(config: Config) -> Result<Self> {
        let fetcher: Arc<dyn ProductFetcher> = Arc::new(VtexClient::new(&config)?);
        let evaluator: Arc<dyn DescriptionEvaluator> = Arc::new(GeminiEvaluator::new(&config));
        let pipeline = EvaluationPipeline::new(&config, fetcher, evaluator)?;
        let storage = CsvStorage::new(&config.output_csv);

        Ok(Self {
            config,
            pipeline,
            storage,
            job_store: Arc::new(InMemoryJobStore::new()),
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        logging::log_startup(&self.config);

        let product_ids = read_product_ids(
            Path::new(&self.config.input_csv),
            self.config.dedup_product_ids,
        )?;

        if product_ids.is_empty() {
            warn!("⚠️ 输入CSV中没有产品ID，程序结束");
            return Ok(());
        }

        let total = product_ids.len();
        logging::log_ids_loaded(total, self.config.batch_size);

        let job_id = self.job_store.create_job(total).await;
        info!("📋 运行ID: {}", job_id);

        let (sender, mut receiver) = mpsc::channel::<EvaluationBatch>(8);

        let pipeline_fut = self.pipeline.evaluate_catalog_batches(&product_ids, sender);

        let consumer_fut = async {
            let mut stats = RunStats::default();
            let mut batch_num = 0usize;
            while let Some(batch) = receiver.recv().await {
                batch_num += 1;
                self.storage.append_batch(&batch)?;

                let errors = batch.results.iter().filter(|r| r.is_error()).count();
                stats.saved += batch.len();
                stats.errors += errors;
                self.job_store
                    .update_progress(job_id, batch.len(), errors)
                    .await;

                logging::log_batch_saved(batch_num, batch.len(), batch.is_error_batch());
            }
            Ok::<RunStats, StorageError>(stats)
        };

        let (pipeline_res, consumer_res) = tokio::join!(pipeline_fut, consumer_fut);

        let stats = match consumer_res {
            Ok(stats) => stats,
            Err(e) => {
                error!("❌ 批次持久化失败: {}", e);
                self.job_store.fail_job(job_id, e.to_string()).await;
                return Err(e.into());
            }
        };

        if let Err(e) = pipeline_res {
            error!("❌ 流水线提前终止: {}", e);
            error!("💡 已写入 {} 条结果，之后的产品需要重新提交", stats.saved);
            self.job_store.fail_job(job_id, e.to_string()).await;
            return Err(e.into());
        }

        self.job_store.complete_job(job_id).await;
        logging::print_final_stats(stats.saved, stats.errors, total, &self.config.output_csv);

        Ok(())
    }
}
