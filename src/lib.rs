//! # Catalog Evaluator
//!
//! 一个用于评估商品目录文本质量的 Rust 应用程序：从 VTEX 目录
//! 抓取每个产品的描述记录，筛选后送生成式评估后端打分，并按
//! 提交顺序切成批次增量落盘。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 边界适配层（Clients）
//! - `clients/` - 外部 API 适配，只暴露能力
//! - `VtexClient` - 商品目录抓取（认证、重试、404 区分）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个 Product
//! - `eligibility` - 送评资格判定（描述过短直接判分）
//! - `GeminiEvaluator` - AI 评估能力（prompt 构建 + 响应解析）
//! - `CsvStorage` - 结果增量落盘能力
//! - `JobStore` - 运行登记与进度跟踪能力
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/fetch_stage` - 有界并发抓取，恢复提交顺序
//! - `orchestrator/pipeline` - 三类结局合并装配，批次增量输出
//! - `orchestrator/app` - 应用生命周期与统计
//!
//! ### ④ 值对象（Models）
//! - `models/` - 构造后不变的值记录
//! - `Product` / `EvaluationResult` / `EvaluationBatch`
//!
//! ## 关键不变量
//!
//! - 每个提交的产品ID恰好产生一个结果（AI 评分、直接判分或
//!   score=0 的错误结果），唯一例外是评估后端违反数量契约
//! - 输出顺序与提交顺序一致，并发只发生在中间阶段
//! - 错误结果单独成批，不与 AI 评分混在同一批次

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use clients::{ProductFetcher, VtexClient};
pub use config::Config;
pub use error::{AppError, AppResult, ConfigError, FetchError, PipelineError, StorageError};
pub use models::{EvaluationBatch, EvaluationResult, Product};
pub use orchestrator::{App, EvaluationPipeline, FetchOutcome};
pub use services::{DescriptionEvaluator, GeminiEvaluator, InMemoryJobStore, JobStore};
