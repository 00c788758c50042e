//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责并发调度和批次装配，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `fetch_stage` - 并发抓取阶段
//! - 用 Semaphore 限制同时在途的抓取数
//! - 每个产品一个任务，互相独立失败
//! - 收齐全部结果后按提交顺序重新排序
//! - 把抓取失败就地转换为 score=0 的结果
//!
//! ### `pipeline` - 评估流水线 / 批次装配器
//! - 分流：跳过 AI 的产品 vs 需要 AI 评估的产品
//! - 调用评估后端并校验 1:1 数量契约
//! - 按提交顺序把三类结果合并回一条流，切成批次增量输出
//!
//! ### `app` - 应用主结构
//! - 管理应用生命周期（初始化、运行、统计）
//! - 读取输入CSV、登记任务、逐批持久化结果
//!
//! ## 层次关系
//!
//! ```text
//! app (一次评估运行)
//!     ↓
//! pipeline (装配 Vec<EvaluationBatch>)
//!     ↓
//! fetch_stage (并发收集 Vec<FetchOutcome>)
//!     ↓
//! services (能力层：eligibility / evaluator / storage / job_store)
//!     ↓
//! clients (边界适配：VtexClient)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单项失败不升级**：单个产品的失败变成结果值，不打断其余产品
//! 2. **顺序是恢复出来的**：并发执行期间不维持顺序，收齐后按索引重排
//! 3. **装配是串行的**：两个上游阶段全部落定后才开始合并，无需加锁

pub mod app;
pub mod fetch_stage;
pub mod pipeline;

// 重新导出主要类型
pub use app::App;
pub use fetch_stage::{fetch_products_concurrently, FetchOutcome};
pub use pipeline::EvaluationPipeline;
