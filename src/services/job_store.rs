//! 评估任务登记表 - 业务能力层
//!
//! 每次流水线运行在这里登记为一个任务，生命周期
//! Processing → Completed | Failed，进度计数只增不减。
//! 以注入能力的方式提供给编排层，避免裸的全局可变映射。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

/// 任务生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

/// 任务进度计数
#[derive(Debug, Clone, Copy, Default)]
pub struct JobProgress {
    pub processed: usize,
    pub total: usize,
    pub errors: usize,
}

/// 一次评估运行的登记记录
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub progress: JobProgress,
    pub error: Option<String>,
}

/// 任务登记能力
#[async_trait]
pub trait JobStore: Send + Sync {
    /// 登记一个新任务，返回生成的运行ID
    async fn create_job(&self, total: usize) -> Uuid;

    /// 累加进度计数
    async fn update_progress(&self, job_id: Uuid, processed_delta: usize, error_delta: usize);

    /// 标记任务成功结束
    async fn complete_job(&self, job_id: Uuid);

    /// 标记任务失败
    async fn fail_job(&self, job_id: Uuid, error: String);

    /// 查询任务记录
    async fn get_job(&self, job_id: Uuid) -> Option<JobRecord>;
}

/// 进程内任务登记表
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<Uuid, JobRecord>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create_job(&self, total: usize) -> Uuid {
        let job_id = Uuid::new_v4();
        let record = JobRecord {
            job_id,
            status: JobStatus::Processing,
            started_at: Utc::now(),
            completed_at: None,
            progress: JobProgress {
                processed: 0,
                total,
                errors: 0,
            },
            error: None,
        };
        self.jobs.write().await.insert(job_id, record);
        job_id
    }

    async fn update_progress(&self, job_id: Uuid, processed_delta: usize, error_delta: usize) {
        if let Some(record) = self.jobs.write().await.get_mut(&job_id) {
            record.progress.processed += processed_delta;
            record.progress.errors += error_delta;
        }
    }

    async fn complete_job(&self, job_id: Uuid) {
        if let Some(record) = self.jobs.write().await.get_mut(&job_id) {
            record.status = JobStatus::Completed;
            record.completed_at = Some(Utc::now());
        }
    }

    async fn fail_job(&self, job_id: Uuid, error: String) {
        if let Some(record) = self.jobs.write().await.get_mut(&job_id) {
            record.status = JobStatus::Failed;
            record.completed_at = Some(Utc::now());
            record.error = Some(error);
        }
    }

    async fn get_job(&self, job_id: Uuid) -> Option<JobRecord> {
        self.jobs.read().await.get(&job_id).cloned()
    }
}
