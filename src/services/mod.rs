pub mod eligibility;
pub mod evaluator;
pub mod job_store;
pub mod storage;

pub use evaluator::{DescriptionEvaluator, GeminiEvaluator};
pub use job_store::{InMemoryJobStore, JobProgress, JobRecord, JobStatus, JobStore};
pub use storage::CsvStorage;
