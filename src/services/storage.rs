//! CSV 存储服务 - 业务能力层
//!
//! 负责读取输入的产品ID列表和增量追加评估结果：
//! - 输入CSV必须包含 `product_id` 列，空白ID被跳过
//! - 输出CSV表头只写一次，之后按批次追加
//! - 理由/原始响应在模型层已清洗，不含换行

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, WriterBuilder};
use tracing::info;

use crate::error::StorageError;
use crate::models::{EvaluationBatch, EvaluationResult};

/// 输出CSV的列
const RESULT_HEADERS: [&str; 5] = [
    "product_id",
    "quality_score",
    "evaluation_timestamp",
    "reason",
    "raw_response",
];

/// 从CSV文件读取产品ID
///
/// 要求存在 `product_id` 列；空白ID被跳过。`dedup` 开启时
/// 去除重复ID并保留首次出现的顺序。
pub fn read_product_ids(csv_path: &Path, dedup: bool) -> Result<Vec<String>, StorageError> {
    let mut reader = csv::Reader::from_path(csv_path)?;

    let column_index = reader
        .headers()?
        .iter()
        .position(|h| h.trim() == "product_id")
        .ok_or_else(|| StorageError::MissingProductIdColumn {
            path: csv_path.display().to_string(),
        })?;

    let mut product_ids = Vec::new();
    let mut seen = HashSet::new();

    for record in reader.records() {
        let record = record?;
        let Some(raw) = record.get(column_index) else {
            continue;
        };
        let product_id = raw.trim();
        if product_id.is_empty() {
            continue;
        }
        if dedup && !seen.insert(product_id.to_string()) {
            continue;
        }
        product_ids.push(product_id.to_string());
    }

    info!("📦 从 {} 读取到 {} 个产品ID", csv_path.display(), product_ids.len());
    Ok(product_ids)
}

/// CSV 结果存储
///
/// 每个批次一次追加写入，已写入的批次在后续失败时仍然保留。
pub struct CsvStorage {
    file_path: PathBuf,
}

impl CsvStorage {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    /// 追加一个批次的评估结果
    pub fn append_batch(&self, batch: &EvaluationBatch) -> Result<(), StorageError> {
        self.append_results(&batch.results)
    }

    /// 追加评估结果
    ///
    /// 文件不存在或为空时先写表头。
    pub fn append_results(&self, results: &[EvaluationResult]) -> Result<(), StorageError> {
        if results.is_empty() {
            return Ok(());
        }

        let header_needed = match std::fs::metadata(&self.file_path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;

        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .from_writer(file);

        if header_needed {
            writer.write_record(RESULT_HEADERS)?;
        }

        for result in results {
            writer.write_record([
                result.product_id.as_str(),
                &result.quality_score.to_string(),
                &result.evaluation_timestamp.to_rfc3339(),
                result.reason.as_deref().unwrap_or(""),
                result.raw_response.as_deref().unwrap_or(""),
            ])?;
        }

        writer.flush().map_err(StorageError::Io)?;

        info!("💾 已写入 {} 条评估结果到 {}", results.len(), self.file_path.display());
        Ok(())
    }
}
