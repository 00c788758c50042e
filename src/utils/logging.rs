/// 日志工具模块
///
/// 提供日志初始化和格式化输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化日志
///
/// 级别由 RUST_LOG 控制，默认 info。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 商品目录质量评估");
    info!("📊 抓取并发数: {}", config.fetch_concurrency);
    info!("🧠 评估并发数: {}", config.eval_concurrency);
    info!("📦 批次大小: {}", config.batch_size);
    info!("{}", "=".repeat(60));
}

/// 记录产品ID加载信息
pub fn log_ids_loaded(total: usize, batch_size: usize) {
    info!("✓ 共 {} 个待评估的产品", total);
    info!("📋 结果将以每批最多 {} 条的方式落盘", batch_size);
}

/// 记录批次落盘信息
pub fn log_batch_saved(batch_num: usize, size: usize, is_error_batch: bool) {
    if is_error_batch {
        info!("💾 批次 {} 已保存（{} 条错误结果）", batch_num, size);
    } else {
        info!("💾 批次 {} 已保存（{} 条结果）", batch_num, size);
    }
}

/// 打印最终统计信息
pub fn print_final_stats(saved: usize, errors: usize, total: usize, output_csv: &str) {
    info!("{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("✅ 已写入结果: {}/{}", saved, total);
    info!("❌ 未能评估: {}", errors);
    info!("{}", "=".repeat(60));
    info!("结果已保存至: {}", output_csv);
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
