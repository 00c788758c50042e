use crate::error::ConfigError;

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 同时抓取产品详情的并发数
    pub fetch_concurrency: usize,
    /// 同时调用评估后端的并发数
    pub eval_concurrency: usize,
    /// 每个输出批次包含的产品数量
    pub batch_size: usize,
    /// 描述低于该长度时直接判最差分，不送 AI 评估
    pub min_description_len: usize,
    /// 是否对输入的产品ID去重（保留首次出现的顺序）
    pub dedup_product_ids: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输入CSV路径（需包含 product_id 列）
    pub input_csv: String,
    /// 输出CSV路径（结果增量追加）
    pub output_csv: String,
    // --- VTEX 商品目录 API 配置 ---
    pub vtex_app_key: String,
    pub vtex_app_token: String,
    pub vtex_account_name: String,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch_concurrency: 8,
            eval_concurrency: 12,
            batch_size: 50,
            min_description_len: 20,
            dedup_product_ids: false,
            verbose_logging: false,
            input_csv: "product_ids.csv".to_string(),
            output_csv: "results.csv".to_string(),
            vtex_app_key: String::new(),
            vtex_app_token: String::new(),
            vtex_account_name: String::new(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-2.0-flash".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            fetch_concurrency: std::env::var("VTEX_FETCH_CONCURRENCY").ok().and_then(|v| v.parse().ok()).unwrap_or(default.fetch_concurrency),
            eval_concurrency: std::env::var("GEMINI_MAX_CONCURRENCY").ok().and_then(|v| v.parse().ok()).unwrap_or(default.eval_concurrency),
            batch_size: std::env::var("GEMINI_REQUEST_BATCH_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.batch_size),
            min_description_len: std::env::var("MIN_DESCRIPTION_LEN").ok().and_then(|v| v.parse().ok()).unwrap_or(default.min_description_len),
            dedup_product_ids: std::env::var("DEDUP_PRODUCT_IDS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.dedup_product_ids),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            input_csv: std::env::var("INPUT_CSV").unwrap_or(default.input_csv),
            output_csv: std::env::var("OUTPUT_CSV").unwrap_or(default.output_csv),
            vtex_app_key: std::env::var("VTEX_APP_KEY").unwrap_or(default.vtex_app_key),
            vtex_app_token: std::env::var("VTEX_APP_TOKEN").unwrap_or(default.vtex_app_token),
            vtex_account_name: std::env::var("VTEX_ACCOUNT_NAME").unwrap_or(default.vtex_account_name),
            llm_api_key: std::env::var("GOOGLE_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
        }
    }

    /// 校验配置有效性
    ///
    /// 并发数和批次大小必须 ≥ 1，在任何工作开始之前拒绝非法配置。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch_concurrency < 1 {
            return Err(ConfigError::InvalidWorkerCount {
                field: "fetch_concurrency",
                value: self.fetch_concurrency,
            });
        }
        if self.eval_concurrency < 1 {
            return Err(ConfigError::InvalidWorkerCount {
                field: "eval_concurrency",
                value: self.eval_concurrency,
            });
        }
        if self.batch_size < 1 {
            return Err(ConfigError::InvalidWorkerCount {
                field: "batch_size",
                value: self.batch_size,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.fetch_concurrency, 8);
        assert_eq!(config.eval_concurrency, 12);
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.min_description_len, 20);
        assert!(!config.dedup_product_ids);
    }

    #[test]
    fn test_zero_worker_count_rejected() {
        let config = Config {
            fetch_concurrency: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            eval_concurrency: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            batch_size: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
