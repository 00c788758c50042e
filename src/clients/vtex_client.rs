//! VTEX 商品目录 API 客户端
//!
//! 封装所有与 VTEX Catalog API 相关的调用逻辑：
//! 认证头、重试退避、404 与瞬时错误的区分。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ConfigError, FetchError};
use crate::models::Product;

/// 产品抓取能力
///
/// 流水线只依赖这个接口；`Ok(None)` 表示目录中没有这个产品。
/// 重试策略属于实现内部，调用方不再叠加重试。
#[async_trait]
pub trait ProductFetcher: Send + Sync {
    async fn fetch_product(&self, product_id: &str) -> Result<Option<Product>, FetchError>;
}

/// 最大请求尝试次数（含首次）
const MAX_ATTEMPTS: u32 = 3;

/// VTEX 商品详情响应（只取需要的字段）
#[derive(Debug, Deserialize)]
struct VtexProductDto {
    #[serde(rename = "Description")]
    description: Option<String>,
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "CategoryName")]
    category: Option<String>,
    #[serde(rename = "BrandName")]
    brand: Option<String>,
}

/// VTEX 商品目录客户端
pub struct VtexClient {
    http: reqwest::Client,
    base_url: String,
}

impl VtexClient {
    /// 创建新的 VTEX 客户端
    ///
    /// 凭据缺失或无法写入 HTTP 头时立即失败，不等到第一次请求。
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        if config.vtex_app_key.is_empty() {
            return Err(ConfigError::MissingCredential { var: "VTEX_APP_KEY" });
        }
        if config.vtex_app_token.is_empty() {
            return Err(ConfigError::MissingCredential { var: "VTEX_APP_TOKEN" });
        }
        if config.vtex_account_name.is_empty() {
            return Err(ConfigError::MissingCredential { var: "VTEX_ACCOUNT_NAME" });
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            "X-VTEX-API-AppKey",
            HeaderValue::from_str(&config.vtex_app_key)
                .map_err(|_| ConfigError::InvalidCredential { var: "VTEX_APP_KEY" })?,
        );
        headers.insert(
            "X-VTEX-API-AppToken",
            HeaderValue::from_str(&config.vtex_app_token)
                .map_err(|_| ConfigError::InvalidCredential { var: "VTEX_APP_TOKEN" })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(ConfigError::HttpClient)?;

        Ok(Self {
            http,
            base_url: format!("https://{}.vtexcommercestable.com.br", config.vtex_account_name),
        })
    }

    /// 抓取产品详情
    ///
    /// 404 立即返回 `Ok(None)`（不重试）；其他失败按指数退避重试，
    /// 耗尽尝试次数后返回最后一个错误。
    pub async fn get_product(&self, product_id: &str) -> Result<Option<Product>, FetchError> {
        let endpoint = format!("{}/api/catalog/pvt/product/{}", self.base_url, product_id);

        let mut last_error = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.request_product(&endpoint, product_id).await {
                Ok(found) => return Ok(found),
                Err(FetchError::BadStatus { status, .. }) if status == StatusCode::NOT_FOUND => {
                    warn!("产品 {} 在 VTEX 目录中不存在", product_id);
                    return Ok(None);
                }
                Err(e) => {
                    if attempt < MAX_ATTEMPTS {
                        // 退避等待 4s、8s（上限 10s）
                        let wait = Duration::from_secs((1u64 << (attempt + 1)).clamp(4, 10));
                        warn!(
                            "抓取产品 {} 第 {}/{} 次失败: {}，{}s 后重试",
                            product_id,
                            attempt,
                            MAX_ATTEMPTS,
                            e,
                            wait.as_secs()
                        );
                        tokio::time::sleep(wait).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(FetchError::BadStatus {
            endpoint,
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }))
    }

    /// 单次请求，不含重试
    async fn request_product(
        &self,
        endpoint: &str,
        product_id: &str,
    ) -> Result<Option<Product>, FetchError> {
        debug!("请求 VTEX 商品详情: {}", endpoint);

        let response = self
            .http
            .get(endpoint)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::BadStatus {
                endpoint: endpoint.to_string(),
                status,
            });
        }

        let dto: VtexProductDto = response.json().await.map_err(FetchError::JsonParse)?;

        info!("✓ 成功抓取产品 {}", product_id);

        Ok(Some(Product {
            product_id: product_id.to_string(),
            description: dto.description,
            name: dto.name,
            category: dto.category,
            brand: dto.brand,
        }))
    }
}

#[async_trait]
impl ProductFetcher for VtexClient {
    async fn fetch_product(&self, product_id: &str) -> Result<Option<Product>, FetchError> {
        self.get_product(product_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_credentials() -> Config {
        Config {
            vtex_app_key: "key".to_string(),
            vtex_app_token: "token".to_string(),
            vtex_account_name: "acme".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let config = Config::default();
        assert!(matches!(
            VtexClient::new(&config),
            Err(ConfigError::MissingCredential { .. })
        ));
    }

    #[test]
    fn test_base_url_uses_account_name() {
        let client = VtexClient::new(&config_with_credentials()).unwrap();
        assert_eq!(client.base_url, "https://acme.vtexcommercestable.com.br");
    }

    #[test]
    fn test_product_dto_field_mapping() {
        let dto: VtexProductDto = serde_json::from_value(serde_json::json!({
            "Description": "A long and useful description",
            "Name": "Widget",
            "CategoryName": "Tools",
            "BrandName": "Acme",
            "ReleaseDate": "2024-01-01"
        }))
        .unwrap();

        assert_eq!(dto.description.as_deref(), Some("A long and useful description"));
        assert_eq!(dto.name.as_deref(), Some("Widget"));
        assert_eq!(dto.category.as_deref(), Some("Tools"));
        assert_eq!(dto.brand.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_product_dto_tolerates_missing_fields() {
        let dto: VtexProductDto = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(dto.description.is_none());
        assert!(dto.name.is_none());
    }
}
