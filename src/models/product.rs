use serde::{Deserialize, Serialize};

/// VTEX 商品目录中的一条产品记录
///
/// 不变量：`product_id` 始终非空；描述缺失是合法状态（决定后续分流），
/// 不是错误。所有字段在构造后不再修改。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
}

impl Product {
    /// 去除首尾空白后的描述；空白描述视同缺失
    pub fn trimmed_description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_with_description(description: Option<&str>) -> Product {
        Product {
            product_id: "p1".to_string(),
            description: description.map(str::to_string),
            name: Some("测试产品".to_string()),
            category: None,
            brand: None,
        }
    }

    #[test]
    fn test_trimmed_description_present() {
        let product = product_with_description(Some("  a solid description  "));
        assert_eq!(product.trimmed_description(), Some("a solid description"));
    }

    #[test]
    fn test_blank_description_treated_as_missing() {
        assert_eq!(product_with_description(Some("   ")).trimmed_description(), None);
        assert_eq!(product_with_description(Some("")).trimmed_description(), None);
        assert_eq!(product_with_description(None).trimmed_description(), None);
    }
}
