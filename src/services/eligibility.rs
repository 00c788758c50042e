//! 送评资格判定
//!
//! 纯函数：只看描述文本就决定一个产品是否需要 AI 评估。
//! 描述过短的产品直接判最差分（5），完全不调用评估后端——
//! 这是成本控制的短路，不是模型给出的质量判断。

/// 描述达不到最小长度时直接给出的分数
const WORST_SCORE: u8 = 5;

/// 快速打分
///
/// 描述（去除首尾空白后）短于 `min_len` 个字符时返回 `Some(5)`，
/// 否则返回 `None`，表示该产品需要送 AI 评估。
pub fn quick_score(description: &str, min_len: usize) -> Option<u8> {
    if description.trim().chars().count() < min_len {
        Some(WORST_SCORE)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_description_auto_scored() {
        assert_eq!(quick_score("", 20), Some(5));
        assert_eq!(quick_score("   ", 20), Some(5));
    }

    #[test]
    fn test_boundary_lengths() {
        // 19 个字符：过短
        let nineteen = "a".repeat(19);
        assert_eq!(quick_score(&nineteen, 20), Some(5));

        // 恰好 20 个字符：送 AI 评估
        let twenty = "a".repeat(20);
        assert_eq!(quick_score(&twenty, 20), None);
    }

    #[test]
    fn test_surrounding_whitespace_not_counted() {
        // 首尾空白不计入长度
        let padded = format!("   {}   ", "a".repeat(19));
        assert_eq!(quick_score(&padded, 20), Some(5));
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        // 多字节字符按字符数计
        let description = "产".repeat(20);
        assert_eq!(quick_score(&description, 20), None);
    }
}
