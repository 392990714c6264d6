use regex::Regex;

/// Pagination hints extracted independently of intent recognition
///. Extracted limit is hard-capped at 1000.
pub const MAX_LIMIT: u32 = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub fn extract(nlq: &str) -> Pagination {
    lazy_static::lazy_static! {
        static ref LIMIT_RE: Regex = Regex::new(r"(?:前|最多)\s*(\d+)\s*(?:筆|條|个|個)?").unwrap();
        static ref SKIP_RE: Regex = Regex::new(r"跳過\s*(\d+)\s*筆").unwrap();
        static ref PAGE_RE: Regex = Regex::new(r"第\s*(\d+)\s*頁").unwrap();
    }

    let limit = LIMIT_RE
        .captures(nlq)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .map(|l| l.min(MAX_LIMIT));

    let offset = if let Some(cap) = SKIP_RE.captures(nlq) {
        cap.get(1).and_then(|m| m.as_str().parse::<u32>().ok())
    } else if let Some(cap) = PAGE_RE.captures(nlq) {
        let page: u32 = cap.get(1).and_then(|m| m.as_str().parse().ok()).unwrap_or(1);
        let page_size = limit.unwrap_or(100);
        Some(page.saturating_sub(1).saturating_mul(page_size))
    } else {
        None
    };

    Pagination { limit, offset }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_limit_and_caps_at_1000() {
        let p = extract("查詢前 5000 筆資料");
        assert_eq!(p.limit, Some(1000));
    }

    #[test]
    fn extracts_skip_offset() {
        let p = extract("跳過 20 筆 前 10 筆");
        assert_eq!(p.offset, Some(20));
        assert_eq!(p.limit, Some(10));
    }

    #[test]
    fn page_offset_multiplies_by_limit() {
        let p = extract("前 25 筆 第 3 頁");
        assert_eq!(p.limit, Some(25));
        assert_eq!(p.offset, Some(50));
    }

    #[test]
    fn no_pagination_hints_returns_none() {
        let p = extract("查詢料號 10-0012 的庫存");
        assert_eq!(p, Pagination::default());
    }
}
