use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct LimitOffset {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub limit: u32,
    pub offset: u32,
}

impl LimitOffset {
    pub fn resolve(&self, page_size: u32, max_limit: u32) -> Window {
        let max_limit = max_limit.max(1);
        let limit = self.limit.unwrap_or(page_size).clamp(1, max_limit);
        Window {
            limit,
            offset: self.offset.unwrap_or(0),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(path: &str, window: Window, count: u64, results: Vec<T>) -> Self {
        let limit = u64::from(window.limit);
        let offset = u64::from(window.offset);

        let next = (offset + limit < count)
            .then(|| format!("{}?limit={}&offset={}", path, limit, offset + limit));
        let previous = (offset > 0).then(|| {
            let prev = offset.saturating_sub(limit);
            if prev == 0 {
                format!("{}?limit={}", path, limit)
            } else {
                format!("{}?limit={}&offset={}", path, limit, prev)
            }
        });

        Self {
            count,
            next,
            previous,
            results,
        }
    }
}
