use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitAttemptRequest {
    /// Optional cross-check against the attempt's owning quiz.
    pub quiz_id: Option<String>,
    #[validate(nested)]
    pub answers: Vec<AnswerInput>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AnswerInput {
    #[validate(length(min = 1))]
    pub question_id: String,
    /// Index into the question's option list.
    pub selected: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    Score,
    CompletedAt,
    /// Requires the quiz metadata join; forces the in-memory pagination path.
    Topic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Dashboard list query options, normalized before use.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterOptions {
    #[serde(default)]
    pub page: i64,
    #[serde(default)]
    pub page_size: i64,
    pub sort_by: Option<SortBy>,
    pub sort_order: Option<SortOrder>,
    pub topic: Option<String>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        FilterOptions {
            page: 1,
            page_size: 10,
            sort_by: None,
            sort_order: None,
            topic: None,
        }
    }
}

impl FilterOptions {
    /// Clamp paging inputs: page >= 1, page size within 1..=100 (default 10).
    pub fn normalized(mut self) -> Self {
        if self.page < 1 {
            self.page = 1;
        }
        if self.page_size < 1 {
            self.page_size = 10;
        } else if self.page_size > 100 {
            self.page_size = 100;
        }
        if let Some(topic) = &self.topic {
            if topic.trim().is_empty() {
                self.topic = None;
            }
        }
        self
    }

    pub fn sort_by(&self) -> SortBy {
        self.sort_by.unwrap_or(SortBy::CompletedAt)
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order.unwrap_or(SortOrder::Desc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn normalized_clamps_out_of_range_paging() {
        let options = FilterOptions {
            page: 0,
            page_size: 5000,
            ..Default::default()
        }
        .normalized();

        assert_eq!(options.page, 1);
        assert_eq!(options.page_size, 100);
    }

    #[test]
    fn normalized_defaults_zero_page_size() {
        let options = FilterOptions {
            page: 3,
            page_size: 0,
            ..Default::default()
        }
        .normalized();

        assert_eq!(options.page, 3);
        assert_eq!(options.page_size, 10);
    }

    #[test]
    fn normalized_drops_blank_topic_filter() {
        let options = FilterOptions {
            topic: Some("   ".to_string()),
            ..Default::default()
        }
        .normalized();

        assert!(options.topic.is_none());
    }

    #[test]
    fn submit_request_rejects_empty_question_id() {
        let request = SubmitAttemptRequest {
            quiz_id: None,
            answers: vec![AnswerInput {
                question_id: String::new(),
                selected: 0,
            }],
        };

        assert!(request.validate().is_err());
    }

    #[test]
    fn sort_keys_parse_from_snake_case() {
        let parsed: SortBy = serde_json::from_str("\"completed_at\"").expect("should parse");
        assert_eq!(parsed, SortBy::CompletedAt);

        let parsed: SortOrder = serde_json::from_str("\"asc\"").expect("should parse");
        assert_eq!(parsed, SortOrder::Asc);
    }
}
