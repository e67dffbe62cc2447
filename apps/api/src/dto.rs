use fieldgate_application::RecordPage;
use serde::Serialize;
use serde_json::Value;
use ts_rs::TS;

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
    pub registered_entities: usize,
}

/// API error payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/error-response.ts"
)]
pub struct ErrorResponse {
    pub message: String,
}

/// Registered entities served by the API.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/entity-list-response.ts"
)]
pub struct EntityListResponse {
    pub entities: Vec<String>,
}

/// Page navigation block of a list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/pagination-response.ts"
)]
pub struct PaginationResponse {
    pub next: Option<usize>,
    pub previous: Option<usize>,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// One page of permission-shaped records.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/record-page-response.ts"
)]
pub struct RecordPageResponse {
    pub pagination: PaginationResponse,
    #[ts(type = "Array<Record<string, unknown>>")]
    pub data: Vec<Value>,
}

impl From<RecordPage> for RecordPageResponse {
    fn from(page: RecordPage) -> Self {
        let pagination = PaginationResponse {
            next: page.has_next().then_some(page.page + 1),
            previous: page.has_previous().then(|| page.page - 1),
            current_page: page.page,
            total_pages: page.total_pages,
            total_items: page.total_items,
        };

        Self {
            pagination,
            data: page.records,
        }
    }
}
