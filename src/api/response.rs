use serde::Deserialize;

/// `{ "data": T }` wrapper used by single-entity endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: T,
}

/// `{ "data": [T], "pagination": { ... } }` wrapper used by list endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct PageEnvelope<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Option<PageMeta>,
}

/// Server-side page metadata. Every field is optional; older backends omit it.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageMeta {
    #[allow(dead_code)] // Logged only via Debug
    pub page: Option<u32>,
    pub has_more: Option<bool>,
}

/// Body of a like toggle response: the authoritative voter list.
#[derive(Debug, Deserialize)]
pub(crate) struct LikesBody {
    pub likes: Vec<String>,
}

/// Body of an error response.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(alias = "error")]
    pub message: Option<String>,
}
