pub const DEFAULT_BASE_URL: &str = "http://datamall2.mytransport.sg/ltaodataservice";

/// DataMall serves at most this many records per request.
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Connection settings for the DataMall API
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataMallConfig {
    pub base_url: String,
    pub api_key: String,
    pub page_size: usize,
}

impl DataMallConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_key: api_key.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// `{base_url}/{endpoint}`, tolerating a trailing slash on the base
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint)
    }
}
