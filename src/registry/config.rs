//! Connection settings for the registry

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://rbda.dc.tj";
pub const DEFAULT_AUTH_PATH: &str = "/modules/crud.php?act=auth";
pub const DEFAULT_SEARCH_PATH: &str = "/pages/searchfines.php";
pub const DEFAULT_SUCCESS_MARKER: &str = "dashboard.php";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
pub const DEFAULT_VIDEO_HOST: &str = "video.mycar.tj/";
pub const DEFAULT_VIDEO_DOWNLOAD_URL: &str = "https://video.mycar.tj/video/download/video/{id}";

#[derive(Debug, Clone, PartialEq)]
pub struct RegistryConfig {
    pub base_url: String,
    pub auth_path: String,
    pub search_path: String,
    pub login: String,
    pub password: String,
    /// Fragment of the post-login location that marks a successful login
    pub success_marker: String,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Sessions older than this are renewed before use; `None` trusts the
    /// registry to tell us when a session has expired
    pub session_max_age: Option<Duration>,
    /// Upper bound on media viewer pages fetched per listing
    pub max_detail_requests: usize,
    /// Unparsable pages are appended here when set
    pub parse_dump_file: Option<PathBuf>,
    pub video_host: String,
    /// Download URL for videos, `{id}` is replaced by the video id
    pub video_download_url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            auth_path: DEFAULT_AUTH_PATH.to_string(),
            search_path: DEFAULT_SEARCH_PATH.to_string(),
            login: String::new(),
            password: String::new(),
            success_marker: DEFAULT_SUCCESS_MARKER.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            session_max_age: None,
            max_detail_requests: 8,
            parse_dump_file: None,
            video_host: DEFAULT_VIDEO_HOST.to_string(),
            video_download_url: DEFAULT_VIDEO_DOWNLOAD_URL.to_string(),
        }
    }
}

impl RegistryConfig {
    pub fn auth_url(&self) -> String {
        self.resolve(&self.auth_path)
    }

    pub fn search_url(&self) -> String {
        self.resolve(&self.search_path)
    }

    /// Resolve a possibly relative link against the base URL
    ///
    /// Links that cannot be joined are returned untouched.
    pub fn resolve(&self, href: &str) -> String {
        match url::Url::parse(&self.base_url).and_then(|base| base.join(href.trim())) {
            Ok(joined) => joined.to_string(),
            Err(_) => href.trim().to_string(),
        }
    }
}
