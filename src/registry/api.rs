//! Public API for the registry client

pub use crate::registry::config::RegistryConfig;
pub use crate::registry::error::{AuthError, ScrapeError, TransportError};
pub use crate::registry::scraper::Scraper;
pub use crate::registry::session::{Session, SessionManager};
pub use crate::registry::traits::{Authenticator, FineFetcher};
pub use crate::registry::transport::{
    HttpMethod, HttpTransport, RegistryRequest, RegistryResponse, ReqwestTransport,
};
pub use crate::registry::types::{
    FineListing, FineRecord, MediaKind, MediaLink, PayAllForm, VehicleInfo,
};

pub use crate::registry::parser::{detect_session_expiry, parse_listing};
