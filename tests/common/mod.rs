//! Shared helpers for the integration tests
//!
//! `FakeRegistry` answers the login, search and photo viewer endpoints the
//! way the real registry does, from in-memory state.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use finewatch::registry::api::{
    HttpTransport, RegistryConfig, RegistryRequest, RegistryResponse, TransportError,
};

pub const BASE_URL: &str = "https://registry.test";

const LOGIN_PAGE: &str = r#"<html><head><title>Авторизация</title></head>
<body><form action="../modules/crud.php?act=auth" method="post">
<input name="login"><input name="password" type="password"></form></body></html>"#;

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap()
}

pub fn registry_config() -> RegistryConfig {
    RegistryConfig {
        base_url: BASE_URL.to_string(),
        login: "operator".to_string(),
        password: "secret".to_string(),
        ..RegistryConfig::default()
    }
}

/// One fines row: order, amount, outstanding status, photo viewer link
#[derive(Debug, Clone)]
pub struct Row {
    pub order: String,
    pub amount: String,
    pub status: String,
    pub photo: Option<String>,
}

impl Row {
    pub fn new(order: &str, amount: &str, status: &str) -> Self {
        Self {
            order: order.to_string(),
            amount: amount.to_string(),
            status: status.to_string(),
            photo: None,
        }
    }

    pub fn with_photo(mut self, href: &str) -> Self {
        self.photo = Some(href.to_string());
        self
    }
}

/// Listing page in the registry's layout
pub fn listing_page(plate: &str, rows: &[Row]) -> String {
    let body: String = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let photo = row
                .photo
                .as_deref()
                .map(|href| format!(r#"<a href="{}">Фото</a>"#, href))
                .unwrap_or_default();
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>2025-05-30 08:15</td><td>Превышение скорости</td>\
                 <td>{}</td><td>{}</td><td></td><td></td><td></td><td>{}</td></tr>",
                i + 1,
                row.order,
                plate,
                row.amount,
                photo,
                row.status
            )
        })
        .collect();

    format!(
        r#"<html><head><title>Поиск штрафов</title></head><body>
<div class="alert alert-primary">Номер автомобиля: <u>{plate}</u><br>Модель автомобиля: <u>Toyota Camry</u></div>
<form action="qrforpay.php" method="post"><input name="summa" value="750"><input name="plate" value="{plate}"></form>
<table class="table table-light"><thead><tr><th>#</th></tr></thead><tbody>{body}</tbody></table>
</body></html>"#
    )
}

#[derive(Default)]
struct RegistryState {
    pages: HashMap<String, String>,
    live_sessions: HashSet<String>,
    logins: usize,
    searches: Vec<String>,
    viewer_requests: Vec<String>,
    rotate_sessions: bool,
    rotations: usize,
}

/// In-memory stand-in for the registry web site
#[derive(Default)]
pub struct FakeRegistry {
    state: Mutex<RegistryState>,
}

impl FakeRegistry {
    pub fn set_listing(&self, plate: &str, rows: &[Row]) {
        self.state
            .lock()
            .unwrap()
            .pages
            .insert(plate.to_string(), listing_page(plate, rows));
    }

    /// Forget every issued session, as the registry does on its own schedule
    pub fn expire_sessions(&self) {
        self.state.lock().unwrap().live_sessions.clear();
    }

    /// Replace the session cookie on every accepted search
    pub fn rotate_sessions(&self) {
        self.state.lock().unwrap().rotate_sessions = true;
    }

    pub fn logins(&self) -> usize {
        self.state.lock().unwrap().logins
    }

    pub fn searches(&self) -> Vec<String> {
        self.state.lock().unwrap().searches.clone()
    }

    pub fn viewer_requests(&self) -> Vec<String> {
        self.state.lock().unwrap().viewer_requests.clone()
    }

    fn page(url: &str, status: u16, body: String) -> RegistryResponse {
        RegistryResponse {
            status,
            url: url.to_string(),
            content_type: Some("text/html; charset=utf-8".to_string()),
            body,
            ..RegistryResponse::default()
        }
    }
}

#[async_trait]
impl HttpTransport for FakeRegistry {
    async fn send(&self, request: RegistryRequest) -> Result<RegistryResponse, TransportError> {
        let mut state = self.state.lock().unwrap();
        let field = |name: &str| {
            request
                .form
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
                .unwrap_or_default()
        };

        if request.url.contains("act=auth") {
            if field("login") != "operator" || field("password") != "secret" {
                return Ok(Self::page(&request.url, 200, LOGIN_PAGE.to_string()));
            }
            state.logins += 1;
            let token = format!("sess-{}", state.logins);
            state.live_sessions.insert(token.clone());
            return Ok(RegistryResponse {
                status: 302,
                url: request.url.clone(),
                location: Some("../pages/dashboard.php".to_string()),
                set_cookies: vec![format!("PHPSESSID={}; path=/", token)],
                ..RegistryResponse::default()
            });
        }

        if request.url.contains("searchfines.php") {
            let cookie = request
                .cookie_header
                .as_deref()
                .and_then(|header| header.strip_prefix("PHPSESSID="))
                .unwrap_or_default()
                .to_string();
            if !state.live_sessions.contains(&cookie) {
                return Ok(Self::page(
                    &format!("{}/pages/login.php", BASE_URL),
                    200,
                    LOGIN_PAGE.to_string(),
                ));
            }
            let plate = field("plate");
            state.searches.push(plate.clone());
            let body = state
                .pages
                .get(&plate)
                .cloned()
                .unwrap_or_else(|| listing_page(&plate, &[]));
            let mut response = Self::page(&request.url, 200, body);
            if state.rotate_sessions {
                state.rotations += 1;
                let token = format!("rotated-{}", state.rotations);
                state.live_sessions.remove(&cookie);
                state.live_sessions.insert(token.clone());
                response.set_cookies = vec![format!("PHPSESSID={}; path=/", token)];
            }
            return Ok(response);
        }

        if request.url.contains("photo.php") {
            state.viewer_requests.push(request.url.clone());
            return Ok(RegistryResponse {
                status: 200,
                url: format!("{}.jpg", request.url),
                content_type: Some("image/jpeg".to_string()),
                ..RegistryResponse::default()
            });
        }

        Ok(Self::page(&request.url, 404, "<html><body>Not found</body></html>".to_string()))
    }
}
