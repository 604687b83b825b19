//! Reading the registry's listing and viewer pages
//!
//! Pure functions over page text. The listing page has three parts we care
//! about: the vehicle summary (`div.alert-primary`), the fines table
//! (`table.table-light`) and the "pay all" form posting to `qrforpay.php`.

use once_cell::sync::Lazy;
use regex::Regex;

use super::config::RegistryConfig;
use super::error::ScrapeError;
use super::html::{self, Element};
use super::transport::RegistryResponse;
use super::types::{FineListing, FineRecord, MediaKind, MediaLink, PayAllForm, VehicleInfo};

/// A fines row carries more than this many cells
const MIN_FINE_CELLS: usize = 11;
const MEDIA_COLUMNS: std::ops::Range<usize> = 6..10;
const OUTSTANDING_COLUMN: usize = 10;

const LOGIN_TITLE: &str = "Авторизация";
const LOGIN_FORM_ACTION: &str = "modules/crud.php?act=auth";

static LOGIN_TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<title>\s*Авторизация\s*</title>").expect("login title pattern is valid")
});

/// `Label: <u>value</u>` pairs in the vehicle block
static UNDERLINED_FIELDS: Lazy<Vec<(VehicleField, Regex)>> = Lazy::new(|| {
    [
        (VehicleField::Plate, "Номер автомобиля"),
        (VehicleField::Model, "Модель автомобиля"),
        (VehicleField::Color, "Цвет автомобиля"),
        (VehicleField::FineCount, "Кол-во штрафов"),
        (VehicleField::TotalAmount, "Общая сумма"),
    ]
    .into_iter()
    .map(|(field, label)| {
        let pattern = format!(r"(?i){}:\s*<u>([^<]+)</u>", regex::escape(label));
        (field, Regex::new(&pattern).expect("vehicle field pattern is valid"))
    })
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VehicleField {
    Plate,
    Brand,
    Model,
    Color,
    Year,
    Vin,
    Owner,
    FineCount,
    TotalAmount,
}

impl VehicleInfo {
    fn slot(&mut self, field: VehicleField) -> &mut Option<String> {
        match field {
            VehicleField::Plate => &mut self.plate,
            VehicleField::Brand => &mut self.brand,
            VehicleField::Model => &mut self.model,
            VehicleField::Color => &mut self.color,
            VehicleField::Year => &mut self.year,
            VehicleField::Vin => &mut self.vin,
            VehicleField::Owner => &mut self.owner,
            VehicleField::FineCount => &mut self.fine_count,
            VehicleField::TotalAmount => &mut self.total_amount,
        }
    }
}

/// Why a response is the login page rather than the requested page
///
/// `None` means the session is still accepted.
pub fn detect_session_expiry(response: &RegistryResponse) -> Option<&'static str> {
    if response.status == 401 || response.status == 403 {
        return Some("access denied");
    }
    if let Some(location) = response.location.as_deref() {
        let lower = location.to_ascii_lowercase();
        if response.is_redirect() && (lower.contains("login.php") || lower.contains("auth")) {
            return Some("redirected to login");
        }
    }
    if response.url.to_ascii_lowercase().contains("login.php") {
        return Some("landed on login page");
    }
    if LOGIN_TITLE_RE.is_match(&response.body) {
        return Some("login page served");
    }
    if response.body.contains(LOGIN_FORM_ACTION)
        && response.body.contains("<h4")
        && response.body.contains(LOGIN_TITLE)
    {
        return Some("login form served");
    }
    None
}

/// Parse a listing page for `plate`
///
/// Media links are made absolute but not yet resolved to files.
pub fn parse_listing(
    page: &str,
    plate: &str,
    config: &RegistryConfig,
) -> Result<FineListing, ScrapeError> {
    let page = html::without_comments(page);
    let page: &str = &page;

    let vehicle = html::find_first(page, "div", |e| e.has_class("alert-primary"))
        .map(|block| parse_vehicle_info(&block))
        .unwrap_or_default();

    let table = html::find_first(page, "table", |e| e.has_class("table-light"))
        .filter(|table| table.find("tbody").is_some());

    let fines = match &table {
        Some(table) => parse_fines_table(table, plate, config)?,
        None => Vec::new(),
    };

    if vehicle.is_empty() && table.is_none() {
        return Err(ScrapeError::Parse {
            plate: plate.to_string(),
            reason: "neither vehicle block nor fines table found".to_string(),
        });
    }

    Ok(FineListing {
        vehicle,
        fines,
        pay_all: parse_pay_all(page),
        set_cookies: Vec::new(),
    })
}

fn parse_vehicle_info(block: &Element<'_>) -> VehicleInfo {
    let mut info = VehicleInfo::default();

    for (field, pattern) in UNDERLINED_FIELDS.iter() {
        if let Some(captures) = pattern.captures(block.outer) {
            let value = html::decode_entities(captures[1].trim());
            if !value.is_empty() {
                *info.slot(*field) = Some(value);
            }
        }
    }
    if !info.is_empty() {
        return info;
    }

    // Older layout: plain "Label: value" lines
    for line in html::text_lines(block.inner) {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if let Some(field) = classify_label(key) {
            *info.slot(field) = Some(value.to_string());
        }
    }
    info
}

fn classify_label(key: &str) -> Option<VehicleField> {
    let has = |needles: &[&str]| needles.iter().any(|n| key.contains(n));
    if has(&["Владелец", "Owner"]) {
        Some(VehicleField::Owner)
    } else if has(&["Марка", "Brand"]) {
        Some(VehicleField::Brand)
    } else if has(&["Модель", "Model"]) {
        Some(VehicleField::Model)
    } else if has(&["Цвет", "Color"]) {
        Some(VehicleField::Color)
    } else if has(&["Год", "Year"]) {
        Some(VehicleField::Year)
    } else if key.to_uppercase().contains("VIN") {
        Some(VehicleField::Vin)
    } else if has(&["Номер", "Plate"]) {
        Some(VehicleField::Plate)
    } else {
        None
    }
}

fn parse_fines_table(
    table: &Element<'_>,
    plate: &str,
    config: &RegistryConfig,
) -> Result<Vec<FineRecord>, ScrapeError> {
    let mut fines = Vec::new();
    let mut malformed = 0usize;

    for row in table.children("tr") {
        let cells = row.children("td");
        if cells.len() >= MIN_FINE_CELLS {
            let fine = parse_fine_row(&cells, plate, config);
            if fine.order_number.is_empty() {
                log::warn!("Skipping a fine row without an order number for {}", plate);
                malformed += 1;
            } else {
                fines.push(fine);
            }
        } else if cells.len() > 1 {
            // Header rows use th; single-cell rows are "no fines" placeholders
            malformed += 1;
        }
    }

    if fines.is_empty() && malformed > 0 {
        return Err(ScrapeError::Parse {
            plate: plate.to_string(),
            reason: format!("{} table rows with unexpected shape", malformed),
        });
    }
    Ok(fines)
}

fn parse_fine_row(cells: &[Element<'_>], plate: &str, config: &RegistryConfig) -> FineRecord {
    let text = |index: usize| cells.get(index).map(|c| c.text()).unwrap_or_default();

    let plate_number = match text(2) {
        listed if listed.is_empty() => plate.to_string(),
        listed => listed.to_uppercase(),
    };
    let outstanding = text(OUTSTANDING_COLUMN);

    let media_links = MEDIA_COLUMNS
        .enumerate()
        .filter_map(|(column, index)| {
            let kind = MediaKind::from_column(column)?;
            let href = cells.get(index)?.find("a")?.attr("href")?;
            let href = href.trim();
            if href.is_empty() {
                return None;
            }
            Some(MediaLink::new(kind, config.resolve(href)))
        })
        .collect();

    FineRecord {
        order_number: text(1),
        plate_number,
        violation_type: text(4),
        violation_date: text(3),
        amount: text(5),
        outstanding_info: (!outstanding.is_empty()).then_some(outstanding),
        media_links,
        notified: false,
        notify_attempts: 0,
    }
}

fn parse_pay_all(page: &str) -> Option<PayAllForm> {
    let form = html::find_first(page, "form", |e| {
        e.attr("action").map(|a| a.trim() == "qrforpay.php").unwrap_or(false)
    })?;
    let input_value = |name: &str| {
        form.find_by("input", |e| e.attr("name").as_deref() == Some(name))
            .map(|input| input.attr("value").unwrap_or_default())
    };

    Some(PayAllForm {
        amount: input_value("summa")?,
        plate: input_value("plate")?,
    })
}

/// Direct image URL from a media viewer page
pub fn parse_viewer_image(page: &str, config: &RegistryConfig) -> Option<String> {
    let page = html::without_comments(page);
    let scope = html::find_first(&page, "body", |_| true)
        .map(|body| body.inner)
        .unwrap_or(&page);

    let src = html::find_first(scope, "img", |e| {
        e.attr("src").map(|s| !s.trim().is_empty()).unwrap_or(false)
    })?
    .attr("src")?;
    Some(config.resolve(&src))
}

/// Download URL for a link on the video host, if it is one
pub fn video_download_url(viewer_url: &str, config: &RegistryConfig) -> Option<String> {
    if !viewer_url.contains(&config.video_host) {
        return None;
    }
    let id = viewer_url.trim_end_matches('/').rsplit('/').next()?;
    if id.is_empty() {
        return None;
    }
    Some(config.video_download_url.replace("{id}", id))
}
