//! Menu CSV parser
//!
//! Columns are matched by trimmed, lower-cased header. A short or
//! malformed row still yields an item with empty fields; one bad row
//! never takes the whole menu down.

use chrono::{DateTime, Utc};
use shared::models::{LocalizedTitle, MenuItem, MenuSnapshot};

use super::feed::FeedError;

const COL_CATEGORY: &str = "категория";
const COL_TITLE_EN: &str = "английский";
const COL_TITLE_RU: &str = "русский";
const COL_TITLE_SR: &str = "сербский";
const COL_VOLUME: &str = "объем";
const COL_PRICE: &str = "стоимость (rsd)";
const COL_INGREDIENTS: &str = "состав";

/// Stable id for an item: `item-<hex>` of a 31-multiplier rolling hash
/// over the UTF-16 units of `category|title_en|volume`
pub fn item_id(category: &str, title_en: &str, volume: &str) -> String {
    let key = format!("{category}|{title_en}|{volume}");
    let hash = key
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)));
    format!("item-{:x}", hash.unsigned_abs())
}

/// Leading digits as a price; anything else is 0
pub fn parse_price(raw: &str) -> i64 {
    let digits: String = raw.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

struct Columns {
    category: Option<usize>,
    title_en: Option<usize>,
    title_ru: Option<usize>,
    title_sr: Option<usize>,
    volume: Option<usize>,
    price: Option<usize>,
    ingredients: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let find = |name: &str| headers.iter().position(|h| h.trim().to_lowercase() == name);
        Self {
            category: find(COL_CATEGORY),
            title_en: find(COL_TITLE_EN),
            title_ru: find(COL_TITLE_RU),
            title_sr: find(COL_TITLE_SR),
            volume: find(COL_VOLUME),
            price: find(COL_PRICE),
            ingredients: find(COL_INGREDIENTS),
        }
    }
}

fn cell(record: &csv::StringRecord, index: Option<usize>) -> String {
    index
        .and_then(|i| record.get(i))
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

/// Parse the CSV export into a snapshot stamped `updated_at`
pub fn parse_menu(csv_text: &str, updated_at: DateTime<Utc>) -> Result<MenuSnapshot, FeedError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_text.as_bytes());

    let headers = match reader.headers() {
        Ok(h) if !h.is_empty() => h.clone(),
        _ => return Err(FeedError::Empty),
    };
    let columns = Columns::from_headers(&headers);

    let mut items = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(row = line + 2, error = %e, "Skipping unreadable menu row");
                continue;
            }
        };
        if record.iter().all(|v| v.is_empty()) {
            continue;
        }

        let category = cell(&record, columns.category);
        let title_en = cell(&record, columns.title_en);
        let volume = cell(&record, columns.volume);
        items.push(MenuItem {
            id: item_id(&category, &title_en, &volume),
            title: LocalizedTitle {
                en: title_en,
                ru: cell(&record, columns.title_ru),
                sr: cell(&record, columns.title_sr),
            },
            price: parse_price(&cell(&record, columns.price)),
            ingredients: cell(&record, columns.ingredients),
            category,
            volume,
        });
    }

    Ok(MenuSnapshot::new(updated_at, items))
}
