//! Flattening of one exported product into a fixed 12-column CSV row.
use harvest_core::record::is_truthy;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::html::strip_html;

pub const CSV_HEADERS: [&str; 12] = [
    "product_uid",
    "image_url",
    "urls",
    "page_title",
    "title",
    "description_html",
    "description",
    "specifications_html",
    "specifications",
    "img_alt",
    "meta_title",
    "meta_description",
];

const JOIN_SEPARATOR: &str = " | ";

// Element codes inside a language block.
const PAGE_TITLE: &str = "1";
const TITLE: &str = "2";
const DESCRIPTION: &str = "3";
const SPECIFICATIONS: &str = "4";
const IMG_ALT: &str = "10";
const META_TITLE: &str = "100";
const META_DESCRIPTION: &str = "101";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("product is not a JSON object")]
    NotAnObject,
    #[error("field {field} has an unexpected shape")]
    InvalidField { field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductRow {
    pub product_uid: String,
    pub image_url: String,
    pub urls: String,
    pub page_title: String,
    pub title: String,
    pub description_html: String,
    pub description: String,
    pub specifications_html: String,
    pub specifications: String,
    pub img_alt: String,
    pub meta_title: String,
    pub meta_description: String,
}

impl ProductRow {
    /// Fields in `CSV_HEADERS` order.
    pub fn fields(&self) -> [&str; 12] {
        [
            self.product_uid.as_str(),
            self.image_url.as_str(),
            self.urls.as_str(),
            self.page_title.as_str(),
            self.title.as_str(),
            self.description_html.as_str(),
            self.description.as_str(),
            self.specifications_html.as_str(),
            self.specifications.as_str(),
            self.img_alt.as_str(),
            self.meta_title.as_str(),
            self.meta_description.as_str(),
        ]
    }
}

pub fn extract_row(product: &Value, language: &str) -> Result<ProductRow, RowError> {
    let product = product.as_object().ok_or(RowError::NotAnObject)?;
    let empty = Map::new();
    let block = product
        .get("contents")
        .and_then(Value::as_object)
        .and_then(|contents| contents.get(language))
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let variations = |code: &str| element_variations(block, code);
    let descriptions = variations(DESCRIPTION);
    let specifications = variations(SPECIFICATIONS);

    Ok(ProductRow {
        product_uid: product_uid(block, product),
        image_url: image_urls(block).join(JOIN_SEPARATOR),
        urls: urls(product)?,
        page_title: join(&variations(PAGE_TITLE), false),
        title: join(&variations(TITLE), false),
        description_html: join(&descriptions, false),
        description: join(&descriptions, true),
        specifications_html: join(&specifications, false),
        specifications: join(&specifications, true),
        img_alt: join(&variations(IMG_ALT), false),
        meta_title: join(&variations(META_TITLE), false),
        meta_description: join(&variations(META_DESCRIPTION), false),
    })
}

fn product_uid(block: &Map<String, Value>, product: &Map<String, Value>) -> String {
    [block.get("product_uid"), product.get("uid")]
        .into_iter()
        .flatten()
        .find(|value| is_truthy(value))
        .map(value_text)
        .unwrap_or_default()
}

fn image_urls(block: &Map<String, Value>) -> Vec<String> {
    let images = block
        .get("product_details")
        .and_then(Value::as_object)
        .and_then(|details| details.get("image_url"));
    match images {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(url)) if !url.trim().is_empty() => vec![url.trim().to_string()],
        _ => Vec::new(),
    }
}

fn urls(product: &Map<String, Value>) -> Result<String, RowError> {
    match product.get("urls") {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .ok_or(RowError::InvalidField { field: "urls" })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|urls| urls.join(JOIN_SEPARATOR)),
        Some(_) => Err(RowError::InvalidField { field: "urls" }),
    }
}

/// Non-empty variation values of the first element whose uid matches `code`.
fn element_variations(block: &Map<String, Value>, code: &str) -> Vec<String> {
    let Some(elements) = block.get("elements").and_then(Value::as_array) else {
        return Vec::new();
    };
    elements
        .iter()
        .filter_map(Value::as_object)
        .find(|element| element.get("uid").map(value_text).as_deref() == Some(code))
        .and_then(|element| element.get("variations"))
        .and_then(Value::as_array)
        .map(|variations| {
            variations
                .iter()
                .filter_map(|variation| variation.get("value"))
                .filter(|value| is_truthy(value))
                .map(value_text)
                .collect()
        })
        .unwrap_or_default()
}

fn join(values: &[String], strip: bool) -> String {
    values
        .iter()
        .map(|value| if strip { strip_html(value) } else { value.clone() })
        .collect::<Vec<_>>()
        .join(JOIN_SEPARATOR)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
