// src/extract/page_meta.rs
// Best-effort product metadata scraping. Each field is an isolated pure
// function `&str -> Option<String>` with its own validation; orchestration
// just composes them. Invalid matches are dropped, never surfaced as errors.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::PageMetadata;

pub fn extract_metadata(html: &str) -> PageMetadata {
    PageMetadata {
        price: extract_price(html),
        release_date: extract_release_date(html),
        sku: extract_sku(html),
        colorway: extract_colorway(html),
        brand: extract_brand(html),
    }
}

static PRICE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)(?:price|prix|msrp|retail)[:\s]*\$?(\d+(?:[.,]\d{2})?)\s*(?:usd|eur|€|\$)?")
            .unwrap(),
        Regex::new(r"\$(\d+(?:\.\d{2})?)").unwrap(),
        Regex::new(r"(?i)(\d+)\s*(?:€|EUR)").unwrap(),
    ]
});

pub fn extract_price(html: &str) -> Option<String> {
    for pattern in PRICE_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(html) {
            let raw = caps.get(1)?.as_str();
            let price = if raw.starts_with('$') {
                raw.to_string()
            } else {
                format!("${raw}")
            };
            // Must start with a currency symbol or digit.
            if price
                .trim_start_matches('$')
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit())
            {
                return Some(price);
            }
        }
    }
    None
}

static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(
            r"(?i)(?:release\s*date|drops?|available|launching)[:\s]*([A-Za-z]+\s+\d{1,2}(?:st|nd|rd|th)?,?\s*\d{4})",
        )
        .unwrap(),
        Regex::new(r"(?i)(?:release\s*date)[:\s]*(\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4})").unwrap(),
        Regex::new(
            r"(?i)\b((?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2}(?:st|nd|rd|th)?,?\s+\d{4})",
        )
        .unwrap(),
    ]
});

pub fn extract_release_date(html: &str) -> Option<String> {
    for pattern in DATE_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(html) {
            let date = caps.get(1).map(|m| m.as_str().trim().to_string())?;
            if date.len() > 3 && date.len() < 50 {
                return Some(date);
            }
        }
    }
    None
}

static SKU_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(
            r"(?i)(?:sku|style\s*code|style\s*#|product\s*code)[:\s]*([A-Za-z0-9]{2,}-?[A-Za-z0-9]{2,}-?[A-Za-z0-9]*)",
        )
        .unwrap(),
        Regex::new(r"(?i)(?:sku|style)[:\s]*([A-Za-z]{2}\d{4}-\d{3})").unwrap(),
    ]
});

pub fn extract_sku(html: &str) -> Option<String> {
    for pattern in SKU_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(html) {
            let sku = caps.get(1)?.as_str().to_ascii_uppercase();
            if (6..=20).contains(&sku.len()) {
                return Some(sku);
            }
        }
    }
    None
}

static COLORWAY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)colorway[:\s]*["']?([A-Za-z]+(?:[/\-\s][A-Za-z]+){0,4})["']?"#).unwrap()
});

const CSS_COLOR_LITERALS: &[&str] = &["inherit", "transparent", "initial", "unset", "currentcolor"];

pub fn extract_colorway(html: &str) -> Option<String> {
    let caps = COLORWAY_PATTERN.captures(html)?;
    let colorway = caps.get(1)?.as_str().trim().to_string();
    if colorway.len() <= 3 || colorway.len() >= 40 {
        return None;
    }
    let low = colorway.to_ascii_lowercase();
    // Pages leak CSS values next to the word "colorway"; reject those.
    if low.starts_with("rgb")
        || low.starts_with('#')
        || low.contains('(')
        || CSS_COLOR_LITERALS.contains(&low.as_str())
    {
        return None;
    }
    Some(colorway)
}

static BRAND_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(Nike|Adidas|Jordan|New Balance|Puma|Reebok|Converse|Vans|Asics|Yeezy)\b")
        .unwrap()
});

pub fn extract_brand(html: &str) -> Option<String> {
    BRAND_PATTERN
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_requires_currency_or_digit_anchor() {
        assert_eq!(extract_price("Retail: $190 USD").as_deref(), Some("$190"));
        assert_eq!(extract_price("price: 120.00").as_deref(), Some("$120.00"));
        assert_eq!(extract_price("no numbers here"), None);
    }

    #[test]
    fn sku_length_is_bounded() {
        assert_eq!(
            extract_sku("Style Code: DZ5485-612").as_deref(),
            Some("DZ5485-612")
        );
        assert_eq!(extract_sku("SKU: AB-CD"), None); // too short
    }

    #[test]
    fn colorway_rejects_css_literals() {
        assert_eq!(
            extract_colorway("Colorway: Lucky Green/White").as_deref(),
            Some("Lucky Green/White")
        );
        assert_eq!(extract_colorway("colorway: inherit"), None);
        assert_eq!(extract_colorway("colorway: rgb"), None);
    }

    #[test]
    fn release_date_accepts_long_form() {
        assert_eq!(
            extract_release_date("Release Date: December 14th, 2024").as_deref(),
            Some("December 14th, 2024")
        );
    }

    #[test]
    fn brand_matches_known_names_only() {
        assert_eq!(
            extract_brand("the new Jordan drop").as_deref(),
            Some("Jordan")
        );
        assert_eq!(extract_brand("some unknown maker"), None);
    }

    #[test]
    fn invalid_fields_drop_silently() {
        let meta = extract_metadata("nothing of interest");
        assert!(meta.is_empty());
    }
}
