use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;

/// `<description> <amount>`, amount optionally prefixed by `R$` and with
/// `.` or `,` two-digit decimals.
static ITEM_LINE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s+(?:R\$\s*)?(\d+(?:[.,]\d{2})?)$").ok());

static CNPJ: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\d{2}\.?\d{3}\.?\d{3}/?\d{4}-?\d{2})").ok());

/// Lines scanned for the market header.
const HEADER_LINES: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ReceiptItem {
    pub(crate) name: String,
    pub(crate) price: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct MarketInfo {
    pub(crate) market_name: Option<String>,
    /// Digits only.
    pub(crate) cnpj: Option<String>,
}

/// Parse every non-blank line of `text` as an item.
///
/// All or nothing: returns `None` as soon as one line does not parse, and
/// also when there is nothing to parse.
pub(crate) fn extract_items(text: &str) -> Option<Vec<ReceiptItem>> {
    let items = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(parse_line)
        .collect::<Option<Vec<_>>>()?;

    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

fn parse_line(line: &str) -> Option<ReceiptItem> {
    let caps = ITEM_LINE.as_ref()?.captures(line)?;
    let name = caps.get(1)?.as_str().trim();
    let price = parse_amount(caps.get(2)?.as_str())?;

    if name.chars().count() <= 1 || price <= Decimal::ZERO {
        return None;
    }
    Some(ReceiptItem {
        name: name.to_string(),
        price,
    })
}

fn parse_amount(s: &str) -> Option<Decimal> {
    Decimal::from_str(&s.replace(',', ".")).ok()
}

/// Look for the market name and CNPJ in the receipt header.
///
/// The name is the first line longer than three characters that carries no
/// CNPJ. Returns `None` when neither is found.
pub(crate) fn extract_market_info(text: &str) -> Option<MarketInfo> {
    let mut info = MarketInfo::default();

    for line in text.lines().take(HEADER_LINES).map(str::trim) {
        let cnpj = CNPJ
            .as_ref()
            .and_then(|re| re.captures(line))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().chars().filter(char::is_ascii_digit).collect::<String>());

        match cnpj {
            Some(digits) => {
                if info.cnpj.is_none() {
                    info.cnpj = Some(digits);
                }
            }
            None => {
                if info.market_name.is_none() && line.chars().count() > 3 {
                    info.market_name = Some(line.to_string());
                }
            }
        }
    }

    if info.market_name.is_none() && info.cnpj.is_none() {
        None
    } else {
        Some(info)
    }
}

#[cfg(test)]
#[path = "extract_tests.rs"]
mod tests;
