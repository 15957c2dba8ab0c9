//! Minimal RSS/Atom first-item extraction.
//!
//! Only the first `<item>` (RSS) or `<entry>` (Atom) is read, and only its
//! title, link and body text. The body is the first of `description`,
//! `summary`, `content` and `content:encoded` that the item carries.

use regex::{Captures, Regex};

lazy_static::lazy_static! {
  static ref ITEM: Regex = Regex::new(r"(?is)<(item|entry)(?:\s[^>]*)?>(.*?)</(?:item|entry)>").unwrap();
  static ref TITLE: Regex = Regex::new(r"(?is)<title(?:\s[^>]*)?>(.*?)</title>").unwrap();
  static ref BODIES: [Regex; 4] = [
    Regex::new(r"(?is)<description(?:\s[^>]*)?>(.*?)</description>").unwrap(),
    Regex::new(r"(?is)<summary(?:\s[^>]*)?>(.*?)</summary>").unwrap(),
    Regex::new(r"(?is)<content(?:\s[^>]*)?>(.*?)</content>").unwrap(),
    Regex::new(r"(?is)<content:encoded(?:\s[^>]*)?>(.*?)</content:encoded>").unwrap(),
  ];
  static ref LINK_TEXT: Regex = Regex::new(r"(?is)<link(?:\s[^>]*)?>(.*?)</link>").unwrap();
  static ref LINK_HREF: Regex = Regex::new(r#"(?is)<link\s[^>]*\bhref\s*=\s*["']([^"']+)["']"#).unwrap();
  static ref CDATA: Regex = Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").unwrap();
  static ref ENTITY: Regex =
    Regex::new(r"&(?:#([0-9]{1,7})|#[xX]([0-9a-fA-F]{1,6})|(lt|gt|quot|apos|amp|nbsp));").unwrap();
  static ref TAG: Regex = Regex::new(r"(?s)<[^>]+>").unwrap();
  static ref SPACE: Regex = Regex::new(r"\s+").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
  pub title: String,
  pub link: Option<String>,
  pub description: String,
}

impl FeedItem {
  /// Title and description joined into one line of prose.
  pub fn summary(&self) -> String {
    match (self.title.is_empty(), self.description.is_empty()) {
      (false, false) => format!("{}. {}", self.title.trim_end_matches('.'), self.description),
      (false, true) => self.title.clone(),
      (true, _) => self.description.clone(),
    }
  }
}

/// The first item of a feed document, if any.
pub fn first_item(document: &str) -> Option<FeedItem> {
  let body = ITEM.captures(document)?.get(2)?.as_str();

  let title = capture_text(&TITLE, body).unwrap_or_default();
  let description = BODIES
    .iter()
    .filter_map(|re| capture_text(re, body))
    .find(|text| !text.is_empty())
    .unwrap_or_default();
  let link = capture_text(&LINK_TEXT, body)
    .filter(|l| !l.is_empty())
    .or_else(|| {
      LINK_HREF
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| decode_entities(m.as_str()))
    });

  if title.is_empty() && description.is_empty() {
    return None;
  }

  Some(FeedItem {
    title,
    link,
    description,
  })
}

fn capture_text(re: &Regex, body: &str) -> Option<String> {
  let raw = re.captures(body)?.get(1)?.as_str();
  Some(clean(raw))
}

/// Unwrap CDATA, decode entities, drop markup and collapse whitespace.
fn clean(raw: &str) -> String {
  let unwrapped = CDATA.replace_all(raw, "$1");
  let decoded = decode_entities(&unwrapped);
  let text = TAG.replace_all(&decoded, " ");
  SPACE.replace_all(text.trim(), " ").into_owned()
}

/// Decode the XML named entities, `&nbsp;`, and numeric references in one
/// pass so `&amp;#8217;` stays literal.
fn decode_entities(s: &str) -> String {
  ENTITY
    .replace_all(s, |caps: &Captures| {
      let decoded = if let Some(dec) = caps.get(1) {
        dec.as_str().parse().ok().and_then(char::from_u32)
      } else if let Some(hex) = caps.get(2) {
        u32::from_str_radix(hex.as_str(), 16).ok().and_then(char::from_u32)
      } else {
        match caps.get(3).map(|m| m.as_str()) {
          Some("lt") => Some('<'),
          Some("gt") => Some('>'),
          Some("quot") => Some('"'),
          Some("apos") => Some('\''),
          Some("amp") => Some('&'),
          Some("nbsp") => Some(' '),
          _ => None,
        }
      };
      match decoded {
        Some(c) => c.to_string(),
        None => caps[0].to_string(),
      }
    })
    .into_owned()
}
