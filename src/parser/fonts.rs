//! Font and encoding resolution.
//!
//! For every font referenced by a page's resource dictionary this resolves
//! the base name, style hints, the byte→Unicode mapping (embedded ToUnicode
//! map or a standard encoding), and whether the font program is embedded.
//! Text decoding consults the custom map first and falls back to treating
//! the raw code as a Unicode scalar.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use super::object::Object;
use super::store::ObjectStore;

/// Resolved information about one font resource.
#[derive(Debug, Clone, Default)]
pub struct FontInfo {
    /// Resource name the content stream selects the font by (e.g. "F1").
    pub name: String,
    /// Base font name (e.g. "Helvetica-Bold"), subset prefix stripped.
    pub base_name: String,
    /// Style flags derived from the base name.
    pub bold: bool,
    pub italic: bool,
    /// Declared encoding name, when the encoding is a plain name.
    pub encoding: Option<String>,
    /// Byte/code → Unicode table from an embedded ToUnicode map.
    pub to_unicode: Option<HashMap<u32, String>>,
    /// Whether a font program is embedded (absence implies a substitute).
    pub embedded: bool,
    /// Composite (Type0/CID) fonts consume two-byte codes.
    pub composite: bool,
}

impl FontInfo {
    /// Decode a string's raw bytes into text using this font's mapping.
    pub fn decode_bytes(&self, bytes: &[u8]) -> String {
        let mut out = String::new();
        if self.composite {
            for chunk in bytes.chunks(2) {
                let code = match chunk {
                    [hi, lo] => ((*hi as u32) << 8) | *lo as u32,
                    [single] => *single as u32,
                    _ => continue,
                };
                self.push_code(code, &mut out);
            }
        } else {
            for &byte in bytes {
                self.push_code(byte as u32, &mut out);
            }
        }
        out
    }

    fn push_code(&self, code: u32, out: &mut String) {
        if let Some(map) = &self.to_unicode {
            if let Some(text) = map.get(&code) {
                out.push_str(text);
                return;
            }
        }
        // Fall back to the raw code as a Unicode scalar; for one-byte
        // simple fonts this is Latin-1.
        if let Some(ch) = char::from_u32(code) {
            out.push(ch);
        }
    }
}

/// Decode string bytes with an optional font, falling back to a generic
/// interpretation when no font is active.
pub fn decode_string(font: Option<&FontInfo>, bytes: &[u8]) -> String {
    match font {
        Some(font) => font.decode_bytes(bytes),
        None => decode_text_simple(bytes),
    }
}

/// Generic decoding when no font mapping is available: UTF-16BE with BOM,
/// then UTF-8, then Latin-1.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Resolve every font declared in a page's resource dictionary.
pub fn resolve_fonts(
    store: &ObjectStore,
    resources: &HashMap<String, Object>,
) -> HashMap<String, FontInfo> {
    let mut fonts = HashMap::new();
    let Some(font_dict) = store.dict_get(resources, "Font").and_then(|v| v.as_dict()) else {
        return fonts;
    };

    for (name, value) in font_dict {
        let Some(dict) = store.resolve(value).as_dict() else {
            continue;
        };
        fonts.insert(name.clone(), resolve_font(store, name, dict));
    }
    fonts
}

fn resolve_font(store: &ObjectStore, name: &str, dict: &HashMap<String, Object>) -> FontInfo {
    let subtype = store
        .dict_get(dict, "Subtype")
        .and_then(|v| v.as_name())
        .unwrap_or("");
    let composite = subtype == "Type0";

    // Composite fonts describe the real font in their descendant entry.
    let descriptor_dict: HashMap<String, Object>;
    let effective: &HashMap<String, Object> = if composite {
        match store
            .dict_get(dict, "DescendantFonts")
            .and_then(|v| v.as_array())
            .and_then(|arr| arr.first())
            .map(|first| store.resolve(first))
            .and_then(|o| o.as_dict())
        {
            Some(descendant) => {
                descriptor_dict = descendant.clone();
                &descriptor_dict
            }
            None => dict,
        }
    } else {
        dict
    };

    let base_name = store
        .dict_get(effective, "BaseFont")
        .or_else(|| store.dict_get(dict, "BaseFont"))
        .and_then(|v| v.as_name())
        .map(strip_subset_prefix)
        .unwrap_or_else(|| "Unknown".to_string());

    let lower = base_name.to_lowercase();
    let bold = lower.contains("bold") || lower.contains("black") || lower.contains("heavy");
    let italic = lower.contains("italic") || lower.contains("oblique");

    let encoding = store
        .dict_get(dict, "Encoding")
        .and_then(|v| v.as_name())
        .map(str::to_string);

    let embedded = store
        .dict_get(effective, "FontDescriptor")
        .and_then(|v| v.as_dict())
        .map(|descriptor| {
            ["FontFile", "FontFile2", "FontFile3"]
                .iter()
                .any(|key| descriptor.contains_key(*key))
        })
        .unwrap_or(false);

    let to_unicode = dict
        .get("ToUnicode")
        .and_then(|v| v.as_reference())
        .and_then(|id| store.stream_content(id))
        .map(parse_to_unicode);

    FontInfo {
        name: name.to_string(),
        base_name,
        bold,
        italic,
        encoding,
        to_unicode,
        embedded,
        composite,
    }
}

/// Subset-tagged names look like "ABCDEF+Helvetica".
fn strip_subset_prefix(name: &str) -> String {
    match name.split_once('+') {
        Some((prefix, rest)) if prefix.len() == 6 && prefix.chars().all(|c| c.is_ascii_uppercase()) => {
            rest.to_string()
        }
        _ => name.to_string(),
    }
}

/// Parse a ToUnicode character map stream into a sparse code→text table.
///
/// Handles `bfchar` single mappings and both `bfrange` forms (sequential
/// target and explicit target array).
pub fn parse_to_unicode(data: &[u8]) -> HashMap<u32, String> {
    static HEX_PAIR: OnceLock<Regex> = OnceLock::new();
    static RANGE_ARRAY: OnceLock<Regex> = OnceLock::new();
    static RANGE_SEQ: OnceLock<Regex> = OnceLock::new();
    static HEX_ITEM: OnceLock<Regex> = OnceLock::new();

    let content = String::from_utf8_lossy(data);
    let mut map = HashMap::new();

    let hex_pair =
        HEX_PAIR.get_or_init(|| Regex::new(r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]+)>").unwrap());
    for section in sections_between(&content, "beginbfchar", "endbfchar") {
        for caps in hex_pair.captures_iter(section) {
            let Ok(src) = u32::from_str_radix(&caps[1], 16) else {
                continue;
            };
            if let Some(text) = hex_to_text(&caps[2]) {
                map.insert(src, text);
            }
        }
    }

    let range_array = RANGE_ARRAY.get_or_init(|| {
        Regex::new(r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]+)>\s*\[((?:\s*<[0-9A-Fa-f]+>)+)\s*\]")
            .unwrap()
    });
    let range_seq = RANGE_SEQ.get_or_init(|| {
        Regex::new(r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]+)>").unwrap()
    });
    let hex_item = HEX_ITEM.get_or_init(|| Regex::new(r"<([0-9A-Fa-f]+)>").unwrap());

    for section in sections_between(&content, "beginbfrange", "endbfrange") {
        for line in section.lines() {
            if let Some(caps) = range_array.captures(line) {
                let (Ok(start), Ok(end)) = (
                    u32::from_str_radix(&caps[1], 16),
                    u32::from_str_radix(&caps[2], 16),
                ) else {
                    continue;
                };
                let targets: Vec<String> = hex_item
                    .captures_iter(&caps[3])
                    .filter_map(|c| hex_to_text(&c[1]))
                    .collect();
                for (i, text) in targets.into_iter().enumerate() {
                    let src = start + i as u32;
                    if src > end {
                        break;
                    }
                    map.insert(src, text);
                }
            } else if let Some(caps) = range_seq.captures(line) {
                let (Ok(start), Ok(end), Ok(base)) = (
                    u32::from_str_radix(&caps[1], 16),
                    u32::from_str_radix(&caps[2], 16),
                    u32::from_str_radix(&caps[3], 16),
                ) else {
                    continue;
                };
                if end.saturating_sub(start) > 0xFFFF {
                    continue;
                }
                for offset in 0..=(end - start) {
                    if let Some(ch) = char::from_u32(base + offset) {
                        map.insert(start + offset, ch.to_string());
                    }
                }
            }
        }
    }

    map
}

fn sections_between<'a>(content: &'a str, begin: &str, end: &str) -> Vec<&'a str> {
    let mut sections = Vec::new();
    let mut rest = content;
    while let Some(begin_at) = rest.find(begin) {
        let after = &rest[begin_at + begin.len()..];
        match after.find(end) {
            Some(end_at) => {
                sections.push(&after[..end_at]);
                rest = &after[end_at + end.len()..];
            }
            None => break,
        }
    }
    sections
}

/// Convert a destination hex group into text. Groups longer than four
/// digits carry several UTF-16 code units (surrogate pairs, ligatures).
fn hex_to_text(hex: &str) -> Option<String> {
    if hex.len() <= 4 {
        let code = u32::from_str_radix(hex, 16).ok()?;
        return char::from_u32(code).map(|c| c.to_string());
    }
    let mut units = Vec::new();
    for i in (0..hex.len()).step_by(4) {
        let end = (i + 4).min(hex.len());
        units.push(u16::from_str_radix(&hex[i..end], 16).ok()?);
    }
    let text = String::from_utf16_lossy(&units);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
