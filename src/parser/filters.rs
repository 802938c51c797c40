//! Stream filter chain decoding.
//!
//! Filters are applied in declared order. An unsupported filter stops the
//! chain: the bytes decoded so far are returned together with a warning,
//! so a single exotic stream never fails the whole document.

use std::collections::HashMap;
use std::io::Read;

use super::object::Object;

/// Filters whose output is itself a self-contained encoded image. They are
/// never decoded here; the image materializer passes them through.
pub fn is_image_passthrough_filter(name: &str) -> bool {
    matches!(name, "DCTDecode" | "DCT" | "JPXDecode")
}

/// Collect the filter names declared on a stream dictionary, in order.
pub fn filter_chain(dict: &HashMap<String, Object>) -> Vec<String> {
    let Some(filter) = dict.get("Filter").or_else(|| dict.get("F")) else {
        return Vec::new();
    };
    match filter {
        Object::Name(name) => vec![name.clone()],
        Object::Array(items) => items
            .iter()
            .filter_map(|o| o.as_name().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Decode parameter dictionaries aligned with the filter chain.
fn decode_parms(dict: &HashMap<String, Object>, count: usize) -> Vec<Option<HashMap<String, Object>>> {
    let parms = dict.get("DecodeParms").or_else(|| dict.get("DP"));
    let mut out = vec![None; count];
    match parms {
        Some(Object::Dictionary(d)) => {
            if count > 0 {
                out[0] = Some(d.clone());
            }
        }
        Some(Object::Array(items)) => {
            for (i, item) in items.iter().take(count).enumerate() {
                if let Object::Dictionary(d) = item {
                    out[i] = Some(d.clone());
                }
            }
        }
        _ => {}
    }
    out
}

/// Apply the declared filter chain to a stream payload.
///
/// Returns the decoded bytes plus any warnings produced along the way.
pub fn decode_stream(dict: &HashMap<String, Object>, data: &[u8]) -> (Vec<u8>, Vec<String>) {
    let chain = filter_chain(dict);
    let parms = decode_parms(dict, chain.len());
    let mut bytes = data.to_vec();
    let mut warnings = Vec::new();

    for (name, parm) in chain.iter().zip(parms) {
        if is_image_passthrough_filter(name) {
            break;
        }
        match name.as_str() {
            "FlateDecode" | "Fl" => {
                match flate_decode(&bytes) {
                    Some(decoded) => bytes = decoded,
                    None => {
                        warnings.push("FlateDecode failed, using raw stream bytes".to_string());
                        break;
                    }
                }
                if let Some(parm) = &parm {
                    bytes = apply_predictor(bytes, parm);
                }
            }
            "ASCIIHexDecode" | "AHx" => bytes = ascii_hex_decode(&bytes),
            "ASCII85Decode" | "A85" => bytes = ascii85_decode(&bytes),
            other => {
                warnings.push(format!("unsupported stream filter {}, kept raw bytes", other));
                break;
            }
        }
    }

    (bytes, warnings)
}

/// Inflate a zlib stream; tolerates both zlib-wrapped and raw deflate data.
fn flate_decode(data: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    let mut decoder = flate2::read::ZlibDecoder::new(data);
    if decoder.read_to_end(&mut out).is_ok() && !out.is_empty() {
        return Some(out);
    }

    let mut out = Vec::new();
    let mut decoder = flate2::read::DeflateDecoder::new(data);
    match decoder.read_to_end(&mut out) {
        Ok(n) if n > 0 => Some(out),
        _ => None,
    }
}

fn ascii_hex_decode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut high: Option<u8> = None;
    for &byte in data {
        if byte == b'>' {
            break;
        }
        let nibble = match byte {
            b'0'..=b'9' => byte - b'0',
            b'a'..=b'f' => byte - b'a' + 10,
            b'A'..=b'F' => byte - b'A' + 10,
            _ => continue,
        };
        match high.take() {
            Some(h) => out.push((h << 4) | nibble),
            None => high = Some(nibble),
        }
    }
    if let Some(h) = high {
        out.push(h << 4);
    }
    out
}

fn ascii85_decode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut group = [0u8; 5];
    let mut len = 0usize;

    let mut data = data;
    if data.starts_with(b"<~") {
        data = &data[2..];
    }

    let mut i = 0;
    while i < data.len() {
        let byte = data[i];
        i += 1;
        match byte {
            b'~' => break,
            b'z' if len == 0 => out.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group[len] = byte - b'!';
                len += 1;
                if len == 5 {
                    let value = group.iter().fold(0u32, |acc, &d| {
                        acc.wrapping_mul(85).wrapping_add(d as u32)
                    });
                    out.extend_from_slice(&value.to_be_bytes());
                    len = 0;
                }
            }
            _ => {}
        }
    }

    // Partial final group: pad with 'u' digits, then drop the padding bytes.
    if len > 1 {
        let produced = len - 1;
        for slot in group.iter_mut().skip(len) {
            *slot = 84;
        }
        let value = group.iter().fold(0u32, |acc, &d| {
            acc.wrapping_mul(85).wrapping_add(d as u32)
        });
        out.extend_from_slice(&value.to_be_bytes()[..produced]);
    }

    out
}

/// Undo PNG-style row prediction declared via `Predictor`/`Columns`/`Colors`.
///
/// Cross-reference streams almost always use the Up predictor; content
/// streams rarely use prediction at all.
fn apply_predictor(data: Vec<u8>, parm: &HashMap<String, Object>) -> Vec<u8> {
    let predictor = parm.get("Predictor").and_then(|v| v.as_i64()).unwrap_or(1);
    if predictor < 10 {
        return data;
    }

    let colors = parm.get("Colors").and_then(|v| v.as_i64()).unwrap_or(1).max(1) as usize;
    let bits = parm
        .get("BitsPerComponent")
        .and_then(|v| v.as_i64())
        .unwrap_or(8)
        .max(1) as usize;
    let columns = parm.get("Columns").and_then(|v| v.as_i64()).unwrap_or(1).max(1) as usize;

    let bytes_per_pixel = ((colors * bits) + 7) / 8;
    let row_len = (columns * colors * bits + 7) / 8;
    let stride = row_len + 1; // one predictor tag byte per row

    if row_len == 0 || data.len() < stride {
        return data;
    }

    let mut out = Vec::with_capacity(data.len());
    let mut prev_row = vec![0u8; row_len];

    for chunk in data.chunks(stride) {
        if chunk.len() < 2 {
            break;
        }
        let tag = chunk[0];
        let mut row = chunk[1..].to_vec();
        row.resize(row_len, 0);

        for i in 0..row_len {
            let left = if i >= bytes_per_pixel {
                row[i - bytes_per_pixel]
            } else {
                0
            };
            let up = prev_row[i];
            let up_left = if i >= bytes_per_pixel {
                prev_row[i - bytes_per_pixel]
            } else {
                0
            };
            row[i] = match tag {
                0 => row[i],
                1 => row[i].wrapping_add(left),
                2 => row[i].wrapping_add(up),
                3 => row[i].wrapping_add(((left as u16 + up as u16) / 2) as u8),
                4 => row[i].wrapping_add(paeth(left, up, up_left)),
                _ => row[i],
            };
        }

        out.extend_from_slice(&row);
        prev_row = row;
    }

    out
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}
