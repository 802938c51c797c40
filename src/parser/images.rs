//! Image XObject materialization.
//!
//! Payloads that are already self-contained encoded images (JPEG, JPEG
//! 2000) pass through byte-identical. Anything else is treated as raw
//! per-pixel samples and re-encoded losslessly as PNG using the declared
//! width, height, color space and bit depth. A broken image never fails
//! the page: the caller records the returned message as a warning and
//! skips the image.

use image::{codecs::png::PngEncoder, ColorType, ImageEncoder};

use crate::model::Resource;

use super::filters;
use super::object::{Object, ObjectId};
use super::store::ObjectStore;

/// Declared sample layout of an image XObject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SampleFormat {
    Gray,
    Rgb,
    Indexed,
}

/// Materialize the image XObject behind `id` into a portable resource.
pub fn materialize_image(store: &ObjectStore, id: ObjectId) -> Result<Resource, String> {
    let Some(Object::Stream { dict, data }) = store.get(id) else {
        return Err(format!("image object {} {} is not a stream", id.0, id.1));
    };

    let subtype = store.dict_get(dict, "Subtype").and_then(|v| v.as_name());
    if subtype != Some("Image") {
        return Err(format!("object {} {} is not an image XObject", id.0, id.1));
    }

    let width = store
        .dict_get(dict, "Width")
        .and_then(|v| v.as_i64())
        .and_then(|v| u32::try_from(v).ok())
        .ok_or("image is missing a usable Width")?;
    let height = store
        .dict_get(dict, "Height")
        .and_then(|v| v.as_i64())
        .and_then(|v| u32::try_from(v).ok())
        .ok_or("image is missing a usable Height")?;
    if width == 0 || height == 0 {
        return Err("image has a zero dimension".to_string());
    }

    let chain = filters::filter_chain(dict);
    if let Some(passthrough) = chain.iter().rev().find_map(|name| match name.as_str() {
        "DCTDecode" | "DCT" => Some("image/jpeg"),
        "JPXDecode" => Some("image/jp2"),
        _ => None,
    }) {
        // Already an encoded raster; hand the payload through unchanged.
        let resource = Resource::image(data.clone(), passthrough)
            .with_dimensions(width, height)
            .with_bits_per_component(8);
        return Ok(resource);
    }

    let samples = store
        .stream_content(id)
        .ok_or("image stream could not be decoded")?;

    let bits = store
        .dict_get(dict, "BitsPerComponent")
        .and_then(|v| v.as_i64())
        .unwrap_or(8) as u32;

    let (format, palette) = resolve_color_space(store, dict.get("ColorSpace"));

    encode_png(samples, width, height, bits, format, palette.as_deref())
        .map(|(data, color_space)| {
            Resource::png(data)
                .with_dimensions(width, height)
                .with_bits_per_component(8)
                .with_color_space(color_space)
        })
}

/// Work out the sample layout, defaulting to RGB at 8 bits when the color
/// space is ambiguous or exotic.
fn resolve_color_space(
    store: &ObjectStore,
    color_space: Option<&Object>,
) -> (SampleFormat, Option<Vec<u8>>) {
    let Some(color_space) = color_space.map(|cs| store.resolve(cs)) else {
        return (SampleFormat::Rgb, None);
    };

    match color_space {
        Object::Name(name) => match name.as_str() {
            "DeviceGray" | "CalGray" | "G" => (SampleFormat::Gray, None),
            _ => (SampleFormat::Rgb, None),
        },
        Object::Array(items) => {
            let family = items.first().and_then(|v| v.as_name()).unwrap_or("");
            match family {
                "Indexed" | "I" => {
                    let palette = items.get(3).and_then(|lookup| lookup_bytes(store, lookup));
                    (SampleFormat::Indexed, palette)
                }
                "ICCBased" => {
                    let components = items
                        .get(1)
                        .and_then(|v| v.as_reference())
                        .and_then(|id| store.get(id))
                        .and_then(|o| o.as_dict())
                        .and_then(|d| d.get("N"))
                        .and_then(|v| v.as_i64())
                        .unwrap_or(3);
                    if components == 1 {
                        (SampleFormat::Gray, None)
                    } else {
                        (SampleFormat::Rgb, None)
                    }
                }
                "CalGray" => (SampleFormat::Gray, None),
                _ => (SampleFormat::Rgb, None),
            }
        }
        _ => (SampleFormat::Rgb, None),
    }
}

/// The Indexed lookup table is either an inline string or a stream.
fn lookup_bytes(store: &ObjectStore, lookup: &Object) -> Option<Vec<u8>> {
    match lookup {
        Object::String(bytes) => Some(bytes.clone()),
        Object::Reference(id) => match store.get(*id)? {
            Object::String(bytes) => Some(bytes.clone()),
            Object::Stream { .. } => store.stream_content(*id).map(|b| b.to_vec()),
            _ => None,
        },
        _ => None,
    }
}

fn encode_png(
    samples: &[u8],
    width: u32,
    height: u32,
    bits: u32,
    format: SampleFormat,
    palette: Option<&[u8]>,
) -> Result<(Vec<u8>, &'static str), String> {
    let pixels = (width as usize) * (height as usize);

    let (rgb_or_gray, color_type, color_space): (Vec<u8>, ColorType, &'static str) = match format {
        SampleFormat::Gray => {
            let expanded = expand_to_bytes(samples, width, height, bits)
                .ok_or_else(|| format!("gray samples too short for {}x{}", width, height))?;
            (expanded, ColorType::L8, "Gray")
        }
        SampleFormat::Indexed => {
            let palette = palette.ok_or("indexed image without a palette")?;
            let indices = expand_to_bytes(samples, width, height, bits)
                .ok_or_else(|| format!("index samples too short for {}x{}", width, height))?;
            let mut rgb = Vec::with_capacity(pixels * 3);
            for &index in &indices {
                let at = index as usize * 3;
                if at + 3 <= palette.len() {
                    rgb.extend_from_slice(&palette[at..at + 3]);
                } else {
                    rgb.extend_from_slice(&[0, 0, 0]);
                }
            }
            (rgb, ColorType::Rgb8, "RGB")
        }
        SampleFormat::Rgb => {
            let needed = pixels * 3;
            if samples.len() < needed {
                return Err(format!(
                    "RGB samples too short: {} of {} bytes",
                    samples.len(),
                    needed
                ));
            }
            (samples[..needed].to_vec(), ColorType::Rgb8, "RGB")
        }
    };

    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(&rgb_or_gray, width, height, color_type)
        .map_err(|e| format!("PNG encoding failed: {}", e))?;
    Ok((out, color_space))
}

/// Expand 1/2/4-bit single-component rows (byte-padded per row) to 8-bit.
fn expand_to_bytes(samples: &[u8], width: u32, height: u32, bits: u32) -> Option<Vec<u8>> {
    let width = width as usize;
    let height = height as usize;
    match bits {
        8 => {
            let needed = width * height;
            if samples.len() < needed {
                return None;
            }
            Some(samples[..needed].to_vec())
        }
        1 | 2 | 4 => {
            let per_byte = 8 / bits as usize;
            let row_bytes = (width + per_byte - 1) / per_byte;
            if samples.len() < row_bytes * height {
                return None;
            }
            let max_value = (1u16 << bits) - 1;
            let mut out = Vec::with_capacity(width * height);
            for row in 0..height {
                let row_data = &samples[row * row_bytes..(row + 1) * row_bytes];
                for col in 0..width {
                    let byte = row_data[col / per_byte];
                    let shift = 8 - bits as usize * (col % per_byte + 1);
                    let value = (byte >> shift) as u16 & max_value;
                    out.push((value * 255 / max_value) as u8);
                }
            }
            Some(out)
        }
        16 => {
            // Keep the high byte of each sample.
            let needed = width * height * 2;
            if samples.len() < needed {
                return None;
            }
            Some(samples[..needed].iter().step_by(2).copied().collect())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_image(extra: &str, payload: &[u8]) -> ObjectStore {
        let mut input = Vec::new();
        input.extend_from_slice(
            format!(
                "1 0 obj\n<< /Subtype /Image {} /Length {} >>\nstream\n",
                extra,
                payload.len()
            )
            .as_bytes(),
        );
        input.extend_from_slice(payload);
        input.extend_from_slice(b"\nendstream\nendobj\n");
        ObjectStore::parse(&input).unwrap()
    }

    #[test]
    fn test_jpeg_passes_through_byte_identical() {
        let payload = b"\xFF\xD8\xFF\xE0fake-jpeg-payload";
        let store = store_with_image(
            "/Width 4 /Height 4 /Filter /DCTDecode /ColorSpace /DeviceRGB",
            payload,
        );
        let resource = materialize_image(&store, (1, 0)).unwrap();
        assert_eq!(resource.data, payload);
        assert_eq!(resource.mime_type, "image/jpeg");
        assert_eq!(resource.extension(), "jpg");
        assert_eq!(resource.width, Some(4));
    }

    #[test]
    fn test_raw_rgb_roundtrips_through_png() {
        // 2x2 RGB: red, green, blue, white.
        let payload: &[u8] = &[
            255, 0, 0, 0, 255, 0, //
            0, 0, 255, 255, 255, 255,
        ];
        let store = store_with_image(
            "/Width 2 /Height 2 /BitsPerComponent 8 /ColorSpace /DeviceRGB",
            payload,
        );
        let resource = materialize_image(&store, (1, 0)).unwrap();
        assert_eq!(resource.mime_type, "image/png");

        let decoded = image::load_from_memory(&resource.data).unwrap();
        assert_eq!(decoded.width(), 2);
        assert_eq!(decoded.height(), 2);
        let rgb = decoded.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(rgb.get_pixel(1, 1).0, [255, 255, 255]);
    }

    #[test]
    fn test_gray_image() {
        let payload: &[u8] = &[0, 128, 255, 64];
        let store = store_with_image(
            "/Width 2 /Height 2 /BitsPerComponent 8 /ColorSpace /DeviceGray",
            payload,
        );
        let resource = materialize_image(&store, (1, 0)).unwrap();
        let decoded = image::load_from_memory(&resource.data).unwrap();
        assert_eq!(decoded.to_luma8().get_pixel(1, 0).0, [128]);
        assert_eq!(resource.color_space.as_deref(), Some("Gray"));
    }

    #[test]
    fn test_one_bit_rows_are_byte_padded() {
        // 3x2 1-bit: rows 0b101..... and 0b010.....
        let payload: &[u8] = &[0b1010_0000, 0b0100_0000];
        let store = store_with_image(
            "/Width 3 /Height 2 /BitsPerComponent 1 /ColorSpace /DeviceGray",
            payload,
        );
        let resource = materialize_image(&store, (1, 0)).unwrap();
        let decoded = image::load_from_memory(&resource.data).unwrap().to_luma8();
        assert_eq!(decoded.get_pixel(0, 0).0, [255]);
        assert_eq!(decoded.get_pixel(1, 0).0, [0]);
        assert_eq!(decoded.get_pixel(1, 1).0, [255]);
    }

    #[test]
    fn test_indexed_palette_expansion() {
        let input = b"2 0 obj\n(\x00\x00\x00\xFF\x00\x00)\nendobj\n1 0 obj\n<< /Subtype /Image /Width 2 /Height 1 /BitsPerComponent 8 /ColorSpace [/Indexed /DeviceRGB 1 2 0 R] /Length 2 >>\nstream\n\x00\x01\nendstream\nendobj\n";
        let store = ObjectStore::parse(input).unwrap();
        let resource = materialize_image(&store, (1, 0)).unwrap();
        let decoded = image::load_from_memory(&resource.data).unwrap().to_rgb8();
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(decoded.get_pixel(1, 0).0, [255, 0, 0]);
    }

    #[test]
    fn test_truncated_samples_are_an_error_not_a_panic() {
        let store = store_with_image(
            "/Width 100 /Height 100 /BitsPerComponent 8 /ColorSpace /DeviceRGB",
            b"short",
        );
        let err = materialize_image(&store, (1, 0)).unwrap_err();
        assert!(err.contains("too short"));
    }

    #[test]
    fn test_missing_dimensions_rejected() {
        let store = store_with_image("/ColorSpace /DeviceRGB", b"data");
        assert!(materialize_image(&store, (1, 0)).is_err());
    }
}
