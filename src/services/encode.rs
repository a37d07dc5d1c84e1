use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageOutputFormat;
use tracing::debug;

use crate::error::{AppError, AppResult};

/// Re-express every binary asset as a base64 PNG string, keyed by its
/// original name. PNG is lossless, so the transport form round-trips the
/// engine's output. An empty input yields an empty mapping; a payload that
/// cannot be decoded as an image fails the whole batch.
pub fn encode_all(assets: &HashMap<String, Vec<u8>>) -> AppResult<BTreeMap<String, String>> {
    let mut encoded = BTreeMap::new();
    for (name, payload) in assets {
        let image = image::load_from_memory(payload).map_err(|err| {
            AppError::encoding(format!("asset '{}' could not be decoded: {}", name, err))
        })?;

        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)
            .map_err(|err| {
                AppError::encoding(format!("asset '{}' could not be re-encoded: {}", name, err))
            })?;

        encoded.insert(name.clone(), STANDARD.encode(&png));
    }

    if !encoded.is_empty() {
        debug!(assets = encoded.len(), "assets encoded for transport");
    }
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([200, 30, 30, 255]),
        ));
        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn empty_input_yields_empty_mapping() {
        let encoded = encode_all(&HashMap::new()).unwrap();
        assert!(encoded.is_empty());
    }

    #[test]
    fn assets_round_trip_through_the_encoding() {
        let assets = HashMap::from([("page_1_Im0".to_string(), png_bytes(7, 5))]);
        let encoded = encode_all(&assets).unwrap();
        assert_eq!(encoded.len(), 1);

        let decoded = STANDARD.decode(&encoded["page_1_Im0"]).unwrap();
        let reloaded = image::load_from_memory(&decoded).unwrap();
        assert_eq!(reloaded.width(), 7);
        assert_eq!(reloaded.height(), 5);
    }

    #[test]
    fn input_is_not_mutated() {
        let assets = HashMap::from([("a".to_string(), png_bytes(2, 2))]);
        let before = assets.clone();
        encode_all(&assets).unwrap();
        assert_eq!(assets, before);
    }

    #[test]
    fn undecodable_payload_is_an_encoding_error() {
        let assets = HashMap::from([("broken".to_string(), vec![1u8, 2, 3, 4])]);
        let err = encode_all(&assets).unwrap_err();
        match err {
            AppError::Encoding { message } => assert!(message.contains("broken")),
            other => panic!("expected Encoding error, got {:?}", other),
        }
    }
}
