use image::RgbaImage;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("no loader can fetch {0}")]
    Unsupported(String),
    #[error("asset {0} is not available in this session")]
    Missing(String),
}

/// Result of importing a dropped or uploaded file
#[derive(Debug, Clone, PartialEq)]
pub enum ImportedAsset {
    /// Decoded pixels
    Decoded(RgbaImage),
    /// Bytes the decoders rejected, kept so the file can still be handed on as-is
    Blob { bytes: Vec<u8>, mime: Option<&'static str> },
}

impl ImportedAsset {
    pub fn image(&self) -> Option<&RgbaImage> {
        match self {
            Self::Decoded(image) => Some(image),
            Self::Blob { .. } => None,
        }
    }
}

/// Extensions accepted by the importer
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp", "tga"];

pub fn is_image_file_name(file_name: &str) -> bool {
    extension(file_name).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

fn extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

fn mime_for(file_name: &str) -> Option<&'static str> {
    match extension(file_name)?.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "tga" => Some("image/x-tga"),
        _ => None,
    }
}

/// Decode an imported file. TGA has no magic number, so the extension picks
/// the decoder for it; everything else is sniffed. When decoding fails the
/// raw bytes come back as a blob instead of an error.
pub fn decode_asset(bytes: &[u8], file_name: &str) -> ImportedAsset {
    let decoded = match extension(file_name).as_deref() {
        Some("tga") => image::load_from_memory_with_format(bytes, image::ImageFormat::Tga),
        _ => image::load_from_memory(bytes),
    };
    match decoded {
        Ok(image) => {
            log::debug!("decoded {} ({}x{})", file_name, image.width(), image.height());
            ImportedAsset::Decoded(image.to_rgba8())
        }
        Err(err) => {
            log::warn!("could not decode {}: {}; keeping raw file", file_name, err);
            ImportedAsset::Blob {
                bytes: bytes.to_vec(),
                mime: mime_for(file_name),
            }
        }
    }
}

/// A run of numbered files such as `walk_0001.tga`, `walk_0002.tga`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSequence {
    /// Shared name part before the frame number
    pub prefix: String,
    pub extension: String,
    /// File names ordered by frame number
    pub files: Vec<String>,
    pub first_number: u64,
}

/// Split `name_0012.png` into (`name_`, 12, `png`)
fn split_numbered(file_name: &str) -> Option<(String, u64, String)> {
    let ext = extension(file_name)?;
    let stem = Path::new(file_name).file_stem()?.to_str()?;
    let digits = stem.chars().rev().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let (prefix, number) = stem.split_at(stem.len() - digits);
    Some((prefix.to_owned(), number.parse().ok()?, ext))
}

/// Group numbered image files into sequences. Only groups of two or more
/// files form a sequence; the result is sorted by prefix.
pub fn detect_sequence<S: AsRef<str>>(file_names: &[S]) -> Vec<ImageSequence> {
    let mut groups: BTreeMap<(String, String), Vec<(u64, String)>> = BTreeMap::new();
    for name in file_names {
        let name = name.as_ref();
        if !is_image_file_name(name) {
            continue;
        }
        if let Some((prefix, number, ext)) = split_numbered(name) {
            groups.entry((prefix, ext)).or_default().push((number, name.to_owned()));
        }
    }

    groups
        .into_iter()
        .filter(|(_, files)| files.len() > 1)
        .map(|((prefix, extension), mut files)| {
            files.sort();
            ImageSequence {
                prefix,
                extension,
                first_number: files[0].0,
                files: files.into_iter().map(|(_, name)| name).collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let image = RgbaImage::from_pixel(3, 2, Rgba([255, 0, 0, 255]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_decode_png() {
        let asset = decode_asset(&png_bytes(), "frame.png");
        let image = asset.image().unwrap();
        assert_eq!(image.dimensions(), (3, 2));
    }

    #[test]
    fn test_malformed_tga_falls_back_to_blob() {
        let asset = decode_asset(&[1, 2, 3], "broken.tga");
        assert_eq!(
            asset,
            ImportedAsset::Blob {
                bytes: vec![1, 2, 3],
                mime: Some("image/x-tga")
            }
        );
    }

    #[test]
    fn test_detect_sequence() {
        let names = ["walk_0002.tga", "walk_0001.tga", "walk_0003.tga", "cover.png", "run1.png", "notes.txt"];
        let sequences = detect_sequence(&names);
        assert_eq!(sequences.len(), 1);
        assert_eq!(sequences[0].prefix, "walk_");
        assert_eq!(sequences[0].first_number, 1);
        assert_eq!(sequences[0].files, vec!["walk_0001.tga", "walk_0002.tga", "walk_0003.tga"]);
    }

    #[test]
    fn test_sequence_orders_numerically() {
        let sequences = detect_sequence(&["a9.png", "a10.png"]);
        assert_eq!(sequences[0].files, vec!["a9.png", "a10.png"]);
    }
}
