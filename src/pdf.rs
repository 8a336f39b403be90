//! PDF source provider.
//!
//! Wraps a loaded PDF document and exposes the operations the flipbook
//! needs: page count, info-dictionary metadata, per-page text extraction
//! for search, and per-page embedded image extraction for page visuals.
//! Rasterization proper is out of scope; pages without an extractable
//! embedded image fall back to a generated placeholder (see `render`).

use crate::error::{AppError, Result};
use crate::library::Magazine;
use lopdf::Document;
use std::path::Path;

/// A loaded magazine PDF.
pub struct PdfMagazine {
    doc: Document,
}

impl PdfMagazine {
    /// Load a PDF from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let doc = Document::load(path).map_err(|e| AppError::Pdf(e.to_string()))?;
        Ok(Self { doc })
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// Fill magazine metadata from the PDF info dictionary.
    ///
    /// Missing or unreadable entries leave the existing values untouched.
    pub fn apply_metadata(&self, magazine: &mut Magazine) {
        magazine.total_pages = self.page_count();

        let Ok(info_ref) = self
            .doc
            .trailer
            .get(b"Info")
            .and_then(|obj| obj.as_reference())
        else {
            return;
        };
        let Ok(info) = self.doc.get_dictionary(info_ref) else {
            return;
        };

        if let Ok(title) = info.get(b"Title")
            && let Some(text) = extract_string(title)
        {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                magazine.title = trimmed.to_string();
            }
        }

        if let Ok(author) = info.get(b"Author")
            && let Some(text) = extract_string(author)
        {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                magazine.author = Some(trimmed.to_string());
            }
        }

        // Subject doubles as the description
        if let Ok(subject) = info.get(b"Subject")
            && let Some(text) = extract_string(subject)
        {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                magazine.description = Some(trimmed.to_string());
            }
        }

        // First keyword doubles as the category slug
        if let Ok(keywords) = info.get(b"Keywords")
            && let Some(text) = extract_string(keywords)
        {
            if let Some(first) = text
                .split([',', ';'])
                .map(str::trim)
                .find(|s| !s.is_empty())
            {
                magazine.category = Some(first.to_lowercase().replace(' ', "-"));
            }
        }
    }

    /// Extract text from a single page (1-based) with a crude confidence score.
    ///
    /// Confidence is the fraction of extracted characters that are printable
    /// ASCII or common whitespace; scanned-image pages typically extract
    /// nothing and score 0.
    pub fn page_text(&self, page_number: u32) -> (String, f64) {
        let text = self
            .doc
            .extract_text(&[page_number])
            .unwrap_or_default()
            .trim()
            .to_string();

        if text.is_empty() {
            return (text, 0.0);
        }

        let total = text.chars().count();
        let printable = text
            .chars()
            .filter(|c| c.is_ascii_graphic() || c.is_whitespace() || c.is_alphanumeric())
            .count();
        let confidence = printable as f64 / total as f64;

        (text, confidence.clamp(0.0, 1.0))
    }

    /// Extract the first embedded raster image of a page (1-based).
    ///
    /// Returns JPEG or PNG bytes when the page carries a usable image
    /// XObject, `None` otherwise.
    pub fn page_image(&self, page_number: u32) -> Result<Option<Vec<u8>>> {
        let pages = self.doc.get_pages();
        let Some(&page_id) = pages.get(&page_number) else {
            return Ok(None);
        };

        let Ok(page) = self.doc.get_dictionary(page_id) else {
            return Ok(None);
        };

        // Resources may be inline or referenced
        let resources = match page.get(b"Resources") {
            Ok(lopdf::Object::Reference(r)) => self.doc.get_dictionary(*r).ok(),
            Ok(lopdf::Object::Dictionary(d)) => Some(d),
            _ => None,
        };
        let Some(resources) = resources else {
            return Ok(None);
        };

        let xobjects = match resources.get(b"XObject") {
            Ok(lopdf::Object::Reference(r)) => self.doc.get_dictionary(*r).ok(),
            Ok(lopdf::Object::Dictionary(d)) => Some(d),
            _ => None,
        };
        let Some(xobjects) = xobjects else {
            return Ok(None);
        };

        for (_name, obj) in xobjects.iter() {
            let lopdf::Object::Reference(xobj_ref) = obj else {
                continue;
            };

            let Ok(lopdf::Object::Stream(xobj_stream)) = self.doc.get_object(*xobj_ref) else {
                continue;
            };

            let is_image = matches!(
                xobj_stream.dict.get(b"Subtype"),
                Ok(lopdf::Object::Name(n)) if n == b"Image"
            );
            if !is_image {
                continue;
            }

            // DCTDecode streams are JPEG as-is
            let is_dct = match xobj_stream.dict.get(b"Filter") {
                Ok(lopdf::Object::Name(n)) => n == b"DCTDecode",
                Ok(lopdf::Object::Array(arr)) => arr
                    .iter()
                    .any(|item| matches!(item, lopdf::Object::Name(n) if n == b"DCTDecode")),
                _ => false,
            };

            if is_dct {
                let data = if !xobj_stream.content.is_empty() {
                    xobj_stream.content.clone()
                } else if let Ok(decoded) = xobj_stream.decompressed_content() {
                    decoded
                } else {
                    continue;
                };

                if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
                    return Ok(Some(data));
                }
            }

            if let Ok(data) = xobj_stream.decompressed_content() {
                if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
                    return Ok(Some(data));
                }

                if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
                    return Ok(Some(data));
                }

                // Raw samples: re-encode as PNG when dimensions are known
                let width = match xobj_stream.dict.get(b"Width") {
                    Ok(lopdf::Object::Integer(i)) => Some(*i as u32),
                    _ => None,
                };
                let height = match xobj_stream.dict.get(b"Height") {
                    Ok(lopdf::Object::Integer(i)) => Some(*i as u32),
                    _ => None,
                };

                if let (Some(w), Some(h)) = (width, height)
                    && let Some(img) = image::RgbImage::from_raw(w, h, data.clone())
                {
                    let mut png_data = Vec::new();
                    if image::DynamicImage::ImageRgb8(img)
                        .write_to(
                            &mut std::io::Cursor::new(&mut png_data),
                            image::ImageFormat::Png,
                        )
                        .is_ok()
                    {
                        return Ok(Some(png_data));
                    }
                }
            }
        }

        Ok(None)
    }
}

/// Extract text content from a PDF info dictionary value.
fn extract_string(obj: &lopdf::Object) -> Option<String> {
    match obj {
        lopdf::Object::String(bytes, _) => {
            // UTF-16BE strings start with a BOM
            if bytes.starts_with(&[0xFE, 0xFF]) {
                let utf16: Vec<u16> = bytes[2..]
                    .chunks(2)
                    .map(|chunk| u16::from_be_bytes([chunk[0], chunk.get(1).copied().unwrap_or(0)]))
                    .collect();
                String::from_utf16(&utf16).ok()
            } else {
                String::from_utf8(bytes.clone())
                    .or_else(|_| {
                        Ok::<_, std::string::FromUtf8Error>(
                            bytes.iter().map(|&b| b as char).collect(),
                        )
                    })
                    .ok()
            }
        }
        lopdf::Object::Name(name) => String::from_utf8(name.clone()).ok(),
        _ => None,
    }
}
