//! Content type lookup by file name.

use std::collections::HashMap;
use std::fmt;

use mime::Mime;

/// Picks the `Content-Type` stored with an uploaded file.
pub trait MimeTypes: Send + Sync + fmt::Debug {
    /// MIME type for `file_name`.
    fn mime_type(&self, file_name: &str) -> Mime;
}

/// [`MimeTypes`] keyed on the lowercased extension, with
/// `application/octet-stream` as fallback.
#[derive(Debug, Clone, Default)]
pub struct ExtensionMimeTypes {
    overrides: HashMap<String, Mime>,
}

impl ExtensionMimeTypes {
    /// Lookup with the built-in table only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map an extension (without the dot) to `mime`, ahead of the built-in table.
    #[must_use]
    pub fn with_type(mut self, extension: &str, mime: Mime) -> Self {
        self.overrides.insert(extension.to_ascii_lowercase(), mime);
        self
    }
}

impl MimeTypes for ExtensionMimeTypes {
    fn mime_type(&self, file_name: &str) -> Mime {
        let Some((_, ext)) = file_name.rsplit_once('.') else {
            return mime::APPLICATION_OCTET_STREAM;
        };
        let ext = ext.to_ascii_lowercase();
        if let Some(mime) = self.overrides.get(&ext) {
            return mime.clone();
        }
        builtin(&ext)
    }
}

fn builtin(ext: &str) -> Mime {
    match ext {
        "txt" | "log" => mime::TEXT_PLAIN,
        "htm" | "html" => mime::TEXT_HTML,
        "css" => mime::TEXT_CSS,
        "js" | "mjs" => mime::TEXT_JAVASCRIPT,
        "xml" => mime::TEXT_XML,
        "csv" => mime::TEXT_CSV,
        "tsv" => mime::TEXT_TAB_SEPARATED_VALUES,
        "vcf" => mime::TEXT_VCARD,
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "gif" => mime::IMAGE_GIF,
        "png" => mime::IMAGE_PNG,
        "bmp" => mime::IMAGE_BMP,
        "svg" => mime::IMAGE_SVG,
        "woff" => mime::FONT_WOFF,
        "woff2" => mime::FONT_WOFF2,
        "json" => mime::APPLICATION_JSON,
        "pdf" => mime::APPLICATION_PDF,
        "msgpack" => mime::APPLICATION_MSGPACK,
        other => extra(other)
            .and_then(|s| s.parse().ok())
            .unwrap_or(mime::APPLICATION_OCTET_STREAM),
    }
}

fn extra(ext: &str) -> Option<&'static str> {
    Some(match ext {
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        _ => return None,
    })
}
