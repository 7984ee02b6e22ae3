use std::fmt;

/// Raw bytes of an uploaded prescription photo.
#[derive(Clone)]
pub struct PrescriptionImage {
    pub bytes: Vec<u8>,
    pub media_type: Option<String>,
}

impl PrescriptionImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            media_type: None,
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for PrescriptionImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrescriptionImage")
            .field("len", &self.bytes.len())
            .field("media_type", &self.media_type)
            .finish()
    }
}

/// A typed question together with the prescription text it refers to, if any.
#[derive(Debug, Clone, Default)]
pub struct TextRequest {
    pub text: String,
    pub prior_context: Option<String>,
}

/// One user action. Built per call and dropped once routed.
#[derive(Debug, Clone)]
pub enum Request {
    Image(PrescriptionImage),
    Text(TextRequest),
}

impl Request {
    pub fn image(image: PrescriptionImage) -> Self {
        Self::Image(image)
    }

    pub fn text(text: impl Into<String>, prior_context: Option<String>) -> Self {
        Self::Text(TextRequest {
            text: text.into(),
            prior_context,
        })
    }

    /// Builds a request from the loose inputs a UI collects. An image always
    /// wins over any accompanying text.
    pub fn from_parts(
        image: Option<PrescriptionImage>,
        text: impl Into<String>,
        prior_context: Option<String>,
    ) -> Self {
        match image {
            Some(image) => Self::Image(image),
            None => Self::text(text, prior_context),
        }
    }
}

/// Trims and drops blank strings.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_pre_empts_text() {
        let request = Request::from_parts(
            Some(PrescriptionImage::new(vec![1, 2, 3])),
            "where is the nearest hospital",
            Some("aspirin".to_string()),
        );
        assert!(matches!(request, Request::Image(_)));
    }

    #[test]
    fn debug_does_not_dump_bytes() {
        let image = PrescriptionImage::new(vec![0; 4096]).with_media_type("image/png");
        let rendered = format!("{:?}", image);
        assert!(rendered.contains("4096"));
        assert!(rendered.len() < 100);
    }

    #[test]
    fn non_blank_filters_whitespace() {
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(Some(" x ")), Some("x"));
        assert_eq!(non_blank(None), None);
    }
}
