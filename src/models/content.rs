use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextSegment {
    pub name: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageSegment {
    pub name: String,
    pub b64: String,
    pub mime: String,
}

impl ImageSegment {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.b64)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractedContent {
    pub texts: Vec<TextSegment>,
    pub figures: Vec<ImageSegment>,
}

impl ExtractedContent {
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty() && self.figures.is_empty()
    }

    /// Drops every figure past `max`, keeping source order.
    pub fn cap_figures(&mut self, max: usize) -> usize {
        let dropped = self.figures.len().saturating_sub(max);
        self.figures.truncate(max);
        dropped
    }
}
