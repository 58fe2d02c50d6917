/// A unit of raw corpus text as produced by a loader.
///
/// `id` names where the text came from and becomes the `source_tag` of every
/// passage cut from it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: String,
}

impl Document {
    pub fn new(id: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: data.into(),
        }
    }

    /// True when the document holds nothing but whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.data.trim().is_empty()
    }
}

/// A bounded chunk of corpus text, the unit that gets embedded and retrieved.
#[derive(Debug, Clone, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Passage {
    pub id: usize,
    pub text: String,
    pub source_tag: String,
}
