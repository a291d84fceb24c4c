//! Translation parameters shared by every text in a batch.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Editorial rules layered on top of the glossary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorialStyle {
    /// Address the user informally ("ty" rather than "vy" in Russian, "du" in German).
    pub informal_tone: bool,
    /// Prefer short, compact wording.
    pub prefer_short_forms: bool,
}

impl EditorialStyle {
    /// Whether any rule is enabled.
    pub fn is_plain(&self) -> bool {
        !self.informal_tone && !self.prefer_short_forms
    }
}

/// Language pair plus everything else that shapes a translation.
///
/// Two contexts that would produce different prompts must produce different
/// [`context_string`](Self::context_string)s, since that string is part of
/// every cache fingerprint.
///
/// ```rust
/// # use bragi::TranslationContext;
/// let ctx = TranslationContext::new("en", "ru")
///     .glossary_term("Save", "Сохранить")
///     .informal_tone(true);
/// assert_eq!(ctx.to_lang, "ru");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationContext {
    pub from_lang: String,
    pub to_lang: String,
    /// Source term → required translation.
    #[serde(default)]
    pub glossary: BTreeMap<String, String>,
    /// Free-form domain notes ("checkout flow of a bakery app").
    #[serde(default)]
    pub glossary_context: Option<String>,
    #[serde(default)]
    pub style: EditorialStyle,
    /// Extra instructions appended verbatim to the prompt.
    #[serde(default)]
    pub custom_prompt: Option<String>,
}

impl TranslationContext {
    pub fn new(from_lang: impl Into<String>, to_lang: impl Into<String>) -> Self {
        Self {
            from_lang: from_lang.into(),
            to_lang: to_lang.into(),
            ..Default::default()
        }
    }

    pub fn glossary_term(
        mut self,
        term: impl Into<String>,
        translation: impl Into<String>,
    ) -> Self {
        self.glossary.insert(term.into(), translation.into());
        self
    }

    pub fn glossary(mut self, glossary: BTreeMap<String, String>) -> Self {
        self.glossary = glossary;
        self
    }

    pub fn glossary_context(mut self, context: impl Into<String>) -> Self {
        self.glossary_context = Some(context.into());
        self
    }

    pub fn informal_tone(mut self, enabled: bool) -> Self {
        self.style.informal_tone = enabled;
        self
    }

    pub fn prefer_short_forms(mut self, enabled: bool) -> Self {
        self.style.prefer_short_forms = enabled;
        self
    }

    pub fn custom_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.custom_prompt = Some(prompt.into());
        self
    }

    /// Canonical rendering of glossary, glossary notes and style flags.
    ///
    /// Every variable-length piece is length-prefixed, so no two distinct
    /// contexts render to the same string. Glossary pairs come out in key
    /// order (the map is a `BTreeMap`), which makes the rendering independent
    /// of the order the client sent them in.
    pub fn context_string(&self) -> String {
        let mut out = String::new();
        if let Some(notes) = &self.glossary_context {
            let _ = write!(out, "c{}:{notes}", notes.len());
        }
        for (term, translation) in &self.glossary {
            let _ = write!(
                out,
                "g{}:{term}{}:{translation}",
                term.len(),
                translation.len()
            );
        }
        if self.style.informal_tone {
            out.push_str("|informal");
        }
        if self.style.prefer_short_forms {
            out.push_str("|short");
        }
        out
    }
}

/// Ordered source texts sharing one [`TranslationContext`].
///
/// Output of any batch operation aligns index-for-index with `texts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBatch {
    pub texts: Vec<String>,
    pub context: TranslationContext,
}

impl RequestBatch {
    pub fn new(texts: Vec<String>, context: TranslationContext) -> Self {
        Self { texts, context }
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}
