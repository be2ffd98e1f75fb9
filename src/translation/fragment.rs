/*!
 * Data model for translatable text fragments.
 *
 * A fragment is one unit of translatable text with a stable, caller-supplied
 * id (a slide text box, a table cell, a speaker note). The engine consumes
 * `(id, original)` tuples and produces `(id, translated)` tuples; everything
 * upstream (slide parsing) and downstream (file regeneration) is a
 * collaborator concern.
 */

use serde::{Deserialize, Serialize};

/// One unit of translatable text, immutable once submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// Opaque caller-supplied id, unique within one request
    pub id: String,

    /// Original text to translate
    pub original: String,
}

impl Fragment {
    /// Create a new fragment
    pub fn new(id: impl Into<String>, original: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            original: original.into(),
        }
    }
}

/// Where a fragment's translated text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationSource {
    /// Served from the translation cache without an API call
    Cache,

    /// Freshly translated by the provider API
    Api,

    /// Original text reused because the fragment's sub-batch permanently
    /// failed, was rejected by validation, or was never attempted
    Fallback,
}

/// A fragment paired with its translation and provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatedFragment {
    /// Caller-supplied id, matching exactly one input fragment
    pub id: String,

    /// Original text as submitted
    pub original: String,

    /// Translated text; equals `original` for fallback fragments
    pub translated: String,

    /// Provenance of the translated text
    pub source: TranslationSource,

    /// True when the fragment was never attempted because the request was
    /// cancelled before its sub-batch was dispatched
    pub cancelled: bool,
}

impl TranslatedFragment {
    /// Build a translated fragment from an input fragment
    pub fn new(fragment: &Fragment, translated: String, source: TranslationSource) -> Self {
        Self {
            id: fragment.id.clone(),
            original: fragment.original.clone(),
            translated,
            source,
            cancelled: false,
        }
    }

    /// Build a fallback fragment that reuses the original text
    pub fn fallback(fragment: &Fragment) -> Self {
        Self {
            id: fragment.id.clone(),
            original: fragment.original.clone(),
            translated: fragment.original.clone(),
            source: TranslationSource::Fallback,
            cancelled: false,
        }
    }

    /// Build a fallback fragment for a sub-batch that was never dispatched
    pub fn cancelled(fragment: &Fragment) -> Self {
        let mut translated = Self::fallback(fragment);
        translated.cancelled = true;
        translated
    }

    /// Whether the fragment carries a genuine translation
    pub fn is_translated(&self) -> bool {
        !matches!(self.source, TranslationSource::Fallback)
    }
}

/// One orchestration call: an ordered list of fragments plus the knobs that
/// shape dispatch. Not persisted by the engine.
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    /// Ordered fragments to translate
    pub fragments: Vec<Fragment>,

    /// Target language code or name
    pub target_language: String,

    /// Source language, "auto" to let the model detect it
    pub source_language: String,

    /// Model identifier passed to the provider; empty to use the
    /// engine-configured model
    pub model: String,

    /// Maximum fragments per sub-batch; zero to use the engine default
    pub batch_size: usize,

    /// Maximum sub-batches in flight simultaneously; zero to use the
    /// engine default
    pub concurrency: usize,
}

impl TranslationRequest {
    /// Create a request with engine defaults for batching and concurrency
    pub fn new(fragments: Vec<Fragment>, target_language: impl Into<String>) -> Self {
        Self {
            fragments,
            target_language: target_language.into(),
            source_language: "auto".to_string(),
            model: String::new(),
            batch_size: 0,
            concurrency: 0,
        }
    }

    /// Set an explicit source language
    pub fn source_language(mut self, language: impl Into<String>) -> Self {
        self.source_language = language.into();
        self
    }

    /// Override the configured model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the configured sub-batch size
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Override the configured concurrency
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }
}

/// Aggregate result of one orchestration call.
///
/// The fragment list always covers every input fragment in input order; a
/// non-zero `fallback_count` is the signal that something degraded, not an
/// error return.
#[derive(Debug, Clone)]
pub struct TranslationOutcome {
    /// Translated fragments in input order, one per input fragment
    pub fragments: Vec<TranslatedFragment>,

    /// Fraction of dispatched sub-batches that completed without exhausting
    /// retries (1.0 when nothing needed dispatching)
    pub success_rate: f64,

    /// Whether the success rate met the configured minimum
    pub accepted: bool,

    /// Number of fragments that fell back to their original text
    pub fallback_count: usize,

    /// True when the request was cancelled before all sub-batches dispatched
    pub cancelled: bool,
}

impl TranslationOutcome {
    /// Fragments that carry a genuine translation (cache or API)
    pub fn translated_count(&self) -> usize {
        self.fragments.len() - self.fallback_count
    }
}
