/*!
 * Prompt construction and marker-based response parsing.
 *
 * Fragments travel to the provider inside a single payload, each prefixed
 * with a `<<FRAGMENT_n>>` marker and terminated by `<<END>>`. The response
 * is matched back to fragments through the same markers; ordinal position
 * is never trusted because models may reorder or drop items. Markers carry
 * the sub-batch-local numeric index rather than the caller's opaque id, so
 * an id containing the delimiter characters cannot corrupt sectioning.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::TranslationError;
use crate::translation::fragment::Fragment;

/// Regex for matching fragment markers in a response
static FRAGMENT_MARKER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<<FRAGMENT_(\d+)>>").expect("Invalid fragment marker regex"));

/// End marker constant
const END_MARKER: &str = "<<END>>";

/// System prompt template for presentation translation.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// The default system prompt for presentation text translation.
    pub const PRESENTATION_TRANSLATOR: &'static str = r#"You are a professional translator working on presentation slides, translating from {source_language} to {target_language}.

## Your Role
- Translate each fragment naturally, in a register appropriate for slides
- Keep translations concise; slide text must stay scannable
- Preserve formatting such as bullet points, numbering, and line breaks
- Never translate product names, acronyms, or code identifiers

## Input Format
The text contains fragments delimited by <<FRAGMENT_N>> markers and a final <<END>> marker.

## Output Requirements
- Reproduce every <<FRAGMENT_N>> marker and the <<END>> marker exactly
- Place each fragment's translation directly after its marker
- Do not add commentary, notes, or any text outside the markers"#;

    /// Create a new prompt template
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Create the default presentation translator template
    pub fn presentation_translator() -> Self {
        Self::new(Self::PRESENTATION_TRANSLATOR)
    }

    /// Render the template with the given languages
    pub fn render(&self, source_language: &str, target_language: &str) -> String {
        let source = if source_language == "auto" {
            "the source language (detect it)"
        } else {
            source_language
        };
        self.template
            .replace("{source_language}", source)
            .replace("{target_language}", target_language)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::presentation_translator()
    }
}

/// Count the fragment markers present in a marker-delimited text.
pub fn count_fragment_markers(text: &str) -> usize {
    FRAGMENT_MARKER_REGEX.captures_iter(text).count()
}

/// Serialize a sub-batch into a marker-delimited payload.
pub fn build_batch_payload(fragments: &[Fragment]) -> String {
    let mut payload = String::new();
    for (index, fragment) in fragments.iter().enumerate() {
        payload.push_str(&format!("<<FRAGMENT_{}>>\n", index));
        payload.push_str(&fragment.original);
        payload.push('\n');
    }
    payload.push_str(END_MARKER);
    payload
}

/// Extract the text between a fragment's marker and the next marker.
fn extract_fragment_text(
    response: &str,
    index: usize,
    total: usize,
) -> Result<String, TranslationError> {
    let start_marker = format!("<<FRAGMENT_{}>>", index);
    let end_marker = if index == total - 1 {
        END_MARKER.to_string()
    } else {
        format!("<<FRAGMENT_{}>>", index + 1)
    };

    let start_pos = response
        .find(&start_marker)
        .ok_or_else(|| TranslationError::MissingMarkers(start_marker.clone()))?;
    let content_start = start_pos + start_marker.len();

    let end_pos = response[content_start..]
        .find(&end_marker)
        .map(|pos| pos + content_start)
        .ok_or_else(|| TranslationError::MissingMarkers(end_marker.clone()))?;

    Ok(response[content_start..end_pos].trim().to_string())
}

/// Parse a marker-delimited response back into per-fragment texts.
///
/// Validates the full marker set up front: any missing, duplicated, or
/// reordered marker fails the whole sub-batch (class: partial-response
/// error) rather than silently dropping a fragment.
pub fn parse_batch_response(
    response: &str,
    expected: usize,
) -> Result<Vec<String>, TranslationError> {
    if expected == 0 {
        return Ok(Vec::new());
    }

    let found_indices: Vec<usize> = FRAGMENT_MARKER_REGEX
        .captures_iter(response)
        .filter_map(|cap| cap.get(1).and_then(|m| m.as_str().parse().ok()))
        .collect();

    if !response.contains(END_MARKER) {
        return Err(TranslationError::MissingMarkers(END_MARKER.to_string()));
    }

    let mut sorted = found_indices.clone();
    sorted.sort_unstable();
    if found_indices != sorted {
        return Err(TranslationError::MissingMarkers(
            "markers out of order".to_string(),
        ));
    }
    sorted.dedup();
    if sorted.len() != found_indices.len() {
        return Err(TranslationError::MissingMarkers(
            "duplicated markers".to_string(),
        ));
    }
    if sorted.last().is_some_and(|last| *last >= expected) {
        return Err(TranslationError::MissingMarkers(format!(
            "unexpected marker index {} (sub-batch has {} fragments)",
            sorted.last().unwrap_or(&0),
            expected
        )));
    }

    let present = |index: &usize| found_indices.binary_search(index).is_ok();
    let missing = (0..expected).filter(|i| !present(i)).count();
    if missing > 0 {
        return Err(TranslationError::IncompleteResponse {
            expected,
            found: expected - missing,
        });
    }

    let mut translated = Vec::with_capacity(expected);
    for index in 0..expected {
        let text = extract_fragment_text(response, index, expected)?;
        if text.is_empty() {
            return Err(TranslationError::IncompleteResponse {
                expected,
                found: index,
            });
        }
        translated.push(text);
    }
    Ok(translated)
}
