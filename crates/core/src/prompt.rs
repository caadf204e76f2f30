//! Versioned construction of the instruction text sent to the provider.
//!
//! Prompt templates are keyed by a version identifier so a bad template can
//! be rolled back (or A/B tested) without code changes at call sites. The
//! builder is pure: identical `(style, version, instructions)` inputs always
//! produce byte-identical output.

use crate::style::Style;

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

/// First production template.
pub const PROMPT_VERSION_V1: &str = "v1";

/// All known template versions, oldest first.
pub const KNOWN_PROMPT_VERSIONS: &[&str] = &[PROMPT_VERSION_V1];

/// The version new generations are pinned to.
pub const LATEST_PROMPT_VERSION: &str = PROMPT_VERSION_V1;

// ---------------------------------------------------------------------------
// Shared template (v1)
// ---------------------------------------------------------------------------

/// Mandatory operations, preservation rules, and prohibitions shared by all
/// styles. The first image referenced is the garment, the second the model.
const SHARED_TEMPLATE_V1: &str = "\
You are a virtual try-on compositor. Image 1 is a garment product photo. \
Image 2 is a photo of a person. Produce one photorealistic image of the \
person in image 2 wearing the garment from image 1.

MANDATORY OPERATIONS:
1. Mask the garment in image 1 cleanly from its background.
2. Map the garment onto the correct body region of the person.
3. Deform and fit the garment to the person's pose and proportions.
4. Integrate lighting so the garment matches the scene of image 2.

PRESERVE UNCHANGED: the person's face, hair, skin tone, pose, body shape, \
and the entire background of image 2.

PROHIBITED: layering the garment over the person's original clothes; \
rendering the product separately beside the person; altering the person's \
identity in any way; adding text, logos, or watermarks.";

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Build the prompt for a generation attempt.
///
/// An unknown `version` falls back to [`LATEST_PROMPT_VERSION`] with a
/// warning; the builder never returns an empty prompt. Free-text
/// `instructions` are appended as a final user block when non-blank.
pub fn build_prompt(style: Style, version: &str, instructions: &str) -> String {
    let resolved = if KNOWN_PROMPT_VERSIONS.contains(&version) {
        version
    } else {
        tracing::warn!(
            requested = version,
            fallback = LATEST_PROMPT_VERSION,
            "Unknown prompt version requested, falling back to latest",
        );
        LATEST_PROMPT_VERSION
    };

    // Only v1 exists today; the match keeps additions honest.
    let shared = match resolved {
        PROMPT_VERSION_V1 => SHARED_TEMPLATE_V1,
        _ => SHARED_TEMPLATE_V1,
    };

    let mut prompt = format!("{shared}\n\n{}", style.directive());

    let extra = instructions.trim();
    if !extra.is_empty() {
        prompt.push_str("\n\nADDITIONAL USER INSTRUCTIONS: ");
        prompt.push_str(extra);
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::ALL_STYLES;

    #[test]
    fn build_is_deterministic() {
        let a = build_prompt(Style::Editorial, PROMPT_VERSION_V1, "sem fundo branco");
        let b = build_prompt(Style::Editorial, PROMPT_VERSION_V1, "sem fundo branco");
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_version_falls_back_to_latest() {
        let latest = build_prompt(Style::Casual, LATEST_PROMPT_VERSION, "");
        let fallback = build_prompt(Style::Casual, "v99", "");
        assert_eq!(latest, fallback);
        assert!(!fallback.is_empty());
    }

    #[test]
    fn every_style_yields_its_directive() {
        for style in ALL_STYLES {
            let prompt = build_prompt(style, PROMPT_VERSION_V1, "");
            assert!(prompt.contains(style.directive()));
            assert!(prompt.contains("MANDATORY OPERATIONS"));
        }
    }

    #[test]
    fn blank_instructions_are_omitted() {
        let prompt = build_prompt(Style::Seda, PROMPT_VERSION_V1, "   ");
        assert!(!prompt.contains("ADDITIONAL USER INSTRUCTIONS"));
    }

    #[test]
    fn instructions_are_appended_last() {
        let prompt = build_prompt(Style::Justa, PROMPT_VERSION_V1, "manter colar");
        assert!(prompt.ends_with("manter colar"));
    }

    #[test]
    fn template_forbids_layering_and_watermarks() {
        let prompt = build_prompt(Style::Editorial, PROMPT_VERSION_V1, "");
        assert!(prompt.contains("PROHIBITED"));
        assert!(prompt.contains("watermarks"));
        assert!(prompt.contains("PRESERVE UNCHANGED"));
    }
}
