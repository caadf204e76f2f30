//! The six style presets applied to try-on generation prompts.
//!
//! The serialized names are wire-stable: they are persisted on job rows and
//! embedded in prompt history, so renaming a variant is a breaking change.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Visual-direction preset selected in step 3 of the studio wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    Editorial,
    Seda,
    Justa,
    Transparente,
    Casual,
    Passarela,
}

/// All styles in wizard display order.
pub const ALL_STYLES: [Style; 6] = [
    Style::Editorial,
    Style::Seda,
    Style::Justa,
    Style::Transparente,
    Style::Casual,
    Style::Passarela,
];

impl Style {
    /// Parse a style string from the database.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "editorial" => Ok(Self::Editorial),
            "seda" => Ok(Self::Seda),
            "justa" => Ok(Self::Justa),
            "transparente" => Ok(Self::Transparente),
            "casual" => Ok(Self::Casual),
            "passarela" => Ok(Self::Passarela),
            _ => Err(CoreError::Validation(format!(
                "Invalid style '{s}'. Must be one of: editorial, seda, justa, \
                 transparente, casual, passarela"
            ))),
        }
    }

    /// Convert to the wire-stable database string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Editorial => "editorial",
            Self::Seda => "seda",
            Self::Justa => "justa",
            Self::Transparente => "transparente",
            Self::Casual => "casual",
            Self::Passarela => "passarela",
        }
    }

    /// Human-readable label for the studio UI.
    pub fn label(self) -> &'static str {
        match self {
            Self::Editorial => "Editorial",
            Self::Seda => "Seda & Cetim",
            Self::Justa => "Justa ao Corpo",
            Self::Transparente => "Transparência & Renda",
            Self::Casual => "Casual",
            Self::Passarela => "Passarela",
        }
    }

    /// Technical directive block appended to the shared prompt template.
    ///
    /// Each preset contributes lighting, fabric-physics, and contrast
    /// directives tuned for that garment category.
    pub fn directive(self) -> &'static str {
        match self {
            Self::Editorial => {
                "STYLE DIRECTIVE (editorial): high-fashion magazine lighting with a \
                 single strong key light and deep soft shadows; crisp fabric detail; \
                 elevated contrast and saturated but faithful garment color."
            }
            Self::Seda => {
                "STYLE DIRECTIVE (silk/satin): render fluid drape with specular sheen \
                 along fold ridges; soft diffused lighting; preserve the liquid, \
                 weightless fall of silk and satin without stiffening the fabric."
            }
            Self::Justa => {
                "STYLE DIRECTIVE (fitted): the garment must follow the body contour \
                 closely with realistic tension wrinkles at stress points; no bagginess; \
                 neutral studio lighting that emphasizes silhouette."
            }
            Self::Transparente => {
                "STYLE DIRECTIVE (sheer/lace): preserve semi-transparency and lace \
                 openwork exactly; layer the fabric over skin with believable opacity \
                 falloff; backlit-friendly lighting that reads the weave."
            }
            Self::Casual => {
                "STYLE DIRECTIVE (casual): relaxed natural drape with everyday ambient \
                 lighting; soft contrast; the garment sits comfortably without styling \
                 artifacts."
            }
            Self::Passarela => {
                "STYLE DIRECTIVE (runway): dramatic runway spotlighting from above; \
                 strong directional shadows on the floor; garment movement frozen \
                 mid-stride with dynamic fabric flow."
            }
        }
    }
}
