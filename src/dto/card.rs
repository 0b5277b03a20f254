use serde::{Deserialize, Serialize};

/// Library entry rendered as one card. Supplied by the library listing and never mutated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Cover art reference.
    pub cover: String,
    /// Logo reference; absent for games that ship without one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    /// Display title.
    pub title: String,
    /// Stable identifier of the game.
    pub app_name: String,
    /// Whether the game is installed locally.
    pub is_installed: bool,
}

/// Filter applied to the cover and logo artwork.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "percent")]
pub enum ArtworkFilter {
    /// Artwork rendered as is.
    FullColor,
    /// Artwork rendered in grayscale at the given intensity, in percent.
    Grayscale(f64),
}

impl ArtworkFilter {
    /// CSS `filter` value for this artwork treatment.
    pub fn css(&self) -> String {
        match self {
            ArtworkFilter::FullColor => "none".to_string(),
            ArtworkFilter::Grayscale(percent) => format!("grayscale({percent}%)"),
        }
    }
}

/// Action offered by the card button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardAction {
    /// Launch (or stop) the installed game.
    Play,
    /// Start installing the game.
    Install,
}

/// Everything the rendering layer needs to draw a card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardView {
    /// Overlay text: transfer percent, `Moving...` or `Repairing...`.
    pub badge: Option<String>,
    /// Treatment of the artwork.
    pub artwork: ArtworkFilter,
    /// Button action.
    pub action: CardAction,
}
