use crate::dto::{
    card::{ArtworkFilter, CardAction, CardView},
    status::{GameActivity, Progress},
};

/// Grayscale intensity of artwork for a game that is neither installed nor installing.
const FULL_GRAYSCALE: f64 = 100.0;
/// Grayscale intensity at 0% progress; it fades by one point per percent transferred.
const TRANSFER_GRAYSCALE_BASE: f64 = 150.0;

/// Derive how a card is drawn from the game status and its latest progress.
pub fn present(status: Option<GameActivity>, progress: &Progress, is_installed: bool) -> CardView {
    let transferring = status.is_some_and(GameActivity::is_transferring);

    let badge = match status {
        Some(GameActivity::Installing | GameActivity::Updating) => Some(progress.percent.clone()),
        Some(GameActivity::Moving) => Some("Moving...".to_string()),
        Some(GameActivity::Repairing) => Some("Repairing...".to_string()),
        _ => None,
    };

    let artwork = if is_installed {
        ArtworkFilter::FullColor
    } else if transferring {
        let percent = progress.percent_value().unwrap_or(0.0).clamp(0.0, 100.0);
        ArtworkFilter::Grayscale(TRANSFER_GRAYSCALE_BASE - percent)
    } else {
        ArtworkFilter::Grayscale(FULL_GRAYSCALE)
    };

    let action = if is_installed {
        CardAction::Play
    } else {
        CardAction::Install
    };

    CardView {
        badge,
        artwork,
        action,
    }
}
