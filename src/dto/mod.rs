/// Card data and its rendered view.
pub mod card;
/// Game status and transfer progress.
pub mod status;
