// Audio playback module
// Symphonia decode, rubato rate conversion, cpal output

pub mod decoder;
pub mod output;
pub mod player;
pub mod resample;

pub use player::{Player, PlayerEvent};
