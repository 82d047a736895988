use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Stable index into the catalog the track was ingested into. Ids are only
/// meaningful for the catalog generation that produced them; replacing the
/// catalog replaces the id space.
pub type TrackId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverArt {
    pub mime: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: TrackId,
    pub source: PathBuf,
    pub title: String,
    pub artist: Option<String>,
    pub art: Option<CoverArt>,
}

impl Track {
    pub fn artist_label(&self) -> &str {
        self.artist.as_deref().unwrap_or("Unknown Artist")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LoopMode {
    #[default]
    None,
    All,
    One,
}

impl LoopMode {
    pub fn next(self) -> Self {
        match self {
            Self::None => Self::All,
            Self::All => Self::One,
            Self::One => Self::None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::None => "off",
            Self::All => "all",
            Self::One => "one",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggle(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub is_enhancer_on: bool,
    #[serde(default)]
    pub loop_mode: LoopMode,
    #[serde(default)]
    pub is_shuffle: bool,
}

fn default_volume() -> f32 {
    0.5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            volume: default_volume(),
            is_enhancer_on: false,
            loop_mode: LoopMode::default(),
            is_shuffle: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_mode_cycles_none_all_one() {
        assert_eq!(LoopMode::None.next(), LoopMode::All);
        assert_eq!(LoopMode::All.next(), LoopMode::One);
        assert_eq!(LoopMode::One.next(), LoopMode::None);
    }

    #[test]
    fn settings_tolerate_missing_fields() {
        let settings: Settings = serde_json::from_str(r#"{"theme":"Light"}"#).expect("parse");
        assert_eq!(settings.theme, Theme::Light);
        assert_eq!(settings.volume, 0.5);
        assert_eq!(settings.loop_mode, LoopMode::None);
        assert!(!settings.is_shuffle);
    }

    #[test]
    fn missing_artist_renders_placeholder() {
        let track = Track {
            id: 0,
            source: PathBuf::from("a.mp3"),
            title: String::from("a"),
            artist: None,
            art: None,
        };
        assert_eq!(track.artist_label(), "Unknown Artist");
    }
}
