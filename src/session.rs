use crate::audio::AudioSink;
use crate::library;
use crate::model::{LoopMode, Settings, Theme, Track, TrackId};
use crate::view::{self, Order};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use std::path::{Path, PathBuf};

/// The closed set of inputs the player reacts to. UI bindings translate key
/// presses into these; tests drive the session with them directly.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Pause,
    TogglePlay,
    Next,
    Previous,
    Seek(f32),
    SetVolume(f32),
    ToggleMute,
    ToggleShuffle,
    ToggleLoop,
    ToggleEnhancer,
    ToggleTheme,
    Search(String),
    Activate(TrackId),
    LoadFolder(PathBuf),
}

/// Single authority over "what track is current and is it playing". Owns the
/// catalog, the derived view list, and every transport/preference flag; all
/// mutation goes through `dispatch`.
#[derive(Debug)]
pub struct PlaybackSession {
    catalog: Vec<Track>,
    view: Vec<TrackId>,
    shuffle_order: Vec<TrackId>,
    current: Option<TrackId>,
    is_playing: bool,
    loop_mode: LoopMode,
    volume: f32,
    last_volume: f32,
    enhancer_on: bool,
    shuffle_on: bool,
    theme: Theme,
    search: String,
    rng: SmallRng,
    pub status: String,
    pub dirty: bool,
    settings_dirty: bool,
}

impl PlaybackSession {
    pub fn from_settings(settings: Settings) -> Self {
        let volume = settings.volume.clamp(0.0, 1.0);
        Self {
            catalog: Vec::new(),
            view: Vec::new(),
            shuffle_order: Vec::new(),
            current: None,
            is_playing: false,
            loop_mode: settings.loop_mode,
            volume,
            last_volume: if volume > 0.0 { volume } else { 1.0 },
            enhancer_on: settings.is_enhancer_on,
            shuffle_on: settings.is_shuffle,
            theme: settings.theme,
            search: String::new(),
            rng: SmallRng::from_os_rng(),
            status: String::from("Ready"),
            dirty: true,
            settings_dirty: false,
        }
    }

    pub fn dispatch(&mut self, command: Command, sink: &mut dyn AudioSink) {
        match command {
            Command::Play => self.play(sink),
            Command::Pause => self.pause(sink),
            Command::TogglePlay => {
                if self.is_playing {
                    self.pause(sink);
                } else {
                    self.play(sink);
                }
            }
            Command::Next => self.next(sink),
            Command::Previous => self.previous(sink),
            Command::Seek(fraction) => self.seek(fraction, sink),
            Command::SetVolume(volume) => self.set_volume(volume, sink),
            Command::ToggleMute => self.toggle_mute(sink),
            Command::ToggleShuffle => self.toggle_shuffle(),
            Command::ToggleLoop => self.toggle_loop(),
            Command::ToggleEnhancer => self.toggle_enhancer(sink),
            Command::ToggleTheme => self.toggle_theme(),
            Command::Search(term) => self.set_search(term),
            Command::Activate(id) => self.activate(id, sink),
            Command::LoadFolder(path) => self.load_folder(&path, sink),
        }
    }

    /// End-of-track auto-advance; runs the same transition table as `Next`.
    pub fn auto_advance(&mut self, sink: &mut dyn AudioSink) {
        if self.is_playing && sink.is_finished() {
            self.next(sink);
        }
    }

    /// Replaces the catalog wholesale. The previous id space dies with it;
    /// the first track of the new catalog is loaded paused.
    pub fn install_catalog(&mut self, tracks: Vec<Track>, sink: &mut dyn AudioSink) {
        sink.stop();
        self.is_playing = false;
        self.catalog = tracks;
        if self.shuffle_on {
            self.reshuffle();
        } else {
            self.shuffle_order.clear();
        }
        self.reproject();

        self.current = self.catalog.first().map(|track| track.id);
        if let Some(id) = self.current {
            let source = self.catalog[id].source.clone();
            if let Err(err) = sink.load(&source) {
                self.set_status(&format!("playback failed: {err:#}"));
            }
        }
        self.dirty = true;
    }

    fn load_folder(&mut self, path: &Path, sink: &mut dyn AudioSink) {
        let tracks = library::scan_folder(path);
        if tracks.is_empty() {
            // Keep the previous catalog and playback state untouched.
            self.set_status("No audio files found");
            return;
        }
        let count = tracks.len();
        self.install_catalog(tracks, sink);
        self.set_status(&format!("Loaded {count} tracks"));
    }

    fn load(&mut self, id: TrackId, sink: &mut dyn AudioSink) {
        let Some(track) = self.catalog.get(id) else {
            self.set_status("Track not found");
            return;
        };
        let source = track.source.clone();
        self.current = Some(id);
        if let Err(err) = sink.load(&source) {
            self.set_status(&format!("playback failed: {err:#}"));
        }
        self.dirty = true;
    }

    fn play(&mut self, sink: &mut dyn AudioSink) {
        if self.catalog.is_empty() {
            return;
        }
        if self.current.is_none() {
            let Some(first) = self.view.first().copied() else {
                return;
            };
            self.load(first, sink);
        }
        match sink.play() {
            Ok(()) => {
                self.is_playing = true;
                self.dirty = true;
            }
            Err(err) => {
                self.is_playing = false;
                self.set_status(&format!("playback failed: {err:#}"));
            }
        }
    }

    fn pause(&mut self, sink: &mut dyn AudioSink) {
        sink.pause();
        self.is_playing = false;
        self.dirty = true;
    }

    fn next(&mut self, sink: &mut dyn AudioSink) {
        if self.view.is_empty() {
            return;
        }

        if self.loop_mode == LoopMode::One
            && self.is_playing
            && let Some(id) = self.current
        {
            // Explicit reload rather than native looping.
            self.load(id, sink);
            self.play(sink);
            return;
        }

        let position = view::active_position(&self.view, self.current);
        let next = position.map_or(0, |current| current + 1);
        if next < self.view.len() {
            self.load(self.view[next], sink);
            self.play(sink);
        } else if self.loop_mode == LoopMode::All {
            self.load(self.view[0], sink);
            self.play(sink);
        } else {
            // End of the list: park on the first track, paused at 0:00.
            self.load(self.view[0], sink);
            self.pause(sink);
        }
    }

    fn previous(&mut self, sink: &mut dyn AudioSink) {
        if self.view.is_empty() {
            return;
        }
        let position = view::active_position(&self.view, self.current).unwrap_or(0);
        let previous = if position == 0 {
            self.view.len() - 1
        } else {
            position - 1
        };
        self.load(self.view[previous], sink);
        self.play(sink);
    }

    fn seek(&mut self, fraction: f32, sink: &mut dyn AudioSink) {
        let Some(duration) = sink.duration() else {
            // Metadata not loaded yet; nothing to map the fraction onto.
            return;
        };
        let fraction = fraction.clamp(0.0, 1.0);
        if let Err(err) = sink.seek_to(duration.mul_f32(fraction)) {
            self.set_status(&format!("seek failed: {err:#}"));
        }
        self.dirty = true;
    }

    fn set_volume(&mut self, volume: f32, sink: &mut dyn AudioSink) {
        self.volume = volume.clamp(0.0, 1.0);
        if self.volume > 0.0 {
            self.last_volume = self.volume;
        }
        sink.set_volume(self.volume);
        self.settings_dirty = true;
        self.dirty = true;
    }

    fn toggle_mute(&mut self, sink: &mut dyn AudioSink) {
        if self.volume > 0.0 {
            self.last_volume = self.volume;
            self.volume = 0.0;
            self.set_status("Muted");
        } else {
            self.volume = self.last_volume.clamp(0.0, 1.0);
            self.set_status(&format!(
                "Volume: {}%",
                (self.volume * 100.0).round() as u16
            ));
        }
        sink.set_volume(self.volume);
        self.settings_dirty = true;
        self.dirty = true;
    }

    fn toggle_shuffle(&mut self) {
        self.shuffle_on = !self.shuffle_on;
        if self.shuffle_on {
            self.reshuffle();
        }
        // The cursor follows the current track's identity through the new
        // order; only the enclosing order changes.
        self.reproject();
        self.settings_dirty = true;
        self.set_status(if self.shuffle_on {
            "Shuffle on"
        } else {
            "Shuffle off"
        });
    }

    fn toggle_loop(&mut self) {
        self.loop_mode = self.loop_mode.next();
        self.settings_dirty = true;
        self.set_status(&format!("Loop: {}", self.loop_mode.label()));
    }

    fn toggle_enhancer(&mut self, sink: &mut dyn AudioSink) {
        let enabled = !self.enhancer_on;
        match sink.set_enhancer(enabled) {
            Ok(()) => {
                self.enhancer_on = enabled;
                self.set_status(if enabled {
                    "Enhancer on"
                } else {
                    "Enhancer off"
                });
            }
            Err(err) => {
                self.enhancer_on = false;
                let _ = sink.set_enhancer(false);
                self.set_status(&format!("enhancer unavailable: {err:#}"));
            }
        }
        self.settings_dirty = true;
        self.dirty = true;
    }

    fn toggle_theme(&mut self) {
        self.theme = self.theme.toggle();
        self.settings_dirty = true;
        self.dirty = true;
    }

    fn set_search(&mut self, term: String) {
        self.search = term;
        self.reproject();
    }

    fn activate(&mut self, id: TrackId, sink: &mut dyn AudioSink) {
        if id >= self.catalog.len() {
            self.set_status("Track not found");
            return;
        }
        self.load(id, sink);
        self.play(sink);
    }

    fn reshuffle(&mut self) {
        self.shuffle_order = (0..self.catalog.len()).collect();
        self.shuffle_order.shuffle(&mut self.rng);
    }

    fn reproject(&mut self) {
        let order = if self.shuffle_on {
            Order::Shuffled(&self.shuffle_order)
        } else {
            Order::Catalog
        };
        self.view = view::project(&self.catalog, order, &self.search);
        self.dirty = true;
    }

    fn set_status(&mut self, message: &str) {
        self.status = message.to_string();
        self.dirty = true;
    }

    pub fn settings(&self) -> Settings {
        Settings {
            theme: self.theme,
            volume: self.volume,
            is_enhancer_on: self.enhancer_on,
            loop_mode: self.loop_mode,
            is_shuffle: self.shuffle_on,
        }
    }

    /// True once per batch of preference changes; the app loop persists the
    /// snapshot when it sees it.
    pub fn take_settings_dirty(&mut self) -> bool {
        std::mem::take(&mut self.settings_dirty)
    }

    pub fn catalog(&self) -> &[Track] {
        &self.catalog
    }

    pub fn view(&self) -> &[TrackId] {
        &self.view
    }

    pub fn current(&self) -> Option<TrackId> {
        self.current
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.and_then(|id| self.catalog.get(id))
    }

    pub fn active_position(&self) -> Option<usize> {
        view::active_position(&self.view, self.current)
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn shuffle_on(&self) -> bool {
        self.shuffle_on
    }

    pub fn enhancer_on(&self) -> bool {
        self.enhancer_on
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn search(&self) -> &str {
        &self.search
    }
}
