use anyhow::{Context, Result};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
#[cfg(unix)]
use std::ffi::CString;
use std::ffi::OsStr;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::get_probe;

pub mod enhancer;

use enhancer::BassTrebleBoost;

/// The audio output collaborator. Loading switches the source without
/// starting playback; `play`/`pause` control transport; duration may be
/// unknown until the source has been probed.
pub trait AudioSink {
    fn load(&mut self, path: &Path) -> Result<()>;
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn stop(&mut self);
    fn is_paused(&self) -> bool;
    fn position(&self) -> Option<Duration>;
    fn duration(&self) -> Option<Duration>;
    fn seek_to(&mut self, position: Duration) -> Result<()>;
    fn volume(&self) -> f32;
    fn set_volume(&mut self, volume: f32);
    fn set_enhancer(&mut self, enabled: bool) -> Result<()>;
    fn is_finished(&self) -> bool;
}

pub struct RodioSink {
    stream: OutputStream,
    sink: Sink,
    current: Option<PathBuf>,
    track_duration: Option<Duration>,
    volume: f32,
    enhancer_on: bool,
}

impl RodioSink {
    pub fn new() -> Result<Self> {
        let (stream, sink) = open_output_stream()?;
        Ok(Self {
            stream,
            sink,
            current: None,
            track_duration: None,
            volume: 1.0,
            enhancer_on: false,
        })
    }

    fn append_source(&mut self, path: &Path) -> Result<()> {
        let file =
            File::open(path).with_context(|| format!("failed to open track {}", path.display()))?;
        let source = Decoder::try_from(file)
            .with_context(|| format!("failed to decode {}", path.display()))?;
        self.track_duration = source
            .total_duration()
            .filter(|duration| !duration.is_zero())
            .or_else(|| probe_duration(path));

        if self.enhancer_on {
            self.sink.append(BassTrebleBoost::new(source));
        } else {
            self.sink.append(source);
        }
        Ok(())
    }
}

impl AudioSink for RodioSink {
    fn load(&mut self, path: &Path) -> Result<()> {
        self.sink.stop();
        self.sink = Sink::connect_new(self.stream.mixer());
        self.current = None;
        self.track_duration = None;

        self.append_source(path)?;
        self.sink.pause();
        self.sink.set_volume(self.volume);
        self.current = Some(path.to_path_buf());
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        if self.current.is_none() || self.sink.empty() {
            anyhow::bail!("no decodable track loaded");
        }
        self.sink.play();
        Ok(())
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn stop(&mut self) {
        self.sink.stop();
        self.current = None;
        self.track_duration = None;
    }

    fn is_paused(&self) -> bool {
        self.sink.is_paused()
    }

    fn position(&self) -> Option<Duration> {
        self.current.as_ref()?;
        Some(self.sink.get_pos())
    }

    fn duration(&self) -> Option<Duration> {
        self.track_duration
    }

    fn seek_to(&mut self, position: Duration) -> Result<()> {
        if self.current.is_none() {
            anyhow::bail!("no active track");
        }
        self.sink
            .try_seek(position)
            .map_err(|err| anyhow::anyhow!("failed to seek current track: {err:?}"))?;
        Ok(())
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.sink.set_volume(self.volume);
    }

    fn set_enhancer(&mut self, enabled: bool) -> Result<()> {
        if self.enhancer_on == enabled {
            return Ok(());
        }
        self.enhancer_on = enabled;

        // The filter wraps the decoder, so a live toggle rebuilds the source
        // and seeks back to where playback was.
        let Some(path) = self.current.clone() else {
            return Ok(());
        };
        let position = self.sink.get_pos();
        let was_paused = self.sink.is_paused();

        if let Err(err) = self.load(&path) {
            self.enhancer_on = !enabled;
            return Err(err);
        }
        let _ = self.sink.try_seek(position);
        if !was_paused {
            self.sink.play();
        }
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.current.is_some() && !self.sink.is_paused() && self.sink.empty()
    }
}

fn open_output_stream() -> Result<(OutputStream, Sink)> {
    let mut stream = with_silenced_stderr(|| {
        OutputStreamBuilder::from_default_device()
            .context("failed to open default system output device")
            .and_then(|builder| {
                builder
                    .with_error_callback(|_| {})
                    .open_stream_or_fallback()
                    .context("failed to start output stream")
            })
    })?;
    stream.log_on_drop(false);
    let sink = Sink::connect_new(stream.mixer());
    Ok((stream, sink))
}

/// Container-level duration probe, for sources whose decoder cannot report a
/// total duration up front.
pub fn probe_duration(path: &Path) -> Option<Duration> {
    let file = File::open(path).ok()?;
    let source = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(OsStr::to_str) {
        hint.with_extension(extension);
    }

    let probed = get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .ok()?;

    let params = &probed.format.default_track()?.codec_params;
    if let (Some(time_base), Some(frame_count)) = (params.time_base, params.n_frames) {
        let time = time_base.calc_time(frame_count);
        return Some(Duration::from_secs_f64(time.seconds as f64 + time.frac));
    }

    params
        .n_frames
        .zip(params.sample_rate)
        .filter(|(_, sample_rate)| *sample_rate > 0)
        .map(|(frame_count, sample_rate)| {
            Duration::from_secs_f64(frame_count as f64 / f64::from(sample_rate))
        })
}

#[cfg(unix)]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    let saved = unsafe { libc::dup(libc::STDERR_FILENO) };
    if saved < 0 {
        return operation();
    }

    let devnull = CString::new("/dev/null")
        .ok()
        .map(|path| unsafe { libc::open(path.as_ptr(), libc::O_WRONLY) })
        .unwrap_or(-1);

    if devnull >= 0 {
        unsafe {
            libc::dup2(devnull, libc::STDERR_FILENO);
            libc::close(devnull);
        }
    }

    let result = operation();

    unsafe {
        libc::dup2(saved, libc::STDERR_FILENO);
        libc::close(saved);
    }

    result
}

#[cfg(not(unix))]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    operation()
}

/// State-only sink: tracks a logical playback clock without an output
/// device. Used when no device can be opened and throughout the tests.
pub struct NullSink {
    current: Option<PathBuf>,
    playing: bool,
    started_at: Option<Instant>,
    position_offset: Duration,
    track_duration: Option<Duration>,
    volume: f32,
    enhancer_on: bool,
}

impl NullSink {
    pub fn new() -> Self {
        Self {
            current: None,
            playing: false,
            started_at: None,
            position_offset: Duration::ZERO,
            track_duration: None,
            volume: 1.0,
            enhancer_on: false,
        }
    }

    pub fn enhancer_on(&self) -> bool {
        self.enhancer_on
    }

    fn estimate_duration(path: &Path) -> Option<Duration> {
        let file = File::open(path).ok()?;
        let source = Decoder::try_from(file).ok()?;
        source
            .total_duration()
            .filter(|duration| !duration.is_zero())
            .or_else(|| probe_duration(path))
    }

    fn current_position(&self) -> Duration {
        let mut position = self.position_offset;
        if self.playing
            && let Some(started_at) = self.started_at
        {
            position = position.saturating_add(started_at.elapsed());
        }
        if let Some(duration) = self.track_duration {
            return position.min(duration);
        }
        position
    }
}

impl Default for NullSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSink for NullSink {
    fn load(&mut self, path: &Path) -> Result<()> {
        self.current = Some(path.to_path_buf());
        self.playing = false;
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.track_duration = Self::estimate_duration(path);
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        if self.current.is_none() {
            anyhow::bail!("no track loaded");
        }
        self.playing = true;
        self.started_at = Some(Instant::now());
        Ok(())
    }

    fn pause(&mut self) {
        self.position_offset = self.current_position();
        self.started_at = None;
        self.playing = false;
    }

    fn stop(&mut self) {
        self.current = None;
        self.playing = false;
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.track_duration = None;
    }

    fn is_paused(&self) -> bool {
        !self.playing
    }

    fn position(&self) -> Option<Duration> {
        self.current.as_ref()?;
        Some(self.current_position())
    }

    fn duration(&self) -> Option<Duration> {
        self.track_duration
    }

    fn seek_to(&mut self, position: Duration) -> Result<()> {
        if self.current.is_none() {
            anyhow::bail!("no active track");
        }
        self.position_offset = self
            .track_duration
            .map_or(position, |duration| position.min(duration));
        self.started_at = self.playing.then(Instant::now);
        Ok(())
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn set_enhancer(&mut self, enabled: bool) -> Result<()> {
        self.enhancer_on = enabled;
        Ok(())
    }

    fn is_finished(&self) -> bool {
        let Some(duration) = self.track_duration else {
            return false;
        };
        self.current.is_some() && self.playing && self.current_position() >= duration
    }
}

#[cfg(test)]
mod tests {
    use super::{AudioSink, NullSink};
    use std::path::Path;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn load_does_not_start_playback() {
        let mut sink = NullSink::new();
        sink.load(Path::new("missing-track.flac")).expect("load");
        assert!(sink.is_paused());
        assert_eq!(sink.position(), Some(Duration::ZERO));
    }

    #[test]
    fn position_advances_only_while_playing() {
        let mut sink = NullSink::new();
        sink.load(Path::new("missing-track.flac")).expect("load");
        sink.play().expect("play");
        thread::sleep(Duration::from_millis(20));

        sink.pause();
        let paused = sink.position().expect("position");
        assert!(paused > Duration::ZERO);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(sink.position(), Some(paused), "frozen while paused");

        sink.play().expect("resume");
        thread::sleep(Duration::from_millis(20));
        assert!(sink.position().expect("position") > paused);
    }

    #[test]
    fn seek_moves_the_logical_clock() {
        let mut sink = NullSink::new();
        sink.load(Path::new("missing-track.flac")).expect("load");
        sink.seek_to(Duration::from_secs(12)).expect("seek");
        assert!(sink.position().expect("position") >= Duration::from_secs(12));
    }

    #[test]
    fn play_without_a_source_is_an_error() {
        let mut sink = NullSink::new();
        assert!(sink.play().is_err());
    }

    #[test]
    fn unknown_duration_never_finishes() {
        let mut sink = NullSink::new();
        sink.load(Path::new("missing-track.flac")).expect("load");
        sink.play().expect("play");
        assert_eq!(sink.duration(), None);
        thread::sleep(Duration::from_millis(30));
        assert!(!sink.is_finished());
    }
}
