#![no_main]

use libfuzzer_sys::fuzz_target;
use std::path::PathBuf;
use supersonic::audio::NullSink;
use supersonic::model::{Settings, Track};
use supersonic::session::{Command, PlaybackSession};

fuzz_target!(|data: &[u8]| {
    let mut session = PlaybackSession::from_settings(Settings::default());
    let mut sink = NullSink::new();

    let len = (data.len() % 32).max(1);
    let catalog: Vec<Track> = (0..len)
        .map(|id| Track {
            id,
            source: PathBuf::from(format!("track_{id}.mp3")),
            title: format!("track {id}"),
            artist: (id % 3 == 0).then(|| format!("artist {id}")),
            art: None,
        })
        .collect();
    session.install_catalog(catalog, &mut sink);

    for byte in data {
        let command = match byte % 13 {
            0 => Command::Play,
            1 => Command::Pause,
            2 => Command::TogglePlay,
            3 => Command::Next,
            4 => Command::Previous,
            5 => Command::Seek(f32::from(*byte) / 255.0),
            6 => Command::SetVolume(f32::from(*byte) / 255.0),
            7 => Command::ToggleMute,
            8 => Command::ToggleShuffle,
            9 => Command::ToggleLoop,
            10 => Command::ToggleTheme,
            11 => Command::Search(format!("{}", byte % 10)),
            _ => Command::Activate(usize::from(*byte)),
        };
        session.dispatch(command, &mut sink);

        if let Some(id) = session.current() {
            assert!(id < session.catalog().len());
        }
        assert!(session.view().iter().all(|id| *id < session.catalog().len()));
        assert!((0.0..=1.0).contains(&session.volume()));
    }
});
