use std::path::PathBuf;
use supersonic::audio::{AudioSink, NullSink};
use supersonic::model::{LoopMode, Settings, Track};
use supersonic::session::{Command, PlaybackSession};

fn catalog(titles: &[&str]) -> Vec<Track> {
    titles
        .iter()
        .enumerate()
        .map(|(id, title)| Track {
            id,
            source: PathBuf::from(format!("{title}.mp3")),
            title: title.to_string(),
            artist: None,
            art: None,
        })
        .collect()
}

fn session(titles: &[&str]) -> (PlaybackSession, NullSink) {
    let mut session = PlaybackSession::from_settings(Settings::default());
    let mut sink = NullSink::new();
    session.install_catalog(catalog(titles), &mut sink);
    (session, sink)
}

#[test]
fn full_listen_through_with_loop_all() {
    let (mut session, mut sink) = session(&["a", "b", "c"]);
    session.dispatch(Command::ToggleLoop, &mut sink);
    assert_eq!(session.loop_mode(), LoopMode::All);

    session.dispatch(Command::Play, &mut sink);
    let mut visited = vec![session.current().unwrap()];
    for _ in 0..3 {
        session.dispatch(Command::Next, &mut sink);
        visited.push(session.current().unwrap());
    }

    assert_eq!(visited, vec![0, 1, 2, 0]);
    assert!(session.is_playing());
}

#[test]
fn reaching_the_end_without_loop_rewinds_and_pauses() {
    let (mut session, mut sink) = session(&["a", "b"]);
    session.dispatch(Command::Activate(1), &mut sink);

    session.dispatch(Command::Next, &mut sink);

    assert_eq!(session.current(), Some(0));
    assert!(!session.is_playing());
    assert!(sink.is_paused());
    assert_eq!(sink.position(), Some(std::time::Duration::ZERO));
}

#[test]
fn loop_one_keeps_replaying_while_playing_only() {
    let (mut session, mut sink) = session(&["a", "b"]);
    session.dispatch(Command::ToggleLoop, &mut sink); // all
    session.dispatch(Command::ToggleLoop, &mut sink); // one
    session.dispatch(Command::Play, &mut sink);

    session.dispatch(Command::Next, &mut sink);
    assert_eq!(session.current(), Some(0));

    session.dispatch(Command::Pause, &mut sink);
    session.dispatch(Command::Next, &mut sink);
    assert_eq!(session.current(), Some(1));
}

#[test]
fn previous_always_wraps_and_plays() {
    let (mut session, mut sink) = session(&["a", "b", "c"]);
    session.dispatch(Command::Previous, &mut sink);
    assert_eq!(session.current(), Some(2));
    assert!(session.is_playing());

    session.dispatch(Command::Previous, &mut sink);
    assert_eq!(session.current(), Some(1));
}

#[test]
fn shuffle_round_trip_restores_catalog_order_and_keeps_the_track() {
    let (mut session, mut sink) = session(&["a", "b", "c", "d", "e"]);
    session.dispatch(Command::Activate(3), &mut sink);

    session.dispatch(Command::ToggleShuffle, &mut sink);
    assert_eq!(session.current(), Some(3));
    let active = session.active_position().expect("active in shuffled view");
    assert_eq!(session.view()[active], 3);

    session.dispatch(Command::ToggleShuffle, &mut sink);
    assert_eq!(session.view(), &[0, 1, 2, 3, 4]);
    assert_eq!(session.current(), Some(3));
}

#[test]
fn search_composes_with_shuffle_and_next_stays_inside_the_filter() {
    let mut session = PlaybackSession::from_settings(Settings::default());
    let mut sink = NullSink::new();
    let mut tracks = catalog(&["night drive", "day walk", "night swim", "noon run"]);
    tracks[3].artist = Some(String::from("Night Owls"));
    session.install_catalog(tracks, &mut sink);

    session.dispatch(Command::ToggleShuffle, &mut sink);
    session.dispatch(Command::Search(String::from("night")), &mut sink);

    let mut matched = session.view().to_vec();
    matched.sort_unstable();
    assert_eq!(matched, vec![0, 2, 3], "artist matches count too");

    for _ in 0..6 {
        session.dispatch(Command::Next, &mut sink);
        assert!(session.view().contains(&session.current().unwrap()));
    }
}

#[test]
fn settings_snapshot_reflects_every_preference_toggle() {
    let (mut session, mut sink) = session(&["a"]);
    session.dispatch(Command::ToggleShuffle, &mut sink);
    session.dispatch(Command::ToggleLoop, &mut sink);
    session.dispatch(Command::ToggleEnhancer, &mut sink);
    session.dispatch(Command::ToggleTheme, &mut sink);
    session.dispatch(Command::SetVolume(0.3), &mut sink);

    let snapshot = session.settings();
    assert!(snapshot.is_shuffle);
    assert_eq!(snapshot.loop_mode, LoopMode::All);
    assert!(snapshot.is_enhancer_on);
    assert_eq!(snapshot.theme, supersonic::model::Theme::Light);
    assert!((snapshot.volume - 0.3).abs() < f32::EPSILON);
    assert!(sink.enhancer_on());
}

#[test]
fn restoring_from_settings_applies_saved_preferences() {
    let settings = Settings {
        theme: supersonic::model::Theme::Light,
        volume: 0.25,
        is_enhancer_on: true,
        loop_mode: LoopMode::One,
        is_shuffle: true,
    };
    let mut session = PlaybackSession::from_settings(settings);
    let mut sink = NullSink::new();
    session.install_catalog(catalog(&["a", "b", "c"]), &mut sink);

    assert_eq!(session.loop_mode(), LoopMode::One);
    assert!(session.shuffle_on());
    let mut order = session.view().to_vec();
    order.sort_unstable();
    assert_eq!(order, vec![0, 1, 2], "shuffled view covers the catalog");
    assert!((session.volume() - 0.25).abs() < f32::EPSILON);
}

#[test]
fn loading_an_empty_folder_keeps_the_current_catalog() {
    let (mut session, mut sink) = session(&["a", "b"]);
    session.dispatch(Command::Activate(1), &mut sink);

    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("notes.txt"), b"not audio").expect("write");
    session.dispatch(Command::LoadFolder(dir.path().to_path_buf()), &mut sink);

    assert_eq!(session.catalog().len(), 2);
    assert_eq!(session.current(), Some(1));
    assert!(session.is_playing());
    assert_eq!(session.status, "No audio files found");
}

#[test]
fn loading_a_folder_replaces_the_catalog_paused_on_the_first_track() {
    let (mut session, mut sink) = session(&["old"]);
    session.dispatch(Command::Play, &mut sink);

    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("b.mp3"), b"").expect("write");
    std::fs::write(dir.path().join("a.mp3"), b"").expect("write");
    session.dispatch(Command::LoadFolder(dir.path().to_path_buf()), &mut sink);

    assert_eq!(session.catalog().len(), 2);
    assert_eq!(session.current(), Some(0));
    assert_eq!(session.catalog()[0].title, "a");
    assert!(!session.is_playing());
}
