use crate::audio::{AudioSink, NullSink, RodioSink};
use crate::config;
use crate::model::Settings;
use crate::session::{Command, PlaybackSession};
use crate::ui::{self, InputMode};
use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::stdout;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct AppOptions {
    pub folder: Option<PathBuf>,
    pub no_audio: bool,
}

pub fn run(options: AppOptions) -> Result<()> {
    let (settings, settings_note) = match config::load_settings() {
        Ok(settings) => (settings, None),
        Err(err) => (
            Settings::default(),
            Some(format!("settings unreadable, using defaults: {err:#}")),
        ),
    };
    let mut session = PlaybackSession::from_settings(settings);
    if let Some(note) = settings_note {
        session.status = note;
    }

    let mut sink: Box<dyn AudioSink> = if options.no_audio {
        Box::new(NullSink::new())
    } else {
        match RodioSink::new() {
            Ok(sink) => Box::new(sink),
            Err(_) => Box::new(NullSink::new()),
        }
    };
    sink.set_volume(session.volume());
    restore_enhancer(&mut session, &mut *sink);

    if let Some(folder) = options.folder {
        session.dispatch(Command::LoadFolder(folder), &mut *sink);
    }

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut selected = 0usize;
    let mut input_mode = InputMode::Normal;
    let mut input_buffer = String::new();
    let mut last_tick = Instant::now();
    let mut playlist_rect = ratatui::prelude::Rect::default();

    let result: Result<()> = loop {
        session.auto_advance(&mut *sink);
        persist_if_dirty(&mut session);

        if session.dirty || last_tick.elapsed() > Duration::from_millis(250) {
            selected = clamp_selection(&session, selected);
            terminal.draw(|frame| {
                playlist_rect = ui::playlist_rect(frame.area());
                ui::draw(frame, &session, &*sink, selected, input_mode, &input_buffer);
            })?;
            session.dirty = false;
            last_tick = Instant::now();
        }

        if !event::poll(Duration::from_millis(33))? {
            continue;
        }

        let event = event::read()?;
        if let Event::Mouse(mouse) = event {
            handle_mouse(&mut session, &mut selected, mouse, playlist_rect);
            continue;
        }

        let Event::Key(key) = event else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match input_mode {
            InputMode::Search => match key.code {
                KeyCode::Esc => {
                    input_mode = InputMode::Normal;
                    input_buffer.clear();
                    session.dispatch(Command::Search(String::new()), &mut *sink);
                }
                KeyCode::Enter => {
                    input_mode = InputMode::Normal;
                    input_buffer.clear();
                    session.dirty = true;
                }
                KeyCode::Backspace => {
                    input_buffer.pop();
                    session.dispatch(Command::Search(input_buffer.clone()), &mut *sink);
                }
                KeyCode::Char(ch) => {
                    input_buffer.push(ch);
                    // The playlist narrows as the query is typed.
                    session.dispatch(Command::Search(input_buffer.clone()), &mut *sink);
                }
                _ => {}
            },
            InputMode::Command => match key.code {
                KeyCode::Esc => {
                    input_mode = InputMode::Normal;
                    input_buffer.clear();
                    session.dirty = true;
                }
                KeyCode::Enter => {
                    run_command(&mut session, &mut *sink, &input_buffer);
                    input_mode = InputMode::Normal;
                    input_buffer.clear();
                }
                KeyCode::Backspace => {
                    input_buffer.pop();
                    session.dirty = true;
                }
                KeyCode::Char(ch) => {
                    input_buffer.push(ch);
                    session.dirty = true;
                }
                _ => {}
            },
            InputMode::Normal => match key.code {
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    break Ok(());
                }
                KeyCode::Down => {
                    selected = next_selection(&session, selected);
                    session.dirty = true;
                }
                KeyCode::Up => {
                    selected = selected.saturating_sub(1);
                    session.dirty = true;
                }
                KeyCode::Enter => {
                    if let Some(id) = session.view().get(selected).copied() {
                        session.dispatch(Command::Activate(id), &mut *sink);
                    }
                }
                KeyCode::Char(' ') => session.dispatch(Command::TogglePlay, &mut *sink),
                KeyCode::Char('n') => session.dispatch(Command::Next, &mut *sink),
                KeyCode::Char('b') => session.dispatch(Command::Previous, &mut *sink),
                KeyCode::Char('s') => session.dispatch(Command::ToggleShuffle, &mut *sink),
                KeyCode::Char('l') => session.dispatch(Command::ToggleLoop, &mut *sink),
                KeyCode::Char('e') => session.dispatch(Command::ToggleEnhancer, &mut *sink),
                KeyCode::Char('m') => session.dispatch(Command::ToggleMute, &mut *sink),
                KeyCode::Char('t') => session.dispatch(Command::ToggleTheme, &mut *sink),
                KeyCode::Char('+') | KeyCode::Char('=') => {
                    let next = session.volume() + 0.05;
                    session.dispatch(Command::SetVolume(next), &mut *sink);
                }
                KeyCode::Char('-') => {
                    let next = session.volume() - 0.05;
                    session.dispatch(Command::SetVolume(next), &mut *sink);
                }
                KeyCode::Char(ch @ '0'..='9') => {
                    let fraction = (ch as u8 - b'0') as f32 / 10.0;
                    session.dispatch(Command::Seek(fraction), &mut *sink);
                }
                KeyCode::Char('/') => {
                    input_mode = InputMode::Search;
                    input_buffer = session.search().to_string();
                    session.dirty = true;
                }
                KeyCode::Char(':') => {
                    input_mode = InputMode::Command;
                    input_buffer.clear();
                    session.dirty = true;
                }
                _ => {}
            },
        }
    };

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    let save_result = config::save_settings(&session.settings());
    result?;
    save_result?;
    Ok(())
}

fn restore_enhancer(session: &mut PlaybackSession, sink: &mut dyn AudioSink) {
    if !session.enhancer_on() {
        return;
    }
    if sink.set_enhancer(true).is_err() {
        // The sink has no filter graph; drop the restored preference so the
        // header flag and persisted settings match what is actually running.
        session.dispatch(Command::ToggleEnhancer, sink);
        session.status = String::from("enhancer unavailable");
        session.dirty = true;
    }
}

fn persist_if_dirty(session: &mut PlaybackSession) {
    if session.take_settings_dirty()
        && let Err(err) = config::save_settings(&session.settings())
    {
        session.status = format!("save error: {err:#}");
        session.dirty = true;
    }
}

fn clamp_selection(session: &PlaybackSession, selected: usize) -> usize {
    let len = session.view().len();
    if len == 0 { 0 } else { selected.min(len - 1) }
}

fn next_selection(session: &PlaybackSession, selected: usize) -> usize {
    let len = session.view().len();
    if len == 0 {
        0
    } else {
        (selected + 1).min(len - 1)
    }
}

fn handle_mouse(
    session: &mut PlaybackSession,
    selected: &mut usize,
    mouse: MouseEvent,
    playlist_rect: ratatui::prelude::Rect,
) {
    let inside_playlist = point_in_rect(mouse.column, mouse.row, playlist_rect);
    match mouse.kind {
        MouseEventKind::ScrollDown if inside_playlist => {
            *selected = next_selection(session, *selected);
            session.dirty = true;
        }
        MouseEventKind::ScrollUp if inside_playlist => {
            *selected = selected.saturating_sub(1);
            session.dirty = true;
        }
        _ => {}
    }
}

fn point_in_rect(x: u16, y: u16, rect: ratatui::prelude::Rect) -> bool {
    if rect.width == 0 || rect.height == 0 {
        return false;
    }
    x >= rect.x
        && x < rect.x.saturating_add(rect.width)
        && y >= rect.y
        && y < rect.y.saturating_add(rect.height)
}

fn run_command(session: &mut PlaybackSession, sink: &mut dyn AudioSink, raw: &str) {
    let input = raw.trim();
    if input.is_empty() {
        session.status = String::from("No command");
        session.dirty = true;
        return;
    }

    let mut split = input.splitn(2, char::is_whitespace);
    let command = split.next().unwrap_or_default();
    let rest = split.next().unwrap_or("").trim();

    match command {
        "help" => {
            session.status =
                String::from("Commands: open <folder> | volume <0-100> | save | help");
            session.dirty = true;
        }
        "open" => {
            if rest.is_empty() {
                session.status = String::from("Usage: open <folder>");
                session.dirty = true;
            } else {
                session.dispatch(Command::LoadFolder(PathBuf::from(rest)), sink);
            }
        }
        "volume" => match rest.parse::<u16>() {
            Ok(percent) if percent <= 100 => {
                session.dispatch(Command::SetVolume(f32::from(percent) / 100.0), sink);
                session.status = format!("Volume: {percent}%");
                session.dirty = true;
            }
            _ => {
                session.status = String::from("Usage: volume <0-100>");
                session.dirty = true;
            }
        },
        "save" => {
            if let Err(err) = config::save_settings(&session.settings()) {
                session.status = format!("save error: {err:#}");
            } else {
                session.status = String::from("Settings saved");
            }
            session.dirty = true;
        }
        _ => {
            session.status = String::from("Unknown command. Use :help");
            session.dirty = true;
        }
    }
}
