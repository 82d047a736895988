use crate::audio::AudioSink;
use crate::model::Theme;
use crate::session::PlaybackSession;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use std::time::Duration;

const APP_TITLE: &str = "Supersonic  ";

/// What the input line at the bottom is currently collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
    Command,
}

#[derive(Clone, Copy)]
struct ThemePalette {
    bg: Color,
    panel_bg: Color,
    panel_alt_bg: Color,
    border: Color,
    text: Color,
    muted: Color,
    accent: Color,
    alert: Color,
    selected_bg: Color,
}

fn palette(theme: Theme) -> ThemePalette {
    match theme {
        Theme::Dark => ThemePalette {
            bg: Color::Rgb(10, 15, 24),
            panel_bg: Color::Rgb(19, 29, 43),
            panel_alt_bg: Color::Rgb(24, 38, 58),
            border: Color::Rgb(69, 121, 176),
            text: Color::Rgb(214, 228, 248),
            muted: Color::Rgb(149, 173, 204),
            accent: Color::Rgb(100, 203, 184),
            alert: Color::Rgb(249, 174, 88),
            selected_bg: Color::Rgb(34, 55, 82),
        },
        Theme::Light => ThemePalette {
            bg: Color::Rgb(240, 243, 248),
            panel_bg: Color::Rgb(225, 231, 240),
            panel_alt_bg: Color::Rgb(212, 221, 234),
            border: Color::Rgb(96, 130, 170),
            text: Color::Rgb(28, 38, 52),
            muted: Color::Rgb(92, 110, 134),
            accent: Color::Rgb(15, 118, 110),
            alert: Color::Rgb(176, 98, 7),
            selected_bg: Color::Rgb(188, 203, 224),
        },
    }
}

/// Rect of the playlist list; the app loop uses it to scope mouse scrolling.
pub fn playlist_rect(area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(area);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(vertical[1]);

    body[0]
}

pub fn draw(
    frame: &mut Frame,
    session: &PlaybackSession,
    sink: &dyn AudioSink,
    selected: usize,
    input_mode: InputMode,
    input_buffer: &str,
) {
    let colors = palette(session.theme());
    frame.render_widget(
        Block::default().style(Style::default().bg(colors.bg)),
        frame.area(),
    );

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    draw_header(frame, session, &colors, vertical[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(vertical[1]);

    draw_playlist(frame, session, &colors, selected, body[0]);
    draw_now_playing(frame, session, &colors, body[1]);

    let timeline = Paragraph::new(Span::styled(
        timeline_line(sink, 26, 14),
        Style::default().fg(colors.text),
    ))
    .block(panel_block(
        "Timeline",
        colors.panel_bg,
        colors.text,
        colors.border,
    ))
    .wrap(Wrap { trim: true });
    frame.render_widget(timeline, vertical[2]);

    draw_footer(frame, session, &colors, input_mode, input_buffer, vertical[3]);
}

fn draw_header(frame: &mut Frame, session: &PlaybackSession, colors: &ThemePalette, area: Rect) {
    frame.render_widget(
        panel_block("Status", colors.panel_bg, colors.text, colors.border),
        area,
    );
    let inner = area.inner(Margin {
        vertical: 0,
        horizontal: 1,
    });
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(inner);

    let left = Paragraph::new(Line::from(vec![
        Span::styled(
            APP_TITLE,
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("Tracks {}", session.catalog().len()),
            Style::default().fg(colors.text),
        ),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(
            format!("Loop {}", session.loop_mode().label()),
            Style::default().fg(colors.alert),
        ),
    ]));
    frame.render_widget(left, chunks[0]);

    let mut flags = Vec::new();
    if session.shuffle_on() {
        flags.push("Shuffle");
    }
    if session.enhancer_on() {
        flags.push("Enhancer");
    }
    if session.volume() == 0.0 {
        flags.push("Muted");
    }
    let right = Paragraph::new(Span::styled(
        flags.join("  "),
        Style::default()
            .fg(colors.accent)
            .add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Right);
    frame.render_widget(right, chunks[1]);
}

fn draw_playlist(
    frame: &mut Frame,
    session: &PlaybackSession,
    colors: &ThemePalette,
    selected: usize,
    area: Rect,
) {
    let active = session.active_position();
    let items: Vec<ListItem> = session
        .view()
        .iter()
        .enumerate()
        .filter_map(|(position, id)| {
            let track = session.catalog().get(*id)?;
            let marker = if active == Some(position) {
                "  > "
            } else {
                "    "
            };
            Some(ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(colors.muted)),
                Span::styled(track.title.as_str(), Style::default().fg(colors.text)),
                Span::styled(
                    format!("  {}", track.artist_label()),
                    Style::default().fg(colors.muted),
                ),
            ])))
        })
        .collect();

    let mut state = ListState::default();
    state.select((!session.view().is_empty()).then(|| selected.min(session.view().len() - 1)));

    let title = if session.search().is_empty() {
        format!("Playlist ({})", session.view().len())
    } else {
        format!(
            "Playlist ({}) / \"{}\"",
            session.view().len(),
            session.search()
        )
    };

    let list = List::new(items)
        .block(panel_block(&title, colors.panel_bg, colors.text, colors.border))
        .highlight_style(
            Style::default()
                .bg(colors.selected_bg)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("-> ");
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_now_playing(
    frame: &mut Frame,
    session: &PlaybackSession,
    colors: &ThemePalette,
    area: Rect,
) {
    let title = session
        .current_track()
        .map(|track| track.title.clone())
        .unwrap_or_else(|| String::from("-"));
    let artist = session
        .current_track()
        .map(|track| track.artist_label().to_string())
        .unwrap_or_else(|| String::from("-"));
    let art = session
        .current_track()
        .and_then(|track| track.art.as_ref())
        .map(|art| format!("cover ({})", art.mime))
        .unwrap_or_else(|| String::from("no cover"));
    let state = if session.is_playing() {
        "Playing"
    } else {
        "Paused"
    };

    let lines = vec![
        Line::from(vec![
            Span::styled(
                "Now",
                Style::default()
                    .fg(colors.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  {title}"), Style::default().fg(colors.text)),
        ]),
        Line::from(Span::styled(
            format!("Artist  {artist}"),
            Style::default().fg(colors.muted),
        )),
        Line::from(Span::styled(
            format!("Art     {art}"),
            Style::default().fg(colors.muted),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!("State   {state}"),
            Style::default().fg(colors.alert),
        )),
        Line::from(Span::styled(
            format!(
                "Volume  {:>3}%",
                (session.volume() * 100.0).round() as u16
            ),
            Style::default().fg(colors.muted),
        )),
    ];
    let block = Paragraph::new(lines)
        .block(panel_block(
            "Now Playing",
            colors.panel_alt_bg,
            colors.text,
            colors.border,
        ))
        .wrap(Wrap { trim: true });
    frame.render_widget(block, area);
}

fn draw_footer(
    frame: &mut Frame,
    session: &PlaybackSession,
    colors: &ThemePalette,
    input_mode: InputMode,
    input_buffer: &str,
    area: Rect,
) {
    let line = match input_mode {
        InputMode::Search => Line::from(vec![
            Span::styled(
                "/",
                Style::default()
                    .fg(colors.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(input_buffer, Style::default().fg(colors.text)),
            Span::styled("_", Style::default().fg(colors.muted)),
        ]),
        InputMode::Command => Line::from(vec![
            Span::styled(
                ":",
                Style::default()
                    .fg(colors.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(input_buffer, Style::default().fg(colors.text)),
            Span::styled("_", Style::default().fg(colors.muted)),
        ]),
        InputMode::Normal => Line::from(vec![
            Span::styled(
                "Keys: Space play/pause, n/b next/prev, s shuffle, l loop, e enhancer, m mute, t theme, / search, : command, Ctrl+C quit",
                Style::default().fg(colors.muted),
            ),
            Span::styled("  |  ", Style::default().fg(colors.muted)),
            Span::styled(session.status.as_str(), Style::default().fg(colors.text)),
        ]),
    };

    let footer = Paragraph::new(line).block(panel_block(
        "Message",
        colors.panel_bg,
        colors.text,
        colors.border,
    ));
    frame.render_widget(footer, area);
}

fn panel_block(title: &str, bg: Color, text: Color, border: Color) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(text).add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(bg))
}

fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{minutes:02}:{seconds:02}")
}

fn progress_bar(ratio: Option<f64>, width: usize) -> String {
    let clamped = ratio.unwrap_or(0.0).clamp(0.0, 1.0);
    let filled = (clamped * width as f64).round() as usize;
    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    bar.push_str(&"#".repeat(filled));
    bar.push_str(&"-".repeat(width.saturating_sub(filled)));
    bar.push(']');
    bar
}

fn timeline_line(sink: &dyn AudioSink, timeline_bar_width: usize, volume_bar_width: usize) -> String {
    let elapsed = sink.position().unwrap_or(Duration::ZERO);
    let total = sink.duration();
    let ratio = total.and_then(|duration| {
        let total_secs = duration.as_secs_f64();
        (total_secs > 0.0).then_some((elapsed.as_secs_f64() / total_secs).clamp(0.0, 1.0))
    });

    let volume_percent = (sink.volume() * 100.0).round() as u16;
    let volume_ratio = sink.volume().clamp(0.0, 1.0) as f64;

    format!(
        "{} / {} {}  |  Vol {} {:>3}%  +/- adjust, 0-9 seek",
        format_duration(elapsed),
        total
            .map(format_duration)
            .unwrap_or_else(|| String::from("--:--")),
        progress_bar(ratio, timeline_bar_width),
        progress_bar(Some(volume_ratio), volume_bar_width),
        volume_percent
    )
}
