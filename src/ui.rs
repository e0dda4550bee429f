use crate::{
    activity_log::LogLevel,
    app::{App, DialogChoice, FormField, InputMode, InputPurpose, ModForm, ToastLevel},
    launcher::expand_path,
    library::{ModPath, ModRecord},
};
use anyhow::Result;
use crossterm::{
    event::{
        self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    prelude::*,
    text::{Line, Span},
    widgets::{
        Block, BorderType, Borders, Cell, Clear, Padding, Paragraph, Row, Table, TableState, Wrap,
    },
};
use std::{
    io::{self, Stdout},
    time::{Duration, Instant},
};

const DETAILS_WIDTH: u16 = 46;

/// Colours follow Blender's dark UI: grey panels with an orange accent.
#[derive(Clone, Copy)]
struct Theme {
    accent: Color,
    selection: Color,
    frame: Color,
    text: Color,
    dim: Color,
    ok: Color,
    warn: Color,
    fail: Color,
    bar_bg: Color,
    log_bg: Color,
}

impl Theme {
    const BLENDER: Theme = Theme {
        accent: Color::Rgb(232, 125, 13),
        selection: Color::Rgb(71, 114, 179),
        frame: Color::Rgb(84, 84, 84),
        text: Color::Rgb(230, 230, 230),
        dim: Color::Rgb(150, 150, 150),
        ok: Color::Rgb(114, 204, 114),
        warn: Color::Rgb(240, 190, 90),
        fail: Color::Rgb(230, 90, 90),
        bar_bg: Color::Rgb(35, 35, 35),
        log_bg: Color::Rgb(29, 29, 29),
    };

    fn block(&self, title: &'static str) -> Block<'static> {
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(self.frame))
            .title(Span::styled(
                title,
                Style::default()
                    .fg(self.accent)
                    .add_modifier(Modifier::BOLD),
            ))
    }

    fn panel(&self, title: &'static str) -> Block<'static> {
        self.block(title).padding(Padding {
            left: 1,
            right: 1,
            top: 0,
            bottom: 0,
        })
    }

    fn highlight(&self) -> Style {
        Style::default()
            .bg(self.selection)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD)
    }
}

type Tui = Terminal<CrosstermBackend<Stdout>>;

pub fn run(app: &mut App) -> Result<()> {
    let mut terminal = enter_terminal()?;
    let result = run_loop(&mut terminal, app);
    // Restore first so a loop error is printed on a sane terminal.
    leave_terminal(&mut terminal)?;
    result
}

fn enter_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    if let Err(err) = execute!(stdout, EnterAlternateScreen, EnableBracketedPaste) {
        let _ = disable_raw_mode();
        return Err(err.into());
    }
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn leave_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_loop(terminal: &mut Terminal<impl Backend>, app: &mut App) -> Result<()> {
    loop {
        app.tick();
        app.clamp_selection();
        terminal.draw(|frame| draw(frame, app))?;

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(200))? {
            match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => handle_key(app, key)?,
                Event::Paste(text) => handle_paste(app, &text),
                _ => {}
            }
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    if app.dialog.is_some() {
        handle_dialog_mode(app, key);
        return Ok(());
    }
    if app.form.is_some() {
        handle_form_mode(app, key);
        return Ok(());
    }

    let mode = std::mem::replace(&mut app.input_mode, InputMode::Normal);
    match mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing {
            prompt,
            mut buffer,
            purpose,
        } => {
            handle_input_mode(app, key, &mut buffer, purpose, prompt);
            Ok(())
        }
    }
}

fn handle_dialog_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Left
        | KeyCode::Right
        | KeyCode::Tab
        | KeyCode::Char('h')
        | KeyCode::Char('l') => app.toggle_dialog_choice(),
        KeyCode::Char('y') | KeyCode::Char('Y') => app.resolve_dialog(DialogChoice::Yes),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            app.resolve_dialog(DialogChoice::No)
        }
        KeyCode::Enter | KeyCode::Char(' ') => {
            let choice = app
                .dialog
                .as_ref()
                .map(|dialog| dialog.choice)
                .unwrap_or(DialogChoice::No);
            app.resolve_dialog(choice);
        }
        _ => {}
    }
}

fn handle_form_mode(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Esc {
        app.cancel_form();
        return;
    }
    if key.code == KeyCode::Enter
        || (key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL))
    {
        app.submit_form();
        return;
    }
    let Some(form) = app.form.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Tab | KeyCode::Down => form.next_field(),
        KeyCode::BackTab | KeyCode::Up => form.prev_field(),
        KeyCode::Left if form.focus == FormField::Category => form.cycle_category(false),
        KeyCode::Right if form.focus == FormField::Category => form.cycle_category(true),
        KeyCode::Backspace => form.backspace(),
        KeyCode::Char(c)
            if !key.modifiers.contains(KeyModifiers::CONTROL)
                && !key.modifiers.contains(KeyModifiers::ALT) =>
        {
            form.push_char(c)
        }
        _ => {}
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => app.should_quit = true,
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        KeyCode::Home => app.select_first(),
        KeyCode::End => app.select_last(),
        KeyCode::PageUp => app.session.log.scroll_up(3),
        KeyCode::PageDown => app.session.log.scroll_down(3),
        KeyCode::Char('/') => app.begin_search(),
        KeyCode::Char('c') | KeyCode::Char('C') => app.cycle_category(),
        KeyCode::Char('a') | KeyCode::Char('A') => app.open_add_form(),
        KeyCode::Char('e') | KeyCode::Char('E') => app.open_edit_form(),
        KeyCode::Char('x') | KeyCode::Char('X') | KeyCode::Delete => app.request_delete(),
        KeyCode::Enter | KeyCode::Char('r') | KeyCode::Char('R') => app.run_selected(),
        KeyCode::Char('b') | KeyCode::Char('B') => app.open_selected(ModPath::Blend),
        KeyCode::Char('w') | KeyCode::Char('W') => app.open_selected(ModPath::WorkFolder),
        KeyCode::Char('v') | KeyCode::Char('V') => app.open_selected(ModPath::Cover),
        KeyCode::Char('f') => app.open_base_folder(),
        KeyCode::Char('F') => app.begin_set_base_folder(),
        KeyCode::Char('y') | KeyCode::Char('Y') => app.copy_script_path(),
        KeyCode::Esc if !app.name_filter.is_empty() => {
            app.handle_submit(InputPurpose::FilterName, String::new())?
        }
        _ => {}
    }
    Ok(())
}

fn handle_input_mode(
    app: &mut App,
    key: KeyEvent,
    buffer: &mut String,
    purpose: InputPurpose,
    prompt: String,
) {
    let mut keep_editing = true;
    match key.code {
        KeyCode::Esc => {
            keep_editing = false;
            let cancel_message = match purpose {
                InputPurpose::FilterName => {
                    app.set_name_filter("");
                    "Search cleared"
                }
                InputPurpose::BaseFolder => "Base folder unchanged",
            };
            app.status = cancel_message.to_string();
            app.set_toast(cancel_message, ToastLevel::Warn, Duration::from_secs(2));
        }
        KeyCode::Enter => {
            keep_editing = false;
            let value = buffer.trim().to_string();
            if let Err(err) = app.handle_submit(purpose, value) {
                app.status = format!("Action failed: {err}");
                app.session.log.error(format!("Action failed: {err}"));
            }
        }
        KeyCode::Char(c) => {
            if key.modifiers.contains(KeyModifiers::CONTROL)
                || key.modifiers.contains(KeyModifiers::ALT)
            {
                return restore_input(app, prompt, buffer, purpose);
            }
            buffer.push(c);
            if purpose == InputPurpose::FilterName {
                app.set_name_filter(buffer);
            }
        }
        KeyCode::Backspace => {
            buffer.pop();
            if purpose == InputPurpose::FilterName {
                app.set_name_filter(buffer);
            }
        }
        _ => {}
    }

    if keep_editing {
        restore_input(app, prompt, buffer, purpose);
    }
}

fn restore_input(app: &mut App, prompt: String, buffer: &str, purpose: InputPurpose) {
    app.input_mode = InputMode::Editing {
        prompt,
        buffer: buffer.to_string(),
        purpose,
    };
}

fn handle_paste(app: &mut App, text: &str) {
    let line = text.lines().next().unwrap_or_default().trim();
    if line.is_empty() {
        return;
    }
    if let Some(form) = app.form.as_mut() {
        form.push_str(line);
        return;
    }
    if let InputMode::Editing {
        buffer, purpose, ..
    } = &mut app.input_mode
    {
        buffer.push_str(line);
        if *purpose == InputPurpose::FilterName {
            let value = buffer.clone();
            app.set_name_filter(&value);
        }
    }
}

fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.size();
    let theme = Theme::BLENDER;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(8),
        ])
        .split(area);

    let search_label = if app.name_filter.trim().is_empty() {
        "-".to_string()
    } else {
        app.name_filter.trim().to_string()
    };
    let header = Paragraph::new(vec![
        Line::from(vec![
            Span::styled(
                "B4RT Mod Launcher",
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(
                format!("v{}", env!("CARGO_PKG_VERSION")),
                Style::default().fg(theme.dim),
            ),
        ]),
        Line::from(vec![
            Span::styled("Category: ", Style::default().fg(theme.dim)),
            Span::styled(
                app.category_filter.label().to_string(),
                Style::default().fg(theme.accent),
            ),
            Span::raw("   "),
            Span::styled("Search: ", Style::default().fg(theme.dim)),
            Span::styled(search_label, Style::default().fg(theme.text)),
            Span::raw("   "),
            Span::styled("Mods: ", Style::default().fg(theme.dim)),
            Span::styled(
                format!("{}/{}", app.listing.len(), app.total_mods),
                Style::default().fg(theme.text),
            ),
        ]),
    ])
    .style(Style::default().bg(theme.bar_bg))
    .alignment(Alignment::Center);
    frame.render_widget(header, chunks[0]);

    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(30), Constraint::Length(DETAILS_WIDTH)])
        .split(chunks[1]);

    if app.listing.is_empty() {
        let message = if app.query().is_unfiltered() {
            "No mods yet. Press a to add one."
        } else {
            "No mods match the current filter."
        };
        let empty = Paragraph::new(message)
            .style(Style::default().fg(theme.dim))
            .block(theme.panel("Mods"))
            .alignment(Alignment::Center);
        frame.render_widget(empty, body_chunks[0]);
    } else {
        let rows: Vec<Row> = app
            .listing
            .records
            .iter()
            .map(|record| row_for_mod(record, &theme))
            .collect();
        let table = Table::new(
            rows,
            [
                Constraint::Length(4),
                Constraint::Min(16),
                Constraint::Length(8),
                Constraint::Length(12),
                Constraint::Length(16),
                Constraint::Length(6),
                Constraint::Length(5),
            ],
        )
        .header(
            Row::new(vec![
                Cell::from("ID"),
                Cell::from("Name"),
                Cell::from("Version"),
                Cell::from("Category"),
                Cell::from("Last Run"),
                Cell::from("Script"),
                Cell::from("Blend"),
            ])
            .style(Style::default().fg(theme.text).add_modifier(Modifier::BOLD)),
        )
        .column_spacing(1)
        .block(theme.panel("Mods"))
        .highlight_style(theme.highlight())
        .highlight_symbol(">");
        let mut state = TableState::default();
        state.select(Some(app.selected));
        frame.render_stateful_widget(table, body_chunks[0], &mut state);
    }

    let details = Paragraph::new(build_details(app, &theme))
        .style(Style::default().fg(theme.text))
        .block(theme.panel("Details"))
        .wrap(Wrap { trim: false });
    frame.render_widget(details, body_chunks[1]);

    let status_block = theme.panel("Status");
    let status_inner = status_block.inner(chunks[2]);
    let footer = Paragraph::new(status_bar_line(app, status_inner.width))
        .style(Style::default().fg(theme.text))
        .block(status_block);
    frame.render_widget(footer, chunks[2]);

    let log_block = theme.panel("Log").style(Style::default().bg(theme.log_bg));
    let log_inner = log_block.inner(chunks[3]);
    let log = Paragraph::new(build_log_lines(app, &theme, log_inner.height as usize))
        .style(Style::default().fg(theme.text).bg(theme.log_bg))
        .block(log_block);
    frame.render_widget(log, chunks[3]);

    if let Some(form) = &app.form {
        draw_form(frame, form, &theme);
    }
    if app.dialog.is_some() {
        draw_dialog(frame, app, &theme);
    }
    draw_toast(frame, app, &theme, chunks[1]);
}

fn row_for_mod(record: &ModRecord, theme: &Theme) -> Row<'static> {
    let fields = &record.fields;
    let last_run = if fields.has_run() {
        Cell::from(fields.last_run_label())
    } else {
        Cell::from("never").style(Style::default().fg(theme.dim))
    };
    Row::new(vec![
        Cell::from(record.id.to_string()).style(Style::default().fg(theme.dim)),
        Cell::from(fields.name.clone()),
        Cell::from(fields.version.clone()),
        Cell::from(fields.category.clone()).style(Style::default().fg(theme.accent)),
        last_run,
        path_cell(&fields.bat_path, theme),
        path_cell(&fields.blend_path, theme),
    ])
}

fn path_cell(raw: &str, theme: &Theme) -> Cell<'static> {
    let (text, color) = path_mark(raw, theme);
    Cell::from(text).style(Style::default().fg(color))
}

fn path_mark(raw: &str, theme: &Theme) -> (&'static str, Color) {
    if raw.trim().is_empty() {
        ("-", theme.dim)
    } else if expand_path(raw).exists() {
        ("ok", theme.ok)
    } else {
        ("miss", theme.fail)
    }
}

fn build_details(app: &App, theme: &Theme) -> Vec<Line<'static>> {
    let Some(record) = app.selected_mod() else {
        return vec![Line::from(Span::styled(
            "No mod selected.",
            Style::default().fg(theme.dim),
        ))];
    };
    let fields = &record.fields;
    let label_style = Style::default().fg(theme.dim);
    let value_style = Style::default().fg(theme.text);
    let mut lines = vec![
        Line::from(Span::styled(
            fields.name.clone(),
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    let last_run = if fields.has_run() {
        fields.last_run_label()
    } else {
        "never".to_string()
    };
    for (label, value) in [
        ("Id", record.id.to_string()),
        ("Version", fields.version.clone()),
        ("Category", fields.category.clone()),
        ("Status", fields.status.clone()),
        ("Last run", last_run),
    ] {
        lines.push(Line::from(vec![
            Span::styled(format!("{label}: "), label_style),
            Span::styled(value, value_style),
        ]));
    }
    lines.push(Line::from(""));
    for which in [
        ModPath::Script,
        ModPath::Blend,
        ModPath::WorkFolder,
        ModPath::Cover,
    ] {
        let raw = record.path(which);
        let (mark, color) = path_mark(raw, theme);
        lines.push(Line::from(vec![
            Span::styled(format!("{} ", which.label()), label_style),
            Span::styled(format!("[{mark}]"), Style::default().fg(color)),
        ]));
        if !raw.is_empty() {
            lines.push(Line::from(Span::styled(format!("  {raw}"), value_style)));
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("Base folder: ", label_style),
        Span::styled(app.session.base_folder().display().to_string(), value_style),
    ]));
    lines
}

fn status_bar_line(app: &App, width: u16) -> String {
    let width = width as usize;
    let (left, right) = match &app.input_mode {
        InputMode::Normal if app.form.is_some() => (
            format!("Status: {}", app.status),
            "Tab next | Left/Right category | Enter save | Esc cancel".to_string(),
        ),
        InputMode::Normal => (
            format!("Status: {}", app.status),
            "/ search | c category | a add | e edit | x delete | r run | b w v f F y | q quit"
                .to_string(),
        ),
        InputMode::Editing { prompt, buffer, .. } => (
            format!("{prompt}: {buffer}"),
            "Enter confirm | Esc cancel".to_string(),
        ),
    };

    if width == 0 {
        return String::new();
    }

    let left_len = left.chars().count();
    let right_len = right.chars().count();
    if left_len + right_len + 1 > width {
        let available = width.saturating_sub(left_len + 1);
        let trimmed_right: String = right.chars().take(available).collect();
        return format!("{left} {trimmed_right}");
    }

    let spaces = width - left_len - right_len;
    format!("{left}{}{right}", " ".repeat(spaces))
}

fn build_log_lines(app: &App, theme: &Theme, height: usize) -> Vec<Line<'static>> {
    if height == 0 {
        return Vec::new();
    }

    if app.session.log.entries().is_empty() {
        return vec![Line::from(Span::styled(
            "No recent events.",
            Style::default().fg(theme.dim),
        ))];
    }

    app.session
        .log
        .window(height)
        .iter()
        .map(|entry| {
            let (label, color) = match entry.level {
                LogLevel::Info => ("[i]", theme.accent),
                LogLevel::Warn => ("[!]", theme.warn),
                LogLevel::Error => ("[x]", theme.fail),
            };
            Line::from(vec![
                Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::raw(" "),
                Span::styled(entry.message.clone(), Style::default().fg(theme.text)),
            ])
        })
        .collect()
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(2));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn draw_form(frame: &mut Frame<'_>, form: &ModForm, theme: &Theme) {
    let area = centered(frame.size(), 72, FormField::ALL.len() as u16 + 6);
    let mut lines = vec![Line::from("")];
    for field in FormField::ALL {
        let focused = field == form.focus;
        let label_style = if focused {
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.dim)
        };
        let mut value = form.value(field).to_string();
        if focused {
            value.push('_');
        }
        let mut spans = vec![
            Span::styled(if focused { "> " } else { "  " }, label_style),
            Span::styled(format!("{:<15}", field.label()), label_style),
            Span::styled(value, Style::default().fg(theme.text)),
        ];
        if field == FormField::Category && focused {
            spans.push(Span::styled(
                "  (Left/Right to pick)",
                Style::default().fg(theme.dim),
            ));
        }
        lines.push(Line::from(spans));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("Status: {}", form.fields.status),
        Style::default().fg(theme.dim),
    )));

    frame.render_widget(Clear, area);
    let block = theme
        .block(form.title())
        .border_style(Style::default().fg(theme.selection))
        .style(Style::default().bg(theme.bar_bg));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_dialog(frame: &mut Frame<'_>, app: &App, theme: &Theme) {
    let Some(dialog) = &app.dialog else {
        return;
    };

    let message_lines: Vec<Line> = dialog
        .message
        .lines()
        .map(|line| Line::from(line.to_string()))
        .collect();
    let height = (message_lines.len().max(1) as u16 + 6).max(7);
    let area = frame.size();
    let width = (area.width.saturating_mul(2) / 3).clamp(34, 80);
    let dialog_area = centered(area, width, height);

    let yes_selected = dialog.choice == DialogChoice::Yes;
    let yes_style = if yes_selected {
        Style::default()
            .fg(Color::Black)
            .bg(theme.fail)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text)
    };
    let no_style = if !yes_selected {
        Style::default()
            .fg(Color::Black)
            .bg(theme.accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text)
    };

    let mut lines = vec![
        Line::from(Span::styled(
            dialog.title.clone(),
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    lines.extend(message_lines);
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled(format!(" {} ", dialog.yes_label), yes_style),
        Span::raw("   "),
        Span::styled(format!(" {} ", dialog.no_label), no_style),
    ]));

    frame.render_widget(Clear, dialog_area);
    let dialog_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.selection))
        .style(Style::default().bg(theme.bar_bg));
    let dialog_widget = Paragraph::new(lines)
        .block(dialog_block)
        .style(Style::default().fg(theme.text))
        .alignment(Alignment::Center);
    frame.render_widget(dialog_widget, dialog_area);
}

fn draw_toast(frame: &mut Frame<'_>, app: &App, theme: &Theme, body_area: Rect) {
    if app.dialog.is_some() || app.form.is_some() {
        return;
    }
    let Some(toast) = app.toast.as_ref() else {
        return;
    };
    if toast.expires_at <= Instant::now() {
        return;
    }

    let max_width = body_area.width.saturating_sub(4).max(24);
    let max_text = max_width.saturating_sub(4) as usize;
    let mut message: String = toast.message.chars().take(max_text).collect();
    if message.chars().count() < toast.message.chars().count() {
        message.pop();
        message.push('~');
    }
    let width = (message.chars().count() as u16 + 4).clamp(24, max_width);
    let x = body_area.x + (body_area.width.saturating_sub(width)) / 2;
    let toast_area = Rect::new(x, body_area.y + 1, width, 3);

    let border = match toast.level {
        ToastLevel::Info => theme.accent,
        ToastLevel::Warn => theme.warn,
        ToastLevel::Error => theme.fail,
    };

    frame.render_widget(Clear, toast_area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(theme.bar_bg));
    let content = Paragraph::new(message)
        .block(block)
        .style(Style::default().fg(theme.text))
        .alignment(Alignment::Center);
    frame.render_widget(content, toast_area);
}
