use crate::{
    chain::CoinSide,
    client::{
        AppSnapshot,
        MyGameRow,
        StatusKind,
    },
    tokens,
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use ratatui::{prelude::*, widgets::*};
use std::io::stdout;
use tokio::sync::mpsc;
use unicode_width::UnicodeWidthStr;

/// Timeout choices offered when creating a game, mirroring the choices the
/// contract's original front end exposed.
pub const TIMEOUT_CHOICES: [(u64, &str); 3] =
    [(300, "5 minutes"), (3600, "1 hour"), (86400, "24 hours")];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Screen {
    #[default]
    Home,
    VsComputer,
    Pvp,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PvpTab {
    #[default]
    Available,
    MyGames,
    Leaderboard,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MyGamesTab {
    #[default]
    Created,
    Joined,
    Resolved,
}

#[derive(Clone, Debug, Default)]
enum Mode {
    #[default]
    Normal,
    CreateModal(CreateState),
}

#[derive(Clone, Debug)]
struct CreateState {
    amount: String,
    token_idx: usize,
    side: CoinSide,
    timeout_idx: usize,
}

impl Default for CreateState {
    fn default() -> Self {
        CreateState {
            amount: String::new(),
            token_idx: 0,
            side: CoinSide::Tails,
            timeout_idx: 1,
        }
    }
}

#[derive(Debug, Default)]
pub struct UiState {
    screen: Screen,
    pvp_tab: PvpTab,
    my_tab: MyGamesTab,
    mode: Mode,
    selected_row: usize,
    practice: Option<(CoinSide, CoinSide)>,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

pub enum UserEvent {
    Quit,
    Redraw,
    Refresh,
    NextPage,
    PrevPage,
    CycleToken,
    CycleMetric,
    Join(u64),
    Resolve(u64),
    Claim(u64),
    ConfirmCreate {
        ticker: String,
        amount: String,
        side: CoinSide,
        timeout_secs: u64,
    },
    PracticeFlip(CoinSide),
}

pub type InputEventReceiver = mpsc::UnboundedReceiver<Event>;

/// Forward raw terminal events from a blocking reader thread. The thread
/// lives for the rest of the process; the channel closing on our side is the
/// shutdown signal it observes.
pub fn input_event_stream() -> InputEventReceiver {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        loop {
            match crossterm::event::read() {
                Ok(event) => {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
    rx
}

pub async fn next_raw_event(rx: &mut InputEventReceiver) -> Result<Event> {
    rx.recv().await.ok_or_else(|| eyre!("input thread terminated"))
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen
    )?;
    let backend = CrosstermBackend::new(stdout());
    state.terminal = Some(Terminal::new(backend)?);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::LeaveAlternateScreen
    )?;
    Ok(())
}

pub fn record_practice_flip(state: &mut UiState, guess: CoinSide, outcome: CoinSide) {
    state.practice = Some((guess, outcome));
}

fn selectable_rows(state: &UiState, snap: &AppSnapshot) -> usize {
    match (state.screen, state.pvp_tab) {
        (Screen::Pvp, PvpTab::Available) => snap.available.items.len(),
        (Screen::Pvp, PvpTab::MyGames) => my_games_for_tab(state.my_tab, snap).len(),
        _ => 0,
    }
}

fn my_games_for_tab(tab: MyGamesTab, snap: &AppSnapshot) -> &[MyGameRow] {
    match tab {
        MyGamesTab::Created => &snap.my_created,
        MyGamesTab::Joined => &snap.my_joined,
        MyGamesTab::Resolved => &snap.my_resolved,
    }
}

/// Turn a raw terminal event into a user intention, updating modal and
/// navigation state on the way. `None` means nothing the run loop needs to
/// act on.
pub fn interpret_event(
    state: &mut UiState,
    event: Event,
    snap: &AppSnapshot,
) -> Option<UserEvent> {
    let Event::Key(key) = event else {
        if matches!(event, Event::Resize(_, _)) {
            return Some(UserEvent::Redraw);
        }
        return None;
    };
    if key.kind != KeyEventKind::Press {
        return None;
    }

    if let Mode::CreateModal(ref mut create) = state.mode {
        match key.code {
            KeyCode::Esc => {
                state.mode = Mode::Normal;
                return Some(UserEvent::Redraw);
            }
            KeyCode::Enter => {
                let supported = tokens::supported_tokens();
                let token = &supported[create.token_idx % supported.len()];
                let event = UserEvent::ConfirmCreate {
                    ticker: token.ticker.to_string(),
                    amount: create.amount.clone(),
                    side: create.side,
                    timeout_secs: TIMEOUT_CHOICES[create.timeout_idx].0,
                };
                state.mode = Mode::Normal;
                return Some(event);
            }
            KeyCode::Backspace => {
                create.amount.pop();
                return Some(UserEvent::Redraw);
            }
            KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => {
                create.amount.push(c);
                return Some(UserEvent::Redraw);
            }
            KeyCode::Char('t') => {
                create.token_idx =
                    (create.token_idx + 1) % tokens::supported_tokens().len();
                return Some(UserEvent::Redraw);
            }
            KeyCode::Char('s') => {
                create.side = create.side.toggled();
                return Some(UserEvent::Redraw);
            }
            KeyCode::Char('d') => {
                create.timeout_idx = (create.timeout_idx + 1) % TIMEOUT_CHOICES.len();
                return Some(UserEvent::Redraw);
            }
            _ => return None,
        }
    }

    // Global keys first, then per-screen ones.
    match key.code {
        KeyCode::Char('q') => return Some(UserEvent::Quit),
        KeyCode::Char('r') => return Some(UserEvent::Refresh),
        KeyCode::Char('1') => {
            state.screen = Screen::Home;
            return Some(UserEvent::Redraw);
        }
        KeyCode::Char('2') => {
            state.screen = Screen::VsComputer;
            return Some(UserEvent::Redraw);
        }
        KeyCode::Char('3') => {
            state.screen = Screen::Pvp;
            return Some(UserEvent::Redraw);
        }
        _ => {}
    }

    match state.screen {
        Screen::Home => None,
        Screen::VsComputer => match key.code {
            KeyCode::Char('h') => Some(UserEvent::PracticeFlip(CoinSide::Heads)),
            KeyCode::Char('t') => Some(UserEvent::PracticeFlip(CoinSide::Tails)),
            _ => None,
        },
        Screen::Pvp => interpret_pvp_event(state, key.code, snap),
    }
}

fn interpret_pvp_event(
    state: &mut UiState,
    code: KeyCode,
    snap: &AppSnapshot,
) -> Option<UserEvent> {
    match code {
        KeyCode::Tab => {
            state.pvp_tab = match state.pvp_tab {
                PvpTab::Available => PvpTab::MyGames,
                PvpTab::MyGames => PvpTab::Leaderboard,
                PvpTab::Leaderboard => PvpTab::Available,
            };
            state.selected_row = 0;
            Some(UserEvent::Redraw)
        }
        KeyCode::Char('g') if state.pvp_tab == PvpTab::MyGames => {
            state.my_tab = match state.my_tab {
                MyGamesTab::Created => MyGamesTab::Joined,
                MyGamesTab::Joined => MyGamesTab::Resolved,
                MyGamesTab::Resolved => MyGamesTab::Created,
            };
            state.selected_row = 0;
            Some(UserEvent::Redraw)
        }
        KeyCode::Up => {
            state.selected_row = state.selected_row.saturating_sub(1);
            Some(UserEvent::Redraw)
        }
        KeyCode::Down => {
            let rows = selectable_rows(state, snap);
            if rows > 0 {
                state.selected_row = (state.selected_row + 1).min(rows - 1);
            }
            Some(UserEvent::Redraw)
        }
        KeyCode::Left if state.pvp_tab == PvpTab::Available => {
            state.selected_row = 0;
            snap.available.has_prev().then_some(UserEvent::PrevPage)
        }
        KeyCode::Right if state.pvp_tab == PvpTab::Available => {
            state.selected_row = 0;
            snap.available.has_next().then_some(UserEvent::NextPage)
        }
        KeyCode::Char('c') => {
            state.mode = Mode::CreateModal(CreateState::default());
            Some(UserEvent::Redraw)
        }
        KeyCode::Char('t') if state.pvp_tab == PvpTab::Leaderboard => {
            Some(UserEvent::CycleToken)
        }
        KeyCode::Char('m') if state.pvp_tab == PvpTab::Leaderboard => {
            Some(UserEvent::CycleMetric)
        }
        KeyCode::Enter => match state.pvp_tab {
            PvpTab::Available => {
                let row = snap.available.items.get(state.selected_row)?;
                if row.busy {
                    return None;
                }
                Some(UserEvent::Join(row.game_id))
            }
            PvpTab::MyGames => {
                let row = my_games_for_tab(state.my_tab, snap).get(state.selected_row)?;
                match state.my_tab {
                    MyGamesTab::Resolved => {
                        (!row.claiming).then_some(UserEvent::Claim(row.game_id))
                    }
                    _ => (!row.resolving).then_some(UserEvent::Resolve(row.game_id)),
                }
            }
            PvpTab::Leaderboard => None,
        },
        _ => None,
    }
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    let rows = selectable_rows(state, snap);
    if rows == 0 {
        state.selected_row = 0;
    } else {
        state.selected_row = state.selected_row.min(rows - 1);
    }
    if let Some(mut term) = state.terminal.take() {
        term.draw(|frame| ui(frame, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

fn ui(frame: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(2),
        ])
        .split(frame.area());

    render_header(frame, chunks[0], state, snap);
    match state.screen {
        Screen::Home => render_home(frame, chunks[1]),
        Screen::VsComputer => render_vs_computer(frame, chunks[1], state, snap),
        Screen::Pvp => render_pvp(frame, chunks[1], state, snap),
    }
    render_footer(frame, chunks[2], state, snap);

    if let Mode::CreateModal(ref create) = state.mode {
        render_create_modal(frame, create, snap);
    }
}

fn render_header(frame: &mut Frame, area: Rect, state: &UiState, snap: &AppSnapshot) {
    let wallet = match &snap.wallet {
        Some(address) => format!("wallet {address}"),
        None => "read-only (no wallet)".to_string(),
    };
    let balance = snap
        .token_metadata
        .as_ref()
        .map(|metadata| format!(" | {} {}", metadata.balance, metadata.symbol))
        .unwrap_or_default();
    let screen = match state.screen {
        Screen::Home => "Home",
        Screen::VsComputer => "Vs Computer",
        Screen::Pvp => "PvP Lobby",
    };
    let title = format!("Flip It - {screen} | {wallet}{balance}");
    let block = Block::default().borders(Borders::ALL);
    frame.render_widget(Paragraph::new(title).block(block), area);
}

fn render_home(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from("  Welcome to Flip It, a coin-flip wagering game."),
        Line::from(""),
        Line::from("  [2] practice against the computer"),
        Line::from("  [3] enter the PvP lobby"),
        Line::from(""),
        Line::from("  [r] refresh    [q] quit"),
    ];
    let block = Block::default().borders(Borders::ALL).title("Home");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_vs_computer(frame: &mut Frame, area: Rect, state: &UiState, snap: &AppSnapshot) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(3)])
        .split(area);

    let practice = match state.practice {
        Some((guess, outcome)) if guess == outcome => {
            format!("You called {guess} and the coin came up {outcome}. Nice.")
        }
        Some((guess, outcome)) => {
            format!("You called {guess} but the coin came up {outcome}.")
        }
        None => "Call the flip: [h] heads or [t] tails. No stakes here.".to_string(),
    };
    let block = Block::default().borders(Borders::ALL).title("Practice flip");
    frame.render_widget(Paragraph::new(practice).block(block), chunks[0]);

    let header = Row::new(vec![
        "Game", "Player 1", "Player 2", "Bet", "Winner", "Payout", "Time left",
    ]);
    let rows: Vec<Row> = snap
        .terminal_games
        .iter()
        .map(|game| {
            let winner = game
                .winner
                .clone()
                .unwrap_or_else(|| "Not resolved yet".to_string());
            Row::new(vec![
                game.game_id.to_string(),
                game.player_one.clone(),
                game.player_two.clone().unwrap_or_else(|| "Not joined yet".into()),
                game.stake.clone(),
                winner,
                game.payout.clone().unwrap_or_else(|| "-".into()),
                format!("{}s", game.remaining_secs),
            ])
        })
        .collect();
    let empty = rows.is_empty();
    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(16),
            Constraint::Length(16),
            Constraint::Length(12),
            Constraint::Length(16),
            Constraint::Length(12),
            Constraint::Length(10),
        ],
    )
    .header(header.style(Style::default().add_modifier(Modifier::BOLD)))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Past games (resolved or expired)"),
    );
    frame.render_widget(table, chunks[1]);
    if empty {
        let hint = Paragraph::new("No past games. Check back later.")
            .alignment(Alignment::Center);
        let inner = chunks[1].inner(Margin::new(1, 2));
        frame.render_widget(hint, inner);
    }
}

fn render_pvp(frame: &mut Frame, area: Rect, state: &UiState, snap: &AppSnapshot) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(3)])
        .split(area);

    let titles = ["Available", "My games", "Leaderboard"];
    let selected = match state.pvp_tab {
        PvpTab::Available => 0,
        PvpTab::MyGames => 1,
        PvpTab::Leaderboard => 2,
    };
    let tabs = Tabs::new(titles.iter().map(|t| Line::from(*t)).collect::<Vec<_>>())
        .select(selected)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED));
    frame.render_widget(tabs, chunks[0]);

    match state.pvp_tab {
        PvpTab::Available => render_available(frame, chunks[1], state, snap),
        PvpTab::MyGames => render_my_games(frame, chunks[1], state, snap),
        PvpTab::Leaderboard => render_leaderboard(frame, chunks[1], snap),
    }
}

fn render_available(frame: &mut Frame, area: Rect, state: &UiState, snap: &AppSnapshot) {
    let header = Row::new(vec!["Game", "Required bet", "Token", "P1 choice", ""]);
    let rows: Vec<Row> = snap
        .available
        .items
        .iter()
        .map(|game| {
            let action = if game.busy { "Joining..." } else { "[Enter] join" };
            Row::new(vec![
                game.game_id.to_string(),
                game.stake.clone(),
                game.token_name.clone(),
                game.side.to_string(),
                action.to_string(),
            ])
        })
        .collect();
    let empty = rows.is_empty();
    let page = &snap.available;
    let title = format!(
        "Available games - page {}/{}{}{}",
        page.page,
        page.total_pages,
        if page.has_prev() { "  <-" } else { "" },
        if page.has_next() { "  ->" } else { "" },
    );
    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(20),
            Constraint::Length(14),
            Constraint::Length(10),
            Constraint::Length(14),
        ],
    )
    .header(header.style(Style::default().add_modifier(Modifier::BOLD)))
    .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
    .block(Block::default().borders(Borders::ALL).title(title));
    let mut table_state = TableState::default();
    table_state.select((!empty).then_some(state.selected_row));
    frame.render_stateful_widget(table, area, &mut table_state);
    if empty {
        let hint = Paragraph::new(
            "No available games. Create one with [c] or check back later.",
        )
        .alignment(Alignment::Center);
        frame.render_widget(hint, area.inner(Margin::new(1, 2)));
    }
}

fn render_my_games(frame: &mut Frame, area: Rect, state: &UiState, snap: &AppSnapshot) {
    let games = my_games_for_tab(state.my_tab, snap);
    let (tab_name, action_hint) = match state.my_tab {
        MyGamesTab::Created => ("Created", "[Enter] resolve"),
        MyGamesTab::Joined => ("Joined", "[Enter] resolve"),
        MyGamesTab::Resolved => ("Resolved", "[Enter] claim"),
    };
    let header = Row::new(vec!["Game", "Bet", "Choice", "Token", "Payout", ""]);
    let rows: Vec<Row> = games
        .iter()
        .map(|game| {
            let action = if game.resolving {
                "Resolving..."
            } else if game.claiming {
                "Claiming..."
            } else {
                action_hint
            };
            Row::new(vec![
                game.game_id.to_string(),
                game.stake.clone(),
                game.side.map(|side| side.to_string()).unwrap_or_else(|| "-".into()),
                game.token_name.clone(),
                game.payout.clone().unwrap_or_else(|| "-".into()),
                action.to_string(),
            ])
        })
        .collect();
    let empty = rows.is_empty();
    let title = format!("My games - {tab_name} ([g] cycles)");
    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(16),
            Constraint::Length(8),
            Constraint::Length(14),
            Constraint::Length(14),
            Constraint::Length(14),
        ],
    )
    .header(header.style(Style::default().add_modifier(Modifier::BOLD)))
    .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
    .block(Block::default().borders(Borders::ALL).title(title));
    let mut table_state = TableState::default();
    table_state.select((!empty).then_some(state.selected_row));
    frame.render_stateful_widget(table, area, &mut table_state);
    if empty {
        let hint = Paragraph::new("Nothing here yet.").alignment(Alignment::Center);
        frame.render_widget(hint, area.inner(Margin::new(1, 2)));
    }
}

fn render_leaderboard(frame: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let metric = snap.leaderboard_metric.to_string();
    let header = Row::new(vec!["#".to_string(), "Player".to_string(), metric]);
    let rows: Vec<Row> = snap
        .leaderboard
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            Row::new(vec![
                (index + 1).to_string(),
                entry.player.clone(),
                entry.amount.clone(),
            ])
        })
        .collect();
    let empty = rows.is_empty();
    let title = format!(
        "Leaderboard - top {} by {} for {} ([m] metric, [t] token)",
        snap.leaderboard.len().max(10),
        snap.leaderboard_metric,
        snap.selected_token.ticker,
    );
    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Length(18),
            Constraint::Length(20),
        ],
    )
    .header(header.style(Style::default().add_modifier(Modifier::BOLD)))
    .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(table, area);
    if empty {
        let hint = Paragraph::new("No players found for this selection.")
            .alignment(Alignment::Center);
        frame.render_widget(hint, area.inner(Margin::new(1, 2)));
    }
}

fn render_footer(frame: &mut Frame, area: Rect, state: &UiState, snap: &AppSnapshot) {
    let hints = match state.screen {
        Screen::Home => "[1] home  [2] vs computer  [3] pvp  [q] quit",
        Screen::VsComputer => "[h]/[t] call the flip  [1] home  [q] quit",
        Screen::Pvp => {
            "[Tab] tabs  [c] create  [r] refresh  [arrows] navigate  [q] quit"
        }
    };
    let line = match &snap.status {
        Some((message, kind)) => {
            let style = match kind {
                StatusKind::Info => Style::default().fg(Color::Yellow),
                StatusKind::Success => Style::default().fg(Color::Green),
                StatusKind::Error => Style::default().fg(Color::Red),
            };
            let width = (area.width as usize).saturating_sub(2);
            let mut message = message.clone();
            while message.width() > width && !message.is_empty() {
                message.pop();
            }
            Line::from(Span::styled(message, style))
        }
        None => Line::from(Span::styled(hints, Style::default().fg(Color::DarkGray))),
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn render_create_modal(frame: &mut Frame, create: &CreateState, snap: &AppSnapshot) {
    let area = centered_rect(46, 12, frame.area());
    frame.render_widget(Clear, area);
    let supported = tokens::supported_tokens();
    let token = &supported[create.token_idx % supported.len()];
    let (timeout_secs, timeout_label) = TIMEOUT_CHOICES[create.timeout_idx];
    let balance = snap
        .token_metadata
        .as_ref()
        .filter(|metadata| metadata.symbol == token.ticker)
        .map(|metadata| format!("{} {}", metadata.balance, metadata.symbol))
        .unwrap_or_else(|| "-".to_string());
    let amount = if create.amount.is_empty() {
        "0.00"
    } else {
        create.amount.as_str()
    };
    let lines = vec![
        Line::from(""),
        Line::from(format!("  Bet amount : {amount} {}", token.ticker)),
        Line::from(format!("  Token      : {} ({})  [t]", token.ticker, token.name)),
        Line::from(format!("  Your choice: {}  [s]", create.side)),
        Line::from(format!("  Timeout    : {timeout_label} ({timeout_secs}s)  [d]")),
        Line::from(format!("  Balance    : {balance}")),
        Line::from(""),
        Line::from("  type digits to edit, [Enter] create, [Esc] cancel"),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Create new game");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect {
        x,
        y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}
