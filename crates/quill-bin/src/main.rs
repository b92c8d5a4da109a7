//! Quill entrypoint: logging, startup wiring, and the single-owner editing
//! loop.
//!
//! Exactly one thread owns the session (store, journal, cursor, search
//! state); the only other thread is the input producer feeding the bounded
//! event queue. Interactive prompts (search box, replace confirmation)
//! block on the same receiver rather than returning to the redraw loop.

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

use quill_config::Config;
use quill_events::{Event, EventReceiver, KeyCode, KeyEvent, Modifiers, channel};
use quill_render::{LayoutContext, Viewport, cursor_cell, layout};
use quill_search::{Direction, Prompter};
use quill_session::{FsStorage, Session, load_snapshot, normalize_line_endings, save_snapshot};
use quill_term::{EventPrompter, TerminalGuard, paint_frame, spawn_input, terminal_size};
use quill_text::width::visual_col;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "quill", version, about = "A small terminal text editor")]
struct Args {
    /// Path to open. A missing file starts an empty document at that path.
    pub path: Option<PathBuf>,
    /// Configuration file path (overrides discovery of `quill.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Initial cursor position as LINE,COL (1-based line).
    #[arg(long = "startpos")]
    pub start_pos: Option<String>,
}

fn configure_logging() -> Option<WorkerGuard> {
    let appender = tracing_appender::rolling::never(".", "quill.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(writer)
        .try_init()
    {
        Ok(()) => Some(guard),
        // A global subscriber is already installed (tests); drop the guard
        // so the writer shuts down.
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            tracing::error!(target: "runtime.panic", ?panic_info, "panic");
            default_panic(panic_info);
        }));
    });
}

fn parse_start_pos(spec: &str) -> Option<(usize, usize)> {
    let (line, column) = spec.split_once(',')?;
    Some((line.trim().parse().ok()?, column.trim().parse().ok()?))
}

struct Editor {
    session: Session,
    config: Config,
    storage: FsStorage,
    rx: EventReceiver,
    top_line: usize,
    left_col: usize,
    /// One-shot message shown in the status line until the next key.
    status: Option<String>,
}

impl Editor {
    fn run(&mut self) -> Result<()> {
        info!(target: "runtime", "event_loop_started");
        loop {
            self.refresh()?;
            let Ok(event) = self.rx.recv() else {
                break;
            };
            match event {
                Event::Key(key) => {
                    if self.handle_key(key)? {
                        break;
                    }
                }
                Event::Paste(text) => {
                    self.session.insert_text(&normalize_line_endings(&text));
                }
                Event::Resize(..) => {}
                Event::Shutdown => break,
            }
        }
        if self.config.save_session()
            && let Err(err) = save_snapshot(&quill_config::state_dir(), &self.session)
        {
            error!(target: "session.snapshot", ?err, "snapshot_save_failed");
        }
        info!(target: "runtime", "shutdown");
        Ok(())
    }

    /// Scroll to keep the cursor visible, lay the viewport out, paint.
    fn refresh(&mut self) -> Result<()> {
        let (w, h) = terminal_size()?;
        let mut vp = Viewport {
            top_line: self.top_line,
            height: h.saturating_sub(1) as usize,
            left_col: self.left_col,
            width: w as usize,
        };
        self.scroll_to_cursor(&mut vp);
        self.top_line = vp.top_line;
        self.left_col = vp.left_col;

        let ctx = LayoutContext {
            tab_size: self.session.tab_size,
            selection: self.session.cursor.selection(),
        };
        let frame = layout(&self.session.buffer, vp, &ctx);
        let cursor = cursor_cell(
            &self.session.buffer,
            self.session.cursor.location,
            vp,
            self.session.tab_size,
        );
        paint_frame(&frame, cursor, &self.status_line(), (w, h))
    }

    fn scroll_to_cursor(&self, vp: &mut Viewport) {
        let loc = self.session.cursor.location;
        if vp.height > 0 {
            let margin = self.config.vertical_margin().min(vp.height / 2);
            if loc.line < vp.top_line + margin {
                vp.top_line = loc.line.saturating_sub(margin);
            } else if loc.line + margin >= vp.top_line + vp.height {
                vp.top_line = loc.line + margin + 1 - vp.height;
            }
            vp.top_line = vp
                .top_line
                .min(self.session.buffer.line_count().saturating_sub(1));
        }
        if vp.width > 0 {
            let text = self.session.buffer.line(loc.line);
            let v = visual_col(&text, loc.column, self.session.tab_size);
            if v < vp.left_col {
                vp.left_col = v;
            } else if v >= vp.left_col + vp.width {
                vp.left_col = v + 1 - vp.width;
            }
        }
    }

    fn status_line(&self) -> String {
        if let Some(message) = &self.status {
            return format!(" {message}");
        }
        let loc = self.session.cursor.location;
        format!(
            " {}{}  {}:{}",
            self.session.display_name(),
            if self.session.is_modified() { " [+]" } else { "" },
            loc.line + 1,
            loc.column + 1
        )
    }

    /// Returns true when the editor should quit.
    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        self.status = None;
        let tab = self.session.tab_size;
        let shift = key.mods.contains(Modifiers::SHIFT);
        let word = key.mods.contains(Modifiers::ALT);

        if key.mods.contains(Modifiers::CTRL) {
            match key.code {
                KeyCode::Char('q') => return self.request_quit(),
                KeyCode::Char('s') => self.save()?,
                KeyCode::Char('f') => self.interactive_search()?,
                KeyCode::Char('n') => {
                    quill_search::find_next(
                        &self.session.buffer,
                        &mut self.session.cursor,
                        &mut self.session.search,
                    );
                }
                KeyCode::Char('p') => {
                    quill_search::find_previous(
                        &self.session.buffer,
                        &mut self.session.cursor,
                        &mut self.session.search,
                    );
                }
                KeyCode::Char('r') => self.replace_flow()?,
                KeyCode::Char('z') => {
                    if !self.session.undo() {
                        self.status = Some("nothing to undo".to_string());
                    }
                }
                KeyCode::Char('y') => {
                    if !self.session.redo() {
                        self.status = Some("nothing to redo".to_string());
                    }
                }
                KeyCode::Char('k') => self.session.delete_to_line_end(),
                KeyCode::Char('a') => {
                    let (start, end) = (self.session.buffer.start(), self.session.buffer.end());
                    self.session.cursor.set_selection(start, end);
                }
                KeyCode::Home => self.session.cursor.document_start(&self.session.buffer, tab),
                KeyCode::End => self.session.cursor.document_end(&self.session.buffer, tab),
                _ => {}
            }
            return Ok(false);
        }

        let buffer = &self.session.buffer;
        match key.code {
            KeyCode::Char(c) => self.session.insert_text(&c.to_string()),
            KeyCode::Tab => self.session.insert_text("\t"),
            KeyCode::Enter => self.session.insert_newline(),
            KeyCode::Backspace => self.session.backspace(),
            KeyCode::Delete => self.session.delete_forward(),
            KeyCode::Esc => self.session.cursor.clear_selection(),
            KeyCode::Up => {
                if shift {
                    self.session.cursor.select_up(buffer, tab);
                } else {
                    self.session.cursor.up(buffer, tab);
                }
            }
            KeyCode::Down => {
                if shift {
                    self.session.cursor.select_down(buffer, tab);
                } else {
                    self.session.cursor.down(buffer, tab);
                }
            }
            KeyCode::Left => match (shift, word) {
                (true, true) => self.session.cursor.select_word_left(buffer, tab),
                (true, false) => self.session.cursor.select_left(buffer, tab),
                (false, true) => self.session.cursor.word_left(buffer, tab),
                (false, false) => self.session.cursor.left(buffer, tab),
            },
            KeyCode::Right => match (shift, word) {
                (true, true) => self.session.cursor.select_word_right(buffer, tab),
                (true, false) => self.session.cursor.select_right(buffer, tab),
                (false, true) => self.session.cursor.word_right(buffer, tab),
                (false, false) => self.session.cursor.right(buffer, tab),
            },
            KeyCode::Home => {
                if shift {
                    self.session.cursor.select_line_start(buffer, tab);
                } else {
                    self.session.cursor.line_start(buffer, tab);
                }
            }
            KeyCode::End => {
                if shift {
                    self.session.cursor.select_line_end(buffer, tab);
                } else {
                    self.session.cursor.line_end(buffer, tab);
                }
            }
            KeyCode::PageUp => {
                let page = self.page_rows()?;
                self.session.cursor.page_up(buffer, tab, page);
            }
            KeyCode::PageDown => {
                let page = self.page_rows()?;
                self.session.cursor.page_down(buffer, tab, page);
            }
        }
        Ok(false)
    }

    fn page_rows(&self) -> Result<usize> {
        let (_, h) = terminal_size()?;
        Ok(h.saturating_sub(1).max(1) as usize)
    }

    fn request_quit(&mut self) -> Result<bool> {
        if !self.session.is_modified() {
            return Ok(true);
        }
        let mut prompter = EventPrompter::new(&self.rx);
        Ok(prompter
            .confirm("unsaved changes; quit anyway? (y, n)")
            .unwrap_or(false))
    }

    fn save(&mut self) -> Result<()> {
        {
            let mut prompter = EventPrompter::new(&self.rx);
            if self
                .session
                .check_external_modification(&self.storage, &mut prompter)?
            {
                self.status = Some("reloaded from disk".to_string());
                return Ok(());
            }
        }
        if self.session.path.is_none() {
            let mut prompter = EventPrompter::new(&self.rx);
            let Some(path) = prompter.prompt("save as:", "") else {
                return Ok(());
            };
            if path.trim().is_empty() {
                return Ok(());
            }
            self.finish_save(|s, storage| s.save_as(storage, Path::new(path.trim())));
        } else {
            self.finish_save(|s, storage| s.save(storage));
        }
        Ok(())
    }

    fn finish_save<F>(&mut self, op: F)
    where
        F: FnOnce(&mut Session, &FsStorage) -> Result<()>,
    {
        match op(&mut self.session, &self.storage) {
            Ok(()) => self.status = Some(format!("saved {}", self.session.display_name())),
            Err(err) => {
                error!(target: "session.io", ?err, "save_failed");
                self.status = Some(format!("save failed: {err:#}"));
            }
        }
    }

    /// Interactive search: live re-match on each keystroke, Enter commits,
    /// Escape cancels and clears the pattern.
    fn interactive_search(&mut self) -> Result<()> {
        let mut query = self.session.search_seed();
        quill_search::begin_search(&mut self.session.search, &self.session.buffer, &self.session.cursor);
        if !query.is_empty() {
            self.run_query(&query);
        }
        loop {
            self.refresh()?;
            quill_term::paint_prompt("find:", &query, terminal_size()?)?;
            match self.rx.recv() {
                Err(_) => break,
                Ok(Event::Key(key)) => match key.code {
                    KeyCode::Esc => {
                        quill_search::exit_search(&mut self.session.search, &mut self.session.cursor);
                        break;
                    }
                    KeyCode::Enter => {
                        quill_search::end_search(&mut self.session.search, &query);
                        break;
                    }
                    KeyCode::Backspace => {
                        query.pop();
                        if query.is_empty() {
                            self.session.cursor.clear_selection();
                        } else {
                            self.run_query(&query);
                        }
                    }
                    KeyCode::Char(c) if !key.mods.contains(Modifiers::CTRL) => {
                        query.push(c);
                        self.run_query(&query);
                    }
                    _ => {}
                },
                Ok(Event::Paste(text)) => {
                    query.push_str(&text);
                    self.run_query(&query);
                }
                Ok(Event::Resize(..)) => {}
                Ok(Event::Shutdown) => break,
            }
        }
        Ok(())
    }

    fn run_query(&mut self, query: &str) {
        quill_search::search(
            &self.session.buffer,
            &mut self.session.cursor,
            &mut self.session.search,
            query,
            Direction::Forward,
        );
    }

    fn replace_flow(&mut self) -> Result<()> {
        let (pattern, replacement) = {
            let mut prompter = EventPrompter::new(&self.rx);
            let Some(pattern) = prompter.prompt("replace pattern:", &self.session.search.last_pattern)
            else {
                return Ok(());
            };
            if pattern.is_empty() {
                return Ok(());
            }
            let Some(replacement) = prompter.prompt("replace with:", "") else {
                return Ok(());
            };
            (pattern, replacement)
        };
        let mut prompter = EventPrompter::new(&self.rx);
        match quill_search::replace(
            &mut self.session.buffer,
            &mut self.session.journal,
            &mut self.session.cursor,
            &mut self.session.search,
            &pattern,
            &replacement,
            &mut prompter,
        ) {
            Ok(0) => self.status = Some(format!("nothing matched {pattern}")),
            Ok(1) => self.status = Some("replaced 1 occurrence".to_string()),
            Ok(n) => self.status = Some(format!("replaced {n} occurrences")),
            Err(err) => self.status = Some(err.to_string()),
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let _log_guard = configure_logging();
    install_panic_hook();
    info!(target: "runtime", "startup");

    let args = Args::parse();
    let config = quill_config::load_from(args.config.clone())?;
    let storage = FsStorage;

    let mut session = match &args.path {
        Some(path) if path.exists() => Session::open(&storage, path)?,
        Some(path) => {
            let mut s = Session::from_text("");
            s.path = Some(path.clone());
            s
        }
        None => Session::from_text(""),
    };
    session.tab_size = config.tab_size();
    session.set_coalesce_window(config.coalesce_window());

    if config.save_session()
        && let Some(path) = session.path.clone()
        && let Ok(Some(snapshot)) = load_snapshot(&quill_config::state_dir(), &path)
        && session.restore_snapshot(snapshot)
    {
        info!(target: "session.snapshot", "session_restored");
    }

    if let Some(spec) = args.start_pos.as_deref() {
        match parse_start_pos(spec) {
            Some((line, column)) => session.jump_to_start_position(line, column),
            None => error!(target: "runtime.startup", spec, "bad_startpos_ignored"),
        }
    }

    info!(
        target: "runtime.startup",
        buffer = session.display_name(),
        lines = session.buffer.line_count(),
        tab_size = session.tab_size,
        "bootstrap_complete"
    );

    let _terminal = TerminalGuard::enter()?;
    let (tx, rx) = channel();
    let _input = spawn_input(tx);

    let mut editor = Editor {
        session,
        config,
        storage,
        rx,
        top_line: 0,
        left_col: 0,
        status: None,
    };
    editor.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor_with(text: &str) -> Editor {
        let (_tx, rx) = channel();
        Editor {
            session: Session::from_text(text),
            config: Config::default(),
            storage: FsStorage,
            rx,
            top_line: 0,
            left_col: 0,
            status: None,
        }
    }

    #[test]
    fn parses_startpos_pairs() {
        assert_eq!(parse_start_pos("12,3"), Some((12, 3)));
        assert_eq!(parse_start_pos(" 7 , 0 "), Some((7, 0)));
        assert_eq!(parse_start_pos("12"), None);
        assert_eq!(parse_start_pos("a,b"), None);
    }

    #[test]
    fn vertical_scroll_honors_margin() {
        let mut editor = editor_with(&"line\n".repeat(100));
        editor
            .session
            .cursor
            .move_to(&editor.session.buffer, quill_text::Position::new(50, 0), 4);
        let mut vp = Viewport {
            top_line: 0,
            height: 20,
            left_col: 0,
            width: 80,
        };
        editor.scroll_to_cursor(&mut vp);
        // margin 2: cursor row sits 2 above the bottom edge.
        assert_eq!(vp.top_line, 50 + 2 + 1 - 20);

        editor
            .session
            .cursor
            .move_to(&editor.session.buffer, quill_text::Position::new(10, 0), 4);
        let mut vp2 = Viewport {
            top_line: 40,
            height: 20,
            left_col: 0,
            width: 80,
        };
        editor.scroll_to_cursor(&mut vp2);
        assert_eq!(vp2.top_line, 8, "scrolling up keeps the margin");
    }

    #[test]
    fn horizontal_scroll_follows_cursor() {
        let mut editor = editor_with("abcdefghijklmnopqrstuvwxyz");
        editor
            .session
            .cursor
            .move_to(&editor.session.buffer, quill_text::Position::new(0, 25), 4);
        let mut vp = Viewport {
            top_line: 0,
            height: 20,
            left_col: 0,
            width: 10,
        };
        editor.scroll_to_cursor(&mut vp);
        assert_eq!(vp.left_col, 25 + 1 - 10);

        editor
            .session
            .cursor
            .move_to(&editor.session.buffer, quill_text::Position::new(0, 2), 4);
        editor.scroll_to_cursor(&mut vp);
        assert_eq!(vp.left_col, 2);
    }

    #[test]
    fn status_line_reports_position_and_dirty_flag() {
        let mut editor = editor_with("hi");
        assert!(editor.status_line().contains("untitled"));
        assert!(!editor.status_line().contains("[+]"));
        editor.session.insert_text("x");
        assert!(editor.status_line().contains("[+]"));
        assert!(editor.status_line().contains("1:2"));
    }
}
