pub mod render;

use crate::command::BlockBackend;
use crate::editor::{DocumentEditor, Navigation};
use crate::error::{BlockcaretError, Result, UiError};
use crate::keyboard::{Key, KeyCode};
use crate::surface::{Point, TreeSurface};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyEvent, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::{backend::CrosstermBackend, Terminal};
use render::{render_document, StatusLineInfo};
use std::io::stdout;
use std::time::Duration;

pub struct TuiApplication<B: BlockBackend> {
    document: DocumentEditor<B, TreeSurface>,
    running: bool,
    message: Option<String>,
}

impl<B: BlockBackend> TuiApplication<B> {
    pub fn new(document: DocumentEditor<B, TreeSurface>) -> Self {
        Self {
            document,
            running: true,
            message: None,
        }
    }

    pub fn document(&self) -> &DocumentEditor<B, TreeSurface> {
        &self.document
    }

    pub fn run(&mut self) -> Result<()> {
        enter_terminal()?;

        let backend = CrosstermBackend::new(stdout());
        let mut terminal = Terminal::new(backend).map_err(|err| terminal_error("terminal init", err))?;

        let loop_result = self.event_loop(&mut terminal);
        let show_cursor_result = terminal.show_cursor().map_err(|err| terminal_error("show cursor", err));
        drop(terminal);
        let cleanup_result = leave_terminal();

        // 終了前に保留中の編集を書き出す
        let flush_result = self.document.exit_edit();
        loop_result.and(show_cursor_result).and(cleanup_result).and(flush_result)
    }

    fn event_loop<T: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<T>) -> Result<()> {
        while self.running {
            let tick = self.document.tick();
            self.record(tick);
            self.render(terminal)?;

            if event::poll(Duration::from_millis(16)).map_err(|err| terminal_error("event poll", err))? {
                match event::read().map_err(|err| terminal_error("event read", err))? {
                    Event::Key(key_event) => self.handle_key_event(key_event),
                    Event::Mouse(mouse_event) => self.handle_mouse_event(mouse_event),
                    Event::Resize(_, _) | Event::FocusGained | Event::FocusLost | Event::Paste(_) => {}
                }
            }
        }

        Ok(())
    }

    fn handle_key_event(&mut self, key_event: KeyEvent) {
        if key_event.kind != KeyEventKind::Press {
            return;
        }
        let key = Key::from(key_event);
        let result = match key.code {
            KeyCode::Char('q') if key.modifiers.ctrl => {
                self.running = false;
                Ok(())
            }
            KeyCode::Char('t') if key.modifiers.ctrl => self.document.toggle_checked().map(|_| ()),
            KeyCode::Esc => self.document.exit_edit(),
            KeyCode::Up if key.modifiers.alt => self.document.move_active(Navigation::Previous).map(|_| ()),
            KeyCode::Down if key.modifiers.alt => self.document.move_active(Navigation::Next).map(|_| ()),
            _ => self.document.handle_key(key),
        };
        self.record(result);
    }

    fn handle_mouse_event(&mut self, mouse_event: MouseEvent) {
        if mouse_event.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let point = Point::new(mouse_event.column, mouse_event.row);
        let result = self.document.click(point).map(|_| ());
        self.record(result);
    }

    /// 失敗は状態行に出して編集を続ける
    fn record(&mut self, result: Result<()>) {
        match result {
            Ok(()) => {}
            Err(err) => {
                err.report("tui");
                self.message = Some(err.to_string());
            }
        }
    }

    fn render<T: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<T>) -> Result<()> {
        let status = StatusLineInfo {
            message: self.message.as_deref(),
        };
        let document = &self.document;
        terminal
            .draw(|frame| {
                if let Some((x, y)) = render_document(frame, document, status) {
                    frame.set_cursor_position(ratatui::layout::Position::new(x, y));
                }
            })
            .map(|_| ())
            .map_err(|err| terminal_error("render", err))
    }
}

fn enter_terminal() -> Result<()> {
    enable_raw_mode().map_err(|err| terminal_error("enable raw mode", err))?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen, EnableMouseCapture)
        .map_err(|err| terminal_error("enter alternate screen", err))?;
    Ok(())
}

fn leave_terminal() -> Result<()> {
    let mut out = stdout();
    execute!(out, DisableMouseCapture, LeaveAlternateScreen)
        .map_err(|err| terminal_error("leave alternate screen", err))?;
    disable_raw_mode().map_err(|err| terminal_error("disable raw mode", err))?;
    Ok(())
}

fn terminal_error(context: &str, err: impl std::fmt::Display) -> BlockcaretError {
    BlockcaretError::Ui(UiError::RenderingFailed {
        component: format!("{}: {}", context, err),
    })
}
