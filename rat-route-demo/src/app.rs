//! Navigation stack driven by router type handles.

use std::collections::VecDeque;
use std::io::{self, stdout};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crossterm::{
    event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use rat_route::{
    Error, LifecycleEvent, Registry, RouteAction, RouteConfig, RouteObserver, RouteOptions, RouteState, Router,
    RouterInstance, RouterType, ScreenRef, Sender,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use tokio::sync::mpsc;

use crate::screens::{ComposeScreen, InboxScreen, MessageScreen, Page};

const LOG_LINES: usize = 200;
/// How long the simulated open-message animation takes.
const OPEN_ANIMATION: Duration = Duration::from_millis(300);

pub type PageHandle = RouterType<dyn Page, dyn RouteConfig>;
type PageRouter = Router<dyn Page, dyn RouteConfig>;

/// Handles for every page the app can route to.
pub struct Handles {
    pub inbox: PageHandle,
    pub message: PageHandle,
    pub compose: PageHandle,
}

/// Observer that mirrors lifecycle notifications into the log panel.
pub struct LifecycleLog {
    lines: Mutex<VecDeque<Line<'static>>>,
    refresh: mpsc::UnboundedSender<()>,
}

impl LifecycleLog {
    pub fn new(refresh: mpsc::UnboundedSender<()>) -> Self {
        Self {
            lines: Mutex::new(VecDeque::new()),
            refresh,
        }
    }

    fn push(&self, line: Line<'static>) {
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        if lines.len() == LOG_LINES {
            lines.pop_front();
        }
        lines.push_back(line);
        let _ = self.refresh.send(());
    }

    fn event(&self, event: LifecycleEvent, router: Option<&RouterInstance>, destination: &ScreenRef) {
        let color = match event {
            LifecycleEvent::WillPerform | LifecycleEvent::DidPerform => Color::Green,
            LifecycleEvent::WillRemove | LifecycleEvent::DidRemove => Color::Magenta,
        };
        let router = router.map_or_else(|| "external".to_string(), |r| r.id().to_string());
        self.push(Line::from(vec![
            Span::styled(format!("{:<13}", event.to_string()), Style::default().fg(color)),
            Span::styled(format!("{router:<9}"), Style::default().fg(Color::DarkGray)),
            Span::raw(destination.title()),
        ]));
    }

    fn snapshot(&self) -> Vec<Line<'static>> {
        let lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        lines.iter().cloned().collect()
    }
}

impl RouteObserver for LifecycleLog {
    fn will_perform(&self, router: Option<&RouterInstance>, destination: &ScreenRef, _source: Option<&ScreenRef>) {
        self.event(LifecycleEvent::WillPerform, router, destination);
    }

    fn did_perform(&self, router: Option<&RouterInstance>, destination: &ScreenRef, _source: Option<&ScreenRef>) {
        self.event(LifecycleEvent::DidPerform, router, destination);
    }

    fn will_remove(&self, router: Option<&RouterInstance>, destination: &ScreenRef, _source: Option<&ScreenRef>) {
        self.event(LifecycleEvent::WillRemove, router, destination);
    }

    fn did_remove(&self, router: Option<&RouterInstance>, destination: &ScreenRef, _source: Option<&ScreenRef>) {
        self.event(LifecycleEvent::DidRemove, router, destination);
    }

    fn route_failed(&self, action: RouteAction, error: &Error) {
        self.push(Line::styled(
            format!("{action} failed: {error}"),
            Style::default().fg(Color::Red),
        ));
    }
}

struct StackEntry {
    router: PageRouter,
    handle: PageHandle,
}

pub struct App {
    registry: Registry,
    handles: Handles,
    log: Arc<LifecycleLog>,
    stack: Vec<StackEntry>,
    status: Arc<Mutex<String>>,
}

impl App {
    pub fn new(registry: Registry, handles: Handles, log: Arc<LifecycleLog>) -> Self {
        Self {
            registry,
            handles,
            log,
            stack: Vec::new(),
            status: Arc::new(Mutex::new(String::from("Ready"))),
        }
    }

    fn set_status(&self, status: impl Into<String>) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = status.into();
    }

    fn top(&self) -> Option<&StackEntry> {
        self.stack.last()
    }

    /// Install the inbox as the root page. Root pages have no source.
    pub fn install_root(&mut self) -> rat_route::Result<()> {
        let router = self.handles.inbox.route_from_view(Arc::new(InboxScreen::new()), None)?;
        router.perform()?;
        self.stack.push(StackEntry {
            router,
            handle: self.handles.inbox.clone(),
        });
        Ok(())
    }

    /// Returns false when the app should quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if let Some(top) = self.top() {
            if top.router.destination().handle_key(key) {
                return true;
            }
        }

        let result = match key.code {
            KeyCode::Char('q') => return false,
            KeyCode::Enter => self.open_message(),
            KeyCode::Char('c') | KeyCode::Tab => self.compose(),
            KeyCode::Char('m') => self.open_message_directly(),
            KeyCode::Esc => self.close_top(),
            KeyCode::Char('x') => self.dismiss_externally(),
            _ => Ok(()),
        };
        if let Err(err) = result {
            self.set_status(err.to_string());
        }
        true
    }

    /// The inbox's "openMail" transition: the host builds the destination and
    /// hands the selected mail along as the sender.
    fn open_message(&mut self) -> rat_route::Result<()> {
        let Some(top) = self.top() else { return Ok(()) };
        let Some(inbox) = rat_route::screen::downcast_ref::<InboxScreen>(top.router.instance().destination()) else {
            return Ok(());
        };
        let Some(mail) = inbox.selected_mail() else { return Ok(()) };

        let source = top.router.instance().destination().clone();
        let sender: Sender = Arc::new(mail);
        let router = self.handles.message.route_from_transition(
            "openMail",
            Some(sender),
            Arc::new(MessageScreen::default()),
            source,
        )?;

        // The transition animates for a while; did-perform fires when it ends.
        let pending = router.begin()?;
        tokio::spawn(async move {
            tokio::time::sleep(OPEN_ANIMATION).await;
            if let Err(err) = pending.complete() {
                tracing::warn!(%err, "Open transition did not complete");
            }
        });

        self.set_status(format!("Opening {}", router.destination().title()));
        self.stack.push(StackEntry {
            router,
            handle: self.handles.message.clone(),
        });
        Ok(())
    }

    /// Message pages only accept declarative routing; this is rejected.
    fn open_message_directly(&mut self) -> rat_route::Result<()> {
        let source = self.top().map(|top| top.router.instance().destination().clone());
        self.handles
            .message
            .route_from_view(Arc::new(MessageScreen::default()), source)?;
        Ok(())
    }

    fn compose(&mut self) -> rat_route::Result<()> {
        let source = self.top().map(|top| top.router.instance().destination().clone());
        let status = Arc::clone(&self.status);
        let options = RouteOptions::default().with_completion(move |action, outcome| {
            *status.lock().unwrap_or_else(PoisonError::into_inner) = format!("compose {action}: {outcome:?}");
        });

        let router = self
            .handles
            .compose
            .route_from_view_with(Arc::new(ComposeScreen::default()), source, options)?;
        router.perform()?;
        self.stack.push(StackEntry {
            router,
            handle: self.handles.compose.clone(),
        });
        Ok(())
    }

    fn close_top(&mut self) -> rat_route::Result<()> {
        if !self.can_pop()? {
            return Ok(());
        }
        if let Some(entry) = self.stack.pop() {
            entry.router.remove()?;
            self.set_status(format!("Closed {}", entry.router.destination().title()));
        }
        Ok(())
    }

    /// Simulates the host UI dismissing the top page on its own; the router
    /// is not involved, so both removal hooks fire without one.
    fn dismiss_externally(&mut self) -> rat_route::Result<()> {
        if !self.can_pop()? {
            return Ok(());
        }
        if let Some(entry) = self.stack.pop() {
            let destination = entry.router.instance().destination();
            entry.handle.remove_externally(destination, entry.router.source())?;
            self.set_status(format!("{} dismissed", destination.title()));
        }
        Ok(())
    }

    /// The root stays, and a page still animating in cannot be removed yet.
    fn can_pop(&self) -> rat_route::Result<bool> {
        let Some(top) = self.top() else { return Ok(false) };
        if self.stack.len() == 1 {
            return Ok(false);
        }
        match top.router.state()? {
            RouteState::Routed => Ok(true),
            state => {
                self.set_status(format!("{} is {state}", top.router.destination().title()));
                Ok(false)
            }
        }
    }

    fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0), Constraint::Length(2)])
            .split(frame.area());
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        let breadcrumb: Vec<String> = self
            .stack
            .iter()
            .map(|entry| entry.router.destination().title())
            .collect();
        frame.render_widget(
            Paragraph::new(format!(" rat-route  {}", breadcrumb.join(" › ")))
                .style(Style::default().fg(Color::Black).bg(Color::Cyan)),
            chunks[0],
        );

        if let Some(top) = self.top() {
            top.router.destination().render(frame, body[0]);
        }

        let lines = self.log.snapshot();
        let visible = body[1].height.saturating_sub(2) as usize;
        let items: Vec<ListItem> = lines
            .into_iter()
            .rev()
            .take(visible)
            .rev()
            .map(ListItem::new)
            .collect();
        frame.render_widget(
            List::new(items).block(Block::default().title(" Lifecycle ").borders(Borders::ALL)),
            body[1],
        );

        let route_types = self
            .top()
            .map(|top| self.registry.route_types_of(top.router.instance().destination()))
            .unwrap_or_default();
        let status = self.status.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let footer = vec![
            Line::from(vec![
                Span::styled(" ↑↓ ", Style::default().fg(Color::Yellow)),
                Span::raw("select  "),
                Span::styled("Enter ", Style::default().fg(Color::Yellow)),
                Span::raw("open  "),
                Span::styled("Tab ", Style::default().fg(Color::Yellow)),
                Span::raw("compose  "),
                Span::styled("m ", Style::default().fg(Color::Yellow)),
                Span::raw("open directly  "),
                Span::styled("Esc ", Style::default().fg(Color::Yellow)),
                Span::raw("close  "),
                Span::styled("x ", Style::default().fg(Color::Yellow)),
                Span::raw("dismiss  "),
                Span::styled("q ", Style::default().fg(Color::Yellow)),
                Span::raw("quit"),
            ]),
            Line::from(vec![
                Span::styled(format!(" {status}"), Style::default().fg(Color::White)),
                Span::styled(format!("  [{route_types:?}]"), Style::default().fg(Color::DarkGray)),
            ]),
        ];
        frame.render_widget(Paragraph::new(footer), chunks[2]);
    }

    /// Run the terminal loop until the user quits.
    pub async fn run(mut self, mut refresh_rx: mpsc::UnboundedReceiver<()>) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.run_app_loop(&mut terminal, &mut refresh_rx).await;

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    async fn run_app_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        refresh_rx: &mut mpsc::UnboundedReceiver<()>,
    ) -> anyhow::Result<()> {
        terminal.draw(|frame| self.render(frame))?;

        loop {
            tokio::select! {
                Some(()) = refresh_rx.recv() => {
                    terminal.draw(|frame| self.render(frame))?;
                }
                event_ready = async { event::poll(Duration::from_millis(100)) } => {
                    if let Ok(true) = event_ready {
                        if let CrosstermEvent::Key(key) = event::read()? {
                            if key.kind == KeyEventKind::Press && !self.handle_key(key) {
                                return Ok(());
                            }
                        }
                        terminal.draw(|frame| self.render(frame))?;
                    }
                }
            }
        }
    }
}
