//! Mail screens and the routes that reach them.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crossterm::event::{KeyCode, KeyEvent};
use rat_route::{
    RouteConfig, RouteOptions, Screen, ScreenRef, Transition, ViewRoute, ViewRouteConfig, impl_upcast, routable,
};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, List, ListItem, Paragraph, Wrap};
use ratatui::Frame;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A screen the demo can draw.
pub trait Page: Screen {
    fn render(&self, frame: &mut Frame, area: Rect);

    /// Returns true if the key was consumed.
    fn handle_key(&self, key: KeyEvent) -> bool {
        let _ = key;
        false
    }
}

#[derive(Debug, Clone)]
pub struct Mail {
    pub from: &'static str,
    pub subject: &'static str,
    pub body: &'static str,
}

fn page_block(title: String) -> Block<'static> {
    Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Cyan))
}

#[routable(programmatic)]
pub struct InboxScreen {
    mails: Vec<Mail>,
    selected: Mutex<usize>,
}

impl InboxScreen {
    pub fn new() -> Self {
        Self {
            mails: vec![
                Mail {
                    from: "ops@example.com",
                    subject: "Deploy finished",
                    body: "The 14:00 deploy went out cleanly. No rollbacks needed.",
                },
                Mail {
                    from: "alice@example.com",
                    subject: "Lunch on Friday?",
                    body: "There's a new ramen place around the corner. Noon?",
                },
                Mail {
                    from: "billing@example.com",
                    subject: "Invoice #2291",
                    body: "Your invoice for October is attached. Thanks for your business.",
                },
            ],
            selected: Mutex::new(0),
        }
    }

    pub fn selected_mail(&self) -> Option<Mail> {
        self.mails.get(*lock(&self.selected)).cloned()
    }
}

impl Default for InboxScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl Page for InboxScreen {
    fn render(&self, frame: &mut Frame, area: Rect) {
        let selected = *lock(&self.selected);
        let items: Vec<ListItem> = self
            .mails
            .iter()
            .enumerate()
            .map(|(i, mail)| {
                let style = if i == selected {
                    Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{:<22}", mail.from), style.fg(Color::Yellow)),
                    Span::styled(mail.subject, style),
                ]))
                .style(style)
            })
            .collect();

        frame.render_widget(List::new(items).block(page_block(self.title())), area);
    }

    fn handle_key(&self, key: KeyEvent) -> bool {
        let mut selected = lock(&self.selected);
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                *selected = selected.saturating_sub(1);
                true
            }
            KeyCode::Down | KeyCode::Char('j') => {
                *selected = (*selected + 1).min(self.mails.len().saturating_sub(1));
                true
            }
            _ => false,
        }
    }
}

impl_upcast!(InboxScreen => dyn Page);

/// Opened by the inbox's "openMail" transition only.
#[routable(declarative, no_screen)]
#[derive(Default)]
pub struct MessageScreen {
    mail: Mutex<Option<Mail>>,
}

impl Screen for MessageScreen {
    fn title(&self) -> String {
        match &*lock(&self.mail) {
            Some(mail) => mail.subject.to_string(),
            None => "Message".to_string(),
        }
    }
}

impl Page for MessageScreen {
    fn render(&self, frame: &mut Frame, area: Rect) {
        let block = page_block(self.title());
        let lines = match &*lock(&self.mail) {
            Some(mail) => vec![
                Line::from(vec![Span::styled("From: ", Style::default().fg(Color::DarkGray)), Span::raw(mail.from)]),
                Line::from(""),
                Line::from(mail.body),
            ],
            None => vec![Line::styled("(no message)", Style::default().fg(Color::DarkGray))],
        };
        let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

impl_upcast!(MessageScreen => dyn Page);

#[routable(programmatic)]
#[derive(Default)]
pub struct ComposeScreen {
    draft: Mutex<String>,
}

impl Page for ComposeScreen {
    fn render(&self, frame: &mut Frame, area: Rect) {
        let draft = lock(&self.draft).clone();
        let paragraph = Paragraph::new(format!("{draft}_"))
            .block(page_block(self.title()))
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn handle_key(&self, key: KeyEvent) -> bool {
        let mut draft = lock(&self.draft);
        match key.code {
            KeyCode::Char(c) => {
                draft.push(c);
                true
            }
            KeyCode::Backspace => {
                draft.pop();
                true
            }
            _ => false,
        }
    }
}

impl_upcast!(ComposeScreen => dyn Page);

pub struct InboxRoute;

impl ViewRoute for InboxRoute {
    type Destination = InboxScreen;
    type Config = ViewRouteConfig;

    fn default_config(&self) -> ViewRouteConfig {
        ViewRouteConfig {
            options: RouteOptions::default().with_animated(false),
        }
    }
}

#[derive(Default)]
pub struct MessageConfig {
    pub options: RouteOptions,
    pub mail: Option<Mail>,
}

impl RouteConfig for MessageConfig {
    fn options(&self) -> &RouteOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut RouteOptions {
        &mut self.options
    }
}

impl_upcast!(MessageConfig => dyn RouteConfig);

pub struct MessageRoute;

impl ViewRoute for MessageRoute {
    type Destination = MessageScreen;
    type Config = MessageConfig;

    fn default_config(&self) -> MessageConfig {
        MessageConfig::default()
    }

    fn configure_transition(&self, config: &mut MessageConfig, transition: &Transition) {
        config.mail = transition.sender_as::<Mail>().cloned();
    }

    fn prepare_destination(&self, destination: &MessageScreen, config: &MessageConfig) {
        *lock(&destination.mail) = config.mail.clone();
    }
}

pub struct ComposeRoute;

impl ViewRoute for ComposeRoute {
    type Destination = ComposeScreen;
    type Config = ViewRouteConfig;

    fn default_config(&self) -> ViewRouteConfig {
        ViewRouteConfig::default()
    }

    fn perform(
        &self,
        _destination: &ComposeScreen,
        source: Option<&ScreenRef>,
        config: &ViewRouteConfig,
    ) -> rat_route::Result<()> {
        tracing::info!(
            source = ?source.map(|s| s.title()),
            animated = config.options.animated,
            "Presenting compose sheet"
        );
        Ok(())
    }

    fn did_remove_route(
        &self,
        _router: Option<&rat_route::RouterInstance>,
        destination: &ComposeScreen,
        _source: Option<&ScreenRef>,
    ) {
        let draft = lock(&destination.draft);
        if !draft.is_empty() {
            tracing::info!(chars = draft.chars().count(), "Discarded draft");
        }
    }
}
