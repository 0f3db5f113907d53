use std::path::PathBuf;

use groundwater_core::{ChatSession, Completion, Effect, Language, LogEntry, ReportLink, Services};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Chat,
    Reports,
    Input,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,
    pub session: ChatSession,
    pub services: Services,

    // Input box
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Chat view
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub reports_state: ListState,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub reports_area: Option<Rect>,
    pub language_areas: Vec<(Language, Rect)>,

    pub download_dir: PathBuf,
    events: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(
        session: ChatSession,
        services: Services,
        download_dir: PathBuf,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Input,
            session,
            services,

            input: String::new(),
            cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            reports_state: ListState::default(),

            animation_frame: 0,

            chat_area: None,
            reports_area: None,
            language_areas: Vec::new(),

            download_dir,
            events,
        }
    }

    /// Begin the automatic location flow
    pub fn start(&mut self) {
        if let Some(effect) = self.session.start() {
            self.dispatch(effect);
        }
    }

    /// Run an effect in the background; its completion arrives as an `AppEvent`.
    pub fn dispatch(&self, effect: Effect) {
        let services = self.services.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let completion = services.perform(effect).await;
            if events.send(AppEvent::Completed(completion)).is_err() {
                warn!("event loop closed before request finished");
            }
        });
    }

    pub fn submit_input(&mut self) {
        let text = std::mem::take(&mut self.input);
        self.cursor = 0;
        if let Some(effect) = self.session.submit(&text) {
            self.dispatch(effect);
        }
    }

    pub fn complete(&mut self, completion: Completion) {
        let before = self.report_count();
        self.session.complete(completion);

        // Keep the newest report link selected
        let after = self.report_count();
        if after > before {
            self.reports_state.select(Some(after - 1));
        }
    }

    pub fn select_language(&mut self, language: Language) {
        self.session.select_language(language);
    }

    /// Select the next language toggle, wrapping around
    pub fn cycle_language(&mut self) {
        let all = Language::all();
        let current = all
            .iter()
            .position(|l| *l == self.session.language())
            .unwrap_or(0);
        self.select_language(all[(current + 1) % all.len()]);
    }

    pub fn busy(&self) -> bool {
        self.session.pending_replies() > 0 || self.session.detecting_location()
    }

    pub fn report_count(&self) -> usize {
        self.session.conversation().report_links().len()
    }

    pub fn selected_report(&self) -> Option<ReportLink> {
        let links = self.session.conversation().report_links();
        self.reports_state
            .selected()
            .and_then(|i| links.get(i).map(|link| (*link).clone()))
    }

    pub fn reports_nav_down(&mut self) {
        let len = self.report_count();
        if len > 0 {
            let i = self.reports_state.selected().unwrap_or(0);
            self.reports_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn reports_nav_up(&mut self) {
        let i = self.reports_state.selected().unwrap_or(0);
        self.reports_state.select(Some(i.saturating_sub(1)));
    }

    /// Open the selected report in the system browser
    pub fn open_selected_report(&mut self) {
        let Some(link) = self.selected_report() else {
            return;
        };

        let url = match self.services.backend().report_url(&link.location) {
            Ok(url) => url,
            Err(err) => {
                self.session.notify(format!("Could not build report link: {}", err));
                return;
            }
        };

        info!(%url, "opening report");
        if let Err(err) = open_in_browser(url.as_str()) {
            warn!(error = %err, "could not launch browser");
            self.session
                .notify(format!("Could not open a browser. The report is at {}", url));
        }
    }

    /// Download the selected report into the download directory
    pub fn save_selected_report(&mut self) {
        if let Some(link) = self.selected_report() {
            let effect = self.session.save_report(&link.location, self.download_dir.clone());
            self.dispatch(effect);
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Scroll to the newest entry if the conversation grew since the last frame
    pub fn follow_conversation(&mut self) {
        if self.session.conversation_mut().take_scroll_request() {
            self.scroll_chat_to_bottom();
        }
    }

    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;

        for entry in self.session.conversation().entries() {
            match entry {
                LogEntry::Message(msg) => {
                    total_lines = total_lines.saturating_add(1); // Sender line ("You:" or "Bot:")
                    for line in msg.display_lines() {
                        let char_count: usize = line.iter().map(|s| s.text.chars().count()).sum();
                        let height = wrapped_height(char_count, wrap_width);
                        total_lines = total_lines.saturating_add(height);
                    }
                }
                LogEntry::Report(link) => {
                    let label_width = link.label().chars().count() + 4;
                    let height = wrapped_height(label_width, wrap_width);
                    total_lines = total_lines.saturating_add(height);
                }
            }
            total_lines = total_lines.saturating_add(1); // Blank line after entry
        }

        if self.busy() {
            total_lines = total_lines.saturating_add(2); // "Bot:" + "Thinking..."
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height as usize
        } else {
            20
        };

        let scroll = total_lines.saturating_sub(visible_height);
        self.chat_scroll = u16::try_from(scroll).unwrap_or(u16::MAX);
    }
}

/// Lines a run of `char_count` characters takes when wrapped at `wrap_width`
fn wrapped_height(char_count: usize, wrap_width: usize) -> usize {
    if char_count == 0 {
        1 // Empty line still takes one line
    } else {
        char_count.div_ceil(wrap_width.max(1))
    }
}

fn open_in_browser(url: &str) -> std::io::Result<()> {
    use std::process::Command;

    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        // `cmd /C start` splits the URL at `&`
        let mut cmd = Command::new("rundll32");
        cmd.arg("url.dll,FileProtocolHandler");
        cmd
    } else {
        Command::new("xdg-open")
    };

    command.arg(url);
    spawn_reaped(command)
}

/// Start a launcher without waiting for it; a background thread reaps it.
fn spawn_reaped(mut command: std::process::Command) -> std::io::Result<()> {
    use std::process::Stdio;

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    std::thread::spawn(move || child.wait());
    Ok(())
}
