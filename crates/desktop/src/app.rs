//! Lookout Desktop: egui app state and UI.

use eframe::egui;
use lib::bot::{BotController, StopOutcome};
use lib::config::Config;
use lib::credentials::{CredentialKind, CredentialStore};
use lib::settings::SharedSettings;
use std::collections::VecDeque;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

const LOG_BUFFER_MAX_LINES: usize = 2000;
const INSTRUCTION_PREVIEW_CHARS: usize = 50;

/// Frames are redrawn at least this often so a worker that died on its own shows as stopped.
const STATE_REFRESH: Duration = Duration::from_secs(1);

const GREEN: egui::Color32 = egui::Color32::from_rgb(46, 160, 67);
const RED: egui::Color32 = egui::Color32::from_rgb(207, 34, 46);
const ORANGE: egui::Color32 = egui::Color32::from_rgb(219, 118, 20);
const BLUE: egui::Color32 = egui::Color32::from_rgb(9, 105, 218);

/// Ring buffer of log lines for the Logs screen.
static LOG_LINES: OnceLock<Mutex<VecDeque<String>>> = OnceLock::new();

static LOGGER: OnceLock<DesktopLogger> = OnceLock::new();

fn log_buffer() -> &'static Mutex<VecDeque<String>> {
    LOG_LINES.get_or_init(|| Mutex::new(VecDeque::new()))
}

fn push_log_line(line: String) {
    if let Ok(mut buf) = log_buffer().lock() {
        buf.push_back(line);
        while buf.len() > LOG_BUFFER_MAX_LINES {
            buf.pop_front();
        }
    }
}

/// Logger that appends to LOG_LINES for the Logs screen and forwards to env_logger (RUST_LOG) on stderr.
struct DesktopLogger {
    stderr: env_logger::Logger,
}

impl log::Log for DesktopLogger {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let line = format!(
            "{} [{}] {}",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            record.level(),
            record.args()
        );
        push_log_line(line);
        self.stderr.log(record);
    }

    fn flush(&self) {
        self.stderr.flush();
    }
}

/// Install the desktop logger once for the whole process.
pub fn install_logger() {
    let logger = LOGGER.get_or_init(|| DesktopLogger {
        stderr: env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .build(),
    });
    if log::set_logger(logger).is_ok() {
        log::set_max_level(log::LevelFilter::Debug);
    }
}

fn instruction_preview(instruction: &str) -> String {
    let head: String = instruction.chars().take(INSTRUCTION_PREVIEW_CHARS).collect();
    format!("Saved instruction: {}...", head)
}

#[derive(Clone, Copy, PartialEq, Eq, Default)]
enum Screen {
    #[default]
    Settings,
    Logs,
}

#[derive(Clone, Copy)]
enum StatusKind {
    Success,
    Error,
    Notice,
}

struct StatusLine {
    text: String,
    kind: StatusKind,
}

pub struct LookoutApp {
    store: CredentialStore,
    /// Model key and instruction as seen by the bot worker.
    settings: SharedSettings,
    controller: BotController,
    /// Telegram token the next start uses (last saved value).
    telegram_token: Option<String>,
    telegram_token_input: String,
    gemini_key_input: String,
    instruction_input: String,
    /// Last saved instruction, for the preview under the editor.
    saved_instruction: Option<String>,
    /// Result of the last user action.
    status: Option<StatusLine>,
    current_screen: Screen,
}

impl LookoutApp {
    const SCREEN_TITLE_BOTTOM_SPACING: f32 = 16.0;
    const SCREEN_FOOTER_SPACING: f32 = 24.0;

    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let (config, dir) = match lib::config::load_config(None) {
            Ok(pair) => pair,
            Err(e) => {
                log::warn!("failed to load config, using defaults: {:#}", e);
                (Config::default(), lib::config::default_config_dir())
            }
        };
        log::info!("desktop started, config directory {}", dir.display());
        let store = CredentialStore::new(dir);
        let settings = SharedSettings::from_store(&store);
        let controller = lib::bot::build_controller(&config, settings.clone());
        let telegram_token = store.resolve(CredentialKind::ChatToken);
        let snapshot = settings.snapshot();

        let mut app = Self {
            store,
            settings,
            controller,
            telegram_token_input: telegram_token.clone().unwrap_or_default(),
            telegram_token,
            gemini_key_input: snapshot.model_key.unwrap_or_default(),
            instruction_input: snapshot.instruction.clone().unwrap_or_default(),
            saved_instruction: snapshot.instruction,
            status: None,
            current_screen: Screen::default(),
        };
        if app.telegram_token.is_some() {
            app.start_bot();
        }
        app
    }

    fn set_status(&mut self, kind: StatusKind, text: impl Into<String>) {
        self.status = Some(StatusLine {
            text: text.into(),
            kind,
        });
    }

    fn start_bot(&mut self) {
        let Some(token) = self.telegram_token.clone() else {
            self.set_status(
                StatusKind::Error,
                "❌ Cannot start. Save the Telegram token first.",
            );
            return;
        };
        if let Err(e) = self.controller.start(&token) {
            log::warn!("failed to start bot: {}", e);
            self.set_status(StatusKind::Error, format!("❌ Failed to start bot: {}", e));
        }
    }

    fn stop_bot(&mut self) {
        let timeout = self.controller.stop_timeout();
        if self.controller.stop(timeout) == StopOutcome::TimedOut {
            self.set_status(
                StatusKind::Notice,
                "Bot is finishing a request and will stop shortly.",
            );
        }
    }

    fn toggle_bot(&mut self) {
        if self.controller.is_running() {
            self.stop_bot();
        } else {
            self.start_bot();
        }
    }

    fn save_telegram_token(&mut self) {
        let token = self.telegram_token_input.trim().to_string();
        if token.is_empty() {
            self.set_status(StatusKind::Error, "❌ Please enter the Telegram token!");
            return;
        }
        match self.store.save(CredentialKind::ChatToken, &token) {
            Ok(()) => {
                self.telegram_token = Some(token);
                self.set_status(StatusKind::Success, "✅ Telegram token saved!");
                if self.controller.is_running() {
                    // start() stops the running session before connecting with the new token.
                    self.start_bot();
                }
            }
            Err(e) => {
                log::warn!("failed to save telegram token: {}", e);
                self.set_status(StatusKind::Error, "❌ Failed to save the Telegram token!");
            }
        }
    }

    fn save_gemini_key(&mut self) {
        let key = self.gemini_key_input.trim().to_string();
        if key.is_empty() {
            self.set_status(StatusKind::Error, "❌ Please enter the Gemini token!");
            return;
        }
        match self.store.save(CredentialKind::ModelKey, &key) {
            Ok(()) => {
                self.settings.set_model_key(Some(key));
                self.set_status(StatusKind::Success, "✅ Gemini token saved!");
            }
            Err(e) => {
                log::warn!("failed to save gemini token: {}", e);
                self.set_status(StatusKind::Error, "❌ Failed to save the Gemini token!");
            }
        }
    }

    fn save_instruction(&mut self) {
        if self.instruction_input.trim().is_empty() {
            self.set_status(StatusKind::Error, "❌ Please enter an instruction!");
            return;
        }
        let instruction = self.instruction_input.clone();
        match self.store.save(CredentialKind::Instruction, &instruction) {
            Ok(()) => {
                self.settings.set_instruction(Some(instruction.clone()));
                self.saved_instruction = Some(instruction);
                self.set_status(StatusKind::Success, "✅ Instruction saved!");
            }
            Err(e) => {
                log::warn!("failed to save instruction: {}", e);
                self.set_status(StatusKind::Error, "❌ Failed to save the instruction to file!");
            }
        }
    }

    fn clear_instruction(&mut self) {
        self.settings.set_instruction(None);
        self.instruction_input.clear();
        self.saved_instruction = None;
        match self.store.clear(CredentialKind::Instruction) {
            Ok(()) => self.set_status(StatusKind::Notice, "🗑 Instruction cleared!"),
            Err(e) => {
                log::warn!("failed to delete instruction file: {}", e);
                self.set_status(
                    StatusKind::Error,
                    "❌ Instruction cleared, but the file could not be deleted.",
                );
            }
        }
    }

    fn ui_settings_screen(&mut self, ui: &mut egui::Ui) {
        ui.add_space(24.0);
        ui.heading("Telegram and Gemini");
        ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);

        let running = self.controller.is_running();
        ui.horizontal(|ui| {
            ui.add(
                egui::TextEdit::singleline(&mut self.telegram_token_input)
                    .password(true)
                    .hint_text("Telegram bot token")
                    .desired_width(320.0),
            );
            if ui.button("Save token").clicked() {
                self.save_telegram_token();
            }
            let (label, fill) = if running { ("Stop", RED) } else { ("Start", GREEN) };
            let toggle = egui::Button::new(egui::RichText::new(label).color(egui::Color32::WHITE))
                .fill(fill);
            if ui.add(toggle).clicked() {
                self.toggle_bot();
            }
        });
        ui.add_space(8.0);
        ui.horizontal(|ui| {
            ui.add(
                egui::TextEdit::singleline(&mut self.gemini_key_input)
                    .password(true)
                    .hint_text("Gemini API token")
                    .desired_width(320.0),
            );
            if ui.button("Save token").clicked() {
                self.save_gemini_key();
            }
        });

        ui.add_space(12.0);
        ui.separator();
        let running = self.controller.is_running();
        let (state_text, state_color) = if running {
            ("Bot: Running ✅", GREEN)
        } else {
            ("Bot: Stopped ❌", RED)
        };
        ui.vertical_centered(|ui| {
            ui.label(egui::RichText::new(state_text).strong().color(state_color));
        });
        ui.separator();

        ui.add_space(12.0);
        ui.heading("Report instruction");
        ui.add_space(8.0);
        ui.add(
            egui::TextEdit::multiline(&mut self.instruction_input)
                .hint_text("Prompt for the model, e.g. 'Write a detailed report about this screenshot'")
                .desired_rows(5)
                .desired_width(f32::INFINITY),
        );
        ui.add_space(8.0);
        ui.horizontal(|ui| {
            if ui.button("Save").clicked() {
                self.save_instruction();
            }
            if ui.button("Clear").clicked() {
                self.clear_instruction();
            }
        });

        ui.add_space(12.0);
        if let Some(status) = &self.status {
            let color = match status.kind {
                StatusKind::Success => GREEN,
                StatusKind::Error => RED,
                StatusKind::Notice => ORANGE,
            };
            ui.colored_label(color, status.text.as_str());
        }
        if let Some(instruction) = &self.saved_instruction {
            ui.add_space(8.0);
            ui.colored_label(BLUE, instruction_preview(instruction));
        }
        ui.add_space(Self::SCREEN_FOOTER_SPACING);
    }

    fn ui_logs_screen(&self, ui: &mut egui::Ui) {
        ui.add_space(24.0);
        ui.heading("Logs");
        ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);

        let lines: Vec<String> = log_buffer()
            .lock()
            .map(|b| b.iter().cloned().collect())
            .unwrap_or_default();

        let available = ui.available_height();
        let scroll_height = (available - Self::SCREEN_FOOTER_SPACING).max(0.0);
        egui::ScrollArea::vertical()
            .max_height(scroll_height)
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in &lines {
                    ui.label(
                        egui::RichText::new(line.as_str()).family(egui::FontFamily::Monospace),
                    );
                }
                if lines.is_empty() {
                    ui.label("No log output yet.");
                }
            });
        ui.add_space(Self::SCREEN_FOOTER_SPACING);
    }
}

impl eframe::App for LookoutApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint_after(STATE_REFRESH);

        let current_screen = &mut self.current_screen;
        egui::SidePanel::left("sidebar")
            .resizable(false)
            .exact_width(120.0)
            .show(ctx, |ui| {
                egui::Frame::none()
                    .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                    .show(ui, |ui| {
                        ui.add_space(24.0);
                        if ui
                            .selectable_label(*current_screen == Screen::Settings, "Settings")
                            .clicked()
                        {
                            *current_screen = Screen::Settings;
                        }
                        ui.add_space(12.0);
                        if ui
                            .selectable_label(*current_screen == Screen::Logs, "Logs")
                            .clicked()
                        {
                            *current_screen = Screen::Logs;
                        }
                    });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::Frame::none()
                .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                .show(ui, |ui| match self.current_screen {
                    Screen::Settings => {
                        egui::ScrollArea::vertical().show(ui, |ui| self.ui_settings_screen(ui));
                    }
                    Screen::Logs => self.ui_logs_screen(ui),
                });
        });
    }
}
