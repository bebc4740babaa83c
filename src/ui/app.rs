use std::sync::Arc;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use chrono::Utc;
use eframe::egui::{self, Color32, RichText, ScrollArea, TextEdit, TopBottomPanel, Ui};

use super::dial::{DialPalette, paint_dial};
use crate::clock::catalog::TimezoneCatalog;
use crate::clock::registry::ClockRegistry;
use crate::error::ClockResult;
use crate::locale;
use crate::prefs::{
    DIAL_STYLES, Preferences, PreferencesPatch, PreferencesStore, Theme, TimeFormat,
};
use crate::render_loop::RenderLoop;
use crate::services::chime::ChimePlayer;
use crate::services::clipboard::{ClipboardSink, SystemClipboard};
use crate::services::geolocation::{GeolocationProvider, Position, locate_in_background};
use crate::services::weather;

const DIAL_DIAMETER: f32 = 190.0;
const LANGUAGE_CHOICES: [&str; 6] = ["en", "zh-CN", "zh-TW", "ja", "de", "fr"];

pub struct GuiContext {
    pub registry: ClockRegistry,
    pub prefs: PreferencesStore,
    pub chime: Box<dyn ChimePlayer>,
    pub geolocation: Option<Arc<dyn GeolocationProvider>>,
    pub weather_api_key: Option<String>,
}

pub fn run_gui(context: GuiContext) -> Result<()> {
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("World Clock")
            .with_inner_size([1180.0, 760.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    let app = WorldClockApp::new(context);

    eframe::run_native(
        "World Clock",
        native_options,
        Box::new(move |_cc| Ok(Box::new(app))),
    )
    .map_err(|err| anyhow::anyhow!("failed to launch world clock window: {err}"))?;

    Ok(())
}

fn configure_theme(ctx: &egui::Context, theme: Theme) {
    let visuals = match theme {
        Theme::Dark => {
            let mut visuals = egui::Visuals::dark();
            visuals.override_text_color = Some(Color32::from_rgb(226, 234, 246));
            visuals.panel_fill = Color32::from_rgb(8, 16, 26);
            visuals.window_fill = Color32::from_rgb(12, 20, 32);
            visuals.widgets.inactive.bg_fill = Color32::from_rgb(16, 24, 38);
            visuals.widgets.hovered.bg_fill = Color32::from_rgb(26, 42, 62);
            visuals.widgets.active.bg_fill = Color32::from_rgb(34, 60, 88);
            visuals.selection.bg_fill = Color32::from_rgb(43, 148, 178);
            visuals
        }
        Theme::Light => {
            let mut visuals = egui::Visuals::light();
            visuals.panel_fill = Color32::from_rgb(241, 243, 245);
            visuals.window_fill = Color32::from_rgb(248, 249, 250);
            visuals.selection.bg_fill = Color32::from_rgb(116, 192, 252);
            visuals
        }
    };
    ctx.set_visuals(visuals);
}

struct WorldClockApp {
    registry: ClockRegistry,
    prefs_store: PreferencesStore,
    prefs: Preferences,
    applied_theme: Option<Theme>,
    render_loop: RenderLoop,
    chime: Box<dyn ChimePlayer>,
    clipboard: Box<dyn ClipboardSink>,
    locate: Option<Receiver<ClockResult<Position>>>,
    weather_api_key: Option<String>,
    status_message: Option<(String, Instant)>,
    name_input: String,
    timezone_filter: String,
    selected_timezone: Option<&'static str>,
    fullscreen: bool,
}

impl WorldClockApp {
    fn new(context: GuiContext) -> Self {
        let prefs = context.prefs.get();
        let mut render_loop = RenderLoop::new();
        render_loop.start(Instant::now());
        Self {
            registry: context.registry,
            prefs_store: context.prefs,
            prefs,
            applied_theme: None,
            render_loop,
            chime: context.chime,
            clipboard: Box::new(SystemClipboard::default()),
            locate: context.geolocation.map(locate_in_background),
            weather_api_key: context.weather_api_key,
            status_message: None,
            name_input: String::new(),
            timezone_filter: String::new(),
            selected_timezone: None,
            fullscreen: false,
        }
    }

    fn set_status(&mut self, text: impl Into<String>, ttl: Duration) {
        self.status_message = Some((text.into(), Instant::now() + ttl));
    }

    fn update_preferences(&mut self, patch: PreferencesPatch) {
        let language_changed = patch
            .language
            .as_ref()
            .is_some_and(|language| *language != self.prefs.language);
        match self.prefs_store.set(patch) {
            Ok(prefs) => {
                self.prefs = prefs;
                if language_changed {
                    self.registry.set_weather_dispatcher(weather::dispatcher_for(
                        self.weather_api_key.as_deref(),
                        &self.prefs.language,
                    ));
                }
            }
            Err(err) => self.set_status(
                format!("Saving preferences failed: {err}"),
                Duration::from_secs(4),
            ),
        }
    }

    fn poll_geolocation(&mut self) {
        let Some(receiver) = &self.locate else {
            return;
        };
        let result = match receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                self.locate = None;
                return;
            }
        };
        self.locate = None;

        let timezone = locale::local_timezone();
        match self.registry.apply_location(result, &timezone) {
            Ok(true) => {
                self.set_status(format!("Added local clock ({timezone})"), Duration::from_secs(3))
            }
            Ok(false) => {}
            Err(err) => self.set_status(
                format!("Adding local clock failed: {err}"),
                Duration::from_secs(4),
            ),
        }
    }

    fn add_clock_from_form(&mut self) -> Result<String> {
        let name = self.name_input.trim().to_string();
        if name.is_empty() {
            bail!("enter a name for the clock");
        }
        let Some(timezone) = self.selected_timezone else {
            bail!("pick a timezone");
        };
        self.registry.add_clock(&name, timezone)?;
        self.name_input.clear();
        Ok(format!("Added {name} ({timezone})"))
    }

    fn share(&mut self) {
        let json = self.registry.store().export_json();
        match self.clipboard.write(&json) {
            Ok(()) => self.set_status(
                format!("Copied {} clocks to the clipboard", self.registry.store().len()),
                Duration::from_secs(3),
            ),
            Err(err) => self.set_status(format!("Share failed: {err}"), Duration::from_secs(4)),
        }
    }

    fn toggle_fullscreen(&mut self, ctx: &egui::Context) {
        self.fullscreen = !self.fullscreen;
        ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(self.fullscreen));
    }

    fn show_header(&mut self, ui: &mut Ui) {
        let accent = match self.prefs.theme {
            Theme::Dark => Color32::from_rgb(96, 228, 206),
            Theme::Light => Color32::from_rgb(24, 100, 171),
        };
        ui.horizontal_wrapped(|ui| {
            ui.label(RichText::new("World Clock").size(26.0).color(accent).strong());
            ui.separator();
            ui.label(
                RichText::new(format!(
                    "UTC {}",
                    Utc::now().format(self.prefs.time_format.pattern())
                ))
                .monospace()
                .size(18.0),
            );
            if let Some((msg, _)) = &self.status_message {
                ui.separator();
                ui.label(
                    RichText::new(msg)
                        .color(Color32::from_rgb(64, 192, 87))
                        .strong(),
                );
            }
        });
    }

    fn show_controls(&mut self, ui: &mut Ui) {
        ui.heading(RichText::new("Add Clock").strong());
        ui.horizontal(|ui| {
            ui.label("Name");
            ui.add(TextEdit::singleline(&mut self.name_input).hint_text("e.g. Tokyo"));
        });
        ui.horizontal(|ui| {
            ui.label("Search");
            ui.add(TextEdit::singleline(&mut self.timezone_filter).hint_text("asia, europe/..."));
        });

        let matches = TimezoneCatalog::list(&self.timezone_filter);
        ScrollArea::vertical()
            .id_salt("timezone_scroll")
            .max_height(180.0)
            .show(ui, |ui| {
                if matches.is_empty() {
                    ui.label(RichText::new("No matching timezone.").italics());
                }
                for timezone in matches {
                    let selected = self.selected_timezone == Some(timezone);
                    if ui.selectable_label(selected, timezone).clicked() {
                        self.selected_timezone = Some(timezone);
                    }
                }
            });

        if ui.button(RichText::new("Add").strong()).clicked() {
            match self.add_clock_from_form() {
                Ok(msg) => self.set_status(msg, Duration::from_secs(3)),
                Err(err) => self.set_status(format!("{err:#}"), Duration::from_secs(4)),
            }
        }

        ui.separator();
        ui.heading(RichText::new("Display").strong());

        let mut theme = self.prefs.theme;
        let theme_label = match theme {
            Theme::Light => "Switch to dark",
            Theme::Dark => "Switch to light",
        };
        if ui.button(theme_label).clicked() {
            theme = theme.toggled();
        }

        let mut dial_style = self.prefs.dial_style.clone();
        egui::ComboBox::from_label("Dial")
            .selected_text(dial_style.clone())
            .show_ui(ui, |ui| {
                for style in DIAL_STYLES {
                    ui.selectable_value(&mut dial_style, style.to_string(), style);
                }
            });

        let mut time_format = self.prefs.time_format;
        ui.horizontal(|ui| {
            ui.radio_value(&mut time_format, TimeFormat::H24, "24h");
            ui.radio_value(&mut time_format, TimeFormat::H12, "12h");
        });

        let mut language = self.prefs.language.clone();
        egui::ComboBox::from_label("Language")
            .selected_text(language.clone())
            .show_ui(ui, |ui| {
                let current = self.prefs.language.clone();
                if !LANGUAGE_CHOICES.contains(&current.as_str()) {
                    ui.selectable_value(&mut language, current.clone(), current);
                }
                for choice in LANGUAGE_CHOICES {
                    ui.selectable_value(&mut language, choice.to_string(), choice);
                }
            });

        let patch = PreferencesPatch {
            theme: (theme != self.prefs.theme).then_some(theme),
            dial_style: (dial_style != self.prefs.dial_style).then_some(dial_style),
            time_format: (time_format != self.prefs.time_format).then_some(time_format),
            language: (language != self.prefs.language).then_some(language),
        };
        if patch.theme.is_some()
            || patch.dial_style.is_some()
            || patch.time_format.is_some()
            || patch.language.is_some()
        {
            self.update_preferences(patch);
        }

        ui.separator();
        ui.horizontal(|ui| {
            if ui.button("Share").clicked() {
                self.share();
            }
            let label = if self.fullscreen {
                "Exit fullscreen"
            } else {
                "Fullscreen (F11)"
            };
            if ui.button(label).clicked() {
                let ctx = ui.ctx().clone();
                self.toggle_fullscreen(&ctx);
            }
        });
    }

    fn show_clocks(&mut self, ui: &mut Ui) {
        if self.registry.all().is_empty() {
            ui.label(
                RichText::new("No clocks yet. Add one from the panel on the right.")
                    .color(Color32::from_rgb(255, 146, 43))
                    .strong(),
            );
            return;
        }

        let palette = DialPalette::for_theme(self.prefs.theme);
        let pattern = self.prefs.time_format.pattern();
        let mut remove_name: Option<String> = None;
        ScrollArea::vertical()
            .id_salt("clocks_scroll")
            .show(ui, |ui| {
                ui.horizontal_wrapped(|ui| {
                    for widget in self.registry.all() {
                        ui.group(|ui| {
                            ui.vertical_centered(|ui| {
                                ui.label(RichText::new(&widget.name).size(18.0).strong());
                                paint_dial(
                                    ui,
                                    &widget.hands,
                                    &self.prefs.dial_style,
                                    &palette,
                                    DIAL_DIAMETER,
                                );
                                if let Some(local) = widget.local_time {
                                    ui.label(
                                        RichText::new(local.format(pattern).to_string())
                                            .monospace()
                                            .size(20.0),
                                    );
                                    ui.label(local.format("%Y-%m-%d %a").to_string());
                                }
                                ui.label(RichText::new(&widget.timezone).weak());
                                if let Some(report) = &widget.weather {
                                    ui.label(report.label());
                                }
                                if ui.button("Delete").clicked() {
                                    remove_name = Some(widget.name.clone());
                                }
                            });
                        });
                    }
                });
            });

        if let Some(name) = remove_name {
            match self.registry.remove_clock(&name) {
                Ok(_) => self.set_status(format!("Removed {name}"), Duration::from_secs(2)),
                Err(err) => {
                    self.set_status(format!("Removing failed: {err}"), Duration::from_secs(4))
                }
            }
        }
    }
}

impl eframe::App for WorldClockApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some((_, expires_at)) = &self.status_message
            && Instant::now() >= *expires_at
        {
            self.status_message = None;
        }
        if self.applied_theme != Some(self.prefs.theme) {
            configure_theme(ctx, self.prefs.theme);
            self.applied_theme = Some(self.prefs.theme);
        }

        self.poll_geolocation();
        self.registry.poll_weather();
        let outcome = self.render_loop.poll(
            Instant::now(),
            &mut self.registry,
            Utc::now(),
            self.chime.as_ref(),
        );
        if let Some(kind) = outcome.and_then(|outcome| outcome.chimed()) {
            self.set_status(format!("Chime: {}", kind.label()), Duration::from_secs(5));
        }

        if ctx.input(|input| input.key_pressed(egui::Key::F11)) {
            self.toggle_fullscreen(ctx);
        }

        TopBottomPanel::top("header")
            .resizable(false)
            .show(ctx, |ui| self.show_header(ui));

        egui::SidePanel::right("controls_panel")
            .resizable(true)
            .min_width(260.0)
            .default_width(300.0)
            .show(ctx, |ui| self.show_controls(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.show_clocks(ui));

        let wait = self
            .render_loop
            .until_next(Instant::now())
            .unwrap_or(Duration::from_secs(1));
        ctx.request_repaint_after(wait);
    }
}
