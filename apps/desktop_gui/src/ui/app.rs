use client_core::{filter_persons, Notification, PhonebookSnapshot, Severity};
use crossbeam_channel::{Receiver, Sender};
use shared::domain::Person;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;
use crate::controller::orchestration::dispatch_backend_command;

pub struct PhonebookApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    snapshot: PhonebookSnapshot,
    search_draft: String,
    name_draft: String,
    number_draft: String,
    last_submitted: Option<(String, String)>,
    status: String,
    fatal: Option<String>,
}

impl PhonebookApp {
    pub fn new(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            snapshot: PhonebookSnapshot::default(),
            search_draft: String::new(),
            name_draft: String::new(),
            number_draft: String::new(),
            last_submitted: None,
            status: String::new(),
            fatal: None,
        }
    }

    fn drain_backend_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Snapshot(snapshot) => {
                    // When the controller cleared its inputs after a create,
                    // mirror that into the text boxes, but never clobber
                    // something the user typed since submitting.
                    if let Some((name, number)) = &self.last_submitted {
                        if snapshot.name_input.is_empty()
                            && snapshot.number_input.is_empty()
                            && self.name_draft == *name
                            && self.number_draft == *number
                        {
                            self.name_draft.clear();
                            self.number_draft.clear();
                            self.last_submitted = None;
                        }
                    }
                    self.snapshot = snapshot;
                }
                UiEvent::FatalStartup(message) => self.fatal = Some(message),
            }
        }
    }

    fn submit(&mut self) {
        let name = self.name_draft.clone();
        let number = self.number_draft.clone();
        self.last_submitted = Some((name.clone(), number.clone()));
        dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::Submit { name, number },
            &mut self.status,
        );
    }

    fn person_row(&mut self, ui: &mut egui::Ui, person: &Person) {
        ui.horizontal(|ui| {
            ui.label(format!("{} {}", person.name, person.number));
            if ui.small_button("delete").clicked() {
                dispatch_backend_command(
                    &self.cmd_tx,
                    BackendCommand::Delete {
                        id: person.id,
                        name: person.name.clone(),
                    },
                    &mut self.status,
                );
            }
        });
    }
}

fn notification_banner(ui: &mut egui::Ui, notification: &Notification) {
    let color = match notification.severity {
        Severity::Info => egui::Color32::from_rgb(0x2e, 0x7d, 0x32),
        Severity::Error => egui::Color32::from_rgb(0xc6, 0x28, 0x28),
    };
    egui::Frame::new()
        .fill(color.gamma_multiply(0.15))
        .stroke(egui::Stroke::new(1.0, color))
        .inner_margin(egui::Margin::symmetric(8, 6))
        .show(ui, |ui| {
            ui.colored_label(color, &notification.message);
        });
}

impl eframe::App for PhonebookApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_backend_events();
        // Notification expiry arrives from the worker while the window is
        // idle; poll the queue even without input events.
        ctx.request_repaint_after(std::time::Duration::from_millis(250));

        egui::TopBottomPanel::top("phonebook_header").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.heading("Phonebook");
            if let Some(fatal) = &self.fatal {
                ui.colored_label(egui::Color32::RED, fatal);
            }
            if let Some(notification) = &self.snapshot.notification {
                notification_banner(ui, notification);
            }
            ui.horizontal(|ui| {
                ui.label("search:");
                ui.add(
                    egui::TextEdit::singleline(&mut self.search_draft).hint_text("filter by name"),
                );
                if ui.small_button("refresh").clicked() {
                    dispatch_backend_command(
                        &self.cmd_tx,
                        BackendCommand::ReloadPersons,
                        &mut self.status,
                    );
                }
            });
            ui.add_space(4.0);
        });

        egui::TopBottomPanel::bottom("phonebook_form").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                ui.label("name:");
                ui.text_edit_singleline(&mut self.name_draft);
            });
            ui.horizontal(|ui| {
                ui.label("number:");
                ui.text_edit_singleline(&mut self.number_draft);
            });
            if ui.button("add").clicked() {
                self.submit();
            }
            if !self.status.is_empty() {
                ui.colored_label(egui::Color32::YELLOW, &self.status);
            }
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Numbers");
            let visible = filter_persons(&self.snapshot.persons, &self.search_draft);
            if visible.is_empty() {
                ui.weak("no contacts to show");
                return;
            }
            egui::ScrollArea::vertical()
                .auto_shrink(false)
                .show(ui, |ui| {
                    for person in &visible {
                        self.person_row(ui, person);
                    }
                });
        });
    }
}
