//! Backend worker: owns the tokio runtime, the phonebook controller and the
//! blocking dialog surface; drains the UI command queue sequentially.

use std::{sync::Arc, thread};

use client_core::{HttpPersonsService, Phonebook, PhonebookConfig, UserPrompt};
use crossbeam_channel::{Receiver, Sender};
use tokio::sync::broadcast;
use url::Url;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;

/// Modal dialogs shown from the worker thread; the egui thread keeps
/// rendering while the user decides.
struct DialogPrompt;

impl UserPrompt for DialogPrompt {
    fn alert(&self, message: &str) {
        rfd::MessageDialog::new()
            .set_title("Phonebook")
            .set_description(message)
            .set_buttons(rfd::MessageButtons::Ok)
            .show();
    }

    fn confirm(&self, message: &str) -> bool {
        let choice = rfd::MessageDialog::new()
            .set_title("Phonebook")
            .set_description(message)
            .set_buttons(rfd::MessageButtons::YesNo)
            .show();
        matches!(choice, rfd::MessageDialogResult::Yes)
    }
}

pub fn spawn_backend_thread(
    server_url: Url,
    config: PhonebookConfig,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::FatalStartup(format!(
                    "backend worker startup failure: failed to build runtime: {err}"
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let service = Arc::new(HttpPersonsService::new(server_url));
            let phonebook = Arc::new(Phonebook::new(service, Arc::new(DialogPrompt), config));

            // Controller events (including timed notification clears) become
            // fresh snapshots for the egui thread.
            let forwarder = {
                let phonebook = Arc::clone(&phonebook);
                let ui_tx = ui_tx.clone();
                let mut events = phonebook.subscribe_events();
                tokio::spawn(async move {
                    loop {
                        match events.recv().await {
                            Ok(_) => {
                                let _ =
                                    ui_tx.try_send(UiEvent::Snapshot(phonebook.snapshot().await));
                            }
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                tracing::debug!(skipped, "snapshot forwarder lagged");
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                })
            };

            phonebook.load().await;
            let _ = ui_tx.try_send(UiEvent::Snapshot(phonebook.snapshot().await));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    BackendCommand::ReloadPersons => {
                        phonebook.load().await;
                    }
                    BackendCommand::Submit { name, number } => {
                        phonebook.set_name_input(name).await;
                        phonebook.set_number_input(number).await;
                        phonebook.submit().await;
                    }
                    BackendCommand::Delete { id, name } => {
                        phonebook.delete(id, &name).await;
                    }
                }
                let _ = ui_tx.try_send(UiEvent::Snapshot(phonebook.snapshot().await));
            }

            forwarder.abort();
        });
    });
}
