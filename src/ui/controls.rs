use egui::{Button, Color32, ComboBox, RichText, Ui};

use crate::dashboard::{Circuit, DashboardSession, ModelState, SEASONS};

pub(super) enum ControlAction {
    RunPrediction,
    Retrain,
}

/// Sidebar with the season/circuit selectors and the action buttons.
/// Changing a selector only updates the session selection.
pub(super) fn show(ui: &mut Ui, session: &mut DashboardSession) -> Option<ControlAction> {
    ui.heading(RichText::new("Model Controls").color(Color32::WHITE));
    ui.add_space(6.);

    let mut selection = session.selection();

    ui.label("Season");
    ComboBox::from_id_salt("season_selector")
        .selected_text(selection.season.to_string())
        .show_ui(ui, |ui| {
            for season in SEASONS {
                ui.selectable_value(&mut selection.season, season, season.to_string());
            }
        });

    ui.label("Circuit");
    ComboBox::from_id_salt("circuit_selector")
        .selected_text(selection.circuit.name())
        .show_ui(ui, |ui| {
            for circuit in Circuit::ALL {
                ui.selectable_value(&mut selection.circuit, circuit, circuit.name());
            }
        });

    if selection.season != session.selection().season {
        session.select_season(selection.season);
    }
    if selection.circuit != session.selection().circuit {
        session.select_circuit(selection.circuit);
    }

    ui.add_space(10.);
    let model_ready = matches!(session.model_state(), ModelState::Ready(_));
    let idle = !session.is_running();

    let mut action = None;
    if ui
        .add_enabled(model_ready && idle, Button::new("Run Prediction"))
        .clicked()
    {
        action = Some(ControlAction::RunPrediction);
    }
    if ui
        .add_enabled(model_ready && idle, Button::new("Retrain model"))
        .on_hover_text("Discard the cached model and train it again on fresh data")
        .clicked()
    {
        action = Some(ControlAction::Retrain);
    }
    action
}
