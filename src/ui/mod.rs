mod controls;
mod results_view;

use std::{
    sync::{
        Arc,
        mpsc::{self, Receiver, Sender},
    },
    thread,
    time::Duration,
};

use egui::{Color32, RichText, Ui, Visuals, style::Widgets};
use log::{debug, error};

use crate::{
    config::AppConfig,
    dashboard::{
        DashboardError, DashboardSession, ModelJob, ModelState, PAGE_HEADING, PassState,
        PredictionJob, PredictionReport,
    },
    model::ModelBundle,
};

const REFRESH_RATE_MS: u64 = 100;

pub(crate) const PALETTE_BLACK: Color32 = Color32::from_rgb(12, 12, 12);
pub(crate) const PALETTE_BROWN: Color32 = Color32::from_rgb(72, 30, 20);
pub(crate) const PALETTE_MAROON: Color32 = Color32::from_rgb(155, 57, 34);
pub(crate) const PALETTE_RED: Color32 = Color32::from_rgb(0xFF, 0x4B, 0x4B);

/// Results coming back from worker threads.
enum WorkerMessage {
    ModelLoaded(Result<Arc<ModelBundle>, DashboardError>),
    PassFinished(Result<PredictionReport, DashboardError>),
}

/// `PredictorApp` is the dashboard window.
///
/// Model loading and prediction passes run on worker threads and report back
/// over a channel that is drained at the start of every frame, so the UI keeps
/// painting the spinner while the network is busy.
pub struct PredictorApp {
    session: DashboardSession,
    app_config: AppConfig,
    worker_tx: Sender<WorkerMessage>,
    worker_rx: Receiver<WorkerMessage>,
}

impl PredictorApp {
    pub fn new(
        session: DashboardSession,
        app_config: AppConfig,
        cc: &eframe::CreationContext<'_>,
    ) -> Self {
        let default_visuals = Visuals {
            dark_mode: true,
            hyperlink_color: PALETTE_MAROON,
            faint_bg_color: PALETTE_BLACK,
            extreme_bg_color: PALETTE_BROWN,
            panel_fill: PALETTE_BLACK,
            button_frame: true,
            widgets: Widgets::dark(),
            striped: true,
            ..Default::default()
        };
        cc.egui_ctx.set_visuals(default_visuals);

        let (worker_tx, worker_rx) = mpsc::channel();
        let mut app = Self {
            session,
            app_config,
            worker_tx,
            worker_rx,
        };

        // eager load, or reuse of an already stored model
        let job = app.session.model_job();
        app.spawn_model_job(job, &cc.egui_ctx);
        app
    }

    fn spawn_model_job(&self, job: ModelJob, ctx: &egui::Context) {
        let tx = self.worker_tx.clone();
        let ctx = ctx.clone();
        thread::spawn(move || {
            let result = job.execute();
            if tx.send(WorkerMessage::ModelLoaded(result)).is_err() {
                debug!("Dashboard closed before the model finished loading");
            }
            ctx.request_repaint();
        });
    }

    fn spawn_prediction_job(&self, job: PredictionJob, ctx: &egui::Context) {
        let tx = self.worker_tx.clone();
        let ctx = ctx.clone();
        thread::spawn(move || {
            let result = job.execute();
            if tx.send(WorkerMessage::PassFinished(result)).is_err() {
                debug!("Dashboard closed before the prediction pass finished");
            }
            ctx.request_repaint();
        });
    }

    fn drain_worker_messages(&mut self) {
        while let Ok(message) = self.worker_rx.try_recv() {
            match message {
                WorkerMessage::ModelLoaded(result) => self.session.finish_model_load(result),
                WorkerMessage::PassFinished(result) => self.session.finish_run(result),
            }
        }
    }

    fn main_view(&mut self, ui: &mut Ui) {
        ui.heading(RichText::new(PAGE_HEADING).strong());
        ui.add_space(8.);

        match self.session.model_state() {
            ModelState::Loading => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Fetching historical data and training the model...");
                });
                return;
            }
            ModelState::Unavailable { message } => {
                // nothing else renders for this session
                ui.label(RichText::new(message).color(PALETTE_RED));
                return;
            }
            ModelState::Ready(_) => {}
        }

        match self.session.pass_state() {
            PassState::Idle => {
                ui.label("Pick a season and circuit, then press Run Prediction.");
            }
            PassState::Running => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Fetching latest data and running predictions...");
                });
            }
            PassState::Failed { message } => {
                ui.label(RichText::new(message).color(PALETTE_RED));
            }
            PassState::Done(report) => results_view::show(ui, report),
        }
    }
}

impl eframe::App for PredictorApp {
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        let selection = self.session.selection();
        self.app_config.selected_season = selection.season;
        self.app_config.selected_circuit = selection.circuit;

        if let Err(e) = self.app_config.save() {
            error!("Error while saving config file: {}", e);
        }
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_worker_messages();

        let action = egui::SidePanel::left("model_controls")
            .resizable(false)
            .default_width(200.)
            .show(ctx, |ui| controls::show(ui, &mut self.session))
            .inner;

        match action {
            Some(controls::ControlAction::RunPrediction) => {
                if let Some(job) = self.session.start_run() {
                    self.spawn_prediction_job(job, ctx);
                }
            }
            Some(controls::ControlAction::Retrain) => {
                if let Some(job) = self.session.retrain() {
                    self.spawn_model_job(job, ctx);
                }
            }
            None => {}
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| self.main_view(ui));
        });

        if self.session.is_running() || matches!(self.session.model_state(), ModelState::Loading) {
            ctx.request_repaint_after(Duration::from_millis(REFRESH_RATE_MS));
        }
    }
}
