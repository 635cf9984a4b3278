use egui::{RichText, Ui};
use egui_extras::{Column, TableBuilder};
use egui_plot::{Bar, BarChart, Plot};
use itertools::Itertools;

use crate::dashboard::PredictionReport;

use super::PALETTE_RED;

const ROW_HEIGHT: f32 = 18.;
const HEADER_HEIGHT: f32 = 22.;
const CHART_HEIGHT: f32 = 360.;

pub(super) fn show(ui: &mut Ui, report: &PredictionReport) {
    ui.heading(&report.title);
    ui.add_space(6.);

    ui.columns(2, |columns| {
        predictions_table(&mut columns[0], report);
        predictions_chart(&mut columns[1], report);
    });

    ui.add_space(12.);
    ui.heading("Model Performance");
    ui.label(&report.mae_line);
    ui.label(&report.r2_line);
}

fn predictions_table(ui: &mut Ui, report: &PredictionReport) {
    TableBuilder::new(ui)
        .id_salt("predictions_table")
        .striped(true)
        .column(Column::auto().at_least(60.))
        .column(Column::auto().at_least(120.))
        .column(Column::remainder())
        .header(HEADER_HEIGHT, |mut header| {
            for title in ["Driver", "Team", "Q3 Time (s)"] {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|mut body| {
            for cells in report.table_rows() {
                body.row(ROW_HEIGHT, |mut row| {
                    for cell in cells {
                        row.col(|ui| {
                            ui.label(RichText::new(cell).monospace());
                        });
                    }
                });
            }
        });
}

fn predictions_chart(ui: &mut Ui, report: &PredictionReport) {
    let drivers = report.rows.iter().map(|r| r.driver.clone()).collect_vec();
    let bars = report
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            Bar::new(i as f64, row.predicted_q3)
                .name(&row.driver)
                .fill(PALETTE_RED)
        })
        .collect_vec();

    Plot::new("predicted_q3_chart")
        .height(CHART_HEIGHT)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .show_grid(false)
        .x_axis_formatter(move |mark, _range| {
            // only label integer ticks, one per driver
            let index = mark.value.round();
            if (mark.value - index).abs() > f64::EPSILON || index < 0. {
                return String::new();
            }
            drivers.get(index as usize).cloned().unwrap_or_default()
        })
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new("Predicted_Q3", bars).color(PALETTE_RED));
        });
}
