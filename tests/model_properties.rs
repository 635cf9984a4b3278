// Property tests for lap time parsing, dataset cleaning and the Q3 model

use proptest::prelude::*;

use quali_predictor::dashboard::format_seconds;
use quali_predictor::data::parse_lap_time;
use quali_predictor::model::{predict, train_and_evaluate};
use quali_predictor::{Dataset, SessionRecord};

fn record(round: u32, driver: String, times: (Option<f64>, Option<f64>, Option<f64>)) -> SessionRecord {
    SessionRecord {
        season: 2025,
        round,
        circuit: "Prop Circuit".to_string(),
        team: format!("{} Team", driver),
        driver,
        q1_sec: times.0,
        q2_sec: times.1,
        q3_sec: times.2,
    }
}

fn lap_time() -> impl Strategy<Value = f64> {
    75.0f64..100.0
}

fn optional_times() -> impl Strategy<Value = (Option<f64>, Option<f64>, Option<f64>)> {
    (
        proptest::option::of(lap_time()),
        proptest::option::of(lap_time()),
        proptest::option::of(lap_time()),
    )
}

/// Rows with Q1 and Q2 times and a Q3 close to a fixed linear relation
fn training_rows() -> impl Strategy<Value = Vec<(f64, f64, f64)>> {
    prop::collection::vec((lap_time(), -0.8f64..0.2, -0.05f64..0.05), 10..40).prop_map(|rows| {
        rows.into_iter()
            .map(|(q1, gap, noise)| {
                let q2 = q1 + gap;
                (q1, q2, 0.2 * q1 + 0.75 * q2 + 1.5 + noise)
            })
            .collect()
    })
}

fn training_dataset(rows: &[(f64, f64, f64)]) -> Dataset {
    rows.iter()
        .enumerate()
        .map(|(i, (q1, q2, q3))| record(1 + i as u32 / 20, format!("D{:02}", i % 20), (Some(*q1), Some(*q2), Some(*q3))))
        .collect::<Vec<_>>()
        .into()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_formatted_times_have_three_decimals(seconds in 0.0f64..500.0) {
        let formatted = format_seconds(seconds);
        let (_, decimals) = formatted.split_once('.').unwrap();
        prop_assert_eq!(decimals.len(), 3);
        prop_assert!((formatted.parse::<f64>().unwrap() - seconds).abs() <= 0.0005 + 1e-9);
    }

    #[test]
    fn prop_lap_time_strings_parse_to_seconds(minutes in 0u32..3, millis in 1u32..60_000) {
        let raw = format!("{}:{:02}.{:03}", minutes, millis / 1000, millis % 1000);
        let parsed = parse_lap_time(&raw).unwrap();
        let expected = minutes as f64 * 60.0 + millis as f64 / 1000.0;
        prop_assert!((parsed - expected).abs() < 1e-9, "{} -> {}", raw, parsed);
    }

    #[test]
    fn prop_cleaning_keeps_exactly_timed_rows(rows in prop::collection::vec(optional_times(), 0..30)) {
        let dataset: Dataset = rows
            .iter()
            .enumerate()
            .map(|(i, times)| record(1, format!("D{}", i), *times))
            .collect::<Vec<_>>()
            .into();
        let expected: Vec<String> = dataset
            .records
            .iter()
            .filter(|r| r.q1_sec.is_some() || r.q2_sec.is_some() || r.q3_sec.is_some())
            .map(|r| r.driver.clone())
            .collect();

        let cleaned = dataset.drop_rows_without_times();
        let kept: Vec<String> = cleaned.records.iter().map(|r| r.driver.clone()).collect();
        prop_assert_eq!(kept, expected);
        prop_assert!(cleaned.records.iter().all(|r| r.has_any_time()));
    }

    #[test]
    fn prop_training_is_deterministic(rows in training_rows()) {
        let dataset = training_dataset(&rows);
        let first = train_and_evaluate(&dataset).unwrap();
        let second = train_and_evaluate(&dataset).unwrap();
        prop_assert_eq!(first.mae.to_bits(), second.mae.to_bits());
        prop_assert_eq!(first.r2.to_bits(), second.r2.to_bits());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_predictions_are_sorted_one_per_driver(
        rows in training_rows(),
        latest in prop::collection::vec(optional_times(), 1..20),
    ) {
        let model = train_and_evaluate(&training_dataset(&rows)).unwrap();
        let dataset: Dataset = latest
            .iter()
            .enumerate()
            .map(|(i, times)| record(5, format!("L{:02}", i), *times))
            .collect::<Vec<_>>()
            .into();
        let usable = latest.iter().filter(|(q1, q2, _)| q1.is_some() || q2.is_some()).count();

        match predict(&model, &dataset) {
            Ok(predictions) => {
                prop_assert_eq!(predictions.rows.len(), usable);
                prop_assert!(predictions.rows.windows(2).all(|w| w[0].predicted_q3 <= w[1].predicted_q3));
                prop_assert!(predictions.rows.iter().all(|r| r.predicted_q3.is_finite()));
            }
            Err(_) => prop_assert_eq!(usable, 0),
        }
    }
}
