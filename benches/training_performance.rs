use criterion::{Criterion, black_box, criterion_group, criterion_main};
use quali_predictor::data::provider::parse_qualifying_page;
use quali_predictor::model::{predict, train_and_evaluate};
use quali_predictor::{Dataset, SessionRecord};
use std::time::Duration;

fn create_sample_record(round: u32, slot: usize) -> SessionRecord {
    let base = 85.0 + round as f64 * 0.25 + slot as f64 * 0.08;
    SessionRecord {
        season: 2024,
        round,
        circuit: "Bench Circuit".to_string(),
        driver: format!("D{:02}", slot),
        team: format!("Team {}", slot / 2),
        q1_sec: Some(base + 0.6),
        q2_sec: if slot < 15 { Some(base + 0.2 + (slot % 3) as f64 * 0.03) } else { None },
        q3_sec: if slot < 10 { Some(base) } else { None },
    }
}

/// A season of 20-car qualifying sessions
fn create_sample_dataset(rounds: u32) -> Dataset {
    (1..=rounds)
        .flat_map(|round| (0..20).map(move |slot| create_sample_record(round, slot)))
        .collect::<Vec<_>>()
        .into()
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");

    for rounds in [5, 24, 48] {
        let dataset = create_sample_dataset(rounds);
        group.bench_function(format!("train_{}_rounds", rounds), |b| {
            b.iter(|| black_box(train_and_evaluate(black_box(&dataset)).unwrap()));
        });
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");

    let model = train_and_evaluate(&create_sample_dataset(24)).unwrap();
    let latest = create_sample_dataset(5);

    group.bench_function("predict_latest_5_rounds", |b| {
        b.iter(|| black_box(predict(&model, black_box(&latest)).unwrap()));
    });

    group.finish();
}

fn bench_page_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("provider");

    let results: Vec<String> = (0..20)
        .map(|slot| {
            format!(
                r#"{{"position":"{}","Driver":{{"driverId":"d{}","code":"D{:02}"}},"Constructor":{{"name":"Team {}"}},"Q1":"1:29.{:03}","Q2":"1:28.{:03}","Q3":"1:27.{:03}"}}"#,
                slot + 1,
                slot,
                slot,
                slot / 2,
                slot * 10,
                slot * 10,
                slot * 10
            )
        })
        .collect();
    let body = format!(
        r#"{{"MRData":{{"total":"20","limit":"100","offset":"0","RaceTable":{{"season":"2024","Races":[{{"season":"2024","round":"1","raceName":"Bench Grand Prix","Circuit":{{"circuitName":"Bench Circuit"}},"QualifyingResults":[{}]}}]}}}}}}"#,
        results.join(",")
    );

    group.bench_function("parse_qualifying_page", |b| {
        b.iter(|| black_box(parse_qualifying_page("bench", black_box(&body)).unwrap()));
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(100);
    targets = bench_training, bench_prediction, bench_page_parsing
}
criterion_main!(benches);
