use std::path::Path;

use log::info;

use crate::{PredictorError, model::PredictionRow};

/// Write predictions as JSON lines, one driver per line.
pub fn write_predictions(file: &Path, rows: &[PredictionRow]) -> Result<(), PredictorError> {
    serde_jsonlines::write_json_lines(file, rows)
        .map_err(|e| PredictorError::WriterError { source: e })?;
    info!("Wrote {} predictions to {:?}", rows.len(), file);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_writes_one_line_per_driver() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("predictions.jsonl");
        let rows = vec![
            PredictionRow {
                driver: "VER".to_string(),
                team: "Red Bull".to_string(),
                predicted_q3: 88.1,
            },
            PredictionRow {
                driver: "NOR".to_string(),
                team: "McLaren".to_string(),
                predicted_q3: 88.3,
            },
        ];

        write_predictions(&path, &rows).unwrap();

        let read_back: Vec<PredictionRow> = serde_jsonlines::json_lines(&path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(read_back, rows);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.lines().next().unwrap().contains("\"Predicted_Q3\":88.1"));
    }
}
