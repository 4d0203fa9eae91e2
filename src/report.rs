use serde::Serialize;

use crate::classify::ClassificationResult;
use crate::types::{FillState, MarkId};

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    id: &'a MarkId,
    state: FillState,
    code: i8,
    score: f32,
}

/// One `<id> <code>` line per mark, optionally followed by the score.
pub fn format_text(results: &[ClassificationResult], with_scores: bool) -> String {
    results
        .iter()
        .map(|result| {
            if with_scores {
                format!("{} {} {:.4}\n", result.id, result.state.code(), result.score)
            } else {
                format!("{} {}\n", result.id, result.state.code())
            }
        })
        .collect()
}

pub fn format_json(results: &[ClassificationResult]) -> serde_json::Result<String> {
    let rows = results
        .iter()
        .map(|result| ReportRow {
            id: &result.id,
            state: result.state,
            code: result.state.code(),
            score: result.score,
        })
        .collect::<Vec<_>>();
    serde_json::to_string_pretty(&rows)
}
