use std::fmt::Write;

use chrono::NaiveDate;
use serde_json::Value;

use crate::{AppData, ImportError, WorkoutLog, WorkoutSet, decode, encode, history};

/// Full document as indented JSON, suitable for a backup file.
pub fn export_json(data: &AppData) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&encode(data)?)
}

#[must_use]
pub fn export_file_name(date: NaiveDate) -> String {
    format!("liftbook-backup-{date}.json")
}

/// Parses a backup file. The result is meant to replace the active data as a whole.
pub fn import_json(text: &str) -> Result<AppData, ImportError> {
    let document: Value = serde_json::from_str(text).map_err(ImportError::Parse)?;
    for field in ["logs", "exercises"] {
        if document.get(field).is_none() {
            return Err(ImportError::MissingField(field));
        }
    }
    Ok(decode(document)?)
}

/// Human-readable report of all workout logs, newest first.
#[must_use]
pub fn html_report(data: &AppData) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Workout History</title>\n</head>\n<body>\n<h1>Workout History</h1>\n",
    );

    let logs = history::logs_newest_first(data);
    if logs.is_empty() {
        html.push_str("<p>No workouts recorded.</p>\n");
    }
    for log in logs {
        write_log(&mut html, data, log);
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn write_log(html: &mut String, data: &AppData, log: &WorkoutLog) {
    let _ = writeln!(
        html,
        "<section>\n<h2>{} &middot; {}</h2>",
        escape(&log.routine_name),
        log.date.format("%Y-%m-%d %H:%M")
    );
    if let Some(category) = &log.category {
        let _ = writeln!(html, "<p>Category: {}</p>", escape(category));
    }
    if let Some(duration) = log.duration_seconds {
        let _ = writeln!(
            html,
            "<p>Duration: {}:{:02}:{:02}</p>",
            duration / 3600,
            duration / 60 % 60,
            duration % 60
        );
    }
    for exercise in &log.exercises {
        let name = data
            .exercise_name(&exercise.exercise_id)
            .unwrap_or("Unknown exercise");
        let _ = writeln!(html, "<h3>{}</h3>\n<ol>", escape(name));
        for set in &exercise.sets {
            let _ = writeln!(html, "<li>{}</li>", describe_set(set));
        }
        html.push_str("</ol>\n");
    }
    if let Some(notes) = log.notes.as_deref().filter(|n| !n.is_empty()) {
        let _ = writeln!(html, "<p>{}</p>", escape(notes));
    }
    html.push_str("</section>\n");
}

fn describe_set(set: &WorkoutSet) -> String {
    let mut parts = vec![];
    if let Some(weight) = set.weight {
        parts.push(format!("{weight} kg"));
    }
    if let Some(reps) = set.reps {
        parts.push(format!("{reps} reps"));
    }
    if let Some(time) = set.time_seconds {
        parts.push(format!("{time} s"));
    }
    let mut text = if parts.is_empty() {
        "set".to_string()
    } else {
        parts.join(" &times; ")
    };
    if !set.completed {
        text.push_str(" (skipped)");
    }
    text
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use crate::{
        Equipment, Exercise, MigrationError, Routine, RoutineExercise, TrackingType,
        WorkoutExerciseLog, WorkoutLogID,
    };

    use super::*;

    fn data() -> AppData {
        AppData {
            equipment: vec![Equipment {
                id: "q1".into(),
                name: "Barbell".into(),
                notes: Some("20 kg".into()),
                ..Equipment::default()
            }],
            exercises: vec![Exercise {
                id: "e1".into(),
                name: "Squat <back>".into(),
                equipment_ids: vec!["q1".into()],
                tracking_type: Some(TrackingType::WeightReps),
                default_weight: Some(60.0),
                ..Exercise::default()
            }],
            routines: vec![Routine {
                id: "r1".into(),
                name: "Legs".into(),
                category: "Strength".into(),
                exercises: vec![RoutineExercise {
                    rest_seconds: Some(120),
                    ..RoutineExercise::new("e1".into())
                }],
                ..Routine::default()
            }],
            logs: vec![WorkoutLog {
                id: WorkoutLogID::from("w1"),
                date: Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap(),
                start_time: Some(Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap()),
                end_time: Some(Utc.with_ymd_and_hms(2024, 3, 1, 19, 1, 5).unwrap()),
                duration_seconds: Some(3665),
                routine_name: "Legs".into(),
                category: Some("Strength".into()),
                exercises: vec![
                    WorkoutExerciseLog {
                        exercise_id: "e1".into(),
                        sets: vec![
                            WorkoutSet {
                                weight: Some(60.0),
                                reps: Some(10),
                                time_seconds: None,
                                completed: true,
                            },
                            WorkoutSet {
                                weight: Some(62.5),
                                reps: Some(8),
                                time_seconds: None,
                                completed: false,
                            },
                        ],
                    },
                    WorkoutExerciseLog {
                        exercise_id: "deleted".into(),
                        sets: vec![WorkoutSet {
                            time_seconds: Some(45),
                            completed: true,
                            ..WorkoutSet::default()
                        }],
                    },
                ],
                notes: Some("felt strong".into()),
                media: Some(vec!["media/1.jpg".into()]),
                extra: json!({ "mood": 4 }).as_object().unwrap().clone(),
            }],
            ..AppData::default()
        }
    }

    #[test]
    fn test_export_import_round_trip() {
        let data = data();
        assert_eq!(import_json(&export_json(&data).unwrap()).unwrap(), data);
    }

    #[test]
    fn test_export_is_indented() {
        let text = export_json(&AppData::default()).unwrap();
        assert!(text.contains("\n  \"equipment\": []"));
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(
            export_file_name(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
            "liftbook-backup-2024-03-01.json"
        );
    }

    #[rstest]
    #[case(r#"{ "exercises": [] }"#, "logs")]
    #[case(r#"{ "logs": [] }"#, "exercises")]
    #[case(r#"{ "routines": [] }"#, "logs")]
    fn test_import_missing_field(#[case] text: &str, #[case] expected: &str) {
        assert!(matches!(
            import_json(text),
            Err(ImportError::MissingField(field)) if field == expected
        ));
    }

    #[test]
    fn test_import_invalid_json() {
        assert!(matches!(import_json("logs"), Err(ImportError::Parse(_))));
    }

    #[test]
    fn test_import_legacy_document() {
        let data = import_json(
            r#"{
                "exercises": [{ "id": "e1", "name": "Squat" }],
                "routines": [{ "id": "r1", "name": "Legs", "exerciseIds": ["e1"] }],
                "logs": []
            }"#,
        )
        .unwrap();
        assert_eq!(
            data.routines[0].exercises,
            vec![RoutineExercise::new("e1".into())]
        );
    }

    #[test]
    fn test_import_unsupported_version() {
        assert!(matches!(
            import_json(r#"{ "schemaVersion": 9, "logs": [], "exercises": [] }"#),
            Err(ImportError::Migration(MigrationError::UnsupportedVersion(9)))
        ));
    }

    #[test]
    fn test_html_report() {
        let html = html_report(&data());
        assert!(html.contains("<h2>Legs &middot; 2024-03-01 18:00</h2>"));
        assert!(html.contains("<p>Duration: 1:01:05</p>"));
        assert!(html.contains("<h3>Squat &lt;back&gt;</h3>"));
        assert!(html.contains("<li>60 kg &times; 10 reps</li>"));
        assert!(html.contains("<li>62.5 kg &times; 8 reps (skipped)</li>"));
        assert!(html.contains("<h3>Unknown exercise</h3>"));
        assert!(html.contains("<li>45 s</li>"));
        assert!(html.contains("<p>felt strong</p>"));
    }

    #[test]
    fn test_html_report_without_logs() {
        assert!(html_report(&AppData::default()).contains("<p>No workouts recorded.</p>"));
    }

    #[rstest]
    #[case("a & b", "a &amp; b")]
    #[case("<script>", "&lt;script&gt;")]
    #[case("\"quoted\" 'single'", "&quot;quoted&quot; &#39;single&#39;")]
    fn test_escape(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(escape(text), expected);
    }
}
