//! Blueprint validation.
//!
//! Runs over the raw JSON document before any I/O and accumulates every
//! failure it finds. Only a document that passes is deserialized into a
//! typed [`Blueprint`].

use dance_models::{Blueprint, TransitionType};
use serde_json::{Map, Value};

use crate::error::BlueprintValidationError;

/// Validate a raw blueprint document.
pub fn validate(blueprint: &Value) -> Result<(), BlueprintValidationError> {
    let mut errors = Vec::new();

    let Some(root) = blueprint.as_object() else {
        return Err(BlueprintValidationError::new(vec![
            "blueprint must be a JSON object".to_string(),
        ]));
    };

    let task_id = required(root, "task_id", &mut errors);
    if let Some(v) = task_id {
        expect_string(v, "task_id", &mut errors);
    }

    if let Some(v) = required(root, "audio_path", &mut errors) {
        if let Some(path) = expect_string(v, "audio_path", &mut errors) {
            check_path("audio_path", path, &mut errors);
        }
    }

    if let Some(v) = required(root, "moves", &mut errors) {
        match v.as_array() {
            Some(moves) if moves.is_empty() => errors.push("moves must not be empty".to_string()),
            Some(moves) => {
                for (i, mv) in moves.iter().enumerate() {
                    validate_move(i, mv, &mut errors);
                }
            }
            None => errors.push("moves must be a list".to_string()),
        }
    }

    if let Some(v) = required(root, "output_config", &mut errors) {
        match v.as_object() {
            Some(output) => validate_output_config(output, &mut errors),
            None => errors.push("output_config must be an object".to_string()),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(BlueprintValidationError::new(errors))
    }
}

/// `(ok, error)` form of [`validate`].
pub fn validation_result(blueprint: &Value) -> (bool, Option<String>) {
    match validate(blueprint) {
        Ok(()) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    }
}

/// Validate, then deserialize into the typed blueprint.
pub fn parse_blueprint(blueprint: &Value) -> Result<Blueprint, BlueprintValidationError> {
    validate(blueprint)?;
    serde_json::from_value(blueprint.clone())
        .map_err(|e| BlueprintValidationError::new(vec![format!("malformed blueprint: {e}")]))
}

fn validate_move(index: usize, mv: &Value, errors: &mut Vec<String>) {
    let Some(fields) = mv.as_object() else {
        errors.push(format!("moves[{index}] must be an object"));
        return;
    };
    let field = |name: &str| format!("moves[{index}].{name}");

    match present(fields, "video_path") {
        Some(v) => {
            if let Some(path) = expect_string(v, &field("video_path"), errors) {
                check_path(&field("video_path"), path, errors);
            }
        }
        None => errors.push(format!("missing required field {}", field("video_path"))),
    }

    let number = |name: &str, errors: &mut Vec<String>| {
        let n = present(fields, name).and_then(|v| expect_number(v, &field(name), errors))?;
        if n < 0.0 {
            errors.push(format!("{} must not be negative", field(name)));
            return None;
        }
        Some(n)
    };
    number("start_time", errors);
    let duration = number("duration", errors);
    let trim_start = number("trim_start", errors);
    let trim_end = number("trim_end", errors);

    if duration == Some(0.0) {
        errors.push(format!("{} must be positive", field("duration")));
    }
    if let Some(end) = trim_end {
        let start = trim_start.unwrap_or(0.0);
        if end <= start {
            errors.push(format!(
                "{} ({end}) must be greater than {} ({start})",
                field("trim_end"),
                field("trim_start")
            ));
        }
    }

    if let Some(v) = present(fields, "volume") {
        expect_number(v, &field("volume"), errors);
    }

    if let Some(v) = present(fields, "clip_id") {
        expect_string(v, &field("clip_id"), errors);
    }

    if let Some(v) = present(fields, "transition_type") {
        if let Some(name) = expect_string(v, &field("transition_type"), errors) {
            if name.parse::<TransitionType>().is_err() {
                let allowed: Vec<&str> = TransitionType::ALL.iter().map(|t| t.as_str()).collect();
                errors.push(format!(
                    "{} must be one of {}, got {:?}",
                    field("transition_type"),
                    allowed.join(", "),
                    name
                ));
            }
        }
    }
}

fn validate_output_config(output: &Map<String, Value>, errors: &mut Vec<String>) {
    match present(output, "output_path") {
        Some(v) => {
            if let Some(path) = expect_string(v, "output_config.output_path", errors) {
                check_path("output_config.output_path", path, errors);
            }
        }
        None => errors.push("missing required field output_config.output_path".to_string()),
    }

    for name in ["video_codec", "video_bitrate", "audio_codec", "audio_bitrate"] {
        if let Some(v) = present(output, name) {
            expect_string(v, &format!("output_config.{name}"), errors);
        }
    }

    for name in ["transition_duration", "fade_in_duration", "fade_out_duration", "audio_volume"] {
        if let Some(v) = present(output, name) {
            if let Some(n) = expect_number(v, &format!("output_config.{name}"), errors) {
                if n < 0.0 {
                    errors.push(format!("output_config.{name} must not be negative"));
                }
            }
        }
    }

    if let Some(v) = present(output, "frame_rate") {
        if !v.as_u64().is_some_and(|fps| fps > 0 && fps <= u64::from(u32::MAX)) {
            errors.push("output_config.frame_rate must be a positive integer".to_string());
        }
    }
}

/// Reject path values that could escape the storage root.
///
/// Each rule is checked independently so a path reports every problem.
pub fn check_path(field: &str, path: &str, errors: &mut Vec<String>) {
    if path.is_empty() {
        errors.push(format!("{field} must not be empty"));
    }
    if path.contains("..") {
        errors.push(format!("{field} contains path traversal: {path:?}"));
    }
    if path.contains('\\') {
        errors.push(format!("{field} contains a backslash: {path:?}"));
    }
    if path.starts_with('/') {
        errors.push(format!("{field} must be a relative path: {path:?}"));
    }
    if path.contains('\0') {
        errors.push(format!("{field} contains a NUL byte"));
    }
}

fn required<'a>(
    obj: &'a Map<String, Value>,
    name: &str,
    errors: &mut Vec<String>,
) -> Option<&'a Value> {
    let value = present(obj, name);
    if value.is_none() {
        errors.push(format!("missing required field {name}"));
    }
    value
}

/// Field value, treating `null` as absent.
fn present<'a>(obj: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    obj.get(name).filter(|v| !v.is_null())
}

fn expect_string<'a>(value: &'a Value, field: &str, errors: &mut Vec<String>) -> Option<&'a str> {
    let s = value.as_str();
    if s.is_none() {
        errors.push(format!("{field} must be a string"));
    }
    s
}

fn expect_number(value: &Value, field: &str, errors: &mut Vec<String>) -> Option<f64> {
    let n = value.as_f64();
    if n.is_none() {
        errors.push(format!("{field} must be a number"));
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;
    use dance_models::Transition;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "task_id": "task-1",
            "audio_path": "audio/song.mp3",
            "moves": [
                {"clip_id": "a", "video_path": "clips/a.mp4", "start_time": 0.0, "duration": 4.0},
                {
                    "video_path": "clips/b.mp4",
                    "start_time": 4.0,
                    "duration": 3.5,
                    "transition_type": "fade_black"
                }
            ],
            "output_config": {"output_path": "renders/task-1.mp4"}
        })
    }

    #[test]
    fn test_valid_blueprint_passes() {
        assert_eq!(validation_result(&valid()), (true, None));

        let bp = parse_blueprint(&valid()).unwrap();
        assert_eq!(bp.moves.len(), 2);
        assert_eq!(
            bp.moves[1].transition(&bp.output_config),
            Transition::FadeBlack { duration: 0.5 }
        );
    }

    #[test]
    fn test_traversal_paths_rejected() {
        let mut bp = valid();
        bp["moves"][0]["video_path"] = json!("../../etc/passwd");
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("moves[0].video_path contains path traversal"));

        let mut bp = valid();
        bp["output_config"]["output_path"] = json!("/etc/passwd");
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("output_config.output_path must be a relative path"));

        let mut bp = valid();
        bp["audio_path"] = json!("audio\\song.mp3");
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("audio_path contains a backslash"));
    }

    #[test]
    fn test_empty_moves_rejected() {
        let mut bp = valid();
        bp["moves"] = json!([]);
        let (ok, error) = validation_result(&bp);
        assert!(!ok);
        assert_eq!(error.as_deref(), Some("moves must not be empty"));
    }

    #[test]
    fn test_errors_accumulate() {
        let bp = json!({
            "task_id": 7,
            "moves": [
                {"start_time": "soon"},
                {"video_path": "/abs.mp4", "transition_type": "wipe"}
            ],
            "output_config": {}
        });
        let err = validate(&bp).unwrap_err();

        let has = |msg: &str| err.errors.iter().any(|e| e == msg);
        let has_prefix = |prefix: &str| err.errors.iter().any(|e| e.starts_with(prefix));

        assert!(has("task_id must be a string"));
        assert!(has("missing required field audio_path"));
        assert!(has("missing required field moves[0].video_path"));
        assert!(has("moves[0].start_time must be a number"));
        assert!(has_prefix("moves[1].video_path must be a relative path"));
        assert!(has_prefix("moves[1].transition_type must be one of"));
        assert!(has("missing required field output_config.output_path"));
        assert_eq!(err.errors.len(), 7);
    }

    #[test]
    fn test_container_types() {
        let bp = json!({
            "task_id": "t",
            "audio_path": "a.mp3",
            "moves": {"video_path": "x.mp4"},
            "output_config": "out.mp4"
        });
        let err = validate(&bp).unwrap_err();
        assert_eq!(
            err.errors,
            vec![
                "moves must be a list".to_string(),
                "output_config must be an object".to_string()
            ]
        );

        assert!(validate(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_numeric_rules() {
        let mut bp = valid();
        bp["moves"][0]["duration"] = json!(-1.0);
        bp["output_config"]["frame_rate"] = json!(0);
        let err = validate(&bp).unwrap_err();
        assert_eq!(
            err.errors,
            vec![
                "moves[0].duration must not be negative".to_string(),
                "output_config.frame_rate must be a positive integer".to_string()
            ]
        );
    }

    #[test]
    fn test_trim_window_must_be_forward() {
        let mut bp = valid();
        bp["moves"][1]["trim_start"] = json!(3.0);
        bp["moves"][1]["trim_end"] = json!(2.0);
        let err = validate(&bp).unwrap_err();
        assert_eq!(
            err.errors,
            vec!["moves[1].trim_end (2) must be greater than moves[1].trim_start (3)".to_string()]
        );

        // Equal bounds leave nothing to render
        let mut bp = valid();
        bp["moves"][0]["trim_start"] = json!(1.5);
        bp["moves"][0]["trim_end"] = json!(1.5);
        assert!(validate(&bp).is_err());

        // Without trim_start the window starts at zero
        let mut bp = valid();
        bp["moves"][0]["trim_end"] = json!(0.0);
        assert!(validate(&bp).is_err());

        let mut bp = valid();
        bp["moves"][0]["trim_start"] = json!(1.0);
        bp["moves"][0]["trim_end"] = json!(2.5);
        assert!(validate(&bp).is_ok());
        let parsed = parse_blueprint(&bp).unwrap();
        assert_eq!(parsed.moves[0].render_length(), Some(1.5));
    }

    #[test]
    fn test_zero_duration_rejected() {
        let mut bp = valid();
        bp["moves"][0]["duration"] = json!(0);
        let err = validate(&bp).unwrap_err();
        assert_eq!(err.errors, vec!["moves[0].duration must be positive".to_string()]);
    }

    #[test]
    fn test_nul_byte_rejected() {
        let mut bp = valid();
        bp["moves"][1]["video_path"] = json!("clips/b\u{0}.mp4");
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("moves[1].video_path contains a NUL byte"));
    }
}
