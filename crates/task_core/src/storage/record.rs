use crate::error::AppError;
use crate::model::{TIMESTAMP_FORMAT, Task};
use time::PrimitiveDateTime;

/// One persisted row: `id, description, created_at, is_complete`.
pub type Record = Vec<String>;

pub const FIELD_COUNT: usize = 4;

pub const HEADER: [&str; FIELD_COUNT] = ["ID", "Description", "CreatedAt", "IsComplete"];

pub fn encode(task: &Task) -> Record {
    vec![
        task.id.to_string(),
        task.description.clone(),
        task.created_timestamp(),
        task.is_complete.to_string(),
    ]
}

pub fn decode(fields: &[String]) -> Result<Task, AppError> {
    let [id, description, created_at, is_complete] = fields else {
        return Err(AppError::invalid_data(format!(
            "expected {FIELD_COUNT} fields, found {}",
            fields.len()
        )));
    };

    if description.trim().is_empty() {
        return Err(AppError::invalid_data("description is empty"));
    }

    let id = id
        .parse::<u64>()
        .map_err(|err| AppError::invalid_data(format!("invalid ID '{id}': {err}")))?;
    let created_at = PrimitiveDateTime::parse(created_at, TIMESTAMP_FORMAT)
        .map_err(|err| AppError::invalid_data(format!("invalid date '{created_at}': {err}")))?;
    let is_complete = parse_bool(is_complete).ok_or_else(|| {
        AppError::invalid_data(format!("invalid completion status '{is_complete}'"))
    })?;

    Ok(Task {
        id,
        description: description.clone(),
        created_at,
        is_complete,
    })
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{HEADER, decode, encode};
    use crate::model::Task;
    use time::macros::datetime;
    use time::{Date, Month, PrimitiveDateTime, Time};

    fn fields(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn encode_writes_fields_in_header_order() {
        let mut task = Task::new(3, "walk dog", datetime!(2025-12-20 09:30:00));
        task.is_complete = true;

        let record = encode(&task);

        assert_eq!(HEADER.len(), record.len());
        assert_eq!(
            record,
            fields(&["3", "walk dog", "2025-12-20 09:30:00", "true"])
        );
    }

    #[test]
    fn decode_reverses_encode() {
        let task = Task::new(12, "call \"mom\", then dad\nlater", datetime!(2024-02-29 23:59:59));
        assert_eq!(decode(&encode(&task)).unwrap(), task);
    }

    #[test]
    fn decode_accepts_legacy_boolean_literals() {
        for literal in ["1", "t", "T", "TRUE", "true", "True"] {
            let task = decode(&fields(&["1", "demo", "2025-12-20 00:00:00", literal])).unwrap();
            assert!(task.is_complete, "{literal} should decode as complete");
        }
        for literal in ["0", "f", "F", "FALSE", "false", "False"] {
            let task = decode(&fields(&["1", "demo", "2025-12-20 00:00:00", literal])).unwrap();
            assert!(!task.is_complete, "{literal} should decode as incomplete");
        }
    }

    #[test]
    fn decode_rejects_wrong_field_count() {
        let err = decode(&fields(&["1", "demo", "2025-12-20 00:00:00"])).unwrap_err();
        assert_eq!(err.code(), "invalid_data");

        let err = decode(&fields(&["1", "demo", "2025-12-20 00:00:00", "false", "x"])).unwrap_err();
        assert_eq!(err.code(), "invalid_data");
    }

    #[test]
    fn decode_rejects_non_numeric_or_negative_id() {
        let err = decode(&fields(&["abc", "demo", "2025-12-20 00:00:00", "false"])).unwrap_err();
        assert_eq!(err.code(), "invalid_data");

        let err = decode(&fields(&["-4", "demo", "2025-12-20 00:00:00", "false"])).unwrap_err();
        assert_eq!(err.code(), "invalid_data");
    }

    #[test]
    fn decode_rejects_other_timestamp_layouts() {
        for created_at in ["2025-12-20T00:00:00Z", "2025-12-20 00:00", "20/12/2025 00:00:00"] {
            let err = decode(&fields(&["1", "demo", created_at, "false"])).unwrap_err();
            assert_eq!(err.code(), "invalid_data");
        }
    }

    #[test]
    fn decode_rejects_empty_description() {
        for description in ["", "   "] {
            let err =
                decode(&fields(&["1", description, "2025-12-20 00:00:00", "false"])).unwrap_err();
            assert_eq!(err.code(), "invalid_data");
        }
    }

    #[test]
    fn encode_pads_timestamp_components() {
        let created_at = PrimitiveDateTime::new(
            Date::from_calendar_date(987, Month::March, 4).unwrap(),
            Time::from_hms(5, 6, 7).unwrap(),
        );
        let task = Task::new(1, "demo", created_at);
        assert_eq!(encode(&task)[2], "0987-03-04 05:06:07");
        assert_eq!(decode(&encode(&task)).unwrap(), task);
    }

    #[test]
    fn decode_rejects_unknown_boolean_literal() {
        let err = decode(&fields(&["1", "demo", "2025-12-20 00:00:00", "yes"])).unwrap_err();
        assert_eq!(err.code(), "invalid_data");
    }
}
