use crate::value::Value;
use serde::Serialize;

/// The normalised result of a check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CheckOutcome {
    Pass,
    Fail(String),
    FailMany(Vec<String>),
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, CheckOutcome::Pass)
    }

    pub fn messages(&self) -> Vec<String> {
        match self {
            CheckOutcome::Pass => Vec::new(),
            CheckOutcome::Fail(message) => vec![message.clone()],
            CheckOutcome::FailMany(messages) => messages.clone(),
        }
    }
}

impl From<Value> for CheckOutcome {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(true) => CheckOutcome::Pass,
            Value::Str(message) => CheckOutcome::Fail(message),
            Value::List(items) if items.is_empty() => CheckOutcome::Pass,
            Value::List(items) => {
                let messages: Option<Vec<String>> =
                    items.iter().map(|item| item.as_str().map(str::to_string)).collect();
                match messages {
                    Some(messages) => CheckOutcome::FailMany(messages),
                    None => CheckOutcome::Fail(format!(
                        "Check returned a list that is not all strings: {}",
                        Value::List(items)
                    )),
                }
            }
            Value::Bool(false) => CheckOutcome::Fail("Check returned false".to_string()),
            other => CheckOutcome::Fail(format!(
                "Check returned an unsupported {} value: {other}",
                other.type_label()
            )),
        }
    }
}

impl From<Result<Value, String>> for CheckOutcome {
    fn from(result: Result<Value, String>) -> Self {
        match result {
            Ok(value) => CheckOutcome::from(value),
            Err(message) => CheckOutcome::Fail(message),
        }
    }
}
