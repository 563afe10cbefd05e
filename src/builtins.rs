//! Functions registered in every registry
//!
//! Value checks receive the checked value as the call subject, group checks
//! receive the tagged sibling nodes.

use crate::dtype::TypeRef;
use crate::registry::{Call, Registry};
use crate::value::Value;
use anyhow::{anyhow, bail};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::cmp::Ordering;
use std::path::Path;

const DEFAULT_HASH_SIZE: usize = 6;
// Hex digits in one v4 UUID.
const MAX_HASH_SIZE: usize = 32;

static HASH: Lazy<Mutex<Option<String>>> = Lazy::new(|| Mutex::new(None));

/// Forgets the memoised `gen_hash` value.
pub fn reset_hash() {
    *HASH.lock() = None;
}

pub(crate) fn register_all(registry: &mut Registry) {
    registry.insert("get_env", get_env);
    registry.insert("set_env", set_env);
    registry.insert("absent", |_| Ok(Value::Absent));
    registry.insert("oneof", oneof);
    registry.insert("compare", compare);
    registry.insert("between", between);
    registry.insert("isdir", isdir);
    registry.insert("isfile", isfile);
    registry.insert("gen_hash", gen_hash);
    registry.insert("type", check_type);
    registry.insert("mutually_exclusive", mutually_exclusive);
    registry.insert("one_valid", one_valid);
    registry.insert("if_one_then_all", if_one_then_all);
}

fn get_env(call: &Call<'_>) -> anyhow::Result<Value> {
    let name = call
        .str_param(0, "name")
        .ok_or_else(|| anyhow!("get_env requires a variable name"))?;
    match std::env::var(name) {
        Ok(value) => Ok(Value::Str(value)),
        Err(_) => Ok(call.param(1, "default").cloned().unwrap_or_else(|| Value::from(""))),
    }
}

fn set_env(call: &Call<'_>) -> anyhow::Result<Value> {
    let name = call
        .str_param(0, "name")
        .ok_or_else(|| anyhow!("set_env requires a variable name"))?;
    let value = call.param(1, "value").map(ToString::to_string).unwrap_or_default();
    std::env::set_var(name, value);
    Ok(Value::Null)
}

fn oneof(call: &Call<'_>) -> anyhow::Result<Value> {
    let value = call.value();
    let options = call
        .param(0, "options")
        .and_then(Value::as_list)
        .ok_or_else(|| anyhow!("oneof requires a list of options"))?;
    let regex = call.param(1, "regex").is_some_and(Value::is_truthy);
    let listed = Value::List(options.clone());

    if regex {
        let text = value.to_string();
        for option in options {
            let pattern = option.to_string().replace("//", "/");
            if Regex::new(&pattern)?.is_match(&text) {
                return Ok(Value::Bool(true));
            }
        }
        return Ok(Value::Str(format!(
            "Invalid option: {}, should regex match one of: {listed}",
            quoted(&value)
        )));
    }
    if options.contains(&value) {
        Ok(Value::Bool(true))
    } else {
        Ok(Value::Str(format!("Invalid option: {}, should be one of: {listed}", quoted(&value))))
    }
}

fn quoted(value: &Value) -> String {
    match value {
        Value::Str(s) => format!("{s:?}"),
        other => other.to_string(),
    }
}

fn order(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => left.as_f64()?.partial_cmp(&right.as_f64()?),
    }
}

fn compare(call: &Call<'_>) -> anyhow::Result<Value> {
    let value = call.value();
    let bounds: [(&str, &str, fn(Ordering) -> bool); 4] = [
        ("lt", "less than", Ordering::is_lt),
        ("lte", "less than or equal to", Ordering::is_le),
        ("gt", "greater than", Ordering::is_gt),
        ("gte", "greater than or equal to", Ordering::is_ge),
    ];

    let mut errors = Vec::new();
    for (key, phrase, holds) in bounds {
        let Some(bound) = call.kwargs.get(key).filter(|b| !b.is_nothing()) else {
            continue;
        };
        match order(&value, bound) {
            Some(ordering) if holds(ordering) => {}
            Some(_) => errors.push(Value::Str(format!("Value must be {phrase}: {bound}"))),
            None => bail!("cannot compare {} {value} with {bound}", value.type_label()),
        }
    }
    if errors.is_empty() {
        Ok(Value::Bool(true))
    } else {
        Ok(Value::List(errors))
    }
}

fn between(call: &Call<'_>) -> anyhow::Result<Value> {
    let lower = call.param(0, "a").cloned().ok_or_else(|| anyhow!("between requires a lower bound"))?;
    let upper = call.param(1, "b").cloned().ok_or_else(|| anyhow!("between requires an upper bound"))?;
    let inclusive = call.param(2, "inclusive").cloned().unwrap_or(Value::Bool(false));

    let (low_inclusive, high_inclusive) = match &inclusive {
        Value::Bool(b) => (*b, *b),
        Value::Str(s) => match s.as_str() {
            "both" => (true, true),
            "lower" => (true, false),
            "upper" => (false, true),
            "neither" | "none" => (false, false),
            other => bail!("between: unknown inclusive mode {other:?}"),
        },
        other => bail!("between: inclusive must be a bool or a mode name, got {other}"),
    };

    let mut bounds = indexmap::IndexMap::new();
    bounds.insert(if low_inclusive { "gte" } else { "gt" }.to_string(), lower);
    bounds.insert(if high_inclusive { "lte" } else { "lt" }.to_string(), upper);
    let inner = Call::new(call.subject.clone()).with_kwargs(bounds);
    compare(&inner)
}

fn path_argument(call: &Call<'_>) -> Option<String> {
    match call.value() {
        Value::Str(path) => Some(path),
        _ => call.str_param(0, "path").map(str::to_string),
    }
}

fn isdir(call: &Call<'_>) -> anyhow::Result<Value> {
    let path = path_argument(call).ok_or_else(|| anyhow!("isdir requires a path"))?;
    if Path::new(&path).is_dir() {
        Ok(Value::Bool(true))
    } else {
        Ok(Value::Str(format!("Directory Not Found: {path}")))
    }
}

fn isfile(call: &Call<'_>) -> anyhow::Result<Value> {
    let path = path_argument(call).ok_or_else(|| anyhow!("isfile requires a path"))?;
    if Path::new(&path).is_file() {
        Ok(Value::Bool(true))
    } else {
        Ok(Value::Str(format!("File Not Found: {path}")))
    }
}

fn gen_hash(call: &Call<'_>) -> anyhow::Result<Value> {
    let size = match call.param(0, "size") {
        Some(Value::Int(size)) if *size > MAX_HASH_SIZE as i64 => {
            bail!("gen_hash size must be at most {MAX_HASH_SIZE}, got {size}")
        }
        Some(Value::Int(size)) if *size > 0 => *size as usize,
        Some(Value::Int(size)) => bail!("gen_hash size must be positive, got {size}"),
        _ => DEFAULT_HASH_SIZE,
    };
    let reset = call.param(1, "reset").is_some_and(Value::is_truthy);

    let mut memo = HASH.lock();
    if reset || memo.is_none() {
        let hex = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
        *memo = Some(hex.chars().take(size).collect());
    }
    Ok(memo.clone().map(Value::Str).unwrap_or_default())
}

fn check_type(call: &Call<'_>) -> anyhow::Result<Value> {
    let value = call.value();
    let declared = call.param(0, "dtype").cloned().unwrap_or(Value::Absent);
    let dtype = TypeRef::from_value(&declared).ok_or_else(|| anyhow!("Unknown type: {declared}"))?;
    if dtype.istype(&value) {
        Ok(Value::Bool(true))
    } else {
        Ok(Value::Str(format!(
            "Wrong type: Expected {:?}, got {}",
            dtype.label(),
            value.type_label()
        )))
    }
}

fn names(call: &Call<'_>, pick: impl Fn(bool) -> bool) -> Vec<String> {
    call.nodes()
        .iter()
        .filter(|node| pick(node.is_set()))
        .map(|node| node.name())
        .collect()
}

fn mutually_exclusive(call: &Call<'_>) -> anyhow::Result<Value> {
    let set = names(call, |is_set| is_set);
    if set.len() > 1 {
        Ok(Value::Str(format!(
            "Only one of these keys may be set, found: {}",
            set.join(", ")
        )))
    } else {
        Ok(Value::Bool(true))
    }
}

fn one_valid(call: &Call<'_>) -> anyhow::Result<Value> {
    let nodes = call.nodes();
    if nodes.iter().any(|node| node.is_set() && node.validate(false).reduce().is_empty()) {
        return Ok(Value::Bool(true));
    }
    let all: Vec<String> = nodes.iter().map(|node| node.name()).collect();
    Ok(Value::Str(format!(
        "At least one of these keys must be set and valid: {}",
        all.join(", ")
    )))
}

fn if_one_then_all(call: &Call<'_>) -> anyhow::Result<Value> {
    let set = names(call, |is_set| is_set);
    let unset = names(call, |is_set| !is_set);
    if set.is_empty() || unset.is_empty() {
        Ok(Value::Bool(true))
    } else {
        Ok(Value::Str(format!(
            "If one of these keys is set then all must be set, missing: {}",
            unset.join(", ")
        )))
    }
}
