//! Option overrides given on the command line after the target
//!
//! ```text
//! architect app:build --prod --output-path=dist --jobs 4 --no-cache -w
//! ```
//!
//! becomes `{"prod": true, "output-path": "dist", "jobs": 4, "cache": false, "w": true}`.

use serde_json::{Map, Number, Value};

use crate::error::ArchitectError;

/// Parse `--key=value`, `--key value`, `--flag` and `--no-flag` arguments
///
/// Single-dash arguments are clusters of one-letter flags: `-abc` sets `a`,
/// `b` and `c` to true. The last letter takes `=value`, a value attached
/// right after the letters (`-n5`) or the next argument. A key given more
/// than once collects its values into an array.
pub fn parse_overrides<S: AsRef<str>>(args: &[S]) -> Result<Map<String, Value>, ArchitectError> {
    let mut options = Map::new();
    let mut args = args.iter().map(AsRef::as_ref).peekable();

    while let Some(arg) = args.next() {
        if let Some(flag) = arg.strip_prefix("--") {
            let (key, value) = if let Some((key, raw)) = flag.split_once('=') {
                (key, coerce(raw))
            } else if let Some(key) = flag.strip_prefix("no-") {
                (key, Value::Bool(false))
            } else if let Some(raw) = args.next_if(|next| !is_option(next)) {
                (flag, coerce(raw))
            } else {
                (flag, Value::Bool(true))
            };

            if key.is_empty() {
                return Err(ArchitectError::invalid_override(arg, "option name is empty"));
            }
            insert(&mut options, key, value);
        } else if is_option(arg) {
            let cluster = &arg[1..];
            let split = cluster
                .find(|c: char| !c.is_ascii_alphabetic())
                .unwrap_or(cluster.len());
            let (names, attached) = cluster.split_at(split);
            let (leading, last) = names.split_at(names.len() - 1);

            for name in leading.chars() {
                insert(&mut options, &name.to_string(), Value::Bool(true));
            }
            let value = if let Some(raw) = attached.strip_prefix('=') {
                coerce(raw)
            } else if !attached.is_empty() {
                coerce(attached)
            } else if let Some(raw) = args.next_if(|next| !is_option(next)) {
                coerce(raw)
            } else {
                Value::Bool(true)
            };
            insert(&mut options, last, value);
        } else {
            return Err(ArchitectError::invalid_override(
                arg,
                "expected an option starting with '-' or '--'",
            ));
        }
    }

    Ok(options)
}

/// Whether `arg` names an option rather than a value
///
/// Negative numbers such as `-3` are values.
fn is_option(arg: &str) -> bool {
    arg.strip_prefix('-')
        .is_some_and(|rest| rest.starts_with(|c: char| c == '-' || c.is_ascii_alphabetic()))
}

fn insert(options: &mut Map<String, Value>, key: &str, value: Value) {
    match options.get_mut(key) {
        Some(Value::Array(values)) => values.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            options.insert(key.to_string(), value);
        }
    }
}

/// Interpret a raw string as a boolean or number when it looks like one
fn coerce(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Some(n) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    Value::String(raw.to_string())
}
