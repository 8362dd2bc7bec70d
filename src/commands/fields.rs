//! Feeding JSON field files into a form wizard.

use std::fmt::Write as _;

use serde_json::{Map, Value};

use super::CliError;
use crate::application::wizard::{Wizard, WizardError};
use crate::domain::drafts::{Draft, FieldErrors};

/// Apply every entry of `fields` to the wizard's draft.
///
/// Strings and numbers are text, arrays of strings are lists, booleans are
/// flags, and `null` clears a text field.
pub fn apply_fields<D: Draft>(
    wizard: &mut Wizard<D>,
    fields: &Map<String, Value>,
) -> Result<(), CliError> {
    for (name, value) in fields {
        let applied = match value {
            Value::String(text) => wizard.set_text(name, text),
            Value::Number(number) => wizard.set_text(name, &number.to_string()),
            Value::Null => wizard.set_text(name, ""),
            Value::Bool(flag) => wizard.set_flag(name, *flag),
            Value::Array(items) => wizard.set_list(name, string_items(name, items)?),
            Value::Object(_) => {
                return Err(CliError::InvalidInput(format!(
                    "field `{name}` must be a string, number, boolean, or list"
                )));
            }
        };
        applied.map_err(|err| CliError::InvalidInput(err.to_string()))?;
    }
    Ok(())
}

fn string_items(name: &str, items: &[Value]) -> Result<Vec<String>, CliError> {
    items
        .iter()
        .map(|item| match item {
            Value::String(text) => Ok(text.clone()),
            Value::Number(number) => Ok(number.to_string()),
            _ => Err(CliError::InvalidInput(format!(
                "field `{name}` must only contain strings"
            ))),
        })
        .collect()
}

/// Advance through every step, stopping at the first one that does not
/// validate.
pub fn walk_to_last_step<D: Draft>(wizard: &mut Wizard<D>) -> Result<(), CliError> {
    while !wizard.is_last_step() {
        match wizard.go_next() {
            Ok(_) => {}
            Err(WizardError::Blocked { step }) => {
                return Err(CliError::Incomplete {
                    step,
                    label: wizard.current_label().unwrap_or("unnamed"),
                    details: describe_errors(wizard.step_errors()),
                });
            }
            Err(err) => return Err(CliError::InvalidInput(err.to_string())),
        }
    }
    Ok(())
}

pub(crate) fn describe_errors(errors: &FieldErrors) -> String {
    let mut out = String::new();
    for (field, message) in errors {
        if !out.is_empty() {
            out.push_str("; ");
        }
        let _ = write!(out, "{field}: {message}");
    }
    out
}
