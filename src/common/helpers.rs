use anyhow::Error;

use crate::common::errors::SchemaError;

pub fn print_error_chain(err: &Error) {
    // Concatenate the main context message along with its chain of errors
    let error_message = err
        .chain()
        .enumerate()
        .map(|(index, cause)| {
            if index == 0 {
                cause.to_string()
            } else {
                format!("       └> {}", cause)
            }
        })
        .collect::<Vec<String>>()
        .join("\n");

    error!("{}", error_message);
}

/// Whether the failure comes from a schema that disagrees with the requested change.
pub fn is_schema_conflict(err: &Error) -> bool {
    err.downcast_ref::<SchemaError>()
        .map_or(false, SchemaError::is_conflict)
}

/// Escapes a value for use inside a single-quoted SQL literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
