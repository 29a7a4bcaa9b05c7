use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unbalanced mixture marker braces in '{0}'.")]
    UnbalancedBraces(String),

    #[error("The list '{0}' contains no entries.")]
    EmptyList(String),
}

/// Splits a comma-separated record list, ignoring commas inside `{...}` markers.
pub fn split_records(list: &str) -> Result<Vec<String>, ParseError> {
    let mut records = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for ch in list.chars() {
        match ch {
            '{' => {
                depth += 1;
                current.push(ch);
            }
            '}' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| ParseError::UnbalancedBraces(list.to_string()))?;
                current.push(ch);
            }
            ',' if depth == 0 => records.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    if depth != 0 {
        return Err(ParseError::UnbalancedBraces(list.to_string()));
    }
    records.push(current);

    let records: Vec<String> = records
        .into_iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();
    if records.is_empty() {
        return Err(ParseError::EmptyList(list.to_string()));
    }
    Ok(records)
}

/// Splits a plain comma-separated list of names.
pub fn split_names(list: &str) -> Result<Vec<String>, ParseError> {
    let names: Vec<String> = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if names.is_empty() {
        return Err(ParseError::EmptyList(list.to_string()));
    }
    Ok(names)
}

/// Expands the escapes and names users type for output separators.
pub fn unescape_separator(spelling: &str) -> String {
    match spelling {
        "tab" => "\t".to_string(),
        "newline" => "\n".to_string(),
        "comma" => ",".to_string(),
        "semicolon" => ";".to_string(),
        "pipe" => "|".to_string(),
        "space" => " ".to_string(),
        other => other
            .replace("\\t", "\t")
            .replace("\\r", "\r")
            .replace("\\n", "\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commas_inside_markers_do_not_split_records() {
        let records = split_records("CCO, {solute,x:0.5}CCO{solvent,x:0.5}O ,O").unwrap();
        assert_eq!(
            records,
            vec!["CCO", "{solute,x:0.5}CCO{solvent,x:0.5}O", "O"]
        );
    }

    #[test]
    fn unbalanced_markers_are_rejected() {
        assert_eq!(
            split_records("{solute CCO"),
            Err(ParseError::UnbalancedBraces("{solute CCO".to_string()))
        );
        assert!(split_records("CCO}").is_err());
    }

    #[test]
    fn empty_lists_are_rejected() {
        assert!(split_records(" , ").is_err());
        assert!(split_names("").is_err());
    }

    #[test]
    fn names_are_trimmed() {
        assert_eq!(split_names("logKow, default ,").unwrap(), vec!["logKow", "default"]);
    }

    #[test]
    fn separator_escapes_expand() {
        assert_eq!(unescape_separator("\\t"), "\t");
        assert_eq!(unescape_separator("\\r\\n"), "\r\n");
        assert_eq!(unescape_separator("comma"), ",");
        assert_eq!(unescape_separator(" | "), " | ");
    }
}
