use ppio_api::{CodecError, Value};

/// One parsed cell. `None` is an empty unquoted cell; a quoted empty cell
/// (`""`) is `Some("")`.
pub(crate) type Cell = Option<String>;

// ═══════════════════════════════════════════════════════════════
//  RFC 4180 record reader
// ═══════════════════════════════════════════════════════════════

/// Split text into records of cells. Quoted fields may span line breaks.
/// A blank line is a record with one empty cell. `\r\n` and `\n` both end
/// a record.
pub(crate) fn parse_records(text: &str, delimiter: char, quoting: bool) -> Vec<Vec<Cell>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut records = Vec::new();
    let mut chars = text.chars().peekable();

    while chars.peek().is_some() {
        let mut record = Vec::new();
        loop {
            let cell = if quoting && chars.peek() == Some(&'"') {
                // Quoted field (RFC 4180 rule 5-7)
                chars.next();
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('"') => {
                            if chars.peek() == Some(&'"') {
                                // Escaped quote: "" → "
                                chars.next();
                                field.push('"');
                            } else {
                                break;
                            }
                        }
                        Some(c) => field.push(c),
                        None => break, // EOF inside quote, best effort
                    }
                }
                // Skip stray chars after the closing quote
                while let Some(&c) = chars.peek() {
                    if c == delimiter || c == '\n' || c == '\r' {
                        break;
                    }
                    chars.next();
                }
                Some(field)
            } else {
                let mut field = String::new();
                while let Some(&c) = chars.peek() {
                    if c == delimiter || c == '\n' || c == '\r' {
                        break;
                    }
                    field.push(c);
                    chars.next();
                }
                (!field.is_empty()).then_some(field)
            };
            record.push(cell);

            match chars.next() {
                Some(c) if c == delimiter => continue,
                Some('\r') => {
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    break;
                }
                _ => break,
            }
        }

        records.push(record);
    }

    records
}

fn is_blank(record: &[Cell]) -> bool {
    matches!(record, [None])
}

/// Take the header row off parsed records. Leading blank lines are ignored.
/// In a single-column file a blank line is a null value and stays a row;
/// with more columns blank lines are dropped.
pub(crate) fn split_header(records: Vec<Vec<Cell>>) -> Option<(Vec<Cell>, Vec<Vec<Cell>>)> {
    let mut records = records.into_iter().skip_while(|r| is_blank(r));
    let header = records.next()?;
    let rows = if header.len() > 1 {
        records.filter(|r| !is_blank(r)).collect()
    } else {
        records.collect()
    };
    Some((header, rows))
}

// ═══════════════════════════════════════════════════════════════
//  Record writer
// ═══════════════════════════════════════════════════════════════

/// Render a double so it re-infers as a double: integral values keep a
/// fractional part (`2.0`, never `2`).
pub(crate) fn format_double(v: f64) -> String {
    let s = v.to_string();
    if v.is_finite() && !s.contains('.') {
        format!("{s}.0")
    } else {
        s
    }
}

fn push_text(out: &mut String, s: &str, delimiter: char, quoting: bool) -> Result<(), CodecError> {
    let needs_quotes = s.is_empty()
        || s.contains(delimiter)
        || s.contains('"')
        || s.contains('\n')
        || s.contains('\r');
    if !needs_quotes {
        out.push_str(s);
        return Ok(());
    }
    if !quoting {
        if s.is_empty() {
            // Indistinguishable from null without quoting
            return Ok(());
        }
        return Err(CodecError::storage(format!(
            "CSV: value {s:?} needs quoting but quoting is disabled"
        )));
    }
    out.push('"');
    out.push_str(&s.replace('"', "\"\""));
    out.push('"');
    Ok(())
}

pub(crate) fn push_header(
    out: &mut String,
    names: &[&str],
    delimiter: char,
    quoting: bool,
) -> Result<(), CodecError> {
    for (i, name) in names.iter().enumerate() {
        if i > 0 {
            out.push(delimiter);
        }
        push_text(out, name, delimiter, quoting)?;
    }
    out.push('\n');
    Ok(())
}

pub(crate) fn push_row(
    out: &mut String,
    values: &[Value],
    delimiter: char,
    quoting: bool,
) -> Result<(), CodecError> {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push(delimiter);
        }
        match value {
            Value::Null => {}
            Value::String(s) => push_text(out, s, delimiter, quoting)?,
            Value::Integer(v) => out.push_str(&v.to_string()),
            Value::Double(v) if !v.is_finite() => {
                return Err(CodecError::storage(format!(
                    "CSV: non-finite double {v} cannot be written"
                )));
            }
            Value::Double(v) => out.push_str(&format_double(*v)),
            Value::Geometry(g) => push_text(out, &g.to_string(), delimiter, quoting)?,
        }
    }
    out.push('\n');
    Ok(())
}
