//! Flat CSV input/output for the audit reports.
//!
//! Fields containing a comma, quote or line break are quoted with doubled
//! inner quotes; unquoted fields are trimmed on read, mirroring how the
//! files are hand-edited between runs.

use std::path::Path;

use anyhow::{bail, Context as _, Result as AnyhowResult};

fn escape(field: &str) -> String {
    if field.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub fn format_rows(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    out.push_str(
        &header
            .iter()
            .map(|h| escape(h))
            .collect::<Vec<_>>()
            .join(","),
    );
    out.push('\n');
    for row in rows {
        let line = row
            .iter()
            .map(|field| escape(field))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&line);
        out.push('\n');
    }
    out
}

pub fn parse(text: &str) -> AnyhowResult<Vec<Vec<String>>> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut in_quotes = false;

    let push_field = |row: &mut Vec<String>, field: &mut String, quoted: &mut bool| {
        if *quoted {
            row.push(std::mem::take(field));
        } else {
            row.push(field.trim().to_string());
            field.clear();
        }
        *quoted = false;
    };

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }
        match c {
            '"' if field.is_empty() && !quoted => {
                in_quotes = true;
                quoted = true;
            }
            ',' => push_field(&mut row, &mut field, &mut quoted),
            '\r' => {}
            '\n' => {
                push_field(&mut row, &mut field, &mut quoted);
                // A lone newline between records is not an empty record.
                if !(row.len() == 1 && row[0].is_empty()) {
                    rows.push(std::mem::take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(c),
        }
    }
    if in_quotes {
        bail!("Unterminated quoted field in CSV input");
    }
    if !field.is_empty() || !row.is_empty() || quoted {
        push_field(&mut row, &mut field, &mut quoted);
        rows.push(row);
    }
    Ok(rows)
}

/// Read a CSV file and split off its header row.
pub fn read_records(path: &Path) -> AnyhowResult<(Vec<String>, Vec<Vec<String>>)> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file at {}", path.display()))?;
    let mut rows = parse(&text)
        .with_context(|| format!("Failed to parse CSV file at {}", path.display()))?;
    if rows.is_empty() {
        bail!("CSV file at {} has no header row", path.display());
    }
    let header = rows.remove(0);
    Ok((header, rows))
}

pub fn write_records(path: &Path, header: &[&str], rows: &[Vec<String>]) -> AnyhowResult<()> {
    let data = format_rows(header, rows);
    std::fs::write(path, data)
        .with_context(|| format!("Failed to write output file at {}", path.display()))?;
    Ok(())
}

/// Index of a named column in a header row.
pub fn column_index(header: &[String], name: &str) -> AnyhowResult<usize> {
    header
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .with_context(|| format!("Missing expected column '{name}' in CSV header"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_rows_round_trip() {
        let rows = vec![
            vec!["platform".to_string(), "api".to_string(), "main".to_string()],
            vec!["infra".to_string(), "deploy".to_string(), "master".to_string()],
        ];
        let text = format_rows(&["Team Slug", "Repository", "Default Branch"], &rows);
        let parsed = parse(&text).unwrap();
        assert_eq!(parsed[0], vec!["Team Slug", "Repository", "Default Branch"]);
        assert_eq!(&parsed[1..], rows.as_slice());
    }

    #[test]
    fn fields_with_commas_and_quotes_are_escaped() {
        let rows = vec![vec!["needs \"triage\", urgent".to_string()]];
        let text = format_rows(&["Label Name"], &rows);
        assert_eq!(text, "Label Name\n\"needs \"\"triage\"\", urgent\"\n");
        let parsed = parse(&text).unwrap();
        assert_eq!(parsed[1], rows[0]);
    }

    #[test]
    fn unquoted_fields_are_trimmed() {
        let parsed = parse("Team Name, Slug \nPlatform Team , platform\n").unwrap();
        assert_eq!(parsed[0], vec!["Team Name", "Slug"]);
        assert_eq!(parsed[1], vec!["Platform Team", "platform"]);
    }

    #[test]
    fn quoted_fields_keep_leading_whitespace() {
        let parsed = parse("\" spaced \",x\n").unwrap();
        assert_eq!(parsed[0], vec![" spaced ", "x"]);
    }

    #[test]
    fn missing_final_newline_is_accepted() {
        let parsed = parse("a,b\nc,d").unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1], vec!["c", "d"]);
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let parsed = parse("a,b\r\nc,d\r\n").unwrap();
        assert_eq!(parsed, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        assert!(parse("\"oops\n").is_err());
    }

    #[test]
    fn column_lookup_is_case_insensitive() {
        let header = vec!["Team Name".to_string(), "Slug".to_string()];
        assert_eq!(column_index(&header, "slug").unwrap(), 1);
        assert!(column_index(&header, "Repository").is_err());
    }
}
