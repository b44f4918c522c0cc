use std::fs;
use std::path::{Path, PathBuf};

/// Panel sources plus the db crate, where most of the SQL lives.
fn source_roots() -> Vec<PathBuf> {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    vec![
        manifest.join("src"),
        manifest.join("../../libs/captionly-db/src"),
    ]
}

fn collect_files(dir: &Path, ext: &str, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, ext, out);
        } else if path.extension().and_then(|s| s.to_str()) == Some(ext) {
            out.push(path);
        }
    }
}

fn line_number(content: &str, byte_idx: usize) -> usize {
    content[..byte_idx].bytes().filter(|b| *b == b'\n').count() + 1
}

/// Reads the string literal starting at `i`, either `"..."` or `r#"..."#`.
fn read_literal(content: &str, i: usize) -> Option<String> {
    let bytes = content.as_bytes();

    if bytes[i] == b'r' {
        let mut j = i + 1;
        let mut hashes = 0usize;
        while j < bytes.len() && bytes[j] == b'#' {
            hashes += 1;
            j += 1;
        }
        if j >= bytes.len() || bytes[j] != b'"' {
            return None;
        }
        let start = j + 1;
        let end_marker = format!("\"{}", "#".repeat(hashes));
        let end = start + content[start..].find(&end_marker)?;
        return Some(content[start..end].to_string());
    }

    if bytes[i] == b'"' {
        let start = i + 1;
        let mut escaped = false;
        for (j, &b) in bytes.iter().enumerate().skip(start) {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                return Some(content[start..j].to_string());
            }
        }
    }

    None
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// First argument of a `sqlx::query*` call, looking through `&format!(`.
fn parse_sql_literal_from_call(content: &str, call_idx: usize) -> Option<(usize, String)> {
    let bytes = content.as_bytes();
    let open_paren = call_idx + content[call_idx..].find('(')?;
    let mut i = skip_whitespace(bytes, open_paren + 1);

    if content[i..].starts_with("&format!(") {
        i = skip_whitespace(bytes, i + "&format!(".len());
    }
    if i >= bytes.len() {
        return None;
    }

    read_literal(content, i).map(|sql| (i, sql))
}

fn extract_sql_literals(content: &str) -> Vec<(usize, String)> {
    let mut result = Vec::new();
    let mut pos = 0usize;
    while let Some(rel) = content[pos..].find("sqlx::query") {
        let idx = pos + rel;
        if let Some(parsed) = parse_sql_literal_from_call(content, idx) {
            result.push(parsed);
        }
        pos = idx + "sqlx::query".len();
    }
    result
}

fn scan(check: impl Fn(&str) -> bool, what: &str) -> (usize, Vec<String>) {
    let mut files = Vec::new();
    for root in source_roots() {
        collect_files(&root, "rs", &mut files);
    }

    let mut scanned = 0;
    let mut violations = Vec::new();
    for file in files {
        let Ok(content) = fs::read_to_string(&file) else {
            continue;
        };
        for (byte_idx, sql) in extract_sql_literals(&content) {
            scanned += 1;
            if check(&sql) {
                violations.push(format!(
                    "{}:{} {}",
                    file.display(),
                    line_number(&content, byte_idx),
                    what
                ));
            }
        }
    }
    (scanned, violations)
}

#[test]
fn guard_sees_the_repository_queries() {
    let (scanned, _) = scan(|_| false, "");
    assert!(scanned >= 10, "only {} sqlx query literals found", scanned);
}

#[test]
fn sqlx_queries_must_not_use_sqlite_placeholders() {
    let (_, violations) = scan(
        |sql| sql.contains('?'),
        "contains '?' placeholder in sqlx query literal",
    );
    assert!(
        violations.is_empty(),
        "Found SQLite placeholders in SQL literals:\n{}",
        violations.join("\n")
    );
}

#[test]
fn sqlx_queries_must_not_use_sqlite_specific_syntax() {
    let (_, violations) = scan(
        |sql| {
            let lower = sql.to_lowercase();
            lower.contains("insert or ignore")
                || lower.contains("strftime(")
                || lower.contains("datetime(")
                || lower.contains("last_insert_rowid")
        },
        "contains SQLite-only SQL syntax",
    );
    assert!(
        violations.is_empty(),
        "Found SQLite-specific SQL in query literals:\n{}",
        violations.join("\n")
    );
}

#[test]
fn migrations_are_postgres() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../libs/captionly-db/migrations");
    let mut files = Vec::new();
    collect_files(&dir, "sql", &mut files);
    assert!(!files.is_empty(), "no migrations under {}", dir.display());

    for file in files {
        let content = fs::read_to_string(&file).unwrap().to_lowercase();
        assert!(
            !content.contains("autoincrement"),
            "{} uses SQLite AUTOINCREMENT",
            file.display()
        );
    }
}
