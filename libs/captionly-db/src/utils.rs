/// SQLSTATE for "relation does not exist".
pub const UNDEFINED_TABLE: &str = "42P01";

/// True when the error is PostgreSQL reporting a missing table.
pub fn is_undefined_table(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == UNDEFINED_TABLE)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_are_not_missing_tables() {
        assert!(!is_undefined_table(&sqlx::Error::RowNotFound));
        assert!(!is_undefined_table(&sqlx::Error::PoolTimedOut));
    }
}
