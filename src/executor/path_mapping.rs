use regex::Regex;

/// Counts `JOIN` keywords case-insensitively; used for the pre-execution
/// guard.
pub fn join_count(sql: &str) -> usize {
    lazy_static::lazy_static! {
        static ref JOIN_RE: Regex = Regex::new(r"(?i)\bjoin\b").unwrap();
    }
    JOIN_RE.find_iter(sql).count()
}

pub fn has_where_clause(sql: &str) -> bool {
    lazy_static::lazy_static! {
        static ref WHERE_RE: Regex = Regex::new(r"(?i)\bwhere\b").unwrap();
    }
    WHERE_RE.is_match(sql)
}

/// Extracts `(year, month)` of the *start* date from a
/// `BETWEEN 'YYYY-MM-DD' AND 'YYYY-MM-DD'` predicate, for partition
/// pruning. Optimization only; correctness never depends
/// on it succeeding.
pub fn extract_between_start(sql: &str) -> Option<(i32, u32)> {
    lazy_static::lazy_static! {
        static ref BETWEEN_RE: Regex =
            Regex::new(r"BETWEEN\s+'(\d{4})-(\d{2})-\d{2}'\s+AND\s+'\d{4}-\d{2}-\d{2}'").unwrap();
    }
    let cap = BETWEEN_RE.captures(sql)?;
    let year: i32 = cap.get(1)?.as_str().parse().ok()?;
    let month: u32 = cap.get(2)?.as_str().parse().ok()?;
    Some((year, month))
}

/// Rewrites `year=*/month=*` in a path glob to the pruned `year=YYYY/month=MM`
/// once a start date has been extracted from the WHERE clause.
pub fn prune_partition_glob(sql: &str, year: i32, month: u32) -> String {
    sql.replace("year=*/month=*", &format!("year={year}/month={month:02}"))
}

/// Applies partition pruning end-to-end: looks for a BETWEEN predicate and
/// rewrites any `year=*/month=*` glob found in the SQL text.
pub fn prune(sql: &str) -> String {
    match extract_between_start(sql) {
        Some((year, month)) => prune_partition_glob(sql, year, month),
        None => sql.to_string(),
    }
}
