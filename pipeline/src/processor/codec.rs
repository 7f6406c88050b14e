use crate::models::COLUMN_COUNT;

/// Splits a tuple into its columns.
pub fn split(tuple: &str, separator: &str) -> Vec<String> {
    tuple.split(separator).map(str::to_string).collect()
}

pub fn join(columns: &[String], separator: &str) -> String {
    columns.join(separator)
}

/// Splits a tuple and returns its columns only when there are exactly
/// [`COLUMN_COUNT`] of them.
pub fn split_exact(tuple: &str, separator: &str) -> Option<Vec<String>> {
    let columns = split(tuple, separator);
    (columns.len() == COLUMN_COUNT).then_some(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_keeps_empty_columns() {
        assert_eq!(split("a,,c", ","), vec!["a", "", "c"]);
    }

    #[test]
    fn test_join_inverts_split() {
        let tuple = "1,,2019-05-13 10:00:00,x";
        assert_eq!(join(&split(tuple, ","), ","), tuple);
    }

    #[test]
    fn test_split_exact_enforces_column_count() {
        let nineteen = vec!["0"; COLUMN_COUNT - 1].join(",");
        let twenty = vec!["0"; COLUMN_COUNT].join(",");
        let twenty_one = vec!["0"; COLUMN_COUNT + 1].join(",");

        assert!(split_exact(&nineteen, ",").is_none());
        assert_eq!(split_exact(&twenty, ",").map(|c| c.len()), Some(COLUMN_COUNT));
        assert!(split_exact(&twenty_one, ",").is_none());
    }
}
