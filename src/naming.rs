use crate::error::{Error, Result};
use chrono::NaiveDate;

const EXTENSION: &str = ".csv";

/// Output file names for one calendar month: `<prefix><YYYY-MM>_<index>.csv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNaming {
    prefix: String,
    year_month: String,
}

impl FileNaming {
    pub fn new(prefix: impl Into<String>, year_month: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            year_month: year_month.into(),
        }
    }

    pub fn for_date(prefix: impl Into<String>, date: NaiveDate) -> Self {
        Self::new(prefix, year_month(date))
    }

    pub fn year_month(&self) -> &str {
        &self.year_month
    }

    pub fn file_name(&self, index: u64) -> String {
        format!("{}{}_{}{}", self.prefix, self.year_month, index, EXTENSION)
    }

    /// Index captured from `name` when it has exactly this month's shape.
    pub fn matches(&self, name: &str) -> Option<u64> {
        let index = name
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix(self.year_month.as_str())?
            .strip_prefix('_')?
            .strip_suffix(EXTENSION)?;
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        index.parse().ok()
    }

    pub fn parse_index(&self, name: &str) -> Result<u64> {
        self.matches(name).ok_or_else(|| Error::Naming {
            file_name: name.to_string(),
        })
    }
}

pub fn year_month(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn june() -> FileNaming {
        FileNaming::new("out_", "2024-06")
    }

    #[test]
    fn file_name_has_prefix_month_and_index() {
        assert_eq!(june().file_name(1), "out_2024-06_1.csv");
        assert_eq!(june().file_name(12), "out_2024-06_12.csv");
    }

    #[test]
    fn year_month_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        assert_eq!(year_month(date), "2025-03");
        assert_eq!(FileNaming::for_date("t_", date).file_name(2), "t_2025-03_2.csv");
    }

    #[test]
    fn parse_index_inverts_file_name() {
        let naming = june();
        for index in [0, 1, 2, 9, 10, 11, 99, 1000, u64::MAX] {
            assert_eq!(naming.parse_index(&naming.file_name(index)).unwrap(), index);
        }
    }

    #[test]
    fn leading_zeros_are_accepted_as_is() {
        assert_eq!(june().matches("out_2024-06_007.csv"), Some(7));
    }

    #[test]
    fn other_months_and_shapes_do_not_match() {
        let naming = june();
        for name in [
            "out_2024-05_3.csv",
            "out_2023-06_3.csv",
            "in_2024-06_3.csv",
            "out_2024-06_.csv",
            "out_2024-06_3.txt",
            "out_2024-06_3.csv.bak",
            "out_2024-06_-3.csv",
            "out_2024-06_+3.csv",
            "out_2024-06_3a.csv",
            "out_2024-06-3.csv",
            "out_2024-06_99999999999999999999999.csv",
            "notes.txt",
        ] {
            assert_eq!(naming.matches(name), None, "{name}");
        }
    }

    #[test]
    fn parse_index_reports_naming_error() {
        let err = june().parse_index("out_2024-05_3.csv").unwrap_err();
        assert!(matches!(err, Error::Naming { ref file_name } if file_name == "out_2024-05_3.csv"));
    }

    #[test]
    fn empty_prefix_is_supported() {
        let naming = FileNaming::new("", "2024-06");
        assert_eq!(naming.file_name(4), "2024-06_4.csv");
        assert_eq!(naming.matches("2024-06_4.csv"), Some(4));
    }
}
