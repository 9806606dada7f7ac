//! NetCDF dataset inspection
//!
//! Structured listing of a file's dimensions and variables, printed by
//! `spatialstats --list-vars`.

use std::fmt;
use std::path::PathBuf;

/// Information about a dimension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionInfo {
    pub name: String,
    pub length: usize,
    pub is_unlimited: bool,
}

/// Information about a variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableInfo {
    pub name: String,
    pub dimensions: Vec<String>,
    pub shape: Vec<usize>,
    pub units: Option<String>,
}

impl VariableInfo {
    /// Whether this variable can be reduced: three dimensions, none of them empty
    #[must_use]
    pub fn is_reducible(&self) -> bool {
        self.shape.len() == 3 && self.shape.iter().all(|&n| n > 0)
    }
}

/// Dimensions and variables of one dataset
#[derive(Debug, Clone)]
pub struct DatasetSummary {
    pub path: PathBuf,
    pub dimensions: Vec<DimensionInfo>,
    pub variables: Vec<VariableInfo>,
}

impl DatasetSummary {
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&VariableInfo> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Names of variables that [`crate::statistics::reduce`] accepts
    #[must_use]
    pub fn reducible_variables(&self) -> Vec<&str> {
        self.variables
            .iter()
            .filter(|v| v.is_reducible())
            .map(|v| v.name.as_str())
            .collect()
    }
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n Dataset: {}", self.path.display())?;
        writeln!(f, "\n Dimensions")?;
        writeln!(f, "============")?;
        for dim in &self.dimensions {
            let unlimited = if dim.is_unlimited { " (unlimited)" } else { "" };
            writeln!(f, "  {:<20} {}{}", dim.name, dim.length, unlimited)?;
        }

        writeln!(f, "\n Variables")?;
        writeln!(f, "===========")?;
        for var in &self.variables {
            let dims: Vec<String> = var
                .dimensions
                .iter()
                .zip(&var.shape)
                .map(|(name, len)| format!("{name}[{len}]"))
                .collect();
            let units = var
                .units
                .as_deref()
                .map(|u| format!("  [{u}]"))
                .unwrap_or_default();
            let marker = if var.is_reducible() { "*" } else { " " };
            writeln!(f, "{marker} {:<20} ({}){units}", var.name, dims.join(", "))?;
        }
        write!(f, "\n(* = 3-D variable that can be reduced)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> DatasetSummary {
        DatasetSummary {
            path: PathBuf::from("era.nc"),
            dimensions: vec![
                DimensionInfo {
                    name: "time".to_string(),
                    length: 0,
                    is_unlimited: true,
                },
                DimensionInfo {
                    name: "lat".to_string(),
                    length: 3,
                    is_unlimited: false,
                },
            ],
            variables: vec![
                VariableInfo {
                    name: "lat".to_string(),
                    dimensions: vec!["lat".to_string()],
                    shape: vec![3],
                    units: Some("degrees_north".to_string()),
                },
                VariableInfo {
                    name: "t2m".to_string(),
                    dimensions: vec!["time".to_string(), "lat".to_string(), "lon".to_string()],
                    shape: vec![2, 3, 4],
                    units: Some("K".to_string()),
                },
            ],
        }
    }

    #[test]
    fn test_reducible_variables() {
        let s = summary();
        assert_eq!(s.reducible_variables(), vec!["t2m"]);
        assert!(s.variable("lat").is_some());
        assert!(s.variable("sst").is_none());
    }

    #[test]
    fn test_display_lists_everything() {
        let text = summary().to_string();
        assert!(text.contains("time"));
        assert!(text.contains("(unlimited)"));
        assert!(text.contains("t2m"));
        assert!(text.contains("time[2], lat[3], lon[4]"));
        assert!(text.contains("[K]"));
    }
}
