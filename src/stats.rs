use std::fmt::{self, Write as _};

use ndarray::{Array1, Array2};

use crate::dataset::{Dataset, NumericColumn, BUSINESS_TYPE, LOCATION};

/// Revenue against capital and employees against capital.
pub const SCATTER_SERIES: [(NumericColumn, NumericColumn); 2] = [
    (NumericColumn::Revenue, NumericColumn::Capital),
    (NumericColumn::Employees, NumericColumn::Capital),
];

/// Pearson correlations between every pair of numeric dataset columns.
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    columns: Vec<NumericColumn>,
    values: Array2<f64>,
}

impl CorrelationMatrix {
    pub fn columns(&self) -> &[NumericColumn] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Correlation between two columns, `None` if either is not in the matrix.
    pub fn get(&self, a: NumericColumn, b: NumericColumn) -> Option<f64> {
        let i = self.columns.iter().position(|&c| c == a)?;
        let j = self.columns.iter().position(|&c| c == b)?;
        Some(self.values[[i, j]])
    }
}

impl fmt::Display for CorrelationMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>16}", "")?;
        for c in &self.columns {
            write!(f, " {:>16}", c.name())?;
        }
        writeln!(f)?;

        for (c, row) in self.columns.iter().zip(self.values.rows()) {
            write!(f, "{:>16}", c.name())?;
            for v in row {
                write!(f, " {v:>16.2}")?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// Correlation matrix over all numeric columns of `dataset`.
///
/// A column without variance has no defined correlation, so its whole row and
/// column (diagonal included) are `NaN`.
pub fn correlation_matrix(dataset: &Dataset) -> CorrelationMatrix {
    let columns = NumericColumn::ALL.to_vec();
    let centered: Vec<Array1<f64>> = columns
        .iter()
        .map(|&c| {
            let values = dataset.column(c);
            let mean = values.mean().unwrap_or(0.0);
            values - mean
        })
        .collect();
    let norms: Vec<f64> = centered.iter().map(|v| v.dot(v).sqrt()).collect();

    let k = columns.len();
    let values = Array2::from_shape_fn((k, k), |(i, j)| {
        if norms[i] == 0.0 || norms[j] == 0.0 {
            f64::NAN
        } else if i == j {
            1.0
        } else {
            let r = centered[i].dot(&centered[j]) / (norms[i] * norms[j]);
            r.clamp(-1.0, 1.0)
        }
    });

    CorrelationMatrix { columns, values }
}

/// Renders `x` against `y` as a table with one line per row, grouped by
/// business type and then location. Rows keep their dataset order inside a group.
pub fn scatter_table(dataset: &Dataset, x: NumericColumn, y: NumericColumn) -> String {
    let mut points = dataset.scatter(x, y);
    points.sort_by(|a, b| {
        a.business_type
            .cmp(b.business_type)
            .then_with(|| a.location.cmp(b.location))
    });

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<16} {:<14} {:>16} {:>16}",
        BUSINESS_TYPE,
        LOCATION,
        x.name(),
        y.name()
    );
    for p in &points {
        let _ = writeln!(
            out,
            "{:<16} {:<14} {:>16.2} {:>16.2}",
            p.business_type, p.location, p.x, p.y
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::BusinessRecord;

    fn record(employees: u32, material_cost: f64, revenue: f64, capital: f64) -> BusinessRecord {
        BusinessRecord {
            business_type: "Kuliner".into(),
            location: "Bandung".into(),
            employees,
            material_cost,
            production_target: 50,
            revenue,
            capital,
        }
    }

    fn dataset() -> Dataset {
        Dataset::from_records(vec![
            record(1, 400.0, 100.0, 10.0),
            record(2, 300.0, 300.0, 20.0),
            record(3, 200.0, 200.0, 30.0),
            record(4, 100.0, 400.0, 40.0),
        ])
        .unwrap()
    }

    #[test]
    fn perfect_positive_and_negative_correlation() {
        let corr = correlation_matrix(&dataset());
        let get = |a, b| corr.get(a, b).unwrap();

        let r = get(NumericColumn::Employees, NumericColumn::Capital);
        assert!((r - 1.0).abs() < 1e-12, "r = {r}");
        let r = get(NumericColumn::MaterialCost, NumericColumn::Capital);
        assert!((r + 1.0).abs() < 1e-12, "r = {r}");
        assert_eq!(get(NumericColumn::Capital, NumericColumn::Capital), 1.0);

        let r = get(NumericColumn::Revenue, NumericColumn::Capital);
        assert!((r - 0.8).abs() < 1e-12, "r = {r}");
    }

    #[test]
    fn matrix_is_symmetric() {
        let corr = correlation_matrix(&dataset());
        let v = corr.values();
        assert_eq!(v.dim(), (5, 5));
        for i in 0..5 {
            for j in 0..5 {
                let (a, b) = (v[[i, j]], v[[j, i]]);
                assert!(a == b || (a.is_nan() && b.is_nan()));
            }
        }
    }

    #[test]
    fn constant_column_is_nan() {
        let corr = correlation_matrix(&dataset());
        let target = NumericColumn::ProductionTarget;
        assert!(corr.get(target, NumericColumn::Capital).unwrap().is_nan());
        assert!(corr.get(target, target).unwrap().is_nan());
    }

    #[test]
    fn display_has_header_and_one_line_per_column() {
        let text = correlation_matrix(&dataset()).to_string();
        assert_eq!(text.lines().count(), 6);
        assert!(text.lines().next().unwrap().contains("Modal"));
        assert!(text.contains("-1.00"));
    }

    fn tagged(business_type: &str, location: &str, revenue: f64, capital: f64) -> BusinessRecord {
        BusinessRecord {
            business_type: business_type.into(),
            location: location.into(),
            employees: 2,
            material_cost: 1_000.0,
            production_target: 10,
            revenue,
            capital,
        }
    }

    #[test]
    fn rows_are_grouped_by_category() {
        let ds = Dataset::from_records(vec![
            tagged("Kuliner", "Jakarta", 3.0, 30.0),
            tagged("Fashion", "Jakarta", 1.0, 10.0),
            tagged("Kuliner", "Bandung", 4.0, 40.0),
            tagged("Fashion", "Bandung", 2.0, 20.0),
        ])
        .unwrap();

        let text = scatter_table(&ds, NumericColumn::Revenue, NumericColumn::Capital);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].contains("Omset") && lines[0].contains("Modal"));

        let groups: Vec<(&str, &str)> = lines[1..]
            .iter()
            .map(|l| {
                let mut cols = l.split_whitespace();
                (cols.next().unwrap(), cols.next().unwrap())
            })
            .collect();
        assert_eq!(
            groups,
            vec![
                ("Fashion", "Bandung"),
                ("Fashion", "Jakarta"),
                ("Kuliner", "Bandung"),
                ("Kuliner", "Jakarta"),
            ]
        );
        assert!(lines[1].ends_with("20.00"));
    }
}
