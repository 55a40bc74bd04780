/// Per-column standardization to zero mean and unit population variance.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
}

impl StandardScaler {
    /// Columns with zero variance keep a scale of 1, so they standardize to 0.
    pub fn fit<const N: usize>(rows: &[[f64; N]]) -> Self {
        let mut means = vec![0.0; N];
        let mut scales = vec![1.0; N];
        if rows.is_empty() {
            return Self { means, scales };
        }

        let n = rows.len() as f64;
        for (col, mean) in means.iter_mut().enumerate() {
            *mean = rows.iter().map(|r| r[col]).sum::<f64>() / n;
        }
        for (col, scale) in scales.iter_mut().enumerate() {
            let mean = means[col];
            let variance = rows.iter().map(|r| (r[col] - mean).powi(2)).sum::<f64>() / n;
            let std = variance.sqrt();
            if std.is_finite() && std > 0.0 {
                *scale = std;
            }
        }
        Self { means, scales }
    }

    pub fn transform<const N: usize>(&self, rows: &[[f64; N]]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|r| {
                r.iter()
                    .zip(self.means.iter().zip(&self.scales))
                    .map(|(x, (mean, scale))| (x - mean) / scale)
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standardized_columns_have_zero_mean_unit_variance() {
        let rows = [[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [6.0, 40.0]];
        let scaler = StandardScaler::fit(&rows);
        let scaled = scaler.transform(&rows);

        for col in 0..2 {
            let values: Vec<f64> = scaled.iter().map(|r| r[col]).collect();
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let rows = [[5.0, 1.0], [5.0, 2.0]];
        let scaler = StandardScaler::fit(&rows);
        assert!((scaler.scales[0] - 1.0).abs() < f64::EPSILON);
        let scaled = scaler.transform(&rows);
        assert!(scaled.iter().all(|r| r[0].abs() < f64::EPSILON));
    }

    #[test]
    fn test_population_std_is_used() {
        let rows = [[0.0], [2.0]];
        let scaler = StandardScaler::fit(&rows);
        assert!((scaler.means[0] - 1.0).abs() < f64::EPSILON);
        assert!((scaler.scales[0] - 1.0).abs() < f64::EPSILON);
    }
}
