use crate::error::{GafsError, Result};
use crate::param::Param;
use crate::utils::allocate_by_largest_remainder;
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cell contents treated as missing values
const MISSING_TOKENS: [&str; 11] = [
    "", "NA", "N/A", "NaN", "nan", "null", "NULL", "None", "#N/A", "-NaN", "-nan",
];

/// A prepared, already split dataset. Never mutated once built, so both
/// search strategies can borrow it at the same time.
#[derive(Clone, Serialize, Deserialize)]
pub struct Data {
    pub X_train: Vec<Vec<f64>>,  // row-major training features
    pub X_test: Vec<Vec<f64>>,   // row-major held-out features
    pub y_train: Vec<usize>,     // class indices into `classes`
    pub y_test: Vec<usize>,
    pub features: Vec<String>,   // feature names, in column order
    pub classes: Vec<String>,    // sorted distinct label values
    pub target: String,
    pub id_column: Option<String>,
    pub sample_len: usize,       // rows left after dropping fully empty rows
    pub feature_len: usize,
}

impl Data {
    /// Create a new `Data` instance with default values
    pub fn new() -> Data {
        Data {
            X_train: Vec::new(),
            X_test: Vec::new(),
            y_train: Vec::new(),
            y_test: Vec::new(),
            features: Vec::new(),
            classes: Vec::new(),
            target: String::new(),
            id_column: None,
            sample_len: 0,
            feature_len: 0,
        }
    }

    /// Parse, clean and split CSV content.
    ///
    /// Fully empty rows then fully empty columns are dropped before the column
    /// indices are checked, so `target_column` and `id_column` refer to the
    /// cleaned table. Rows with a missing feature or label are removed, and what
    /// remains is split in a stratified way using `param.data`.
    pub fn from_csv_str(
        content: &str,
        target_column: usize,
        id_column: Option<usize>,
        param: &Param,
    ) -> Result<Data> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let mut headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
        let mut rows: Vec<Vec<Option<String>>> = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            // Short rows are padded with missing cells, long rows are malformed
            if record.len() > headers.len() {
                return Err(GafsError::DataQuality(format!(
                    "Error processing CSV: row {} has {} fields, expected {}",
                    i + 1,
                    record.len(),
                    headers.len()
                )));
            }
            rows.push(
                (0..headers.len())
                    .map(|j| record.get(j).and_then(parse_cell))
                    .collect(),
            );
        }
        debug!("Parsed {} rows x {} columns", rows.len(), headers.len());

        // Remove any empty rows and columns
        rows.retain(|row| row.iter().any(Option::is_some));
        let kept_columns: Vec<usize> = (0..headers.len())
            .filter(|&j| rows.iter().any(|row| row[j].is_some()))
            .collect();
        if kept_columns.len() < headers.len() {
            debug!("Dropping {} empty columns", headers.len() - kept_columns.len());
            headers = kept_columns.iter().map(|&j| headers[j].clone()).collect();
            rows = rows
                .into_iter()
                .map(|row| kept_columns.iter().map(|&j| row[j].clone()).collect())
                .collect();
        }
        let sample_len = rows.len();
        let n_columns = headers.len();

        check_column_index("target", target_column, n_columns)?;
        if let Some(id) = id_column {
            check_column_index("ID", id, n_columns)?;
        }

        let feature_columns: Vec<usize> = (0..n_columns)
            .filter(|&j| j != target_column && Some(j) != id_column)
            .collect();
        if feature_columns.is_empty() {
            return Err(GafsError::Configuration(
                "Dataset has no feature columns left once target and ID columns are excluded"
                    .to_string(),
            ));
        }

        // Keep only complete rows
        let mut X: Vec<Vec<f64>> = Vec::new();
        let mut labels: Vec<String> = Vec::new();
        for row in &rows {
            let label = match &row[target_column] {
                Some(label) => label,
                None => continue,
            };
            if feature_columns.iter().any(|&j| row[j].is_none()) {
                continue;
            }
            let mut values = Vec::with_capacity(feature_columns.len());
            for &j in &feature_columns {
                let cell = row[j].as_deref().unwrap_or_default();
                let value = cell.parse::<f64>().map_err(|_| {
                    GafsError::DataQuality(format!(
                        "Non-numeric value '{}' in feature column '{}'",
                        cell, headers[j]
                    ))
                })?;
                values.push(value);
            }
            X.push(values);
            labels.push(label.clone());
        }

        if X.len() < 2 {
            return Err(GafsError::DataQuality(
                "Not enough valid data rows after cleaning".to_string(),
            ));
        }

        let mut classes: Vec<String> = labels.clone();
        classes.sort();
        classes.dedup();
        let y: Vec<usize> = labels
            .iter()
            .map(|l| classes.binary_search(l).unwrap_or_default())
            .collect();

        let mut rng = ChaCha8Rng::seed_from_u64(param.data.split_seed);
        let (train_idx, test_idx) =
            stratified_split(&y, classes.len(), param.data.test_ratio, &mut rng)?;

        let features: Vec<String> = feature_columns.iter().map(|&j| headers[j].clone()).collect();
        let data = Data {
            X_train: train_idx.iter().map(|&i| X[i].clone()).collect(),
            X_test: test_idx.iter().map(|&i| X[i].clone()).collect(),
            y_train: train_idx.iter().map(|&i| y[i]).collect(),
            y_test: test_idx.iter().map(|&i| y[i]).collect(),
            feature_len: features.len(),
            features,
            classes,
            target: headers[target_column].clone(),
            id_column: id_column.map(|id| headers[id].clone()),
            sample_len,
        };
        info!(
            "Dataset ready: {} features, {} train / {} test samples",
            data.feature_len,
            data.X_train.len(),
            data.X_test.len()
        );

        Ok(data)
    }

    /// Restrict both splits to the given columns, keeping their order
    pub fn select_columns(&self, columns: &[usize]) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
        let restrict = |rows: &Vec<Vec<f64>>| -> Vec<Vec<f64>> {
            rows.iter()
                .map(|row| columns.iter().map(|&j| row[j]).collect())
                .collect()
        };
        (restrict(&self.X_train), restrict(&self.X_test))
    }

    /// Names of the given columns, in the order given
    pub fn feature_names(&self, columns: &[usize]) -> Vec<String> {
        columns.iter().map(|&j| self.features[j].clone()).collect()
    }
}

fn parse_cell(cell: &str) -> Option<String> {
    if MISSING_TOKENS.contains(&cell) {
        None
    } else {
        Some(cell.to_string())
    }
}

fn check_column_index(kind: &str, index: usize, n_columns: usize) -> Result<()> {
    if index >= n_columns {
        return Err(GafsError::Configuration(format!(
            "Invalid {} column index: {}. Dataset has {} columns (0-{})",
            kind,
            index,
            n_columns,
            n_columns as isize - 1
        )));
    }
    Ok(())
}

/// Split sample indices into (train, test) keeping class proportions.
///
/// The test side receives `ceil(test_ratio * n)` samples shared between classes
/// by largest remainder; each class is shuffled before being cut.
pub fn stratified_split(
    y: &[usize],
    n_classes: usize,
    test_ratio: f64,
    rng: &mut ChaCha8Rng,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let n = y.len();
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (i, &class) in y.iter().enumerate() {
        by_class[class].push(i);
    }

    let counts: Vec<usize> = by_class.iter().map(Vec::len).collect();
    if let Some(&least) = counts.iter().min() {
        if least < 2 {
            return Err(GafsError::DataQuality(format!(
                "The least populated class has only {} member, which is too few for a stratified split",
                least
            )));
        }
    }

    let n_test = (test_ratio * n as f64).ceil() as usize;
    let n_train = n - n_test;
    if n_test < n_classes || n_train < n_classes {
        return Err(GafsError::DataQuality(format!(
            "Not enough samples ({}) to split {} classes into train and test sets",
            n, n_classes
        )));
    }

    let test_counts = allocate_by_largest_remainder(&counts, n_test);
    let mut train = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n_test);
    for (mut indices, n_class_test) in by_class.into_iter().zip(test_counts) {
        indices.shuffle(rng);
        let (class_test, class_train) = indices.split_at(n_class_test);
        test.extend_from_slice(class_test);
        train.extend_from_slice(class_train);
    }
    train.sort_unstable();
    test.sort_unstable();

    Ok((train, test))
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Data: {} rows, {} features, target '{}' ({} classes)",
            self.sample_len,
            self.feature_len,
            self.target,
            self.classes.len()
        )?;
        let shown: Vec<&str> = self.features.iter().take(10).map(String::as_str).collect();
        write!(f, "Features: {}", shown.join(", "))?;
        if self.feature_len > 10 {
            write!(f, ", ... ({} more)", self.feature_len - 10)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Data {{ train: {}, test: {}, features: {:?}, classes: {:?} }}",
            self.X_train.len(),
            self.X_test.len(),
            self.features,
            self.classes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl Data {
        /// Two informative features and a constant one, binary target
        pub fn test() -> Data {
            Data {
                X_train: vec![
                    vec![0.1, 1.0, 5.0],
                    vec![0.2, 1.2, 5.0],
                    vec![0.3, 0.9, 5.0],
                    vec![0.9, 3.0, 5.0],
                    vec![1.0, 3.1, 5.0],
                    vec![0.8, 2.9, 5.0],
                ],
                X_test: vec![
                    vec![0.15, 1.1, 5.0],
                    vec![0.95, 3.05, 5.0],
                ],
                y_train: vec![0, 0, 0, 1, 1, 1],
                y_test: vec![0, 1],
                features: vec!["f0".to_string(), "f1".to_string(), "constant".to_string()],
                classes: vec!["no".to_string(), "yes".to_string()],
                target: "label".to_string(),
                id_column: None,
                sample_len: 8,
                feature_len: 3,
            }
        }
    }

    const CSV: &str = "id,a,b,c,label\n\
        1,0.1,1.0,5,no\n\
        2,0.2,1.2,6,no\n\
        3,0.3,0.9,5,no\n\
        4,0.9,3.0,7,yes\n\
        5,1.0,3.1,6,yes\n\
        6,0.8,2.9,5,yes\n\
        7,0.15,1.1,6,no\n\
        8,0.95,3.05,7,yes\n\
        9,0.25,1.05,5,no\n\
        10,0.85,2.95,6,yes\n";

    #[test]
    fn test_from_csv_str_excludes_target_and_id() {
        let data = Data::from_csv_str(CSV, 4, Some(0), &Param::default()).unwrap();
        assert_eq!(data.features, vec!["a", "b", "c"]);
        assert_eq!(data.target, "label");
        assert_eq!(data.id_column.as_deref(), Some("id"));
        assert_eq!(data.classes, vec!["no", "yes"]);
        assert_eq!(data.sample_len, 10);
        assert_eq!(data.feature_len, 3);
    }

    #[test]
    fn test_from_csv_str_split_is_seventy_thirty_and_stratified() {
        let data = Data::from_csv_str(CSV, 4, Some(0), &Param::default()).unwrap();
        assert_eq!(data.X_test.len(), 3, "ceil(0.3 * 10) samples should be held out");
        assert_eq!(data.X_train.len(), 7);
        assert_eq!(data.y_train.len(), 7);
        assert!(data.y_test.contains(&0) && data.y_test.contains(&1), "both classes should be tested");
        assert!(data.y_train.contains(&0) && data.y_train.contains(&1), "both classes should be trained on");
    }

    #[test]
    fn test_from_csv_str_split_is_reproducible() {
        let first = Data::from_csv_str(CSV, 4, Some(0), &Param::default()).unwrap();
        let second = Data::from_csv_str(CSV, 4, Some(0), &Param::default()).unwrap();
        assert_eq!(first.X_train, second.X_train);
        assert_eq!(first.y_test, second.y_test);
    }

    #[test]
    fn test_from_csv_str_without_id_keeps_id_as_feature() {
        let data = Data::from_csv_str(CSV, 4, None, &Param::default()).unwrap();
        assert_eq!(data.features, vec!["id", "a", "b", "c"]);
        assert!(data.id_column.is_none());
    }

    #[test]
    fn test_from_csv_str_invalid_target_index() {
        let err = Data::from_csv_str(CSV, 5, None, &Param::default()).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(
            err.to_string(),
            "Invalid target column index: 5. Dataset has 5 columns (0-4)"
        );
    }

    #[test]
    fn test_from_csv_str_invalid_id_index() {
        let err = Data::from_csv_str(CSV, 4, Some(9), &Param::default()).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().starts_with("Invalid ID column index: 9."));
    }

    #[test]
    fn test_from_csv_str_drops_rows_with_missing_values() {
        let csv = "a,b,label\n1,2,x\n,3,x\n4,NA,y\n5,6,\n7,8,y\n9,10,x\n11,12,y\n";
        let data = Data::from_csv_str(csv, 2, None, &Param::default()).unwrap();
        assert_eq!(data.X_train.len() + data.X_test.len(), 4);
        assert_eq!(data.sample_len, 7, "only fully empty rows are dropped from the row count");
    }

    #[test]
    fn test_from_csv_str_drops_empty_rows_and_columns_before_indexing() {
        // column "empty" disappears, so the label moves to index 2
        let csv = "a,empty,b,label\n1,,2,x\n,,,\n3,,4,y\n5,,6,x\n7,,8,y\n";
        let data = Data::from_csv_str(csv, 2, None, &Param::default()).unwrap();
        assert_eq!(data.features, vec!["a", "b"]);
        assert_eq!(data.target, "label");
        assert_eq!(data.sample_len, 4);
    }

    #[test]
    fn test_from_csv_str_not_enough_rows() {
        let csv = "a,b,label\n1,2,x\n,3,y\n";
        let err = Data::from_csv_str(csv, 2, None, &Param::default()).unwrap_err();
        assert!(err.is_data_quality());
        assert_eq!(err.to_string(), "Not enough valid data rows after cleaning");
    }

    #[test]
    fn test_from_csv_str_non_numeric_feature() {
        let csv = "a,b,label\n1,red,x\n2,blue,y\n3,red,x\n4,blue,y\n";
        let err = Data::from_csv_str(csv, 2, None, &Param::default()).unwrap_err();
        assert!(err.is_data_quality());
        assert!(err.to_string().contains("'b'"));
    }

    #[test]
    fn test_from_csv_str_drops_short_rows() {
        let csv = "a,b,label\n1,2,x\n3,4,y\n5,6\n7,8,x\n9,10,y\n11,12,x\n13,14,y\n";
        let data = Data::from_csv_str(csv, 2, None, &Param::default()).unwrap();
        assert_eq!(data.X_train.len() + data.X_test.len(), 6, "the row without label is dropped");
        assert!(!data.X_train.contains(&vec![5.0, 6.0]));
        assert!(!data.X_test.contains(&vec![5.0, 6.0]));
    }

    #[test]
    fn test_from_csv_str_long_rows_are_csv_errors() {
        let csv = "a,b,label\n1,2,x\n3,4,y,extra\n";
        let err = Data::from_csv_str(csv, 2, None, &Param::default()).unwrap_err();
        assert!(err.to_string().starts_with("Error processing CSV"));
    }

    #[test]
    fn test_stratified_split_rejects_singleton_class() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let err = stratified_split(&[0, 0, 0, 1], 2, 0.3, &mut rng).unwrap_err();
        assert!(err.is_data_quality());
    }

    #[test]
    fn test_stratified_split_covers_every_sample_once() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let y = vec![0, 1, 0, 1, 0, 1, 2, 2, 2, 0];
        let (train, test) = stratified_split(&y, 3, 0.3, &mut rng).unwrap();
        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
        assert_eq!(test.len(), 3);
    }

    #[test]
    fn test_select_columns_preserves_order() {
        let data = Data::test();
        let (train, test) = data.select_columns(&[0, 2]);
        assert_eq!(train[0], vec![0.1, 5.0]);
        assert_eq!(test[1], vec![0.95, 5.0]);
        assert_eq!(data.feature_names(&[0, 2]), vec!["f0", "constant"]);
    }
}
