use permutohedral_core::nalgebra::DMatrix;

/// Copies the rows of `features` into one contiguous row-major buffer
pub(crate) fn feature_rows(features: &DMatrix<f32>) -> Vec<f32> {
    features.transpose().as_slice().to_vec()
}

/// Copies the rows of `values` into one contiguous row-major buffer. With `normalize`, every row gets an extra
/// trailing `1.0` that accumulates the filter weight. Returns the buffer and its row width.
pub(crate) fn value_rows(values: &DMatrix<f32>, normalize: bool) -> (Vec<f32>, usize) {
    if !normalize {
        return (feature_rows(values), values.ncols());
    }
    let width = values.ncols() + 1;
    let mut rows = Vec::with_capacity(values.nrows() * width);
    for row in values.row_iter() {
        rows.extend(row.iter().copied());
        rows.push(1.0);
    }
    (rows, width)
}

/// Turns `count` filtered rows of `width` entries back into a matrix. With `normalize`, the trailing weight
/// column is divided out and dropped. Rows without any weight come out as zero.
pub(crate) fn into_output(rows: &[f32], count: usize, width: usize, normalize: bool) -> DMatrix<f32> {
    if !normalize {
        return DMatrix::from_row_slice(count, width, rows);
    }
    let columns = width - 1;
    DMatrix::from_fn(count, columns, |row, column| {
        let weight = rows[row * width + columns];
        if weight == 0.0 {
            0.0
        } else {
            rows[row * width + column] / weight
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_rows_are_row_major() {
        let features = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], feature_rows(&features));
    }

    #[test]
    fn test_value_rows_normalized() {
        let values = DMatrix::from_row_slice(2, 1, &[3.0, 4.0]);
        let (rows, width) = value_rows(&values, true);
        assert_eq!(2, width);
        assert_eq!(vec![3.0, 1.0, 4.0, 1.0], rows);
    }

    #[test]
    fn test_into_output_normalized() {
        let rows = [3.0, 6.0, 2.0, 0.0, 0.0, 0.0];
        let output = into_output(&rows, 2, 3, true);
        assert_eq!(DMatrix::from_row_slice(2, 2, &[1.5, 3.0, 0.0, 0.0]), output);
    }

    #[test]
    fn test_empty() {
        let values = DMatrix::<f32>::zeros(0, 2);
        let (rows, width) = value_rows(&values, true);
        assert!(rows.is_empty());
        assert_eq!(3, width);
        assert_eq!((0, 2), into_output(&rows, 0, width, true).shape());
    }
}
