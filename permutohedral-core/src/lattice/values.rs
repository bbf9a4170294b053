/// Dense row-major storage of one accumulator row per lattice vertex. Row `i` belongs to the vertex with id `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexValues {
    rows: usize,
    width: usize,
    data: Vec<f32>,
}

impl VertexValues {
    /// Creates `rows` zero-initialized rows of `width` values each
    pub fn zeros(rows: usize, width: usize) -> Self {
        Self {
            rows,
            width,
            data: vec![0.0; rows * width],
        }
    }

    /// Number of rows, equal to the number of vertices these values belong to
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of values per row
    pub fn width(&self) -> usize {
        self.width
    }

    /// # Panics
    ///
    /// If `index` is out of bounds
    pub fn row(&self, index: usize) -> &[f32] {
        assert!(index < self.rows);
        &self.data[index * self.width..(index + 1) * self.width]
    }

    /// # Panics
    ///
    /// If `index` is out of bounds
    pub fn row_mut(&mut self, index: usize) -> &mut [f32] {
        assert!(index < self.rows);
        &mut self.data[index * self.width..(index + 1) * self.width]
    }

    /// All rows as one contiguous row-major slice
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Exchanges the contents of two buffers of identical shape
    ///
    /// # Panics
    ///
    /// If the shapes of `self` and `other` differ
    pub fn swap(&mut self, other: &mut VertexValues) {
        assert_eq!(self.rows, other.rows);
        assert_eq!(self.width, other.width);
        std::mem::swap(&mut self.data, &mut other.data);
    }

    pub(crate) fn push_zero_row(&mut self) {
        self.rows += 1;
        self.data.resize(self.rows * self.width, 0.0);
    }
}
