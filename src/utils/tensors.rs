use burn::tensor::{backend::Backend, Int, Tensor, TensorData};

/// Stack equal-length rows of ids into a `[rows, width]` integer tensor
pub fn stack_rows<B: Backend>(rows: Vec<Vec<u32>>, device: &B::Device) -> Tensor<B, 2, Int> {
    let batch_size = rows.len();
    let width = rows.first().map(Vec::len).unwrap_or(0);

    let values: Vec<i64> = rows
        .into_iter()
        .flat_map(|row| row.into_iter().map(i64::from))
        .collect();

    Tensor::from_data(TensorData::new(values, [batch_size, width]), device)
}

/// Read a 2D integer tensor back into host rows
pub fn to_rows<B: Backend>(tensor: Tensor<B, 2, Int>) -> Vec<Vec<i64>> {
    let [_, width] = tensor.dims();
    let values: Vec<i64> = tensor.into_data().iter::<i64>().collect();

    if width == 0 {
        return Vec::new();
    }

    values.chunks(width).map(|row| row.to_vec()).collect()
}

/// Read any integer tensor back into a flat host vector, in row-major order
pub fn to_flat<B: Backend, const D: usize>(tensor: Tensor<B, D, Int>) -> Vec<i64> {
    tensor.into_data().iter::<i64>().collect()
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_stack_rows() {
        let device = Default::default();
        let rows = vec![vec![101, 7, 102, 0], vec![101, 8, 9, 102]];

        let tensor = stack_rows::<NdArray>(rows, &device);

        assert_eq!(tensor.dims(), [2, 4]);
        assert_eq!(
            to_rows(tensor),
            vec![vec![101, 7, 102, 0], vec![101, 8, 9, 102]]
        );
    }
}
