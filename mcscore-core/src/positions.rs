//! Padding-aware position ids.

use candle_core::{DType, Tensor, D};

use crate::error::Result;

/// Derives position ids from a `[rows, seq_len]` padding mask.
///
/// The id at a slot is the number of real tokens at or before it, minus one,
/// floored at zero. Padding therefore never consumes a position: padding
/// between prompt and candidate does not shift the candidate's positions, and
/// leading padding does not produce negative ids.
#[derive(Clone, Copy, Debug, Default)]
pub struct PositionIndexer;

impl PositionIndexer {
    /// Returns a `U32` tensor with the same shape as `padding_mask`.
    pub fn positions(&self, padding_mask: &Tensor) -> Result<Tensor> {
        let real = padding_mask.to_dtype(DType::F32)?.ne(0f32)?.to_dtype(DType::F32)?;
        let counts = real.cumsum(D::Minus1)?;
        Ok((counts - 1.0)?.maximum(0f32)?.to_dtype(DType::U32)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn positions_of(mask: &[u32]) -> Vec<u32> {
        let m = Tensor::from_slice(mask, (1, mask.len()), &Device::Cpu).unwrap();
        PositionIndexer
            .positions(&m)
            .unwrap()
            .squeeze(0)
            .unwrap()
            .to_vec1::<u32>()
            .unwrap()
    }

    #[test]
    fn test_no_padding_is_arange() {
        assert_eq!(positions_of(&[1, 1, 1, 1]), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_leading_padding_floors_at_zero() {
        assert_eq!(positions_of(&[0, 0, 1, 1, 1]), vec![0, 0, 0, 1, 2]);
    }

    #[test]
    fn test_inner_padding_does_not_shift_later_tokens() {
        // prompt [a b c _ _] ++ candidate [d e]
        assert_eq!(positions_of(&[1, 1, 1, 0, 0, 1, 1]), vec![0, 1, 2, 2, 2, 3, 4]);
    }

    #[test]
    fn test_positions_non_decreasing_and_start_at_zero() {
        let masks: [&[u32]; 4] = [
            &[1, 0, 1, 0, 1, 1],
            &[0, 1, 1, 0, 0, 1],
            &[0, 0, 0, 0, 0, 1],
            &[1, 1, 1, 1, 0, 0],
        ];
        for mask in masks {
            let pos = positions_of(mask);
            assert!(pos.windows(2).all(|w| w[0] <= w[1]), "{mask:?} -> {pos:?}");
            let first_real = mask.iter().position(|&m| m == 1).unwrap();
            assert_eq!(pos[first_real], 0);
            let real = mask.iter().filter(|&&m| m == 1).count() as u32;
            assert_eq!(*pos.last().unwrap(), real - 1);
        }
    }

    #[test]
    fn test_batched_rows_are_independent() {
        let m = Tensor::new(&[[1u32, 1, 0], [0, 1, 1]], &Device::Cpu).unwrap();
        let pos = PositionIndexer.positions(&m).unwrap().to_vec2::<u32>().unwrap();
        assert_eq!(pos, vec![vec![0, 1, 1], vec![0, 0, 1]]);
    }
}
