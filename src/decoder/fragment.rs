// src/decoder/fragment.rs

//! (14) Reassembly of fragmented pictures.

use std::collections::BTreeMap;

use log::debug;

use crate::bitstream::value::Structured;
use crate::decoder::state::State;

/// Collects the slices of a fragmented picture until every slice has arrived.
#[derive(Debug, Default)]
pub struct FragmentAssembler {
    picture_number: Option<u64>,
    slices: BTreeMap<u64, Structured>,
}

/// A fully reassembled picture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPicture {
    pub picture_number: u64,
    /// Every slice of the picture in raster order.
    pub slices: Vec<Structured>,
}

impl AssembledPicture {
    pub fn slice_refs(&self) -> Vec<&Structured> {
        self.slices.iter().collect()
    }
}

impl FragmentAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// True between the first fragment of a picture and its last.
    pub fn in_progress(&self) -> bool {
        self.picture_number.is_some()
    }

    pub fn slices_held(&self) -> usize {
        self.slices.len()
    }

    pub fn reset(&mut self) {
        self.picture_number = None;
        self.slices.clear();
    }

    /// Takes the `fragment_parse` value of a data unit which has just been
    /// read; `state` must reflect that data unit. Returns the picture once
    /// its final fragment has been pushed.
    pub fn push(&mut self, state: &State, fragment_parse: &Structured) -> Option<AssembledPicture> {
        let header = fragment_parse.get_struct("fragment_header")?;
        let count = header.get_u64("fragment_slice_count")?;
        if count == 0 {
            self.reset();
            self.picture_number = Some(state.picture_number);
            debug!(
                "Fragmented picture {} started, {} slices expected",
                state.picture_number, state.fragment_slices_remaining
            );
            return None;
        }

        let data = fragment_parse.get_struct("fragment_data")?;
        let list = data
            .get_list("ld_slices")
            .or_else(|| data.get_list("hq_slices"))?;
        for (i, slice) in list.iter().enumerate() {
            if let Some(slice) = slice.as_struct() {
                self.slices
                    .insert(state.slice_base + i as u64, slice.clone());
            }
        }
        debug!(
            "Fragment of picture {} with {} slices, {} still outstanding",
            state.picture_number, count, state.fragment_slices_remaining
        );

        if state.fragment_slices_remaining > 0 {
            return None;
        }
        let picture_number = self.picture_number.take().unwrap_or(state.picture_number);
        let slices = std::mem::take(&mut self.slices).into_values().collect();
        Some(AssembledPicture {
            picture_number,
            slices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstream::value::Value;

    fn fragment(count: u64, slices: &[u64]) -> Structured {
        let header = Structured::new()
            .with("picture_number", 5u64)
            .with("fragment_slice_count", count);
        let mut parse = Structured::new().with("fragment_header", header);
        if count > 0 {
            let list: Vec<Value> = slices
                .iter()
                .map(|&q| Value::from(Structured::new().with("qindex", q)))
                .collect();
            parse.set("fragment_data", Structured::new().with("hq_slices", list));
        }
        parse
    }

    #[test]
    fn test_reassembles_in_order() {
        let mut state = State::new();
        state.picture_number = 5;
        let mut assembler = FragmentAssembler::new();

        state.fragment_slices_remaining = 3;
        assert_eq!(assembler.push(&state, &fragment(0, &[])), None);
        assert!(assembler.in_progress());

        state.slice_base = 0;
        state.fragment_slices_remaining = 1;
        assert_eq!(assembler.push(&state, &fragment(2, &[10, 11])), None);
        assert_eq!(assembler.slices_held(), 2);

        state.slice_base = 2;
        state.fragment_slices_remaining = 0;
        let picture = assembler.push(&state, &fragment(1, &[12])).unwrap();
        assert_eq!(picture.picture_number, 5);
        let qindices: Vec<_> = picture
            .slices
            .iter()
            .map(|s| s.get_u64("qindex").unwrap())
            .collect();
        assert_eq!(qindices, vec![10, 11, 12]);
        assert!(!assembler.in_progress());
        assert_eq!(assembler.slices_held(), 0);
    }

    #[test]
    fn test_new_picture_discards_partial_one() {
        let mut state = State::new();
        let mut assembler = FragmentAssembler::new();
        state.fragment_slices_remaining = 1;
        assembler.push(&state, &fragment(1, &[1]));
        assert_eq!(assembler.slices_held(), 1);
        assembler.push(&state, &fragment(0, &[]));
        assert_eq!(assembler.slices_held(), 0);
    }
}
