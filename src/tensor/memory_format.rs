//! Memory-format classification and propagation
//!
//! A memory format names a physical dimension order. `ChannelsLast` stores a
//! logical `(N, C, H, W)` tensor as `NHWC`; `ChannelsLast3d` stores
//! `(N, C, D, H, W)` as `NDHWC`. Formats are never stored on a tensor: they
//! are recomputed from shape and strides on demand.

use super::{Layout, Strides, Tensor};
use crate::error::{Error, Result};

/// Requested physical layout for an allocation or a copy
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum MemoryFormat {
    /// Row-major
    #[default]
    Contiguous,
    /// `NHWC` order for rank-4 tensors
    ChannelsLast,
    /// `NDHWC` order for rank-5 tensors
    ChannelsLast3d,
    /// Keep the layout suggested by the source tensor's strides
    Preserve,
}

/// Result of classifying a layout against the dense formats
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FormatClass {
    /// Dense row-major, and in no other format
    Contiguous,
    /// Dense `NHWC`, and in no other format
    ChannelsLast,
    /// Dense `NDHWC`, and in no other format
    ChannelsLast3d,
    /// Dense in more than one format (size-1 dims or an empty tensor)
    Ambiguous,
    /// Dense in none of the formats
    Unclassified,
}

const CHANNELS_LAST_ORDER: [usize; 4] = [1, 3, 2, 0];
const CHANNELS_LAST_3D_ORDER: [usize; 5] = [1, 4, 3, 2, 0];

/// Physical order (fastest first) for a channels-last format at `ndim`.
fn channels_last_order(format: MemoryFormat, ndim: usize) -> Option<&'static [usize]> {
    match (format, ndim) {
        (MemoryFormat::ChannelsLast, 4) => Some(&CHANNELS_LAST_ORDER),
        (MemoryFormat::ChannelsLast3d, 5) => Some(&CHANNELS_LAST_3D_ORDER),
        _ => None,
    }
}

/// Dense strides realizing `format` for `shape`.
///
/// Channels-last formats require rank 4 (or 5 for the 3d variant).
/// `Preserve` has no fixed strides and is rejected.
pub fn format_strides(shape: &[usize], format: MemoryFormat) -> Result<Strides> {
    match format {
        MemoryFormat::Contiguous => Ok(Strides::row_major(shape)),
        MemoryFormat::Preserve => Err(Error::invalid_argument(
            "format",
            "Preserve does not describe a fixed layout",
        )),
        MemoryFormat::ChannelsLast | MemoryFormat::ChannelsLast3d => {
            let order = channels_last_order(format, shape.len()).ok_or_else(|| {
                Error::invalid_argument(
                    "format",
                    format!("{format:?} is not defined for rank {}", shape.len()),
                )
            })?;
            let mut strides = Strides::zeros(shape.len());
            let mut expected = 1isize;
            for &d in order {
                strides[d] = expected;
                expected *= shape[d].max(1) as isize;
            }
            Ok(strides)
        }
    }
}

/// Whether strides nest densely in the given physical order (fastest first).
fn is_dense_in_order(shape: &[usize], strides: &[isize], order: &[usize]) -> bool {
    let mut expected = 1isize;
    for &d in order {
        if shape[d] == 1 {
            continue;
        }
        if strides[d] != expected {
            return false;
        }
        expected *= shape[d] as isize;
    }
    true
}

impl Layout {
    /// Whether the layout is dense in `format`.
    ///
    /// Empty layouts satisfy every format. `Preserve` asks about the format
    /// [`suggest_memory_format`](Self::suggest_memory_format) picks.
    pub fn is_contiguous_in(&self, format: MemoryFormat) -> bool {
        if self.is_empty() {
            return true;
        }
        match format {
            MemoryFormat::Contiguous => self.is_contiguous(),
            MemoryFormat::Preserve => self.is_contiguous_in(self.suggest_memory_format()),
            MemoryFormat::ChannelsLast | MemoryFormat::ChannelsLast3d => {
                match channels_last_order(format, self.ndim()) {
                    Some(order) => is_dense_in_order(self.shape(), self.strides(), order),
                    None => false,
                }
            }
        }
    }

    /// Classify the layout against the dense formats
    pub fn classify_format(&self) -> FormatClass {
        if self.is_empty() {
            return FormatClass::Ambiguous;
        }
        let candidates = [
            (MemoryFormat::Contiguous, FormatClass::Contiguous),
            (MemoryFormat::ChannelsLast, FormatClass::ChannelsLast),
            (MemoryFormat::ChannelsLast3d, FormatClass::ChannelsLast3d),
        ];
        let mut matched = candidates
            .iter()
            .filter(|(format, _)| self.is_contiguous_in(*format))
            .map(|&(_, class)| class);
        match (matched.next(), matched.next()) {
            (None, _) => FormatClass::Unclassified,
            (Some(class), None) => class,
            (Some(_), Some(_)) => FormatClass::Ambiguous,
        }
    }

    /// Guess the physical order from stride magnitudes.
    ///
    /// Unlike [`classify_format`](Self::classify_format) this does not require
    /// density: a sliced channels-last tensor still suggests `ChannelsLast`.
    /// Falls back to `Contiguous`.
    pub fn suggest_memory_format(&self) -> MemoryFormat {
        for format in [MemoryFormat::ChannelsLast, MemoryFormat::ChannelsLast3d] {
            if let Some(order) = channels_last_order(format, self.ndim()) {
                if self.strides_follow_order(order) {
                    return format;
                }
            }
        }
        MemoryFormat::Contiguous
    }

    /// Strides grow along `order` (fastest first), skipping over size-1 dims.
    fn strides_follow_order(&self, order: &[usize]) -> bool {
        let (shape, strides) = (self.shape(), self.strides());
        let channel = order[0];
        if strides[channel] == 0 {
            return false;
        }
        let mut min = 0isize;
        for (i, &d) in order.iter().enumerate() {
            if shape[d] == 0 || strides[d] < min {
                return false;
            }
            // N111 and similar layouts where batch and channel strides tie
            // are row-major, not channels-last.
            if i == order.len() - 1 && min == strides[channel] {
                return false;
            }
            min = strides[d];
            if shape[d] > 1 {
                min *= shape[d] as isize;
            }
        }
        true
    }
}

/// Output memory format of an elementwise operation over `operands`.
///
/// Operands whose rank differs from the broadcast output rank carry no layout
/// information. Among the rest, a channels-last format is adopted only if at
/// least one operand is unambiguously in it, no operand is unambiguously
/// contiguous, and no other channels-last format competes. Everything else
/// yields `Contiguous`.
pub fn propagate_format(operands: &[&Tensor]) -> MemoryFormat {
    let layouts: Vec<&Layout> = operands.iter().map(|t| t.layout()).collect();
    propagate_layout_format(&layouts)
}

pub(crate) fn propagate_layout_format(layouts: &[&Layout]) -> MemoryFormat {
    let out_ndim = layouts.iter().map(|l| l.ndim()).max().unwrap_or(0);
    let mut chosen: Option<MemoryFormat> = None;
    for layout in layouts.iter().filter(|l| l.ndim() == out_ndim) {
        let format = match layout.classify_format() {
            FormatClass::Contiguous => return MemoryFormat::Contiguous,
            FormatClass::ChannelsLast => MemoryFormat::ChannelsLast,
            FormatClass::ChannelsLast3d => MemoryFormat::ChannelsLast3d,
            FormatClass::Ambiguous | FormatClass::Unclassified => continue,
        };
        match chosen {
            Some(prev) if prev != format => return MemoryFormat::Contiguous,
            _ => chosen = Some(format),
        }
    }
    match chosen {
        Some(format) if channels_last_order(format, out_ndim).is_some() => format,
        _ => MemoryFormat::Contiguous,
    }
}
