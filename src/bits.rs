// bit twiddling over flat amplitude indices.
// bit t of an index selects the basis value of qubit t. everything here is
// branch free, allocation free and O(1) unless it takes a slice.
// bit positions must be below usize::BITS, checked in debug builds only.

const WORD_BITS: usize = usize::BITS as usize;

/// `2^p`, for `p < usize::BITS`.
#[inline(always)]
pub const fn pow2(p: usize) -> usize {
    debug_assert!(p < WORD_BITS, "bit position past the index width");
    1 << p
}

#[inline(always)]
pub const fn get_bit(num: usize, i: usize) -> usize {
    debug_assert!(i < WORD_BITS, "bit position past the index width");
    (num >> i) & 1
}

#[inline(always)]
pub const fn flip_bit(num: usize, i: usize) -> usize {
    num ^ pow2(i)
}

/// Treats `num` as an index over a register with qubit `i` removed and
/// re-expands it, with a 0 at bit `i` and every bit at or above `i` shifted up.
#[inline(always)]
pub const fn insert_zero_bit(num: usize, i: usize) -> usize {
    debug_assert!(i < WORD_BITS, "bit position past the index width");
    let upper = (num >> i) << i;
    let lower = num - upper;
    (upper << 1) ^ lower
}

/// Mask with exactly the listed bit positions set.
#[inline]
pub fn get_bit_mask(bits: &[usize]) -> usize {
    bits.iter().fold(0, |mask, &b| mask | pow2(b))
}

#[inline(always)]
pub const fn truncate_bits(num: usize, num_lower_bits: usize) -> usize {
    num & (pow2(num_lower_bits) - 1)
}

#[inline(always)]
pub const fn bits_are_all_one(num: usize, mask: usize) -> bool {
    (num & mask) == mask
}

/// |prefix>|0>|suffix> with the 0 sitting at bit `i`.
#[inline(always)]
pub const fn get_zero_bit_from_affix(prefix: usize, suffix: usize, i: usize) -> usize {
    (prefix << (i + 1)) | suffix
}

/// |prefix>|0>|infix>|0>|suffix> with the zeros at bits `hi` and `lo`.
/// callers sort the two positions, `hi > lo` is required.
#[inline(always)]
pub fn get_zero_bits_from_affixes(
    prefix: usize,
    infix: usize,
    suffix: usize,
    hi: usize,
    lo: usize,
) -> usize {
    debug_assert!(hi > lo, "affix positions must satisfy hi > lo");
    (prefix << (hi + 1)) | (infix << (lo + 1)) | suffix
}

// one run of free (non fixed) bits, copied from the reduced index into
// the full index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    from: usize,
    to: usize,
    width_mask: usize,
}

/// Generalises the two-segment affix reconstruction to any number of fixed
/// bit positions.
///
/// For fixed positions `p_0 < p_1 < .. < p_{k-1}` a reduced index over the
/// remaining `n - k` qubits is cut into `k + 1` segments (suffix, infixes,
/// prefix) and each segment is shifted over the fixed bits it skips. The
/// fixed bits are then forced to 1. This enumerates every index with all
/// fixed bits set, in increasing order, without any insertion loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentedAffix {
    segments: Vec<Segment>,
    fixed_mask: usize,
}

impl SegmentedAffix {
    /// `positions` must already be strictly increasing and below `num_qubits`.
    pub fn new(positions: &[usize], num_qubits: usize) -> Self {
        let mut segments = Vec::with_capacity(positions.len() + 1);
        let mut from = 0;
        let mut lo = 0;
        for &hi in positions.iter().chain(std::iter::once(&num_qubits)) {
            let width = hi - lo;
            if width > 0 {
                segments.push(Segment {
                    from,
                    to: lo,
                    width_mask: pow2(width) - 1,
                });
                from += width;
            }
            lo = hi + 1;
        }
        SegmentedAffix {
            segments,
            fixed_mask: get_bit_mask(positions),
        }
    }

    pub fn fixed_mask(&self) -> usize {
        self.fixed_mask
    }

    #[inline(always)]
    pub fn expand(&self, reduced: usize) -> usize {
        self.segments.iter().fold(self.fixed_mask, |acc, s| {
            acc | (((reduced >> s.from) & s.width_mask) << s.to)
        })
    }
}
