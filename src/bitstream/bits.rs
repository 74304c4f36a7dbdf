/// Failures while reading H.264 syntax.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BitstreamError {
    #[error("unexpected end of data")]
    Eof,
    #[error("exp-golomb prefix longer than 31 bits")]
    GolombOverflow,
    #[error("malformed container: {0}")]
    Malformed(&'static str),
}

pub(crate) type BitResult<T> = Result<T, BitstreamError>;

/// MSB-first bit reader over an RBSP.
#[derive(Debug, Clone)]
pub(crate) struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current bit offset from the start of the data.
    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn bit(&mut self) -> BitResult<u32> {
        let byte = self.data.get(self.pos / 8).ok_or(BitstreamError::Eof)?;
        let bit = (byte >> (7 - (self.pos % 8))) & 1;
        self.pos += 1;
        Ok(u32::from(bit))
    }

    pub(crate) fn flag(&mut self) -> BitResult<bool> {
        Ok(self.bit()? == 1)
    }

    pub(crate) fn bits(&mut self, n: u32) -> BitResult<u32> {
        debug_assert!(n <= 32);
        let mut v = 0u32;
        for _ in 0..n {
            v = (v << 1) | self.bit()?;
        }
        Ok(v)
    }

    pub(crate) fn skip(&mut self, n: usize) -> BitResult<()> {
        if self.pos + n > self.data.len() * 8 {
            return Err(BitstreamError::Eof);
        }
        self.pos += n;
        Ok(())
    }

    /// Unsigned Exp-Golomb.
    pub(crate) fn ue(&mut self) -> BitResult<u32> {
        let mut zeros = 0u32;
        while self.bit()? == 0 {
            zeros += 1;
            if zeros > 31 {
                return Err(BitstreamError::GolombOverflow);
            }
        }
        if zeros == 0 {
            return Ok(0);
        }
        let suffix = u64::from(self.bits(zeros)?);
        let v = (1u64 << zeros) - 1 + suffix;
        u32::try_from(v).map_err(|_| BitstreamError::GolombOverflow)
    }

    /// Signed Exp-Golomb.
    pub(crate) fn se(&mut self) -> BitResult<i32> {
        let k = i64::from(self.ue()?);
        let v = if k % 2 == 1 { (k + 1) / 2 } else { -(k / 2) };
        Ok(v as i32)
    }
}

/// Overwrite `n` bits at bit offset `pos` with the low bits of `value`, MSB first.
pub(crate) fn write_bits(data: &mut [u8], pos: usize, n: u32, value: u32) -> BitResult<()> {
    if pos + n as usize > data.len() * 8 {
        return Err(BitstreamError::Eof);
    }
    for i in 0..n as usize {
        let bit = (value >> (n as usize - 1 - i)) & 1;
        let at = pos + i;
        let mask = 1u8 << (7 - (at % 8));
        if bit == 1 {
            data[at / 8] |= mask;
        } else {
            data[at / 8] &= !mask;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/bitstream/bits.rs"]
mod tests;
