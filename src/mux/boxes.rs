use crate::foundation::error::{SlidecastError, SlidecastResult};

/// Big-endian ISO-BMFF box writer with nested size back-patching.
#[derive(Debug, Default)]
pub(crate) struct BoxWriter {
    buf: Vec<u8>,
    open: Vec<usize>,
}

impl BoxWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn begin(&mut self, kind: &[u8; 4]) {
        self.open.push(self.buf.len());
        self.buf.extend_from_slice(&[0; 4]);
        self.buf.extend_from_slice(kind);
    }

    pub(crate) fn begin_full(&mut self, kind: &[u8; 4], version: u8, flags: u32) {
        self.begin(kind);
        self.u32((u32::from(version) << 24) | (flags & 0x00ff_ffff));
    }

    pub(crate) fn end(&mut self) -> SlidecastResult<()> {
        let start = self
            .open
            .pop()
            .ok_or_else(|| SlidecastError::encode("box end without a matching begin"))?;
        let size = u32::try_from(self.buf.len() - start)
            .map_err(|_| SlidecastError::encode("box larger than 4 GiB"))?;
        self.buf[start..start + 4].copy_from_slice(&size.to_be_bytes());
        Ok(())
    }

    pub(crate) fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub(crate) fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub(crate) fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub(crate) fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub(crate) fn bytes(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    pub(crate) fn zeros(&mut self, n: usize) {
        self.buf.resize(self.buf.len() + n, 0);
    }

    pub(crate) fn finish(self) -> SlidecastResult<Vec<u8>> {
        if !self.open.is_empty() {
            return Err(SlidecastError::encode("unterminated box"));
        }
        Ok(self.buf)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/mux/boxes.rs"]
mod tests;
