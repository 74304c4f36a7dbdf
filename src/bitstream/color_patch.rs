use crate::bitstream::bits::{BitResult, BitstreamError, write_bits};
use crate::bitstream::sps::locate_color_fields;

const MAX_DEPTH: usize = 16;
/// Bytes of `VisualSampleEntry` fields between the box header and its child boxes.
const VISUAL_SAMPLE_ENTRY_FIELDS: usize = 78;
/// BT.709 primaries, transfer and matrix.
const BT709: u32 = 1;

/// Rewrite the H.264 SPS colour signalling inside an MP4/MOV container to limited-range BT.709.
///
/// Every SPS in every `avcC` record is patched in place: `video_full_range_flag` is cleared and,
/// when a colour description is present, primaries, transfer and matrix are set to 1. Only bits
/// change, never lengths. Containers that cannot be parsed are left alone. Returns whether any
/// byte changed.
#[tracing::instrument(level = "debug", skip_all, fields(bytes = container.len()))]
pub fn patch_avc_color_info(container: &mut [u8]) -> bool {
    let mut records = Vec::new();
    if let Err(err) = collect_avcc(container, 0, container.len(), 0, &mut records) {
        tracing::debug!(%err, "container walk failed; leaving colour info untouched");
        return false;
    }

    let mut changed = false;
    for (start, end) in records {
        match patch_avcc(&mut container[start..end]) {
            Ok(c) => changed |= c,
            Err(err) => tracing::debug!(%err, "skipping unparseable avcC"),
        }
    }
    tracing::debug!(changed, "colour info patch done");
    changed
}

/// Byte ranges of every `avcC` payload reachable through the sample description boxes.
fn collect_avcc(
    buf: &[u8],
    start: usize,
    end: usize,
    depth: usize,
    out: &mut Vec<(usize, usize)>,
) -> BitResult<()> {
    if depth > MAX_DEPTH {
        return Err(BitstreamError::Malformed("boxes nested too deeply"));
    }
    let mut pos = start;
    while pos + 8 <= end {
        let size32 = read_u32(buf, pos)?;
        let kind = &buf[pos + 4..pos + 8];
        let (size, header) = match size32 {
            0 => ((end - pos) as u64, 8usize),
            1 => (read_u64(buf, pos + 8)?, 16usize),
            n => (u64::from(n), 8usize),
        };
        let size = usize::try_from(size).map_err(|_| BitstreamError::Malformed("box too large"))?;
        let box_end = pos
            .checked_add(size)
            .filter(|&e| size >= header && e <= end)
            .ok_or(BitstreamError::Malformed("box size out of bounds"))?;
        let body = pos + header;

        match kind {
            b"moov" | b"trak" | b"mdia" | b"minf" | b"stbl" | b"edts" | b"udta" | b"dinf" => {
                collect_avcc(buf, body, box_end, depth + 1, out)?;
            }
            // Full box header plus entry count.
            b"stsd" => {
                let children = child_start(body, 8, box_end)?;
                collect_avcc(buf, children, box_end, depth + 1, out)?;
            }
            b"avc1" | b"avc3" => {
                let children = child_start(body, VISUAL_SAMPLE_ENTRY_FIELDS, box_end)?;
                collect_avcc(buf, children, box_end, depth + 1, out)?;
            }
            b"avcC" => out.push((body, box_end)),
            _ => {}
        }
        pos = box_end;
    }
    Ok(())
}

/// Offset of the first child box after `skip` bytes of fixed fields.
fn child_start(body: usize, skip: usize, box_end: usize) -> BitResult<usize> {
    body.checked_add(skip)
        .filter(|&at| at <= box_end)
        .ok_or(BitstreamError::Malformed("sample entry shorter than its fixed fields"))
}

fn patch_avcc(record: &mut [u8]) -> BitResult<bool> {
    if record.first() != Some(&1) {
        return Err(BitstreamError::Malformed("unsupported avcC version"));
    }
    let count = usize::from(*record.get(5).ok_or(BitstreamError::Eof)? & 0x1f);
    // Patched into a copy so a bad SPS later in the record leaves earlier ones untouched.
    let mut patched = record.to_vec();
    let mut pos = 6;
    let mut changed = false;
    for _ in 0..count {
        let len = usize::from(u16::from_be_bytes([
            *patched.get(pos).ok_or(BitstreamError::Eof)?,
            *patched.get(pos + 1).ok_or(BitstreamError::Eof)?,
        ]));
        pos += 2;
        let nal = patched.get_mut(pos..pos + len).ok_or(BitstreamError::Eof)?;
        changed |= patch_sps_nal(nal)?;
        pos += len;
    }
    if changed {
        record.copy_from_slice(&patched);
    }
    Ok(changed)
}

/// Patch one SPS NAL unit (header byte included) in place.
pub(crate) fn patch_sps_nal(nal: &mut [u8]) -> BitResult<bool> {
    if nal.len() < 2 || nal[0] & 0x1f != 7 {
        return Err(BitstreamError::Malformed("not an SPS NAL unit"));
    }
    let (mut rbsp, map) = unescape_rbsp(&nal[1..]);
    let fields = locate_color_fields(&rbsp)?;
    let Some(range_at) = fields.video_full_range_flag else {
        return Ok(false);
    };

    let original = rbsp.clone();
    write_bits(&mut rbsp, range_at, 1, 0)?;
    if let Some(positions) = fields.colour_description {
        for at in positions {
            write_bits(&mut rbsp, at, 8, BT709)?;
        }
    }

    let mut changed = false;
    for (i, (&new, &old)) in rbsp.iter().zip(original.iter()).enumerate() {
        if new != old {
            nal[1 + map[i]] = new;
            changed = true;
        }
    }
    Ok(changed)
}

/// Strip emulation-prevention bytes, returning the RBSP and, per RBSP byte, its index in
/// `payload`.
pub(crate) fn unescape_rbsp(payload: &[u8]) -> (Vec<u8>, Vec<usize>) {
    let mut rbsp = Vec::with_capacity(payload.len());
    let mut map = Vec::with_capacity(payload.len());
    let mut zeros = 0usize;
    for (i, &b) in payload.iter().enumerate() {
        if zeros >= 2 && b == 0x03 {
            zeros = 0;
            continue;
        }
        rbsp.push(b);
        map.push(i);
        zeros = if b == 0 { zeros + 1 } else { 0 };
    }
    (rbsp, map)
}

fn read_u32(buf: &[u8], at: usize) -> BitResult<u32> {
    let bytes = buf.get(at..at + 4).ok_or(BitstreamError::Eof)?;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_u64(buf: &[u8], at: usize) -> BitResult<u64> {
    let bytes = buf.get(at..at + 8).ok_or(BitstreamError::Eof)?;
    let mut arr = [0u8; 8];
    arr.copy_from_slice(bytes);
    Ok(u64::from_be_bytes(arr))
}

#[cfg(test)]
#[path = "../../tests/unit/bitstream/color_patch.rs"]
mod tests;
