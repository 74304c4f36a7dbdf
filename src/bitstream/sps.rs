use crate::bitstream::bits::{BitReader, BitResult, BitstreamError};

/// Bit offsets (into the SPS RBSP, NAL header excluded) of the VUI colour fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct SpsColorFields {
    pub(crate) video_full_range_flag: Option<usize>,
    /// `colour_primaries`, `transfer_characteristics`, `matrix_coefficients`; 8 bits each.
    pub(crate) colour_description: Option<[usize; 3]>,
}

/// Current colour values, read back for verification.
#[cfg(test)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SpsColorValues {
    pub(crate) full_range: bool,
    pub(crate) description: Option<[u8; 3]>,
}

const HIGH_PROFILES: [u32; 13] = [100, 110, 122, 244, 44, 83, 86, 118, 128, 138, 139, 134, 135];

/// Walk an SPS RBSP up to the VUI video signal type.
pub(crate) fn locate_color_fields(rbsp: &[u8]) -> BitResult<SpsColorFields> {
    let mut r = BitReader::new(rbsp);
    let profile_idc = r.bits(8)?;
    r.skip(16)?; // constraint flags, level_idc
    r.ue()?; // seq_parameter_set_id

    if HIGH_PROFILES.contains(&profile_idc) {
        let chroma_format_idc = r.ue()?;
        if chroma_format_idc == 3 {
            r.skip(1)?;
        }
        r.ue()?; // bit_depth_luma_minus8
        r.ue()?; // bit_depth_chroma_minus8
        r.skip(1)?; // qpprime_y_zero_transform_bypass_flag
        if r.flag()? {
            let lists = if chroma_format_idc == 3 { 12 } else { 8 };
            for i in 0..lists {
                if r.flag()? {
                    skip_scaling_list(&mut r, if i < 6 { 16 } else { 64 })?;
                }
            }
        }
    }

    r.ue()?; // log2_max_frame_num_minus4
    match r.ue()? {
        0 => {
            r.ue()?;
        }
        1 => {
            r.skip(1)?;
            r.se()?;
            r.se()?;
            let cycle = r.ue()?;
            if cycle > 255 {
                return Err(BitstreamError::Malformed("poc cycle too long"));
            }
            for _ in 0..cycle {
                r.se()?;
            }
        }
        _ => {}
    }
    r.ue()?; // max_num_ref_frames
    r.skip(1)?; // gaps_in_frame_num_value_allowed_flag
    r.ue()?; // pic_width_in_mbs_minus1
    r.ue()?; // pic_height_in_map_units_minus1
    if !r.flag()? {
        r.skip(1)?; // mb_adaptive_frame_field_flag
    }
    r.skip(1)?; // direct_8x8_inference_flag
    if r.flag()? {
        for _ in 0..4 {
            r.ue()?;
        }
    }

    let mut fields = SpsColorFields::default();
    if !r.flag()? {
        return Ok(fields);
    }
    if r.flag()? {
        let aspect_ratio_idc = r.bits(8)?;
        if aspect_ratio_idc == 255 {
            r.skip(32)?;
        }
    }
    if r.flag()? {
        r.skip(1)?; // overscan_appropriate_flag
    }
    if !r.flag()? {
        return Ok(fields);
    }
    r.skip(3)?; // video_format
    fields.video_full_range_flag = Some(r.position());
    r.skip(1)?;
    if r.flag()? {
        let at = r.position();
        r.skip(24)?;
        fields.colour_description = Some([at, at + 8, at + 16]);
    }
    Ok(fields)
}

#[cfg(test)]
pub(crate) fn read_color_values(rbsp: &[u8]) -> BitResult<Option<SpsColorValues>> {
    let fields = locate_color_fields(rbsp)?;
    let Some(range_at) = fields.video_full_range_flag else {
        return Ok(None);
    };
    let mut r = BitReader::new(rbsp);
    r.skip(range_at)?;
    let full_range = r.flag()?;
    let description = match fields.colour_description {
        Some([p, _, _]) => {
            let mut r = BitReader::new(rbsp);
            r.skip(p)?;
            Some([r.bits(8)? as u8, r.bits(8)? as u8, r.bits(8)? as u8])
        }
        None => None,
    };
    Ok(Some(SpsColorValues {
        full_range,
        description,
    }))
}

fn skip_scaling_list(r: &mut BitReader<'_>, size: usize) -> BitResult<()> {
    let mut last = 8i32;
    let mut next = 8i32;
    for _ in 0..size {
        if next != 0 {
            let delta = r.se()?;
            next = last.wrapping_add(delta).rem_euclid(256);
        }
        if next != 0 {
            last = next;
        }
    }
    Ok(())
}
