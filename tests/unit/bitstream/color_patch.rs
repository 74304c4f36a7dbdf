use super::*;
use crate::bitstream::sps::{SpsColorValues, read_color_values};

#[derive(Default)]
struct BitWriter {
    bytes: Vec<u8>,
    bits: usize,
}

impl BitWriter {
    fn put(&mut self, n: u32, v: u32) {
        for i in (0..n).rev() {
            if self.bits % 8 == 0 {
                self.bytes.push(0);
            }
            if (v >> i) & 1 == 1 {
                let last = self.bytes.len() - 1;
                self.bytes[last] |= 1 << (7 - self.bits % 8);
            }
            self.bits += 1;
        }
    }

    fn ue(&mut self, v: u32) {
        let x = v + 1;
        let len = 32 - x.leading_zeros();
        self.put(len - 1, 0);
        self.put(len, x);
    }

    fn finish(mut self) -> Vec<u8> {
        self.put(1, 1);
        while self.bits % 8 != 0 {
            self.put(1, 0);
        }
        self.bytes
    }
}

enum Vui {
    None,
    SignalOnly { full_range: bool },
    Description { full_range: bool, values: [u32; 3] },
}

fn sps_rbsp(sps_id: u32, level: u32, vui: Vui) -> Vec<u8> {
    let mut w = BitWriter::default();
    w.put(8, 100); // high profile
    w.put(8, 0);
    w.put(8, level);
    w.ue(sps_id);
    w.ue(1); // chroma_format_idc
    w.ue(0);
    w.ue(0);
    w.put(1, 0);
    w.put(1, 0); // no scaling matrices
    w.ue(0); // log2_max_frame_num_minus4
    w.ue(0); // poc type 0
    w.ue(2);
    w.ue(1);
    w.put(1, 0);
    w.ue(79);
    w.ue(44);
    w.put(1, 1); // frame_mbs_only
    w.put(1, 1);
    w.put(1, 0); // no cropping
    match vui {
        Vui::None => w.put(1, 0),
        Vui::SignalOnly { full_range } => {
            w.put(1, 1);
            w.put(1, 0);
            w.put(1, 0);
            w.put(1, 1);
            w.put(3, 5);
            w.put(1, u32::from(full_range));
            w.put(1, 0);
            w.put(4, 0); // chroma loc, timing, nal hrd, vcl hrd
        }
        Vui::Description { full_range, values } => {
            w.put(1, 1);
            w.put(1, 1); // aspect ratio info
            w.put(8, 255);
            w.put(16, 1);
            w.put(16, 1);
            w.put(1, 0);
            w.put(1, 1);
            w.put(3, 5);
            w.put(1, u32::from(full_range));
            w.put(1, 1);
            for v in values {
                w.put(8, v);
            }
            w.put(4, 0);
        }
    }
    w.finish()
}

fn escape(rbsp: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut zeros = 0;
    for &b in rbsp {
        if zeros >= 2 && b <= 3 {
            out.push(3);
            zeros = 0;
        }
        out.push(b);
        zeros = if b == 0 { zeros + 1 } else { 0 };
    }
    out
}

fn sps_nal(rbsp: &[u8]) -> Vec<u8> {
    let mut nal = vec![0x67];
    nal.extend(escape(rbsp));
    nal
}

fn container(sps: &[u8]) -> Vec<u8> {
    fn wrap(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = ((body.len() + 8) as u32).to_be_bytes().to_vec();
        out.extend_from_slice(kind);
        out.extend_from_slice(body);
        out
    }
    let pps = [0x68, 0xeb, 0xe3, 0xcb];
    let mut avcc = vec![1, sps[1], sps[2], sps[3], 0xff, 0xe1];
    avcc.extend((sps.len() as u16).to_be_bytes());
    avcc.extend_from_slice(sps);
    avcc.push(1);
    avcc.extend((pps.len() as u16).to_be_bytes());
    avcc.extend_from_slice(&pps);

    let mut avc1 = vec![0u8; 78];
    avc1.extend(wrap(b"avcC", &avcc));
    let mut stsd = vec![0, 0, 0, 0, 0, 0, 0, 1];
    stsd.extend(wrap(b"avc1", &avc1));
    let stbl = wrap(b"stbl", &wrap(b"stsd", &stsd));
    let minf = [wrap(b"dinf", &[]), stbl].concat();
    let mdia = wrap(b"minf", &minf);
    let trak = [wrap(b"edts", &[]), wrap(b"mdia", &mdia)].concat();
    let moov = wrap(b"moov", &wrap(b"trak", &trak));
    [wrap(b"ftyp", b"isom"), wrap(b"mdat", &[0xde, 0xad]), moov].concat()
}

fn sps_in(container: &[u8], template: &[u8]) -> Vec<u8> {
    let at = container
        .windows(template.len().min(4))
        .position(|w| w == &template[..template.len().min(4)])
        .unwrap();
    container[at..at + template.len()].to_vec()
}

fn values(nal: &[u8]) -> Option<SpsColorValues> {
    let (rbsp, _) = unescape_rbsp(&nal[1..]);
    read_color_values(&rbsp).unwrap()
}

#[test]
fn full_range_with_description_becomes_limited_bt709() {
    let sps = sps_nal(&sps_rbsp(
        0,
        31,
        Vui::Description {
            full_range: true,
            values: [6, 6, 6],
        },
    ));
    let mut file = container(&sps);
    let before = file.len();
    assert!(patch_avc_color_info(&mut file));
    assert_eq!(file.len(), before);

    let patched = sps_in(&file, &sps);
    assert_eq!(patched.len(), sps.len());
    assert_eq!(
        values(&patched),
        Some(SpsColorValues {
            full_range: false,
            description: Some([1, 1, 1]),
        })
    );
    // Already limited BT.709: a second pass changes nothing.
    assert!(!patch_avc_color_info(&mut file));
}

#[test]
fn signal_type_without_description_only_clears_the_range_flag() {
    let sps = sps_nal(&sps_rbsp(0, 31, Vui::SignalOnly { full_range: true }));
    let mut file = container(&sps);
    assert!(patch_avc_color_info(&mut file));
    assert_eq!(
        values(&sps_in(&file, &sps)),
        Some(SpsColorValues {
            full_range: false,
            description: None,
        })
    );
}

#[test]
fn streams_without_vui_are_untouched() {
    let sps = sps_nal(&sps_rbsp(0, 31, Vui::None));
    let mut file = container(&sps);
    let original = file.clone();
    assert!(!patch_avc_color_info(&mut file));
    assert_eq!(file, original);
}

#[test]
fn emulation_prevention_bytes_survive_the_patch() {
    // Level 0 followed by a long sps id puts 00 00 02 into the RBSP.
    let rbsp = sps_rbsp(
        63,
        0,
        Vui::Description {
            full_range: true,
            values: [5, 5, 5],
        },
    );
    let sps = sps_nal(&rbsp);
    assert!(sps.len() > rbsp.len() + 1, "test SPS needs an escape byte");

    let mut nal = sps.clone();
    assert!(patch_sps_nal(&mut nal).unwrap());
    assert_eq!(nal.len(), sps.len());
    assert_eq!(nal[..6], sps[..6]);
    assert_eq!(
        values(&nal),
        Some(SpsColorValues {
            full_range: false,
            description: Some([1, 1, 1]),
        })
    );
}

#[test]
fn unescape_maps_rbsp_bytes_to_their_source() {
    let (rbsp, map) = unescape_rbsp(&[0x00, 0x00, 0x03, 0x01, 0x05, 0x00, 0x00, 0x03]);
    assert_eq!(rbsp, vec![0, 0, 1, 5, 0, 0]);
    assert_eq!(map, vec![0, 1, 3, 4, 5, 6]);
}

#[test]
fn garbage_is_left_alone() {
    let mut junk = vec![0xffu8; 64];
    assert!(!patch_avc_color_info(&mut junk));
    assert_eq!(junk, vec![0xff; 64]);

    let mut truncated = container(&sps_nal(&sps_rbsp(0, 31, Vui::SignalOnly { full_range: true })));
    let cut = truncated.len() - 10;
    let mut short = truncated[..cut].to_vec();
    assert!(!patch_avc_color_info(&mut short));
    truncated.truncate(0);
    assert!(!patch_avc_color_info(&mut truncated));
}

#[test]
fn bad_avcc_version_is_skipped() {
    let sps = sps_nal(&sps_rbsp(0, 31, Vui::SignalOnly { full_range: true }));
    let mut file = container(&sps);
    let at = file.windows(4).position(|w| w == b"avcC").unwrap() + 4;
    file[at] = 2;
    let original = file.clone();
    assert!(!patch_avc_color_info(&mut file));
    assert_eq!(file, original);
}

#[test]
fn oversized_largesize_box_is_rejected() {
    let mut file = [0, 0, 0, 8].to_vec();
    file.extend_from_slice(b"free");
    file.extend_from_slice(&1u32.to_be_bytes());
    file.extend_from_slice(b"moov");
    file.extend_from_slice(&u64::MAX.to_be_bytes());
    let original = file.clone();
    assert!(!patch_avc_color_info(&mut file));
    assert_eq!(file, original);
}

#[test]
fn sample_entry_shorter_than_its_fields_is_rejected() {
    let mut file = 12u32.to_be_bytes().to_vec();
    file.extend_from_slice(b"avc1");
    file.extend_from_slice(&[0; 4]);
    let original = file.clone();
    assert!(!patch_avc_color_info(&mut file));
    assert_eq!(file, original);
}

#[test]
fn truncated_sps_inside_valid_avcc_is_left_alone() {
    let full = sps_nal(&sps_rbsp(0, 31, Vui::Description {
        full_range: true,
        values: [5, 6, 6],
    }));
    let truncated = &full[..6];
    let mut file = container(truncated);
    let original = file.clone();
    assert!(!patch_avc_color_info(&mut file));
    assert_eq!(file, original);
}

#[test]
fn overlong_exp_golomb_inside_valid_avcc_is_left_alone() {
    // sps_id with 48 leading zero bits.
    let sps = sps_nal(&[100, 0, 31, 0, 0, 0, 0, 0, 0, 0x80]);
    let mut file = container(&sps);
    let original = file.clone();
    assert!(!patch_avc_color_info(&mut file));
    assert_eq!(file, original);
}
