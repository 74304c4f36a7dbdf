use super::*;

fn span(start: f64, end: f64) -> TimeSpan {
    TimeSpan::new(start, end)
}

#[test]
fn tail_clamps_to_total_duration() {
    let out = build_ducking_intervals(
        &[span(1.0, 2.0)],
        2.3,
        DuckingIntervalOpts {
            lead: 0.5,
            tail: 0.5,
            merge_gap: 0.0,
        },
    );
    assert_eq!(out, vec![span(0.5, 2.3)]);
}

#[test]
fn invalid_segments_are_dropped() {
    let out = build_ducking_intervals(
        &[
            span(f64::NAN, 1.0),
            span(2.0, f64::INFINITY),
            span(3.0, 3.0),
            span(5.0, 4.0),
            span(6.0, 7.0),
        ],
        10.0,
        DuckingIntervalOpts::default(),
    );
    assert_eq!(out, vec![span(6.0, 7.0)]);
}

#[test]
fn unbounded_total_keeps_tail() {
    for total in [0.0, -1.0, f64::NAN] {
        let out = build_ducking_intervals(
            &[span(1.0, 2.0)],
            total,
            DuckingIntervalOpts {
                lead: 2.0,
                tail: 1.0,
                merge_gap: 0.0,
            },
        );
        assert_eq!(out, vec![span(0.0, 3.0)]);
    }
}

#[test]
fn merges_within_gap_and_sorts() {
    let out = build_ducking_intervals(
        &[span(5.0, 6.0), span(0.0, 1.0), span(1.5, 2.0), span(2.0, 2.5)],
        100.0,
        DuckingIntervalOpts {
            lead: 0.0,
            tail: 0.0,
            merge_gap: 0.5,
        },
    );
    assert_eq!(out, vec![span(0.0, 2.5), span(5.0, 6.0)]);
}

#[test]
fn bad_options_are_coerced_to_zero() {
    let out = build_ducking_intervals(
        &[span(1.0, 2.0), span(2.0, 3.0), span(3.1, 4.0)],
        10.0,
        DuckingIntervalOpts {
            lead: f64::NAN,
            tail: -4.0,
            merge_gap: f64::NEG_INFINITY,
        },
    );
    // Touching intervals always merge, the 0.1s gap does not.
    assert_eq!(out, vec![span(1.0, 3.0), span(3.1, 4.0)]);
}

#[test]
fn adjacent_outputs_are_separated_by_more_than_gap() {
    let segments: Vec<TimeSpan> = (0..40)
        .map(|i| {
            let s = f64::from((i * 37) % 23) * 0.7;
            span(s, s + 0.2 + f64::from(i % 3) * 0.3)
        })
        .collect();
    let gap = 0.6;
    let out = build_ducking_intervals(
        &segments,
        12.0,
        DuckingIntervalOpts {
            lead: 0.05,
            tail: 0.15,
            merge_gap: gap,
        },
    );
    assert!(!out.is_empty());
    for w in out.windows(2) {
        assert!(w[1].start > w[0].end + gap);
        assert!(w[1].start >= w[0].start);
    }
    for s in &out {
        assert!(s.start >= 0.0 && s.end <= 12.0 && s.end > s.start);
    }
}
