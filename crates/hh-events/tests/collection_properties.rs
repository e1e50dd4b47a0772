use hh_core::{Mask, ObjectMask};
use hh_events::ObjectCollection;
use proptest::prelude::*;

fn rows() -> impl Strategy<Value = Vec<Vec<f64>>> {
    proptest::collection::vec(proptest::collection::vec(-100.0f64..100.0, 0..6), 1..16)
}

fn collection(pt: &[Vec<f64>]) -> ObjectCollection {
    let idx: Vec<Vec<f64>> =
        pt.iter().map(|r| (0..r.len()).map(|i| i as f64).collect()).collect();
    ObjectCollection::from_rows(&[("pt", pt.to_vec()), ("idx", idx)]).unwrap()
}

proptest! {
    #[test]
    fn prop_filter_is_idempotent(pt in rows(), cut in -100.0f64..100.0) {
        let c = collection(&pt);
        let once = c.filter(&c.object_mask("pt", |v| v > cut).unwrap()).unwrap();
        let twice = once.filter(&once.object_mask("pt", |v| v > cut).unwrap()).unwrap();
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once.n_events(), c.n_events());
        prop_assert!(once.field("pt").unwrap().iter().all(|&v| v > cut));
    }

    #[test]
    fn prop_sort_preserves_rows(pt in rows()) {
        let c = collection(&pt);
        let s = c.sort_by_desc("pt").unwrap();
        prop_assert_eq!(s.counts(), c.counts());
        for e in 0..c.n_events() {
            let row = s.row("pt", e).unwrap();
            prop_assert!(row.windows(2).all(|w| w[0] >= w[1]));
            let mut a = row.to_vec();
            let mut b = c.row("pt", e).unwrap().to_vec();
            a.sort_by(f64::total_cmp);
            b.sort_by(f64::total_cmp);
            prop_assert_eq!(a, b);
        }
    }

    #[test]
    fn prop_positional_access_past_end_is_absent(pt in rows(), k in 0usize..8) {
        let c = collection(&pt);
        let at = c.field_at("pt", k).unwrap();
        for (e, v) in at.iter().enumerate() {
            prop_assert_eq!(v.is_some(), pt[e].len() > k);
        }
        let padded = c.pad_none("pt", k + 1).unwrap();
        prop_assert_eq!(padded.slot(k).unwrap(), at);
    }

    #[test]
    fn prop_select_events_keeps_chosen_rows(pt in rows(), seed in any::<u64>()) {
        let c = collection(&pt);
        let keep: Mask = (0..c.n_events()).map(|i| (seed >> (i % 64)) & 1 == 1).collect();
        let s = c.select_events(&keep).unwrap();
        prop_assert_eq!(s.n_events(), keep.count());
        let kept: Vec<usize> = keep.indices();
        for (new, &old) in kept.iter().enumerate() {
            prop_assert_eq!(s.row("pt", new).unwrap(), c.row("pt", old).unwrap());
        }
    }
}

#[test]
fn filter_rejects_mismatched_mask() {
    let c = collection(&[vec![1.0, 2.0], vec![3.0]]);
    let wrong = ObjectMask::new(vec![true, false], vec![0, 2]).unwrap();
    assert!(c.filter(&wrong).is_err());
}
