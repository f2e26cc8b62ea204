//! Property test: the registry behaves like a plain set of pairs.

use core_selection::{Controllable, CoreSelection, Stripable};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Track(String);

impl Stripable for Track {
    fn name(&self) -> &str {
        &self.0
    }
}

struct Control(String);

impl Controllable for Control {
    fn name(&self) -> &str {
        &self.0
    }
}

const TRACKS: usize = 4;
const CONTROLS: usize = 3;

/// (track index, optional control index)
type Pair = (usize, Option<usize>);

#[derive(Clone, Debug)]
enum Op {
    Add(Pair),
    Remove(Pair),
    Set(Pair),
    Toggle(Pair),
    Clear,
}

fn pair() -> impl Strategy<Value = Pair> {
    (0..TRACKS, proptest::option::of(0..CONTROLS))
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => pair().prop_map(Op::Add),
        2 => pair().prop_map(Op::Remove),
        1 => pair().prop_map(Op::Set),
        1 => pair().prop_map(Op::Toggle),
        1 => Just(Op::Clear),
    ]
}

struct Fixture {
    tracks: Vec<Arc<dyn Stripable>>,
    /// Control `c` of track `t` lives at `controls[t][c]`.
    controls: Vec<Vec<Arc<dyn Controllable>>>,
}

impl Fixture {
    fn new() -> Self {
        let tracks = (0..TRACKS)
            .map(|t| Arc::new(Track(format!("Track {}", t))) as Arc<dyn Stripable>)
            .collect();
        let controls = (0..TRACKS)
            .map(|t| {
                (0..CONTROLS)
                    .map(|c| {
                        Arc::new(Control(format!("Track {} / {}", t, c))) as Arc<dyn Controllable>
                    })
                    .collect()
            })
            .collect();
        Self { tracks, controls }
    }

    fn resolve(&self, (t, c): Pair) -> (&Arc<dyn Stripable>, Option<&Arc<dyn Controllable>>) {
        (&self.tracks[t], c.map(|c| &self.controls[t][c]))
    }
}

proptest! {
    #[test]
    fn prop_matches_set_model(ops in proptest::collection::vec(op(), 1..40)) {
        let fixture = Fixture::new();
        let selection = CoreSelection::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        selection.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut model: BTreeSet<Pair> = BTreeSet::new();
        let mut expected_notifications = 0;

        for op in ops {
            let changed = match op {
                Op::Add(p) => {
                    let (s, c) = fixture.resolve(p);
                    let changed = selection.add(s, c);
                    let expected = model.insert(p);
                    prop_assert_eq!(changed, expected);
                    changed
                }
                Op::Remove(p) => {
                    let (s, c) = fixture.resolve(p);
                    let changed = selection.remove(s, c);
                    let expected = model.remove(&p);
                    prop_assert_eq!(changed, expected);
                    changed
                }
                Op::Set(p) => {
                    let (s, c) = fixture.resolve(p);
                    let already = model.len() == 1 && model.contains(&p);
                    let changed = selection.set(s, c);
                    prop_assert_eq!(changed, !already);
                    model.clear();
                    model.insert(p);
                    changed
                }
                Op::Toggle(p) => {
                    let (s, c) = fixture.resolve(p);
                    let now = selection.toggle(s, c);
                    if !model.remove(&p) {
                        model.insert(p);
                    }
                    prop_assert_eq!(now, model.contains(&p));
                    true
                }
                Op::Clear => {
                    let changed = selection.clear();
                    prop_assert_eq!(changed, !model.is_empty());
                    model.clear();
                    changed
                }
            };
            if changed {
                expected_notifications += 1;
            }

            prop_assert_eq!(selection.len(), model.len());
            for t in 0..TRACKS {
                prop_assert_eq!(
                    selection.selected_stripable(&fixture.tracks[t]),
                    model.contains(&(t, None))
                );
                for c in 0..CONTROLS {
                    prop_assert_eq!(
                        selection.selected_controllable(&fixture.controls[t][c]),
                        model.contains(&(t, Some(c)))
                    );
                }
            }
        }

        prop_assert_eq!(count.load(Ordering::SeqCst), expected_notifications);
        prop_assert_eq!(selection.enumerate().len(), model.len());
    }
}
