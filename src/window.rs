// sliding window over the ids of one document.
//
// A window holds `2 * context_size + 1` ids when full; the centred id sits at offset
// `context_size`. Every push that fills the window hands the full window to the caller
// before the oldest id is dropped.

use crate::error::Result;

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// start padding pushed, window not yet full
    Filling,
    /// window reached capacity at least once
    Steady,
    /// end of document reached, end markers are flowing in
    Draining,
}

/// How many centred positions the end of a document produces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrainPolicy {
    /// Matches the shard counts of the reference tooling: refilling the window after the
    /// last real token uses up part of the `context_size` draining steps, so the final
    /// real token of a document is never centred.
    #[default]
    Compatible,
    /// Every real token of the document gets centred exactly once.
    Complete,
}

pub struct ContextWindow {
    ids: VecDeque<usize>,
    context_size: usize,
    start_id: usize,
    end_id: usize,
    drain: DrainPolicy,
    phase: Phase,
    pending: usize, // real ids pushed but not centred yet
}

impl ContextWindow {

    pub fn new(context_size: usize, start_id: usize, end_id: usize, drain: DrainPolicy) -> ContextWindow {

        let mut window = Self {
            ids: VecDeque::with_capacity(2 * context_size + 1),
            context_size,
            start_id,
            end_id,
            drain,
            phase: Phase::Filling,
            pending: 0,
        };
        window.reset();
        window
    }

    pub fn capacity(&self) -> usize {
        2 * self.context_size + 1
    }

    pub fn context_size(&self) -> usize {
        self.context_size
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Clears the window and pushes the start-of-document padding.
    pub fn reset(&mut self) {
        self.ids.clear();
        self.ids.extend(std::iter::repeat(self.start_id).take(self.context_size));
        self.phase = Phase::Filling;
        self.pending = 0;
    }

    /// Pushes one real id of the current document.
    pub fn push<F>(&mut self, id: usize, emit: F) -> Result<()>
    where
        F: FnMut(&[usize]) -> Result<()>,
    {
        self.pending += 1;
        self.shift(id, emit)
    }

    /// Drains the current document with end markers, then starts a fresh one.
    pub fn finish_document<F>(&mut self, mut emit: F) -> Result<()>
    where
        F: FnMut(&[usize]) -> Result<()>,
    {
        self.phase = Phase::Draining;
        let capacity = self.capacity();

        match self.drain {
            DrainPolicy::Compatible => {
                // refill pushes count against the `context_size` draining steps
                let mut steps = 0;
                while self.ids.len() < capacity {
                    self.ids.push_back(self.end_id);
                    steps += 1;
                }
                while steps < self.context_size {
                    self.emit_and_advance(&mut emit)?;
                    self.ids.push_back(self.end_id);
                    steps += 1;
                }
            },
            DrainPolicy::Complete => {
                while self.ids.len() < capacity {
                    self.ids.push_back(self.end_id);
                }
                while self.pending > 0 {
                    self.emit_and_advance(&mut emit)?;
                    self.ids.push_back(self.end_id);
                }
            },
        }

        self.reset();
        Ok(())
    }

    fn shift<F>(&mut self, id: usize, mut emit: F) -> Result<()>
    where
        F: FnMut(&[usize]) -> Result<()>,
    {
        self.ids.push_back(id);
        if self.ids.len() == self.capacity() {
            self.phase = Phase::Steady;
            self.emit_and_advance(&mut emit)?;
        }
        Ok(())
    }

    // hands the full window out, then drops the oldest id
    fn emit_and_advance<F>(&mut self, emit: &mut F) -> Result<()>
    where
        F: FnMut(&[usize]) -> Result<()>,
    {
        emit(self.ids.make_contiguous())?;
        self.pending = self.pending.saturating_sub(1);
        self.ids.pop_front();
        Ok(())
    }
}


#[cfg(test)]
mod tests {

    use super::{ContextWindow, DrainPolicy, Phase};

    const S: usize = 100;
    const E: usize = 101;

    // runs documents through a window and collects every emitted window
    fn run(context_size: usize, drain: DrainPolicy, docs: &[&[usize]]) -> Vec<Vec<usize>> {

        let mut window = ContextWindow::new(context_size, S, E, drain);
        let mut emitted: Vec<Vec<usize>> = Vec::new();
        for doc in docs {
            for id in doc.iter() {
                window.push(*id, |w| { emitted.push(w.to_vec()); Ok(()) }).unwrap();
            }
            window.finish_document(|w| { emitted.push(w.to_vec()); Ok(()) }).unwrap();
        }
        emitted
    }

    fn centres(windows: &[Vec<usize>], context_size: usize) -> Vec<usize> {
        windows.iter().map(|w| w[context_size]).collect()
    }

    #[test]
    fn start_padding_test() {

        let window = ContextWindow::new(2, S, E, DrainPolicy::Compatible);
        assert_eq!(window.len(), 2);
        assert_eq!(window.capacity(), 5);
        assert_eq!(window.phase(), Phase::Filling);
    }

    #[test]
    fn steady_windows_are_full_snapshots_test() {

        let emitted = run(1, DrainPolicy::Compatible, &[&[1, 2, 3, 4]]);
        assert_eq!(emitted, vec![
            vec![S, 1, 2],
            vec![1, 2, 3],
            vec![2, 3, 4],
        ]);
    }

    #[test]
    fn compatible_drain_skips_last_token_test() {

        // two tokens with context size one: only the first is centred
        let emitted = run(1, DrainPolicy::Compatible, &[&[1, 2]]);
        assert_eq!(emitted, vec![vec![S, 1, 2]]);

        let emitted = run(2, DrainPolicy::Compatible, &[&[1, 2, 3, 4, 5]]);
        assert_eq!(centres(&emitted, 2), vec![1, 2, 3, 4]);
        assert_eq!(emitted.last().unwrap(), &vec![2, 3, 4, 5, E]);
    }

    #[test]
    fn compatible_short_documents_test() {

        // shorter than the context size: window is refilled with end markers
        let emitted = run(3, DrainPolicy::Compatible, &[&[1, 2]]);
        assert_eq!(emitted, vec![vec![S, S, S, 1, 2, E, E]]);

        let emitted = run(3, DrainPolicy::Compatible, &[&[1]]);
        assert!(emitted.is_empty());

        let emitted = run(3, DrainPolicy::Compatible, &[&[]]);
        assert!(emitted.is_empty());
    }

    #[test]
    fn complete_drain_centres_every_token_test() {

        let emitted = run(1, DrainPolicy::Complete, &[&[1, 2]]);
        assert_eq!(emitted, vec![vec![S, 1, 2], vec![1, 2, E]]);

        let emitted = run(3, DrainPolicy::Complete, &[&[1, 2]]);
        assert_eq!(emitted, vec![
            vec![S, S, S, 1, 2, E, E],
            vec![S, S, 1, 2, E, E, E],
        ]);

        let emitted = run(2, DrainPolicy::Complete, &[&[1, 2, 3, 4, 5]]);
        assert_eq!(centres(&emitted, 2), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn documents_do_not_leak_into_each_other_test() {

        let emitted = run(1, DrainPolicy::Complete, &[&[1, 2], &[3, 4]]);
        assert_eq!(emitted, vec![
            vec![S, 1, 2],
            vec![1, 2, E],
            vec![S, 3, 4],
            vec![3, 4, E],
        ]);
    }

    #[test]
    fn zero_context_size_test() {

        let emitted = run(0, DrainPolicy::Compatible, &[&[1, 2]]);
        assert_eq!(emitted, vec![vec![1], vec![2]]);

        let emitted = run(0, DrainPolicy::Complete, &[&[1, 2]]);
        assert_eq!(emitted, vec![vec![1], vec![2]]);
    }

    #[test]
    fn phase_transitions_test() {

        let mut window = ContextWindow::new(1, S, E, DrainPolicy::Compatible);
        window.push(1, |_| Ok(())).unwrap();
        assert_eq!(window.phase(), Phase::Filling);
        window.push(2, |_| Ok(())).unwrap();
        assert_eq!(window.phase(), Phase::Steady);
        window.finish_document(|_| Ok(())).unwrap();
        assert_eq!(window.phase(), Phase::Filling);
        assert_eq!(window.len(), 1);
    }

}
