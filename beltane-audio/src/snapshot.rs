use beltane_types::SequencerState;

/// Post-tick sequencer state cloned once per scheduled cycle and handed
/// to observers over the feedback channel. Observers get their own copy;
/// nothing they do can reach back into the running sequencer.
pub type SequencerSnapshot = SequencerState;
