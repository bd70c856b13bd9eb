/// Chromatic note names, indexed by pitch class.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Semitone intervals of the major scale, indexed by degree 0..6.
pub const MAJOR_SCALE: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Root pitch classes in circle-of-fifths order, starting from C.
pub const CIRCLE_OF_FIFTHS: [i32; 12] = [0, 7, 2, 9, 4, 11, 6, 1, 8, 3, 10, 5];

/// Map a scale degree to a MIDI note number.
///
/// Degrees outside 0..6 wrap through whole octaves, and negative degrees
/// wrap downward: degree -1 is scale index 6 one octave below the base.
/// `min_octave`, when given, raises the result by whole octaves until it
/// clears `min_octave * 12`.
pub fn degree_to_midi(root_pc: i32, degree: i32, base_octave: i32, min_octave: Option<i32>) -> i32 {
    let (oct_offset, norm_degree) = if degree >= 0 {
        (degree / 7, (degree % 7) as usize)
    } else {
        ((degree - 6) / 7, degree.rem_euclid(7) as usize)
    };

    let semitone_offset = MAJOR_SCALE[norm_degree];
    let mut midi = (base_octave + oct_offset) * 12 + root_pc + semitone_offset;

    if let Some(floor) = min_octave {
        let min_midi = floor * 12;
        while midi < min_midi {
            midi += 12;
        }
    }

    midi
}

/// Equal-temperament frequency for a MIDI note number.
pub fn midi_to_freq(midi: i32, tuning_a4: f64) -> f64 {
    tuning_a4 * 2.0_f64.powf((midi - 69) as f64 / 12.0)
}

/// Split a MIDI note number into (pitch class, octave).
/// Handles negative note numbers so the pitch class is always 0..11.
pub fn midi_to_note_info(midi: i32) -> (i32, i32) {
    let mut octave = midi / 12;
    let mut note_index = midi % 12;
    if note_index < 0 {
        note_index += 12;
        octave -= 1;
    }
    (note_index, octave)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_of_fifths_covers_all_pitch_classes() {
        let mut seen = [false; 12];
        for &pc in &CIRCLE_OF_FIFTHS {
            seen[pc as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn circle_of_fifths_steps_by_seven() {
        for window in CIRCLE_OF_FIFTHS.windows(2) {
            assert_eq!((window[0] + 7) % 12, window[1]);
        }
    }

    #[test]
    fn degree_zero_is_root() {
        assert_eq!(degree_to_midi(0, 0, 3, None), 36);
        assert_eq!(degree_to_midi(7, 0, 3, None), 43);
    }

    #[test]
    fn degree_wraps_up_through_octaves() {
        // Degree 7 is the root one octave up.
        assert_eq!(degree_to_midi(0, 7, 3, None), 48);
        // Degree 9 is the third one octave up.
        assert_eq!(degree_to_midi(0, 9, 3, None), 52);
    }

    #[test]
    fn negative_degree_wraps_down() {
        // Degree -1 is scale index 6 (the leading tone) one octave down.
        assert_eq!(degree_to_midi(0, -1, 3, None), 24 + 11);
        // Degree -7 is the root one octave down.
        assert_eq!(degree_to_midi(0, -7, 3, None), 24);
        // Degree -8 is the leading tone two octaves down.
        assert_eq!(degree_to_midi(0, -8, 3, None), 12 + 11);
    }

    #[test]
    fn min_octave_raises_by_whole_octaves() {
        // Root at octave 3 is midi 36; a floor of octave 4 lifts it to 48.
        assert_eq!(degree_to_midi(0, 0, 3, Some(4)), 48);
        // Already above the floor: unchanged.
        assert_eq!(degree_to_midi(0, 0, 5, Some(4)), 60);
    }

    #[test]
    fn a4_is_reference_pitch() {
        assert!((midi_to_freq(69, 440.0) - 440.0).abs() < 1e-9);
        assert!((midi_to_freq(69, 432.0) - 432.0).abs() < 1e-9);
    }

    #[test]
    fn octave_doubles_frequency() {
        let a4 = midi_to_freq(69, 440.0);
        let a5 = midi_to_freq(81, 440.0);
        assert!((a5 - a4 * 2.0).abs() < 1e-6);
    }

    #[test]
    fn note_info_basic() {
        assert_eq!(midi_to_note_info(60), (0, 5));
        assert_eq!(midi_to_note_info(69), (9, 5));
    }

    #[test]
    fn note_info_negative_midi() {
        // -1 is B in the octave below zero.
        assert_eq!(midi_to_note_info(-1), (11, -1));
        assert_eq!(midi_to_note_info(-12), (0, -1));
    }
}
