// THEORY:
// The `SpeechGate` decides, per tracked identity, whether this frame's
// detection deserves to be announced. The decision is a tiny state machine
// that lives on each `TrackedObject`:
//
//   NeverAnnounced --(eligible)--> Announced { label, at_ms }
//   Announced      --(eligible)--> Announced { new label, now }
//
// A detection is eligible iff its similarity reaches the configured minimum
// AND one of: the identity has never been announced, its label changed since
// the last announcement, or the cooldown has elapsed. Cooldown therefore never
// delays the first announcement of a new identity.

/// Announcement history of one tracked identity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SpeechState {
    #[default]
    NeverAnnounced,
    Announced { label: String, at_ms: u64 },
}

/// Thresholds used for one frame's decisions.
#[derive(Debug, Clone, Copy)]
pub struct SpeechPolicy {
    pub min_similarity: f64,
    pub cooldown_ms: u64,
}

pub mod speech_gate {
    use super::*;

    /// Pure eligibility rule; does not change state.
    pub fn is_eligible(state: &SpeechState, label: &str, similarity: f64, policy: &SpeechPolicy, now_ms: u64) -> bool {
        if similarity < policy.min_similarity {
            return false;
        }
        match state {
            SpeechState::NeverAnnounced => true,
            SpeechState::Announced { label: last, at_ms } => {
                last != label || now_ms.saturating_sub(*at_ms) >= policy.cooldown_ms
            }
        }
    }

    /// Applies the rule and records the announcement when it fires.
    pub fn evaluate(state: &mut SpeechState, label: &str, similarity: f64, policy: &SpeechPolicy, now_ms: u64) -> bool {
        let eligible = is_eligible(state, label, similarity, policy, now_ms);
        if eligible {
            *state = SpeechState::Announced {
                label: label.to_string(),
                at_ms: now_ms,
            };
        }
        eligible
    }

    /// Spoken rendering of a detection, with the similarity read out in words:
    /// "red circle, medium, ninety-nine percent".
    pub fn spoken_text(color: &str, shape: &str, size: &str, similarity: f64) -> String {
        let percent = similarity.round().clamp(0.0, 100.0) as u32;
        format!("{color} {shape}, {size}, {} percent", number_words(percent))
    }

    const ONES: [&str; 20] = [
        "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten", "eleven", "twelve",
        "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen", "nineteen",
    ];
    const TENS: [&str; 10] = [
        "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
    ];

    /// English words for 0..=100.
    pub fn number_words(n: u32) -> String {
        match n {
            0..=19 => ONES[n as usize].to_string(),
            20..=99 if n % 10 == 0 => TENS[(n / 10) as usize].to_string(),
            20..=99 => format!("{}-{}", TENS[(n / 10) as usize], ONES[(n % 10) as usize]),
            _ => "one hundred".to_string(),
        }
    }
}
