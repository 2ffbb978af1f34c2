// THEORY:
// The `tracker` module adds "object permanence" to the vision system. It takes
// the stateless detections of a single frame and associates them with the
// identities it has been following from previous frames.
//
// Key architectural principles:
// 1.  **Object Persistence**: a `TrackedObject` represents one object's
//     existence over time, distinct from a `Blob`, which is a snapshot in a
//     single frame. It also carries the object's announcement history.
// 2.  **Tracking Logic**: matching is nearest-centroid within a gate
//     proportional to the frame width, one-to-one per frame. All candidate
//     pairs are ranked by (distance, track ID, detection index) and taken
//     greedily, so ties resolve deterministically toward the older identity.
// 3.  **Lifecycle Management**:
//     - **Birth**: a detection that cannot be matched gets a fresh ID. IDs are
//       allocated in increasing order and never reused within a session.
//     - **Tracking**: a matched identity takes the new centroid and label and
//       its unseen counter resets to zero.
//     - **Loss**: after `grace_frames` unmatched frames the identity is Lost,
//       but stays a candidate for matching.
//     - **Retirement**: after `retirement_frames` further unmatched frames it
//       is Retired and dropped for good.

use crate::config::TrackerSettings;
use crate::core_modules::speech_gate::SpeechState;
use std::collections::HashSet;
use tracing::trace;

/// Lifecycle state of a tracked identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Active,
    Lost,
    Retired,
}

/// Represents an object that is being tracked across multiple frames.
#[derive(Debug, Clone)]
pub struct TrackedObject {
    /// A unique and persistent ID for this tracked object.
    pub id: u64,
    /// Centroid of the most recent matching detection.
    pub centroid: (f64, f64),
    /// Label of the most recent matching detection.
    pub label: String,
    pub state: TrackState,
    /// The number of consecutive frames this object has been matched or coasted.
    pub age: u32,
    /// The number of frames since this object was last seen.
    pub frames_since_seen: u32,
    /// Announcement history, owned by the identity rather than the session.
    pub speech: SpeechState,
}

impl TrackedObject {
    fn new(id: u64, observation: &Observation) -> Self {
        Self {
            id,
            centroid: observation.centroid,
            label: observation.label.clone(),
            state: TrackState::Active,
            age: 1,
            frames_since_seen: 0,
            speech: SpeechState::NeverAnnounced,
        }
    }

    /// Updates the state of a tracked object with new data.
    fn update(&mut self, observation: &Observation) {
        self.centroid = observation.centroid;
        self.label = observation.label.clone();
        self.state = TrackState::Active;
        self.age += 1;
        self.frames_since_seen = 0;
    }

    /// Advances the unseen counter and the lifecycle state.
    fn coast(&mut self, settings: &TrackerSettings) {
        self.age += 1;
        self.frames_since_seen += 1;
        if self.frames_since_seen >= settings.grace_frames + settings.retirement_frames {
            self.state = TrackState::Retired;
        } else if self.frames_since_seen >= settings.grace_frames {
            self.state = TrackState::Lost;
        }
    }

    fn distance_to(&self, point: (f64, f64)) -> f64 {
        ((self.centroid.0 - point.0).powi(2) + (self.centroid.1 - point.1).powi(2)).sqrt()
    }
}

/// What the tracker needs to know about a detection.
#[derive(Debug, Clone)]
pub struct Observation {
    pub centroid: (f64, f64),
    pub label: String,
}

/// The identity given to one detection this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub detection_index: usize,
    pub track_id: u64,
    /// True when the identity was created by this detection.
    pub is_new: bool,
}

/// Result of one tracker step.
#[derive(Debug, Clone, Default)]
pub struct TrackerUpdate {
    /// One entry per observation, in observation order.
    pub assignments: Vec<Assignment>,
    /// Identities retired during this step.
    pub retired: Vec<u64>,
}

/// Manages the list of `TrackedObject`s from one frame to the next.
pub struct Tracker {
    /// Live identities (Active or Lost), in allocation order.
    tracked_objects: Vec<TrackedObject>,
    /// The next ID to hand out; only ever increases within a session.
    next_id: u64,
    settings: TrackerSettings,
}

impl Tracker {
    pub fn new(settings: TrackerSettings) -> Self {
        Self {
            tracked_objects: Vec::new(),
            next_id: 1,
            settings,
        }
    }

    /// Forgets every identity and restarts allocation for a new session.
    pub fn reset(&mut self) {
        self.tracked_objects.clear();
        self.next_id = 1;
    }

    /// Updates the tracker with this frame's observations.
    pub fn update(&mut self, observations: &[Observation], frame_width: u32) -> TrackerUpdate {
        let gate = self.settings.gate_width_fraction * frame_width as f64;

        // --- 1. Matching ---
        let mut candidates: Vec<(f64, u64, usize, usize)> = Vec::new(); // (distance, id, track index, observation index)
        for (t, tracked) in self.tracked_objects.iter().enumerate() {
            for (o, observation) in observations.iter().enumerate() {
                let distance = tracked.distance_to(observation.centroid);
                if distance < gate {
                    candidates.push((distance, tracked.id, t, o));
                }
            }
        }
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then(a.3.cmp(&b.3)));

        let mut matched_tracks: HashSet<usize> = HashSet::new();
        let mut track_for_observation: Vec<Option<usize>> = vec![None; observations.len()];
        for (distance, id, t, o) in candidates {
            if matched_tracks.contains(&t) || track_for_observation[o].is_some() {
                continue;
            }
            trace!(track_id = id, detection = o, distance, "matched");
            matched_tracks.insert(t);
            track_for_observation[o] = Some(t);
        }

        // --- 2. State Updating ---
        for (o, slot) in track_for_observation.iter().enumerate() {
            if let Some(t) = slot {
                self.tracked_objects[*t].update(&observations[o]);
            }
        }

        let mut retired = Vec::new();
        for (t, tracked) in self.tracked_objects.iter_mut().enumerate() {
            if !matched_tracks.contains(&t) {
                tracked.coast(&self.settings);
                if tracked.state == TrackState::Retired {
                    retired.push(tracked.id);
                }
            }
        }

        let mut assignments = Vec::with_capacity(observations.len());
        let mut matched_ids = Vec::with_capacity(observations.len());
        for slot in &track_for_observation {
            matched_ids.push(slot.map(|t| self.tracked_objects[t].id));
        }
        self.tracked_objects.retain(|tracked| tracked.state != TrackState::Retired);

        // --- 3. Birth ---
        for (o, observation) in observations.iter().enumerate() {
            let (track_id, is_new) = match matched_ids[o] {
                Some(id) => (id, false),
                None => {
                    let id = self.next_id;
                    self.next_id += 1;
                    self.tracked_objects.push(TrackedObject::new(id, observation));
                    (id, true)
                }
            };
            assignments.push(Assignment {
                detection_index: o,
                track_id,
                is_new,
            });
        }

        TrackerUpdate { assignments, retired }
    }

    pub fn get(&self, id: u64) -> Option<&TrackedObject> {
        self.tracked_objects.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut TrackedObject> {
        self.tracked_objects.iter_mut().find(|t| t.id == id)
    }

    pub fn get_tracked_objects(&self) -> &[TrackedObject] {
        &self.tracked_objects
    }
}
