// Copyright (c) 2024 Mike Tsao

use crate::types::{Millis, ParamName};
use serde::{Deserialize, Serialize};

/// One captured parameter write, stamped with its offset from the start of
/// the recording.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RecordedChange {
    /// Offset from the clip's start.
    pub at: Millis,
    /// The parameter that changed.
    pub name: ParamName,
    /// The accepted value.
    pub value: f64,
}

/// A finished recording: an ordered list of offset-stamped parameter changes
/// plus the clip's total length. Serializable, so a host can persist clips
/// alongside preset banks.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AutomationClip {
    /// The captured changes, in chronological order.
    pub changes: Vec<RecordedChange>,
    /// The clip's length. At least the offset of the last change.
    pub length: Millis,
}

#[derive(Debug)]
struct Playback {
    clip: AutomationClip,
    started: Millis,
    cursor: usize,
}

/// Records accepted parameter writes into [AutomationClip]s and plays them
/// back. One recorder per engine; at most one recording and one playback at a
/// time. Playback emits raw (name, value) pairs; the engine pushes them
/// through the store like any other writer, so clamping and last-write-wins
/// still apply.
#[derive(Debug, Default)]
pub struct ParamRecorder {
    recording: Option<(Millis, Vec<RecordedChange>)>,
    playback: Option<Playback>,
}
impl ParamRecorder {
    /// Begins capturing. An in-progress recording is discarded.
    pub fn start_recording(&mut self, now: Millis) {
        self.recording = Some((now, Vec::default()));
    }

    /// Whether a recording is in progress.
    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    /// Captures one accepted write. A no-op unless recording.
    pub fn capture(&mut self, name: &ParamName, value: f64, now: Millis) {
        if let Some((started, changes)) = &mut self.recording {
            changes.push(RecordedChange {
                at: now - *started,
                name: name.clone(),
                value,
            });
        }
    }

    /// Ends the recording and returns the clip, or [None] if nothing was
    /// being recorded.
    pub fn stop_recording(&mut self, now: Millis) -> Option<AutomationClip> {
        let (started, changes) = self.recording.take()?;
        Some(AutomationClip {
            changes,
            length: now - started,
        })
    }

    /// Starts playing a clip from its beginning, replacing any current
    /// playback.
    pub fn play(&mut self, clip: AutomationClip, now: Millis) {
        self.playback = Some(Playback {
            clip,
            started: now,
            cursor: 0,
        });
    }

    /// Stops playback without emitting the remaining changes. Returns false
    /// if nothing was playing.
    pub fn stop_playback(&mut self) -> bool {
        self.playback.take().is_some()
    }

    /// Whether a clip is playing.
    pub fn is_playing(&self) -> bool {
        self.playback.is_some()
    }

    /// The per-tick playback step: emits every change whose offset has
    /// elapsed, in order. Playback ends once the last change is emitted and
    /// the clip's length has passed.
    pub fn advance(&mut self, now: Millis) -> Vec<(ParamName, f64)> {
        let Some(playback) = &mut self.playback else {
            return Vec::default();
        };
        let elapsed = now - playback.started;
        let mut due = Vec::default();
        while playback.cursor < playback.clip.changes.len() {
            let change = &playback.clip.changes[playback.cursor];
            if change.at.0 > elapsed.0 {
                break;
            }
            due.push((change.name.clone(), change.value));
            playback.cursor += 1;
        }
        if playback.cursor == playback.clip.changes.len() && elapsed.0 >= playback.clip.length.0 {
            self.playback = None;
        }
        due
    }
}
