use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::action::{ActionSink, StagedEdit};
use crate::area::delete_selection;
use crate::clipboard::{Clipboard, copy, paste};
use crate::error::{EngineError, Result};
use crate::link::DanglingLink;
use crate::media::{MediaId, MediaLibrary, import_media};
use crate::selection::{Selection, clean_up_selections, select_all};
use crate::sequence::{ClipId, Sequence};
use crate::settings::EditorSettings;
use crate::split::{split_at_playhead, split_clip_at};
use crate::transition::add_transition;

/// Active timeline tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolMode {
    #[default]
    Pointer,
    Edit,
    Ripple,
    Razor,
    Slip,
    Rolling,
    Slide,
}

/// Commands accepted by an [`EditSession`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    /// Places every stream of library media `media` at frame `at`.
    ImportMedia {
        media: MediaId,
        at: i64,
        #[serde(default)]
        track_offset: u16,
    },
    SetPlayhead {
        frame: i64,
    },
    /// Moves the playhead like [`Command::SetPlayhead`], snapping to clip
    /// edges when snapping is enabled.
    Scrub {
        frame: i64,
    },
    GoToStart,
    GoToEnd,
    PreviousCut,
    NextCut,
    /// Replaces the selection set.
    Select {
        selections: Vec<Selection>,
    },
    /// Selects one clip, plus its linked clips unless the edit tool is active
    /// and `edit_tool_selects_links` is off.
    SelectClip {
        clip: ClipId,
    },
    SelectAll,
    Deselect,
    SetTool {
        tool: ToolMode,
    },
    SplitAtPlayhead,
    /// Razor split of one clip at `frame`.
    SplitClip {
        clip: ClipId,
        frame: i64,
        #[serde(default = "default_relink")]
        relink: bool,
    },
    DeleteSelection {
        #[serde(default)]
        ripple: bool,
    },
    Copy,
    Cut,
    Paste,
    AddTransition,
    /// A render consumer started holding `clip`.
    ClipOpened {
        clip: ClipId,
    },
    ClipClosed {
        clip: ClipId,
    },
}

fn default_relink() -> bool {
    true
}

/// Events emitted by an [`EditSession`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Event {
    SequenceChanged { redraw: Vec<ClipId> },
    PlayheadChanged { frame: i64 },
    SelectionChanged { count: usize },
    ClipboardChanged { clips: usize },
    /// Open clips touched by a committed edit.
    ClipsNeedReopen { clips: Vec<ClipId> },
    DanglingLinks { links: Vec<DanglingLink> },
    /// The gesture had nothing to do; nothing changed.
    Refused { gesture: String },
}

/// Editing context: the sequence being edited plus the state the editing
/// gestures read. Committed actions go to `sink`.
#[derive(Debug)]
pub struct EditSession<S> {
    sequence: Sequence,
    selections: Vec<Selection>,
    playhead: i64,
    tool: ToolMode,
    clipboard: Clipboard,
    library: MediaLibrary,
    settings: EditorSettings,
    open_clips: BTreeSet<ClipId>,
    sink: S,
}

impl<S> EditSession<S>
where
    S: ActionSink,
{
    pub fn new(
        sequence: Sequence,
        library: MediaLibrary,
        settings: EditorSettings,
        sink: S,
    ) -> Self {
        Self {
            sequence,
            selections: Vec::new(),
            playhead: 0,
            tool: ToolMode::default(),
            clipboard: Clipboard::default(),
            library,
            settings,
            open_clips: BTreeSet::new(),
            sink,
        }
    }

    /// Applies one command and returns emitted events.
    pub fn handle_command(&mut self, command: Command) -> Result<Vec<Event>> {
        match command {
            Command::ImportMedia {
                media,
                at,
                track_offset,
            } => self.import(media, at, track_offset),
            Command::SetPlayhead { frame } => Ok(self.seek(frame)),
            Command::Scrub { frame } => {
                let snapped = self.snap_to_clip(frame, false);
                Ok(self.seek(snapped))
            }
            Command::GoToStart => Ok(self.seek(0)),
            Command::GoToEnd => Ok(self.seek(self.sequence.end_frame())),
            Command::PreviousCut => Ok(self.seek(self.sequence.previous_cut(self.playhead))),
            Command::NextCut => match self.sequence.next_cut(self.playhead) {
                Some(frame) => Ok(self.seek(frame)),
                None => Ok(Vec::new()),
            },
            Command::Select { selections } => Ok(self.select(selections)),
            Command::SelectClip { clip } => self.select_clip(clip),
            Command::SelectAll => Ok(self.select(select_all(&self.sequence))),
            Command::Deselect => Ok(self.select(Vec::new())),
            Command::SetTool { tool } => {
                debug!(?tool, "tool changed");
                self.tool = tool;
                Ok(Vec::new())
            }
            Command::SplitAtPlayhead => {
                let staged = split_at_playhead(&mut self.sequence, self.playhead, &self.selections);
                Ok(self.apply("Split", staged))
            }
            Command::SplitClip { clip, frame, relink } => {
                if self.sequence.clip(clip).is_none() {
                    return Err(EngineError::ClipNotFound { clip });
                }
                let staged =
                    split_clip_at(&mut self.sequence, clip, frame, relink, &self.selections);
                Ok(self.apply("Split", staged))
            }
            Command::DeleteSelection { ripple } => Ok(self.delete(ripple)),
            Command::Copy => Ok(self.copy()),
            Command::Cut => {
                let mut events = self.copy();
                if !self.selections.is_empty() {
                    events.extend(self.delete(false));
                }
                Ok(events)
            }
            Command::Paste => {
                let staged = paste(
                    &mut self.sequence,
                    &self.clipboard,
                    self.playhead,
                    self.settings.paste_seeks,
                );
                Ok(self.apply("Paste", staged))
            }
            Command::AddTransition => {
                let staged = add_transition(
                    &mut self.sequence,
                    &self.selections,
                    self.settings.default_transition_length,
                );
                Ok(self.apply("Add Transition", staged))
            }
            Command::ClipOpened { clip } => {
                self.open_clips.insert(clip);
                Ok(Vec::new())
            }
            Command::ClipClosed { clip } => {
                self.open_clips.remove(&clip);
                Ok(Vec::new())
            }
        }
    }

    /// Snaps `frame` to the nearest clip edge, or to the playhead when
    /// `playhead_inclusive`, if one lies within `snap_range` frames.
    /// Returns `frame` unchanged when snapping is off or nothing is close.
    pub fn snap_to_clip(&self, frame: i64, playhead_inclusive: bool) -> i64 {
        if !self.settings.snapping {
            return frame;
        }
        let playhead = playhead_inclusive.then_some(self.playhead);
        let edges = self
            .sequence
            .clips()
            .flat_map(|clip| [clip.timeline_in, clip.timeline_out]);

        playhead
            .into_iter()
            .chain(edges)
            .map(|point| ((point - frame).abs(), point))
            .filter(|(distance, _)| *distance <= self.settings.snap_range)
            .min()
            .map_or(frame, |(_, point)| point)
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    pub fn playhead(&self) -> i64 {
        self.playhead
    }

    pub fn tool(&self) -> ToolMode {
        self.tool
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    pub fn library(&self) -> &MediaLibrary {
        &self.library
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Ends the session, returning the edited sequence and the action sink.
    pub fn into_parts(self) -> (Sequence, S) {
        (self.sequence, self.sink)
    }

    fn import(&mut self, media: MediaId, at: i64, track_offset: u16) -> Result<Vec<Event>> {
        let media = self.library.get(media)?;
        let staged = import_media(&mut self.sequence, &media, at, track_offset)?;
        Ok(self.apply("Import", staged))
    }

    fn seek(&mut self, frame: i64) -> Vec<Event> {
        self.playhead = frame.max(0);
        vec![Event::PlayheadChanged {
            frame: self.playhead,
        }]
    }

    fn select(&mut self, mut selections: Vec<Selection>) -> Vec<Event> {
        clean_up_selections(&mut selections);
        self.selections = selections;
        vec![Event::SelectionChanged {
            count: self.selections.len(),
        }]
    }

    fn select_clip(&mut self, id: ClipId) -> Result<Vec<Event>> {
        let clip = self
            .sequence
            .clip(id)
            .ok_or(EngineError::ClipNotFound { clip: id })?;
        let mut selections = vec![Selection::of_clip(clip)];
        if self.tool != ToolMode::Edit || self.settings.edit_tool_selects_links {
            selections.extend(
                clip.linked
                    .iter()
                    .filter_map(|target| self.sequence.clip(*target))
                    .map(Selection::of_clip),
            );
        }
        Ok(self.select(selections))
    }

    fn delete(&mut self, ripple: bool) -> Vec<Event> {
        let had_selection = !self.selections.is_empty();
        let staged = delete_selection(&mut self.sequence, &mut self.selections, ripple);
        let gesture = if ripple { "Ripple Delete" } else { "Delete" };
        let committed = staged.is_some();
        let mut events = self.apply(gesture, staged);
        if committed && had_selection {
            events.push(Event::SelectionChanged { count: 0 });
        }
        events
    }

    fn copy(&mut self) -> Vec<Event> {
        if self.selections.is_empty() {
            return self.refuse("Copy");
        }
        self.clipboard = copy(&self.sequence, &self.selections);
        vec![Event::ClipboardChanged {
            clips: self.clipboard.len(),
        }]
    }

    /// Turns the outcome of one gesture into events, pushing committed
    /// actions to the sink.
    fn apply(&mut self, gesture: &str, staged: Option<StagedEdit>) -> Vec<Event> {
        let Some(staged) = staged else {
            return self.refuse(gesture);
        };

        let mut events = vec![Event::SequenceChanged {
            redraw: staged.redraw.clone(),
        }];
        let reopen: Vec<ClipId> = staged
            .redraw
            .iter()
            .copied()
            .filter(|id| self.open_clips.contains(id))
            .collect();
        if !reopen.is_empty() {
            events.push(Event::ClipsNeedReopen { clips: reopen });
        }
        if !staged.dangling.is_empty() {
            events.push(Event::DanglingLinks {
                links: staged.dangling,
            });
        }
        if let Some(frame) = staged.seek_to {
            events.extend(self.seek(frame));
        }

        info!(
            gesture,
            ops = staged.action.len(),
            clips = self.sequence.clip_count(),
            "gesture committed"
        );
        self.sink.push(staged.action);
        events
    }

    fn refuse(&self, gesture: &str) -> Vec<Event> {
        debug!(gesture, "gesture refused");
        vec![Event::Refused {
            gesture: gesture.to_string(),
        }]
    }
}
