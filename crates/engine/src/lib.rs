//! Non-linear timeline editing engine.
//!
//! Edits run as gestures against a [`Sequence`]: each gesture either commits
//! a reversible [`TimelineAction`] or refuses and leaves the sequence as it
//! was. [`EditSession`] wraps the gestures in a command/event API.

pub mod action;
pub mod area;
pub mod clipboard;
pub mod error;
pub mod link;
pub mod media;
pub mod persist;
pub mod selection;
pub mod sequence;
pub mod session;
pub mod settings;
pub mod split;
pub mod time;
pub mod transition;

pub use action::{ActionSink, EditOp, StagedEdit, TimelineAction};
pub use area::{delete_selection, ripple, ripple_length};
pub use clipboard::{Clipboard, ClipboardEntry, copy, paste};
pub use error::{EngineError, Result};
pub use link::DanglingLink;
pub use media::{Media, MediaId, MediaLibrary, MediaRef, MediaStream, StreamKind, import_media};
pub use persist::{
    LinkPolicy, load_media_library, load_sequence, load_settings, save_sequence,
    sequence_to_json,
};
pub use selection::{Selection, clean_up_selections, is_clip_selected, select_all};
pub use sequence::{
    ChannelLayout, Clip, ClipId, Color, Sequence, SequenceSettings, Track, Transition,
    TransitionEdge, TransitionKind,
};
pub use session::{Command, EditSession, Event, ToolMode};
pub use settings::EditorSettings;
pub use split::{split_at_playhead, split_clip_at};
pub use time::{Rational, frame_to_seconds, frame_to_timecode};
pub use transition::add_transition;
