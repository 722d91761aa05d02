use std::fs;

use anyhow::{Context, Result};
use splice_engine::{
    Command, EditSession, EditorSettings, Event, LinkPolicy, MediaLibrary, TimelineAction,
    load_media_library, load_sequence, load_settings, save_sequence, sequence_to_json,
};
use tracing::{info, warn};

use crate::cli::Args;

pub fn run(args: &Args) -> Result<()> {
    let policy = if args.strict_links {
        LinkPolicy::Strict
    } else {
        LinkPolicy::Prune
    };
    let (sequence, dangling) = load_sequence(&args.sequence, policy)
        .with_context(|| format!("loading sequence {}", args.sequence.display()))?;
    if !dangling.is_empty() {
        warn!(count = dangling.len(), "dropped links to missing clips");
    }

    let settings = match &args.settings {
        Some(path) => load_settings(path)
            .with_context(|| format!("loading settings {}", path.display()))?,
        None => EditorSettings::default(),
    };
    let library = match &args.media {
        Some(path) => load_media_library(path)
            .with_context(|| format!("loading media library {}", path.display()))?,
        None => MediaLibrary::new(),
    };

    let script = fs::read_to_string(&args.script)
        .with_context(|| format!("reading script {}", args.script.display()))?;
    let commands: Vec<Command> = serde_json::from_str(&script)
        .with_context(|| format!("parsing script {}", args.script.display()))?;

    let mut session = EditSession::new(sequence, library, settings, Vec::<TimelineAction>::new());
    for (index, command) in commands.into_iter().enumerate() {
        let events = session
            .handle_command(command.clone())
            .with_context(|| format!("command {index} ({command:?}) failed"))?;
        for event in &events {
            log_event(index, event);
        }
    }

    let (sequence, actions) = session.into_parts();
    info!(
        actions = actions.len(),
        clips = sequence.clip_count(),
        "script finished"
    );

    match &args.output {
        Some(path) => save_sequence(&sequence, path)
            .with_context(|| format!("writing sequence {}", path.display()))?,
        None => println!("{}", sequence_to_json(&sequence)?),
    }
    Ok(())
}

fn log_event(index: usize, event: &Event) {
    match event {
        Event::Refused { gesture } => warn!(index, %gesture, "command had no effect"),
        Event::DanglingLinks { links } => warn!(index, count = links.len(), "links dropped"),
        other => info!(index, event = ?other, "event"),
    }
}
