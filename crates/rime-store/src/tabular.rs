//! Delimited I/O at the edges of the engine: token input and the summary and
//! event exports for a manager or a standalone frame.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, Writer, WriterBuilder};
use serde::Serialize;

use rime_core::{Frame, FrameManager, ManagerEvent, Token};

use crate::error::Result;

/// One row of the manager event export. Columns an event kind does not use
/// are left empty.
#[derive(Debug, Serialize, PartialEq)]
struct EventRow<'a> {
    tick: u64,
    event: &'static str,
    from: &'a str,
    to: &'a str,
    new_frame: &'a str,
}

impl<'a> From<&'a ManagerEvent> for EventRow<'a> {
    fn from(event: &'a ManagerEvent) -> Self {
        let (from, to, new_frame) = match event {
            ManagerEvent::FrameCreated { new_frame, .. } => ("", "", new_frame.as_str()),
            ManagerEvent::FrameSwitch { from, to, .. } => {
                (from.as_deref().unwrap_or(""), to.as_str(), "")
            }
            ManagerEvent::FramesMerged {
                from: [first, second],
                new_frame,
                ..
            } => (first.as_str(), second.as_str(), new_frame.as_str()),
            ManagerEvent::FramePruned { frame, .. } => (frame.as_str(), "", ""),
        };
        EventRow {
            tick: event.tick(),
            event: event.kind(),
            from,
            to,
            new_frame,
        }
    }
}

/// Read tokens from a delimited file: first column, no header.
pub fn read_tokens(path: &Path) -> Result<Vec<Token>> {
    read_tokens_from(File::open(path)?)
}

/// Read tokens from any reader. Cells are trimmed and blank records dropped,
/// so indices into the result line up with the manager's input cursor.
pub fn read_tokens_from<R: Read>(reader: R) -> Result<Vec<Token>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut tokens = Vec::new();
    let mut skipped = 0usize;
    for record in rdr.records() {
        let record = record?;
        match record.get(0).map(str::trim) {
            Some(cell) if !cell.is_empty() => tokens.push(cell.to_string()),
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::debug!("skipped {skipped} blank input records");
    }
    Ok(tokens)
}

/// Axioms per frame, a blank line, then outstanding contradictions per frame.
pub fn write_manager_summary<W: Write>(mgr: &FrameManager, out: W) -> Result<()> {
    let mut wtr = flexible_writer(out);
    wtr.write_record(["frame_id", "axiom"])?;
    for frame in mgr.frames.iter() {
        for axiom in &frame.axioms {
            wtr.write_record([frame.id.as_str(), axiom.as_str()])?;
        }
    }

    blank_line(&mut wtr)?;

    wtr.write_record(["frame_id", "tick", "token"])?;
    for frame in mgr.frames.iter() {
        for c in &frame.contradictions {
            wtr.write_record([frame.id.as_str(), c.tick.to_string().as_str(), c.token.as_str()])?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// One row per manager event: `tick,event,from,to,new_frame`.
pub fn write_manager_events<W: Write>(mgr: &FrameManager, out: W) -> Result<()> {
    let mut wtr = Writer::from_writer(out);
    if mgr.event_log.is_empty() {
        wtr.write_record(["tick", "event", "from", "to", "new_frame"])?;
    }
    for event in &mgr.event_log {
        wtr.serialize(EventRow::from(event))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Axioms of one frame, a blank line, then its outstanding contradictions.
pub fn write_frame_summary<W: Write>(frame: &Frame, out: W) -> Result<()> {
    let mut wtr = flexible_writer(out);
    wtr.write_record(["axiom"])?;
    for axiom in &frame.axioms {
        wtr.write_record([axiom.as_str()])?;
    }

    blank_line(&mut wtr)?;

    wtr.write_record(["tick", "token"])?;
    for c in &frame.contradictions {
        wtr.write_record([c.tick.to_string().as_str(), c.token.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

/// One row per evaluation of one frame: `tick,input,accepted,trust`.
pub fn write_frame_events<W: Write>(frame: &Frame, out: W) -> Result<()> {
    let mut wtr = Writer::from_writer(out);
    if frame.events.is_empty() {
        wtr.write_record(["tick", "input", "accepted", "trust"])?;
    }
    for event in &frame.events {
        wtr.serialize(event)?;
    }
    wtr.flush()?;
    Ok(())
}

fn flexible_writer<W: Write>(out: W) -> Writer<W> {
    WriterBuilder::new().flexible(true).from_writer(out)
}

/// A truly empty line; an empty csv record would be written as `""`.
fn blank_line<W: Write>(wtr: &mut Writer<W>) -> Result<()> {
    wtr.flush()?;
    wtr.get_mut().write_all(b"\n")?;
    Ok(())
}
