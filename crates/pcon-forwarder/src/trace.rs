//! Forwarding-percentage trace.
//!
//! Strategies on every node append rows to one tab-separated table
//! (`results/fwperc.txt` by convention). A single writer thread owns the
//! file and drains a bounded channel; producers never block on file I/O —
//! when the channel is full the row is dropped and counted.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::Context;
use crossbeam_channel::{bounded, Sender};
use pcon_core::name::Name;
use quanta::Instant;
use tracing::debug;

use crate::face::FaceId;

/// Conventional location of the trace table.
pub const DEFAULT_TRACE_PATH: &str = "results/fwperc.txt";

const CHANNEL_CAPACITY: usize = 1024;
const HEADER: &str = "Time\tNode\tPrefix\tFaceId\ttype\tvalue";

/// One row of the trace table.
#[derive(Debug, Clone)]
pub struct TraceRow {
    pub time_s: f64,
    pub node: u32,
    pub prefix: String,
    pub face: FaceId,
    pub kind: &'static str,
    pub value: f64,
}

/// Cloneable producer handle. Dropping the last handle shuts the writer down.
#[derive(Clone)]
pub struct FwTraceHandle {
    tx: Sender<TraceRow>,
    epoch: Instant,
    dropped: Arc<AtomicU64>,
}

impl FwTraceHandle {
    /// Enqueue one row; never blocks.
    pub fn record(
        &self,
        now: Instant,
        node: u32,
        prefix: &Name,
        face: FaceId,
        kind: &'static str,
        value: f64,
    ) {
        let row = TraceRow {
            time_s: now.duration_since(self.epoch).as_secs_f64(),
            node,
            prefix: prefix.to_string(),
            face,
            kind,
            value,
        };
        if self.tx.try_send(row).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Rows lost to a full channel.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Create the trace file, write the header and start the writer thread.
///
/// `epoch` anchors the time column; pass the clock reading at node start.
pub fn spawn(path: impl AsRef<Path>, epoch: Instant) -> anyhow::Result<(FwTraceHandle, JoinHandle<()>)> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating trace directory {}", parent.display()))?;
        }
    }
    let file = File::create(path).with_context(|| format!("creating trace file {}", path.display()))?;
    let mut out = BufWriter::new(file);
    writeln!(out, "{HEADER}").context("writing trace header")?;

    let (tx, rx) = bounded::<TraceRow>(CHANNEL_CAPACITY);
    let join = std::thread::Builder::new()
        .name("fwperc-trace".into())
        .spawn(move || {
            for row in rx.iter() {
                let _ = writeln!(
                    out,
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    row.time_s, row.node, row.prefix, row.face, row.kind, row.value
                );
                if rx.is_empty() {
                    let _ = out.flush();
                }
            }
            let _ = out.flush();
            debug!("trace writer shut down");
        })
        .context("spawning trace writer thread")?;

    Ok((
        FwTraceHandle {
            tx,
            epoch,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        join,
    ))
}
