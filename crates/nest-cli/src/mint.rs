use std::{
    io::{self, Write},
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use anyhow::Context;
use nest::{Error, IdGenerator, layout::MAX_BATCH_SIZE};

use crate::config::AppConfig;

/// How many times a minting thread waits out a backwards clock before giving
/// up.
const CLOCK_RETRIES: u32 = 3;

/// Upper bound on IDs held in memory before they are handed to the sink.
const CHUNK_LEN: usize = MAX_BATCH_SIZE as usize;

/// Mints `count` IDs from `ids`, one call per ID or in batches of at most
/// [`MAX_BATCH_SIZE`], and hands them to `emit` in order, at most
/// [`CHUNK_LEN`] at a time. Returns the number of IDs emitted.
///
/// A clock regression is retried after sleeping for the reported magnitude,
/// up to [`CLOCK_RETRIES`] times in a row. Any other generator error, or an
/// error from `emit`, stops minting and is returned.
pub fn mint<G, F>(ids: G, count: u64, batch: bool, mut emit: F) -> anyhow::Result<u64>
where
    G: IdGenerator,
    F: FnMut(&[i64]) -> io::Result<()>,
{
    let mut chunk =
        Vec::with_capacity(usize::try_from(count).map_or(CHUNK_LEN, |n| n.min(CHUNK_LEN)));
    let mut remaining = count;
    let mut retries = 0;

    while remaining > 0 {
        let step = if batch {
            remaining.min(MAX_BATCH_SIZE as u64)
        } else {
            1
        };

        let minted = if batch {
            ids.next_ids(step as i64)
        } else {
            ids.next_id().map(|id| vec![id])
        };

        match minted {
            Ok(minted) => {
                retries = 0;
                remaining -= step;
                chunk.extend(minted);
            }
            Err(Error::ClockMovedBackwards { millis }) if retries < CLOCK_RETRIES => {
                retries += 1;
                tracing::warn!(millis, retries, "clock moved backwards, waiting it out");
                thread::sleep(Duration::from_millis(millis.unsigned_abs()));
            }
            Err(e) => return Err(e.into()),
        }

        if chunk.len() >= CHUNK_LEN {
            emit(&chunk).context("failed to write ids")?;
            chunk.clear();
        }
    }

    if !chunk.is_empty() {
        emit(&chunk).context("failed to write ids")?;
    }

    Ok(count)
}

/// Writes `ids` one per line, holding the lock for the whole chunk so lines
/// from different threads never interleave mid-chunk.
fn write_ids<W: Write>(out: &Mutex<W>, ids: &[i64]) -> io::Result<()> {
    let mut out = out
        .lock()
        .map_err(|_| io::Error::other("output lock poisoned"))?;
    for id in ids {
        writeln!(out, "{id}")?;
    }
    Ok(())
}

/// Splits the configured count across `config.threads` threads that all mint
/// from the same generator and write to `out`. Returns the total minted.
pub fn run<G, W>(generator: &Arc<G>, config: &AppConfig, out: &Mutex<W>) -> anyhow::Result<u64>
where
    G: IdGenerator + Send + Sync,
    W: Write + Send,
{
    thread::scope(|s| {
        let handles: Vec<_> = (0..config.threads)
            .map(|index| {
                let generator = Arc::clone(generator);
                let count = config.share_of(index);
                let batch = config.batch;
                thread::Builder::new()
                    .name(format!("nest-mint-{index}"))
                    .spawn_scoped(s, move || {
                        tracing::debug!(index, count, batch, "minting");
                        mint(&*generator, count, batch, |ids| write_ids(out, ids))
                    })
                    .context("failed to spawn minting thread")
            })
            .collect::<anyhow::Result<_>>()?;

        handles
            .into_iter()
            .enumerate()
            .try_fold(0, |total, (index, handle)| {
                let minted = handle
                    .join()
                    .map_err(|_| anyhow::anyhow!("minting thread {index} panicked"))?
                    .with_context(|| format!("minting thread {index} failed"))?;
                Ok::<_, anyhow::Error>(total + minted)
            })
    })
}
