//! Per-light work distribution. Candidate triangles are grouped by owning
//! face and whole faces are split into contiguous blocks, one worker per
//! block: faces never share texels, so no two workers ever produce writes
//! for the same texel and a bake is reproducible at any thread count.
//!
//! Workers stream texel writes over a channel; the calling thread applies
//! them while waiting, polling the progress callback at a fixed interval so
//! cancellation stays responsive.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::unbounded;
use glim_atlas::Lightmap;
use hashbrown::HashMap;

use crate::error::BakeError;
use crate::light::Light;
use crate::progress::Progress;
use crate::shade::{ShadeScene, TexelWrite, gather_candidates, shade_triangle};

const PROGRESS_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Shades every candidate triangle of one light, sequentially or across
/// worker threads depending on `thread_count`.
pub(crate) fn shade_light(
    scene: &ShadeScene<'_>,
    lightmaps: &mut [Lightmap],
    light: &Light,
    thread_count: usize,
    progress: &mut Progress<'_>,
) -> Result<(), BakeError> {
    let candidates = gather_candidates(scene.ctx, scene.tree, light);
    if candidates.is_empty() {
        return progress.poll();
    }

    if thread_count <= 1 {
        for tri_id in candidates {
            progress.step(1)?;
            shade_triangle(scene, light, tri_id, &mut |w| apply_write(lightmaps, &w));
        }
        return Ok(());
    }

    shade_light_parallel(scene, lightmaps, light, thread_count, candidates, progress)
}

/// Applies one texel write: claims the texel for its face and accumulates
/// the clamped contribution. Single writer by construction.
fn apply_write(lightmaps: &mut [Lightmap], w: &TexelWrite) {
    let lm = &mut lightmaps[w.lightmap as usize];
    debug_assert!(lm.contains(w.x, w.y));
    let texel = lm.texel_mut(w.x, w.y);
    texel.owner = Some(w.face);
    texel.add_clamped(w.rgb);
}

fn shade_light_parallel(
    scene: &ShadeScene<'_>,
    lightmaps: &mut [Lightmap],
    light: &Light,
    thread_count: usize,
    candidates: Vec<u32>,
    progress: &mut Progress<'_>,
) -> Result<(), BakeError> {
    // Group candidates by face, keeping first-seen order.
    let total = candidates.len();
    let mut order: Vec<u32> = Vec::new();
    let mut by_face: HashMap<u32, Vec<u32>> = HashMap::new();
    for tri_id in candidates {
        let face = scene.ctx.triangles[tri_id as usize].face;
        by_face
            .entry(face)
            .or_insert_with(|| {
                order.push(face);
                Vec::new()
            })
            .push(tri_id);
    }
    let face_groups: Vec<Vec<u32>> = order
        .iter()
        .map(|f| by_face.remove(f).unwrap_or_default())
        .collect();

    let workers = thread_count.min(face_groups.len()).max(1);
    let block_size = face_groups.len().div_ceil(workers);

    let cancel = AtomicBool::new(false);
    let running = AtomicUsize::new(0);
    let (tx, rx) = unbounded::<Vec<TexelWrite>>();
    let mut cancelled = false;

    thread::scope(|s| {
        let cancel = &cancel;
        let running = &running;
        for block in face_groups.chunks(block_size) {
            running.fetch_add(1, Ordering::Release);
            let tx = tx.clone();
            s.spawn(move || {
                'faces: for group in block {
                    for &tri_id in group {
                        if cancel.load(Ordering::Relaxed) {
                            break 'faces;
                        }
                        let mut writes = Vec::new();
                        shade_triangle(scene, light, tri_id, &mut |w| writes.push(w));
                        if !writes.is_empty() {
                            let _ = tx.send(writes);
                        }
                    }
                }
                running.fetch_sub(1, Ordering::Release);
            });
        }
        drop(tx);

        let mut last_poll = Instant::now();
        loop {
            while let Ok(batch) = rx.try_recv() {
                if !cancelled {
                    for w in &batch {
                        apply_write(lightmaps, w);
                    }
                }
            }
            if running.load(Ordering::Acquire) == 0 {
                break;
            }
            if !cancelled && last_poll.elapsed() >= PROGRESS_POLL_INTERVAL {
                last_poll = Instant::now();
                if progress.poll().is_err() {
                    cancelled = true;
                    cancel.store(true, Ordering::Release);
                }
            }
            thread::yield_now();
        }
        // Writes that raced the final counter decrement.
        while let Ok(batch) = rx.try_recv() {
            if !cancelled {
                for w in &batch {
                    apply_write(lightmaps, w);
                }
            }
        }
    });

    if cancelled {
        return Err(BakeError::Cancelled);
    }
    // The whole per-light share advances at join time.
    progress.step(total)
}
