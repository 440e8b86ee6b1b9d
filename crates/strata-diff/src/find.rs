//! Similarity matching: turns delete/add pairs into renames, finds copies,
//! and breaks heavily edited entries apart.
//!
//! The pass runs in two stages. Rewrite handling walks every modified delta
//! once, scoring it against its own old side and, when asked, splitting it
//! into a delete plus a one-sided add. Matching then repeats rounds of
//! score-and-claim until a round accepts nothing: each round collects source
//! and target candidates from the current statuses, scores every admissible
//! pair, and greedily applies the best matches. Rounds make the pass a
//! fixpoint, so running it a second time changes nothing. Content loads all
//! go through a per-pass cache, so a file is read at most once no matter how
//! many rounds run.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use strata_source::SourceKind;
use strata_types::{ContentId, FileEntry};

use crate::delta::{Delta, DeltaStatus};
use crate::error::DiffResult;
use crate::list::{compare_paths, DiffList, DiffSide};
use crate::options::{FindFlags, FindOptions};
use crate::signature::{similarity_score, WhitespaceMode};

pub(crate) fn run(list: &mut DiffList, find_options: &FindOptions) -> DiffResult<()> {
    let opts = find_options.normalized()?;
    let whitespace = whitespace_mode(opts.flags);
    let new_side_kind = list.new_side_kind();

    // The pass works on a copy, so failing partway leaves the list as it was.
    let mut slots: Vec<Slot> = list.deltas().iter().cloned().map(Slot::plain).collect();
    let mut cache = ContentCache::default();

    if opts.flags.contains(FindFlags::REWRITES) {
        process_rewrites(list, &mut cache, &mut slots, &opts, whitespace, new_side_kind)?;
    }

    // The limit downgrade is decided once, from the starting pool sizes; the
    // budget bounds source-target pairings, not either pool alone.
    let (sources, targets) = collect_pools(&slots, &opts);
    let exact_only = opts.flags.contains(FindFlags::EXACT_MATCH_ONLY)
        || sources.len().saturating_mul(targets.len())
            > opts.rename_limit.saturating_mul(opts.rename_limit);

    let mut rounds = 0usize;
    while match_round(
        list,
        &mut cache,
        &mut slots,
        &opts,
        whitespace,
        new_side_kind,
        exact_only,
    )? {
        rounds += 1;
    }

    let mut deltas: Vec<Delta> = slots
        .into_iter()
        .filter(|slot| !slot.removed)
        .map(|slot| slot.delta)
        .collect();
    let case_sensitive = list.options().case_sensitive;
    deltas.sort_by(|a, b| compare_paths(a.sort_path(), b.sort_path(), case_sensitive));

    debug!(deltas = deltas.len(), rounds, "similarity pass finished");
    list.replace_deltas(deltas);
    Ok(())
}

fn whitespace_mode(flags: FindFlags) -> WhitespaceMode {
    if flags.contains(FindFlags::IGNORE_WHITESPACE) {
        WhitespaceMode::IgnoreAll
    } else if flags.contains(FindFlags::DONT_IGNORE_WHITESPACE) {
        WhitespaceMode::Raw
    } else {
        WhitespaceMode::Smart
    }
}

/// Status a pair's new side falls back to when it loses its old side.
fn one_sided_new_status(kind: SourceKind) -> DeltaStatus {
    match kind {
        SourceKind::Workdir => DeltaStatus::Untracked,
        SourceKind::Tree | SourceKind::Index => DeltaStatus::Added,
    }
}

struct Slot {
    delta: Delta,
    /// Set on both halves of a split pair; points at the other half.
    split_partner: Option<usize>,
    /// Self-similarity recorded when the rewrite stage scored this entry.
    self_similarity: Option<u16>,
    removed: bool,
}

impl Slot {
    fn plain(delta: Delta) -> Self {
        Self {
            delta,
            split_partner: None,
            self_similarity: None,
            removed: false,
        }
    }
}

/// Bytes read while one pass runs, keyed by side and path. Scoring reads all
/// go through here, so no file is read more than once per pass.
#[derive(Default)]
struct ContentCache {
    loaded: HashMap<(DiffSide, String), Option<Arc<Vec<u8>>>>,
}

impl ContentCache {
    fn load(
        &mut self,
        list: &DiffList,
        side: DiffSide,
        entry: &FileEntry,
    ) -> DiffResult<Option<Arc<Vec<u8>>>> {
        let key = (side, entry.path.clone());
        if let Some(content) = self.loaded.get(&key) {
            return Ok(content.clone());
        }
        let content = list.content(side, entry)?.map(Arc::new);
        self.loaded.insert(key, content.clone());
        Ok(content)
    }
}

/// Score every modified blob pair against itself. Entries below the break
/// threshold are split in place; survivors keep the score as their recorded
/// similarity.
fn process_rewrites(
    list: &DiffList,
    cache: &mut ContentCache,
    slots: &mut Vec<Slot>,
    opts: &FindOptions,
    whitespace: WhitespaceMode,
    new_side_kind: SourceKind,
) -> DiffResult<()> {
    let break_rewrites = opts.flags.contains(FindFlags::BREAK_REWRITES);

    for index in 0..slots.len() {
        if slots[index].delta.status != DeltaStatus::Modified {
            continue;
        }
        if !blob_old(&slots[index]) || !blob_new(&slots[index]) {
            continue;
        }
        let Some(score) = self_similarity(list, cache, slots, index, whitespace)? else {
            continue;
        };
        slots[index].self_similarity = Some(score);

        if break_rewrites && score < opts.break_rewrite_threshold {
            let old = slots[index].delta.old.take();
            let new = slots[index].delta.new.take();
            let partner = slots.len();
            let slot = &mut slots[index];
            slot.delta = Delta::new(DeltaStatus::Deleted, old, None);
            slot.split_partner = Some(partner);
            slots.push(Slot {
                delta: Delta::new(one_sided_new_status(new_side_kind), None, new),
                split_partner: Some(index),
                self_similarity: Some(score),
                removed: false,
            });
        } else {
            slots[index].delta.similarity = Some(score);
        }
    }
    Ok(())
}

/// Score a modified pair against its own old side. `None` when either side
/// cannot be read.
fn self_similarity(
    list: &DiffList,
    cache: &mut ContentCache,
    slots: &mut [Slot],
    slot: usize,
    whitespace: WhitespaceMode,
) -> DiffResult<Option<u16>> {
    if ids_equal(&slots[slot]) {
        // Mode-only change.
        return Ok(Some(100));
    }
    let old = side_content(list, cache, slots, slot, DiffSide::Old)?;
    let new = side_content(list, cache, slots, slot, DiffSide::New)?;
    Ok(match (old, new) {
        (Some(a), Some(b)) => Some(similarity_score(&a, &b, whitespace)),
        _ => None,
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum SourceRole {
    /// Old side of a deleted entry; claimed matches become renames.
    Deleted,
    /// Old side of a modified entry; stolen for a rename or reused as a
    /// copy origin, depending on the flags.
    Modified,
    /// Old side of an unmodified entry; copy origin only.
    Unmodified,
    /// Old side of an already-matched rename or copy; copy origin only.
    Retained,
}

struct SourceCand {
    slot: usize,
    role: SourceRole,
}

struct Candidate {
    score: u16,
    rejoin: bool,
    /// The source is a rewrite whose old side may be claimed outright.
    steals: bool,
    path_distance: usize,
    target_index: usize,
    source_index: usize,
}

enum Action {
    Rejoin,
    Rename,
    Steal,
    Copy,
}

/// Candidate sources and targets under the current statuses and flags.
fn collect_pools(slots: &[Slot], opts: &FindOptions) -> (Vec<SourceCand>, Vec<usize>) {
    let copies = opts.flags.contains(FindFlags::COPIES);
    let copies_from_unmodified = opts.flags.contains(FindFlags::COPIES_FROM_UNMODIFIED);
    let renames_from_rewrites = opts.flags.contains(FindFlags::RENAMES_FROM_REWRITES);

    let mut sources: Vec<SourceCand> = Vec::new();
    let mut targets: Vec<usize> = Vec::new();
    for (index, slot) in slots.iter().enumerate() {
        if slot.removed {
            continue;
        }
        match slot.delta.status {
            DeltaStatus::Deleted => {
                if blob_old(slot) {
                    sources.push(SourceCand {
                        slot: index,
                        role: SourceRole::Deleted,
                    });
                }
            }
            DeltaStatus::Modified => {
                if (copies || renames_from_rewrites) && blob_old(slot) && !ids_equal(slot) {
                    sources.push(SourceCand {
                        slot: index,
                        role: SourceRole::Modified,
                    });
                }
            }
            DeltaStatus::Unmodified => {
                if copies_from_unmodified && blob_old(slot) {
                    sources.push(SourceCand {
                        slot: index,
                        role: SourceRole::Unmodified,
                    });
                }
            }
            DeltaStatus::Renamed | DeltaStatus::Copied => {
                if copies && blob_old(slot) {
                    sources.push(SourceCand {
                        slot: index,
                        role: SourceRole::Retained,
                    });
                }
            }
            _ => {}
        }
        if matches!(
            slot.delta.status,
            DeltaStatus::Added | DeltaStatus::Untracked
        ) && blob_new(slot)
        {
            targets.push(index);
        }
    }
    (sources, targets)
}

fn match_round(
    list: &DiffList,
    cache: &mut ContentCache,
    slots: &mut Vec<Slot>,
    opts: &FindOptions,
    whitespace: WhitespaceMode,
    new_side_kind: SourceKind,
    exact_only: bool,
) -> DiffResult<bool> {
    let (sources, targets) = collect_pools(slots, opts);
    if sources.is_empty() || targets.is_empty() {
        return Ok(false);
    }

    let mut candidates: Vec<Candidate> = Vec::new();
    for (target_index, &target_slot) in targets.iter().enumerate() {
        for (source_index, source) in sources.iter().enumerate() {
            if source.slot == target_slot {
                continue;
            }
            let rejoin = slots[source.slot].split_partner == Some(target_slot);
            let score = if rejoin {
                match slots[source.slot].self_similarity {
                    Some(score) => score,
                    None => continue,
                }
            } else {
                let scored = pair_score(
                    list,
                    cache,
                    slots,
                    source.slot,
                    target_slot,
                    whitespace,
                    exact_only,
                )?;
                match scored {
                    Some(score) => score,
                    None => continue,
                }
            };
            let steals = !rejoin
                && source.role == SourceRole::Modified
                && steals_old_side(list, cache, slots, source.slot, opts, whitespace, exact_only)?;

            if score < candidate_threshold(source.role, rejoin, steals, opts) {
                continue;
            }
            let (Some(source_entry), Some(target_entry)) = (
                slots[source.slot].delta.old.as_ref(),
                slots[target_slot].delta.new.as_ref(),
            ) else {
                continue;
            };
            candidates.push(Candidate {
                score,
                rejoin,
                steals,
                path_distance: path_distance(&source_entry.path, &target_entry.path),
                target_index,
                source_index,
            });
        }
    }

    // Best matches first; a rejoin outranks an equal-scored competitor, then
    // the closer path wins.
    candidates.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.rejoin.cmp(&a.rejoin))
            .then_with(|| a.path_distance.cmp(&b.path_distance))
            .then_with(|| a.target_index.cmp(&b.target_index))
            .then_with(|| a.source_index.cmp(&b.source_index))
    });

    let mut consumed_sources = vec![false; sources.len()];
    let mut consumed_targets = vec![false; targets.len()];
    let mut changed = false;

    for cand in &candidates {
        if consumed_targets[cand.target_index] || consumed_sources[cand.source_index] {
            continue;
        }
        let source = &sources[cand.source_index];
        let source_slot = source.slot;
        let target_slot = targets[cand.target_index];

        let Some(action) = action_for(source.role, cand.rejoin, cand.score, cand.steals, opts)
        else {
            continue;
        };

        match action {
            Action::Rejoin => {
                let new_entry = slots[target_slot].delta.new.clone();
                let self_similarity = slots[source_slot].self_similarity;
                let slot = &mut slots[source_slot];
                slot.delta.status = DeltaStatus::Modified;
                slot.delta.new = new_entry;
                slot.delta.similarity = self_similarity;
                slot.split_partner = None;
                slots[target_slot].removed = true;
                slots[target_slot].split_partner = None;
                consumed_sources[cand.source_index] = true;
            }
            Action::Rename => {
                let old_entry = slots[source_slot].delta.old.clone();
                let target = &mut slots[target_slot];
                target.delta.status = DeltaStatus::Renamed;
                target.delta.old = old_entry;
                target.delta.similarity = Some(cand.score);
                target.split_partner = None;
                slots[source_slot].removed = true;
                consumed_sources[cand.source_index] = true;
            }
            Action::Steal => {
                let old_entry = slots[source_slot].delta.old.take();
                let leftover = slots[source_slot].delta.new.clone();
                let target = &mut slots[target_slot];
                target.delta.status = DeltaStatus::Renamed;
                target.delta.old = old_entry;
                target.delta.similarity = Some(cand.score);
                target.split_partner = None;
                // What is left of the rewrite is a plain one-sided add; it
                // re-enters the pool next round.
                let slot = &mut slots[source_slot];
                slot.delta = Delta::new(one_sided_new_status(new_side_kind), None, leftover);
                slot.split_partner = None;
                slot.self_similarity = None;
                consumed_sources[cand.source_index] = true;
            }
            Action::Copy => {
                let old_entry = slots[source_slot].delta.old.clone();
                let target = &mut slots[target_slot];
                target.delta.status = DeltaStatus::Copied;
                target.delta.old = old_entry;
                target.delta.similarity = Some(cand.score);
                target.split_partner = None;
                // Copy origins are never consumed.
            }
        }
        consumed_targets[cand.target_index] = true;
        changed = true;
    }

    Ok(changed)
}

fn candidate_threshold(role: SourceRole, rejoin: bool, steals: bool, opts: &FindOptions) -> u16 {
    if rejoin {
        return opts.rename_threshold;
    }
    match role {
        SourceRole::Deleted => opts.rename_threshold,
        SourceRole::Modified => {
            let mut threshold = u16::MAX;
            if steals {
                threshold = threshold.min(opts.rename_threshold);
            }
            if opts.flags.contains(FindFlags::COPIES) {
                threshold = threshold.min(opts.copy_threshold);
            }
            threshold
        }
        SourceRole::Unmodified | SourceRole::Retained => opts.copy_threshold,
    }
}

fn action_for(
    role: SourceRole,
    rejoin: bool,
    score: u16,
    steals: bool,
    opts: &FindOptions,
) -> Option<Action> {
    if rejoin {
        return Some(Action::Rejoin);
    }
    match role {
        SourceRole::Deleted => Some(Action::Rename),
        SourceRole::Modified => {
            if steals && score >= opts.rename_threshold {
                Some(Action::Steal)
            } else if opts.flags.contains(FindFlags::COPIES) && score >= opts.copy_threshold {
                Some(Action::Copy)
            } else {
                None
            }
        }
        SourceRole::Unmodified | SourceRole::Retained => {
            if score >= opts.copy_threshold {
                Some(Action::Copy)
            } else {
                None
            }
        }
    }
}

/// Whether a modified source may surrender its old side to a rename. Only a
/// pair that scores below the rewrite threshold against itself qualifies;
/// the score is computed on first use when the rewrite stage did not run.
fn steals_old_side(
    list: &DiffList,
    cache: &mut ContentCache,
    slots: &mut [Slot],
    slot: usize,
    opts: &FindOptions,
    whitespace: WhitespaceMode,
    exact_only: bool,
) -> DiffResult<bool> {
    if !opts.flags.contains(FindFlags::RENAMES_FROM_REWRITES) || !blob_new(&slots[slot]) {
        return Ok(false);
    }
    if slots[slot].self_similarity.is_none() && !exact_only {
        let score = self_similarity(list, cache, slots, slot, whitespace)?;
        slots[slot].self_similarity = score;
    }
    Ok(slots[slot]
        .self_similarity
        .map_or(false, |score| score < opts.rename_from_rewrite_threshold))
}

/// Score one source-target pairing. Equal ids match exactly without any
/// bytes; anything else needs both contents, which under `exact_only` means
/// no match at all. `None` drops the pairing.
fn pair_score(
    list: &DiffList,
    cache: &mut ContentCache,
    slots: &mut [Slot],
    source_slot: usize,
    target_slot: usize,
    whitespace: WhitespaceMode,
    exact_only: bool,
) -> DiffResult<Option<u16>> {
    // Null ids are hashed first so workdir entries can still match exactly.
    if side_id(slots, source_slot, DiffSide::Old).map_or(false, |id| id.is_null()) {
        side_content(list, cache, slots, source_slot, DiffSide::Old)?;
    }
    if side_id(slots, target_slot, DiffSide::New).map_or(false, |id| id.is_null()) {
        side_content(list, cache, slots, target_slot, DiffSide::New)?;
    }

    let (Some(source_id), Some(target_id)) = (
        side_id(slots, source_slot, DiffSide::Old),
        side_id(slots, target_slot, DiffSide::New),
    ) else {
        return Ok(None);
    };
    if !source_id.is_null() && source_id == target_id {
        return Ok(Some(100));
    }
    if exact_only {
        return Ok(None);
    }

    let old = side_content(list, cache, slots, source_slot, DiffSide::Old)?;
    let new = side_content(list, cache, slots, target_slot, DiffSide::New)?;
    Ok(match (old, new) {
        (Some(a), Some(b)) => Some(similarity_score(&a, &b, whitespace)),
        _ => None,
    })
}

fn side_id(slots: &[Slot], slot: usize, side: DiffSide) -> Option<ContentId> {
    let entry = match side {
        DiffSide::Old => slots[slot].delta.old.as_ref(),
        DiffSide::New => slots[slot].delta.new.as_ref(),
    };
    entry.map(|entry| entry.id)
}

/// Content of one side of a slot, read through the pass cache. A null id is
/// filled in from the bytes so later exact checks see the real one.
fn side_content(
    list: &DiffList,
    cache: &mut ContentCache,
    slots: &mut [Slot],
    slot: usize,
    side: DiffSide,
) -> DiffResult<Option<Arc<Vec<u8>>>> {
    let entry = match side {
        DiffSide::Old => slots[slot].delta.old.clone(),
        DiffSide::New => slots[slot].delta.new.clone(),
    };
    let Some(mut entry) = entry else {
        return Ok(None);
    };
    let content = cache.load(list, side, &entry)?;
    if let Some(bytes) = &content {
        if entry.id.is_null() {
            entry.id = ContentId::from_bytes(bytes);
            entry.size = bytes.len() as u64;
            match side {
                DiffSide::Old => slots[slot].delta.old = Some(entry),
                DiffSide::New => slots[slot].delta.new = Some(entry),
            }
        }
    }
    Ok(content)
}

fn blob_old(slot: &Slot) -> bool {
    slot.delta
        .old
        .as_ref()
        .map_or(false, |entry| entry.mode.is_blob())
}

fn blob_new(slot: &Slot) -> bool {
    slot.delta
        .new
        .as_ref()
        .map_or(false, |entry| entry.mode.is_blob())
}

fn ids_equal(slot: &Slot) -> bool {
    match (&slot.delta.old, &slot.delta.new) {
        (Some(old), Some(new)) => !old.id.is_null() && old.id == new.id,
        _ => false,
    }
}

/// Levenshtein distance between two paths, used only to break score ties.
fn path_distance(a: &str, b: &str) -> usize {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];
    for (i, &byte_a) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, &byte_b) in b.iter().enumerate() {
            let substitute = prev[j] + usize::from(byte_a != byte_b);
            cur[j + 1] = substitute.min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}
