//! Turning a cactus-prepare plan into an incremental update plan.
//!
//! Steps run in a fixed order, later steps assume the earlier ones ran:
//! header swap, preprocessing pruning, `--includeRoot` flagging, merge
//! removal, output renaming, optional sanity check. Amendments are appended
//! by the caller once the update commands are known.

use std::collections::HashSet;

use chrono::{SecondsFormat, Utc};
use tracing::debug;

use crate::domain::plan::is_provenance;
use crate::domain::{ExecutionPlan, Invocation, Phase, PlanLine, PlanSection};

pub const INPUT_NAMES_OPTION: &str = "--inputNames";
pub const INCLUDE_ROOT_FLAG: &str = "--includeRoot";
pub const REGENERATED_SUFFIX: &str = ".2";
pub const UPDATE_SECTION_TITLE: &str = "Alignment update";
pub const VALIDATION_SECTION_TITLE: &str = "Alignment validation";

const ALIGNMENT_PROGRAMS: [&str; 2] = ["cactus-blast", "cactus-align"];
const MERGE_PROGRAM: &str = "halAppendSubtree";
const SEQUENCE_PROGRAM: &str = "hal2fasta";

/// The root ancestor sequence written by the last `hal2fasta` of the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegeneratedSequence {
    pub genome: String,
    /// Path of the sequence extracted before the update
    pub original: String,
    /// Path the plan now writes the regenerated sequence to
    pub regenerated: String,
}

/// Settings of one rewrite run.
#[derive(Debug, Clone)]
pub struct PlanRewriter {
    header: Vec<String>,
    processed: HashSet<String>,
    sanity_check: bool,
}

impl PlanRewriter {
    /// `processed` names genomes whose sequences need no preprocessing.
    pub fn new<I, S>(processed: I, sanity_check: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            header: generation_header(),
            processed: processed.into_iter().map(Into::into).collect(),
            sanity_check,
        }
    }

    /// Replace the generated header, e.g. with a fixed one in tests.
    pub fn with_header(mut self, header: Vec<String>) -> Self {
        self.header = header;
        self
    }

    pub fn rewrite(&self, raw: &str) -> ExecutionPlan {
        let mut plan = ExecutionPlan::parse(raw);
        debug!(
            "rewrite: {} sections, {} invocations",
            plan.sections.len(),
            plan.invocations().count()
        );

        swap_header(&mut plan, &self.header);
        prune_preprocessing(&mut plan, &self.processed);
        flag_root_inclusion(&mut plan);
        remove_merge_phase(&mut plan);
        let regenerated = avoid_output_collision(&mut plan);
        if self.sanity_check {
            if let Some(seq) = &regenerated {
                append_sanity_check(&mut plan, seq);
            }
        }
        plan
    }
}

/// `generated by` and `date` lines for plans written by this tool.
pub fn generation_header() -> Vec<String> {
    vec![
        format!(
            "generated by : {} {}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ),
        format!(
            "date : {}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        ),
    ]
}

/// Drop every provenance line and put `header` in their place.
pub fn swap_header(plan: &mut ExecutionPlan, header: &[String]) {
    plan.header.retain(|line| !is_provenance(line));
    let mut new_header = header.to_vec();
    new_header.append(&mut plan.header);
    plan.header = new_header;
}

/// Remove already processed genomes from preprocessing jobs.
///
/// Only sections before the alignment phase are touched. A job left without
/// input names is dropped.
pub fn prune_preprocessing(plan: &mut ExecutionPlan, processed: &HashSet<String>) {
    let end = plan.alignment_start().unwrap_or(plan.sections.len());

    let prune = |lines: &mut Vec<PlanLine>| {
        lines.retain_mut(|line| {
            let PlanLine::Invocation(inv) = line else {
                return true;
            };
            let Some(range) = inv.option_values(INPUT_NAMES_OPTION) else {
                return true;
            };
            let remaining: Vec<String> = inv.args[range.clone()]
                .iter()
                .filter(|name| !processed.contains(name.as_str()))
                .cloned()
                .collect();
            if remaining.is_empty() {
                debug!("prune_preprocessing: dropping {}", inv.program);
                return false;
            }
            inv.args.splice(range, remaining).for_each(drop);
            true
        });
    };

    prune(&mut plan.preamble);
    for section in &mut plan.sections[..end] {
        prune(&mut section.lines);
    }
}

/// Add `--includeRoot` to the last round's blast and align jobs.
///
/// The patched subtree is rooted at a genome that already has a sequence,
/// so the final round must align against it.
pub fn flag_root_inclusion(plan: &mut ExecutionPlan) {
    let mut alignment_jobs: Vec<&mut Invocation> = plan
        .invocations_mut()
        .filter(|inv| ALIGNMENT_PROGRAMS.contains(&inv.program.as_str()))
        .collect();
    let skip = alignment_jobs.len().saturating_sub(2);
    for inv in alignment_jobs.iter_mut().skip(skip) {
        if !inv.has_flag(INCLUDE_ROOT_FLAG) {
            inv.args.push(INCLUDE_ROOT_FLAG.to_string());
        }
    }
}

/// Delete the merge phase: an update replaces a sub-alignment, it never
/// re-merges subtrees.
pub fn remove_merge_phase(plan: &mut ExecutionPlan) {
    plan.sections.retain(|s| s.phase() != Phase::Merge);
    let is_merge = |line: &PlanLine| {
        line.as_invocation()
            .is_some_and(|inv| inv.program == MERGE_PROGRAM)
    };
    plan.preamble.retain(|l| !is_merge(l));
    for section in &mut plan.sections {
        section.lines.retain(|l| !is_merge(l));
    }
}

/// Point the last `hal2fasta` at `<output>.2` so the extracted reference
/// sequence with the same name stays intact.
pub fn avoid_output_collision(plan: &mut ExecutionPlan) -> Option<RegeneratedSequence> {
    let inv = plan
        .invocations_mut()
        .filter(|inv| inv.program == SEQUENCE_PROGRAM)
        .last()?;
    let genome = inv.args.get(1)?.clone();
    let target = inv.redirect_target_mut()?;

    let original = target
        .strip_suffix(REGENERATED_SUFFIX)
        .unwrap_or(target.as_str())
        .to_string();
    let regenerated = format!("{original}{REGENERATED_SUFFIX}");
    *target = regenerated.clone();

    Some(RegeneratedSequence {
        genome,
        original,
        regenerated,
    })
}

/// Compare the old and the regenerated root ancestor sequence; any
/// difference means the update changed an ancestor.
///
/// A plan that already carries the check for `seq.genome` is left alone.
pub fn append_sanity_check(plan: &mut ExecutionPlan, seq: &RegeneratedSequence) {
    let title = format!("Ancestor {} sequence sanity check", seq.genome);
    if plan.sections.iter().any(|s| s.title == title) {
        debug!("append_sanity_check: {} already checked", seq.genome);
        return;
    }
    plan.push_section(
        PlanSection::new(2, title)
            .with_invocations([Invocation::new(
                "diff",
                [seq.original.as_str(), seq.regenerated.as_str()],
            )]),
    );
}

/// Append the update commands and the validation commands.
pub fn amend(plan: &mut ExecutionPlan, updates: Vec<Invocation>, validations: Vec<Invocation>) {
    plan.push_section(PlanSection::new(2, UPDATE_SECTION_TITLE).with_invocations(updates));
    plan.push_section(PlanSection::new(2, VALIDATION_SECTION_TITLE).with_invocations(validations));
}
