//! Node and branch update orchestration.
//!
//! Both modes follow the same pipeline: read the tree, describe the edit as a
//! Newick patch, extract the sequences the planner needs, let the planner
//! produce a baseline plan, rewrite it, and append the commands that splice
//! the new sub-alignment into the existing container.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::options::{path_str, UpdateOptions};
use crate::application::rewriter::{amend, generation_header, PlanRewriter};
use crate::application::services::toolchain::{SequenceMap, VALIDATE_PROGRAM};
use crate::application::services::HalToolchain;
use crate::application::ApplicationResult;
use crate::domain::{
    build_patch, format_length, locator, resolve, DomainError, ExecutionPlan, Invocation,
    PhyloTree, UpdateRequest,
};

pub const REPLACE_PROGRAM: &str = "halReplaceGenome";
pub const ADD_TO_BRANCH_PROGRAM: &str = "halAddToBranch";

/// Builds incremental update plans.
pub struct UpdateService {
    toolchain: Arc<HalToolchain>,
    header: Option<Vec<String>>,
}

impl UpdateService {
    pub fn new(toolchain: Arc<HalToolchain>) -> Self {
        Self {
            toolchain,
            header: None,
        }
    }

    /// Use a fixed plan header instead of the generated one.
    pub fn with_header(mut self, header: Vec<String>) -> Self {
        self.header = Some(header);
        self
    }

    #[instrument(level = "debug", skip(self, opts), fields(action = request.action()))]
    pub fn plan(
        &self,
        request: &UpdateRequest,
        opts: &UpdateOptions,
    ) -> ApplicationResult<ExecutionPlan> {
        info!("{request}");
        match request {
            UpdateRequest::Node { genome } => self.add_to_node(genome, opts),
            UpdateRequest::Branch {
                parent,
                child,
                ancestor_name,
                top_length,
                forced_bottom_length,
            } => self.add_to_branch(
                parent,
                child,
                ancestor_name,
                *top_length,
                *forced_bottom_length,
                opts,
            ),
        }
    }

    /// Attach the new genomes under `genome`.
    fn add_to_node(&self, genome: &str, opts: &UpdateOptions) -> ApplicationResult<ExecutionPlan> {
        let tree = self.toolchain.extract_tree(&opts.in_hal)?;
        let node = locator::find_by_name(&tree, genome)?;
        reject_known_names(&tree, opts.assemblies.names())?;

        let mut children = locator::named_children(&tree, node)?;
        let existing: Vec<String> = children.iter().map(|(name, _)| name.clone()).collect();

        let mut to_extract = existing.clone();
        to_extract.push(genome.to_string());
        let mut sequences = self.toolchain.extract_sequences(opts, &to_extract)?;
        add_new_genomes(opts, &mut children, &mut sequences);

        // the upstream edge stays as it is in the container
        let patch = build_patch(genome, None, &children, true);
        debug!("add_to_node: patch={patch}");

        let out_hal = opts.out_file(genome, "hal");
        let raw = self
            .toolchain
            .generate_plan(opts, &patch, &sequences, &out_hal)?;
        let mut plan = self.rewriter(existing, opts).rewrite(&raw);

        let updates = vec![replace_genome(opts, &out_hal, genome)];
        let validations = vec![validate_genome(opts, genome)];
        amend(&mut plan, updates, validations);
        Ok(plan)
    }

    /// Split `parent -> child` with `ancestor` and attach the new genomes to it.
    fn add_to_branch(
        &self,
        parent: &str,
        child: &str,
        ancestor: &str,
        top_length: f64,
        forced_bottom_length: Option<f64>,
        opts: &UpdateOptions,
    ) -> ApplicationResult<ExecutionPlan> {
        let tree = self.toolchain.extract_tree(&opts.in_hal)?;
        let parent_node = locator::find_by_name(&tree, parent)?;
        let child_node = locator::find_by_name(&tree, child)?;
        let original = locator::edge_length(&tree, parent_node, child_node)?;
        reject_known_names(
            &tree,
            opts.assemblies.names().chain(std::iter::once(ancestor)),
        )?;
        if opts.assemblies.contains(ancestor) {
            return Err(DomainError::DuplicateGenome(ancestor.to_string()).into());
        }
        let lengths = resolve(original, top_length, forced_bottom_length)?;

        // bottom half: the new ancestor over the old child and the new genomes
        let mut bottom_children = vec![(child.to_string(), lengths.bottom)];
        let mut sequences = self.toolchain.extract_sequences(opts, &[child])?;
        add_new_genomes(opts, &mut bottom_children, &mut sequences);
        let bottom_patch = build_patch(ancestor, None, &bottom_children, false);

        // top half: the parent over its other children and the bottom half
        let siblings: Vec<(String, f64)> = locator::named_children(&tree, parent_node)?
            .into_iter()
            .filter(|(name, _)| name != child)
            .collect();
        let mut to_extract: Vec<String> = siblings.iter().map(|(name, _)| name.clone()).collect();
        to_extract.push(parent.to_string());
        sequences.extend(self.toolchain.extract_sequences(opts, &to_extract)?);

        let mut top_children = siblings.clone();
        top_children.push((bottom_patch, lengths.top));
        let patch = build_patch(parent, None, &top_children, true);
        debug!("add_to_branch: patch={patch}");

        let top_hal = opts.out_file(parent, "hal");
        let raw = self
            .toolchain
            .generate_plan(opts, &patch, &sequences, &top_hal)?;
        let processed = std::iter::once(child.to_string())
            .chain(siblings.into_iter().map(|(name, _)| name));
        let mut plan = self.rewriter(processed, opts).rewrite(&raw);

        let bottom_hal = opts.out_file(ancestor, "hal");
        let (leaf, assembly) = opts
            .assemblies
            .first()
            .ok_or_else(|| DomainError::InputFormat {
                line: 0,
                message: "no genomes listed".to_string(),
            })?;

        let mut add_args = vec![
            opts.in_hal_str(),
            path_str(&bottom_hal),
            path_str(&top_hal),
            parent.to_string(),
            ancestor.to_string(),
            child.to_string(),
            leaf.to_string(),
            format_length(lengths.top),
            format_length(assembly.weight),
        ];
        add_args.extend(opts.hal_options.iter().cloned());
        let mut updates = vec![Invocation::new(ADD_TO_BRANCH_PROGRAM, add_args)];
        // halAddToBranch attaches a single leaf; the rest come with a replace
        if opts.assemblies.len() > 1 {
            updates.push(replace_genome(opts, &bottom_hal, ancestor));
        }

        let validations = [parent, ancestor, child]
            .into_iter()
            .chain(opts.assemblies.names())
            .map(|genome| validate_genome(opts, genome))
            .collect();
        amend(&mut plan, updates, validations);
        Ok(plan)
    }

    fn rewriter<I, S>(&self, processed: I, opts: &UpdateOptions) -> PlanRewriter
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PlanRewriter::new(processed, opts.fasta_check)
            .with_header(self.header.clone().unwrap_or_else(generation_header))
    }
}

/// New genome names must not already name a tree node.
fn reject_known_names<'a>(
    tree: &PhyloTree,
    mut names: impl Iterator<Item = &'a str>,
) -> Result<(), DomainError> {
    match names.find(|name| locator::contains(tree, name)) {
        Some(name) => Err(DomainError::DuplicateGenome(name.to_string())),
        None => Ok(()),
    }
}

/// Append the new genomes after the existing children.
///
/// Callers have already rejected names that collide with the tree.
fn add_new_genomes(
    opts: &UpdateOptions,
    children: &mut Vec<(String, f64)>,
    sequences: &mut SequenceMap,
) {
    for (name, assembly) in opts.assemblies.iter() {
        children.push((name.to_string(), assembly.weight));
        sequences.insert(name.to_string(), assembly.path.clone());
    }
}

/// `halReplaceGenome --bottomAlignmentFile <bottom> --topAlignmentFile <in> <in> <genome> <opts>`
fn replace_genome(opts: &UpdateOptions, bottom_hal: &Path, genome: &str) -> Invocation {
    let in_hal = opts.in_hal_str();
    let mut args = vec![
        "--bottomAlignmentFile".to_string(),
        path_str(bottom_hal),
        "--topAlignmentFile".to_string(),
        in_hal.clone(),
        in_hal,
        genome.to_string(),
    ];
    args.extend(opts.hal_options.iter().cloned());
    Invocation::new(REPLACE_PROGRAM, args)
}

/// `halValidate --genome <genome> <in> <opts>`
fn validate_genome(opts: &UpdateOptions, genome: &str) -> Invocation {
    let mut args = vec!["--genome".to_string(), genome.to_string(), opts.in_hal_str()];
    args.extend(opts.hal_options.iter().cloned());
    Invocation::new(VALIDATE_PROGRAM, args)
}
