//! External hal/cactus tools used while preparing an update.
//!
//! All calls block; a failing tool aborts the run.

use std::path::Path;
use std::process::Output;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, instrument};

use crate::application::options::{path_str, UpdateOptions};
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::assembly::normalize_sequence_path;
use crate::domain::{parse_newick, PhyloTree};
use crate::infrastructure::traits::{CommandRunner, FileSystem};
use crate::infrastructure::InfraError;

pub const TREE_PROGRAM: &str = "halStats";
pub const SEQUENCE_PROGRAM: &str = "hal2fasta";
pub const PLANNER_PROGRAM: &str = "cactus-prepare";
pub const VALIDATE_PROGRAM: &str = "halValidate";

/// Genome name -> sequence path, in the order they go into the seq file.
pub type SequenceMap = IndexMap<String, String>;

/// Wrapper around the hal tools and the cactus planner.
pub struct HalToolchain {
    fs: Arc<dyn FileSystem>,
    cmd: Arc<dyn CommandRunner>,
}

impl HalToolchain {
    pub fn new(fs: Arc<dyn FileSystem>, cmd: Arc<dyn CommandRunner>) -> Self {
        Self { fs, cmd }
    }

    /// `halValidate <hal>`
    #[instrument(level = "debug", skip(self))]
    pub fn validate_alignment(&self, hal: &Path) -> ApplicationResult<()> {
        let hal = path_str(hal);
        self.run(VALIDATE_PROGRAM, &[hal.as_str()]).map(|_| ())
    }

    /// `halStats --tree <hal>`, parsed.
    #[instrument(level = "debug", skip(self))]
    pub fn extract_tree(&self, hal: &Path) -> ApplicationResult<PhyloTree> {
        let hal = path_str(hal);
        let newick = self.run(TREE_PROGRAM, &["--tree", hal.as_str()])?;
        debug!("extract_tree: {}", newick.trim());
        Ok(parse_newick(&newick)?)
    }

    /// `hal2fasta <hal> <genome> <hal options> > <out_dir>/<genome>.fa` for each genome.
    pub fn extract_sequences<S: AsRef<str>>(
        &self,
        opts: &UpdateOptions,
        genomes: &[S],
    ) -> ApplicationResult<SequenceMap> {
        let hal = opts.in_hal_str();
        let mut sequences = SequenceMap::new();

        for genome in genomes {
            let genome = genome.as_ref();
            let fasta = opts.out_file(genome, "fa");
            let mut args = vec![hal.as_str(), genome];
            args.extend(opts.hal_options.iter().map(String::as_str));
            debug!("extract_sequences: {} -> {}", genome, fasta.display());

            self.fs
                .ensure_parent(&fasta)
                .with_path_context("create directory for", &fasta)?;
            let (status, stderr) = self
                .cmd
                .run_to_file(SEQUENCE_PROGRAM, &args, &fasta)
                .with_path_context("run hal2fasta into", &fasta)?;
            if !status.success() {
                return Err(tool_failed(SEQUENCE_PROGRAM, status.code(), stderr));
            }

            let rendered = normalize_sequence_path(&path_str(&fasta), &opts.work_dir);
            sequences.insert(genome.to_string(), rendered);
        }
        Ok(sequences)
    }

    /// Write the seq file and ask the planner for a baseline plan.
    ///
    /// The seq file holds the patch on its first line, then `name path` lines.
    pub fn generate_plan(
        &self,
        opts: &UpdateOptions,
        patch: &str,
        sequences: &SequenceMap,
        out_hal: &Path,
    ) -> ApplicationResult<String> {
        let content = render_seq_file(patch, sequences);
        self.fs
            .ensure_parent(&opts.seq_file_in)
            .with_path_context("create directory for", &opts.seq_file_in)?;
        self.fs
            .write(&opts.seq_file_in, &content)
            .with_path_context("write seq file", &opts.seq_file_in)?;

        let seq_in = path_str(&opts.seq_file_in);
        let seq_out = path_str(&opts.seq_file_out);
        let out_dir = path_str(&opts.out_dir);
        let jobstore = path_str(&opts.jobstore_dir);
        let out_hal = path_str(out_hal);

        let mut args = vec![
            seq_in.as_str(),
            "--outDir",
            out_dir.as_str(),
            "--outSeqFile",
            seq_out.as_str(),
            "--jobStore",
            jobstore.as_str(),
        ];
        args.extend(opts.prepare_options.iter().map(String::as_str));
        args.extend(["--outHal", out_hal.as_str()]);

        self.run(PLANNER_PROGRAM, &args)
    }

    fn run(&self, program: &str, args: &[&str]) -> ApplicationResult<String> {
        debug!("run: {} {}", program, args.join(" "));
        let output: Output =
            self.cmd
                .run(program, args)
                .map_err(|e| ApplicationError::OperationFailed {
                    context: format!("run {program}"),
                    source: Box::new(e),
                })?;
        if !output.status.success() {
            return Err(tool_failed(
                program,
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn tool_failed(program: &str, exit_code: Option<i32>, stderr: String) -> ApplicationError {
    ApplicationError::OperationFailed {
        context: format!("run {program}"),
        source: Box::new(InfraError::ToolFailed {
            program: program.to_string(),
            exit_code,
            stderr: stderr.trim().to_string(),
        }),
    }
}

/// Seq file text: patch line, then one `name path` line per genome.
pub fn render_seq_file(patch: &str, sequences: &SequenceMap) -> String {
    let mut content = format!("{patch}\n");
    for (name, path) in sequences {
        content.push_str(&format!("{name} {path}\n"));
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_patch_and_sequences_when_rendering_seq_file_then_patch_first() {
        let mut sequences = SequenceMap::new();
        sequences.insert("Anc1".into(), "steps/Anc1.fa".into());
        sequences.insert("new".into(), "s3://bucket/new.fa".into());

        assert_eq!(
            render_seq_file("(new:1.0)Anc1;", &sequences),
            "(new:1.0)Anc1;\nAnc1 steps/Anc1.fa\nnew s3://bucket/new.fa\n"
        );
    }
}
