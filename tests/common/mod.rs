//! Scripted stand-in for the hal tools and the cactus planner.
#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{ExitStatus, Output};
use std::sync::Mutex;

use halpatch::infrastructure::traits::CommandRunner;

/// Answers `halStats`, `cactus-prepare` and `halValidate` with canned text;
/// `hal2fasta` writes a tiny FASTA record into the redirect target.
pub struct FakeTools {
    tree: String,
    plan: String,
    failing: HashMap<String, (i32, String)>,
    calls: Mutex<Vec<String>>,
}

impl FakeTools {
    pub fn new(tree: &str, plan: &str) -> Self {
        Self {
            tree: tree.to_string(),
            plan: plan.to_string(),
            failing: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make `program` exit with `code` and print `stderr`.
    pub fn failing(mut self, program: &str, code: i32, stderr: &str) -> Self {
        self.failing
            .insert(program.to_string(), (code, stderr.to_string()));
        self
    }

    /// Every call as `program arg1 arg2 ...`, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, program: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.split_whitespace().next() == Some(program))
            .collect()
    }

    fn record(&self, cmd: &str, args: &[&str]) {
        let mut line = cmd.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.calls.lock().unwrap().push(line);
    }

    fn status(&self, cmd: &str) -> (ExitStatus, String) {
        match self.failing.get(cmd) {
            Some((code, stderr)) => (ExitStatus::from_raw(*code << 8), stderr.clone()),
            None => (ExitStatus::from_raw(0), String::new()),
        }
    }
}

impl CommandRunner for FakeTools {
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output> {
        self.record(cmd, args);
        let (status, stderr) = self.status(cmd);
        let stdout = if !status.success() {
            String::new()
        } else {
            match cmd {
                "halStats" => format!("{}\n", self.tree),
                "cactus-prepare" => self.plan.clone(),
                _ => String::new(),
            }
        };
        Ok(Output {
            status,
            stdout: stdout.into_bytes(),
            stderr: stderr.into_bytes(),
        })
    }

    fn run_to_file(
        &self,
        cmd: &str,
        args: &[&str],
        stdout_path: &Path,
    ) -> io::Result<(ExitStatus, String)> {
        self.record(cmd, args);
        let genome = args.get(1).copied().unwrap_or("unknown");
        std::fs::write(stdout_path, format!(">{genome}\nACGT\n"))?;
        Ok(self.status(cmd))
    }
}

/// Baseline plan shaped like cactus-prepare output for a two-round update.
pub const BASELINE_PLAN: &str = "\
## generated by : cactus-prepare steps/seq_file.in --outDir steps
## date : 2023-01-01 10:00:00
## cactus commit : abc123

## Preprocessor
cactus-preprocess jobstore/0 steps/seq_file.in steps/seq_file.out --inputNames human chimp L --logInfo

## Alignment

### Round 0
cactus-blast jobstore/1 steps/seq_file.out steps/Anc3.cigar --root Anc3
cactus-align jobstore/2 steps/seq_file.out steps/Anc3.cigar steps/Anc3.hal --root Anc3
hal2fasta steps/Anc3.hal Anc3 --hdf5InMemory > steps/Anc3.fa

## HAL merging
halAppendSubtree steps/Anc3.hal steps/Anc2.hal Anc3 Anc3 --merge --hdf5InMemory
";
