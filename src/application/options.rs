//! Immutable per-run options handed to the update services.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::Settings;
use crate::domain::AssemblyMap;

/// Planner options this tool sets itself; user-supplied copies are dropped.
pub const OWNED_PREPARE_OPTIONS: [&str; 4] = ["--outDir", "--outSeqFile", "--jobStore", "--outHal"];

/// Everything an update run needs, fixed before the run starts.
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Existing alignment
    pub in_hal: PathBuf,
    /// New genomes, in input order
    pub assemblies: AssemblyMap,
    pub out_dir: PathBuf,
    pub jobstore_dir: PathBuf,
    /// Seq file handed to the planner
    pub seq_file_in: PathBuf,
    /// Seq file the planner writes
    pub seq_file_out: PathBuf,
    pub hal_options: Vec<String>,
    pub prepare_options: Vec<String>,
    pub fasta_check: bool,
    /// Directory local sequence paths are made relative to
    pub work_dir: PathBuf,
}

impl UpdateOptions {
    pub fn new(
        in_hal: impl Into<PathBuf>,
        assemblies: AssemblyMap,
        settings: &Settings,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        let out_dir = settings.out_dir.clone();
        let prepare_options = sanitize_prepare_options(&split_options(&settings.prepare_options));
        debug!("UpdateOptions: prepare_options={:?}", prepare_options);
        Self {
            in_hal: in_hal.into(),
            assemblies,
            seq_file_in: out_dir.join("seq_file.in"),
            seq_file_out: out_dir.join("seq_file.out"),
            jobstore_dir: settings.jobstore_dir.clone(),
            hal_options: split_options(&settings.hal_options),
            prepare_options,
            fasta_check: settings.fasta_check,
            work_dir: work_dir.into(),
            out_dir,
        }
    }

    /// `<out_dir>/<genome>.<ext>`
    pub fn out_file(&self, genome: &str, ext: &str) -> PathBuf {
        self.out_dir.join(format!("{genome}.{ext}"))
    }

    pub fn in_hal_str(&self) -> String {
        path_str(&self.in_hal)
    }
}

pub fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Split an option string into arguments. Single- or double-quoted groups
/// become one argument with the quotes removed.
pub fn split_options(options: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut started = false;
    let mut quote: Option<char> = None;

    for c in options.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => {
                quote = Some(c);
                started = true;
            }
            None if c.is_whitespace() => {
                if started {
                    args.push(std::mem::take(&mut current));
                    started = false;
                }
            }
            None => {
                current.push(c);
                started = true;
            }
        }
    }
    if started {
        args.push(current);
    }
    args
}

/// Drop options owned by this tool, together with their value.
pub fn sanitize_prepare_options(args: &[String]) -> Vec<String> {
    let owned = |arg: &str| {
        OWNED_PREPARE_OPTIONS.iter().find_map(|opt| {
            if arg.eq_ignore_ascii_case(opt) {
                Some(true)
            } else if arg
                .get(..opt.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(opt))
                && arg.as_bytes().get(opt.len()) == Some(&b'=')
            {
                Some(false)
            } else {
                None
            }
        })
    };

    let mut result = Vec::with_capacity(args.len());
    let mut iter = args.iter().peekable();
    while let Some(arg) = iter.next() {
        match owned(arg) {
            Some(takes_value) => {
                if takes_value && iter.peek().is_some_and(|next| !next.starts_with("--")) {
                    iter.next();
                }
            }
            None => result.push(arg.clone()),
        }
    }
    result
}
