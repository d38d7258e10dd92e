//! Structured form of a planner-generated execution plan.
//!
//! The planner prints markdown-like text: `##` lines mark phases, `###`
//! lines mark alignment rounds, every other non-blank line is one command.
//! Plans are parsed into [`ExecutionPlan`], edited, and printed again.

use std::fmt;

use itertools::Itertools;

/// Title keys of provenance lines at the top of a plan.
const PROVENANCE_KEYS: [&str; 4] = ["generated by", "wrapping", "date", "cactus commit"];

/// Kind of a section, derived from its title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Preprocess,
    Alignment,
    Round,
    Merge,
    Other,
}

impl Phase {
    pub fn classify(title: &str) -> Self {
        let lower = title.trim().to_lowercase();
        if lower.starts_with("preprocess") {
            Phase::Preprocess
        } else if lower == "alignment" {
            Phase::Alignment
        } else if lower.starts_with("round") {
            Phase::Round
        } else if lower.contains("merging") {
            Phase::Merge
        } else {
            Phase::Other
        }
    }
}

/// One command line of the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a command line on whitespace. Returns None for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        let program = tokens.next()?;
        Some(Self::new(program, tokens))
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }

    /// Position of the values following `option`, up to the next `--option`.
    pub fn option_values(&self, option: &str) -> Option<std::ops::Range<usize>> {
        let start = self.args.iter().position(|a| a == option)? + 1;
        let end = self.args[start..]
            .iter()
            .position(|a| a.starts_with("--"))
            .map_or(self.args.len(), |p| start + p);
        Some(start..end)
    }

    /// Target of a `> file` redirection.
    pub fn redirect_target_mut(&mut self) -> Option<&mut String> {
        let pos = self.args.iter().position(|a| a == ">")?;
        self.args.get_mut(pos + 1)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            write!(f, "{}", self.program)
        } else {
            write!(f, "{} {}", self.program, self.args.join(" "))
        }
    }
}

/// A line inside a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanLine {
    Invocation(Invocation),
    /// Comments and anything else kept verbatim
    Text(String),
}

impl PlanLine {
    pub fn as_invocation(&self) -> Option<&Invocation> {
        match self {
            PlanLine::Invocation(inv) => Some(inv),
            PlanLine::Text(_) => None,
        }
    }
}

/// A `##` phase or `###` round with its lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSection {
    pub level: usize,
    pub title: String,
    pub lines: Vec<PlanLine>,
}

impl PlanSection {
    pub fn new(level: usize, title: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            lines: Vec::new(),
        }
    }

    pub fn with_invocations(mut self, invocations: impl IntoIterator<Item = Invocation>) -> Self {
        self.lines
            .extend(invocations.into_iter().map(PlanLine::Invocation));
        self
    }

    pub fn phase(&self) -> Phase {
        Phase::classify(&self.title)
    }

    pub fn invocations(&self) -> impl Iterator<Item = &Invocation> {
        self.lines.iter().filter_map(PlanLine::as_invocation)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPlan {
    /// Provenance lines, without the leading `##`
    pub header: Vec<String>,
    /// Lines before the first section
    pub preamble: Vec<PlanLine>,
    pub sections: Vec<PlanSection>,
}

impl ExecutionPlan {
    pub fn parse(text: &str) -> Self {
        let mut plan = Self::default();

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if let Some((level, title)) = heading(line) {
                if plan.sections.is_empty() && level == 2 && is_provenance(title) {
                    plan.header.push(title.to_string());
                } else {
                    plan.sections.push(PlanSection::new(level, title));
                }
                continue;
            }

            let entry = if line.starts_with('#') {
                PlanLine::Text(line.to_string())
            } else {
                match Invocation::parse(line) {
                    Some(inv) => PlanLine::Invocation(inv),
                    None => continue,
                }
            };
            match plan.sections.last_mut() {
                Some(section) => section.lines.push(entry),
                None => plan.preamble.push(entry),
            }
        }

        plan
    }

    /// Index of the first top-level alignment section.
    pub fn alignment_start(&self) -> Option<usize> {
        self.sections
            .iter()
            .position(|s| s.phase() == Phase::Alignment)
    }

    pub fn invocations(&self) -> impl Iterator<Item = &Invocation> {
        self.preamble
            .iter()
            .chain(self.sections.iter().flat_map(|s| s.lines.iter()))
            .filter_map(PlanLine::as_invocation)
    }

    pub fn invocations_mut(&mut self) -> impl Iterator<Item = &mut Invocation> {
        self.preamble
            .iter_mut()
            .chain(self.sections.iter_mut().flat_map(|s| s.lines.iter_mut()))
            .filter_map(|line| match line {
                PlanLine::Invocation(inv) => Some(inv),
                PlanLine::Text(_) => None,
            })
    }

    pub fn push_section(&mut self, section: PlanSection) {
        self.sections.push(section);
    }
}

impl fmt::Display for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.header {
            writeln!(f, "## {}", line)?;
        }
        if !self.header.is_empty() {
            writeln!(f)?;
        }
        for line in &self.preamble {
            write_line(f, line)?;
        }
        let mut sections = self.sections.iter().map(|section| {
            let mut out = format!("{} {}\n", "#".repeat(section.level), section.title);
            for line in &section.lines {
                out.push_str(&line_text(line));
                out.push('\n');
            }
            out
        });
        write!(f, "{}", sections.join("\n"))
    }
}

fn write_line(f: &mut fmt::Formatter<'_>, line: &PlanLine) -> fmt::Result {
    writeln!(f, "{}", line_text(line))
}

fn line_text(line: &PlanLine) -> String {
    match line {
        PlanLine::Invocation(inv) => inv.to_string(),
        PlanLine::Text(t) => t.clone(),
    }
}

/// `## Title` -> (2, "Title"). Single `#` lines are plain comments.
fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|&c| c == '#').count();
    if level < 2 {
        return None;
    }
    let rest = &line[level..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some((level, rest.trim()))
}

pub fn is_provenance(title: &str) -> bool {
    let lower = title.to_lowercase();
    PROVENANCE_KEYS.iter().any(|key| lower.starts_with(key))
}
