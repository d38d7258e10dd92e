//! New genomes to insert: ordered name -> (branch length, sequence location).

use std::path::Path;
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::domain::error::DomainError;

/// Branch length used when the genome list gives none.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// One genome to add.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    /// Length of the branch to its future parent
    pub weight: f64,
    /// Local path (relative to the working directory) or remote URI
    pub path: String,
}

/// Ordered map of new genomes. Order decides patch child order and which
/// genome is attached directly during a branch insertion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssemblyMap {
    entries: IndexMap<String, Assembly>,
}

impl AssemblyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the genome list: one `name path [weight]` per line.
    ///
    /// Blank lines and `#` comments are skipped. `cwd` anchors local paths.
    pub fn parse(content: &str, cwd: &Path) -> Result<Self, DomainError> {
        let mut map = Self::new();

        for (i, line) in content.lines().enumerate() {
            let line_no = i + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            let (name, raw_path, weight) = match fields.as_slice() {
                [name, path] => (*name, *path, DEFAULT_WEIGHT),
                [name, path, weight] => (*name, *path, parse_weight(weight, line_no)?),
                _ => {
                    return Err(DomainError::InputFormat {
                        line: line_no,
                        message: format!(
                            "expected `name path [weight]`, found {} fields",
                            fields.len()
                        ),
                    })
                }
            };

            let assembly = Assembly {
                weight,
                path: normalize_sequence_path(raw_path, cwd),
            };
            if map.entries.insert(name.to_string(), assembly).is_some() {
                return Err(DomainError::InputFormat {
                    line: line_no,
                    message: format!("genome {name:?} listed twice"),
                });
            }
        }

        if map.is_empty() {
            return Err(DomainError::InputFormat {
                line: 0,
                message: "no genomes listed".to_string(),
            });
        }
        Ok(map)
    }

    pub fn insert(&mut self, name: impl Into<String>, assembly: Assembly) -> Option<Assembly> {
        self.entries.insert(name.into(), assembly)
    }

    pub fn get(&self, name: &str) -> Option<&Assembly> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// First genome in input order.
    pub fn first(&self) -> Option<(&str, &Assembly)> {
        self.entries.first().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Assembly)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

fn parse_weight(raw: &str, line: usize) -> Result<f64, DomainError> {
    match raw.parse::<f64>() {
        Ok(w) if w.is_finite() && w > 0.0 => Ok(w),
        _ => Err(DomainError::InputFormat {
            line,
            message: format!("{raw:?} is not a positive branch length"),
        }),
    }
}

fn remote_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(https?|s3)://").expect("valid regex"))
}

/// Keep URIs verbatim, make local paths relative to `cwd`.
pub fn normalize_sequence_path(raw: &str, cwd: &Path) -> String {
    if remote_regex().is_match(raw) {
        return raw.to_string();
    }
    let path = Path::new(raw);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };
    pathdiff::diff_paths(&absolute, cwd)
        .map(|p| {
            let rendered = p.to_string_lossy().into_owned();
            if rendered.is_empty() {
                ".".to_string()
            } else {
                rendered
            }
        })
        .unwrap_or_else(|| raw.to_string())
}
