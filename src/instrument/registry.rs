//! Identity registry for one processing run
//!
//! Tracks every id allocated (or found already present) so that no two
//! non-grouped elements in the same scope share an id.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::InstrumentConfig;

const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Process-wide sequence behind fallback suffixes
static FALLBACK_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// How the suffix of a new id is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuffixMode {
    /// `div-1`, `div-2`, ...
    #[default]
    Counter,
    /// `div-k3x9a`
    Random,
}

/// How far id uniqueness extends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryScope {
    /// Reset at the start of every file
    #[default]
    File,
    /// Shared by every file of a run
    Global,
}

impl FromStr for SuffixMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "counter" => Ok(SuffixMode::Counter),
            "random" => Ok(SuffixMode::Random),
            other => Err(format!("unknown suffix mode '{}' (expected counter or random)", other)),
        }
    }
}

impl fmt::Display for SuffixMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuffixMode::Counter => write!(f, "counter"),
            SuffixMode::Random => write!(f, "random"),
        }
    }
}

impl FromStr for RegistryScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(RegistryScope::File),
            "global" => Ok(RegistryScope::Global),
            other => Err(format!("unknown scope '{}' (expected file or global)", other)),
        }
    }
}

impl fmt::Display for RegistryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryScope::File => write!(f, "file"),
            RegistryScope::Global => write!(f, "global"),
        }
    }
}

/// Registry of allocated element and group identifiers
#[derive(Debug)]
pub struct IdentityRegistry {
    mode: SuffixMode,
    scope: RegistryScope,
    max_attempts: u32,
    suffix_len: usize,
    group_suffix_len: usize,
    allocated: HashSet<String>,
    groups: HashSet<String>,
    counter: u64,
    rng: StdRng,
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new(&InstrumentConfig::default())
    }
}

impl IdentityRegistry {
    /// Create a registry configured for a run
    pub fn new(config: &InstrumentConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            mode: config.suffix_mode,
            scope: config.scope,
            max_attempts: config.max_attempts.max(1),
            suffix_len: config.random_suffix_len,
            group_suffix_len: config.group_suffix_len,
            allocated: HashSet::new(),
            groups: HashSet::new(),
            counter: 0,
            rng,
        }
    }

    pub fn scope(&self) -> RegistryScope {
        self.scope
    }

    /// Forget everything; called at the start of every run
    pub fn begin_run(&mut self) {
        self.allocated.clear();
        self.groups.clear();
        self.counter = 0;
    }

    /// Called before each file; only a per-file scope forgets anything
    pub fn begin_file(&mut self) {
        if self.scope == RegistryScope::File {
            self.begin_run();
        }
    }

    /// Record an id already present in source
    pub fn reserve(&mut self, id: &str) {
        self.allocated.insert(id.to_string());
    }

    /// Record a group id already present in source
    pub fn reserve_group(&mut self, group_id: &str) {
        self.groups.insert(group_id.to_string());
    }

    pub fn contains(&self, id: &str) -> bool {
        self.allocated.contains(id)
    }

    pub fn len(&self) -> usize {
        self.allocated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocated.is_empty()
    }

    /// Allocate a unique id of the form `<tag>-<suffix>`
    pub fn allocate(&mut self, tag: &str) -> String {
        let prefix = tag.to_lowercase();
        let len = self.suffix_len;
        Self::claim(
            &mut self.allocated,
            &prefix,
            self.max_attempts,
            || Self::suffix(self.mode, &mut self.counter, &mut self.rng, len),
        )
    }

    /// Allocate a group id of the form `<collection>-<tag>-<suffix>`
    pub fn allocate_group(&mut self, collection: &str, tag: &str) -> String {
        let prefix = format!("{}-{}", collection, tag.to_lowercase());
        let len = self.group_suffix_len;
        Self::claim(
            &mut self.groups,
            &prefix,
            self.max_attempts,
            || Self::suffix(self.mode, &mut self.counter, &mut self.rng, len),
        )
    }

    fn claim(
        taken: &mut HashSet<String>,
        prefix: &str,
        max_attempts: u32,
        mut next_suffix: impl FnMut() -> String,
    ) -> String {
        for _ in 0..max_attempts {
            let candidate = format!("{}-{}", prefix, next_suffix());
            if !taken.contains(&candidate) {
                taken.insert(candidate.clone());
                return candidate;
            }
        }

        let candidate = loop {
            let candidate = format!("{}-{}", prefix, fallback_suffix());
            if !taken.contains(&candidate) {
                break candidate;
            }
        };
        tracing::warn!(
            id = %candidate,
            attempts = max_attempts,
            "id candidates exhausted, using fallback suffix"
        );
        taken.insert(candidate.clone());
        candidate
    }

    fn suffix(mode: SuffixMode, counter: &mut u64, rng: &mut StdRng, len: usize) -> String {
        match mode {
            SuffixMode::Counter => {
                *counter += 1;
                counter.to_string()
            }
            SuffixMode::Random => (0..len)
                .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
                .collect(),
        }
    }
}

/// Timestamp-derived suffix, distinct for every call within the process
fn fallback_suffix() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    let sequence = FALLBACK_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{}_{}", base36(millis), base36(sequence))
}

fn base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(SUFFIX_CHARSET[(26 + value % 36) as usize % 36]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(mode: SuffixMode, scope: RegistryScope) -> IdentityRegistry {
        IdentityRegistry::new(
            &InstrumentConfig::default()
                .with_suffix_mode(mode)
                .with_scope(scope)
                .with_seed(42),
        )
    }

    #[test]
    fn test_counter_allocation() {
        let mut reg = registry(SuffixMode::Counter, RegistryScope::File);
        assert_eq!(reg.allocate("DIV"), "div-1");
        assert_eq!(reg.allocate("span"), "span-2");
        assert_eq!(reg.allocate_group("todos", "li"), "todos-li-3");
    }

    #[test]
    fn test_reserved_ids_are_skipped() {
        let mut reg = registry(SuffixMode::Counter, RegistryScope::File);
        reg.reserve("div-1");
        reg.reserve("div-2");
        assert_eq!(reg.allocate("div"), "div-3");
    }

    #[test]
    fn test_file_scope_resets_per_file() {
        let mut reg = registry(SuffixMode::Counter, RegistryScope::File);
        reg.begin_run();
        reg.begin_file();
        assert_eq!(reg.allocate("p"), "p-1");
        reg.begin_file();
        assert!(reg.is_empty());
        assert_eq!(reg.allocate("p"), "p-1");
    }

    #[test]
    fn test_global_scope_spans_files() {
        let mut reg = registry(SuffixMode::Counter, RegistryScope::Global);
        reg.begin_run();
        reg.begin_file();
        assert_eq!(reg.allocate("p"), "p-1");
        reg.begin_file();
        assert_eq!(reg.allocate("p"), "p-2");
        assert!(reg.contains("p-1"));
        reg.begin_run();
        assert!(reg.is_empty());
    }

    #[test]
    fn test_random_suffix_shape() {
        let mut reg = registry(SuffixMode::Random, RegistryScope::File);
        let id = reg.allocate("button");
        let suffix = id.strip_prefix("button-").unwrap();
        assert_eq!(suffix.len(), 5);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));

        let group = reg.allocate_group("users", "tr");
        assert_eq!(group.strip_prefix("users-tr-").unwrap().len(), 4);
    }

    #[test]
    fn test_seeded_random_is_reproducible() {
        let mut a = registry(SuffixMode::Random, RegistryScope::File);
        let mut b = registry(SuffixMode::Random, RegistryScope::File);
        let first: Vec<_> = (0..5).map(|_| a.allocate("div")).collect();
        let second: Vec<_> = (0..5).map(|_| b.allocate("div")).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_exhaustion_falls_back_to_unique_suffix() {
        let config = InstrumentConfig {
            suffix_mode: SuffixMode::Random,
            random_suffix_len: 1,
            max_attempts: 3,
            seed: Some(1),
            ..InstrumentConfig::default()
        };
        let mut reg = IdentityRegistry::new(&config);
        let ids: Vec<_> = (0..100).map(|_| reg.allocate("a")).collect();
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 100);
        assert!(ids.iter().any(|id| id.contains('_')));
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("random".parse::<SuffixMode>(), Ok(SuffixMode::Random));
        assert_eq!("global".parse::<RegistryScope>(), Ok(RegistryScope::Global));
        assert!("sometimes".parse::<SuffixMode>().is_err());
    }

    #[test]
    fn test_base36() {
        assert_eq!(base36(0), "0");
        assert_eq!(base36(35), "z");
        assert_eq!(base36(36), "10");
    }
}
