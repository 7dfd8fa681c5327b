use serde::{Deserialize, Serialize};

/// Severity reported by a detector for a single finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A single issue reported by a detector.
///
/// `detector` names the detector that produced the finding so verification
/// can re-run exactly that detector and nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub file: String,
    pub line: u32,
    pub message: String,
    pub severity: Severity,
    #[serde(default)]
    pub category: String,
    pub detector: String,
}

impl Finding {
    /// Identity key used to compare finding sets before/after a mutation.
    pub fn key(&self) -> (String, String) {
        (self.file.clone(), self.message.clone())
    }
}

/// How dangerous it is to let automation modify a file, ordered
/// critical > high > medium > low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Critical,
    High,
    Medium,
    Low,
}

impl RiskTier {
    /// Ordering rank: lower number = more dangerous.
    pub fn rank(self) -> u8 {
        match self {
            RiskTier::Critical => 0,
            RiskTier::High => 1,
            RiskTier::Medium => 2,
            RiskTier::Low => 3,
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskTier::Critical => write!(f, "critical"),
            RiskTier::High => write!(f, "high"),
            RiskTier::Medium => write!(f, "medium"),
            RiskTier::Low => write!(f, "low"),
        }
    }
}

impl std::str::FromStr for RiskTier {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(RiskTier::Critical),
            "high" => Ok(RiskTier::High),
            "medium" => Ok(RiskTier::Medium),
            "low" => Ok(RiskTier::Low),
            _ => anyhow::bail!("invalid risk tier: {s}. Expected: critical, high, medium, low"),
        }
    }
}

/// File category inferred from path patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    Source,
    Test,
    Documentation,
    BuildConfig,
    CiConfig,
    Dependencies,
    Config,
    Env,
    SecretCandidates,
    Migrations,
    Infrastructure,
    /// Unrecognized files land here rather than failing classification.
    Other,
}

impl FileCategory {
    /// Fixed category → tier table.
    pub fn tier(self) -> RiskTier {
        match self {
            FileCategory::Env | FileCategory::SecretCandidates | FileCategory::Migrations => {
                RiskTier::Critical
            }
            FileCategory::Infrastructure
            | FileCategory::Dependencies
            | FileCategory::CiConfig => RiskTier::High,
            FileCategory::BuildConfig | FileCategory::Config | FileCategory::Source => {
                RiskTier::Medium
            }
            FileCategory::Test | FileCategory::Documentation | FileCategory::Other => RiskTier::Low,
        }
    }
}

impl std::fmt::Display for FileCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FileCategory::Source => "source",
            FileCategory::Test => "test",
            FileCategory::Documentation => "documentation",
            FileCategory::BuildConfig => "build_config",
            FileCategory::CiConfig => "ci_config",
            FileCategory::Dependencies => "dependencies",
            FileCategory::Config => "config",
            FileCategory::Env => "env",
            FileCategory::SecretCandidates => "secret_candidates",
            FileCategory::Migrations => "migrations",
            FileCategory::Infrastructure => "infrastructure",
            FileCategory::Other => "other",
        };
        write!(f, "{s}")
    }
}

/// Deterministic classification of one path. Immutable per invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileClassification {
    pub path: String,
    pub category: FileCategory,
    pub tier: RiskTier,
}
