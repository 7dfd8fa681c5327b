pub mod candidate;
pub mod constraints;
pub mod executor;
pub mod mask;
pub mod orchestrator;
pub mod session;
pub mod traits;
pub mod verifier;

pub use candidate::MutationCandidate;
pub use constraints::ExecutionConstraints;
pub use executor::{ExecutionEvidence, FileDiff, RecipeExecutionResult, RecipeStatus};
pub use orchestrator::{execute_session, SessionResult};
pub use session::{RecipeStage, SessionOutcome};
pub use traits::{Detector, Recipe};
pub use verifier::{revalidate, VerificationResult};
