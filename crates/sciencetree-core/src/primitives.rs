//! # Innate Primitives
//!
//! Hardcoded constants for the science tree engine.
//!
//! These values are compiled into the binary. Anything a caller may tune
//! lives in [`crate::TreeOptions`], which defaults to the values below.

/// Version tag stamped into every [`crate::TreeResult`].
///
/// Bump this whenever scoring or classification semantics change, so that
/// stored results remain distinguishable from results of a revised algorithm.
pub const ALGORITHM_VERSION: &str = "sap-dag/2";

/// Default upper bound on reduction work (edge and vertex visits).
///
/// - All reduction passes charge the same budget.
/// - Exhaustion aborts generation with `TreeError::Processing`.
pub const DEFAULT_REDUCTION_BUDGET: u64 = 50_000_000;

/// Default divisor turning an external citation count into evidence weight.
///
/// `weight = 1 + times_cited / DEFAULT_CITATION_WEIGHT_STEP`
pub const DEFAULT_CITATION_WEIGHT_STEP: u64 = 10;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum number of records accepted from a single file.
///
/// Files with more records are rejected as malformed to bound memory use.
pub const MAX_RECORDS: usize = 100_000;

/// Maximum number of references kept per record.
///
/// Extra references beyond this are ignored.
pub const MAX_REFERENCES_PER_RECORD: usize = 5_000;

/// Maximum length, in bytes, of a single field value.
///
/// Longer values are truncated at a character boundary.
pub const MAX_FIELD_LENGTH: usize = 65_536;
