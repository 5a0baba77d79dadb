mod normalize;
mod raw;
mod result;
mod taxonomy;

pub use normalize::{DetectionNormalizer, Normalized};
pub use raw::{BackendResponse, ImageDims, RawDetection};
pub use result::{CanonicalDetection, ScalarId};
pub use taxonomy::{ComplianceCategory, Taxonomy, TaxonomyRule};
