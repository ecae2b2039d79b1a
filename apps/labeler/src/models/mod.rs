pub mod job;
pub mod pair;
pub mod resume;

pub use job::JobDescription;
pub use pair::{GroundTruth, GroundTruthPair, TrainingPair};
pub use resume::{Certification, Education, Experience, TrainingResume};
